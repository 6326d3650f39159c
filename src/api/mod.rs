//! HTTP API accepting DynDNS-style address updates.
//!
//! All responses are plain text unless noted otherwise.
//!
//! # API Endpoints
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/ddns/update` (GET)
//!
//!   Expects the query parameters:
//!
//!   | Parameter  | Description                                                   |
//!   |------------|---------------------------------------------------------------|
//!   | `username` | DDNS username                                                 |
//!   | `password` | DDNS password                                                 |
//!   | `hostname` | the hostname being updated                                    |
//!   | `ip`       | the client's current address                                  |
//!   | `myip`     | accepted in place of `ip`; `ip` wins when both are present    |
//!
//!   `username` and `password` may instead be sent as an `Authorization: Basic` header.
//!
//!   Responses:
//!
//!   | Status | Body                                     | When                                   |
//!   |--------|------------------------------------------|----------------------------------------|
//!   | 200    | `DNS updated`                            | the provider accepted the new address  |
//!   | 200    | `IP unchanged`                           | the address matches the last one sent  |
//!   | 400    | `Missing parameters`                     | a parameter is absent or empty         |
//!   | 400    | `Invalid hostname: ...`, `Invalid IP: ...` | the hostname or address was rejected |
//!   | 403    | `Unauthorized`                           | the credentials don't match            |
//!   | 429    | `Too many requests`                      | the client exceeded its update quota   |
//!   | 500    | `Failed to update DNS: <provider body>`  | the provider rejected the update       |
//!   | 500    | `Error connecting to <provider>: ...`    | the provider couldn't be reached       |
//!
//! ## `/ap` (GET)
//!
//!   Legacy alias of `/ddns/update`.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::{from_tcp, new};
