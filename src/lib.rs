//! DDNS Bridge
//!
//! Keeps one DNS record at a hosting provider pointed at a dynamic public IP.
//!
//! Routers and update clients report their address to the [HTTP API][api] using the
//! DynDNS-style `GET /ddns/update?username=..&password=..&hostname=..&myip=..` protocol. Each
//! report is authenticated, validated and compared with the last address recorded in the
//! [IP ledger][ledger]. Only a changed address is [propagated][propagate] to the provider, and
//! only an acknowledged propagation is appended to the ledger.
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod propagate;
pub mod update;
pub mod validate;

pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use ledger::{FileIpLedger, InMemoryIpLedger};
pub use propagate::DigitalOceanPropagator;
pub use update::Updater;
