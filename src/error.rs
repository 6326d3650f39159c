//! Error types.
//!
//! The `Display` form of the client-facing variants doubles as the plain-text response body
//! returned by the [update API][crate::api].

use crate::propagate::PropagationError;
use std::net::IpAddr;

/// Error enumerates the possible DDNS bridge error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when an update request lacks one of `username`, `password`, `hostname` or
    /// `ip`/`myip`. Empty values count as missing.
    #[error("Missing parameters")]
    MissingParameters,

    /// Returned when the supplied credentials don't match the configured
    /// [`ServerCredentials`][crate::config::ServerCredentials]. Deliberately says nothing about
    /// which of the two values was wrong.
    #[error("Unauthorized")]
    Unauthorized,

    /// Returned when the `hostname` parameter isn't a syntactically valid hostname, or isn't
    /// in the configured [`Config::hostnames`][crate::config::Config::hostnames] allow-list.
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// Returned when the reported address isn't an IPv4 or IPv6 literal.
    #[error("Invalid IP: \"{0}\" is not an IP address")]
    InvalidAddress(String),

    /// Returned when the reported address is a loopback, multicast, unspecified, link-local or
    /// private address and [`Config::allow_private_addresses`][crate::config::Config] is off.
    #[error("Invalid IP: {0} is not a public address")]
    DisallowedAddress(IpAddr),

    /// Returned when a client exceeds its per-minute update quota.
    #[error("Too many requests")]
    RateLimited(IpAddr),

    /// Returned when the DNS provider rejects an update or can't be reached.
    #[error(transparent)]
    Propagation(#[from] PropagationError),

    /// Returned when an update can't take the IP ledger lock because earlier updates are still
    /// waiting on the DNS provider.
    #[error("Timed out waiting for a pending DNS update")]
    LedgerBusy,

    /// Returned when the task applying an update to the provider and the ledger panics.
    #[error("update task failed")]
    UpdateTask(#[from] tokio::task::JoinError),

    /// Returned when a required configuration setting is absent.
    #[error("missing configuration setting: {0}")]
    MissingSetting(&'static str),

    /// Returned when a configuration setting can't be parsed.
    #[error("invalid value for configuration setting {name}: \"{value}\"")]
    InvalidSetting { name: &'static str, value: String },

    /// Returned when the API request timeout doesn't leave room for a provider call.
    #[error("api_timeout ({api:?}) must be longer than provider_timeout ({provider:?})")]
    ConflictingTimeouts {
        api: std::time::Duration,
        provider: std::time::Duration,
    },

    /// Returned when a line of the IP ledger file can't be parsed.
    #[error("corrupt IP ledger line: \"{0}\"")]
    CorruptLedger(String),

    /// Returned when a ledger timestamp can't be formatted.
    #[error("timestamp formatting failed")]
    Timestamp(#[from] time::error::Format),

    /// Returned when the outbound HTTP client can't be constructed.
    #[error("HTTP client error")]
    HttpClient(#[from] reqwest::Error),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [loading a `Config` from a file][crate::config::Config::try_from_file]
    /// fails due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}
