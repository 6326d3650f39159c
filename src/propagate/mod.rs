//! DNS record propagation.
//!
//! A [`DnsPropagator`] pushes a newly reported address to the DNS hosting provider. Exactly one
//! provider call is made per [`DnsPropagator::propagate`]; retrying is left to the update
//! client, which re-reports its address on its own schedule.

use serde::Deserialize;
use std::sync::Arc;

pub mod digitalocean;

pub use digitalocean::DigitalOceanPropagator;

/// `DynPropagator` is a type alias for a [`DnsPropagator`] shared between request handlers.
pub type DynPropagator = Arc<dyn DnsPropagator + Send + Sync>;

/// A provider's acknowledgement of a record update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ack {
    /// The updated record as echoed back by the provider, when it could be decoded.
    pub record: Option<DomainRecord>,
}

/// The subset of a provider DNS record that is worth logging.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    pub id: u64,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub data: String,
    pub ttl: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
pub enum PropagationError {
    /// The provider answered with a non-success status.
    #[error("Failed to update DNS: {body}")]
    ProviderRejected { status: u16, body: String },

    /// The provider couldn't be reached: name resolution, connection or timeout failure.
    #[error("Error connecting to {provider}: {cause}")]
    Unreachable { provider: String, cause: String },
}

/// An async trait describing the single "set record value" operation of a DNS provider.
#[async_trait::async_trait]
pub trait DnsPropagator {
    /// Set the target record's value to `address`.
    async fn propagate(&self, address: &str) -> Result<Ack, PropagationError>;
}
