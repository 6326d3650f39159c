//! The IP ledger.
//!
//! An append-only history of the addresses successfully pushed to the DNS provider. Its last
//! entry is the authoritative "last known IP" that update requests are compared against.
//!
//! Two implementations are provided, [`memory::InMemoryIpLedger`] and [`file::FileIpLedger`].
//! The former is not durable across restarts. The latter appends one `<timestamp>,<address>`
//! line per observation to a text file and reloads the last line on startup.

use crate::error::Error;
use std::str::FromStr;
use std::sync::Arc;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};
use tokio::sync::Mutex;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileIpLedger;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryIpLedger;

/// `DynIpLedger` is a type alias for an [`IpLedger`] shared between request handlers.
///
/// A [`Mutex`] rather than a `RwLock`: the read of the last observation, the provider call and
/// the append that follows must happen as one critical section.
#[allow(clippy::module_name_repetitions)]
pub type DynIpLedger = Arc<Mutex<dyn IpLedger + Send + Sync>>;

const WRITE_FORMAT: &[FormatItem<'static>] = format_description!(
    version = 2,
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]"
);

const READ_FORMAT: &[FormatItem<'static>] = format_description!(
    version = 2,
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// One observed address and the (UTC) time it was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpObservation {
    pub timestamp: OffsetDateTime,
    pub address: String,
}

impl IpObservation {
    pub fn now(address: impl Into<String>) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            address: address.into(),
        }
    }

    /// Render the observation as a ledger line, without the trailing newline.
    pub fn to_line(&self) -> Result<String, Error> {
        let timestamp = self.timestamp.to_offset(time::UtcOffset::UTC).format(WRITE_FORMAT)?;
        Ok(format!("{timestamp},{}", self.address))
    }
}

impl FromStr for IpObservation {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let corrupt = || Error::CorruptLedger(line.to_string());
        let (timestamp, rest) = line.trim().split_once(',').ok_or_else(corrupt)?;
        let address = rest.split(',').next().unwrap_or_default().trim();
        if address.is_empty() {
            return Err(corrupt());
        }
        let timestamp = PrimitiveDateTime::parse(timestamp.trim(), READ_FORMAT)
            .map_err(|_| corrupt())?
            .assume_utc();
        Ok(Self {
            timestamp,
            address: address.to_string(),
        })
    }
}

/// An async trait describing an append-only history of [`IpObservation`]s.
#[async_trait::async_trait]
pub trait IpLedger {
    /// The most recently appended observation, if any.
    async fn read_last(&self) -> Result<Option<IpObservation>, Error>;

    /// Append an observation to the end of the ledger.
    async fn append(&mut self, observation: IpObservation) -> Result<(), Error>;
}
