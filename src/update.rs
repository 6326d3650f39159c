//! Update decision and propagation.
//!
//! [`Updater::handle`] takes one update request through
//! authentication, validation, change detection against the [IP ledger][crate::ledger] and,
//! when the address changed, [propagation][crate::propagate] to the DNS provider followed by a
//! ledger append.

use crate::auth;
use crate::config::SharedConfig;
use crate::error::Error;
use crate::ledger::{DynIpLedger, IpLedger, IpObservation};
use crate::propagate::DynPropagator;
use crate::validate;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use trust_dns_proto::rr::Name;

pub type SharedUpdater = Arc<Updater>;

/// The four values every update request must carry.
#[derive(Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub address: String,
}

impl fmt::Debug for UpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRequest")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("hostname", &self.hostname)
            .field("address", &self.address)
            .finish()
    }
}

impl UpdateRequest {
    /// Assemble a request from optional parts, or return [`Error::MissingParameters`] if any
    /// part is absent or empty.
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
        hostname: Option<String>,
        address: Option<String>,
    ) -> Result<Self, Error> {
        let present = |v: Option<String>| v.filter(|v| !v.is_empty());
        match (
            present(username),
            present(password),
            present(hostname),
            present(address),
        ) {
            (Some(username), Some(password), Some(hostname), Some(address)) => Ok(Self {
                username,
                password,
                hostname,
                address,
            }),
            _ => Err(Error::MissingParameters),
        }
    }
}

/// The successful terminal states of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The address matched the ledger tail. Nothing was sent to the provider.
    Unchanged,
    /// The provider acknowledged the new address and it was appended to the ledger.
    Updated,
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unchanged => "IP unchanged",
            Self::Updated => "DNS updated",
        })
    }
}

/// True when `reported` differs from the address of the ledger's last observation, or the
/// ledger is empty.
pub async fn has_changed(
    reported: &str,
    ledger: &(dyn IpLedger + Send + Sync),
) -> Result<bool, Error> {
    Ok(ledger
        .read_last()
        .await?
        .map_or(true, |last| last.address != reported))
}

pub struct Updater {
    config: SharedConfig,
    ledger: DynIpLedger,
    propagator: DynPropagator,
}

impl Updater {
    pub fn new(config: SharedConfig, ledger: DynIpLedger, propagator: DynPropagator) -> Self {
        Self {
            config,
            ledger,
            propagator,
        }
    }

    /// Handle one update request.
    ///
    /// The ledger lock is held from the change check until the append, so concurrent requests
    /// reporting the same new address cause a single provider call. That section runs in its
    /// own task: once the lock is taken the append follows every acknowledged provider call,
    /// even if the caller stops waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthorized`] for bad credentials, [`Error::InvalidHostname`],
    /// [`Error::InvalidAddress`] or [`Error::DisallowedAddress`] for a rejected hostname or
    /// address, [`Error::Propagation`] when the provider rejects the update or can't be
    /// reached, and [`Error::LedgerBusy`] when earlier updates hold the ledger for longer than
    /// [`Config::ledger_wait`][crate::config::Config::ledger_wait]. The ledger is untouched in
    /// every error case.
    pub async fn handle(&self, request: UpdateRequest) -> Result<UpdateOutcome, Error> {
        let expected = &self.config.credentials;
        if !auth::verify(
            &request.username,
            &request.password,
            &expected.username,
            &expected.password,
        ) {
            tracing::warn!(
                "rejected update for \"{}\": invalid credentials for user \"{}\"",
                request.hostname,
                request.username
            );
            return Err(Error::Unauthorized);
        }

        let hostname = validate::hostname(&request.hostname, &self.config.hostnames)?;
        // Compare and record the canonical text form so "2001:DB8::0:1" and "2001:db8::1" match.
        let address = validate::address(&request.address, self.config.allow_private_addresses)?
            .to_string();

        // Detached: an acknowledged provider call is recorded even if this future is dropped.
        let apply = apply(
            self.ledger.clone(),
            self.propagator.clone(),
            hostname,
            address,
            self.config.ledger_wait(),
        );
        tokio::spawn(apply).await?
    }
}

/// Compare `address` with the ledger tail and, when it changed, propagate it and record it. The
/// ledger lock is held throughout.
async fn apply(
    ledger: DynIpLedger,
    propagator: DynPropagator,
    hostname: Name,
    address: String,
    ledger_wait: Duration,
) -> Result<UpdateOutcome, Error> {
    let Ok(mut ledger) = tokio::time::timeout(ledger_wait, ledger.lock_owned()).await else {
        tracing::warn!("\"{hostname}\" to {address}: gave up waiting for a pending update");
        return Err(Error::LedgerBusy);
    };
    if !has_changed(&address, &*ledger).await? {
        tracing::info!("\"{hostname}\" unchanged at {address}");
        return Ok(UpdateOutcome::Unchanged);
    }

    tracing::info!("\"{hostname}\" changed to {address}, updating DNS");
    let ack = match propagator.propagate(&address).await {
        Ok(ack) => ack,
        Err(err) => {
            tracing::error!("DNS update to {address} failed: {err}");
            return Err(err.into());
        }
    };
    if let Some(record) = &ack.record {
        tracing::debug!(
            "provider record {} {} {} now {} (ttl {:?})",
            record.id,
            record.record_type,
            record.name,
            record.data,
            record.ttl
        );
    }

    ledger.append(IpObservation::now(address.clone())).await?;
    tracing::info!("DNS updated to {address}");
    Ok(UpdateOutcome::Updated)
}
