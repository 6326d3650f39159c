use crate::error::Error;
use crate::ledger::{DynIpLedger, FileIpLedger, InMemoryIpLedger};
use crate::propagate::{DigitalOceanPropagator, DynPropagator};
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub type SharedConfig = Arc<Config>;

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://api.digitalocean.com/v2";
const DEFAULT_LEDGER_PATH: &str = "ips.log";
const DEFAULT_PORT: u16 = 8443;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 10;

// Environment keys. Multi-name settings are looked up in order, first non-empty value wins.
const ENV_TOKEN: &[&str] = &["TOKEN", "DO_TOKEN"];
const ENV_DOMAIN: &[&str] = &["DOMAIN", "DO_DOMAIN"];
const ENV_RECORD_ID: &[&str] = &["RECORD_ID", "DO_RECORD_ID"];
const ENV_USERNAME: &[&str] = &["DDNS_USERNAME"];
const ENV_PASSWORD: &[&str] = &["DDNS_PASSWORD"];
const ENV_HOST: &[&str] = &["HOST"];
const ENV_PORT: &[&str] = &["PORT"];
const ENV_DEBUG: &[&str] = &["DEBUG"];
const ENV_LEDGER_PATH: &[&str] = &["DDNS_LEDGER_PATH"];
const ENV_HOSTNAMES: &[&str] = &["DDNS_HOSTNAMES"];
const ENV_ALLOW_PRIVATE: &[&str] = &["DDNS_ALLOW_PRIVATE"];
const ENV_RATE_LIMIT: &[&str] = &["DDNS_RATE_LIMIT"];
const ENV_API_TIMEOUT: &[&str] = &["DDNS_API_TIMEOUT"];
const ENV_PROVIDER_TIMEOUT: &[&str] = &["DDNS_PROVIDER_TIMEOUT"];
const ENV_PROVIDER_URL: &[&str] = &["DDNS_PROVIDER_URL"];
const ENV_LOG_FILE: &[&str] = &["DDNS_LOG_FILE"];

/// The username/password pair update clients must present.
#[derive(Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ServerCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for ServerCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerCredentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// The provider record kept pointed at the reported address.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct DnsTarget {
    pub api_token: String,
    pub domain: String,
    pub record_id: String,
}

impl fmt::Debug for DnsTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnsTarget")
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("record_id", &self.record_id)
            .finish()
    }
}

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default)]
    pub credentials: ServerCredentials,
    pub target: DnsTarget,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout: Duration,
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,
    /// Path of the IP ledger file. `null` keeps the ledger in memory only.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: Option<PathBuf>,
    /// Hostnames update clients may report for. Empty permits any valid hostname.
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub allow_private_addresses: bool,
    /// Update requests accepted per minute from one client IP. Zero disables the limit.
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default)]
    pub debug: bool,
    /// Also write log events to this file, without ANSI colors.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_api_bind_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_provider_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_provider_base_url() -> String {
    DEFAULT_PROVIDER_BASE_URL.to_string()
}

#[allow(clippy::unnecessary_wraps)]
fn default_ledger_path() -> Option<PathBuf> {
    Some(PathBuf::from(DEFAULT_LEDGER_PATH))
}

fn default_rate_limit_per_minute() -> u32 {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.target_is_complete()?;
        conf.timeouts_are_ordered()?;
        Ok(conf)
    }

    /// Build a [`Config`] from the process environment.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a [`Config`] from environment-style settings resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| lookup(*name).filter(|value| !value.is_empty()))
        };

        let host = match setting(ENV_HOST) {
            Some(host) => parse_setting::<IpAddr>(ENV_HOST[0], &host)?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = match setting(ENV_PORT) {
            Some(port) => parse_setting::<u16>(ENV_PORT[0], &port)?,
            None => DEFAULT_PORT,
        };
        let seconds = |names: &[&'static str], default: Duration| match setting(names) {
            Some(value) => parse_setting::<u64>(names[0], &value).map(Duration::from_secs),
            None => Ok(default),
        };

        let conf = Self {
            credentials: ServerCredentials {
                username: setting(ENV_USERNAME).unwrap_or_default(),
                password: setting(ENV_PASSWORD).unwrap_or_default(),
            },
            target: DnsTarget {
                api_token: setting(ENV_TOKEN).ok_or(Error::MissingSetting(ENV_TOKEN[0]))?,
                domain: setting(ENV_DOMAIN).ok_or(Error::MissingSetting(ENV_DOMAIN[0]))?,
                record_id: setting(ENV_RECORD_ID)
                    .ok_or(Error::MissingSetting(ENV_RECORD_ID[0]))?,
            },
            api_bind_addr: SocketAddr::new(host, port),
            api_timeout: seconds(ENV_API_TIMEOUT, default_api_timeout())?,
            provider_timeout: seconds(ENV_PROVIDER_TIMEOUT, default_provider_timeout())?,
            provider_base_url: setting(ENV_PROVIDER_URL)
                .unwrap_or_else(default_provider_base_url),
            ledger_path: setting(ENV_LEDGER_PATH)
                .map(PathBuf::from)
                .or_else(default_ledger_path),
            hostnames: setting(ENV_HOSTNAMES)
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            allow_private_addresses: setting(ENV_ALLOW_PRIVATE).is_some_and(|v| is_true(&v)),
            rate_limit_per_minute: match setting(ENV_RATE_LIMIT) {
                Some(limit) => parse_setting::<u32>(ENV_RATE_LIMIT[0], &limit)?,
                None => DEFAULT_RATE_LIMIT_PER_MINUTE,
            },
            debug: setting(ENV_DEBUG).is_some_and(|v| is_true(&v)),
            log_file: setting(ENV_LOG_FILE).map(PathBuf::from),
        };
        conf.target_is_complete()?;
        conf.timeouts_are_ordered()?;
        Ok(conf)
    }

    /// True when both halves of the [`ServerCredentials`] are set. Without them every update
    /// request is refused.
    pub fn credentials_configured(&self) -> bool {
        !self.credentials.username.is_empty() && !self.credentials.password.is_empty()
    }

    /// How long an update may wait for the IP ledger lock before giving up. Half of what the
    /// API timeout leaves after a provider call, so a request holding the lock and a request
    /// waiting on it both answer before the API timeout fires.
    pub fn ledger_wait(&self) -> Duration {
        self.api_timeout.saturating_sub(self.provider_timeout) / 2
    }

    /// Open the IP ledger described by [`Config::ledger_path`].
    pub async fn ledger(&self) -> Result<DynIpLedger, Error> {
        let ledger: DynIpLedger = match &self.ledger_path {
            Some(path) => {
                tracing::debug!("loading IP ledger from {}", path.display());
                Arc::new(Mutex::new(FileIpLedger::try_from_file(path).await?))
            }
            None => {
                tracing::warn!("IP ledger is in memory only, the last IP is lost on restart");
                Arc::new(Mutex::new(InMemoryIpLedger::default()))
            }
        };
        Ok(ledger)
    }

    /// Build the propagator that updates [`Config::target`].
    pub fn propagator(&self) -> Result<DynPropagator, Error> {
        let propagator: DynPropagator = Arc::new(DigitalOceanPropagator::new(
            self.target.clone(),
            &self.provider_base_url,
            self.provider_timeout,
        )?);
        Ok(propagator)
    }

    /// A human readable summary of the configuration with secrets masked.
    pub fn banner(&self) -> String {
        const RULE: &str =
            "============================================================";
        let or_unset = |value: &str| {
            if value.is_empty() {
                "NOT SET".to_string()
            } else {
                value.to_string()
            }
        };
        let masked = |value: &str| {
            if value.is_empty() {
                "NOT SET".to_string()
            } else {
                "*".repeat(20)
            }
        };
        let ledger = self
            .ledger_path
            .as_ref()
            .map_or("(in memory)".to_string(), |p| p.display().to_string());
        let hostnames = if self.hostnames.is_empty() {
            "(any)".to_string()
        } else {
            self.hostnames.join(", ")
        };

        [
            RULE.to_string(),
            "                 DDNS BRIDGE CONFIGURATION".to_string(),
            RULE.to_string(),
            String::new(),
            "# DNS provider".to_string(),
            format!("TOKEN        : {}", masked(&self.target.api_token)),
            format!("DOMAIN       : {}", or_unset(&self.target.domain)),
            format!("RECORD_ID    : {}", or_unset(&self.target.record_id)),
            format!("PROVIDER_URL : {}", self.provider_base_url),
            String::new(),
            "# DDNS authentication".to_string(),
            format!("DDNS_USERNAME: {}", or_unset(&self.credentials.username)),
            format!("DDNS_PASSWORD: {}", masked(&self.credentials.password)),
            format!("HOSTNAMES    : {hostnames}"),
            String::new(),
            "# Server".to_string(),
            format!("BIND         : {}", self.api_bind_addr),
            format!("LEDGER       : {ledger}"),
            format!("RATE_LIMIT   : {}/min", self.rate_limit_per_minute),
            format!("DEBUG        : {}", self.debug),
            format!(
                "LOG_FILE     : {}",
                self.log_file
                    .as_ref()
                    .map_or("(console only)".to_string(), |p| p.display().to_string())
            ),
            String::new(),
            RULE.to_string(),
        ]
        .join("\n")
    }

    fn target_is_complete(&self) -> Result<(), Error> {
        if self.target.api_token.is_empty() {
            return Err(Error::MissingSetting(ENV_TOKEN[0]));
        }
        if self.target.domain.is_empty() {
            return Err(Error::MissingSetting(ENV_DOMAIN[0]));
        }
        if self.target.record_id.is_empty() {
            return Err(Error::MissingSetting(ENV_RECORD_ID[0]));
        }
        Ok(())
    }

    fn timeouts_are_ordered(&self) -> Result<(), Error> {
        if self.api_timeout <= self.provider_timeout {
            return Err(Error::ConflictingTimeouts {
                api: self.api_timeout,
                provider: self.provider_timeout,
            });
        }
        Ok(())
    }
}

fn parse_setting<T: FromStr>(name: &'static str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::InvalidSetting {
        name,
        value: value.to_string(),
    })
}

fn is_true(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}
