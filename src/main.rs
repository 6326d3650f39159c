use anyhow::{anyhow, Result};
use ddns_bridge::{Config, SharedConfig, Updater};
use is_terminal::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine, settings may come from the real environment.
    dotenvy::dotenv_override().ok();

    let config = config_init(std::env::args().nth(1))?;
    // Flushes the log file on drop, keep it until main returns.
    let _log_guard = tracing_init(config.debug, config.log_file.as_deref())?;

    if std::io::stdout().is_terminal() {
        println!("{}", config.banner());
    }
    if !config.credentials_configured() {
        tracing::warn!("DDNS_USERNAME or DDNS_PASSWORD not set, every update will be refused");
    }

    let ledger = config.ledger().await?;
    let propagator = config.propagator()?;
    let updater = Arc::new(Updater::new(config.clone(), ledger, propagator));

    tracing::info!(
        "updating record {} of {}",
        config.target.record_id,
        config.target.domain
    );
    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = ddns_bridge::api::new(config.clone(), updater)?;
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init(debug: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_filter = if debug {
        "ddns_bridge=debug,tower_http=debug"
    } else {
        "ddns_bridge=info"
    };
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (writer, guard) = tracing_appender::non_blocking(log_file_appender(path)?);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
    Ok(guard)
}

fn log_file_appender(path: &Path) -> Result<RollingFileAppender> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)?)
}

fn config_init(config_file: Option<String>) -> Result<SharedConfig> {
    let config = match config_file {
        Some(config_file) => Config::try_from_file(&config_file)?,
        None => Config::from_env()?,
    };
    Ok(Arc::new(config))
}
