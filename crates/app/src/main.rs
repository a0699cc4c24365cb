mod backend;
mod commands;
mod error;
mod settings;
mod shell;

use std::sync::Arc;

use parley_chat::SystemClock;
use snafu::ResultExt;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::backend::Stores;
use crate::error::{AppError, OpenStorageSnafu, TerminalSnafu};
use crate::settings::{LoadStatus, SettingsStore};
use crate::shell::Shell;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let settings_store = SettingsStore::load();
    let settings = settings_store.settings();

    // RUST_LOG wins over the configured filter. Logs go to stderr so they don't mix with the shell.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = settings_store.config_path();
    match settings_store.load_status() {
        LoadStatus::Loaded => tracing::info!(path = ?config_path, "loaded settings"),
        LoadStatus::Missing => {
            tracing::info!(path = ?config_path, "settings file not found, using defaults")
        }
        LoadStatus::Invalid(reason) => {
            tracing::warn!(path = ?config_path, %reason, "failed to parse settings, using defaults")
        }
    }

    match settings_store.write_if_missing() {
        Ok(true) => tracing::info!(path = ?config_path, "wrote default settings"),
        Ok(false) => {}
        Err(error) => tracing::warn!(%error, "could not write default settings"),
    }

    let kv = backend::open_key_value_store(&settings)
        .await
        .context(OpenStorageSnafu {
            stage: "open-key-value-store",
        })?;

    let shell = Shell::new(
        Stores::new(kv),
        Arc::new(SystemClock),
        settings.timings,
        backend::country_source(settings.countries_file.as_deref()),
        std::io::stdout(),
    );

    shell
        .run(BufReader::new(tokio::io::stdin()))
        .await
        .context(TerminalSnafu {
            stage: "run-shell",
        })
}
