//! Trove application binary - composition root.
//!
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Overlay environment and CLI settings, then validate
//! 3. Build the document store (Elasticsearch or in-memory seed)
//! 4. Start the axum action server

mod cli;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter};
use trove_api::state::AppState;
use trove_chat::TurnResolver;
use trove_core::config::StoreBackend;
use trove_core::{TroveConfig, TroveError};
use trove_kb::{DocumentRegistry, DocumentStore, ElasticsearchStore, KnowledgeBase, MemoryStore};

use crate::cli::CliArgs;

/// Build the configured document store.
///
/// Only called after [`TroveConfig::validate`], which guarantees the
/// settings the selected backend needs.
fn build_store(config: &TroveConfig) -> Result<Arc<dyn DocumentStore>, TroveError> {
    let store = &config.store;
    match store.backend {
        StoreBackend::Elasticsearch => {
            let endpoint = store.endpoint.as_deref().unwrap_or_default();
            let es = ElasticsearchStore::new(
                endpoint,
                store.username.clone().unwrap_or_default(),
                store.password.clone().unwrap_or_default(),
                Duration::from_secs(store.request_timeout_secs),
            )?;
            tracing::info!(endpoint, "Elasticsearch store configured");
            Ok(Arc::new(es))
        }
        StoreBackend::Memory => {
            let path = store
                .seed_path
                .as_deref()
                .ok_or_else(|| TroveError::Config("memory backend requires store.seed_path".to_string()))?;
            Ok(Arc::new(MemoryStore::from_seed_file(path)?))
        }
    }
}

/// Load the configuration file and overlay environment and CLI settings.
///
/// A file named with `--config` or `TROVE_CONFIG` must load; otherwise a
/// missing or broken `trove.toml` falls back to defaults with a warning.
fn load_config(args: &CliArgs) -> Result<(PathBuf, TroveConfig), TroveError> {
    let path = args.resolve_config_path();
    let mut config = if args.config_is_explicit() {
        TroveConfig::load(&path)?
    } else {
        TroveConfig::load_or_default(&path)
    };

    config.apply_env_overrides();
    config.general.port = args.resolve_port(config.general.port);
    config.store.backend = args.resolve_backend(config.store.backend);
    if let Some(ref seed) = args.seed {
        config.store.seed_path = Some(seed.clone());
    }
    Ok((path, config))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Tracing. The config file's level replaces the initial filter once
    // loaded, unless --log-level or RUST_LOG is set.
    let cli_filter = args.resolve_log_filter();
    let initial = cli_filter
        .as_deref()
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    let (filter_layer, filter_handle) = reload::Layer::new(initial);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Trove v{}", env!("CARGO_PKG_VERSION"));

    // Config.
    let (config_file, config) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(
                path = %args.resolve_config_path().display(),
                error = %e,
                "Failed to load configuration"
            );
            return Err(e.into());
        }
    };

    if cli_filter.is_none() {
        match EnvFilter::try_new(&config.general.log_level) {
            Ok(filter) => {
                if let Err(e) = filter_handle.reload(filter) {
                    tracing::warn!(error = %e, "Failed to apply configured log level");
                }
            }
            Err(e) => tracing::warn!(
                level = %config.general.log_level,
                error = %e,
                "Invalid general.log_level, keeping info"
            ),
        }
    }

    if let Err(e) = config.validate() {
        tracing::error!(path = %config_file.display(), error = %e, "Invalid configuration");
        return Err(e.into());
    }

    // Knowledge base.
    let store = build_store(&config)?;
    let registry = DocumentRegistry::with_defaults();
    tracing::info!(object_types = ?registry.type_names(), "Document types registered");
    let kb = KnowledgeBase::new(registry, store)
        .with_default_limit(config.knowledge_base.default_limit);
    let resolver = TurnResolver::new(Arc::new(kb));

    // Server.
    let state = AppState::new(config.clone(), resolver);
    trove_api::start_server(&config, state).await?;

    Ok(())
}
