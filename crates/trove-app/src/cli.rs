//! CLI argument definitions for the trove action server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use trove_core::config::StoreBackend;

/// Trove - knowledge base action server for conversational assistants.
#[derive(Parser, Debug)]
#[command(name = "trove", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Action server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Document store backend.
    #[arg(long = "store", value_enum)]
    pub store: Option<StoreArg>,

    /// JSON seed file for the memory backend.
    #[arg(long = "seed")]
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreArg {
    Elasticsearch,
    Memory,
}

impl From<StoreArg> for StoreBackend {
    fn from(arg: StoreArg) -> Self {
        match arg {
            StoreArg::Elasticsearch => StoreBackend::Elasticsearch,
            StoreArg::Memory => StoreBackend::Memory,
        }
    }
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TROVE_CONFIG env var > ./trove.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TROVE_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("trove.toml")
    }

    /// Resolve the action server port.
    ///
    /// Priority: --port flag > TROVE_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("TROVE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    /// Whether the configuration file was named explicitly, by flag or env.
    /// A named file that fails to load aborts startup.
    pub fn config_is_explicit(&self) -> bool {
        self.config.is_some() || std::env::var_os("TROVE_CONFIG").is_some()
    }

    /// Resolve the tracing filter directive set outside the config file.
    ///
    /// Priority: --log-level flag > RUST_LOG env var. Returns `None` if
    /// neither is set (use the config file value).
    pub fn resolve_log_filter(&self) -> Option<String> {
        if let Some(ref level) = self.log_level {
            return Some(level.clone());
        }
        std::env::var("RUST_LOG").ok().filter(|f| !f.is_empty())
    }

    /// Resolve the store backend. `--seed` alone implies the memory backend.
    pub fn resolve_backend(&self, config_backend: StoreBackend) -> StoreBackend {
        match (self.store, &self.seed) {
            (Some(arg), _) => arg.into(),
            (None, Some(_)) => StoreBackend::Memory,
            (None, None) => config_backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("trove").chain(args.iter().copied()))
    }

    #[test]
    fn test_flags_override_config() {
        let args = parse(&["--port", "6000", "--log-level", "debug", "--store", "memory"]);
        assert_eq!(args.resolve_port(5055), 6000);
        assert_eq!(args.resolve_log_filter().as_deref(), Some("debug"));
        assert_eq!(
            args.resolve_backend(StoreBackend::Elasticsearch),
            StoreBackend::Memory
        );
    }

    #[test]
    fn test_seed_implies_memory_backend() {
        let args = parse(&["--seed", "books.json"]);
        assert_eq!(
            args.resolve_backend(StoreBackend::Elasticsearch),
            StoreBackend::Memory
        );

        let args = parse(&["--seed", "books.json", "--store", "elasticsearch"]);
        assert_eq!(
            args.resolve_backend(StoreBackend::Memory),
            StoreBackend::Elasticsearch
        );
    }

    #[test]
    fn test_explicit_config_path() {
        let args = parse(&["-c", "/etc/trove/trove.toml"]);
        assert_eq!(
            args.resolve_config_path(),
            PathBuf::from("/etc/trove/trove.toml")
        );
        assert!(args.config_is_explicit());
    }

    #[test]
    fn test_unknown_store_rejected() {
        let result = CliArgs::try_parse_from(["trove", "--store", "postgres"]);
        assert!(result.is_err());
    }
}
