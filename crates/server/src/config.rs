//! Configuration loading.

use anyhow::{Context, Result};
use depot_core::config::AppConfig;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::Path;

/// Environment variable prefix. Nested keys are separated by `__`,
/// e.g. `DEPOT_QUEUE__WORKERS=4`.
pub const ENV_PREFIX: &str = "DEPOT_";

/// Load configuration from an optional TOML file overlaid with `DEPOT_`
/// environment variables, then validate it.
///
/// A missing file is not an error: every option has a default and the
/// environment can provide the rest.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();
    if path.exists() {
        tracing::info!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path.display());
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::config::SubstrateConfig;

    #[test]
    fn test_load_from_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("depot.toml");
        std::fs::write(
            &path,
            r#"
[store]
tracing = true

[store.backend]
type = "memory"

[queue]
workers = 3
interval_secs = 10

[housekeeping]
retention_days = 30
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.store.tracing);
        assert!(matches!(config.store.backend, SubstrateConfig::Memory));
        assert_eq!(config.queue.worker_count(), 3);
        assert_eq!(config.queue.interval_secs, 10);
        assert_eq!(config.housekeeping.retention_days, 30);
    }

    #[test]
    fn test_zero_workers_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("depot.toml");
        std::fs::write(&path, "[queue]\nworkers = 0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("queue.workers"), "{err}");
    }
}
