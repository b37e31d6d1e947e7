use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::File;
use mm_lock::LockManager;
use mm_lock::LockManagerConfig;
use mm_ratelimit::MisconfigPolicy;
use mm_ratelimit::MultiTierRateLimiter;
use mm_ratelimit::ServiceLimitConfig;
use mm_ratelimit::services;
use serde::Deserialize;

use crate::tracing_setup::LoggingConfig;

/// Contents of `config/coordination.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoordinationConfigFile {
    /// One rate limit tier per external service
    pub services: BTreeMap<String, ServiceLimitConfig>,
    pub locks: LockManagerConfig,
    pub misconfig_policy: MisconfigPolicy,

    /// Period of the stats reporter
    pub stats_interval_secs: u64,
    pub logging: LoggingConfig,
}

impl Default for CoordinationConfigFile {
    fn default() -> Self {
        Self {
            services: services::default_configs(),
            locks: LockManagerConfig::default(),
            misconfig_policy: MisconfigPolicy::default(),
            stats_interval_secs: 60,
            logging: LoggingConfig::default(),
        }
    }
}

impl CoordinationConfigFile {
    pub fn build_rate_limiter(&self) -> mm_ratelimit::Result<MultiTierRateLimiter> {
        MultiTierRateLimiter::from_configs(self.services.clone(), self.misconfig_policy)
    }

    pub fn build_lock_manager(&self) -> mm_lock::Result<LockManager> {
        LockManager::new(&self.locks)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs.max(1))
    }
}

pub fn load_coordination_config<P: AsRef<Path>>(path: P) -> Result<CoordinationConfigFile, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

/// Log the outcome of a load, substituting defaults on failure
///
/// Split from loading so the file can be read before tracing is installed.
pub fn resolve_or_default(path: &str, loaded: Result<CoordinationConfigFile, ConfigError>) -> CoordinationConfigFile {
    match loaded {
        Ok(config) => {
            tracing::info!(services = config.services.len(), "Loaded coordination config from {path}");
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load coordination config from {}: {}. Using defaults.", path, err);
            CoordinationConfigFile::default()
        }
    }
}

/// Load coordination config with fallback to default
pub fn load_coordination_config_or_default(path: &str) -> CoordinationConfigFile {
    resolve_or_default(path, load_coordination_config(path))
}
