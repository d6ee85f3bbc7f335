//! # Brandvakt Configuration System
//!
//! Hierarchical configuration for the Brandvakt firewall: static rules, threat-intel
//! feeds, anomaly detector tunables, worker pool sizing and telemetry.
//!
//! ## Features
//! - **Layered sources**: defaults, YAML files, `BRANDVAKT_*` environment variables
//! - **Validation**: every value is range/format checked before the engine starts
//! - **Fatal on error**: a malformed rule or feed aborts startup with a readable report

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod detector;
mod engine;
mod error;
mod intel;
mod rules;
mod telemetry;
mod validation;

pub use detector::{DetectorConfig, ModelKind};
pub use engine::EngineConfig;
pub use error::ConfigError;
pub use intel::{FeedConfig, FeedFormat, IntelConfig};
pub use rules::RuleConfig;
pub use telemetry::TelemetryConfig;

/// Base configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/brandvakt.yaml";

/// Top-level configuration container for all Brandvakt components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct BrandvaktConfig {
    /// Initial rule list, any order; the rule store sorts by priority.
    #[validate(nested)]
    #[serde(default)]
    pub rules: Vec<RuleConfig>,

    #[validate(nested)]
    #[serde(default)]
    pub intel: IntelConfig,

    #[validate(nested)]
    #[serde(default)]
    pub detector: DetectorConfig,

    #[validate(nested)]
    #[serde(default)]
    pub engine: EngineConfig,

    #[validate(nested)]
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl BrandvaktConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/brandvakt.yaml`, if present
    /// 3. `config/<BRANDVAKT_ENV>.yaml` environment overrides, if present
    /// 4. `BRANDVAKT_*` environment variables (`__` separates nesting levels)
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(BrandvaktConfig::default()));

        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_PATH));
        }

        let env = std::env::var("BRANDVAKT_ENV").unwrap_or_else(|_| "production".into());
        let env_file = format!("config/{}.yaml", env);
        if Path::new(&env_file).exists() {
            figment = figment.merge(Yaml::file(env_file));
        }

        Self::extract_validated(figment)
    }

    /// Load configuration from a specific file, with environment overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let figment = Figment::from(Serialized::defaults(BrandvaktConfig::default()))
            .merge(Yaml::file(path));
        Self::extract_validated(figment)
    }

    fn extract_validated(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed("BRANDVAKT_").ignore(&["env"]).split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}
