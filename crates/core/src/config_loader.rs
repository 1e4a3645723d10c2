use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Default directory holding `Config.toml`.
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Environment prefix; nested keys use `__`, e.g. `MAESTRO_INDICATORS__POC_BINS=15`.
pub const ENV_PREFIX: &str = "MAESTRO_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from `config/` by merging defaults, TOML, JSON and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the result is invalid.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_DIR, None)
    }

    /// Loads application configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the result is invalid.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_DIR, Some(profile))
    }

    /// Loads configuration from an explicit directory.
    ///
    /// Missing files are skipped; built-in defaults fill every absent key.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the result is invalid.
    pub fn load_from(dir: impl AsRef<Path>, profile: Option<&str>) -> Result<AppConfig> {
        let dir = dir.as_ref();

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(dir.join("Config.toml")));
        if let Some(profile) = profile {
            figment = figment.merge(Toml::file(dir.join(format!("Config.{profile}.toml"))));
        }

        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file(dir.join("Config.json")))
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", dir.display()))?;

        config.validate()?;
        tracing::debug!(
            instruments = config.instruments.len(),
            timeframes = config.timeframes.len(),
            "Configuration loaded"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnomalyPolicy;
    use crate::timeframe::Interval;
    use figment::Jail;

    #[test]
    fn missing_files_fall_back_to_defaults() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::load_from(jail.directory(), None)
                .map_err(|e| e.to_string())?;
            assert_eq!(config.indicators.poc_bins, 20);
            assert_eq!(config.instruments.len(), 3);
            Ok(())
        });
    }

    #[test]
    fn toml_profile_and_env_merge_in_order() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [indicators]
                poc_bins = 15
                rvol_threshold = 1.7
                anomaly_policy = "either"

                [[timeframes]]
                interval = "1h"
                period = "30d"
                "#,
            )?;
            jail.create_file(
                "Config.fast.toml",
                r#"
                [[timeframes]]
                interval = "5m"
                period = "2d"
                "#,
            )?;
            jail.set_env("MAESTRO_INDICATORS__ROLLING_WINDOW", "30");

            let config = ConfigLoader::load_from(jail.directory(), Some("fast"))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.indicators.poc_bins, 15);
            assert!((config.indicators.rvol_threshold - 1.7).abs() < 1e-12);
            assert_eq!(config.indicators.anomaly_policy, AnomalyPolicy::Either);
            assert_eq!(config.indicators.rolling_window, 30);
            assert_eq!(config.timeframes.len(), 1);
            assert_eq!(config.timeframes[0].interval, Interval::FiveMinutes);
            Ok(())
        });
    }

    #[test]
    fn shipped_config_is_valid() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config");
        let config = ConfigLoader::load_from(dir, None).unwrap();

        assert_eq!(config.instruments.len(), 3);
        let yen = config.instruments[1].contract.unwrap();
        assert_eq!(yen.pip_size, rust_decimal::Decimal::new(1, 2));
        assert!(config.instruments[2].contract.is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Config.toml",
                r#"
                [indicators]
                rvol_threshold = 0.5
                "#,
            )?;
            assert!(ConfigLoader::load_from(jail.directory(), None).is_err());
            Ok(())
        });
    }
}
