mod backend;
mod basic;
mod browser;

pub use backend::BackendConfig;
pub use basic::BasicConfig;
pub use browser::{BrowsePath, BrowserConfig};

use crate::error::UpstairsError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Backend location and logging (see `basic` table in upstairs.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// HTTP client tuning (see `backend` table in upstairs.toml).
    #[serde(default)]
    pub backend: BackendConfig,

    /// What the browser binary expands on startup (see `browser` table).
    #[serde(default)]
    pub browser: BrowserConfig,
}

pub const DEFAULT_CONFIG_FILE: &str = "upstairs.toml";
const ENV_PREFIX: &str = "UPSTAIRS_";

impl Config {
    /// Builds a Figment that merges defaults, an optional TOML file and
    /// `UPSTAIRS_`-prefixed environment variables (`__` splits tables, e.g.
    /// `UPSTAIRS_BASIC__API_ROOT`).
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        let path = path.as_ref();
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if path.is_file() {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads `upstairs.toml` from the working directory if present.
    pub fn load() -> Result<Self, UpstairsError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, UpstairsError> {
        let cfg: Self = Self::figment(path).extract()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), UpstairsError> {
        if self.basic.api_root.cannot_be_a_base() {
            return Err(UpstairsError::InvalidApiRoot(
                self.basic.api_root.to_string(),
            ));
        }
        if self.backend.timeout_secs == 0 {
            return Err(UpstairsError::Validation(
                "backend.timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_file() {
        Jail::expect_with(|jail| {
            let cfg = Config::load_from(jail.directory().join("missing.toml"))
                .expect("defaults are valid");
            assert_eq!(cfg.basic.api_root.as_str(), "http://localhost:8080/api/");
            assert_eq!(cfg.basic.loglevel, "info");
            assert_eq!(cfg.backend.retry_max_times, 2);
            assert!(cfg.browser.expand.is_empty());
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "upstairs.toml",
                r#"
                [basic]
                api_root = "https://admin.example.test/app/api/"

                [browser]
                expand = ["hr", "hr/public"]
                "#,
            )?;
            jail.set_env("UPSTAIRS_BACKEND__RETRY_MAX_TIMES", "5");

            let cfg = Config::load_from("upstairs.toml").expect("valid config");
            assert_eq!(
                cfg.basic.api_root.as_str(),
                "https://admin.example.test/app/api/"
            );
            assert_eq!(cfg.backend.retry_max_times, 5);
            assert_eq!(cfg.browser.paths().len(), 2);
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("upstairs.toml", "[backend]\ntimeout_secs = 0\n")?;
            let err = Config::load_from("upstairs.toml").expect_err("zero timeout");
            assert!(matches!(err, UpstairsError::Validation(_)));
            Ok(())
        });
    }
}
