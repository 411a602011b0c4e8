//! Runtime configuration.

use crate::domain::ports::ScriptTag;
use crate::error::{BoostError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Settings for talking to the backend and the hosted checkout.
///
/// Layered from an optional `franchiso.toml` (or an explicit file) and then
/// `FRANCHISO_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::api_url")]
    pub api_url: String,

    #[serde(default = "defaults::checkout_script_url")]
    pub checkout_script_url: String,

    #[serde(default)]
    pub client_key: Option<String>,

    #[serde(default = "defaults::request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: defaults::api_url(),
            checkout_script_url: defaults::checkout_script_url(),
            client_key: None,
            request_timeout_secs: defaults::request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("franchiso").required(false),
        };
        config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("FRANCHISO"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| BoostError::Config(e.to_string()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn script_tag(&self) -> ScriptTag {
        ScriptTag::new(self.checkout_script_url.clone(), self.client_key.clone())
    }
}

mod defaults {
    pub fn api_url() -> String {
        "http://localhost:8080".into()
    }

    pub fn checkout_script_url() -> String {
        "https://app.sandbox.midtrans.com/snap/snap.js".into()
    }

    pub fn request_timeout_secs() -> u64 {
        30
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.script_tag().client_key, None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "api_url = \"https://api.example.test\"").unwrap();
        writeln!(file, "client_key = \"SB-Mid-client-123\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.api_url, "https://api.example.test");
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(
            config.script_tag().client_key.as_deref(),
            Some("SB-Mid-client-123")
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            Config::load(Some(missing.as_path())),
            Err(BoostError::Config(_))
        ));
    }
}
