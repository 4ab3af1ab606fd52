use crate::genesis::LOCAL_ID;
use crate::p2p::ExponentialBackoff;
use crate::snow::Parameters;
use crate::view::SamplingMode;
use crate::Result;

use config::{Config, File, FileFormat};
use serde::Deserialize;

use std::fmt;
use std::time::Duration;

/// Node settings. Missing fields take their [Default] value.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Settings {
    pub env: ENV,
    pub network_id: u32,
    /// Sample size of a polling round.
    pub k: usize,
    /// Votes needed within a sample for a conclusive round.
    pub alpha: usize,
    /// Confidence needed to accept a container without conflicts.
    pub beta1: u32,
    /// Confidence needed to accept a contested container.
    pub beta2: u32,
    pub sampling: SamplingMode,
    pub request_timeout_ms: u64,
    pub sweep_interval_ms: u64,
    /// Delay before re-polling after the first inconclusive round, doubled after each
    /// further one.
    pub retry_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            env: ENV::Development,
            network_id: LOCAL_ID,
            k: 20,
            alpha: 15,
            beta1: 15,
            beta2: 20,
            sampling: SamplingMode::Weighted,
            request_timeout_ms: 2000,
            sweep_interval_ms: 250,
            retry_backoff_ms: 100,
            max_backoff_ms: 5000,
        }
    }
}

const CONFIG_FILE_PATH: &str = "src/server/settings/Default.json";
const CONFIG_FILE_PREFIX: &str = "src/server/settings/";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum ENV {
    Testing,
    Development,
    Production,
}

impl fmt::Display for ENV {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ENV::Testing => write!(f, "Testing"),
            ENV::Production => write!(f, "Production"),
            ENV::Development => write!(f, "Development"),
        }
    }
}

impl From<&str> for ENV {
    fn from(env: &str) -> Self {
        match env {
            "Testing" => ENV::Testing,
            "Production" => ENV::Production,
            _ => ENV::Development,
        }
    }
}

impl Settings {
    /// Loads the default settings, overlaid by the optional file of the `RUN_ENV`
    /// environment (`Development` unless set).
    pub fn new() -> Result<Self> {
        let env = ENV::from(std::env::var("RUN_ENV").unwrap_or_else(|_| "Development".into()).as_str());
        let settings = Config::builder()
            .set_default("env", env.to_string())?
            .add_source(File::with_name(CONFIG_FILE_PATH))
            .add_source(File::with_name(&format!("{}{}", CONFIG_FILE_PREFIX, env)).required(false))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Loads settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(json, FileFormat::Json))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// The validated consensus parameters.
    pub fn parameters(&self) -> Result<Parameters> {
        Parameters::new(self.k, self.alpha, self.beta1, self.beta2)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(
            Duration::from_millis(self.retry_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::Error;

    #[test]
    fn test_default_file() {
        let settings = Settings::new().unwrap();
        assert_eq!(settings.network_id, LOCAL_ID);
        assert!(settings.parameters().is_ok());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings = Settings::from_json(r#"{ "k": 5, "alpha": 3, "sampling": "Uniform" }"#).unwrap();
        assert_eq!(settings.k, 5);
        assert_eq!(settings.alpha, 3);
        assert_eq!(settings.sampling, SamplingMode::Uniform);
        assert_eq!(settings.beta1, Settings::default().beta1);
        assert_eq!(settings.request_timeout(), Duration::from_millis(2000));
    }

    #[test]
    fn test_invalid_parameters() {
        let settings = Settings::from_json(r#"{ "k": 4, "alpha": 2 }"#).unwrap();
        match settings.parameters() {
            Err(Error::InvalidParameters(_)) => (),
            other => panic!("unexpected: {:?}", other),
        }
        let settings = Settings::from_json(r#"{ "beta1": 5, "beta2": 4 }"#).unwrap();
        assert!(settings.parameters().is_err());
    }
}
