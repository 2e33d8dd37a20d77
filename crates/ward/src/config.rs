//! Configuration for the safety primitives.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::guard::GuardPolicy;
use crate::transport::duration_ms_opt;

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardConfig {
    /// Interrupt guard policy.
    pub guard: GuardPolicy,
    /// Defaults for ephemeral resources.
    pub ephemeral: EphemeralDefaults,
}

impl WardConfig {
    /// Parse a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Defaults applied to [`EphemeralSpec::from_defaults`].
///
/// [`EphemeralSpec::from_defaults`]: crate::transport::EphemeralSpec::from_defaults
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EphemeralDefaults {
    /// Directory for ephemeral objects.
    pub location: Option<String>,
    /// Name prefix for ephemeral objects.
    pub prefix: Option<String>,
    /// Server-side expiration timeout, in milliseconds when serialized.
    #[serde(with = "duration_ms_opt")]
    pub expiration_timeout: Option<Duration>,
    /// Whether scope exit removes with `force`.
    pub force: bool,
}

impl Default for EphemeralDefaults {
    fn default() -> Self {
        Self {
            location: None,
            prefix: None,
            expiration_timeout: None,
            force: true,
        }
    }
}
