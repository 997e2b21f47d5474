use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GlueError, GlueResult};

/// Client configuration, usually read from a `glue.toml`:
///
/// ```toml
/// [app]
/// name = "pricing-service"
///
/// [handshake]
/// timeout_ms = 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlueConfig {
    pub app: AppInfo,

    #[serde(default)]
    pub handshake: HandshakeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppInfo {
    /// Name the application announces itself with
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// How long to wait for the initialized state
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

pub fn default_timeout_ms() -> u64 {
    30_000
}

impl GlueConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app: AppInfo { name: app_name.into() },
            handshake: HandshakeConfig::default(),
        }
    }

    pub fn from_toml_str(source: &str) -> GlueResult<Self> {
        let config: GlueConfig = toml::from_str(source).map_err(|err| GlueError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> GlueResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)
            .map_err(|err| GlueError::Config(format!("cannot read {}: {err}", path.display())))?;
        log::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake.timeout_ms)
    }

    fn validate(&self) -> GlueResult<()> {
        if self.app.name.trim().is_empty() {
            return Err(GlueError::Config("app.name must not be empty".into()));
        }
        if self.app.name.contains('\0') {
            return Err(GlueError::Config("app.name must not contain NUL bytes".into()));
        }
        if self.handshake.timeout_ms == 0 {
            return Err(GlueError::Config("handshake.timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
