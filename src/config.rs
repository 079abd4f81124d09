use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServerError};

const DEFAULT_PORT: u16 = 8080;
pub(crate) const DEFAULT_CLASSIFY_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// A validated TCP port.
///
/// Every way of naming a port (integer, float, string) goes through
/// `TryFrom` so that values like `3.5`, `-1` or `"abc"` are rejected before
/// any socket is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Port(u16);

impl Port {
    pub fn get(self) -> u16 {
        self.0
    }
}

fn invalid(value: impl ToString, reason: &'static str) -> ServerError {
    ServerError::InvalidPort {
        value: value.to_string(),
        reason,
    }
}

impl TryFrom<u16> for Port {
    type Error = ServerError;

    fn try_from(value: u16) -> Result<Self> {
        Ok(Port(value))
    }
}

impl TryFrom<u32> for Port {
    type Error = ServerError;

    fn try_from(value: u32) -> Result<Self> {
        u16::try_from(value)
            .map(Port)
            .map_err(|_| invalid(value, "out of range"))
    }
}

impl TryFrom<i32> for Port {
    type Error = ServerError;

    fn try_from(value: i32) -> Result<Self> {
        Port::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Port {
    type Error = ServerError;

    fn try_from(value: i64) -> Result<Self> {
        if value < 0 {
            return Err(invalid(value, "negative"));
        }
        u16::try_from(value)
            .map(Port)
            .map_err(|_| invalid(value, "out of range"))
    }
}

impl TryFrom<f64> for Port {
    type Error = ServerError;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(invalid(value, "not finite"));
        }
        if value.fract() != 0.0 {
            return Err(invalid(value, "not an integer"));
        }
        if value < 0.0 {
            return Err(invalid(value, "negative"));
        }
        if value > f64::from(u16::MAX) {
            return Err(invalid(value, "out of range"));
        }
        Ok(Port(value as u16))
    }
}

impl TryFrom<&str> for Port {
    type Error = ServerError;

    fn try_from(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        match trimmed.parse::<i64>() {
            Ok(n) => Port::try_from(n),
            Err(_) if trimmed.parse::<f64>().is_ok() => Err(invalid(value, "not an integer")),
            Err(_) => Err(invalid(value, "not a number")),
        }
    }
}

impl TryFrom<String> for Port {
    type Error = ServerError;

    fn try_from(value: String) -> Result<Self> {
        Port::try_from(value.as_str())
    }
}

/// Server configuration.
///
/// Loaded from the environment (`Config::load`) or from YAML. Every field
/// has a default so partial files are fine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub origin: String,
    pub public_dir: Option<PathBuf>,
    pub classify_timeout_ms: u64,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            origin: "*".to_string(),
            public_dir: None,
            classify_timeout_ms: DEFAULT_CLASSIFY_TIMEOUT_MS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Reads `PORT`, `ORIGIN`, `PUBLIC_DIR`, `CLASSIFY_TIMEOUT_MS` and
    /// `MAX_BODY_BYTES` over the defaults.
    pub fn load() -> Result<Self> {
        let mut cfg = Config::default();

        if let Ok(port) = std::env::var("PORT") {
            cfg.port = Port::try_from(port)?.get();
        }
        if let Ok(origin) = std::env::var("ORIGIN") {
            cfg.origin = origin;
        }
        if let Ok(dir) = std::env::var("PUBLIC_DIR") {
            cfg.public_dir = Some(PathBuf::from(dir));
        }
        if let Ok(ms) = std::env::var("CLASSIFY_TIMEOUT_MS") {
            cfg.classify_timeout_ms = ms
                .parse()
                .map_err(|_| ServerError::Config(format!("CLASSIFY_TIMEOUT_MS={ms:?}")))?;
        }
        if let Ok(max) = std::env::var("MAX_BODY_BYTES") {
            cfg.max_body_bytes = max
                .parse()
                .map_err(|_| ServerError::Config(format!("MAX_BODY_BYTES={max:?}")))?;
        }

        Ok(cfg)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml_str(&text)
    }

    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
}
