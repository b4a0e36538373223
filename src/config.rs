//! Run configuration.
//!
//! Settings come from up to three layers: command-line flags (which clap
//! also fills from the environment), an optional TOML file, and built-in
//! defaults. Each layer is a [`ConfigLayer`]; [`ConfigLayer::over`] stacks
//! them and [`ConfigLayer::finish`] produces the final [`BenchConfig`].

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_RPC_ENDPOINT: &str = "http://localhost:8547";
pub const DEFAULT_CREDENTIAL_ENV: &str = "PRIVATE_KEY";
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Where the signing key is read from. The key itself never lives in
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum CredentialSource {
    /// Hex private key held in an environment variable.
    Env(String),
    /// Hex private key stored in a file.
    File(PathBuf),
}

impl CredentialSource {
    /// Reads the raw key material, trimmed of surrounding whitespace.
    pub fn load(&self) -> Result<String, ConfigError> {
        let raw = match self {
            Self::Env(name) => std::env::var(name).map_err(|err| ConfigError::Credential {
                source_name: self.to_string(),
                reason: err.to_string(),
            })?,
            Self::File(path) => fs::read_to_string(path).map_err(|err| ConfigError::Credential {
                source_name: self.to_string(),
                reason: err.to_string(),
            })?,
        };

        let key = raw.trim();
        if key.is_empty() {
            return Err(ConfigError::Credential {
                source_name: self.to_string(),
                reason: "empty key".to_string(),
            });
        }
        Ok(key.to_string())
    }
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::Env(DEFAULT_CREDENTIAL_ENV.to_string())
    }
}

impl FromStr for CredentialSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some(("env", name)) if !name.is_empty() => Ok(Self::Env(name.to_string())),
            Some(("file", path)) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
            _ => Err(ConfigError::CredentialSource(s.to_string())),
        }
    }
}

impl TryFrom<String> for CredentialSource {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(name) => write!(f, "env:{name}"),
            Self::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Which measured axis decides the headline verdict of a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictAxis {
    #[default]
    Gas,
    Latency,
    Both,
}

impl fmt::Display for VerdictAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gas => "gas",
            Self::Latency => "latency",
            Self::Both => "both",
        })
    }
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub target_address: Address,
    pub rpc_endpoint: String,
    pub credential_source: CredentialSource,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub verdict_axis: VerdictAxis,
    pub lock_dir: PathBuf,
}

impl BenchConfig {
    pub fn new(target_address: Address) -> Self {
        Self {
            target_address,
            rpc_endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            credential_source: CredentialSource::default(),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            verdict_axis: VerdictAxis::default(),
            lock_dir: std::env::temp_dir(),
        }
    }
}

/// One partial source of settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub target_address: Option<Address>,
    pub rpc_endpoint: Option<String>,
    pub credential_source: Option<CredentialSource>,
    pub confirmation_timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub verdict_axis: Option<VerdictAxis>,
    pub lock_dir: Option<PathBuf>,
}

impl ConfigLayer {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Stacks `self` on top of `lower`: fields set here win.
    pub fn over(self, lower: Self) -> Self {
        Self {
            target_address: self.target_address.or(lower.target_address),
            rpc_endpoint: self.rpc_endpoint.or(lower.rpc_endpoint),
            credential_source: self.credential_source.or(lower.credential_source),
            confirmation_timeout_secs: self
                .confirmation_timeout_secs
                .or(lower.confirmation_timeout_secs),
            poll_interval_ms: self.poll_interval_ms.or(lower.poll_interval_ms),
            verdict_axis: self.verdict_axis.or(lower.verdict_axis),
            lock_dir: self.lock_dir.or(lower.lock_dir),
        }
    }

    /// Fills unset fields with defaults. Only the target address is required.
    pub fn finish(self) -> Result<BenchConfig, ConfigError> {
        let target = self.target_address.ok_or(ConfigError::MissingTarget)?;
        let mut config = BenchConfig::new(target);

        if let Some(endpoint) = self.rpc_endpoint {
            config.rpc_endpoint = endpoint;
        }
        if let Some(source) = self.credential_source {
            config.credential_source = source;
        }
        if let Some(secs) = self.confirmation_timeout_secs {
            config.confirmation_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval = Duration::from_millis(ms.max(1));
        }
        if let Some(axis) = self.verdict_axis {
            config.verdict_axis = axis;
        }
        if let Some(dir) = self.lock_dir {
            config.lock_dir = dir;
        }
        Ok(config)
    }
}

pub fn parse_address(input: &str) -> Result<Address, ConfigError> {
    Address::from_str(input.trim()).map_err(|err| ConfigError::Address {
        input: input.to_string(),
        reason: err.to_string(),
    })
}
