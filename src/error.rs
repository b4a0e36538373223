use std::io;
use std::path::PathBuf;
use std::time::Duration;

use alloy_primitives::{Address, TxHash, B256};
use thiserror::Error;

use crate::report::Phase;
use crate::runner::Step;

/// Failure reported by the remote chain for a single RPC interaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("rpc request failed: {0}")]
    Rpc(String),

    #[error("transaction {0} reverted")]
    Reverted(TxHash),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ChainError {
    pub fn rpc(err: impl std::fmt::Display) -> Self {
        Self::Rpc(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Invalid or missing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no target address configured (pass --target or set STYLUS_TARGET)")]
    MissingTarget,

    #[error("invalid address `{input}`: {reason}")]
    Address { input: String, reason: String },

    #[error("invalid rpc endpoint `{input}`: {reason}")]
    Endpoint { input: String, reason: String },

    #[error("invalid credential source `{0}` (expected env:NAME or file:PATH)")]
    CredentialSource(String),

    #[error("credential from {source_name} unavailable: {reason}")]
    Credential { source_name: String, reason: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Fatal outcome of a benchmark run, status query or cupcake request.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("resolve target {address}: {reason}")]
    Resolution { address: Address, reason: String },

    #[error("evict codehash {codehash}: {source}")]
    Eviction { codehash: B256, source: ChainError },

    #[error("cache program {address}: {source}")]
    Caching { address: Address, source: ChainError },

    #[error("{phase} measurement: {source}")]
    Measurement { phase: Phase, source: ChainError },

    #[error("{step}: transaction {tx} not confirmed within {timeout:?}")]
    Timeout {
        step: Step,
        tx: TxHash,
        timeout: Duration,
    },

    #[error("query {what}: {source}")]
    Query {
        what: &'static str,
        source: ChainError,
    },

    #[error("give cupcake to {user}: {source}")]
    Dispense { user: Address, source: ChainError },

    #[error(
        "target {address} is locked by another run (pid {}, {})",
        holder.map_or_else(|| "unknown".to_string(), |pid| pid.to_string()),
        path.display()
    )]
    Locked {
        address: Address,
        path: PathBuf,
        holder: Option<u32>,
    },

    #[error("lock file {}: {source}", path.display())]
    LockFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BenchError {
    /// Step of the benchmark workflow the error aborted, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            Self::Resolution { .. } => Some(Step::Resolve),
            Self::Eviction { .. } => Some(Step::Evict),
            Self::Caching { .. } => Some(Step::Cache),
            Self::Measurement {
                phase: Phase::Cold, ..
            } => Some(Step::MeasureCold),
            Self::Measurement {
                phase: Phase::Warm, ..
            } => Some(Step::MeasureWarm),
            Self::Timeout { step, .. } => Some(*step),
            Self::Dispense { .. } => Some(Step::Give),
            Self::Query { .. } | Self::Locked { .. } | Self::LockFile { .. } | Self::Config(_) => {
                None
            }
        }
    }
}
