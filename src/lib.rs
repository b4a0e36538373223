//! Cold vs warm program-cache benchmarks for Arbitrum Stylus contracts.
//!
//! The [`CacheBenchRunner`] evicts a deployed program from the node's
//! compiled-code cache, measures its init gas, caches it again and measures
//! once more, producing a [`BenchmarkReport`]. [`VendingMachine`] drives the
//! cupcake contract that serves as the usual benchmark target.

pub mod chain;
pub mod config;
pub mod confirm;
pub mod error;
pub mod lock;
pub mod report;
pub mod rpc;
pub mod runner;
pub mod status;
pub mod target;
pub mod vending;

pub use chain::{ChainClient, Confirmation, InitGas, VendingClient};
pub use config::{BenchConfig, ConfigLayer, CredentialSource, VerdictAxis};
pub use error::{BenchError, ChainError, ConfigError};
pub use report::{BenchmarkReport, CacheMeasurement, Classification, Phase, StepOutcome};
pub use rpc::RpcClient;
pub use runner::{CacheBenchRunner, Step};
pub use status::TargetStatus;
pub use vending::{GiveOutcome, VendingMachine};
