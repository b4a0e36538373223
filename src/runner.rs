//! The cold/warm cache benchmark workflow.
//!
//! A run executes five strictly sequential steps against one target:
//! resolve its codehash, evict it from the program cache, measure cold
//! init gas, cache it, and measure warm init gas. Each state-mutating step
//! waits for its transaction to be mined before the next step starts.

use std::fmt;
use std::time::Duration;

use alloy_primitives::TxHash;
use log::{debug, info, warn};
use tokio::time::Instant;

use crate::chain::{ChainClient, Confirmation, InitGas};
use crate::config::BenchConfig;
use crate::confirm;
use crate::error::{BenchError, ChainError};
use crate::lock::TargetLock;
use crate::report::{BenchmarkReport, Phase, RunMeta, StepOutcome};
use crate::target::ContractTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Resolve,
    Evict,
    MeasureCold,
    Cache,
    MeasureWarm,
    /// Cupcake request; not part of the benchmark workflow.
    Give,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Resolve => "resolve",
            Self::Evict => "evict",
            Self::MeasureCold => "measure cold",
            Self::Cache => "cache",
            Self::MeasureWarm => "measure warm",
            Self::Give => "give cupcake",
        })
    }
}

pub struct CacheBenchRunner<'a, C> {
    client: &'a C,
    config: &'a BenchConfig,
}

impl<'a, C: ChainClient> CacheBenchRunner<'a, C> {
    pub fn new(client: &'a C, config: &'a BenchConfig) -> Self {
        Self { client, config }
    }

    /// Runs the full workflow. No report is produced unless every step
    /// succeeds or soft-fails.
    pub async fn run(&self) -> Result<BenchmarkReport, BenchError> {
        let _lock = TargetLock::acquire(&self.config.lock_dir, self.config.target_address)?;

        info!("resolving target {}", self.config.target_address);
        let target = ContractTarget::resolve(self.client, self.config.target_address).await?;
        info!("codehash {}", target.codehash);

        let chain_id = match self.client.chain_id().await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("could not read chain id: {err}");
                None
            }
        };

        let eviction = self.evict(&target).await?;
        let cold = self.measure(&target, Phase::Cold).await?;
        let caching = self.cache(&target).await?;
        let warm = self.measure(&target, Phase::Warm).await?;

        Ok(BenchmarkReport::new(
            RunMeta::new(&self.config.rpc_endpoint, chain_id),
            target.summary(),
            eviction,
            caching,
            cold,
            warm,
            self.config.verdict_axis,
        ))
    }

    async fn evict(&self, target: &ContractTarget) -> Result<StepOutcome, BenchError> {
        info!("evicting {} from the program cache", target.codehash);
        let result = match self.client.evict_codehash(target.codehash).await {
            Ok(tx) => self.confirm(Step::Evict, tx).await?,
            Err(err) => Err(err),
        };

        match result {
            Ok(receipt) => {
                info!("eviction confirmed in {}", receipt.tx_hash);
                Ok(receipt.into())
            }
            Err(err) => match self.client.codehash_is_cached(target.codehash).await {
                Ok(false) => {
                    warn!("eviction failed, program already evicted: {err}");
                    Ok(StepOutcome::Skipped {
                        reason: err.to_string(),
                    })
                }
                Ok(true) => Err(BenchError::Eviction {
                    codehash: target.codehash,
                    source: err,
                }),
                Err(check) => {
                    debug!("cache state check after failed eviction: {check}");
                    Err(BenchError::Eviction {
                        codehash: target.codehash,
                        source: err,
                    })
                }
            },
        }
    }

    async fn cache(&self, target: &ContractTarget) -> Result<StepOutcome, BenchError> {
        info!("caching program {}", target.address);
        let result = match self.client.cache_program(target.address).await {
            Ok(tx) => self.confirm(Step::Cache, tx).await?,
            Err(err) => Err(err),
        };

        match result {
            Ok(receipt) => {
                info!("caching confirmed in {}", receipt.tx_hash);
                Ok(receipt.into())
            }
            Err(err) => match self.client.codehash_is_cached(target.codehash).await {
                Ok(true) => {
                    warn!("caching failed, program already cached: {err}");
                    Ok(StepOutcome::Skipped {
                        reason: err.to_string(),
                    })
                }
                Ok(false) => Err(BenchError::Caching {
                    address: target.address,
                    source: err,
                }),
                Err(check) => {
                    debug!("cache state check after failed caching: {check}");
                    Err(BenchError::Caching {
                        address: target.address,
                        source: err,
                    })
                }
            },
        }
    }

    async fn measure(
        &self,
        target: &ContractTarget,
        phase: Phase,
    ) -> Result<(InitGas, Duration), BenchError> {
        info!("measuring {phase} program init gas");
        let start = Instant::now();
        let gas = self
            .client
            .program_init_gas(target.address)
            .await
            .map_err(|source| BenchError::Measurement { phase, source })?;
        let latency = start.elapsed();

        info!(
            "{phase}: init gas {}, if cached {}, {:.2} ms",
            gas.gas,
            gas.gas_when_cached,
            latency.as_secs_f64() * 1000.0
        );
        Ok((gas, latency))
    }

    async fn confirm(
        &self,
        step: Step,
        tx: TxHash,
    ) -> Result<Result<Confirmation, ChainError>, BenchError> {
        confirm::await_receipt(
            self.client,
            step,
            tx,
            self.config.confirmation_timeout,
            self.config.poll_interval,
        )
        .await
    }
}
