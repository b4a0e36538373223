//! Read-only snapshot of a target's cache state and the signing account.

use std::fmt;

use alloy_primitives::utils::format_ether;
use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::chain::{ChainClient, InitGas};
use crate::error::BenchError;
use crate::target::{ContractTarget, TargetSummary};

#[derive(Debug, Clone, Serialize)]
pub struct TargetStatus {
    pub chain_id: u64,
    pub target: TargetSummary,
    pub cached: bool,
    pub init_gas: InitGas,
    pub signer: Address,
    pub signer_balance_wei: U256,
}

impl TargetStatus {
    /// Queries the chain without sending any transaction.
    pub async fn query<C: ChainClient>(client: &C, address: Address) -> Result<Self, BenchError> {
        let target = ContractTarget::resolve(client, address).await?;

        let chain_id = client
            .chain_id()
            .await
            .map_err(|source| BenchError::Query {
                what: "chain id",
                source,
            })?;
        let cached = client
            .codehash_is_cached(target.codehash)
            .await
            .map_err(|source| BenchError::Query {
                what: "cache state",
                source,
            })?;
        let init_gas = client
            .program_init_gas(address)
            .await
            .map_err(|source| BenchError::Query {
                what: "program init gas",
                source,
            })?;

        let signer = client.signer();
        let signer_balance_wei = client
            .balance(signer)
            .await
            .map_err(|source| BenchError::Query {
                what: "signer balance",
                source,
            })?;

        Ok(Self {
            chain_id,
            target: target.summary(),
            cached,
            init_gas,
            signer,
            signer_balance_wei,
        })
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Chain id:  {}", self.chain_id)?;
        writeln!(f, "Contract:  {}", self.target.address)?;
        writeln!(f, "Codehash:  {}", self.target.codehash)?;
        writeln!(f, "Code size: {} bytes", self.target.code_size)?;
        writeln!(f, "Cached:    {}", if self.cached { "yes" } else { "no" })?;
        writeln!(
            f,
            "Init gas:  {} (if cached: {})",
            self.init_gas.gas, self.init_gas.gas_when_cached
        )?;
        writeln!(f, "Signer:    {}", self.signer)?;
        write!(f, "Balance:   {} ETH", format_ether(self.signer_balance_wei))
    }
}
