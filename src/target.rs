use alloy_primitives::{Address, Bytes, B256};
use log::debug;
use serde::Serialize;

use crate::chain::{self, ChainClient};
use crate::error::BenchError;

/// The deployed program under test.
#[derive(Debug, Clone)]
pub struct ContractTarget {
    pub address: Address,
    pub code: Bytes,
    pub codehash: B256,
}

impl ContractTarget {
    /// Fetches the code at `address` and derives its cache key.
    pub async fn resolve<C: ChainClient>(client: &C, address: Address) -> Result<Self, BenchError> {
        let code = client
            .code_at(address)
            .await
            .map_err(|err| BenchError::Resolution {
                address,
                reason: err.to_string(),
            })?;

        if code.is_empty() {
            return Err(BenchError::Resolution {
                address,
                reason: "no code deployed at address".to_string(),
            });
        }

        let codehash = chain::codehash(&code);
        debug!("resolved {address}: {} bytes, codehash {codehash}", code.len());
        Ok(Self {
            address,
            code,
            codehash,
        })
    }

    pub fn summary(&self) -> TargetSummary {
        TargetSummary {
            address: self.address,
            codehash: self.codehash,
            code_size: self.code.len(),
        }
    }
}

/// Identity of the target as recorded in reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSummary {
    pub address: Address,
    pub codehash: B256,
    pub code_size: usize,
}
