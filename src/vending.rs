//! Client for the cupcake vending machine deployed as a Stylus program.
//!
//! The machine hands each user at most one cupcake every five seconds.
//! During the cooldown `giveCupcakeTo` still succeeds but returns `false`
//! and leaves the balance unchanged.

use std::fmt;
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use log::{info, warn};
use serde::Serialize;

use crate::chain::VendingClient;
use crate::config::BenchConfig;
use crate::confirm;
use crate::error::BenchError;
use crate::runner::Step;
use crate::target::ContractTarget;

pub const COOLDOWN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GiveOutcome {
    Dispensed {
        tx_hash: TxHash,
        block_number: Option<u64>,
        balance: U256,
    },
    /// Nothing was dispensed because the user's cooldown is still running.
    CoolingDown { balance: U256 },
}

impl GiveOutcome {
    pub fn balance(&self) -> U256 {
        match self {
            Self::Dispensed { balance, .. } | Self::CoolingDown { balance } => *balance,
        }
    }
}

impl fmt::Display for GiveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispensed {
                tx_hash, balance, ..
            } => write!(f, "cupcake dispensed in {tx_hash}, balance {balance}"),
            Self::CoolingDown { balance } => write!(
                f,
                "too many cupcakes: wait at least {}s between cupcakes, balance {balance}",
                COOLDOWN.as_secs()
            ),
        }
    }
}

pub struct VendingMachine<'a, C> {
    client: &'a C,
    config: &'a BenchConfig,
}

impl<'a, C: VendingClient> VendingMachine<'a, C> {
    /// Talks to the machine deployed at the configured target address.
    pub fn new(client: &'a C, config: &'a BenchConfig) -> Self {
        Self { client, config }
    }

    pub fn address(&self) -> Address {
        self.config.target_address
    }

    pub async fn balance_of(&self, user: Address) -> Result<U256, BenchError> {
        self.client
            .cupcake_balance(self.address(), user)
            .await
            .map_err(|source| BenchError::Query {
                what: "cupcake balance",
                source,
            })
    }

    /// Requests a cupcake for `user`, waits for the transaction to be mined
    /// and re-reads the balance.
    pub async fn give(&self, user: Address) -> Result<GiveOutcome, BenchError> {
        ContractTarget::resolve(self.client, self.address()).await?;

        let before = self.balance_of(user).await?;
        let available = self
            .client
            .cupcake_available(self.address(), user)
            .await
            .map_err(|source| BenchError::Query {
                what: "cupcake availability",
                source,
            })?;
        if !available {
            warn!("{user} received a cupcake less than {COOLDOWN:?} ago");
            return Ok(GiveOutcome::CoolingDown { balance: before });
        }

        info!("giving {user} a cupcake");
        let dispense_err = |source| BenchError::Dispense { user, source };
        let tx = self
            .client
            .give_cupcake(self.address(), user)
            .await
            .map_err(dispense_err)?;
        let receipt = confirm::await_receipt(
            self.client,
            Step::Give,
            tx,
            self.config.confirmation_timeout,
            self.config.poll_interval,
        )
        .await?
        .map_err(dispense_err)?;

        let balance = self.balance_of(user).await?;
        if balance <= before {
            warn!("{tx} was mined inside the cooldown, nothing dispensed");
            return Ok(GiveOutcome::CoolingDown { balance });
        }

        Ok(GiveOutcome::Dispensed {
            tx_hash: receipt.tx_hash,
            block_number: receipt.block_number,
            balance,
        })
    }
}
