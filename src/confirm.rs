//! Timeout-bounded wait for a submitted transaction to be mined.

use std::time::Duration;

use alloy_primitives::TxHash;
use log::{debug, warn};
use tokio::time;

use crate::chain::{ChainClient, Confirmation};
use crate::error::{BenchError, ChainError};
use crate::runner::Step;

/// Waits for `tx` to be mined. The outer error is a timeout and always
/// fatal; the inner one is a reverted receipt the caller may classify.
///
/// Receipt queries that fail are retried until `timeout` elapses, so a
/// dropped connection never ends the wait while the transaction is pending.
pub async fn await_receipt<C: ChainClient>(
    client: &C,
    step: Step,
    tx: TxHash,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Result<Confirmation, ChainError>, BenchError> {
    debug!("{step}: waiting for {tx}");

    match time::timeout(timeout, poll_receipt(client, tx, poll_interval)).await {
        Ok(receipt) if receipt.success => Ok(Ok(receipt)),
        Ok(receipt) => Ok(Err(ChainError::Reverted(receipt.tx_hash))),
        Err(_) => Err(BenchError::Timeout { step, tx, timeout }),
    }
}

async fn poll_receipt<C: ChainClient>(
    client: &C,
    tx: TxHash,
    poll_interval: Duration,
) -> Confirmation {
    loop {
        match client.receipt(tx).await {
            Ok(Some(receipt)) => return receipt,
            Ok(None) => {}
            Err(err) => warn!("receipt query for {tx} failed, retrying: {err}"),
        }
        time::sleep(poll_interval).await;
    }
}
