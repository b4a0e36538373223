//! Remote operations the benchmark needs from an Arbitrum chain.
//!
//! Program caching is managed through two precompiles: `ArbWasm` reports
//! initialization gas for a deployed program and `ArbWasmCache` inserts or
//! evicts programs from the node's compiled-code cache. Cache entries are
//! keyed by the keccak256 hash of the deployed bytecode.

use std::future::Future;

use alloy_primitives::{address, keccak256, Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::sol;
use serde::Serialize;

use crate::error::ChainError;

pub const ARB_WASM: Address = address!("0000000000000000000000000000000000000071");
pub const ARB_WASM_CACHE: Address = address!("0000000000000000000000000000000000000072");

sol! {
    interface IArbWasm {
        function programInitGas(address program) external view returns (uint64 gas, uint64 gasWhenCached);
    }

    interface IArbWasmCache {
        function evictCodehash(bytes32 codehash) external;
        function cacheProgram(address addr) external;
        function codehashIsCached(bytes32 codehash) external view returns (bool);
    }

    interface IVendingMachine {
        function giveCupcakeTo(address userAddress) external returns (bool);
        function getCupcakeBalanceFor(address userAddress) external view returns (uint256);
    }
}

/// Content hash used as the program cache key.
pub fn codehash(code: &[u8]) -> B256 {
    keccak256(code)
}

/// Result of an `ArbWasm.programInitGas` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitGas {
    /// Gas charged to initialize the program in its current cache state.
    pub gas: u64,
    /// Gas the same initialization would cost if the program were cached.
    pub gas_when_cached: u64,
}

/// Mined receipt of a state-mutating transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub success: bool,
}

/// Chain access used by the benchmark runner and status query.
///
/// Transaction-sending methods return as soon as the node accepts the
/// transaction; confirmation is observed separately through [`receipt`].
///
/// [`receipt`]: ChainClient::receipt
pub trait ChainClient {
    /// Address that signs state-mutating transactions.
    fn signer(&self) -> Address;

    fn chain_id(&self) -> impl Future<Output = Result<u64, ChainError>> + Send;

    fn balance(&self, account: Address) -> impl Future<Output = Result<U256, ChainError>> + Send;

    /// Deployed bytecode at `address`; empty when nothing is deployed.
    fn code_at(&self, address: Address) -> impl Future<Output = Result<Bytes, ChainError>> + Send;

    fn program_init_gas(
        &self,
        program: Address,
    ) -> impl Future<Output = Result<InitGas, ChainError>> + Send;

    fn codehash_is_cached(
        &self,
        codehash: B256,
    ) -> impl Future<Output = Result<bool, ChainError>> + Send;

    fn evict_codehash(
        &self,
        codehash: B256,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    fn cache_program(
        &self,
        program: Address,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;

    /// Receipt for `tx`, or `None` while it is still pending.
    fn receipt(
        &self,
        tx: TxHash,
    ) -> impl Future<Output = Result<Option<Confirmation>, ChainError>> + Send;
}

/// Calls into the cupcake vending machine contract.
pub trait VendingClient: ChainClient {
    fn cupcake_balance(
        &self,
        machine: Address,
        user: Address,
    ) -> impl Future<Output = Result<U256, ChainError>> + Send;

    /// Simulates `giveCupcakeTo`; `false` while the user's cooldown is active.
    fn cupcake_available(
        &self,
        machine: Address,
        user: Address,
    ) -> impl Future<Output = Result<bool, ChainError>> + Send;

    fn give_cupcake(
        &self,
        machine: Address,
        user: Address,
    ) -> impl Future<Output = Result<TxHash, ChainError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;
    use alloy_sol_types::SolCall;

    #[test]
    fn codehash_is_keccak_of_bytecode() {
        assert_eq!(
            codehash(&[]),
            b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
        );
    }

    #[test]
    fn precompile_calls_encode_single_word_arguments() {
        let cache = IArbWasmCache::cacheProgramCall {
            addr: ARB_WASM,
        }
        .abi_encode();
        assert_eq!(cache.len(), 4 + 32);
        assert_eq!(cache[..4], IArbWasmCache::cacheProgramCall::SELECTOR);

        let evict = IArbWasmCache::evictCodehashCall {
            codehash: B256::repeat_byte(0x11),
        }
        .abi_encode();
        assert_eq!(&evict[4..], B256::repeat_byte(0x11).as_slice());
    }

    #[test]
    fn init_gas_returns_decode_both_words() {
        let mut data = vec![0u8; 64];
        data[24..32].copy_from_slice(&50_000u64.to_be_bytes());
        data[56..64].copy_from_slice(&3_000u64.to_be_bytes());

        let ret = IArbWasm::programInitGasCall::abi_decode_returns(&data).unwrap();
        assert_eq!(ret.gas, 50_000);
        assert_eq!(ret.gasWhenCached, 3_000);
    }

    #[test]
    fn cupcake_calls_round_trip_through_the_abi() {
        let user = address!("3f1eae7d46d88f08fc2f8ed27fcb2ab183eb2d0e");
        let give = IVendingMachine::giveCupcakeToCall { userAddress: user }.abi_encode();
        assert_eq!(give[..4], IVendingMachine::giveCupcakeToCall::SELECTOR);
        assert_eq!(&give[16..], user.as_slice());

        let mut word = [0u8; 32];
        word[31] = 1;
        assert!(IVendingMachine::giveCupcakeToCall::abi_decode_returns(&word).unwrap());

        word[31] = 7;
        assert_eq!(
            IVendingMachine::getCupcakeBalanceForCall::abi_decode_returns(&word).unwrap(),
            U256::from(7)
        );
    }
}
