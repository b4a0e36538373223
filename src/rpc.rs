//! JSON-RPC implementation of [`ChainClient`] and [`VendingClient`] on top
//! of an alloy provider.

use std::str::FromStr;

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use alloy_primitives::{Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::SolCall;
use log::debug;

use crate::chain::{
    ChainClient, Confirmation, IArbWasm, IArbWasmCache, IVendingMachine, InitGas, VendingClient,
    ARB_WASM, ARB_WASM_CACHE,
};
use crate::config::BenchConfig;
use crate::error::{ChainError, ConfigError};

pub struct RpcClient {
    provider: DynProvider,
    signer: Address,
}

impl RpcClient {
    /// Connects to the configured endpoint, signing with the key loaded from
    /// the configured credential source.
    pub fn from_config(config: &BenchConfig) -> Result<Self, ConfigError> {
        let key = config.credential_source.load()?;
        let signer = PrivateKeySigner::from_str(&key).map_err(|err| ConfigError::Credential {
            source_name: config.credential_source.to_string(),
            reason: err.to_string(),
        })?;
        Self::connect(&config.rpc_endpoint, signer)
    }

    pub fn connect(endpoint: &str, signer: PrivateKeySigner) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint).map_err(|err| ConfigError::Endpoint {
            input: endpoint.to_string(),
            reason: err.to_string(),
        })?;
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        debug!("connected to {endpoint} as {address}");
        Ok(Self {
            provider,
            signer: address,
        })
    }

    async fn view(&self, to: Address, input: Vec<u8>) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(self.signer)
            .with_to(to)
            .with_input(input);
        self.provider.call(tx).await.map_err(ChainError::rpc)
    }

    async fn send(&self, to: Address, input: Vec<u8>) -> Result<TxHash, ChainError> {
        let tx = TransactionRequest::default()
            .with_from(self.signer)
            .with_to(to)
            .with_input(input);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(ChainError::rpc)?;
        debug!("submitted {}", pending.tx_hash());
        Ok(*pending.tx_hash())
    }
}

impl ChainClient for RpcClient {
    fn signer(&self) -> Address {
        self.signer
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        self.provider.get_chain_id().await.map_err(ChainError::rpc)
    }

    async fn balance(&self, account: Address) -> Result<U256, ChainError> {
        self.provider
            .get_balance(account)
            .await
            .map_err(ChainError::rpc)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        self.provider
            .get_code_at(address)
            .await
            .map_err(ChainError::rpc)
    }

    async fn program_init_gas(&self, program: Address) -> Result<InitGas, ChainError> {
        let call = IArbWasm::programInitGasCall { program };
        let out = self.view(ARB_WASM, call.abi_encode()).await?;
        let ret =
            IArbWasm::programInitGasCall::abi_decode_returns(&out).map_err(ChainError::decode)?;
        Ok(InitGas {
            gas: ret.gas,
            gas_when_cached: ret.gasWhenCached,
        })
    }

    async fn codehash_is_cached(&self, codehash: B256) -> Result<bool, ChainError> {
        let call = IArbWasmCache::codehashIsCachedCall { codehash };
        let out = self.view(ARB_WASM_CACHE, call.abi_encode()).await?;
        IArbWasmCache::codehashIsCachedCall::abi_decode_returns(&out).map_err(ChainError::decode)
    }

    async fn evict_codehash(&self, codehash: B256) -> Result<TxHash, ChainError> {
        let call = IArbWasmCache::evictCodehashCall { codehash };
        self.send(ARB_WASM_CACHE, call.abi_encode()).await
    }

    async fn cache_program(&self, program: Address) -> Result<TxHash, ChainError> {
        let call = IArbWasmCache::cacheProgramCall { addr: program };
        self.send(ARB_WASM_CACHE, call.abi_encode()).await
    }

    async fn receipt(&self, tx: TxHash) -> Result<Option<Confirmation>, ChainError> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx)
            .await
            .map_err(ChainError::rpc)?;

        Ok(receipt.map(|r| Confirmation {
            tx_hash: tx,
            block_number: r.block_number(),
            gas_used: r.gas_used(),
            success: r.status(),
        }))
    }
}

impl VendingClient for RpcClient {
    async fn cupcake_balance(&self, machine: Address, user: Address) -> Result<U256, ChainError> {
        let call = IVendingMachine::getCupcakeBalanceForCall { userAddress: user };
        let out = self.view(machine, call.abi_encode()).await?;
        IVendingMachine::getCupcakeBalanceForCall::abi_decode_returns(&out)
            .map_err(ChainError::decode)
    }

    async fn cupcake_available(&self, machine: Address, user: Address) -> Result<bool, ChainError> {
        let call = IVendingMachine::giveCupcakeToCall { userAddress: user };
        let out = self.view(machine, call.abi_encode()).await?;
        IVendingMachine::giveCupcakeToCall::abi_decode_returns(&out).map_err(ChainError::decode)
    }

    async fn give_cupcake(&self, machine: Address, user: Address) -> Result<TxHash, ChainError> {
        let call = IVendingMachine::giveCupcakeToCall { userAddress: user };
        self.send(machine, call.abi_encode()).await
    }
}
