#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use alloy_primitives::{address, Address, Bytes, TxHash, B256, U256};
use stylus_cache_bench::chain::codehash;
use stylus_cache_bench::vending::COOLDOWN;
use stylus_cache_bench::{
    BenchConfig, ChainClient, ChainError, Confirmation, InitGas, VendingClient,
};
use tokio::time::Instant;

pub const TARGET: Address = address!("a6e41ffd769491a42a6e5ce453259b93983a22ef");
pub const SIGNER: Address = address!("3f1eae7d46d88f08fc2f8ed27fcb2ab183eb2d0e");

/// How a scripted transaction behaves once submitted.
#[derive(Debug, Clone)]
pub enum TxScript {
    Confirm,
    Revert,
    Reject(String),
    /// Rejected, but the cache already holds the state the call would set.
    AlreadySettled(String),
    NeverConfirm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Evict(B256),
    Cache(Address),
    Give(Address),
}

struct State {
    cached: bool,
    samples: VecDeque<Result<(InitGas, Duration), ChainError>>,
    sent: Vec<Sent>,
    pending: Vec<(TxHash, TxScript, Sent)>,
    mined: Vec<Confirmation>,
    receipt_failures: usize,
    cache_check_fails: bool,
    cupcakes: HashMap<Address, U256>,
    last_cupcake: HashMap<Address, Instant>,
}

impl State {
    fn cupcake_available(&self, user: Address) -> bool {
        self.last_cupcake
            .get(&user)
            .is_none_or(|last| last.elapsed() >= COOLDOWN)
    }
}

/// In-memory chain whose cache state follows the scripted transactions.
pub struct ScriptedChain {
    code: Bytes,
    evict: TxScript,
    cache: TxScript,
    give: TxScript,
    state: Mutex<State>,
}

impl ScriptedChain {
    pub fn new(code: &[u8]) -> Self {
        Self {
            code: Bytes::copy_from_slice(code),
            evict: TxScript::Confirm,
            cache: TxScript::Confirm,
            give: TxScript::Confirm,
            state: Mutex::new(State {
                cached: true,
                samples: VecDeque::new(),
                sent: Vec::new(),
                pending: Vec::new(),
                mined: Vec::new(),
                receipt_failures: 0,
                cache_check_fails: false,
                cupcakes: HashMap::new(),
                last_cupcake: HashMap::new(),
            }),
        }
    }

    pub fn deployed() -> Self {
        Self::new(&[0xef, 0xf0, 0x00, 0x00, 0x61, 0x73, 0x6d])
    }

    pub fn cached(self, cached: bool) -> Self {
        self.state.lock().unwrap().cached = cached;
        self
    }

    pub fn evict_with(mut self, script: TxScript) -> Self {
        self.evict = script;
        self
    }

    pub fn cache_with(mut self, script: TxScript) -> Self {
        self.cache = script;
        self
    }

    pub fn give_with(mut self, script: TxScript) -> Self {
        self.give = script;
        self
    }

    /// The next `count` receipt queries fail as if the connection dropped.
    pub fn receipt_failures(self, count: usize) -> Self {
        self.state.lock().unwrap().receipt_failures = count;
        self
    }

    pub fn cache_check_fails(self) -> Self {
        self.state.lock().unwrap().cache_check_fails = true;
        self
    }

    pub fn sample(self, gas: u64, gas_when_cached: u64, latency_ms: u64) -> Self {
        self.state.lock().unwrap().samples.push_back(Ok((
            InitGas {
                gas,
                gas_when_cached,
            },
            Duration::from_millis(latency_ms),
        )));
        self
    }

    pub fn failing_sample(self, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .samples
            .push_back(Err(ChainError::Rpc(message.to_string())));
        self
    }

    pub fn codehash(&self) -> B256 {
        codehash(&self.code)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn is_cached(&self) -> bool {
        self.state.lock().unwrap().cached
    }

    pub fn cupcakes(&self, user: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .cupcakes
            .get(&user)
            .copied()
            .unwrap_or_default()
    }

    fn submit(&self, script: &TxScript, tx: Sent) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        match script {
            TxScript::Reject(reason) => return Err(ChainError::Rpc(reason.clone())),
            TxScript::AlreadySettled(reason) => {
                state.cached = matches!(tx, Sent::Cache(_));
                return Err(ChainError::Rpc(reason.clone()));
            }
            _ => {}
        }

        state.sent.push(tx.clone());
        let hash = B256::with_last_byte(state.sent.len() as u8);
        state.pending.push((hash, script.clone(), tx));
        Ok(hash)
    }
}

impl ChainClient for ScriptedChain {
    fn signer(&self) -> Address {
        SIGNER
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(412_346)
    }

    async fn balance(&self, _account: Address) -> Result<U256, ChainError> {
        Ok(U256::from(10u64).pow(U256::from(18u64)))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ChainError> {
        if address == TARGET {
            Ok(self.code.clone())
        } else {
            Ok(Bytes::new())
        }
    }

    async fn program_init_gas(&self, _program: Address) -> Result<InitGas, ChainError> {
        let next = self.state.lock().unwrap().samples.pop_front();
        let (gas, latency) = next.unwrap_or_else(|| Err(ChainError::Rpc("no sample".into())))?;
        tokio::time::sleep(latency).await;
        Ok(gas)
    }

    async fn codehash_is_cached(&self, codehash: B256) -> Result<bool, ChainError> {
        if self.state.lock().unwrap().cache_check_fails {
            return Err(ChainError::Rpc("header not found".into()));
        }
        Ok(codehash == self.codehash() && self.is_cached())
    }

    async fn evict_codehash(&self, codehash: B256) -> Result<TxHash, ChainError> {
        self.submit(&self.evict, Sent::Evict(codehash))
    }

    async fn cache_program(&self, program: Address) -> Result<TxHash, ChainError> {
        self.submit(&self.cache, Sent::Cache(program))
    }

    async fn receipt(&self, tx: TxHash) -> Result<Option<Confirmation>, ChainError> {
        let mut state = self.state.lock().unwrap();
        if state.receipt_failures > 0 {
            state.receipt_failures -= 1;
            return Err(ChainError::Rpc("connection reset by peer".into()));
        }
        if let Some(mined) = state.mined.iter().find(|r| r.tx_hash == tx) {
            return Ok(Some(mined.clone()));
        }
        let Some((_, script, sent)) = state.pending.iter().find(|(h, ..)| *h == tx).cloned() else {
            return Err(ChainError::Rpc(format!("unknown transaction {tx}")));
        };

        let success = match script {
            TxScript::NeverConfirm => return Ok(None),
            TxScript::Confirm => {
                match sent {
                    Sent::Evict(_) => state.cached = false,
                    Sent::Cache(_) => state.cached = true,
                    Sent::Give(user) => {
                        if state.cupcake_available(user) {
                            *state.cupcakes.entry(user).or_default() += U256::from(1);
                            state.last_cupcake.insert(user, Instant::now());
                        }
                    }
                }
                true
            }
            TxScript::Revert | TxScript::Reject(_) | TxScript::AlreadySettled(_) => false,
        };

        let receipt = Confirmation {
            tx_hash: tx,
            block_number: Some(state.sent.len() as u64),
            gas_used: 21_000,
            success,
        };
        state.pending.retain(|(h, ..)| *h != tx);
        state.mined.push(receipt.clone());
        Ok(Some(receipt))
    }
}

impl VendingClient for ScriptedChain {
    async fn cupcake_balance(&self, _machine: Address, user: Address) -> Result<U256, ChainError> {
        Ok(self.cupcakes(user))
    }

    async fn cupcake_available(&self, machine: Address, user: Address) -> Result<bool, ChainError> {
        if machine != TARGET {
            return Err(ChainError::Rpc("execution reverted".into()));
        }
        Ok(self.state.lock().unwrap().cupcake_available(user))
    }

    async fn give_cupcake(&self, _machine: Address, user: Address) -> Result<TxHash, ChainError> {
        self.submit(&self.give, Sent::Give(user))
    }
}

pub fn config(lock_dir: &std::path::Path) -> BenchConfig {
    let mut config = BenchConfig::new(TARGET);
    config.lock_dir = lock_dir.to_path_buf();
    config.confirmation_timeout = Duration::from_secs(30);
    config.poll_interval = Duration::from_millis(250);
    config
}
