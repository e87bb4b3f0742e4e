#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use snapshot_scores::abi;
use snapshot_scores::error::{Result, ScoreError};
use snapshot_scores::infra::multicall::starknet;
use snapshot_scores::infra::multicall::{BlockTag, ReadProvider, StarknetCall};
use snapshot_scores::infra::ProviderFactory;
use tokio::sync::Mutex;

pub const ONE_TOKEN: u64 = 1_000_000_000_000_000_000;
pub const BLOCK_NUMBER: u64 = 19_000_000;

/// One aggregate request as the chain saw it.
#[derive(Debug, Clone)]
pub struct RecordedPage {
    /// Order in which the page reached the provider.
    pub index: usize,
    pub to: String,
    pub data: Bytes,
    pub calldata: Vec<String>,
    pub calls: usize,
    pub block: BlockTag,
}

/// In-memory aggregator for both chain families.
///
/// EVM pages answer `balanceOf` and `getEthBalance`; Starknet pages answer
/// `balance_of`, `name`, `decimals`, `pair`, `reserves` and `supply_info`.
/// Anything else reverts the page. Balances default to `last address byte * 1e18` unless overridden.
#[derive(Default)]
pub struct MockProvider {
    balances: HashMap<U256, U256>,
    delays_ms: HashMap<usize, u64>,
    failing: HashSet<usize>,
    started: AtomicUsize,
    pages: Mutex<Vec<RecordedPage>>,
    completed: Mutex<Vec<usize>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, account: &str, balance: U256) -> Self {
        let key = snapshot_scores::types::parse_u256(account).expect("account must parse");
        self.balances.insert(key, balance);
        self
    }

    /// Delays the `index`-th page to arrive before answering it.
    pub fn with_delay(mut self, index: usize, ms: u64) -> Self {
        self.delays_ms.insert(index, ms);
        self
    }

    pub fn failing_page(mut self, index: usize) -> Self {
        self.failing.insert(index);
        self
    }

    pub async fn pages(&self) -> Vec<RecordedPage> {
        self.pages.lock().await.clone()
    }

    pub async fn page_sizes(&self) -> Vec<usize> {
        let mut pages = self.pages().await;
        pages.sort_by_key(|p| p.index);
        pages.iter().map(|p| p.calls).collect()
    }

    pub async fn completion_order(&self) -> Vec<usize> {
        self.completed.lock().await.clone()
    }

    pub fn request_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn balance(&self, account: U256) -> U256 {
        self.balances
            .get(&account)
            .copied()
            .unwrap_or_else(|| U256::from(account.as_limbs()[0] & 0xff) * U256::from(ONE_TOKEN))
    }

    async fn settle(&self, index: usize) -> Result<()> {
        if let Some(ms) = self.delays_ms.get(&index) {
            tokio::time::sleep(Duration::from_millis(*ms)).await;
        }
        self.completed.lock().await.push(index);
        if self.failing.contains(&index) {
            return Err(ScoreError::RpcError("execution reverted".to_string()));
        }
        Ok(())
    }

    fn answer_evm(&self, data: &[u8]) -> Result<Bytes> {
        let account = if data.starts_with(&abi::balanceOfCall::SELECTOR) {
            abi::balanceOfCall::abi_decode(data, true)
                .map_err(|err| ScoreError::RpcError(err.to_string()))?
                .account
        } else if data.starts_with(&abi::getEthBalanceCall::SELECTOR) {
            abi::getEthBalanceCall::abi_decode(data, true)
                .map_err(|err| ScoreError::RpcError(err.to_string()))?
                .addr
        } else {
            return Err(ScoreError::RpcError("execution reverted".to_string()));
        };
        let balance = self.balance(U256::from_be_slice(account.as_slice()));
        Ok(Bytes::from(balance.abi_encode()))
    }

    fn answer_starknet(&self, selector: U256, data: &[U256]) -> Result<Vec<U256>> {
        if selector == starknet::selector("balance_of") {
            let balance = self.balance(data[0]);
            let low = balance & (U256::MAX >> 128);
            return Ok(vec![low, balance >> 128]);
        }
        if selector == starknet::selector("name") {
            return Ok(vec![starknet::encode_short_string("Vote Token").expect("short string")]);
        }
        if selector == starknet::selector("decimals") {
            return Ok(vec![U256::from(18)]);
        }
        if selector == starknet::selector("pair") {
            return Ok(vec![U256::from(1), U256::from(2)]);
        }
        if selector == starknet::selector("reserves") {
            return Ok(vec![U256::from(0x12), U256::from(0x1)]);
        }
        if selector == starknet::selector("supply_info") {
            return Ok(vec![U256::from(7), U256::from(1), U256::from(18)]);
        }
        Err(ScoreError::RpcError("entry point not found".to_string()))
    }
}

#[async_trait(?Send)]
impl ReadProvider for MockProvider {
    async fn eth_call(&self, to: Address, data: Bytes, block: BlockTag) -> Result<Bytes> {
        let index = self.started.fetch_add(1, Ordering::SeqCst);
        let request = abi::aggregateCall::abi_decode(&data, true)
            .map_err(|err| ScoreError::RpcError(err.to_string()))?;
        self.pages.lock().await.push(RecordedPage {
            index,
            to: to.to_string(),
            data: data.clone(),
            calldata: Vec::new(),
            calls: request.calls.len(),
            block,
        });
        self.settle(index).await?;

        let returns = request
            .calls
            .iter()
            .map(|call| self.answer_evm(&call.callData))
            .collect::<Result<Vec<_>>>()?;
        Ok(Bytes::from((U256::from(BLOCK_NUMBER), returns).abi_encode_params()))
    }

    async fn starknet_call(&self, call: &StarknetCall, block: BlockTag) -> Result<Vec<String>> {
        let index = self.started.fetch_add(1, Ordering::SeqCst);
        let felts = call
            .calldata
            .iter()
            .map(|felt| starknet::parse_felt(felt))
            .collect::<Result<Vec<_>>>()?;
        let count = felts[0].as_limbs()[0] as usize;
        self.pages.lock().await.push(RecordedPage {
            index,
            to: call.contract_address.clone(),
            data: Bytes::new(),
            calldata: call.calldata.clone(),
            calls: count,
            block,
        });
        self.settle(index).await?;

        let mut out = vec![U256::from(BLOCK_NUMBER), U256::from(count)];
        let mut cursor = 1;
        for _ in 0..count {
            let selector = felts[cursor + 1];
            let len = felts[cursor + 2].as_limbs()[0] as usize;
            let args = &felts[cursor + 3..cursor + 3 + len];
            cursor += 3 + len;

            let segment = self.answer_starknet(selector, args)?;
            out.push(U256::from(segment.len()));
            out.extend(segment);
        }
        Ok(out.iter().map(starknet::felt_hex).collect())
    }
}

/// Serves one shared [`MockProvider`] for every network not marked missing.
pub struct MockFactory {
    pub provider: Rc<MockProvider>,
    missing: HashSet<String>,
}

impl MockFactory {
    pub fn new(provider: MockProvider) -> Self {
        Self {
            provider: Rc::new(provider),
            missing: HashSet::new(),
        }
    }

    pub fn without(mut self, network: &str) -> Self {
        self.missing.insert(network.to_string());
        self
    }
}

impl ProviderFactory for MockFactory {
    fn provider(&self, network: &str) -> Result<Rc<dyn ReadProvider>> {
        if self.missing.contains(network) {
            return Err(ScoreError::MissingProvider(network.to_string()));
        }
        let provider: Rc<dyn ReadProvider> = self.provider.clone();
        Ok(provider)
    }
}

/// Checksummed address whose last byte is `last_byte`.
pub fn account(last_byte: u8) -> String {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xab;
    bytes[19] = last_byte;
    Address::from(bytes).to_string()
}
