pub mod erc20_balance_of;
pub mod eth_balance;
pub mod scores;
pub mod strategies;
pub mod ticket;

use std::collections::BTreeMap;

use crate::infra::multicall::{BatchOptions, BlockTag, ReadProvider};

/// Score per address, keyed by the address as submitted.
pub type Scores = BTreeMap<String, f64>;

/// Everything a strategy needs for one run.
pub struct StrategyContext<'a> {
    pub space: &'a str,
    pub network: &'a str,
    pub snapshot: BlockTag,
    pub addresses: &'a [String],
    pub provider: &'a dyn ReadProvider,
    pub multicall_limit: usize,
}

impl StrategyContext<'_> {
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::at(self.snapshot).with_limit(self.multicall_limit)
    }
}
