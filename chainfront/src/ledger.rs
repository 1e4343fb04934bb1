//! Injectable ledger store.
//!
//! Owns the per-(address, asset) balance rows and the process-wide
//! transaction history. Every balance mutation, including the sufficiency
//! check that precedes it, happens under a single mutex acquisition with no
//! await point, so a concurrent `send()` can never observe a stale balance
//! between check and debit.
//!
//! Rows are seeded lazily: the first reference to an (address, asset) pair
//! creates it with the configured seed balance, which keeps demos usable
//! without an explicit minting step.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, U256};
use tracing::{debug, warn};

use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::types::{Asset, Receipt, Transaction, TxHash, TxState};
use crate::units::{format_amount, parse_amount};

/// Shared in-memory ledger: balances, transaction history, block counter.
#[derive(Debug)]
pub struct LedgerStore {
    seed_native: U256,
    seed_token: U256,
    native_decimals: u8,
    token_decimals: u8,
    inner: Mutex<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    balances: HashMap<(Address, Asset), U256>,
    history: Vec<Transaction>,
    index: HashMap<TxHash, usize>,
    block_height: u64,
}

impl LedgerStore {
    /// Build a ledger from the configured seeds and precisions.
    pub fn new(config: &WalletConfig) -> Result<Self> {
        Ok(Self {
            seed_native: parse_amount(&config.seed_native, config.native_decimals)?,
            seed_token: parse_amount(&config.seed_token, config.token.decimals)?,
            native_decimals: config.native_decimals,
            token_decimals: config.token.decimals,
            inner: Mutex::new(LedgerInner::default()),
        })
    }

    /// Display precision for an asset.
    #[must_use]
    pub const fn decimals_for(&self, asset: Asset) -> u8 {
        match asset {
            Asset::Native => self.native_decimals,
            Asset::RewardToken => self.token_decimals,
        }
    }

    const fn seed_for(&self, asset: Asset) -> U256 {
        match asset {
            Asset::Native => self.seed_native,
            Asset::RewardToken => self.seed_token,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerInner> {
        self.inner.lock().expect("ledger lock poisoned")
    }

    /// Balance of an address in base units, seeding the row on first
    /// reference.
    #[must_use]
    pub fn balance_of(&self, address: Address, asset: Asset) -> U256 {
        let seed = self.seed_for(asset);
        *self.lock().balances.entry((address, asset)).or_insert(seed)
    }

    /// Balance of an address as a decimal display string.
    #[must_use]
    pub fn balance_display(&self, address: Address, asset: Asset) -> String {
        format_amount(self.balance_of(address, asset), self.decimals_for(asset))
    }

    /// Render a base-unit amount in the asset's precision.
    #[must_use]
    pub fn display(&self, amount: U256, asset: Asset) -> String {
        format_amount(amount, self.decimals_for(asset))
    }

    /// Move `amount` from `from` to `to` as one atomic step.
    ///
    /// Fails with [`WalletError::InvalidInput`] for a zero amount and with
    /// [`WalletError::InsufficientBalance`] before any mutation when the
    /// sender cannot cover it. The recipient row is created (seeded) if
    /// absent.
    pub fn transfer(&self, from: Address, to: Address, asset: Asset, amount: U256) -> Result<()> {
        if amount.is_zero() {
            return Err(WalletError::invalid_input("amount must be positive"));
        }
        let seed = self.seed_for(asset);

        let mut inner = self.lock();
        let have = *inner.balances.entry((from, asset)).or_insert(seed);
        if have < amount {
            return Err(WalletError::InsufficientBalance {
                have: format_amount(have, self.decimals_for(asset)),
                need: format_amount(amount, self.decimals_for(asset)),
            });
        }
        // Check passed under the same lock; the debit cannot underflow.
        inner
            .balances
            .entry((from, asset))
            .and_modify(|b| *b -= amount);
        *inner.balances.entry((to, asset)).or_insert(seed) += amount;

        debug!(
            from = %from,
            to = %to,
            asset = ?asset,
            amount = %amount,
            "ledger transfer applied"
        );
        Ok(())
    }

    /// Credit an address directly (reward payouts). Seeds the row if absent.
    pub fn credit(&self, address: Address, asset: Asset, amount: U256) {
        let seed = self.seed_for(asset);
        *self.lock().balances.entry((address, asset)).or_insert(seed) += amount;
    }

    /// Append a transaction record to the history.
    pub fn record(&self, tx: Transaction) {
        let mut inner = self.lock();
        let idx = inner.history.len();
        inner.index.insert(tx.hash.clone(), idx);
        debug!(hash = %tx.hash, state = ?tx.state, "transaction recorded");
        inner.history.push(tx);
    }

    /// Transition a pending transaction to a terminal state.
    ///
    /// Transitions are append-only: an already-terminal record is left
    /// untouched and `None` is returned.
    pub fn update(
        &self,
        hash: &TxHash,
        state: TxState,
        receipt: Option<Receipt>,
    ) -> Option<Transaction> {
        let mut inner = self.lock();
        let idx = *inner.index.get(hash)?;
        let tx = inner.history.get_mut(idx)?;
        if tx.state.is_terminal() {
            warn!(hash = %hash, state = ?tx.state, "refusing to transition a terminal transaction");
            return None;
        }
        tx.state = state;
        tx.receipt = receipt;
        Some(tx.clone())
    }

    /// Look up a transaction by hash.
    #[must_use]
    pub fn transaction(&self, hash: &TxHash) -> Option<Transaction> {
        let inner = self.lock();
        let idx = *inner.index.get(hash)?;
        inner.history.get(idx).cloned()
    }

    /// All transactions, newest first.
    #[must_use]
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.lock().history.iter().rev().cloned().collect()
    }

    /// Transactions an address participated in, newest first.
    #[must_use]
    pub fn transactions_for(&self, address: Address) -> Vec<Transaction> {
        let needle = address.to_checksum(None);
        self.lock()
            .history
            .iter()
            .rev()
            .filter(|tx| tx.from == needle || tx.to == needle)
            .cloned()
            .collect()
    }

    /// Preload history records, e.g. from the best-effort cache. Existing
    /// entries win on hash collision.
    pub fn load_history(&self, txs: Vec<Transaction>) {
        let mut inner = self.lock();
        for tx in txs {
            if inner.index.contains_key(&tx.hash) {
                continue;
            }
            let idx = inner.history.len();
            inner.index.insert(tx.hash.clone(), idx);
            inner.history.push(tx);
        }
    }

    /// Advance the simulated chain by one block and return its number.
    pub fn next_block(&self) -> u64 {
        let mut inner = self.lock();
        inner.block_height += 1;
        inner.block_height
    }

    /// Current simulated block height.
    #[must_use]
    pub fn block_height(&self) -> u64 {
        self.lock().block_height
    }

    /// Sum of all existing rows for an asset. Transfers between seeded rows
    /// leave this unchanged.
    #[must_use]
    pub fn circulating(&self, asset: Asset) -> U256 {
        self.lock()
            .balances
            .iter()
            .filter(|((_, a), _)| *a == asset)
            .fold(U256::ZERO, |acc, (_, balance)| acc + balance)
    }
}
