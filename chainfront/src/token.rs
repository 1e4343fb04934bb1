//! Reward token ledger and contract-call simulator.
//!
//! A fixed read/write surface modeled on a standard fungible-token
//! interface. Read calls are pure and always succeed from the in-memory
//! ledger; `transfer` settles immediately as one atomic step and appends a
//! synthesized transaction to the shared history. The token asset is always
//! simulated, no real token contract is addressed; only the native asset
//! may take the real-agent path.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::debug;

use crate::config::{TokenInfo, WalletConfig};
use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::types::{Asset, Network, Receipt, Transaction, TxHash, TxState};
use crate::units::parse_amount;

/// Gas figure reported for simulated token transfers.
const TOKEN_TRANSFER_GAS: u64 = 36_000;

/// The storefront's fungible reward token over the injected ledger.
#[derive(Debug, Clone)]
pub struct RewardToken {
    info: TokenInfo,
    network: Network,
    ledger: Arc<LedgerStore>,
}

impl RewardToken {
    /// Create the token view over a shared ledger.
    #[must_use]
    pub fn new(config: &WalletConfig, ledger: Arc<LedgerStore>) -> Self {
        Self {
            info: config.token.clone(),
            network: config.network,
            ledger,
        }
    }

    /// Token name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Ticker symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.info.symbol
    }

    /// Display precision.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.info.decimals
    }

    /// Total supply as a decimal display string.
    #[must_use]
    pub fn total_supply(&self) -> &str {
        &self.info.total_supply
    }

    /// Token balance of an address as a decimal display string, seeding the
    /// row on first reference.
    #[must_use]
    pub fn balance_of(&self, address: Address) -> String {
        self.ledger.balance_display(address, Asset::RewardToken)
    }

    /// Token balance of an address in base units.
    #[must_use]
    pub fn balance_of_raw(&self, address: Address) -> U256 {
        self.ledger.balance_of(address, Asset::RewardToken)
    }

    /// Transfer tokens as a single atomic step.
    ///
    /// Verifies the amount is positive and the sender can cover it (failing
    /// with [`WalletError::InsufficientBalance`](crate::WalletError::InsufficientBalance)
    /// before any mutation), debits and credits, then synthesizes a hash and
    /// appends the settled transaction to the shared history.
    pub fn transfer(&self, from: Address, to: Address, amount: &str) -> Result<Transaction> {
        let value = parse_amount(amount, self.info.decimals)?;
        self.ledger.transfer(from, to, Asset::RewardToken, value)?;

        let hash = TxHash::random();
        let tx = Transaction::new(
            hash.clone(),
            from,
            to,
            Asset::RewardToken,
            self.ledger.display(value, Asset::RewardToken),
            TxState::Confirmed,
        )
        .with_explorer_url(self.network.explorer_tx_url(&hash));
        let tx = Transaction {
            receipt: Some(Receipt {
                block_number: self.ledger.next_block(),
                gas_used: TOKEN_TRANSFER_GAS,
                status: true,
            }),
            ..tx
        };
        debug!(hash = %tx.hash, amount = %tx.amount, "token transfer settled");
        self.ledger.record(tx.clone());
        Ok(tx)
    }

    /// Transactions an address participated in, newest first.
    #[must_use]
    pub fn transactions_for(&self, address: Address) -> Vec<Transaction> {
        self.ledger.transactions_for(address)
    }
}
