//! Transaction broker.
//!
//! The orchestration point UI collaborators call. A send request is checked
//! against the ledger before anything else exists: an insufficient balance
//! produces no transaction and no notification. Once accepted, the
//! transaction moves pending → exactly one terminal state, with lifecycle
//! notifications emitted in submission order.
//!
//! The real-agent path is attempted for the native asset only; a user
//! rejection becomes a terminal `rejected` record, while any other agent
//! failure silently continues on the simulated path so the storefront always
//! makes forward progress.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::bus::{NotificationBus, NotificationKind};
use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::ledger::LedgerStore;
use crate::session::SessionManager;
use crate::storage::HistoryCache;
use crate::token::RewardToken;
use crate::types::{Asset, Clause, Network, Receipt, Transaction, TxHash, TxState};
use crate::units::parse_amount;
use crate::util::parse_address;

/// Gas figure reported for simulated native transfers.
const NATIVE_TRANSFER_GAS: u64 = 21_000;

/// Result of a pre-flight balance check.
#[derive(Debug, Clone)]
pub struct BalanceCheck {
    /// Whether the current balance covers the amount.
    pub is_enough: bool,
    /// Current balance, decimal display string.
    pub current: String,
    /// Amount asked about, decimal display string.
    pub needed: String,
}

/// Optional metadata attached to a send.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Business purpose recorded on the transaction.
    pub purpose: Option<String>,
    /// Comment shown at the agent prompt and recorded on the transaction.
    pub comment: Option<String>,
}

impl SendOptions {
    /// Set the business purpose.
    #[must_use]
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    /// Set the comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Receipt returned to the checkout flow by [`TransactionBroker::purchase`].
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    /// Item that was bought.
    pub item_id: String,
    /// The payment transaction in its terminal state.
    pub transaction: Transaction,
    /// Token reward credited to the buyer, if the payment confirmed and the
    /// treasury could cover it.
    pub reward: Option<String>,
}

/// Orchestrates sends through the session, ledger and notification bus.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct TransactionBroker {
    inner: Arc<BrokerInner>,
}

struct BrokerInner {
    session: SessionManager,
    ledger: Arc<LedgerStore>,
    token: RewardToken,
    bus: NotificationBus,
    cache: Option<Arc<dyn HistoryCache>>,
    store_address: Address,
    treasury_address: Address,
    reward_per_purchase: U256,
    confirm_delay_ms: (u64, u64),
    failure_probability: f64,
    network: Network,
    rng: Mutex<fastrand::Rng>,
}

impl std::fmt::Debug for BrokerInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerInner")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl TransactionBroker {
    /// Wire a broker over the shared components.
    pub fn new(
        session: SessionManager,
        ledger: Arc<LedgerStore>,
        token: RewardToken,
        bus: NotificationBus,
        cache: Option<Arc<dyn HistoryCache>>,
        config: &WalletConfig,
    ) -> Result<Self> {
        let rng = config
            .rng_seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Ok(Self {
            inner: Arc::new(BrokerInner {
                session,
                token,
                bus,
                cache,
                store_address: parse_address(&config.store_address)?,
                treasury_address: parse_address(&config.treasury_address)?,
                reward_per_purchase: parse_amount(
                    &config.reward_per_purchase,
                    config.token.decimals,
                )?,
                confirm_delay_ms: config.confirm_delay_ms,
                failure_probability: config.failure_probability,
                network: config.network,
                rng: Mutex::new(rng),
                ledger,
            }),
        })
    }

    /// Send `amount` of `asset` to `to`, tracking the transaction to its
    /// terminal state.
    ///
    /// Fails fast with [`WalletError::InsufficientBalance`] (no transaction,
    /// no notification), [`WalletError::InvalidInput`] for a malformed
    /// address or amount, or [`WalletError::NotConnected`]. A user-rejected
    /// agent submission resolves to a transaction in state
    /// [`TxState::Rejected`] rather than an error.
    pub async fn send(
        &self,
        to: &str,
        asset: Asset,
        amount: &str,
        options: SendOptions,
    ) -> Result<Transaction> {
        let to = parse_address(to)?;
        self.send_to(to, asset, amount, options).await
    }

    async fn send_to(
        &self,
        to: Address,
        asset: Asset,
        amount: &str,
        options: SendOptions,
    ) -> Result<Transaction> {
        let inner = &self.inner;
        let from = inner.session.address().ok_or(WalletError::NotConnected)?;
        let value = parse_amount(amount, inner.ledger.decimals_for(asset))?;
        let display = inner.ledger.display(value, asset);

        // (1) Fail fast on balance; nothing exists yet to clean up.
        let have = inner.ledger.balance_of(from, asset);
        if have < value {
            return Err(WalletError::InsufficientBalance {
                have: inner.ledger.display(have, asset),
                need: display,
            });
        }

        // (2) Real-agent submission, native asset only. The token asset is
        // always simulated: no real token contract is addressed.
        let mut live_hash = None;
        if asset == Asset::Native && inner.session.is_live() {
            let client = inner.session.client();
            let clause = Clause::transfer(to, value);
            match client.submit(&[clause], options.comment.as_deref()).await {
                Ok(hash) => live_hash = Some(hash),
                Err(WalletError::UserRejected) => {
                    info!("submission rejected at the agent prompt");
                    let tx = self.build_tx(from, to, asset, &display, TxState::Rejected, &options);
                    inner.ledger.record(tx.clone());
                    inner.bus.notify(
                        NotificationKind::TransactionFailed,
                        "Transaction rejected",
                        format!("You declined sending {display} {}", asset.label()),
                        json!({ "hash": tx.hash.0, "state": "rejected" }),
                    );
                    self.persist().await;
                    return Ok(tx);
                }
                Err(err) => {
                    warn!(error = %err, "agent submission failed, continuing on the simulated path");
                }
            }
        }

        // (3) Pending transaction enters history.
        let simulated = live_hash.is_none();
        let tx = match live_hash {
            Some(hash) => self.build_tx_with_hash(hash, from, to, asset, &display, TxState::Pending, &options),
            None => self.build_tx(from, to, asset, &display, TxState::Pending, &options),
        };
        let hash = tx.hash.clone();
        inner.ledger.record(tx.clone());
        inner.bus.notify(
            NotificationKind::TransactionSubmitted,
            "Transaction submitted",
            format!("Sending {display} {} to {}", asset.label(), tx.to),
            json!({ "hash": hash.0, "state": "pending" }),
        );
        self.persist().await;

        // (4) Bounded simulated confirmation delay, then settle. The delay
        // is not interruptible; there is no cancellation once pending.
        tokio::time::sleep(Duration::from_millis(self.roll_delay())).await;

        let failed_roll = simulated && self.roll_failure();
        let (state, receipt) = if failed_roll {
            debug!(hash = %hash, "simulated submission failed the post-submission roll");
            (TxState::Failed, None)
        } else {
            // Settlement re-checks the balance atomically: a concurrent send
            // may have drained the sender since the pre-flight check.
            match inner.ledger.transfer(from, to, asset, value) {
                Ok(()) => {
                    let block_number = inner.ledger.next_block();
                    (
                        TxState::Confirmed,
                        Some(Receipt {
                            block_number,
                            gas_used: NATIVE_TRANSFER_GAS,
                            status: true,
                        }),
                    )
                }
                Err(err) => {
                    warn!(hash = %hash, error = %err, "settlement failed");
                    (TxState::Failed, None)
                }
            }
        };

        let updated = match inner.ledger.update(&hash, state, receipt) {
            Some(updated) => {
                self.notify_terminal(&updated);
                updated
            }
            // Already terminal; never notify a terminal state twice.
            None => inner.ledger.transaction(&hash).unwrap_or(tx),
        };
        self.persist().await;
        Ok(updated)
    }

    /// Buy an item: pay `price` to the storefront with `purpose =
    /// "purchase"`, and on confirmation credit the configured token reward
    /// from the treasury.
    pub async fn purchase(
        &self,
        item_id: &str,
        price: &str,
        asset: Asset,
    ) -> Result<PurchaseReceipt> {
        let inner = &self.inner;
        let buyer = inner.session.address().ok_or(WalletError::NotConnected)?;

        let options = SendOptions::default()
            .with_purpose("purchase")
            .with_comment(format!("Purchase of item {item_id}"));
        let transaction = self
            .send_to(inner.store_address, asset, price, options)
            .await?;

        let reward = if transaction.state == TxState::Confirmed {
            self.pay_reward(buyer)
        } else {
            None
        };
        Ok(PurchaseReceipt {
            item_id: item_id.into(),
            transaction,
            reward,
        })
    }

    /// Pre-flight balance check for the checkout UI.
    pub fn check_balance(&self, amount: &str, asset: Asset) -> Result<BalanceCheck> {
        let inner = &self.inner;
        let from = inner.session.address().ok_or(WalletError::NotConnected)?;
        let needed = parse_amount(amount, inner.ledger.decimals_for(asset))?;
        let current = inner.ledger.balance_of(from, asset);
        Ok(BalanceCheck {
            is_enough: current >= needed,
            current: inner.ledger.display(current, asset),
            needed: inner.ledger.display(needed, asset),
        })
    }

    /// Look up a transaction by hash.
    #[must_use]
    pub fn transaction(&self, hash: &TxHash) -> Option<Transaction> {
        self.inner.ledger.transaction(hash)
    }

    /// Full transaction history, newest first.
    #[must_use]
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.inner.ledger.all_transactions()
    }

    /// Transactions an address participated in, newest first.
    #[must_use]
    pub fn transactions_for(&self, address: Address) -> Vec<Transaction> {
        self.inner.ledger.transactions_for(address)
    }

    fn pay_reward(&self, buyer: Address) -> Option<String> {
        let inner = &self.inner;
        match inner.ledger.transfer(
            inner.treasury_address,
            buyer,
            Asset::RewardToken,
            inner.reward_per_purchase,
        ) {
            Ok(()) => {
                // Named `shown` rather than `display`: tracing's event macros
                // import `tracing::field::display` into their expansion, which
                // shadows a call-site local of the same name.
                let shown = inner
                    .ledger
                    .display(inner.reward_per_purchase, Asset::RewardToken);
                info!(reward = %shown, "purchase reward credited");
                inner.bus.notify(
                    NotificationKind::BalanceChanged,
                    "Reward received",
                    format!("You earned {shown} {}", inner.token.symbol()),
                    json!({ "reward": shown, "balance": inner.token.balance_of(buyer) }),
                );
                Some(shown)
            }
            Err(err) => {
                warn!(error = %err, "reward payout skipped");
                None
            }
        }
    }

    fn notify_terminal(&self, tx: &Transaction) {
        let inner = &self.inner;
        match tx.state {
            TxState::Confirmed => {
                let block_number = tx.receipt.map_or(0, |r| r.block_number);
                inner.bus.notify(
                    NotificationKind::TransactionConfirmed,
                    "Transaction confirmed",
                    format!("{} {} sent to {}", tx.amount, tx.asset.label(), tx.to),
                    json!({ "hash": tx.hash.0, "state": "confirmed", "block": block_number }),
                );
                inner.bus.notify(
                    NotificationKind::NewBlock,
                    "New block",
                    format!("Block #{block_number} sealed"),
                    json!({ "block": block_number }),
                );
            }
            TxState::Failed => {
                inner.bus.notify(
                    NotificationKind::TransactionFailed,
                    "Transaction failed",
                    format!("Sending {} {} did not settle", tx.amount, tx.asset.label()),
                    json!({ "hash": tx.hash.0, "state": "failed" }),
                );
            }
            TxState::Pending | TxState::Rejected => {}
        }
    }

    fn build_tx(
        &self,
        from: Address,
        to: Address,
        asset: Asset,
        display: &str,
        state: TxState,
        options: &SendOptions,
    ) -> Transaction {
        self.build_tx_with_hash(TxHash::random(), from, to, asset, display, state, options)
    }

    #[allow(clippy::too_many_arguments)]
    fn build_tx_with_hash(
        &self,
        hash: TxHash,
        from: Address,
        to: Address,
        asset: Asset,
        display: &str,
        state: TxState,
        options: &SendOptions,
    ) -> Transaction {
        let mut tx = Transaction::new(hash.clone(), from, to, asset, display, state)
            .with_explorer_url(self.inner.network.explorer_tx_url(&hash));
        tx.purpose.clone_from(&options.purpose);
        tx.comment.clone_from(&options.comment);
        tx
    }

    fn roll_delay(&self) -> u64 {
        let (min, max) = self.inner.confirm_delay_ms;
        self.inner.rng.lock().expect("rng poisoned").u64(min..=max)
    }

    fn roll_failure(&self) -> bool {
        if self.inner.failure_probability <= 0.0 {
            return false;
        }
        self.inner.rng.lock().expect("rng poisoned").f64() < self.inner.failure_probability
    }

    async fn persist(&self) {
        if let Some(cache) = &self.inner.cache {
            let history = self.inner.ledger.all_transactions();
            if let Err(err) = cache.save(&history).await {
                warn!(error = %err, "history cache save failed");
            }
        }
    }
}
