//! Wallet facade.
//!
//! [`ChainWallet`] wires the gateway, session manager, ledger, token, broker
//! and notification bus into the single handle a storefront UI talks to.
//! Components stay individually reachable for callers that want them, but
//! the common flows (connect, send, purchase, notifications) are one method
//! call here.

use std::sync::Arc;

use alloy::primitives::Address;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::broker::{BalanceCheck, PurchaseReceipt, SendOptions, TransactionBroker};
use crate::bus::{Notification, NotificationBus};
use crate::client::{ChainGateway, SigningAgent};
use crate::config::WalletConfig;
use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::session::{SessionManager, WalletSession};
use crate::storage::HistoryCache;
use crate::token::RewardToken;
use crate::types::{Asset, Transaction, TxHash};

/// Assembles a [`ChainWallet`] from a config, an optional signing agent and
/// an optional history cache.
#[derive(Default)]
pub struct ChainWalletBuilder {
    config: WalletConfig,
    agent: Option<Arc<dyn SigningAgent>>,
    cache: Option<Arc<dyn HistoryCache>>,
}

impl std::fmt::Debug for ChainWalletBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainWalletBuilder")
            .field("config", &self.config)
            .field("agent", &self.agent.is_some())
            .field("cache", &self.cache.is_some())
            .finish()
    }
}

impl ChainWalletBuilder {
    /// Start from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: WalletConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach an external signing agent. Without one every operation runs
    /// against the simulated chain.
    #[must_use]
    pub fn agent(mut self, agent: Arc<dyn SigningAgent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Attach a best-effort history cache. Its contents are preloaded into
    /// the ledger at build time and rewritten after every broker operation.
    #[must_use]
    pub fn history_cache(mut self, cache: Arc<dyn HistoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Validate the configuration and wire every component.
    pub async fn build(self) -> Result<ChainWallet> {
        self.config.validate()?;

        let bus = NotificationBus::new();
        let ledger = Arc::new(LedgerStore::new(&self.config)?);
        if let Some(cache) = &self.cache {
            match cache.load().await {
                Ok(history) => {
                    if !history.is_empty() {
                        info!(entries = history.len(), "preloaded cached history");
                    }
                    ledger.load_history(history);
                }
                Err(err) => warn!(error = %err, "history cache unreadable, starting empty"),
            }
        }

        let gateway = ChainGateway::new(self.agent, Arc::clone(&ledger));
        let session = SessionManager::new(
            gateway.clone(),
            Arc::clone(&ledger),
            bus.clone(),
            &self.config,
        );
        let token = RewardToken::new(&self.config, Arc::clone(&ledger));
        let broker = TransactionBroker::new(
            session.clone(),
            Arc::clone(&ledger),
            token.clone(),
            bus.clone(),
            self.cache,
            &self.config,
        )?;

        Ok(ChainWallet {
            config: self.config,
            bus,
            ledger,
            gateway,
            session,
            token,
            broker,
        })
    }
}

/// The assembled wallet: one handle over session, transfers, token reads and
/// notifications.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct ChainWallet {
    config: WalletConfig,
    bus: NotificationBus,
    ledger: Arc<LedgerStore>,
    gateway: ChainGateway,
    session: SessionManager,
    token: RewardToken,
    broker: TransactionBroker,
}

impl ChainWallet {
    /// Start building a wallet.
    #[must_use]
    pub fn builder() -> ChainWalletBuilder {
        ChainWalletBuilder::new()
    }

    /// Build a wallet from a config alone: no agent, no cache.
    pub async fn from_config(config: WalletConfig) -> Result<Self> {
        ChainWalletBuilder::new().config(config).build().await
    }

    /// Whether a real signing agent was detected at build time.
    #[must_use]
    pub const fn agent_detected(&self) -> bool {
        self.gateway.detect()
    }

    /// Establish a wallet session. See [`SessionManager::connect`].
    pub async fn connect(&self) -> Result<WalletSession> {
        self.session.connect().await
    }

    /// Tear down the session. See [`SessionManager::disconnect`].
    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> WalletSession {
        self.session.session()
    }

    /// Connected signer address, if any.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        self.session.address()
    }

    /// Send `amount` of `asset` to `to`. See [`TransactionBroker::send`].
    pub async fn send(
        &self,
        to: &str,
        asset: Asset,
        amount: &str,
        options: SendOptions,
    ) -> Result<Transaction> {
        self.broker.send(to, asset, amount, options).await
    }

    /// Buy an item through the storefront. See [`TransactionBroker::purchase`].
    pub async fn purchase(
        &self,
        item_id: &str,
        price: &str,
        asset: Asset,
    ) -> Result<PurchaseReceipt> {
        self.broker.purchase(item_id, price, asset).await
    }

    /// Pre-flight balance check for the checkout UI.
    pub fn check_balance(&self, amount: &str, asset: Asset) -> Result<BalanceCheck> {
        self.broker.check_balance(amount, asset)
    }

    /// Look up a transaction by hash.
    #[must_use]
    pub fn transaction(&self, hash: &TxHash) -> Option<Transaction> {
        self.broker.transaction(hash)
    }

    /// Full transaction history, newest first.
    #[must_use]
    pub fn all_transactions(&self) -> Vec<Transaction> {
        self.broker.all_transactions()
    }

    /// Notification log snapshot, newest first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.bus.all()
    }

    /// Subscribe to live notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.bus.subscribe()
    }

    /// Number of notifications not yet marked read.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.bus.unread_count()
    }

    /// Mark one notification read. Returns whether the id was found.
    pub fn mark_read(&self, id: Uuid) -> bool {
        self.bus.mark_read(id)
    }

    /// Mark every notification read.
    pub fn mark_all_read(&self) {
        self.bus.mark_all_read();
    }

    /// The wallet's configuration.
    #[must_use]
    pub const fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// The session manager.
    #[must_use]
    pub const fn session_manager(&self) -> &SessionManager {
        &self.session
    }

    /// The transaction broker.
    #[must_use]
    pub const fn broker(&self) -> &TransactionBroker {
        &self.broker
    }

    /// The reward token view.
    #[must_use]
    pub const fn token(&self) -> &RewardToken {
        &self.token
    }

    /// The notification bus.
    #[must_use]
    pub const fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// The shared ledger.
    #[must_use]
    pub fn ledger(&self) -> Arc<LedgerStore> {
        Arc::clone(&self.ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::NotificationKind;
    use crate::error::WalletError;
    use crate::session::SessionState;
    use crate::storage::MemoryCache;
    use crate::types::{TxState, TxHash};
    use crate::util::random_address;

    fn quick_config() -> WalletConfig {
        crate::util::init_test_tracing();
        WalletConfig::default()
            .with_confirm_delay_ms(1, 2)
            .with_failure_probability(0.0)
    }

    #[tokio::test]
    async fn checkout_flow_end_to_end() {
        let wallet = ChainWallet::from_config(quick_config()).await.unwrap();
        assert!(!wallet.agent_detected());

        let session = wallet.connect().await.unwrap();
        assert_eq!(session.state, SessionState::Connected);
        assert_eq!(session.native_balance, "5000");

        // Not enough tokens: rejected before anything exists.
        let err = wallet
            .send(
                &random_address().to_checksum(None),
                Asset::RewardToken,
                "1500",
                SendOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance { .. }));

        let receipt = wallet.purchase("sku-1", "100", Asset::RewardToken).await.unwrap();
        assert_eq!(receipt.transaction.state, TxState::Confirmed);
        assert_eq!(receipt.reward.as_deref(), Some("10"));
        assert_eq!(
            wallet.token().balance_of(wallet.address().unwrap()),
            "910"
        );

        assert_eq!(wallet.all_transactions().len(), 1);
        assert!(wallet.unread_count() > 0);
        wallet.mark_all_read();
        assert_eq!(wallet.unread_count(), 0);

        wallet.disconnect();
        assert_eq!(wallet.session().state, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn invalid_config_fails_the_build() {
        let config = WalletConfig::default().with_failure_probability(2.0);
        assert!(ChainWallet::from_config(config).await.is_err());
    }

    #[tokio::test]
    async fn cached_history_survives_a_rebuild() {
        let cache = Arc::new(MemoryCache::new());
        let wallet = ChainWallet::builder()
            .config(quick_config())
            .history_cache(Arc::clone(&cache) as Arc<dyn HistoryCache>)
            .build()
            .await
            .unwrap();
        wallet.connect().await.unwrap();

        let tx = wallet
            .send(
                &random_address().to_checksum(None),
                Asset::RewardToken,
                "25",
                SendOptions::default(),
            )
            .await
            .unwrap();
        wallet.disconnect();
        drop(wallet);

        let revived = ChainWallet::builder()
            .config(quick_config())
            .history_cache(cache as Arc<dyn HistoryCache>)
            .build()
            .await
            .unwrap();
        let history = revived.all_transactions();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].hash, tx.hash);
        assert_eq!(history[0].state, TxState::Confirmed);
    }

    #[tokio::test]
    async fn subscribers_see_the_send_lifecycle() {
        let wallet = ChainWallet::from_config(quick_config()).await.unwrap();
        wallet.connect().await.unwrap();
        let mut rx = wallet.subscribe();

        let tx = wallet
            .send(
                &random_address().to_checksum(None),
                Asset::RewardToken,
                "5",
                SendOptions::default(),
            )
            .await
            .unwrap();

        let mut kinds = Vec::new();
        while let Ok(n) = rx.try_recv() {
            if n.data["hash"] == tx.hash.0 {
                kinds.push(n.kind);
            }
        }
        assert_eq!(
            kinds,
            vec![
                NotificationKind::TransactionSubmitted,
                NotificationKind::TransactionConfirmed,
            ]
        );
        wallet.disconnect();
    }

    #[tokio::test]
    async fn transaction_lookup_by_hash() {
        let wallet = ChainWallet::from_config(quick_config()).await.unwrap();
        wallet.connect().await.unwrap();

        let tx = wallet
            .send(
                &random_address().to_checksum(None),
                Asset::RewardToken,
                "1",
                SendOptions::default(),
            )
            .await
            .unwrap();
        assert!(wallet.transaction(&tx.hash).is_some());
        assert!(wallet.transaction(&TxHash::random()).is_none());
        wallet.disconnect();
    }
}
