//! Wallet session manager.
//!
//! Owns the connection state machine:
//!
//! ```text
//! disconnected --connect()--> connecting --success--> connected
//! connecting --failure--> error --connect()--> connecting
//! connected --disconnect()--> disconnected
//! ```
//!
//! A `UserRejected` from the gateway is surfaced verbatim and leaves the
//! state at `error`; any other gateway failure transparently falls back to
//! the simulated chain client, which is why this manager and the gateway are
//! decoupled. Nobody else mutates the session object.

use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use alloy::primitives::Address;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bus::{NotificationBus, NotificationKind};
use crate::client::{ChainClient, ChainGateway};
use crate::config::WalletConfig;
use crate::error::{Result, WalletError};
use crate::ledger::LedgerStore;
use crate::types::{Asset, Network};
use crate::util::now_ms;

/// Purpose string sent with identity certificate requests.
const IDENTITY_PURPOSE: &str = "identification";

/// Connection state of the wallet session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session.
    #[default]
    Disconnected,
    /// Identity request in flight.
    Connecting,
    /// Session established; `address` is populated.
    Connected,
    /// The last connection attempt failed.
    Error,
}

/// Snapshot of the wallet session.
///
/// Invariant: `address` is `Some` iff `state == Connected`.
#[derive(Debug, Clone)]
pub struct WalletSession {
    /// Signer address while connected.
    pub address: Option<Address>,
    /// Native balance as a decimal display string.
    pub native_balance: String,
    /// Network the session is on.
    pub network: Network,
    /// Connection time, Unix milliseconds.
    pub connected_at: Option<u64>,
    /// Connection state.
    pub state: SessionState,
}

impl WalletSession {
    fn disconnected(network: Network) -> Self {
        Self {
            address: None,
            native_balance: "0".into(),
            network,
            connected_at: None,
            state: SessionState::Disconnected,
        }
    }

    /// How long the session has been connected.
    #[must_use]
    pub fn session_duration(&self) -> Option<Duration> {
        self.connected_at
            .map(|t| Duration::from_millis(now_ms().saturating_sub(t)))
    }
}

/// Drives connect/disconnect against the gateway and tracks the session.
///
/// Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    gateway: ChainGateway,
    ledger: Arc<LedgerStore>,
    bus: NotificationBus,
    active: RwLock<Arc<dyn ChainClient>>,
    session: RwLock<WalletSession>,
    // Serializes connect() so racing callers share one identity prompt.
    connecting: tokio::sync::Mutex<()>,
    refresh: Mutex<Option<JoinHandle<()>>>,
    refresh_interval: Duration,
    network: Network,
}

impl std::fmt::Debug for SessionInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionInner")
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a manager over the given gateway.
    #[must_use]
    pub fn new(
        gateway: ChainGateway,
        ledger: Arc<LedgerStore>,
        bus: NotificationBus,
        config: &WalletConfig,
    ) -> Self {
        let active = gateway.client();
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                ledger,
                bus,
                active: RwLock::new(active),
                session: RwLock::new(WalletSession::disconnected(config.network)),
                connecting: tokio::sync::Mutex::new(()),
                refresh: Mutex::new(None),
                refresh_interval: config.refresh_interval,
                network: config.network,
            }),
        }
    }

    /// Establish a session.
    ///
    /// Idempotent while connected: returns the current session without a
    /// second identity request. Concurrent calls are serialized, so racing
    /// callers share one identity prompt and observe the first call's
    /// result. A user rejection is surfaced verbatim and leaves the state at
    /// [`SessionState::Error`]; any other agent failure falls back to the
    /// simulated client and proceeds.
    pub async fn connect(&self) -> Result<WalletSession> {
        let _connecting = self.inner.connecting.lock().await;
        {
            let session = self.read_session();
            if session.state == SessionState::Connected {
                debug!("connect() while connected, returning current session");
                return Ok(session.clone());
            }
        }
        self.set_state(SessionState::Connecting);

        let mut client = self.inner.gateway.client();
        let address = match client.request_identity(IDENTITY_PURPOSE).await {
            Ok(address) => address,
            Err(WalletError::UserRejected) => {
                self.set_state(SessionState::Error);
                info!("identity request rejected by user");
                return Err(WalletError::UserRejected);
            }
            Err(err) => {
                warn!(error = %err, "signing agent unusable, falling back to simulated client");
                client = self.inner.gateway.simulated();
                client.request_identity(IDENTITY_PURPOSE).await?
            }
        };
        *self.write_active() = Arc::clone(&client);

        let balance = client.query_balance(address).await?;
        let balance = self.inner.ledger.display(balance, Asset::Native);
        {
            let mut session = self.write_session();
            session.state = SessionState::Connected;
            session.address = Some(address);
            session.native_balance.clone_from(&balance);
            session.connected_at = Some(now_ms());
        }
        self.spawn_refresh();

        let checksummed = address.to_checksum(None);
        info!(address = %checksummed, live = client.is_live(), "wallet connected");
        self.inner.bus.notify(
            NotificationKind::WalletConnected,
            "Wallet connected",
            format!("Connected as {checksummed}"),
            json!({ "address": checksummed, "balance": balance }),
        );
        Ok(self.read_session().clone())
    }

    /// Tear down the session. Always succeeds; stops the balance refresh
    /// and resets the session to disconnected defaults. Does not attempt to
    /// revoke agent permissions; no such capability exists.
    pub fn disconnect(&self) {
        if let Some(handle) = self
            .inner
            .refresh
            .lock()
            .expect("refresh handle poisoned")
            .take()
        {
            handle.abort();
        }

        let was_connected = {
            let mut session = self.write_session();
            let was = session.state == SessionState::Connected;
            *session = WalletSession::disconnected(self.inner.network);
            was
        };
        *self.write_active() = self.inner.gateway.client();

        if was_connected {
            info!("wallet disconnected");
            self.inner.bus.notify(
                NotificationKind::WalletDisconnected,
                "Wallet disconnected",
                "The wallet session ended",
                serde_json::Value::Null,
            );
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> WalletSession {
        self.read_session().clone()
    }

    /// Connected signer address, if any.
    #[must_use]
    pub fn address(&self) -> Option<Address> {
        self.read_session().address
    }

    /// The active chain client (agent-backed or simulated).
    #[must_use]
    pub fn client(&self) -> Arc<dyn ChainClient> {
        Arc::clone(&self.inner.active.read().expect("active client poisoned"))
    }

    /// Whether the active client is backed by a real signing agent.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.client().is_live()
    }

    /// Re-read the native balance and update the session snapshot,
    /// notifying when the figure moved.
    pub async fn refresh_balance(&self) {
        SessionInner::refresh_balance(&self.inner).await;
    }

    fn spawn_refresh(&self) {
        let weak = Arc::downgrade(&self.inner);
        let interval = self.inner.refresh_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                let Some(inner) = Weak::upgrade(&weak) else {
                    break;
                };
                SessionInner::refresh_balance(&inner).await;
            }
        });

        let mut slot = self.inner.refresh.lock().expect("refresh handle poisoned");
        if let Some(old) = slot.replace(handle) {
            old.abort();
        }
    }

    fn set_state(&self, state: SessionState) {
        let mut session = self.write_session();
        session.state = state;
        if state != SessionState::Connected {
            session.address = None;
            session.connected_at = None;
        }
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, WalletSession> {
        self.inner.session.read().expect("session lock poisoned")
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, WalletSession> {
        self.inner.session.write().expect("session lock poisoned")
    }

    fn write_active(&self) -> std::sync::RwLockWriteGuard<'_, Arc<dyn ChainClient>> {
        self.inner.active.write().expect("active client poisoned")
    }
}

impl SessionInner {
    async fn refresh_balance(inner: &Arc<Self>) {
        let (client, address, current) = {
            let session = inner.session.read().expect("session lock poisoned");
            let Some(address) = session.address else {
                return;
            };
            let client = Arc::clone(&inner.active.read().expect("active client poisoned"));
            (client, address, session.native_balance.clone())
        };

        match client.query_balance(address).await {
            Ok(balance) => {
                // Named `shown` rather than `display`: tracing's event macros
                // import `tracing::field::display` into their expansion, which
                // shadows a call-site local of the same name.
                let shown = inner.ledger.display(balance, Asset::Native);
                if shown != current {
                    debug!(balance = %shown, "native balance changed");
                    inner
                        .session
                        .write()
                        .expect("session lock poisoned")
                        .native_balance
                        .clone_from(&shown);
                    inner.bus.notify(
                        NotificationKind::BalanceChanged,
                        "Balance updated",
                        format!("Native balance is now {shown}"),
                        json!({ "balance": shown }),
                    );
                }
            }
            Err(err) => debug!(error = %err, "balance refresh failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SigningAgent;
    use crate::client::agent::mock::{Behavior, MockAgent};
    use crate::units::parse_amount;

    fn manager_with(agent: Option<MockAgent>) -> (SessionManager, Arc<LedgerStore>, NotificationBus) {
        crate::util::init_test_tracing();
        let config = WalletConfig::default().with_refresh_interval(Duration::from_millis(20));
        let ledger = Arc::new(LedgerStore::new(&config).unwrap());
        let bus = NotificationBus::new();
        let agent = agent.map(|a| Arc::new(a) as Arc<dyn SigningAgent>);
        let gateway = ChainGateway::new(agent, Arc::clone(&ledger));
        (
            SessionManager::new(gateway, Arc::clone(&ledger), bus.clone(), &config),
            ledger,
            bus,
        )
    }

    #[tokio::test]
    async fn agentless_connect_yields_a_valid_session() {
        let (manager, _, bus) = manager_with(None);
        assert_eq!(manager.session().state, SessionState::Disconnected);

        let session = manager.connect().await.unwrap();
        assert_eq!(session.state, SessionState::Connected);
        assert!(session.address.is_some());
        assert_eq!(session.native_balance, "5000");
        assert!(session.connected_at.is_some());
        assert!(
            bus.all()
                .iter()
                .any(|n| n.kind == NotificationKind::WalletConnected)
        );
        manager.disconnect();
    }

    #[tokio::test]
    async fn connect_is_idempotent_while_connected() {
        let agent = MockAgent::approving();
        let expected = agent.address();
        let (manager, _, _) = manager_with(Some(agent));

        let first = manager.connect().await.unwrap();
        let second = manager.connect().await.unwrap();
        assert_eq!(first.address, second.address);
        assert_eq!(first.address, Some(expected));
        assert_eq!(first.connected_at, second.connected_at);
        manager.disconnect();
    }

    #[tokio::test]
    async fn second_connect_does_not_reprompt() {
        let agent = Arc::new(MockAgent::approving());
        let config = WalletConfig::default();
        let ledger = Arc::new(LedgerStore::new(&config).unwrap());
        let gateway = ChainGateway::new(
            Some(Arc::clone(&agent) as Arc<dyn SigningAgent>),
            Arc::clone(&ledger),
        );
        let manager = SessionManager::new(gateway, ledger, NotificationBus::new(), &config);

        manager.connect().await.unwrap();
        manager.connect().await.unwrap();
        assert_eq!(agent.identity_calls(), 1);
        manager.disconnect();
    }

    #[tokio::test]
    async fn racing_connects_share_one_identity_prompt() {
        let agent = Arc::new(MockAgent::approving());
        let config = WalletConfig::default();
        let ledger = Arc::new(LedgerStore::new(&config).unwrap());
        let gateway = ChainGateway::new(
            Some(Arc::clone(&agent) as Arc<dyn SigningAgent>),
            Arc::clone(&ledger),
        );
        let manager = SessionManager::new(gateway, ledger, NotificationBus::new(), &config);

        let (a, b) = tokio::join!(manager.connect(), manager.connect());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(agent.identity_calls(), 1);
        assert_eq!(a.address, b.address);
        assert_eq!(a.connected_at, b.connected_at);
        manager.disconnect();
    }

    #[tokio::test]
    async fn user_rejection_surfaces_and_does_not_fall_back() {
        let (manager, _, _) = manager_with(Some(MockAgent::rejecting()));

        let err = manager.connect().await.unwrap_err();
        assert!(err.is_rejection());

        let session = manager.session();
        assert_eq!(session.state, SessionState::Error);
        assert!(session.address.is_none());
        // The agent-backed client stays active; no simulation fallback.
        assert!(manager.is_live());
    }

    #[tokio::test]
    async fn error_state_allows_reconnecting() {
        let agent = MockAgent::with_behaviors(Behavior::Reject, Behavior::Approve);
        let (manager, _, _) = manager_with(Some(agent));

        assert!(manager.connect().await.is_err());
        assert_eq!(manager.session().state, SessionState::Error);
        // Still rejecting, but the state machine re-enters connecting.
        assert!(manager.connect().await.is_err());
        assert_eq!(manager.session().state, SessionState::Error);
    }

    #[tokio::test]
    async fn unavailable_agent_falls_back_to_simulation() {
        let (manager, _, _) = manager_with(Some(MockAgent::unavailable()));

        let session = manager.connect().await.unwrap();
        assert_eq!(session.state, SessionState::Connected);
        assert!(session.address.is_some());
        assert!(!manager.is_live());
        manager.disconnect();
    }

    #[tokio::test]
    async fn disconnect_resets_and_notifies() {
        let (manager, _, bus) = manager_with(None);
        manager.connect().await.unwrap();
        manager.disconnect();

        let session = manager.session();
        assert_eq!(session.state, SessionState::Disconnected);
        assert!(session.address.is_none());
        assert!(session.connected_at.is_none());
        assert!(
            bus.all()
                .iter()
                .any(|n| n.kind == NotificationKind::WalletDisconnected)
        );
    }

    #[tokio::test]
    async fn refresh_notices_balance_changes() {
        let (manager, ledger, bus) = manager_with(None);
        let session = manager.connect().await.unwrap();
        let address = session.address.unwrap();

        ledger.credit(address, Asset::Native, parse_amount("100", 18).unwrap());
        manager.refresh_balance().await;

        assert_eq!(manager.session().native_balance, "5100");
        assert!(
            bus.all()
                .iter()
                .any(|n| n.kind == NotificationKind::BalanceChanged)
        );
        manager.disconnect();
    }
}
