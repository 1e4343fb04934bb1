//! Chain client gateway.
//!
//! One capability interface, [`ChainClient`], with two variants selected at
//! construction time: [`AgentClient`] when an external signing agent is
//! available, [`SimulatedClient`] otherwise. Callers never branch on which
//! variant is active; the session manager only needs the gateway's fallback
//! handle when the agent turns out to be unable to serve a request.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::types::{Clause, TxHash};

pub mod agent;
pub mod sim;

pub use agent::{AgentClient, AgentRefusal, CertificateRequest, SigningAgent, SubmitRequest};
pub use sim::SimulatedClient;

/// Uniform interface over a real signing agent or the simulated chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Whether this client is backed by a real signing agent.
    fn is_live(&self) -> bool;

    /// Request a signed identification certificate; resolves with the
    /// signer's address.
    ///
    /// Fails with [`WalletError::UserRejected`](crate::WalletError::UserRejected)
    /// when the human declines, or
    /// [`WalletError::AgentUnavailable`](crate::WalletError::AgentUnavailable)
    /// for any other agent failure. The simulated variant never fails.
    async fn request_identity(&self, purpose: &str) -> Result<Address>;

    /// Query the native-coin balance of an address, in base units.
    async fn query_balance(&self, address: Address) -> Result<U256>;

    /// Submit transfer clauses for signing; resolves with the transaction
    /// hash. Same failure taxonomy as [`ChainClient::request_identity`];
    /// the simulated variant fails only with simulated balance errors.
    async fn submit(&self, clauses: &[Clause], comment: Option<&str>) -> Result<TxHash>;
}

/// Construction-time selection between the two [`ChainClient`] variants.
#[derive(Clone)]
pub struct ChainGateway {
    primary: Arc<dyn ChainClient>,
    simulated: Arc<SimulatedClient>,
    live: bool,
}

impl std::fmt::Debug for ChainGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainGateway")
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

impl ChainGateway {
    /// Build the gateway. With an agent handle present the primary client is
    /// the agent-backed one; otherwise both handles point at the simulation.
    #[must_use]
    pub fn new(agent: Option<Arc<dyn SigningAgent>>, ledger: Arc<LedgerStore>) -> Self {
        let simulated = Arc::new(SimulatedClient::new(Arc::clone(&ledger)));
        match agent {
            Some(agent) => {
                debug!("signing agent detected");
                Self {
                    primary: Arc::new(AgentClient::new(agent, ledger)),
                    simulated,
                    live: true,
                }
            }
            None => {
                debug!("no signing agent detected, using simulated chain client");
                Self {
                    primary: Arc::clone(&simulated) as Arc<dyn ChainClient>,
                    simulated,
                    live: false,
                }
            }
        }
    }

    /// Whether a real signing agent was detected. Synchronous and
    /// side-effect-free.
    #[must_use]
    pub const fn detect(&self) -> bool {
        self.live
    }

    /// The preferred client variant.
    #[must_use]
    pub fn client(&self) -> Arc<dyn ChainClient> {
        Arc::clone(&self.primary)
    }

    /// The simulated fallback, always available.
    #[must_use]
    pub fn simulated(&self) -> Arc<dyn ChainClient> {
        Arc::clone(&self.simulated) as Arc<dyn ChainClient>
    }
}
