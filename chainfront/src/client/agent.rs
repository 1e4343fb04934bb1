//! Signing-agent boundary and the agent-backed chain client.
//!
//! The agent is an external, user-controlled program. The boundary carries
//! exactly two request shapes, an identity certificate and a transaction
//! submission, and its failure type distinguishes the one case a human
//! caused ([`AgentRefusal::Rejected`]) from everything else.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::trace;

use crate::error::{Result, WalletError};
use crate::ledger::LedgerStore;
use crate::types::{Asset, Clause, TxHash};

use super::ChainClient;

/// An identity/certificate request shown at the agent's prompt.
#[derive(Debug, Clone)]
pub struct CertificateRequest {
    /// Machine-readable purpose, e.g. `"identification"`.
    pub purpose: String,
    /// Human-readable payload rendered by the agent.
    pub payload: String,
}

/// A transaction-submission request.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Transfer instructions to sign as one transaction.
    pub clauses: Vec<Clause>,
    /// Optional comment rendered at the prompt.
    pub comment: Option<String>,
    /// Optional gas hint; agents are free to ignore it.
    pub gas_hint: Option<u64>,
}

/// How a signing agent declined to serve a request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentRefusal {
    /// The human explicitly declined at the prompt.
    #[error("rejected by user")]
    Rejected,
    /// Agent missing, locked, timed out, or answered garbage.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<AgentRefusal> for WalletError {
    fn from(refusal: AgentRefusal) -> Self {
        match refusal {
            AgentRefusal::Rejected => Self::UserRejected,
            AgentRefusal::Unavailable(msg) => Self::AgentUnavailable(msg),
        }
    }
}

/// The external signing agent, specified only at its boundary.
///
/// There is deliberately no timeout here: a hung agent call hangs the
/// caller's future. Implementations own their own prompting UX.
#[async_trait]
pub trait SigningAgent: Send + Sync {
    /// Ask the agent to sign an identification certificate; resolves with
    /// the signer's address.
    async fn sign_certificate(
        &self,
        request: CertificateRequest,
    ) -> std::result::Result<Address, AgentRefusal>;

    /// Ask the agent to sign and submit a transaction; resolves with its
    /// hash.
    async fn sign_transaction(
        &self,
        request: SubmitRequest,
    ) -> std::result::Result<TxHash, AgentRefusal>;
}

/// [`ChainClient`] backed by a real signing agent.
///
/// Balance queries are answered from the shared ledger: no real on-chain
/// settlement is in scope, and one bookkeeping view has to hold regardless
/// of which client variant is active.
pub struct AgentClient {
    agent: Arc<dyn SigningAgent>,
    ledger: Arc<LedgerStore>,
}

impl std::fmt::Debug for AgentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentClient").finish_non_exhaustive()
    }
}

impl AgentClient {
    /// Wrap a signing agent.
    #[must_use]
    pub fn new(agent: Arc<dyn SigningAgent>, ledger: Arc<LedgerStore>) -> Self {
        Self { agent, ledger }
    }
}

#[async_trait]
impl ChainClient for AgentClient {
    fn is_live(&self) -> bool {
        true
    }

    async fn request_identity(&self, purpose: &str) -> Result<Address> {
        trace!(purpose = %purpose, "requesting identity certificate from agent");
        let address = self
            .agent
            .sign_certificate(CertificateRequest {
                purpose: purpose.into(),
                payload: "Please confirm your identity to the storefront.".into(),
            })
            .await?;
        Ok(address)
    }

    async fn query_balance(&self, address: Address) -> Result<U256> {
        Ok(self.ledger.balance_of(address, Asset::Native))
    }

    async fn submit(&self, clauses: &[Clause], comment: Option<&str>) -> Result<TxHash> {
        trace!(clauses = clauses.len(), "submitting clauses to agent");
        let hash = self
            .agent
            .sign_transaction(SubmitRequest {
                clauses: clauses.to_vec(),
                comment: comment.map(Into::into),
                gas_hint: None,
            })
            .await?;
        Ok(hash)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scriptable agent for tests across the crate.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::util::random_address;

    /// How the mock answers one kind of request.
    #[derive(Debug, Clone, Copy)]
    pub(crate) enum Behavior {
        Approve,
        Reject,
        Unavailable,
    }

    /// A scriptable signing agent that counts prompts.
    pub(crate) struct MockAgent {
        address: Address,
        identity: Behavior,
        submit: Behavior,
        identity_calls: AtomicUsize,
        submit_calls: AtomicUsize,
    }

    impl MockAgent {
        pub(crate) fn approving() -> Self {
            Self::with_behaviors(Behavior::Approve, Behavior::Approve)
        }

        pub(crate) fn rejecting() -> Self {
            Self::with_behaviors(Behavior::Reject, Behavior::Reject)
        }

        pub(crate) fn unavailable() -> Self {
            Self::with_behaviors(Behavior::Unavailable, Behavior::Unavailable)
        }

        pub(crate) fn with_behaviors(identity: Behavior, submit: Behavior) -> Self {
            Self {
                address: random_address(),
                identity,
                submit,
                identity_calls: AtomicUsize::new(0),
                submit_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) const fn address(&self) -> Address {
            self.address
        }

        pub(crate) fn identity_calls(&self) -> usize {
            self.identity_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn submit_calls(&self) -> usize {
            self.submit_calls.load(Ordering::SeqCst)
        }

        fn answer<T>(behavior: Behavior, ok: T) -> std::result::Result<T, AgentRefusal> {
            match behavior {
                Behavior::Approve => Ok(ok),
                Behavior::Reject => Err(AgentRefusal::Rejected),
                Behavior::Unavailable => Err(AgentRefusal::Unavailable("agent locked".into())),
            }
        }
    }

    #[async_trait]
    impl SigningAgent for MockAgent {
        async fn sign_certificate(
            &self,
            _request: CertificateRequest,
        ) -> std::result::Result<Address, AgentRefusal> {
            self.identity_calls.fetch_add(1, Ordering::SeqCst);
            Self::answer(self.identity, self.address)
        }

        async fn sign_transaction(
            &self,
            _request: SubmitRequest,
        ) -> std::result::Result<TxHash, AgentRefusal> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            Self::answer(self.submit, TxHash::random())
        }
    }
}
