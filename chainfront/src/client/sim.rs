//! Simulated chain client.
//!
//! The agentless [`ChainClient`] variant. It mints a stable local address on
//! the first identity request, answers balance queries from the shared
//! ledger, and settles submitted clauses immediately and atomically, leaving
//! a confirmed entry in the shared history so the returned hash stays
//! resolvable. It never fails with `UserRejected` or `AgentUnavailable`,
//! only with simulated balance errors.

use std::sync::{Arc, OnceLock};

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::types::{Asset, Clause, Receipt, Transaction, TxHash, TxState};

use super::ChainClient;

/// Gas figure reported per settled clause.
const CLAUSE_GAS: u64 = 21_000;

/// [`ChainClient`] backed entirely by the in-memory ledger.
#[derive(Debug)]
pub struct SimulatedClient {
    ledger: Arc<LedgerStore>,
    address: OnceLock<Address>,
}

impl SimulatedClient {
    /// Create a simulated client over the shared ledger.
    #[must_use]
    pub fn new(ledger: Arc<LedgerStore>) -> Self {
        Self {
            ledger,
            address: OnceLock::new(),
        }
    }

    fn local_address(&self) -> Address {
        *self.address.get_or_init(|| {
            let address = crate::util::random_address();
            debug!(address = %address, "minted simulated wallet address");
            address
        })
    }
}

#[async_trait]
impl ChainClient for SimulatedClient {
    fn is_live(&self) -> bool {
        false
    }

    async fn request_identity(&self, purpose: &str) -> Result<Address> {
        trace!(purpose = %purpose, "simulated identity request");
        Ok(self.local_address())
    }

    async fn query_balance(&self, address: Address) -> Result<U256> {
        Ok(self.ledger.balance_of(address, Asset::Native))
    }

    async fn submit(&self, clauses: &[Clause], comment: Option<&str>) -> Result<TxHash> {
        let from = self.local_address();
        let mut total = U256::ZERO;
        for clause in clauses {
            self.ledger
                .transfer(from, clause.to, Asset::Native, clause.value)?;
            total += clause.value;
        }

        let hash = TxHash::random();
        let to = clauses.first().map_or(from, |clause| clause.to);
        let mut tx = Transaction::new(
            hash.clone(),
            from,
            to,
            Asset::Native,
            self.ledger.display(total, Asset::Native),
            TxState::Confirmed,
        );
        tx.comment = comment.map(Into::into);
        tx.receipt = Some(Receipt {
            block_number: self.ledger.next_block(),
            gas_used: CLAUSE_GAS.saturating_mul(u64::try_from(clauses.len()).unwrap_or(u64::MAX)),
            status: true,
        });
        self.ledger.record(tx);
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::error::WalletError;
    use crate::units::parse_amount;
    use crate::util::random_address;

    fn client() -> SimulatedClient {
        SimulatedClient::new(Arc::new(LedgerStore::new(&WalletConfig::default()).unwrap()))
    }

    #[tokio::test]
    async fn identity_is_stable_across_calls() {
        let client = client();
        let a = client.request_identity("identification").await.unwrap();
        let b = client.request_identity("identification").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn fresh_address_has_seeded_native_balance() {
        let client = client();
        let address = client.request_identity("identification").await.unwrap();
        let balance = client.query_balance(address).await.unwrap();
        assert_eq!(balance, parse_amount("5000", 18).unwrap());
    }

    #[tokio::test]
    async fn submit_settles_against_the_ledger() {
        let client = client();
        let from = client.request_identity("identification").await.unwrap();
        let to = random_address();

        let clause = Clause::transfer(to, parse_amount("100", 18).unwrap());
        client.submit(&[clause], None).await.unwrap();

        assert_eq!(
            client.ledger.balance_display(from, Asset::Native),
            "4900"
        );
    }

    #[tokio::test]
    async fn submitted_hash_resolves_in_history() {
        let client = client();
        let from = client.request_identity("identification").await.unwrap();
        let to = random_address();

        let clause = Clause::transfer(to, parse_amount("25", 18).unwrap());
        let hash = client.submit(&[clause], Some("direct")).await.unwrap();

        let tx = client.ledger.transaction(&hash).unwrap();
        assert_eq!(tx.state, TxState::Confirmed);
        assert_eq!(tx.amount, "25");
        assert_eq!(tx.from, from.to_checksum(None));
        assert_eq!(tx.comment.as_deref(), Some("direct"));
        assert!(tx.receipt.unwrap().status);
    }

    #[tokio::test]
    async fn submit_fails_only_with_balance_errors() {
        let client = client();
        let to = random_address();
        let clause = Clause::transfer(to, parse_amount("999999", 18).unwrap());

        let err = client.submit(&[clause], None).await.unwrap_err();
        assert!(matches!(err, WalletError::InsufficientBalance { .. }));
    }
}
