//! Core data model: assets, transactions and their lifecycle.
//!
//! A [`Transaction`] is created once a send request has passed the balance
//! check, and from then on only moves forward: `pending` into exactly one of
//! the terminal states. The record keeps addresses as checksummed strings so
//! the whole history serializes cleanly for the best-effort cache.

use alloy::primitives::{Address, U256, hex};
use serde::{Deserialize, Serialize};

use crate::util::now_ms;

/// Which chain the wallet is pointed at. Affects explorer links and nothing
/// else; the simulation behaves identically on both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    /// Production chain.
    Main,
    /// Test chain.
    #[default]
    Test,
}

impl Network {
    /// Explorer URL for a transaction hash on this network.
    #[must_use]
    pub fn explorer_tx_url(&self, hash: &TxHash) -> String {
        match self {
            Self::Main => format!("https://scan.chainfront.dev/tx/{hash}"),
            Self::Test => format!("https://scan-testnet.chainfront.dev/tx/{hash}"),
        }
    }
}

/// Asset kind moved by a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// The chain's base coin.
    Native,
    /// The storefront's fungible reward token.
    RewardToken,
}

impl Asset {
    /// Short human label, used in notification text.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Native => "coin",
            Self::RewardToken => "token",
        }
    }
}

/// Transaction lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    /// Submitted, awaiting confirmation.
    Pending,
    /// Settled; ledger debit/credit applied.
    Confirmed,
    /// Did not settle. No ledger mutation took place.
    Failed,
    /// The user declined at the signing agent's prompt.
    Rejected,
}

impl TxState {
    /// Whether no further transition can occur from this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A transaction hash, the identity of a [`Transaction`] in history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl TxHash {
    /// Synthesize a hash from local randomness, for the simulated path and
    /// for rejected submissions the agent never hashed.
    #[must_use]
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        fastrand::fill(&mut bytes);
        Self(format!("0x{}", hex::encode(bytes)))
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single transfer instruction submitted for signing. A submission may
/// bundle several clauses.
#[derive(Debug, Clone)]
pub struct Clause {
    /// Recipient address.
    pub to: Address,
    /// Amount in the asset's smallest unit.
    pub value: U256,
    /// Optional calldata.
    pub data: Vec<u8>,
}

impl Clause {
    /// Create a plain value-transfer clause.
    #[must_use]
    pub const fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            data: Vec::new(),
        }
    }
}

/// Settlement receipt attached to a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Block the transaction settled in.
    pub block_number: u64,
    /// Gas consumed.
    pub gas_used: u64,
    /// Whether settlement succeeded.
    pub status: bool,
}

/// A tracked transaction and its lifecycle record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Hash assigned at creation; the lookup key in history.
    pub hash: TxHash,
    /// Checksummed sender address.
    pub from: String,
    /// Checksummed recipient address.
    pub to: String,
    /// Asset being moved.
    pub asset: Asset,
    /// Amount as a decimal display string.
    pub amount: String,
    /// Business purpose, e.g. `"purchase"`.
    pub purpose: Option<String>,
    /// Free-form comment shown at the agent prompt.
    pub comment: Option<String>,
    /// Creation time, Unix milliseconds.
    pub created_at: u64,
    /// Current lifecycle state.
    pub state: TxState,
    /// Receipt, present once confirmed.
    pub receipt: Option<Receipt>,
    /// Explorer link for this hash.
    pub explorer_url: Option<String>,
}

impl Transaction {
    /// Create a record in the given initial state.
    #[must_use]
    pub fn new(
        hash: TxHash,
        from: Address,
        to: Address,
        asset: Asset,
        amount: impl Into<String>,
        state: TxState,
    ) -> Self {
        Self {
            hash,
            from: from.to_checksum(None),
            to: to.to_checksum(None),
            asset,
            amount: amount.into(),
            purpose: None,
            comment: None,
            created_at: now_ms(),
            state,
            receipt: None,
            explorer_url: None,
        }
    }

    /// Set the business purpose.
    #[must_use]
    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }

    /// Set the free-form comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the explorer link.
    #[must_use]
    pub fn with_explorer_url(mut self, url: impl Into<String>) -> Self {
        self.explorer_url = Some(url.into());
        self
    }

    /// Whether the transaction has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}
