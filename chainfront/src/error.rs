//! Unified error types for chainfront.
//!
//! The taxonomy deliberately separates the one failure a human caused
//! ([`WalletError::UserRejected`]) from every other way a signing agent can
//! fail ([`WalletError::AgentUnavailable`]): rejection is terminal and
//! surfaced verbatim, unavailability is absorbed by falling back to the
//! simulated chain client.

/// The main error type for wallet operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WalletError {
    /// The human explicitly declined the request at the signing agent's
    /// own prompt. Never retried automatically.
    #[error("request rejected by user")]
    UserRejected,

    /// The signing agent is missing, locked, timed out or answered with
    /// something unusable. Recovered internally by simulation; callers of
    /// the public surface should not observe this variant.
    #[error("signing agent unavailable: {0}")]
    AgentUnavailable(String),

    /// A debit would overdraw the sender. Both figures are decimal display
    /// strings in the asset's precision.
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Current balance of the sender.
        have: String,
        /// Amount the operation required.
        need: String,
    },

    /// Malformed address or amount, caught before any state change.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation that needs a session was called while disconnected.
    #[error("wallet not connected")]
    NotConnected,

    /// Best-effort persistence failure (history cache).
    #[error("storage: {0}")]
    Storage(String),
}

impl WalletError {
    /// Create an [`WalletError::InvalidInput`] from any message.
    #[inline]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an [`WalletError::AgentUnavailable`] from any message.
    #[inline]
    pub fn agent_unavailable(msg: impl Into<String>) -> Self {
        Self::AgentUnavailable(msg.into())
    }

    /// Create a [`WalletError::Storage`] from any message.
    #[inline]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether this error is an explicit user rejection.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::UserRejected)
    }

    /// Whether this error means the agent could not serve the request at
    /// all (as opposed to refusing it).
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::AgentUnavailable(_))
    }
}

/// Result type alias for wallet operations.
pub type Result<T> = std::result::Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_and_unavailability_are_distinct() {
        assert!(WalletError::UserRejected.is_rejection());
        assert!(!WalletError::UserRejected.is_unavailable());

        let err = WalletError::agent_unavailable("extension locked");
        assert!(err.is_unavailable());
        assert!(!err.is_rejection());
    }

    #[test]
    fn insufficient_balance_carries_both_figures() {
        let err = WalletError::InsufficientBalance {
            have: "1000".into(),
            need: "1500".into(),
        };
        let text = err.to_string();
        assert!(text.contains("1000"));
        assert!(text.contains("1500"));
    }
}
