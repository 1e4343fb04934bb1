//! Small shared helpers.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::Address;

use crate::error::{Result, WalletError};

/// Current Unix time in milliseconds.
#[must_use]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Parse a `0x`-prefixed hex address, mapping failures to
/// [`WalletError::InvalidInput`].
pub fn parse_address(input: &str) -> Result<Address> {
    Address::from_str(input.trim())
        .map_err(|_| WalletError::invalid_input(format!("malformed address '{input}'")))
}

/// Mint a syntactically valid address from local randomness. Used by the
/// simulated chain client, which has no signing agent to ask.
#[must_use]
pub fn random_address() -> Address {
    let mut bytes = [0u8; 20];
    fastrand::fill(&mut bytes);
    Address::from(bytes)
}

/// Install a fmt subscriber routed to the test writer. Safe to call from
/// every test; only the first call wins.
#[cfg(test)]
pub(crate) fn init_test_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_addresses() {
        let addr = parse_address("0x7567d83b7b8d80addcb281a71d54fc7b3364ffed").unwrap();
        assert_eq!(
            addr.to_checksum(None).to_lowercase(),
            "0x7567d83b7b8d80addcb281a71d54fc7b3364ffed"
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        for s in ["", "0x123", "not-an-address", "0xzz67d83b7b8d80addcb281a71d54fc7b3364ffed"] {
            assert!(parse_address(s).is_err(), "expected rejection for '{s}'");
        }
    }

    #[test]
    fn random_addresses_differ() {
        assert_ne!(random_address(), random_address());
    }
}
