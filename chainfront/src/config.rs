//! Wallet configuration.
//!
//! Every knob here affects timing or realism of the simulation only, never
//! correctness: seed balances keep demos usable without explicit minting,
//! the confirm-delay bounds and failure probability shape the simulated
//! lifecycle, and the RNG seed makes the failure roll reproducible.

use std::time::Duration;

use crate::error::{Result, WalletError};
use crate::types::{Asset, Network};
use crate::units::parse_amount;
use crate::util::parse_address;

/// Default address the storefront receives payments at.
pub const DEFAULT_STORE_ADDRESS: &str = "0x5a1fb2294cadf4b05fb69ad03e4c9ad2c3f9c2a1";

/// Default treasury address that funds purchase rewards.
pub const DEFAULT_TREASURY_ADDRESS: &str = "0x90ab45cd12ef90ab45cd12ef90ab45cd12ef90ab";

/// Default storage key for the best-effort history cache.
pub const DEFAULT_STORAGE_KEY: &str = "chainfront.history";

/// Reward token metadata, answered by the fungible-token read surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Full token name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Display precision.
    pub decimals: u8,
    /// Total supply as a decimal display string.
    pub total_supply: String,
}

impl Default for TokenInfo {
    fn default() -> Self {
        Self {
            name: "Storefront Reward".into(),
            symbol: "RWD".into(),
            decimals: 18,
            total_supply: "1000000000".into(),
        }
    }
}

/// Configuration for a [`ChainWallet`](crate::wallet::ChainWallet).
#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Network selection; affects explorer links only.
    pub network: Network,
    /// Native coin display precision. Default 18.
    pub native_decimals: u8,
    /// Native balance seeded onto an address on first reference.
    /// Default `"5000"`.
    pub seed_native: String,
    /// Token balance seeded onto an address on first reference.
    /// Default `"1000"`.
    pub seed_token: String,
    /// Reward token metadata.
    pub token: TokenInfo,
    /// Inclusive bounds, in milliseconds, for the simulated confirmation
    /// delay. Default `(1200, 3200)`.
    pub confirm_delay_ms: (u64, u64),
    /// Probability that a purely simulated submission fails after the
    /// confirmation delay. Default `0.05`.
    pub failure_probability: f64,
    /// Optional seed for the failure roll, for reproducible runs.
    pub rng_seed: Option<u64>,
    /// Interval of the periodic native-balance refresh while connected.
    /// Default 10 seconds.
    pub refresh_interval: Duration,
    /// Address purchases are paid to.
    pub store_address: String,
    /// Address purchase rewards are paid from.
    pub treasury_address: String,
    /// Token amount credited to the buyer per confirmed purchase.
    /// Default `"10"`.
    pub reward_per_purchase: String,
    /// Storage key of the best-effort history cache.
    pub storage_key: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: Network::Test,
            native_decimals: 18,
            seed_native: "5000".into(),
            seed_token: "1000".into(),
            token: TokenInfo::default(),
            confirm_delay_ms: (1200, 3200),
            failure_probability: 0.05,
            rng_seed: None,
            refresh_interval: Duration::from_secs(10),
            store_address: DEFAULT_STORE_ADDRESS.into(),
            treasury_address: DEFAULT_TREASURY_ADDRESS.into(),
            reward_per_purchase: "10".into(),
            storage_key: DEFAULT_STORAGE_KEY.into(),
        }
    }
}

impl WalletConfig {
    /// Set the network.
    #[must_use]
    pub const fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    /// Set the seed balances (native, token) as decimal strings.
    #[must_use]
    pub fn with_seeds(mut self, native: impl Into<String>, token: impl Into<String>) -> Self {
        self.seed_native = native.into();
        self.seed_token = token.into();
        self
    }

    /// Set the simulated confirmation-delay bounds in milliseconds.
    #[must_use]
    pub const fn with_confirm_delay_ms(mut self, min: u64, max: u64) -> Self {
        self.confirm_delay_ms = (min, max);
        self
    }

    /// Set the simulated post-submission failure probability.
    #[must_use]
    pub const fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability;
        self
    }

    /// Seed the failure roll for reproducible runs.
    #[must_use]
    pub const fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Set the balance refresh interval.
    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the storefront payment address.
    #[must_use]
    pub fn with_store_address(mut self, address: impl Into<String>) -> Self {
        self.store_address = address.into();
        self
    }

    /// Set the token reward credited per confirmed purchase.
    #[must_use]
    pub fn with_reward_per_purchase(mut self, amount: impl Into<String>) -> Self {
        self.reward_per_purchase = amount.into();
        self
    }

    /// Display precision for an asset.
    #[must_use]
    pub const fn decimals_for(&self, asset: Asset) -> u8 {
        match asset {
            Asset::Native => self.native_decimals,
            Asset::RewardToken => self.token.decimals,
        }
    }

    /// Validate the configuration before wiring a wallet from it.
    ///
    /// Checks the failure probability range, delay-bound ordering, and that
    /// every configured address and amount parses.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.failure_probability) {
            return Err(WalletError::invalid_input(format!(
                "failure_probability {} outside [0, 1]",
                self.failure_probability
            )));
        }
        if self.confirm_delay_ms.0 > self.confirm_delay_ms.1 {
            return Err(WalletError::invalid_input(
                "confirm delay lower bound exceeds upper bound",
            ));
        }
        parse_address(&self.store_address)?;
        parse_address(&self.treasury_address)?;
        parse_amount(&self.seed_native, self.native_decimals)?;
        parse_amount(&self.seed_token, self.token.decimals)?;
        parse_amount(&self.token.total_supply, self.token.decimals)?;
        parse_amount(&self.reward_per_purchase, self.token.decimals)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        WalletConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_bad_probability() {
        let config = WalletConfig::default().with_failure_probability(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_delay_bounds() {
        let config = WalletConfig::default().with_confirm_delay_ms(500, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_malformed_store_address() {
        let config = WalletConfig::default().with_store_address("not-an-address");
        assert!(config.validate().is_err());
    }
}
