//! Chainfront - a client-side wallet abstraction for blockchain storefronts.
//!
//! Gives a storefront UI one seamless surface over two very different
//! backends: a real external signing agent when one is present, and a fully
//! simulated chain when not. Checkout code never branches on which one is
//! active.
//!
//! # Architecture
//!
//! The wallet is organized around these core components:
//!
//! - **Chain client gateway** ([`client`]) - One interface, real or simulated
//! - **Session manager** ([`session`]) - Connect/disconnect state machine
//! - **Ledger** ([`ledger`]) - Atomic balances and transaction history
//! - **Reward token** ([`token`]) - Fungible-token reads and transfers
//! - **Transaction broker** ([`broker`]) - Send/purchase orchestration
//! - **Notification bus** ([`bus`]) - Typed lifecycle events for the UI
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use chainfront::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let wallet = ChainWallet::from_config(WalletConfig::default()).await?;
//!     wallet.connect().await?;
//!     let receipt = wallet.purchase("sku-1", "100", Asset::RewardToken).await?;
//!     println!("paid in tx {}", receipt.transaction.hash);
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod bus;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod session;
pub mod storage;
pub mod token;
pub mod types;
pub mod units;
pub mod util;
pub mod wallet;

pub use error::{Result, WalletError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, WalletError};

    pub use crate::broker::{
        BalanceCheck, PurchaseReceipt, SendOptions, TransactionBroker,
    };
    pub use crate::bus::{Notification, NotificationBus, NotificationKind};
    pub use crate::client::{
        AgentClient, AgentRefusal, CertificateRequest, ChainClient, ChainGateway,
        SigningAgent, SimulatedClient, SubmitRequest,
    };
    pub use crate::config::{TokenInfo, WalletConfig};
    pub use crate::ledger::LedgerStore;
    pub use crate::session::{SessionManager, SessionState, WalletSession};
    pub use crate::storage::{FileCache, HistoryCache, MemoryCache};
    pub use crate::token::RewardToken;
    pub use crate::types::{
        Asset, Clause, Network, Receipt, Transaction, TxHash, TxState,
    };
    pub use crate::units::{format_amount, parse_amount};
    pub use crate::wallet::{ChainWallet, ChainWalletBuilder};
}
