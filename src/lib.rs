//! Proof-of-work ledger node: blocks of signed transfers, a pending pool,
//! and "longest valid chain wins" reconciliation between peers.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod node;
pub mod transaction;
pub mod wallet;

pub use blockchain::{Block, BlockData, Blockchain};
pub use error::{ChainError, NodeError, TransactionError, WalletError};
pub use node::{MemoryHub, Node, NullTransport, Sealed, TransactionMiner, Transport};
pub use transaction::{Transaction, TransactionPool, TxInput};
pub use wallet::Wallet;
