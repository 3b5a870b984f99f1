pub mod miner;
pub mod transport;

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};

pub use miner::TransactionMiner;
pub use transport::{Channel, MemoryHub, NullTransport, Transport};

use crate::blockchain::{Block, BlockData, Blockchain};
use crate::error::NodeError;
use crate::transaction::{Transaction, TransactionPool};
use crate::wallet::Wallet;

/// Chain and pool of one node. Always mutated under [`Node::state`].
#[derive(Debug, Default)]
pub struct NodeState {
    pub blockchain: Blockchain,
    pub pool: TransactionPool,
}

/// A block this node appended, with its height at commit time.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub index: usize,
    pub block: Block,
}

/// Everything one node owns. Chain replacement, pool mutations and block
/// commits are serialized through a single lock; proof of work runs on a
/// snapshot outside of it.
pub struct Node {
    name: String,
    wallet: Wallet,
    state: Mutex<NodeState>,
    transport: Arc<dyn Transport>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        wallet: Wallet,
        blockchain: Blockchain,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            name: name.into(),
            wallet,
            state: Mutex::new(NodeState {
                blockchain,
                pool: TransactionPool::new(),
            }),
            transport,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        self.wallet.address()
    }

    pub fn state(&self) -> MutexGuard<'_, NodeState> {
        self.state.lock().expect("mutex poisoned")
    }

    pub fn chain_snapshot(&self) -> Vec<Block> {
        self.state().blockchain.chain().to_vec()
    }

    pub fn balance(&self) -> u64 {
        Wallet::calculate_balance(self.state().blockchain.chain(), self.address())
    }

    /// Inbound transport message on `channel`.
    pub fn deliver(&self, channel: Channel, message: &[u8]) -> Result<(), NodeError> {
        match channel {
            Channel::Blockchain => self.on_chain_received(message),
            Channel::Transaction => self.on_transaction_received(message).map(|_| ()),
        }
    }

    /// Adopt a peer's chain if it is longer and fully valid, then drop the
    /// pool entries it already confirms.
    pub fn on_chain_received(&self, message: &[u8]) -> Result<(), NodeError> {
        let incoming = transport::decode_chain(message)?;
        let mut state = self.state();
        let NodeState { blockchain, pool } = &mut *state;
        blockchain.replace_chain_with(incoming, true, |chain| {
            pool.clear_blockchain_transactions(chain)
        })?;
        Ok(())
    }

    /// Store a peer's transaction unless this node's own spend is pending.
    /// Returns whether it was stored.
    pub fn on_transaction_received(&self, message: &[u8]) -> Result<bool, NodeError> {
        let transaction = transport::decode_transaction(message)?;
        let mut state = self.state();
        if state.pool.existing_transaction(self.address()).is_some() {
            debug!(
                "{}: own spend pending, ignoring transaction {}",
                self.name, transaction.id
            );
            return Ok(false);
        }
        state.pool.set_transaction(transaction);
        Ok(true)
    }

    /// Pay `amount` to `recipient`, folding it into this wallet's pending
    /// transaction when there is one, and broadcast the result.
    pub fn transact(&self, recipient: &str, amount: u64) -> Result<Transaction, NodeError> {
        let transaction = {
            let mut state = self.state();
            let NodeState { blockchain, pool } = &mut *state;

            let transaction = match pool.existing_transaction(self.address()).cloned() {
                Some(mut pending) => {
                    pending.update(&self.wallet, recipient, amount)?;
                    pending
                }
                None => self
                    .wallet
                    .create_transaction(recipient, amount, blockchain.chain())?,
            };
            pool.set_transaction(transaction.clone());
            transaction
        };

        self.transport
            .broadcast_transaction(&self.name, &transaction);
        Ok(transaction)
    }

    pub fn mine_transactions(&self) -> Result<Sealed, NodeError> {
        TransactionMiner::new(self).mine_transactions()
    }

    /// Mine an arbitrary payload block and broadcast the chain. Data that
    /// parses as a non-empty transaction list is refused: transfers only
    /// enter blocks through the pool and its checks.
    pub fn mine_data(&self, data: BlockData) -> Result<Sealed, NodeError> {
        if let Some(txs) = data.transactions().filter(|txs| !txs.is_empty()) {
            return Err(NodeError::TransfersInPayload { count: txs.len() });
        }
        let (last_block, mine_rate) = {
            let state = self.state();
            (
                state.blockchain.last_block().clone(),
                state.blockchain.mine_rate(),
            )
        };
        let block = Block::mine_block(&last_block, data, mine_rate);
        self.commit_block(block)
    }

    /// Append a block mined off-lock, drop the pool entries it confirms,
    /// then broadcast the new chain. Fails with `StaleTip` if the chain
    /// moved. Transactions that reached the pool while mining stay there.
    pub(crate) fn commit_block(&self, block: Block) -> Result<Sealed, NodeError> {
        let (sealed, chain) = {
            let mut state = self.state();
            let NodeState { blockchain, pool } = &mut *state;
            let block = blockchain.push_block(block)?.clone();
            let index = blockchain.len() - 1;
            let confirmed = pool.clear_block_transactions(&block);
            info!(
                "{}: appended block #{index} ({}), {confirmed} pool entries confirmed",
                self.name, block.hash
            );
            (Sealed { index, block }, blockchain.chain().to_vec())
        };

        self.transport.broadcast_chain(&self.name, &chain);
        Ok(sealed)
    }
}
