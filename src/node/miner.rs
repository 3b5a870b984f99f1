use log::{info, warn};

use super::{Node, NodeState, Sealed};
use crate::blockchain::Block;
use crate::error::NodeError;
use crate::transaction::{Transaction, TxInput};
use crate::wallet::Wallet;

/// Drives one mining round for a node: pool candidates plus a reward,
/// proof of work off the node lock, then append, purge and broadcast.
pub struct TransactionMiner<'a> {
    node: &'a Node,
}

impl<'a> TransactionMiner<'a> {
    pub fn new(node: &'a Node) -> Self {
        Self { node }
    }

    pub fn mine_transactions(&self) -> Result<Sealed, NodeError> {
        let (last_block, mine_rate, mut transactions) = {
            let mut state = self.node.state();
            let NodeState { blockchain, pool } = &mut *state;
            let (transactions, stale): (Vec<Transaction>, Vec<Transaction>) = pool
                .valid_transactions()
                .into_iter()
                .partition(|tx| claims_current_balance(tx, blockchain.chain()));
            for tx in &stale {
                pool.remove(&tx.id);
            }
            (
                blockchain.last_block().clone(),
                blockchain.mine_rate(),
                transactions,
            )
        };

        transactions.push(Transaction::reward(self.node.address()));
        let count = transactions.len();

        let block = Block::mine_block(&last_block, transactions.into(), mine_rate);
        let sealed = self.node.commit_block(block)?;
        info!(
            "{}: sealed block {} with {count} transactions (difficulty={}, nonce={})",
            self.node.name(),
            sealed.block.hash,
            sealed.block.difficulty,
            sealed.block.nonce
        );
        Ok(sealed)
    }
}

/// Pending spends signed against an older chain would make the block
/// unacceptable to peers; they are dropped from the pool.
fn claims_current_balance(tx: &Transaction, chain: &[Block]) -> bool {
    let TxInput::Ordinary {
        amount, address, ..
    } = &tx.input
    else {
        return true;
    };
    let balance = Wallet::calculate_balance(chain, address);
    if *amount != balance {
        warn!(
            "miner: dropping {}: input amount {amount} but balance is {balance}",
            tx.id
        );
        return false;
    }
    true
}
