use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use super::model::Transaction;
use crate::blockchain::Block;

/// Pending transactions keyed by id.
#[derive(Debug, Default)]
pub struct TransactionPool {
    transaction_map: HashMap<String, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self {
            transaction_map: HashMap::new(),
        }
    }

    /// Insert or overwrite by id.
    pub fn set_transaction(&mut self, transaction: Transaction) {
        debug!("pool: set transaction {}", transaction.id);
        self.transaction_map
            .insert(transaction.id.clone(), transaction);
    }

    /// Pending transaction paid by `address`, if any.
    pub fn existing_transaction(&self, address: &str) -> Option<&Transaction> {
        self.transaction_map
            .values()
            .find(|tx| tx.input.address() == Some(address))
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transaction_map.get(id)
    }

    pub fn transaction_map(&self) -> &HashMap<String, Transaction> {
        &self.transaction_map
    }

    pub fn len(&self) -> usize {
        self.transaction_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transaction_map.is_empty()
    }

    /// Candidates for the next block, oldest first. Skips entries that fail
    /// their standalone checks, reward transactions (the miner adds its own)
    /// and any second spend by a payer already picked.
    pub fn valid_transactions(&self) -> Vec<Transaction> {
        let mut candidates: Vec<&Transaction> = self.transaction_map.values().collect();
        candidates.sort_by(|a, b| {
            a.input
                .timestamp()
                .cmp(&b.input.timestamp())
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut payers = HashSet::new();
        let mut picked = Vec::with_capacity(candidates.len());
        for tx in candidates {
            if tx.input.is_reward() {
                warn!("pool: skipping reward transaction {}", tx.id);
                continue;
            }
            if !tx.is_valid() {
                warn!("pool: skipping invalid transaction {}", tx.id);
                continue;
            }
            if let Some(address) = tx.input.address() {
                if !payers.insert(address) {
                    warn!("pool: skipping second spend {} from {address}", tx.id);
                    continue;
                }
            }
            picked.push(tx.clone());
        }
        picked
    }

    pub fn clear(&mut self) {
        self.transaction_map.clear();
    }

    pub fn remove(&mut self, id: &str) -> Option<Transaction> {
        self.transaction_map.remove(id)
    }

    /// Drop the pending transactions `block` confirms. Returns how many
    /// were removed.
    pub fn clear_block_transactions(&mut self, block: &Block) -> usize {
        let Some(txs) = block.data.transactions() else {
            return 0;
        };
        let mut removed = 0;
        for tx in txs {
            if let Some(pending) = self.transaction_map.remove(&tx.id) {
                if pending != *tx {
                    warn!("pool: pending update of {} superseded by the mined version", tx.id);
                }
                removed += 1;
            }
        }
        removed
    }

    /// Drop every pending transaction that already appears in `chain`.
    pub fn clear_blockchain_transactions(&mut self, chain: &[Block]) {
        let removed: usize = chain
            .iter()
            .skip(1)
            .map(|block| self.clear_block_transactions(block))
            .sum();
        debug!(
            "pool: cleared {removed} mined transactions ({} left)",
            self.transaction_map.len()
        );
    }
}
