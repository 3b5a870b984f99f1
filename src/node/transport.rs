use std::sync::{Arc, Mutex, Weak};

use log::{debug, error, warn};

use super::Node;
use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Pub/sub topics a node publishes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Blockchain,
    Transaction,
}

/// Outbound fan-out of whole values to peers. Delivery is best effort;
/// receivers apply what they get through [`Node::deliver`].
pub trait Transport: Send + Sync {
    fn broadcast_chain(&self, from: &str, chain: &[Block]);
    fn broadcast_transaction(&self, from: &str, transaction: &Transaction);
}

pub fn encode_chain(chain: &[Block]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(chain)
}

pub fn decode_chain(bytes: &[u8]) -> Result<Vec<Block>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

pub fn encode_transaction(transaction: &Transaction) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(transaction)
}

pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Transport for a standalone node: nothing leaves the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn broadcast_chain(&self, from: &str, chain: &[Block]) {
        debug!("{from}: no peers for chain of {} blocks", chain.len());
    }

    fn broadcast_transaction(&self, from: &str, transaction: &Transaction) {
        debug!("{from}: no peers for transaction {}", transaction.id);
    }
}

/// In-process hub delivering every message to all subscribed nodes except
/// the publisher. Holds weak references so nodes can be dropped freely.
#[derive(Default)]
pub struct MemoryHub {
    subscribers: Mutex<Vec<Weak<Node>>>,
}

impl MemoryHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(&self, node: &Arc<Node>) {
        let mut subscribers = self.subscribers.lock().expect("mutex poisoned");
        subscribers.retain(|w| w.strong_count() > 0);
        subscribers.push(Arc::downgrade(node));
    }

    fn publish(&self, from: &str, channel: Channel, message: &[u8]) {
        // collect first so no hub lock is held while peers handle the message
        let targets: Vec<Arc<Node>> = {
            let subscribers = self.subscribers.lock().expect("mutex poisoned");
            subscribers
                .iter()
                .filter_map(Weak::upgrade)
                .filter(|node| node.name() != from)
                .collect()
        };

        debug!(
            "{from}: publishing {channel:?} ({} bytes) to {} peers",
            message.len(),
            targets.len()
        );
        for node in targets {
            if let Err(e) = node.deliver(channel, message) {
                warn!("{}: dropped {channel:?} message from {from}: {e}", node.name());
            }
        }
    }
}

impl Transport for MemoryHub {
    fn broadcast_chain(&self, from: &str, chain: &[Block]) {
        match encode_chain(chain) {
            Ok(bytes) => self.publish(from, Channel::Blockchain, &bytes),
            Err(e) => error!("{from}: cannot encode chain: {e}"),
        }
    }

    fn broadcast_transaction(&self, from: &str, transaction: &Transaction) {
        match encode_transaction(transaction) {
            Ok(bytes) => self.publish(from, Channel::Transaction, &bytes),
            Err(e) => error!("{from}: cannot encode transaction: {e}"),
        }
    }
}
