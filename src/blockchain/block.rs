use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{
    GENESIS_HASH, GENESIS_LAST_HASH, GENESIS_TIMESTAMP, INITIAL_DIFFICULTY, MIN_DIFFICULTY,
};
use crate::crypto::{crypto_hash, digest_parts};
use crate::transaction::Transaction;

/// Block body: a list of transactions, or an arbitrary payload
/// (genesis and ad-hoc `mine` requests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockData {
    Transactions(Vec<Transaction>),
    Payload(Value),
}

impl BlockData {
    pub fn transactions(&self) -> Option<&[Transaction]> {
        match self {
            BlockData::Transactions(txs) => Some(txs),
            BlockData::Payload(_) => None,
        }
    }

    /// Canonical JSON used in the block digest.
    fn render(&self) -> String {
        json!(self).to_string()
    }
}

impl From<Vec<Transaction>> for BlockData {
    fn from(txs: Vec<Transaction>) -> Self {
        BlockData::Transactions(txs)
    }
}

impl From<&str> for BlockData {
    fn from(payload: &str) -> Self {
        BlockData::Payload(Value::String(payload.to_owned()))
    }
}

/// A single block in the chain. Immutable once mined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub timestamp: i64, // ms since epoch
    pub last_hash: String,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub data: BlockData,
}

impl Block {
    /// The hardcoded first block of every chain.
    pub fn genesis() -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            last_hash: GENESIS_LAST_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            nonce: 0,
            difficulty: INITIAL_DIFFICULTY,
            data: BlockData::Transactions(Vec::new()),
        }
    }

    /// Digest of the block fields (everything except `hash`).
    pub fn hash_fields(
        timestamp: i64,
        last_hash: &str,
        difficulty: u32,
        nonce: u64,
        data: &BlockData,
    ) -> String {
        crypto_hash(&[
            json!(timestamp),
            json!(last_hash),
            json!(difficulty),
            json!(nonce),
            json!(data),
        ])
    }

    pub fn compute_hash(&self) -> String {
        Self::hash_fields(
            self.timestamp,
            &self.last_hash,
            self.difficulty,
            self.nonce,
            &self.data,
        )
    }

    /// Search nonces until the digest has `difficulty` leading hex zeros.
    /// Timestamp and difficulty are re-read on every attempt.
    pub fn mine_block(last_block: &Block, data: BlockData, mine_rate: i64) -> Self {
        let last_hash_json = json!(last_block.hash).to_string();
        let data_json = data.render();
        let mut nonce: u64 = 0;

        loop {
            nonce = nonce.wrapping_add(1);
            let timestamp = Utc::now().timestamp_millis();
            let difficulty = Self::adjust_difficulty(last_block, timestamp, mine_rate);
            let digest = digest_parts(vec![
                timestamp.to_string(),
                last_hash_json.clone(),
                difficulty.to_string(),
                nonce.to_string(),
                data_json.clone(),
            ]);
            let hash = hex::encode(digest);

            if meets_difficulty(&hash, difficulty) {
                debug!("mined block after {nonce} attempts (difficulty={difficulty}, hash={hash})");
                return Self {
                    timestamp,
                    last_hash: last_block.hash.clone(),
                    hash,
                    nonce,
                    difficulty,
                    data,
                };
            }
        }
    }

    /// One step down when the last block is older than `mine_rate`,
    /// otherwise one step up. Never below [`MIN_DIFFICULTY`].
    pub fn adjust_difficulty(original: &Block, timestamp: i64, mine_rate: i64) -> u32 {
        let difficulty = original.difficulty;
        if timestamp - original.timestamp > mine_rate {
            difficulty.saturating_sub(1).max(MIN_DIFFICULTY)
        } else {
            difficulty + 1
        }
    }

    /// Stored hash satisfies the block's own difficulty.
    pub fn meets_difficulty(&self) -> bool {
        meets_difficulty(&self.hash, self.difficulty)
    }
}

fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let target_prefix = "0".repeat(difficulty as usize);
    hash.starts_with(&target_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::MINE_RATE;

    fn block_at(timestamp: i64, difficulty: u32) -> Block {
        Block {
            timestamp,
            last_hash: "foo-hash".into(),
            hash: "bar-hash".into(),
            nonce: 0,
            difficulty,
            data: "some data".into(),
        }
    }

    #[test]
    fn genesis_is_constant() {
        let g = Block::genesis();
        assert_eq!(g, Block::genesis());
        assert_eq!(g.last_hash, "-");
        assert_eq!(g.difficulty, INITIAL_DIFFICULTY);
        assert_eq!(g.data, BlockData::Transactions(vec![]));
    }

    #[test]
    fn mined_block_links_to_last_block() {
        let last = Block::genesis();
        let mined = Block::mine_block(&last, "mined data".into(), MINE_RATE);

        assert_eq!(mined.last_hash, last.hash);
        assert_eq!(mined.data, BlockData::from("mined data"));
        assert!(mined.timestamp > last.timestamp);
    }

    #[test]
    fn mined_hash_recomputes_and_meets_difficulty() {
        let mined = Block::mine_block(&Block::genesis(), "x".into(), MINE_RATE);
        assert_eq!(mined.hash, mined.compute_hash());
        assert!(mined.meets_difficulty());
        assert!(mined.hash.starts_with(&"0".repeat(mined.difficulty as usize)));
    }

    #[test]
    fn difficulty_moves_by_one_from_last_block() {
        let last = Block::genesis();
        let mined = Block::mine_block(&last, "x".into(), MINE_RATE);
        assert_eq!(last.difficulty.abs_diff(mined.difficulty), 1);
    }

    #[test]
    fn block_rebuilt_from_fields_has_same_hash() {
        let mined = Block::mine_block(&Block::genesis(), "round".into(), MINE_RATE);
        let json = serde_json::to_string(&mined).unwrap();
        let rebuilt: Block = serde_json::from_str(&json).unwrap();

        assert_eq!(rebuilt, mined);
        assert_eq!(rebuilt.compute_hash(), mined.hash);
    }

    #[test]
    fn tampered_data_no_longer_matches_hash() {
        let mut mined = Block::mine_block(&Block::genesis(), "honest".into(), MINE_RATE);
        mined.data = "tampered".into();
        assert_ne!(mined.hash, mined.compute_hash());
    }

    #[test]
    fn raises_difficulty_for_quick_block() {
        let last = block_at(10_000, 4);
        let d = Block::adjust_difficulty(&last, last.timestamp + MINE_RATE - 100, MINE_RATE);
        assert_eq!(d, 5);
    }

    #[test]
    fn lowers_difficulty_for_slow_block() {
        let last = block_at(10_000, 4);
        let d = Block::adjust_difficulty(&last, last.timestamp + MINE_RATE + 100, MINE_RATE);
        assert_eq!(d, 3);
    }

    #[test]
    fn difficulty_has_floor() {
        let last = block_at(10_000, MIN_DIFFICULTY);
        let d = Block::adjust_difficulty(&last, last.timestamp + MINE_RATE * 10, MINE_RATE);
        assert_eq!(d, MIN_DIFFICULTY);
    }

    #[test]
    fn data_serializes_untagged() {
        let payload = serde_json::to_value(BlockData::from("foo")).unwrap();
        assert_eq!(payload, json!("foo"));

        let empty = serde_json::to_value(BlockData::Transactions(vec![])).unwrap();
        assert_eq!(empty, json!([]));
    }
}
