use std::collections::HashSet;

use log::{error, info};

use super::{Block, BlockData, MIN_DIFFICULTY, MINE_RATE};
use crate::error::{ChainError, TransactionError};
use crate::transaction::TxInput;
use crate::wallet::Wallet;

/// In-memory chain, always rooted at the genesis block.
#[derive(Debug, Clone)]
pub struct Blockchain {
    chain: Vec<Block>,
    mine_rate: i64,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    pub fn new() -> Self {
        Self::with_mine_rate(MINE_RATE)
    }

    /// Chain whose miner retargets against `mine_rate` milliseconds.
    /// Validation does not depend on it.
    pub fn with_mine_rate(mine_rate: i64) -> Self {
        Self {
            chain: vec![Block::genesis()],
            mine_rate,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("Blockchain should always have at least the genesis block")
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Never true: the genesis block is always present.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn mine_rate(&self) -> i64 {
        self.mine_rate
    }

    /// Mine `data` on top of the tip and append it.
    pub fn add_block(&mut self, data: BlockData) -> &Block {
        let block = Block::mine_block(self.last_block(), data, self.mine_rate);
        self.chain.push(block);
        self.last_block()
    }

    /// Append a block mined elsewhere (e.g. off-lock) against this tip.
    pub fn push_block(&mut self, block: Block) -> Result<&Block, ChainError> {
        if block.last_hash != self.last_block().hash {
            return Err(ChainError::StaleTip);
        }
        validate_successor(self.last_block(), &block, self.chain.len())?;
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Structural and cryptographic checks: genesis, linkage, recomputed
    /// hashes, proof of work and the difficulty step. Ignores transactions.
    pub fn validate_chain(chain: &[Block]) -> Result<(), ChainError> {
        let first = chain.first().ok_or(ChainError::EmptyChain)?;
        if *first != Block::genesis() {
            return Err(ChainError::InvalidGenesis);
        }

        for (i, pair) in chain.windows(2).enumerate() {
            validate_successor(&pair[0], &pair[1], i + 1)?;
        }
        Ok(())
    }

    pub fn is_valid_chain(chain: &[Block]) -> bool {
        match Self::validate_chain(chain) {
            Ok(()) => true,
            Err(e) => {
                error!("invalid chain: {e}");
                false
            }
        }
    }

    /// Economic checks over every block after genesis: one reward at most,
    /// each transaction valid on its own, unique ids across the chain, one
    /// spend per payer per block, and every claimed input amount equal to
    /// the payer's balance on the chain before that block.
    pub fn validate_transaction_data(chain: &[Block]) -> Result<(), ChainError> {
        let mut seen_ids = HashSet::new();

        for (i, block) in chain.iter().enumerate().skip(1) {
            let Some(txs) = block.data.transactions() else {
                continue;
            };
            let mut reward_count = 0;
            let mut payers = HashSet::new();

            for tx in txs {
                if !seen_ids.insert(tx.id.as_str()) {
                    return Err(TransactionError::DuplicateTransaction { id: tx.id.clone() }.into());
                }
                tx.validate()?;

                match &tx.input {
                    TxInput::Reward { .. } => {
                        reward_count += 1;
                        if reward_count > 1 {
                            return Err(TransactionError::MultipleRewards { block: i }.into());
                        }
                    }
                    TxInput::Ordinary {
                        amount, address, ..
                    } => {
                        if !payers.insert(address.as_str()) {
                            return Err(TransactionError::DuplicatePayer {
                                block: i,
                                address: address.clone(),
                            }
                            .into());
                        }
                        let actual = Wallet::calculate_balance(&chain[..i], address);
                        if *amount != actual {
                            return Err(TransactionError::InvalidInputAmount {
                                id: tx.id.clone(),
                                claimed: *amount,
                                actual,
                            }
                            .into());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn valid_transaction_data(chain: &[Block]) -> bool {
        match Self::validate_transaction_data(chain) {
            Ok(()) => true,
            Err(e) => {
                error!("invalid transaction data: {e}");
                false
            }
        }
    }

    pub fn replace_chain(
        &mut self,
        incoming: Vec<Block>,
        validate_transactions: bool,
    ) -> Result<(), ChainError> {
        self.replace_chain_with(incoming, validate_transactions, |_| {})
    }

    /// Adopt `incoming` wholesale if it is strictly longer and valid, then
    /// hand the new chain to `on_replace`. The local chain is untouched on
    /// any rejection.
    pub fn replace_chain_with<F>(
        &mut self,
        incoming: Vec<Block>,
        validate_transactions: bool,
        on_replace: F,
    ) -> Result<(), ChainError>
    where
        F: FnOnce(&[Block]),
    {
        if incoming.len() <= self.chain.len() {
            let e = ChainError::NotLonger {
                incoming: incoming.len(),
                local: self.chain.len(),
            };
            error!("chain replacement refused: {e}");
            return Err(e);
        }

        let checked = Self::validate_chain(&incoming).and_then(|()| {
            if validate_transactions {
                Self::validate_transaction_data(&incoming)
            } else {
                Ok(())
            }
        });
        if let Err(e) = checked {
            error!("chain replacement refused: {e}");
            return Err(e);
        }

        info!(
            "replacing chain ({} -> {} blocks)",
            self.chain.len(),
            incoming.len()
        );
        self.chain = incoming;
        on_replace(&self.chain);
        Ok(())
    }
}

/// Link, hash, difficulty-step and work checks of `block` against `prev`.
fn validate_successor(prev: &Block, block: &Block, index: usize) -> Result<(), ChainError> {
    if block.last_hash != prev.hash {
        return Err(ChainError::BrokenLink { index });
    }
    if block.hash != block.compute_hash() {
        return Err(ChainError::HashMismatch { index });
    }
    if !difficulty_step_allowed(prev.difficulty, block.difficulty) {
        return Err(ChainError::DifficultyJump {
            index,
            from: prev.difficulty,
            to: block.difficulty,
        });
    }
    if !block.meets_difficulty() {
        return Err(ChainError::InsufficientWork {
            index,
            difficulty: block.difficulty,
        });
    }
    Ok(())
}

/// Exactly one step either way; staying put only at the floor.
pub fn difficulty_step_allowed(from: u32, to: u32) -> bool {
    from.abs_diff(to) == 1 || (from == MIN_DIFFICULTY && to == MIN_DIFFICULTY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::MINING_REWARD;
    use crate::transaction::Transaction;
    use chrono::Utc;
    use serde_json::json;

    fn fast_chain() -> Blockchain {
        Blockchain::with_mine_rate(0)
    }

    fn three_block_chain() -> Blockchain {
        let mut bc = fast_chain();
        bc.add_block("Bears".into());
        bc.add_block("Beets".into());
        bc.add_block("Battlestar Galactica".into());
        bc
    }

    #[test]
    fn starts_with_genesis() {
        let bc = Blockchain::new();
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.chain()[0], Block::genesis());
        assert_eq!(bc.mine_rate(), MINE_RATE);
    }

    #[test]
    fn adds_new_block() {
        let mut bc = Blockchain::new();
        bc.add_block("foo".into());

        assert_eq!(bc.len(), 2);
        assert_eq!(bc.chain()[1].data, BlockData::from("foo"));
        assert!(Blockchain::is_valid_chain(bc.chain()));
    }

    #[test]
    fn rejects_fake_genesis() {
        let mut chain = three_block_chain().chain().to_vec();
        chain[0].data = BlockData::Payload(json!("fake-genesis"));
        assert!(matches!(
            Blockchain::validate_chain(&chain),
            Err(ChainError::InvalidGenesis)
        ));
        assert!(!Blockchain::is_valid_chain(&chain));
    }

    #[test]
    fn rejects_empty_chain() {
        assert!(matches!(
            Blockchain::validate_chain(&[]),
            Err(ChainError::EmptyChain)
        ));
    }

    #[test]
    fn rejects_changed_last_hash() {
        let mut chain = three_block_chain().chain().to_vec();
        chain[2].last_hash = "broken-lastHash".into();
        assert!(matches!(
            Blockchain::validate_chain(&chain),
            Err(ChainError::BrokenLink { index: 2 })
        ));
    }

    #[test]
    fn rejects_tampered_field() {
        let mut chain = three_block_chain().chain().to_vec();
        chain[2].data = "some-evil-data".into();
        assert!(matches!(
            Blockchain::validate_chain(&chain),
            Err(ChainError::HashMismatch { index: 2 })
        ));
    }

    #[test]
    fn rejects_jumped_difficulty() {
        let mut chain = three_block_chain().chain().to_vec();
        let last = chain.last().unwrap().clone();
        let timestamp = Utc::now().timestamp_millis();
        let difficulty = last.difficulty + 3;
        let data = BlockData::Transactions(vec![]);
        let hash = Block::hash_fields(timestamp, &last.hash, difficulty, 0, &data);
        chain.push(Block {
            timestamp,
            last_hash: last.hash,
            hash,
            nonce: 0,
            difficulty,
            data,
        });

        assert!(matches!(
            Blockchain::validate_chain(&chain),
            Err(ChainError::DifficultyJump { index: 4, .. })
        ));
    }

    #[test]
    fn rejects_block_without_work() {
        let mut chain = three_block_chain().chain().to_vec();
        let last = chain.last().unwrap().clone();
        let difficulty = last.difficulty + 1;
        let data = BlockData::from("lazy");
        // search for a nonce whose hash misses the target
        let (nonce, hash) = (0u64..)
            .map(|n| (n, Block::hash_fields(5, &last.hash, difficulty, n, &data)))
            .find(|(_, h)| !h.starts_with('0'))
            .unwrap();
        chain.push(Block {
            timestamp: 5,
            last_hash: last.hash,
            hash,
            nonce,
            difficulty,
            data,
        });

        assert!(matches!(
            Blockchain::validate_chain(&chain),
            Err(ChainError::InsufficientWork { index: 4, .. })
        ));
    }

    #[test]
    fn accepts_valid_chain() {
        let bc = three_block_chain();
        assert!(Blockchain::validate_chain(bc.chain()).is_ok());
    }

    #[test]
    fn difficulty_steps() {
        assert!(difficulty_step_allowed(3, 4));
        assert!(difficulty_step_allowed(3, 2));
        assert!(difficulty_step_allowed(MIN_DIFFICULTY, MIN_DIFFICULTY));
        assert!(!difficulty_step_allowed(3, 3));
        assert!(!difficulty_step_allowed(3, 5));
    }

    #[test]
    fn replace_refuses_shorter_or_equal_chain() {
        let mut bc = three_block_chain();
        let original = bc.chain().to_vec();

        let mut equal = original.clone();
        equal[1].data = "other".into();
        assert!(matches!(
            bc.replace_chain(equal, false),
            Err(ChainError::NotLonger { .. })
        ));
        assert!(bc.replace_chain(vec![Block::genesis()], false).is_err());
        assert_eq!(bc.chain(), original.as_slice());
    }

    #[test]
    fn replace_refuses_longer_invalid_chain() {
        let mut bc = fast_chain();
        let original = bc.chain().to_vec();
        let mut incoming = three_block_chain().chain().to_vec();
        incoming[2].hash = "some-fake-hash".into();

        let mut called = false;
        let result = bc.replace_chain_with(incoming, false, |_| called = true);

        assert!(result.is_err());
        assert!(!called);
        assert_eq!(bc.chain(), original.as_slice());
    }

    #[test]
    fn replace_adopts_longer_valid_chain() {
        let mut bc = fast_chain();
        let incoming = three_block_chain().chain().to_vec();

        let mut seen = 0;
        bc.replace_chain_with(incoming.clone(), false, |c| seen = c.len())
            .unwrap();

        assert_eq!(bc.chain(), incoming.as_slice());
        assert_eq!(seen, 4);
    }

    #[test]
    fn replace_checks_transactions_only_when_asked() {
        let wallet = Wallet::new();
        let mut tx = wallet
            .create_transaction("foo-address", 65, fast_chain().chain())
            .unwrap();
        tx.output_map.insert(wallet.address().to_string(), 9999);

        let mut other = fast_chain();
        other.add_block(vec![tx].into());
        let incoming = other.chain().to_vec();

        let mut strict = fast_chain();
        assert!(matches!(
            strict.replace_chain(incoming.clone(), true),
            Err(ChainError::TransactionData(_))
        ));
        assert_eq!(strict.len(), 1);

        let mut lax = fast_chain();
        assert!(lax.replace_chain(incoming, false).is_ok());
        assert_eq!(lax.len(), 2);
    }

    #[test]
    fn push_block_requires_current_tip() {
        let mut bc = fast_chain();
        let stale_parent = bc.last_block().clone();
        bc.add_block("first".into());

        let late = Block::mine_block(&stale_parent, "late".into(), 0);
        assert!(matches!(bc.push_block(late), Err(ChainError::StaleTip)));

        let fresh = Block::mine_block(bc.last_block(), "fresh".into(), 0);
        assert!(bc.push_block(fresh).is_ok());
        assert_eq!(bc.len(), 3);
    }

    mod transaction_data {
        use super::*;

        struct Fixture {
            wallet: Wallet,
            transaction: Transaction,
            reward: Transaction,
            chain: Blockchain,
        }

        fn fixture() -> Fixture {
            let wallet = Wallet::new();
            let chain = fast_chain();
            let transaction = wallet
                .create_transaction("foo-address", 65, chain.chain())
                .unwrap();
            let reward = Transaction::reward(wallet.address());
            Fixture {
                wallet,
                transaction,
                reward,
                chain,
            }
        }

        fn error_of(chain: &Blockchain) -> TransactionError {
            match Blockchain::validate_transaction_data(chain.chain()) {
                Err(ChainError::TransactionData(e)) => e,
                other => panic!("expected transaction error, got {other:?}"),
            }
        }

        #[test]
        fn valid_data_passes() {
            let mut f = fixture();
            f.chain.add_block(vec![f.transaction, f.reward].into());
            assert!(Blockchain::valid_transaction_data(f.chain.chain()));
        }

        #[test]
        fn payload_blocks_carry_no_transfers() {
            let mut f = fixture();
            f.chain.add_block("foo".into());
            f.chain.add_block(vec![f.transaction, f.reward].into());
            assert!(Blockchain::valid_transaction_data(f.chain.chain()));
        }

        #[test]
        fn later_spend_must_claim_updated_balance() {
            let mut f = fixture();
            f.chain.add_block(vec![f.transaction, f.reward].into());

            let next = f
                .wallet
                .create_transaction("bar-address", 10, f.chain.chain())
                .unwrap();
            assert_eq!(
                next.output_map[f.wallet.address()],
                1000 - 65 + MINING_REWARD - 10
            );
            f.chain.add_block(vec![next].into());
            assert!(Blockchain::valid_transaction_data(f.chain.chain()));
        }

        #[test]
        fn multiple_rewards_fail() {
            let mut f = fixture();
            let second = Transaction::reward(f.wallet.address());
            f.chain
                .add_block(vec![f.transaction, f.reward, second].into());
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::MultipleRewards { block: 1 }
            ));
            assert!(!Blockchain::valid_transaction_data(f.chain.chain()));
        }

        #[test]
        fn malformed_output_map_fails() {
            let mut f = fixture();
            f.transaction
                .output_map
                .insert(f.wallet.address().to_string(), 9999);
            f.chain.add_block(vec![f.transaction, f.reward].into());
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::OutputSumMismatch { .. }
            ));
        }

        #[test]
        fn malformed_reward_fails() {
            let mut f = fixture();
            f.reward
                .output_map
                .insert(f.wallet.address().to_string(), 9999);
            f.chain.add_block(vec![f.transaction, f.reward].into());
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::InvalidReward { .. }
            ));
        }

        #[test]
        fn forged_signature_fails() {
            let mut f = fixture();
            if let TxInput::Ordinary { signature, .. } = &mut f.transaction.input {
                *signature = Wallet::new().sign(&json!(f.transaction.output_map));
            }
            f.chain.add_block(vec![f.transaction].into());
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::InvalidSignature { .. }
            ));
        }

        #[test]
        fn wrong_input_balance_fails() {
            let mut f = fixture();
            let wrong = Transaction::new(&f.wallet, 8000, "someRecipient", 100).unwrap();
            f.chain.add_block(vec![wrong, f.reward].into());
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::InvalidInputAmount {
                    claimed: 8000,
                    actual: 1000,
                    ..
                }
            ));
        }

        #[test]
        fn identical_transactions_fail() {
            let mut f = fixture();
            f.chain.add_block(
                vec![
                    f.transaction.clone(),
                    f.transaction.clone(),
                    f.transaction,
                    f.reward,
                ]
                .into(),
            );
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::DuplicateTransaction { .. }
            ));
        }

        #[test]
        fn transaction_repeated_in_later_block_fails() {
            let mut f = fixture();
            f.chain.add_block(vec![f.transaction.clone()].into());
            f.chain.add_block(vec![f.transaction].into());
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::DuplicateTransaction { .. }
            ));
        }

        #[test]
        fn two_spends_by_one_payer_fail() {
            let mut f = fixture();
            let second = f
                .wallet
                .create_transaction("bar-address", 5, f.chain.chain())
                .unwrap();
            f.chain.add_block(vec![f.transaction, second].into());
            assert!(matches!(
                error_of(&f.chain),
                TransactionError::DuplicatePayer { block: 1, .. }
            ));
        }
    }
}
