pub mod block;
pub mod model;

pub use block::{Block, BlockData};
pub use model::Blockchain;

/// Target milliseconds between blocks; slower blocks lower the difficulty.
pub const MINE_RATE: i64 = 1000;

/// Difficulty of the genesis block (leading hex zeros).
pub const INITIAL_DIFFICULTY: u32 = 3;

/// Difficulty never retargets below this.
pub const MIN_DIFFICULTY: u32 = 1;

/// Balance every address starts with before any chain activity.
pub const STARTING_BALANCE: u64 = 1000;

/// Amount issued by the single reward transaction of a block.
pub const MINING_REWARD: u64 = 50;

pub const GENESIS_TIMESTAMP: i64 = 1;
pub const GENESIS_LAST_HASH: &str = "-";
pub const GENESIS_HASH: &str = "hash-one";
