use thiserror::Error;

/// Reasons a chain (or a freshly mined block) is refused.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain is empty")]
    EmptyChain,
    #[error("chain does not start with the genesis block")]
    InvalidGenesis,
    #[error("block #{index}: lastHash does not match the previous block's hash")]
    BrokenLink { index: usize },
    #[error("block #{index}: stored hash does not match its fields")]
    HashMismatch { index: usize },
    #[error("block #{index}: hash does not meet difficulty {difficulty}")]
    InsufficientWork { index: usize, difficulty: u32 },
    #[error("block #{index}: difficulty moved from {from} to {to}")]
    DifficultyJump { index: usize, from: u32, to: u32 },
    #[error("incoming chain must be longer (incoming {incoming}, local {local})")]
    NotLonger { incoming: usize, local: usize },
    #[error("chain tip moved while mining")]
    StaleTip,
    #[error(transparent)]
    TransactionData(#[from] TransactionError),
}

/// Economic and signature failures of individual transactions.
#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("transaction {id}: outputs total {outputs}, input amount is {input}")]
    OutputSumMismatch { id: String, input: u64, outputs: u128 },
    #[error("transaction {id}: invalid signature from {address}")]
    InvalidSignature { id: String, address: String },
    #[error("transaction {id}: reward must pay exactly {expected} to one address")]
    InvalidReward { id: String, expected: u64 },
    #[error("block #{block}: more than one mining reward")]
    MultipleRewards { block: usize },
    #[error("transaction {id}: input amount {claimed} does not match balance {actual}")]
    InvalidInputAmount { id: String, claimed: u64, actual: u64 },
    #[error("transaction {id} appears more than once in the chain")]
    DuplicateTransaction { id: String },
    #[error("block #{block}: {address} pays in more than one transaction")]
    DuplicatePayer { block: usize, address: String },
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientFunds { amount: u64, balance: u64 },
    #[error("invalid private key")]
    InvalidKey,
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("malformed message: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("payload carries {count} transactions; transfers are only mined from the pool")]
    TransfersInPayload { count: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error(transparent)]
    Wallet(#[from] WalletError),
}
