pub mod model;
pub mod pool;

pub use model::{Transaction, TxInput};
pub use pool::TransactionPool;
