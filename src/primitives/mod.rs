// Chain data structures delivered by the consensus layer
pub mod block;
pub mod transaction;
pub mod uxout;

pub use block::{Block, BlockHeader};
pub use transaction::{Transaction, TransactionOutput};
pub use uxout::{UxBody, UxHead, UxOut};
