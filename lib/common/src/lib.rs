pub mod error;
mod triple_store;

pub use error::StorageError;
pub use sparesults::QuerySolution;
pub use triple_store::{count, named_node, triple_row, TripleStore};
