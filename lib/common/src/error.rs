use rdf_entity_model::{GraphId, QueryError, ReconstructionError};
use std::error::Error;

/// An error related to storage operations (reads, writes...).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The triple store rejected a request or could not be reached.
    #[error("{0}")]
    Backend(#[source] Box<dyn Error + Send + Sync + 'static>),
    /// The triple store answered with a result of an unexpected shape.
    #[error("Unexpected result from the triple store: {0}")]
    UnexpectedResult(String),
    /// An entity with the same id already exists in the target graph.
    #[error("The entity {id} already exists in graph {graph}")]
    DuplicateId { id: String, graph: GraphId },
    /// The request could not be compiled.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// An entity could not be reconstructed.
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
}

impl StorageError {
    /// Wraps any backend error.
    pub fn backend(error: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Backend(error.into())
    }

    /// Creates a [StorageError::UnexpectedResult].
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResult(message.into())
    }
}
