use async_trait::async_trait;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;
use rdf_entity_common::{QuerySolution, StorageError, TripleStore};
use rdf_entity_model::Quad;
use std::fmt::{Debug, Formatter};

/// A [TripleStore] backed by an embedded in-memory SPARQL store.
///
/// Used for tests and for applications that do not need persistence.
#[derive(Clone)]
pub struct MemoryTripleStore {
    store: Store,
}

impl MemoryTripleStore {
    /// Creates a new empty store.
    pub fn new() -> Result<Self, StorageError> {
        let store = Store::new().map_err(StorageError::backend)?;
        Ok(Self { store })
    }

    /// Inserts `quads` directly, without going through a SPARQL update.
    pub fn load_quads(&self, quads: impl IntoIterator<Item = Quad>) -> Result<(), StorageError> {
        self.store.extend(quads).map_err(StorageError::backend)
    }

    /// Returns the number of quads in the store.
    pub fn len(&self) -> Result<usize, StorageError> {
        self.store.len().map_err(StorageError::backend)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.store.is_empty().map_err(StorageError::backend)
    }
}

impl Debug for MemoryTripleStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTripleStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl TripleStore for MemoryTripleStore {
    async fn query(&self, query: &str) -> Result<Vec<QuerySolution>, StorageError> {
        tracing::debug!("Evaluating query:\n{query}");
        match self.store.query(query).map_err(StorageError::backend)? {
            QueryResults::Solutions(solutions) => solutions
                .collect::<Result<Vec<_>, _>>()
                .map_err(StorageError::backend),
            QueryResults::Boolean(_) => Err(StorageError::unexpected(
                "a boolean result for a SELECT query",
            )),
            QueryResults::Graph(_) => Err(StorageError::unexpected(
                "a graph result for a SELECT query",
            )),
        }
    }

    async fn update(&self, update: &str) -> Result<(), StorageError> {
        tracing::debug!("Executing update:\n{update}");
        self.store.update(update).map_err(StorageError::backend)
    }

    async fn ask(&self, query: &str) -> Result<bool, StorageError> {
        tracing::debug!("Evaluating query:\n{query}");
        match self.store.query(query).map_err(StorageError::backend)? {
            QueryResults::Boolean(result) => Ok(result),
            QueryResults::Solutions(_) | QueryResults::Graph(_) => Err(StorageError::unexpected(
                "a non-boolean result for an ASK query",
            )),
        }
    }
}
