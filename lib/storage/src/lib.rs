//! The storage engine of RDF entities.
//!
//! Loading an entity resolves, per subject, which graph partition supplies its values
//! ([EntityReconstructor]) and caches the outcome per graph ([EntityCache]). Writes convert
//! records back to quads through the forward field mapping ([EntityWriter]).
//! [MemoryTripleStore] implements the triple store client on top of an embedded SPARQL store.

mod cache;
mod memory_store;
mod reconstruction;
#[cfg(test)]
mod test_fixtures;
mod writer;

pub use cache::{CacheBackend, CacheLookup, EntityCache, Generation, MemoryCacheBackend};
pub use memory_store::MemoryTripleStore;
pub use reconstruction::{EntityReconstructor, LoadOutcome};
pub use writer::EntityWriter;
