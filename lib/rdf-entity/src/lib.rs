#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod query;
pub mod store;

pub use query::EntityQuery;
pub use store::{EntityStore, EntityStoreOptions};

pub mod error {
    pub use rdf_entity_common::StorageError;
    pub use rdf_entity_model::{QueryError, ReconstructionError, SchemaError};
}

pub mod model {
    pub use rdf_entity_model::*;
}

pub mod schema {
    pub use rdf_entity_schema::*;
}

pub mod sparql {
    pub use rdf_entity_query::*;
}

pub mod storage {
    pub use rdf_entity_common::{QuerySolution, TripleStore};
    pub use rdf_entity_storage::*;
}
