//! The storage configuration of entity types.
//!
//! A [Schema] describes, for every entity type, its key fields, its bundles, the graph
//! partitions that hold its entities and the predicates that store its fields. The
//! [FieldMappingResolver] and the [GraphCatalog] are read-only views on an entity type of a
//! schema snapshot. The [SchemaRegistry] owns the current snapshot and replaces it on reload.

mod catalog;
pub mod config;
mod mapping;
mod registry;
mod schema;
#[cfg(test)]
mod test_fixtures;

pub use catalog::{GraphCatalog, GraphDescriptor};
pub use mapping::{FieldMappingResolver, ResolvedMapping};
pub use registry::SchemaRegistry;
pub use schema::{
    BundleDefinition, ColumnMapping, EntityTypeDefinition, EntityTypeSchema, FieldDefinition,
    GraphDefinition, Schema,
};
