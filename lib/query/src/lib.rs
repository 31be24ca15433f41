//! Compiles entity queries into SPARQL.
//!
//! The [ConditionCompiler] turns a condition tree into a group graph pattern, the [QueryBuilder]
//! wraps it into a `SELECT` query with a dataset, ordering and paging. The functions in
//! [requests] create the queries and updates used to load and write entities.

mod builder;
mod compiler;
mod fragment;
pub mod requests;
mod serializer;
#[cfg(test)]
mod test_fixtures;

pub use builder::{QueryBuilder, SelectQuery, COUNT_VARIABLE};
pub use compiler::{check_value, ConditionCompiler, BUNDLE_VARIABLE, ENTITY_VARIABLE};
pub use fragment::{QueryFragment, Statement};
pub use serializer::{serialize_literal, serialize_resource, serialize_string, to_variable};
