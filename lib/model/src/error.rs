use crate::{BundleId, ColumnName, EntityTypeId, FieldName, GraphId, Operator};
use oxiri::IriParseError;
use oxrdf::LanguageTagParseError;

/// An error raised while compiling an entity query or resolving schema information for it.
///
/// These errors are raised before any request reaches the triple store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum QueryError {
    /// A string that should be an absolute IRI is not.
    #[error("Invalid IRI '{iri}': {error}")]
    InvalidUri {
        /// The rejected value.
        iri: String,
        /// The parsing error.
        #[source]
        error: IriParseError,
    },
    /// A language tag is not well-formed.
    #[error("Invalid language tag '{tag}': {error}")]
    InvalidLanguageTag {
        /// The rejected tag.
        tag: String,
        /// The parsing error.
        #[source]
        error: LanguageTagParseError,
    },
    /// The field (column) has no storage mapping.
    #[error("The field {field}.{column} of entity type {entity_type} has no storage mapping")]
    UnmappedField {
        entity_type: EntityTypeId,
        field: FieldName,
        column: ColumnName,
    },
    /// The operator cannot be used on the id or the bundle key.
    #[error("The operator {operator} is not allowed on the key field {field}")]
    InvalidKeyOperator { field: FieldName, operator: Operator },
    /// A `NULL` value was used on the id or the bundle key.
    #[error("The key field {field} cannot be compared with NULL")]
    NullKeyValue { field: FieldName },
    /// The value does not fit the operator (e.g., a list for `=` or a scalar for `IN`).
    #[error("The operator {operator} does not support the given value: {reason}")]
    UnsupportedOperatorValue {
        operator: Operator,
        reason: &'static str,
    },
    /// The operator is not known.
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),
    /// A sort direction other than `ASC` or `DESC`.
    #[error("Invalid sort direction '{0}', expected ASC or DESC")]
    InvalidSortDirection(String),
    /// An explicitly requested graph is not part of the graph catalog.
    #[error("The graph {graph} does not exist for entity type {entity_type}")]
    GraphNotFound {
        entity_type: EntityTypeId,
        graph: GraphId,
    },
    /// The entity type is not configured.
    #[error("Unknown entity type {0}")]
    UnknownEntityType(EntityTypeId),
    /// The bundle is not configured for the entity type.
    #[error("Unknown bundle {bundle} for entity type {entity_type}")]
    UnknownBundle {
        entity_type: EntityTypeId,
        bundle: BundleId,
    },
}

impl QueryError {
    /// Creates a [QueryError::UnsupportedOperatorValue].
    pub fn unsupported_value<T>(operator: Operator, reason: &'static str) -> Result<T, Self> {
        Err(QueryError::UnsupportedOperatorValue { operator, reason })
    }
}

/// An error raised while reconstructing a single entity from triples.
///
/// A reconstruction error only affects the subject it refers to. Other entities of the same batch
/// are still reconstructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ReconstructionError {
    /// The subject is declared to be of more than one bundle.
    #[error("The entity {subject} is declared as multiple bundles: {}", .bundles.iter().map(BundleId::as_str).collect::<Vec<_>>().join(", "))]
    AmbiguousBundle {
        subject: String,
        bundles: Vec<BundleId>,
    },
}

/// An error raised while loading a schema configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SchemaError {
    /// The configuration document cannot be parsed.
    #[error("Invalid schema configuration: {0}")]
    Syntax(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    /// An identifier contains characters outside of `[A-Za-z0-9_]`.
    #[error("Invalid identifier '{0}', only ASCII letters, digits and '_' are allowed")]
    InvalidIdentifier(String),
    /// A configured IRI is invalid.
    #[error("Invalid IRI '{iri}' in {location}: {error}")]
    InvalidIri {
        iri: String,
        location: String,
        #[source]
        error: IriParseError,
    },
    /// A configuration element refers to something that does not exist.
    #[error("{location} refers to the unknown {kind} '{name}'")]
    UnknownReference {
        location: String,
        kind: &'static str,
        name: String,
    },
    /// Any other inconsistency.
    #[error("Invalid schema configuration in {location}: {message}")]
    Invalid { location: String, message: String },
}

impl SchemaError {
    /// Creates a [SchemaError::Invalid].
    pub fn invalid(location: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Invalid {
            location: location.into(),
            message: message.into(),
        }
    }
}
