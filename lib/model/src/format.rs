use oxrdf::NamedNode;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Describes how the values of a column are represented as RDF objects.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueFormat {
    /// The value is an IRI.
    Resource,
    /// The value is a simple literal without language tag or datatype.
    PlainLiteral,
    /// The value is a literal carrying the language of the translation it belongs to.
    LanguageTaggedLiteral,
    /// The value is a literal with the given datatype.
    TypedLiteral(NamedNode),
}

impl ValueFormat {
    /// Returns whether values of this format are IRIs.
    pub fn is_resource(&self) -> bool {
        matches!(self, ValueFormat::Resource)
    }

    /// Returns the datatype of a [ValueFormat::TypedLiteral].
    pub fn datatype(&self) -> Option<&NamedNode> {
        match self {
            ValueFormat::TypedLiteral(datatype) => Some(datatype),
            _ => None,
        }
    }
}

impl Display for ValueFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueFormat::Resource => f.write_str("resource"),
            ValueFormat::PlainLiteral => f.write_str("literal"),
            ValueFormat::LanguageTaggedLiteral => f.write_str("lang_literal"),
            ValueFormat::TypedLiteral(datatype) => write!(f, "typed_literal({datatype})"),
        }
    }
}

/// The kind of field a column belongs to. Some kinds receive special treatment when entities are
/// reconstructed from triples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// No special treatment.
    #[default]
    Generic,
    /// A formatted long text. Items without a `format` column receive the default text format.
    LongText,
    /// A point in time, exposed as a Unix timestamp.
    Timestamp,
}
