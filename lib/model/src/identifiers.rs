use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};

/// The character that separates the field and the column of a [FieldColumn] in query variables.
///
/// Identifiers only consist of `[A-Za-z0-9_]`, hence the separator can never be part of a field or
/// a column name. The middle dot is a valid continuation character of SPARQL variable names.
pub const VARIABLE_SEPARATOR: char = '\u{B7}';

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier. Validation happens when a schema is loaded.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_identifier!(
    /// Identifies an entity type (e.g., `rdf_entity` or `taxonomy_term`).
    EntityTypeId
);
string_identifier!(
    /// Identifies a bundle of an entity type.
    BundleId
);
string_identifier!(
    /// Identifies a graph partition (e.g., `default` or `draft`).
    GraphId
);
string_identifier!(
    /// The name of a field.
    FieldName
);
string_identifier!(
    /// The name of a column (property) within a field.
    ColumnName
);

/// The composite key of a stored column.
///
/// Fields with multiple properties (e.g., a formatted text with `value` and `format`) store each
/// column under its own predicate. This type replaces `field.column` string keys.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FieldColumn {
    pub field: FieldName,
    pub column: ColumnName,
}

impl FieldColumn {
    /// Creates a new [FieldColumn].
    pub fn new(field: impl Into<FieldName>, column: impl Into<ColumnName>) -> Self {
        Self {
            field: field.into(),
            column: column.into(),
        }
    }

    /// Returns the variable name (without the `?` prefix) that holds the values of this column.
    pub fn variable_name(&self) -> String {
        format!("{}{VARIABLE_SEPARATOR}{}", self.field, self.column)
    }
}

impl Display for FieldColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.field, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_names_do_not_collide() {
        let a = FieldColumn::new("body_value", "format");
        let b = FieldColumn::new("body", "value_format");
        assert_ne!(a.variable_name(), b.variable_name());
    }

    #[test]
    fn identifiers_serialize_transparently() {
        let bundle = BundleId::new("fruit");
        assert_eq!(serde_json::to_string(&bundle).unwrap(), "\"fruit\"");
        assert_eq!(bundle, "fruit");
    }
}
