//! The serialized form of a [Schema](crate::Schema).
//!
//! A configuration document is a JSON object that lists all entity types stored in the triple
//! store:
//!
//! ```json
//! {
//!   "entity_types": {
//!     "rdf_entity": {
//!       "id_key": "id",
//!       "bundle_key": "type",
//!       "label_key": "label",
//!       "type_predicates": ["http://www.w3.org/1999/02/22-rdf-syntax-ns#type"],
//!       "graphs": [
//!         { "id": "default", "weight": 0 },
//!         { "id": "draft", "weight": 10, "default": false }
//!       ],
//!       "bundles": {
//!         "fruit": {
//!           "uri": "http://example.com/fruit",
//!           "graphs": {
//!             "default": "http://example.com/fruit/published",
//!             "draft": "http://example.com/fruit/draft"
//!           }
//!         }
//!       },
//!       "fields": {
//!         "label": {
//!           "columns": {
//!             "value": {
//!               "format": "lang_literal",
//!               "predicate": "http://www.w3.org/2000/01/rdf-schema#label"
//!             }
//!           }
//!         }
//!       }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use rdf_entity_model::FieldType;

/// The root of a configuration document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    pub entity_types: BTreeMap<String, EntityTypeConfig>,
}

/// The storage configuration of an entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityTypeConfig {
    /// The field that holds the IRI of an entity.
    pub id_key: String,
    /// The field that holds the bundle of an entity.
    pub bundle_key: String,
    /// The field that holds the label of an entity.
    pub label_key: String,
    /// The predicates whose objects identify the bundle of an entity.
    pub type_predicates: Vec<String>,
    /// The language of values that carry no language tag.
    #[serde(default = "default_langcode")]
    pub default_langcode: String,
    /// The format assigned to long texts that are stored without one.
    #[serde(default = "default_text_format")]
    pub default_text_format: String,
    pub graphs: Vec<GraphConfig>,
    pub bundles: BTreeMap<String, BundleConfig>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldConfig>,
}

fn default_langcode() -> String {
    rdf_entity_model::DEFAULT_LANGCODE.to_owned()
}

fn default_text_format() -> String {
    rdf_entity_model::DEFAULT_TEXT_FORMAT.to_owned()
}

fn enabled_by_default() -> bool {
    true
}

/// A graph partition of an entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    pub id: String,
    /// Lower weights take precedence in the priority cascade.
    #[serde(default)]
    pub weight: i32,
    /// Disabled graphs are only queried when requested explicitly.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Whether the graph belongs to the graphs used when no graphs are requested.
    #[serde(default = "enabled_by_default", rename = "default")]
    pub default_candidate: bool,
}

/// A bundle of an entity type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    /// The object of the type predicate for entities of this bundle.
    pub uri: String,
    /// The namespace in which new ids are minted.
    #[serde(default)]
    pub id_base: Option<String>,
    /// The backing graph IRI for each graph id.
    pub graphs: BTreeMap<String, String>,
}

/// The storage configuration of a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    #[serde(default, rename = "type")]
    pub field_type: FieldType,
    /// The column used when a condition or a sort key does not name one.
    #[serde(default)]
    pub main_column: Option<String>,
    pub columns: BTreeMap<String, ColumnConfig>,
}

/// The storage configuration of a single column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub format: FormatConfig,
    /// The datatype of `typed_literal` columns.
    #[serde(default)]
    pub datatype: Option<String>,
    /// The predicate used by all bundles that do not override it.
    #[serde(default)]
    pub predicate: Option<String>,
    /// Per-bundle predicates. Without a shared `predicate`, the column only exists on these
    /// bundles.
    #[serde(default)]
    pub bundles: BTreeMap<String, String>,
}

/// The serialized [ValueFormat](rdf_entity_model::ValueFormat).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatConfig {
    Resource,
    Literal,
    LangLiteral,
    TypedLiteral,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let graph: GraphConfig = serde_json::from_str(r#"{ "id": "default" }"#).unwrap();
        assert_eq!(graph.weight, 0);
        assert!(graph.enabled);
        assert!(graph.default_candidate);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = serde_json::from_str::<GraphConfig>(r#"{ "id": "default", "wieght": 1 }"#);
        assert!(result.is_err());
    }
}
