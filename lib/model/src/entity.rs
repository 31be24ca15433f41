use crate::{BundleId, ColumnName, FieldName, GraphId};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A single reconstructed column value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoredValue {
    /// An IRI.
    Resource { iri: String },
    /// A literal, possibly with a language tag or a datatype.
    Literal {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
    },
    /// A point in time. The Unix timestamp is the canonical value, `display` is an ISO-like local
    /// date time without offset for presentation.
    Timestamp { unix: i64, display: String },
}

impl StoredValue {
    /// Creates a [StoredValue::Resource].
    pub fn resource(iri: impl Into<String>) -> Self {
        StoredValue::Resource { iri: iri.into() }
    }

    /// Creates a [StoredValue::Literal] without language or datatype.
    pub fn literal(value: impl Into<String>) -> Self {
        StoredValue::Literal {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    /// Returns the canonical lexical form of the value.
    pub fn lexical(&self) -> Cow<'_, str> {
        match self {
            StoredValue::Resource { iri } => Cow::Borrowed(iri),
            StoredValue::Literal { value, .. } => Cow::Borrowed(value),
            StoredValue::Timestamp { unix, .. } => Cow::Owned(unix.to_string()),
        }
    }
}

impl From<&str> for StoredValue {
    fn from(value: &str) -> Self {
        StoredValue::literal(value)
    }
}

impl From<String> for StoredValue {
    fn from(value: String) -> Self {
        StoredValue::literal(value)
    }
}

/// One item of a (possibly multi-valued) field, keyed by column.
pub type FieldItem = BTreeMap<ColumnName, StoredValue>;

/// The items of a field, keyed by language code.
pub type FieldTranslations = BTreeMap<String, Vec<FieldItem>>;

/// All field values of an entity.
pub type FieldValues = BTreeMap<FieldName, FieldTranslations>;

/// The data of an entity that is written to a single graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// The IRI of the entity.
    pub id: String,
    pub bundle: BundleId,
    pub fields: FieldValues,
}

impl EntityRecord {
    /// Creates a record without field values.
    pub fn new(id: impl Into<String>, bundle: impl Into<BundleId>) -> Self {
        Self {
            id: id.into(),
            bundle: bundle.into(),
            fields: FieldValues::new(),
        }
    }

    /// Appends an item to `field` in the given `langcode`.
    #[must_use]
    pub fn with_item(
        mut self,
        field: impl Into<FieldName>,
        langcode: impl Into<String>,
        item: FieldItem,
    ) -> Self {
        self.fields
            .entry(field.into())
            .or_default()
            .entry(langcode.into())
            .or_default()
            .push(item);
        self
    }

    /// Appends a single-column item to `field` in the given `langcode`.
    #[must_use]
    pub fn with_value(
        self,
        field: impl Into<FieldName>,
        column: impl Into<ColumnName>,
        langcode: impl Into<String>,
        value: impl Into<StoredValue>,
    ) -> Self {
        let item = FieldItem::from([(column.into(), value.into())]);
        self.with_item(field, langcode, item)
    }
}

/// An entity rebuilt from the triples of the graph that won the priority cascade.
///
/// A fresh value is created on every load from the store. Cached copies are owned by the cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructedEntity {
    /// The IRI of the entity.
    pub id: String,
    /// The graph that supplied the values.
    pub graph: GraphId,
    pub bundle: BundleId,
    pub fields: FieldValues,
}

impl ReconstructedEntity {
    /// Returns the items of `field` in `langcode`.
    pub fn items(&self, field: &str, langcode: &str) -> &[FieldItem] {
        self.fields
            .get(field)
            .and_then(|translations| translations.get(langcode))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the value of `column` of the first item of `field` in `langcode`.
    pub fn value(&self, field: &str, column: &str, langcode: &str) -> Option<&StoredValue> {
        self.items(field, langcode)
            .first()
            .and_then(|item| item.get(column))
    }

    /// Returns the languages in which `field` has values.
    pub fn languages(&self, field: &str) -> Vec<&str> {
        self.fields
            .get(field)
            .map(|translations| translations.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Converts the entity into a record that can be written to another graph.
    pub fn into_record(self) -> EntityRecord {
        EntityRecord {
            id: self.id,
            bundle: self.bundle,
            fields: self.fields,
        }
    }
}
