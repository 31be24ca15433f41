use chrono::{DateTime, NaiveDateTime};
use rdf_entity_model::vocab::{rdf, xsd};
use rdf_entity_model::{
    BundleId, ColumnName, FieldItem, FieldTranslations, FieldType, FieldValues, GraphId,
    ReconstructedEntity, ReconstructionError, StoredValue, TripleRow,
};
use rdf_entity_schema::EntityTypeDefinition;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// The outcome of loading a single entity. `Ok(None)` means that the entity does not exist in any
/// of the requested graphs.
pub type LoadOutcome = Result<Option<ReconstructedEntity>, ReconstructionError>;

const DISPLAY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

type ColumnValues = BTreeMap<ColumnName, Vec<StoredValue>>;

/// Rebuilds entities from the rows of a multi-graph load query.
///
/// Every subject is resolved independently: the first graph of the priority list that holds at
/// least one triple of the subject supplies all of its values. Rows of other graphs are discarded.
#[derive(Clone, Copy, Debug)]
pub struct EntityReconstructor<'a> {
    definition: &'a EntityTypeDefinition,
}

impl<'a> EntityReconstructor<'a> {
    pub fn new(definition: &'a EntityTypeDefinition) -> Self {
        Self { definition }
    }

    /// Reconstructs the entities `ids` from `rows`.
    ///
    /// The result contains an entry for every requested id. Rows of subjects that have not been
    /// requested and rows of graphs outside the catalog are ignored. The bundle is derived from
    /// the type assertions of all rows, including graphs outside `priority`.
    pub fn reconstruct(
        &self,
        ids: &[&str],
        rows: Vec<TripleRow>,
        priority: &[GraphId],
    ) -> BTreeMap<String, LoadOutcome> {
        let catalog = self.definition.catalog();

        let mut subjects: FxHashMap<String, FxHashMap<GraphId, Vec<TripleRow>>> =
            FxHashMap::default();
        for row in rows {
            let Some(graph) = catalog.graph_of(&row.graph) else {
                tracing::debug!("Ignoring triple of unknown graph {}", row.graph);
                continue;
            };
            subjects
                .entry(row.subject.as_str().to_owned())
                .or_default()
                .entry(graph.clone())
                .or_default()
                .push(row);
        }

        let mut result = BTreeMap::new();
        for id in ids {
            if result.contains_key(*id) {
                continue;
            }
            let outcome = match subjects.remove(*id) {
                Some(graphs) => self.reconstruct_subject(id, &graphs, priority),
                None => Ok(None),
            };
            result.insert((*id).to_owned(), outcome);
        }
        result
    }

    fn reconstruct_subject(
        &self,
        subject: &str,
        graphs: &FxHashMap<GraphId, Vec<TripleRow>>,
        priority: &[GraphId],
    ) -> LoadOutcome {
        let bundle = self.bundle(subject, graphs.values().flatten())?;

        let Some((graph, rows)) = priority
            .iter()
            .find_map(|graph| graphs.get(graph).map(|rows| (graph, rows)))
        else {
            tracing::debug!("Entity {subject} has no triples in the requested graphs");
            return Ok(None);
        };
        tracing::debug!("Graph {graph} supplies the values of entity {subject}");

        let Some(bundle) = bundle else {
            tracing::warn!("Entity {subject} has no type of a known bundle, skipping it");
            return Ok(None);
        };

        Ok(Some(ReconstructedEntity {
            id: subject.to_owned(),
            graph: graph.clone(),
            fields: self.fields(&bundle, rows),
            bundle,
        }))
    }

    /// Derives the bundle from the type assertions of all graphs.
    fn bundle<'r>(
        &self,
        subject: &str,
        rows: impl Iterator<Item = &'r TripleRow>,
    ) -> Result<Option<BundleId>, ReconstructionError> {
        let type_predicates = &self.definition.schema().type_predicates;

        let mut bundles: Vec<BundleId> = Vec::new();
        for row in rows.filter(|row| type_predicates.contains(&row.predicate)) {
            let Some(bundle) = self
                .definition
                .bundles()
                .find(|bundle| row.is_resource && bundle.uri.as_str() == row.object)
            else {
                tracing::warn!(
                    "Ignoring type {} of entity {subject}, it is not a bundle of {}",
                    row.object,
                    self.definition.id()
                );
                continue;
            };
            if !bundles.contains(&bundle.id) {
                bundles.push(bundle.id.clone());
            }
        }

        match bundles.len() {
            0 => Ok(None),
            1 => Ok(bundles.pop()),
            _ => {
                bundles.sort();
                tracing::warn!("Entity {subject} is declared as multiple bundles");
                Err(ReconstructionError::AmbiguousBundle {
                    subject: subject.to_owned(),
                    bundles,
                })
            }
        }
    }

    fn fields(&self, bundle: &BundleId, rows: &[TripleRow]) -> FieldValues {
        let mappings = self.definition.mappings();

        // field -> (language -> column values, language-neutral column values)
        let mut fields: BTreeMap<_, (BTreeMap<String, ColumnValues>, ColumnValues)> =
            BTreeMap::new();
        for row in rows {
            for field_column in mappings.inverse(bundle, &row.predicate) {
                let field_type = mappings
                    .field(field_column.field.as_str())
                    .map(|field| field.field_type)
                    .unwrap_or_default();
                let value = stored_value(row, field_type);
                let (tagged, neutral) = fields.entry(field_column.field.clone()).or_default();
                let columns = match &row.language {
                    Some(language) => tagged.entry(language.to_ascii_lowercase()).or_default(),
                    None => neutral,
                };
                columns
                    .entry(field_column.column.clone())
                    .or_default()
                    .push(value);
            }
        }

        fields
            .into_iter()
            .map(|(field, (tagged, neutral))| {
                let field_type = mappings
                    .field(field.as_str())
                    .map(|field| field.field_type)
                    .unwrap_or_default();
                let translations = self.translations(tagged, &neutral, field_type);
                (field, translations)
            })
            .collect()
    }

    fn translations(
        &self,
        mut tagged: BTreeMap<String, ColumnValues>,
        neutral: &ColumnValues,
        field_type: FieldType,
    ) -> FieldTranslations {
        let schema = self.definition.schema();
        let default_langcode = &schema.default_langcode;

        if !tagged.contains_key(default_langcode) && tagged.len() == 1 {
            if let Some(columns) = tagged.values().next().cloned() {
                tagged.insert(default_langcode.clone(), columns);
            }
        }
        if tagged.is_empty() {
            tagged.insert(default_langcode.clone(), ColumnValues::new());
        }
        for columns in tagged.values_mut() {
            for (column, values) in neutral {
                columns
                    .entry(column.clone())
                    .or_default()
                    .extend(values.iter().cloned());
            }
        }

        tagged
            .into_iter()
            .map(|(language, columns)| {
                let mut items = zip_columns(&columns);
                if field_type == FieldType::LongText {
                    for item in &mut items {
                        item.entry(ColumnName::new("format")).or_insert_with(|| {
                            StoredValue::literal(schema.default_text_format.as_str())
                        });
                    }
                }
                (language, items)
            })
            .collect()
    }
}

/// Builds the items of a field: the n-th item holds the n-th value of every column.
///
/// Items are not linked to their column values in the store, so pairing is positional. Rows arrive
/// in no particular order, hence a field with several items and several stored columns may be
/// paired differently than it was written. Single-column fields and single items are exact.
fn zip_columns(columns: &ColumnValues) -> Vec<FieldItem> {
    let length = columns.values().map(Vec::len).max().unwrap_or_default();
    (0..length)
        .map(|index| {
            columns
                .iter()
                .filter_map(|(column, values)| {
                    values.get(index).map(|value| (column.clone(), value.clone()))
                })
                .collect()
        })
        .collect()
}

fn stored_value(row: &TripleRow, field_type: FieldType) -> StoredValue {
    if row.is_resource {
        return StoredValue::resource(row.object.as_str());
    }
    if field_type == FieldType::Timestamp {
        if let Some((unix, display)) = parse_timestamp(&row.object) {
            return StoredValue::Timestamp { unix, display };
        }
        tracing::warn!("Cannot read '{}' as a timestamp", row.object);
    }
    let datatype = row
        .datatype
        .as_ref()
        .filter(|datatype| **datatype != xsd::STRING && **datatype != rdf::LANG_STRING)
        .map(|datatype| datatype.as_str().to_owned());
    StoredValue::Literal {
        value: row.object.clone(),
        language: row.language.clone(),
        datatype,
    }
}

/// Reads a Unix timestamp or an `xsd:dateTime` value.
///
/// The display form is the wall clock time with the offset removed. Values without an offset are
/// read as UTC.
fn parse_timestamp(lexical: &str) -> Option<(i64, String)> {
    let lexical = lexical.trim();
    if let Ok(unix) = lexical.parse::<i64>() {
        let date_time = DateTime::from_timestamp(unix, 0)?;
        return Some((unix, date_time.naive_utc().format(DISPLAY_FORMAT).to_string()));
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(lexical) {
        let display = date_time.naive_local().format(DISPLAY_FORMAT).to_string();
        return Some((date_time.timestamp(), display));
    }
    let naive = NaiveDateTime::parse_from_str(lexical, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some((
        naive.and_utc().timestamp(),
        naive.format(DISPLAY_FORMAT).to_string(),
    ))
}
