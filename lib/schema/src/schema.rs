use crate::catalog::GraphCatalog;
use crate::config::{
    BundleConfig, ColumnConfig, EntityTypeConfig, FieldConfig, FormatConfig, GraphConfig,
    SchemaConfig,
};
use crate::mapping::FieldMappingResolver;
use rdf_entity_model::{
    BundleId, ColumnName, EntityTypeId, FieldColumn, FieldName, FieldType, GraphId, Literal,
    NamedNode, QueryError, SchemaError, ValueFormat,
};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::LazyLock;

#[allow(clippy::expect_used, reason = "The pattern is a constant")]
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Za-z0-9_]+$").expect("Valid identifier pattern"));

/// A validated snapshot of the storage configuration of all entity types.
///
/// A [Schema] is immutable. Configuration changes produce a new snapshot with a higher
/// [version](Self::version) through the [SchemaRegistry](crate::SchemaRegistry).
#[derive(Debug)]
pub struct Schema {
    version: u64,
    entity_types: BTreeMap<EntityTypeId, EntityTypeDefinition>,
}

impl Schema {
    /// Validates `config` and creates a snapshot with the given `version`.
    pub fn from_config(config: SchemaConfig, version: u64) -> Result<Self, SchemaError> {
        let entity_types = config
            .entity_types
            .into_iter()
            .map(|(id, config)| {
                let id = EntityTypeId::new(identifier(id)?);
                let definition = EntityTypeDefinition::try_new(id.clone(), config)?;
                Ok((id, definition))
            })
            .collect::<Result<_, SchemaError>>()?;
        Ok(Self {
            version,
            entity_types,
        })
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str, version: u64) -> Result<Self, SchemaError> {
        let config = serde_json::from_str(json).map_err(|e| SchemaError::Syntax(Box::new(e)))?;
        Self::from_config(config, version)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns the definition of `entity_type`.
    pub fn entity_type(&self, entity_type: &str) -> Result<&EntityTypeDefinition, QueryError> {
        self.entity_types
            .get(entity_type)
            .ok_or_else(|| QueryError::UnknownEntityType(EntityTypeId::new(entity_type)))
    }

    pub fn entity_types(&self) -> impl Iterator<Item = &EntityTypeDefinition> {
        self.entity_types.values()
    }
}

/// The key fields and type predicates of an entity type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityTypeSchema {
    pub id: EntityTypeId,
    pub id_key: FieldName,
    pub bundle_key: FieldName,
    pub label_key: FieldName,
    /// The predicates whose objects are bundle URIs. Never empty.
    pub type_predicates: Vec<NamedNode>,
    pub default_langcode: String,
    pub default_text_format: String,
}

impl EntityTypeSchema {
    /// Returns whether `field` is the id key or the bundle key.
    pub fn is_key(&self, field: &FieldName) -> bool {
        *field == self.id_key || *field == self.bundle_key
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleDefinition {
    pub id: BundleId,
    /// The object of the type predicate for entities of this bundle.
    pub uri: NamedNode,
    /// The namespace of generated ids.
    pub id_base: Option<NamedNode>,
    /// The backing graph of each graph partition that hosts this bundle.
    pub graphs: BTreeMap<GraphId, NamedNode>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphDefinition {
    pub id: GraphId,
    pub weight: i32,
    pub enabled: bool,
    pub default_candidate: bool,
}

/// The storage mapping of a single column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnMapping {
    pub format: ValueFormat,
    /// The predicate used by all bundles without an override.
    pub predicate: Option<NamedNode>,
    pub bundle_predicates: BTreeMap<BundleId, NamedNode>,
}

impl ColumnMapping {
    /// Returns the predicate that stores this column for `bundle`, if the column exists on it.
    pub fn predicate_for(&self, bundle: &BundleId) -> Option<&NamedNode> {
        self.bundle_predicates
            .get(bundle)
            .or(self.predicate.as_ref())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: FieldName,
    pub field_type: FieldType,
    pub main_column: ColumnName,
    pub columns: BTreeMap<ColumnName, ColumnMapping>,
}

/// Everything the storage layer knows about one entity type.
#[derive(Debug)]
pub struct EntityTypeDefinition {
    schema: EntityTypeSchema,
    bundles: BTreeMap<BundleId, BundleDefinition>,
    /// Sorted by weight, then by id.
    graphs: Vec<GraphDefinition>,
    fields: BTreeMap<FieldName, FieldDefinition>,
    bundles_by_uri: FxHashMap<NamedNode, BundleId>,
    graphs_by_uri: FxHashMap<NamedNode, GraphId>,
    inverse_mappings: FxHashMap<(BundleId, NamedNode), Vec<FieldColumn>>,
}

impl EntityTypeDefinition {
    fn try_new(id: EntityTypeId, config: EntityTypeConfig) -> Result<Self, SchemaError> {
        let location = format!("entity type {id}");

        let type_predicates = config
            .type_predicates
            .into_iter()
            .map(|iri| named_node(iri, &location))
            .collect::<Result<Vec<_>, _>>()?;
        if type_predicates.is_empty() {
            return Err(SchemaError::invalid(
                location,
                "at least one type predicate is required",
            ));
        }
        Literal::new_language_tagged_literal("", &config.default_langcode).map_err(|e| {
            SchemaError::invalid(
                &location,
                format!("invalid default language '{}': {e}", config.default_langcode),
            )
        })?;

        let id_key = FieldName::new(identifier(config.id_key)?);
        let bundle_key = FieldName::new(identifier(config.bundle_key)?);
        let label_key = FieldName::new(identifier(config.label_key)?);
        if id_key == bundle_key {
            return Err(SchemaError::invalid(
                location,
                "the id key and the bundle key must differ",
            ));
        }

        let graphs = graphs(config.graphs, &location)?;
        let bundles = config
            .bundles
            .into_iter()
            .map(|(bundle, config)| bundle_definition(bundle, config, &graphs, &location))
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        if bundles.is_empty() {
            return Err(SchemaError::invalid(
                location,
                "at least one bundle is required",
            ));
        }

        let mut bundles_by_uri = FxHashMap::default();
        for bundle in bundles.values() {
            if let Some(other) = bundles_by_uri.insert(bundle.uri.clone(), bundle.id.clone()) {
                return Err(SchemaError::invalid(
                    location,
                    format!(
                        "the bundles {other} and {} share the type {}",
                        bundle.id, bundle.uri
                    ),
                ));
            }
        }

        let mut graphs_by_uri = FxHashMap::default();
        for bundle in bundles.values() {
            for (graph, uri) in &bundle.graphs {
                match graphs_by_uri.insert(uri.clone(), graph.clone()) {
                    Some(other) if other != *graph => {
                        return Err(SchemaError::invalid(
                            location,
                            format!("the graphs {other} and {graph} share the backing graph {uri}"),
                        ));
                    }
                    _ => {}
                }
            }
        }

        let fields = config
            .fields
            .into_iter()
            .map(|(name, config)| {
                let name = FieldName::new(identifier(name)?);
                if name == id_key || name == bundle_key {
                    return Err(SchemaError::invalid(
                        &location,
                        format!("the key field {name} cannot have a storage mapping"),
                    ));
                }
                let field = field_definition(name, config, &bundles, &location)?;
                Ok((field.name.clone(), field))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        let mut inverse_mappings = FxHashMap::<_, Vec<_>>::default();
        for bundle in bundles.keys() {
            for field in fields.values() {
                for (column, mapping) in &field.columns {
                    if let Some(predicate) = mapping.predicate_for(bundle) {
                        inverse_mappings
                            .entry((bundle.clone(), predicate.clone()))
                            .or_default()
                            .push(FieldColumn::new(field.name.clone(), column.clone()));
                    }
                }
            }
        }

        Ok(Self {
            schema: EntityTypeSchema {
                id,
                id_key,
                bundle_key,
                label_key,
                type_predicates,
                default_langcode: config.default_langcode,
                default_text_format: config.default_text_format,
            },
            bundles,
            graphs,
            fields,
            bundles_by_uri,
            graphs_by_uri,
            inverse_mappings,
        })
    }

    pub fn schema(&self) -> &EntityTypeSchema {
        &self.schema
    }

    pub fn id(&self) -> &EntityTypeId {
        &self.schema.id
    }

    pub fn bundles(&self) -> impl Iterator<Item = &BundleDefinition> {
        self.bundles.values()
    }

    /// Returns the definition of `bundle`.
    pub fn bundle(&self, bundle: &str) -> Result<&BundleDefinition, QueryError> {
        self.bundles
            .get(bundle)
            .ok_or_else(|| QueryError::UnknownBundle {
                entity_type: self.schema.id.clone(),
                bundle: BundleId::new(bundle),
            })
    }

    /// Returns the bundle whose type URI is `uri`.
    pub fn bundle_by_uri(&self, uri: &NamedNode) -> Option<&BundleId> {
        self.bundles_by_uri.get(uri)
    }

    /// Returns the graph partition that `uri` backs.
    pub fn graph_by_uri(&self, uri: &NamedNode) -> Option<&GraphId> {
        self.graphs_by_uri.get(uri)
    }

    pub fn field(&self, field: &str) -> Option<&FieldDefinition> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.values()
    }

    pub(crate) fn graph_definitions(&self) -> &[GraphDefinition] {
        &self.graphs
    }

    pub(crate) fn inverse_mapping(
        &self,
        bundle: &BundleId,
        predicate: &NamedNode,
    ) -> &[FieldColumn] {
        self.inverse_mappings
            .get(&(bundle.clone(), predicate.clone()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the resolver that maps fields of this entity type to predicates.
    pub fn mappings(&self) -> FieldMappingResolver<'_> {
        FieldMappingResolver::new(self)
    }

    /// Returns the catalog of the graphs of this entity type.
    pub fn catalog(&self) -> GraphCatalog<'_> {
        GraphCatalog::new(self)
    }
}

fn identifier(value: String) -> Result<String, SchemaError> {
    if IDENTIFIER.is_match(&value) {
        Ok(value)
    } else {
        Err(SchemaError::InvalidIdentifier(value))
    }
}

fn named_node(iri: String, location: &str) -> Result<NamedNode, SchemaError> {
    NamedNode::new(&iri).map_err(|error| SchemaError::InvalidIri {
        iri,
        location: location.to_owned(),
        error,
    })
}

fn graphs(configs: Vec<GraphConfig>, location: &str) -> Result<Vec<GraphDefinition>, SchemaError> {
    let mut graphs = Vec::with_capacity(configs.len());
    for config in configs {
        let id = GraphId::new(identifier(config.id)?);
        if graphs.iter().any(|g: &GraphDefinition| g.id == id) {
            return Err(SchemaError::invalid(
                location,
                format!("the graph {id} is declared twice"),
            ));
        }
        graphs.push(GraphDefinition {
            id,
            weight: config.weight,
            enabled: config.enabled,
            default_candidate: config.default_candidate,
        });
    }
    if graphs.is_empty() {
        return Err(SchemaError::invalid(location, "at least one graph is required"));
    }
    graphs.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.id.cmp(&b.id)));
    Ok(graphs)
}

fn bundle_definition(
    id: String,
    config: BundleConfig,
    graphs: &[GraphDefinition],
    location: &str,
) -> Result<(BundleId, BundleDefinition), SchemaError> {
    let id = BundleId::new(identifier(id)?);
    let location = format!("{location}, bundle {id}");
    let uri = named_node(config.uri, &location)?;
    let id_base = config
        .id_base
        .map(|iri| named_node(iri, &location))
        .transpose()?;
    let backing_graphs = config
        .graphs
        .into_iter()
        .map(|(graph, iri)| {
            if !graphs.iter().any(|g| g.id == graph.as_str()) {
                return Err(SchemaError::UnknownReference {
                    location: location.clone(),
                    kind: "graph",
                    name: graph,
                });
            }
            Ok((GraphId::new(graph), named_node(iri, &location)?))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    let definition = BundleDefinition {
        id: id.clone(),
        uri,
        id_base,
        graphs: backing_graphs,
    };
    Ok((id, definition))
}

fn field_definition(
    name: FieldName,
    config: FieldConfig,
    bundles: &BTreeMap<BundleId, BundleDefinition>,
    location: &str,
) -> Result<FieldDefinition, SchemaError> {
    let location = format!("{location}, field {name}");
    let columns = config
        .columns
        .into_iter()
        .map(|(column, config)| {
            let column = ColumnName::new(identifier(column)?);
            let mapping = column_mapping(config, bundles, &format!("{location}.{column}"))?;
            Ok((column, mapping))
        })
        .collect::<Result<BTreeMap<_, _>, SchemaError>>()?;

    let main_column = match config.main_column {
        Some(column) if columns.contains_key(column.as_str()) => ColumnName::new(column),
        Some(column) => {
            return Err(SchemaError::UnknownReference {
                location,
                kind: "column",
                name: column,
            })
        }
        None if columns.contains_key("value") => ColumnName::new("value"),
        None => columns
            .keys()
            .next()
            .cloned()
            .ok_or_else(|| SchemaError::invalid(&location, "at least one column is required"))?,
    };

    Ok(FieldDefinition {
        name,
        field_type: config.field_type,
        main_column,
        columns,
    })
}

fn column_mapping(
    config: ColumnConfig,
    bundles: &BTreeMap<BundleId, BundleDefinition>,
    location: &str,
) -> Result<ColumnMapping, SchemaError> {
    let format = match (config.format, config.datatype) {
        (FormatConfig::TypedLiteral, Some(datatype)) => {
            ValueFormat::TypedLiteral(named_node(datatype, location)?)
        }
        (FormatConfig::TypedLiteral, None) => {
            return Err(SchemaError::invalid(
                location,
                "typed literals require a datatype",
            ))
        }
        (_, Some(_)) => {
            return Err(SchemaError::invalid(
                location,
                "only typed literals can have a datatype",
            ))
        }
        (FormatConfig::Resource, None) => ValueFormat::Resource,
        (FormatConfig::Literal, None) => ValueFormat::PlainLiteral,
        (FormatConfig::LangLiteral, None) => ValueFormat::LanguageTaggedLiteral,
    };
    let predicate = config
        .predicate
        .map(|iri| named_node(iri, location))
        .transpose()?;
    let bundle_predicates = config
        .bundles
        .into_iter()
        .map(|(bundle, iri)| {
            if !bundles.contains_key(bundle.as_str()) {
                return Err(SchemaError::UnknownReference {
                    location: location.to_owned(),
                    kind: "bundle",
                    name: bundle,
                });
            }
            Ok((BundleId::new(bundle), named_node(iri, location)?))
        })
        .collect::<Result<BTreeMap<_, _>, _>>()?;
    if predicate.is_none() && bundle_predicates.is_empty() {
        return Err(SchemaError::invalid(location, "the column has no predicate"));
    }
    Ok(ColumnMapping {
        format,
        predicate,
        bundle_predicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::FRUIT_SCHEMA;
    use insta::assert_snapshot;

    #[test]
    fn graphs_are_ordered_by_weight() {
        let schema = Schema::from_json(FRUIT_SCHEMA, 1).unwrap();
        let definition = schema.entity_type("rdf_entity").unwrap();
        let ids = definition
            .graph_definitions()
            .iter()
            .map(|g| g.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["default", "draft", "foo"]);
    }

    #[test]
    fn main_column_defaults_to_value() {
        let schema = Schema::from_json(FRUIT_SCHEMA, 1).unwrap();
        let definition = schema.entity_type("rdf_entity").unwrap();
        let text = definition.field("text").unwrap();
        assert_eq!(text.main_column, "value");
        assert_eq!(text.field_type, FieldType::LongText);
    }

    #[test]
    fn unknown_entity_type() {
        let schema = Schema::from_json(FRUIT_SCHEMA, 1).unwrap();
        let error = schema.entity_type("node").unwrap_err();
        assert_snapshot!(error, @"Unknown entity type node");
    }

    #[test]
    fn rejects_invalid_identifiers() {
        let json = FRUIT_SCHEMA.replace("\"fruit\":", "\"fr.uit\":");
        let error = Schema::from_json(&json, 1).unwrap_err();
        assert_snapshot!(error, @"Invalid identifier 'fr.uit', only ASCII letters, digits and '_' are allowed");
    }

    #[test]
    fn rejects_unknown_graph_reference() {
        let json = FRUIT_SCHEMA.replace("\"draft\": \"http://example.com/fruit/draft\"", "\"drafts\": \"http://example.com/fruit/draft\"");
        let error = Schema::from_json(&json, 1).unwrap_err();
        assert_snapshot!(error, @"entity type rdf_entity, bundle fruit refers to the unknown graph 'drafts'");
    }

    #[test]
    fn rejects_relative_iris() {
        let json = FRUIT_SCHEMA.replace(
            "\"uri\": \"http://example.com/vegetable\"",
            "\"uri\": \"vegetable\"",
        );
        let error = Schema::from_json(&json, 1).unwrap_err();
        assert!(matches!(error, SchemaError::InvalidIri { ref iri, .. } if iri == "vegetable"));
    }

    #[test]
    fn rejects_malformed_json() {
        let error = Schema::from_json("{", 1).unwrap_err();
        assert!(matches!(error, SchemaError::Syntax(_)));
    }
}
