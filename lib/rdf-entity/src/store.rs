//! The [EntityStore] loads, queries and writes entities of the configured entity types.
//!
//! Usage example:
//! ```
//! use rdf_entity::model::{EntityRecord, GraphId};
//! use rdf_entity::schema::SchemaRegistry;
//! use rdf_entity::storage::MemoryTripleStore;
//! use rdf_entity::{EntityQuery, EntityStore};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let schema = SchemaRegistry::from_json(r#"{
//!   "entity_types": {
//!     "rdf_entity": {
//!       "id_key": "id",
//!       "bundle_key": "type",
//!       "label_key": "label",
//!       "type_predicates": ["http://www.w3.org/1999/02/22-rdf-syntax-ns#type"],
//!       "graphs": [{ "id": "default" }],
//!       "bundles": {
//!         "fruit": {
//!           "uri": "http://example.com/fruit",
//!           "graphs": { "default": "http://example.com/fruit/published" }
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
//! }"#)?;
//! let store = EntityStore::new(schema, Arc::new(MemoryTripleStore::new()?));
//!
//! // insertion
//! let apple = EntityRecord::new("http://example.com/apple", "fruit")
//!     .with_value("label", "value", "en", "Apple");
//! store.insert("rdf_entity", &apple, &GraphId::new("default")).await?;
//!
//! // entity query
//! let query = EntityQuery::new("rdf_entity").matches("label", "Apple");
//! assert_eq!(store.execute(&query).await?, ["http://example.com/apple"]);
//!
//! // load
//! let entity = store.load_one("rdf_entity", "http://example.com/apple", None).await?;
//! assert_eq!(entity.map(|entity| entity.graph), Some(GraphId::new("default")));
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! # }).unwrap();
//! ```

use crate::query::EntityQuery;
use rdf_entity_common::{count, named_node, triple_row, StorageError, TripleStore};
use rdf_entity_model::{
    BundleId, EntityRecord, GraphId, NamedNode, QueryError, ReconstructedEntity, SchemaError,
};
use rdf_entity_query::requests::{
    delete_entities, exists_query, insert_data, load_query, LOAD_VARIABLES,
};
use rdf_entity_query::{COUNT_VARIABLE, ENTITY_VARIABLE};
use rdf_entity_schema::config::SchemaConfig;
use rdf_entity_schema::{EntityTypeDefinition, Schema, SchemaRegistry};
use rdf_entity_storage::{
    CacheBackend, CacheLookup, EntityCache, EntityReconstructor, EntityWriter, LoadOutcome,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Configures an [EntityStore].
#[derive(Clone, Debug)]
pub struct EntityStoreOptions {
    /// Caches reconstructed entities in process memory.
    pub static_cache: bool,
    /// A cache tier shared beyond this process.
    pub persistent_cache: Option<Arc<dyn CacheBackend>>,
}

impl Default for EntityStoreOptions {
    fn default() -> Self {
        Self {
            static_cache: true,
            persistent_cache: None,
        }
    }
}

/// Stores entities of the configured entity types in a graph-partitioned triple store.
///
/// Every operation works on the schema snapshot that is current when it starts. Writes invalidate
/// the written entities in all graphs of their entity type.
#[derive(Debug)]
pub struct EntityStore {
    schema: SchemaRegistry,
    store: Arc<dyn TripleStore>,
    cache: EntityCache,
}

impl EntityStore {
    /// Creates a store with the default options.
    pub fn new(schema: SchemaRegistry, store: Arc<dyn TripleStore>) -> Self {
        Self::with_options(schema, store, EntityStoreOptions::default())
    }

    pub fn with_options(
        schema: SchemaRegistry,
        store: Arc<dyn TripleStore>,
        options: EntityStoreOptions,
    ) -> Self {
        Self {
            schema,
            store,
            cache: EntityCache::new(options.static_cache, options.persistent_cache),
        }
    }

    /// Returns the current schema snapshot.
    pub fn schema(&self) -> Arc<Schema> {
        self.schema.current()
    }

    /// Validates `config` and replaces the schema. The entity cache is cleared.
    ///
    /// Returns the version of the new schema.
    pub fn reload_schema(&self, config: SchemaConfig) -> Result<u64, SchemaError> {
        let version = self.schema.reload(config)?;
        self.cache.clear();
        Ok(version)
    }

    /// Compiles `query` into SPARQL without executing it.
    pub fn compile_query(&self, query: &EntityQuery, is_count: bool) -> Result<String, QueryError> {
        Ok(query.compile(&self.schema(), is_count)?.to_string())
    }

    /// Returns the ids of the entities matching `query`.
    pub async fn execute(&self, query: &EntityQuery) -> Result<Vec<String>, StorageError> {
        let query = self.compile_query(query, false)?;
        tracing::debug!("Executing entity query:\n{query}");
        let variable = ENTITY_VARIABLE.trim_start_matches('?');
        self.store
            .query(&query)
            .await?
            .iter()
            .map(|solution| named_node(solution, variable).map(NamedNode::into_string))
            .collect()
    }

    /// Returns the number of entities matching `query`. Sort keys and paging are ignored.
    pub async fn count(&self, query: &EntityQuery) -> Result<u64, StorageError> {
        let query = self.compile_query(query, true)?;
        tracing::debug!("Executing count query:\n{query}");
        count(&self.store.query(&query).await?, COUNT_VARIABLE)
    }

    /// Loads the entities `ids`.
    ///
    /// Every entity is read from the first graph of `graphs` (or the default graph set) that
    /// holds any of its triples. The result has an entry per requested id, entities that exist
    /// in none of the graphs are `Ok(None)`.
    pub async fn load(
        &self,
        entity_type: &str,
        ids: &[&str],
        graphs: Option<&[GraphId]>,
    ) -> Result<BTreeMap<String, LoadOutcome>, StorageError> {
        let schema = self.schema();
        let definition = schema.entity_type(entity_type)?;
        let catalog = definition.catalog();
        let priority = catalog.resolve(graphs)?;
        let entity_type = definition.id();

        let mut result: BTreeMap<String, LoadOutcome> = BTreeMap::new();
        let mut pending: Vec<&str> = Vec::new();
        let generation = self.cache.generation();
        for id in ids {
            if result.contains_key(*id) || pending.contains(id) {
                continue;
            }
            match self.cache.lookup(entity_type, id, &priority) {
                CacheLookup::Found(entity) => {
                    result.insert((*id).to_owned(), Ok(Some(entity)));
                }
                CacheLookup::NotFound => {
                    result.insert((*id).to_owned(), Ok(None));
                }
                CacheLookup::Miss => pending.push(*id),
            }
        }
        if pending.is_empty() {
            return Ok(result);
        }

        let graph_uris = catalog.graph_uris(&priority, None);
        let rows = if graph_uris.is_empty() {
            Vec::new()
        } else {
            // Type assertions are read from all graphs, the bundle must not depend on the
            // requested graphs.
            let all_graphs = catalog.graph_ids().cloned().collect::<Vec<_>>();
            let query = load_query(
                &pending,
                &graph_uris,
                &catalog.graph_uris(&all_graphs, None),
                &definition.schema().type_predicates,
            )?;
            self.store
                .query(&query)
                .await?
                .iter()
                .map(|solution| triple_row(solution, LOAD_VARIABLES))
                .collect::<Result<Vec<_>, _>>()?
        };

        let mut loaded = EntityReconstructor::new(definition).reconstruct(&pending, rows, &priority);
        for id in pending {
            let Some(outcome) = loaded.remove(id) else {
                continue;
            };
            if let Ok(entity) = &outcome {
                self.cache
                    .populate(entity_type, id, generation, &priority, entity.as_ref());
            }
            result.insert(id.to_owned(), outcome);
        }
        Ok(result)
    }

    /// Loads a single entity. See [EntityStore::load].
    pub async fn load_one(
        &self,
        entity_type: &str,
        id: &str,
        graphs: Option<&[GraphId]>,
    ) -> Result<Option<ReconstructedEntity>, StorageError> {
        let mut result = self.load(entity_type, &[id], graphs).await?;
        match result.remove(id) {
            Some(outcome) => Ok(outcome?),
            None => Ok(None),
        }
    }

    /// Returns whether the entity has any triple in `graph` (or in the default graph set).
    pub async fn exists(
        &self,
        entity_type: &str,
        id: &str,
        graph: Option<&GraphId>,
    ) -> Result<bool, StorageError> {
        let schema = self.schema();
        let definition = schema.entity_type(entity_type)?;
        let catalog = definition.catalog();
        let graphs = catalog.resolve(graph.map(std::slice::from_ref))?;
        let graph_uris = catalog.graph_uris(&graphs, None);
        if graph_uris.is_empty() {
            return Ok(false);
        }
        self.store.ask(&exists_query(id, &graph_uris)?).await
    }

    /// Drops the cached entries of `ids` in all graphs.
    pub fn invalidate(&self, entity_type: &str, ids: &[&str]) -> Result<(), QueryError> {
        let schema = self.schema();
        let definition = schema.entity_type(entity_type)?;
        self.invalidate_entities(definition, ids);
        Ok(())
    }

    /// Writes a new entity into `graph`.
    ///
    /// Fails with [StorageError::DuplicateId] if the entity already has triples in `graph`.
    pub async fn insert(
        &self,
        entity_type: &str,
        record: &EntityRecord,
        graph: &GraphId,
    ) -> Result<(), StorageError> {
        let schema = self.schema();
        let definition = schema.entity_type(entity_type)?;
        let quads = EntityWriter::new(definition).quads(record, graph)?;

        let graph_uris = definition
            .catalog()
            .graph_uris(std::slice::from_ref(graph), None);
        if self
            .store
            .ask(&exists_query(&record.id, &graph_uris)?)
            .await?
        {
            return Err(StorageError::DuplicateId {
                id: record.id.clone(),
                graph: graph.clone(),
            });
        }

        let result = self.store.update(&insert_data(&quads)).await;
        self.invalidate_entities(definition, &[record.id.as_str()]);
        result
    }

    /// Replaces the triples of an entity in `graph` with `record`.
    pub async fn save(
        &self,
        entity_type: &str,
        record: &EntityRecord,
        graph: &GraphId,
    ) -> Result<(), StorageError> {
        let schema = self.schema();
        let definition = schema.entity_type(entity_type)?;
        let quads = EntityWriter::new(definition).quads(record, graph)?;
        let graph_uris = definition
            .catalog()
            .graph_uris(std::slice::from_ref(graph), None);

        let update = format!(
            "{};\n{}",
            delete_entities(&[record.id.as_str()], &graph_uris)?,
            insert_data(&quads)
        );
        let result = self.store.update(&update).await;
        self.invalidate_entities(definition, &[record.id.as_str()]);
        result
    }

    /// Deletes the entities `ids` from `graph` or, if no graph is given, from all graphs.
    pub async fn delete(
        &self,
        entity_type: &str,
        ids: &[&str],
        graph: Option<&GraphId>,
    ) -> Result<(), StorageError> {
        if ids.is_empty() {
            return Ok(());
        }
        let schema = self.schema();
        let definition = schema.entity_type(entity_type)?;
        let catalog = definition.catalog();
        let graphs = match graph {
            Some(graph) => catalog.resolve(Some(std::slice::from_ref(graph)))?,
            None => catalog.graph_ids().cloned().collect(),
        };

        let update = delete_entities(ids, &catalog.graph_uris(&graphs, None))?;
        let result = self.store.update(&update).await;
        self.invalidate_entities(definition, ids);
        result
    }

    /// Mints a new id for an entity of `bundle` below the bundle's id base.
    ///
    /// Bundles without an id base use their type URI as base.
    pub fn generate_id(&self, entity_type: &str, bundle: &BundleId) -> Result<String, QueryError> {
        let schema = self.schema();
        let bundle = schema.entity_type(entity_type)?.bundle(bundle.as_str())?;
        let base = bundle.id_base.as_ref().unwrap_or(&bundle.uri).as_str();
        let separator = if base.ends_with('/') || base.ends_with('#') {
            ""
        } else {
            "/"
        };
        Ok(format!("{base}{separator}{}", Uuid::new_v4()))
    }

    fn invalidate_entities(&self, definition: &EntityTypeDefinition, ids: &[&str]) {
        let graphs = definition.catalog().graph_ids().collect::<Vec<_>>();
        for id in ids {
            self.cache
                .invalidate(definition.id(), id, graphs.iter().copied());
        }
    }
}
