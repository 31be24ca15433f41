use crate::config::SchemaConfig;
use crate::schema::Schema;
use rdf_entity_model::SchemaError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Holds the current [Schema] snapshot.
///
/// Readers obtain an [Arc] to the current snapshot and keep using it for the whole operation,
/// even if the schema is reloaded in the meantime. A reload validates the new configuration
/// before it replaces the snapshot. An invalid configuration leaves the current snapshot in
/// place.
#[derive(Debug)]
pub struct SchemaRegistry {
    current: RwLock<Arc<Schema>>,
    latest_version: AtomicU64,
}

impl SchemaRegistry {
    /// Creates a registry from an initial configuration. The initial snapshot has version 1.
    pub fn try_new(config: SchemaConfig) -> Result<Self, SchemaError> {
        let schema = Schema::from_config(config, 1)?;
        Ok(Self {
            current: RwLock::new(Arc::new(schema)),
            latest_version: AtomicU64::new(1),
        })
    }

    /// Creates a registry from an initial JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let config = serde_json::from_str(json).map_err(|e| SchemaError::Syntax(Box::new(e)))?;
        Self::try_new(config)
    }

    /// Returns the current snapshot.
    pub fn current(&self) -> Arc<Schema> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Returns the version of the current snapshot.
    pub fn version(&self) -> u64 {
        self.current().version()
    }

    /// Replaces the current snapshot with one created from `config` and returns its version.
    pub fn reload(&self, config: SchemaConfig) -> Result<u64, SchemaError> {
        let version = self.latest_version.fetch_add(1, Ordering::AcqRel) + 1;
        let schema = Schema::from_config(config, version)?;
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        // Concurrent reloads may finish out of order. The snapshot with the highest version wins.
        if current.version() < version {
            *current = Arc::new(schema);
        }
        tracing::debug!("Reloaded schema, version {version}");
        Ok(version)
    }
}
