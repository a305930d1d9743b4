//! # Quarry
//!
//! An embedded object database with a typed, chainable query API.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quarry::{ClassDef, Database, FieldType, QueryExt, Schema, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let schema = Schema::from_definitions(vec![ClassDef::new("Person")
//!         .field("name", FieldType::String)
//!         .field("age", FieldType::Integer)])?;
//!     let db = Database::in_memory(schema);
//!
//!     db.write(|store| {
//!         store.insert("Person", vec![("name", Value::from("Ada")), ("age", Value::from(36))])?;
//!         store.insert("Person", vec![("name", Value::from("Alan")), ("age", Value::from(41))])?;
//!         Ok(())
//!     })?;
//!
//!     let store = db.snapshot()?;
//!     let adults = store
//!         .query("Person")?
//!         .greater_than("age", 40)?
//!         .or()?
//!         .begins_with("name", "Ad")?
//!         .find_all()?;
//!     println!("{} matches", adults.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Reads and writes
//!
//! Readers take an immutable [`Store`] snapshot; queries against it never
//! observe later writes. Writers run a closure against a private copy that
//! is published when the closure returns `Ok` and discarded on `Err`.

use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

pub mod logging;

// Re-export core types
pub use quarry_core::{
    query, Case, ClassDef, ClassId, ClassSchema, Error, FieldDef, FieldDescriptor, FieldType,
    ObjectKey, ObjectRef, ObjectSource, OrderDirection, Predicate, QueryBuilder, QueryExt,
    QueryLimits, Result, Results, Schema, Timestamp, Value, ValueRef,
};

// Storage components
pub use quarry_storage::{ClassTable, Column, Store, StoreConfig};

// Snapshot components
pub use quarry_snapshot::{SnapshotConfig, SnapshotManager, SnapshotMeta};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database configuration
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Store limits, including query limits
    pub store: StoreConfig,
    /// Snapshot file options
    pub snapshot: SnapshotConfig,
}

struct DatabaseInner {
    current: RwLock<Arc<Store>>,
    writer: Mutex<()>,
    config: DatabaseConfig,
}

/// The main database handle.
///
/// Thread-safe and can be cloned to share across threads.
///
/// # Examples
///
/// ```rust,no_run
/// use quarry::{ClassDef, Database, FieldType, QueryExt, Schema};
///
/// let schema = Schema::from_definitions(vec![
///     ClassDef::new("Dog").field("name", FieldType::String),
/// ])?;
/// let db = Database::in_memory(schema);
/// db.write(|store| store.create_object("Dog").map(|_| ()))?;
/// assert_eq!(db.snapshot()?.all_objects("Dog")?.len(), 1);
/// # Ok::<(), quarry::Error>(())
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates an empty in-memory database for a schema.
    pub fn in_memory(schema: Schema) -> Self {
        Self::with_config(schema, DatabaseConfig::default())
    }

    /// Creates an empty in-memory database with custom configuration.
    pub fn with_config(schema: Schema, config: DatabaseConfig) -> Self {
        let store = Store::with_config(schema, config.store.clone());
        Self::from_store(store, config)
    }

    fn from_store(store: Store, config: DatabaseConfig) -> Self {
        Database {
            inner: Arc::new(DatabaseInner {
                current: RwLock::new(Arc::new(store)),
                writer: Mutex::new(()),
                config,
            }),
        }
    }

    /// Opens a database from a snapshot file.
    pub fn open_snapshot<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_snapshot_with_config(path, DatabaseConfig::default())
    }

    /// Opens a database from a snapshot file with custom configuration.
    pub fn open_snapshot_with_config<P: AsRef<Path>>(
        path: P,
        config: DatabaseConfig,
    ) -> Result<Self> {
        let manager = SnapshotManager::with_config(config.snapshot.clone());
        let store = manager.load(path, config.store.clone())?;
        Ok(Self::from_store(store, config))
    }

    /// Database configuration
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// The latest committed store.
    ///
    /// The returned store never changes; hold it for as long as a set of
    /// queries must see consistent data.
    pub fn snapshot(&self) -> Result<Arc<Store>> {
        let current = self.inner.current.read().map_err(|_| Error::LockPoisoned)?;
        Ok(Arc::clone(&current))
    }

    /// Runs `f` against a private copy of the store and commits it if `f`
    /// returns `Ok`. Writers are serialised; readers are never blocked by
    /// a running transaction.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Store) -> Result<T>,
    {
        let _writer = self.inner.writer.lock().map_err(|_| Error::LockPoisoned)?;
        let mut draft = Store::clone(&*self.snapshot()?);

        match f(&mut draft) {
            Ok(value) => {
                let mut current = self.inner.current.write().map_err(|_| Error::LockPoisoned)?;
                *current = Arc::new(draft);
                info!("Transaction committed");
                Ok(value)
            }
            Err(err) => {
                debug!(error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }

    /// Writes the latest committed store to a snapshot file.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<SnapshotMeta> {
        let store = self.snapshot()?;
        SnapshotManager::with_config(self.inner.config.snapshot.clone()).save(&store, path)
    }
}
