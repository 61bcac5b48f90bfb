use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::codec;
use super::record::Family;
use super::table::Table;
use crate::error::{DbError, DbResult};

/// Suffix of the row-presence column family every table owns.
const ROWS_SUFFIX: &str = ":_rows";

/// The storage engine backed by RocksDB. One engine owns one RocksDB
/// instance; each table maps onto five column families (the four data
/// families plus a row-presence index).
pub struct StorageEngine {
    /// RocksDB instance wrapped in RwLock for mutability
    db: Arc<RwLock<DB>>,
    /// Database path for listing column families
    path: PathBuf,
}

impl Clone for StorageEngine {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            path: self.path.clone(),
        }
    }
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("path", &self.path)
            .finish()
    }
}

impl StorageEngine {
    /// Open (creating if necessary) the engine at `data_dir`.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> DbResult<Self> {
        let path = data_dir.as_ref().to_path_buf();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        // Get existing column families or start from the default one
        let cf_names = match DB::list_cf(&opts, &path) {
            Ok(cfs) => cfs,
            Err(_) => vec!["default".to_string()],
        };

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = cf_names
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)
            .map_err(|e| DbError::StoreUnavailable(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
            path,
        })
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.path
    }

    /// Create a new table: one column family per data family plus the
    /// row-presence family.
    pub fn create_table(&self, name: &str) -> DbResult<()> {
        if name.is_empty() || name.contains(':') {
            return Err(DbError::InvalidTableName(name.to_string()));
        }

        let mut db = self.db.write().unwrap();

        if db.cf_handle(&codec::rows_cf(name)).is_some() {
            return Err(DbError::TableAlreadyExists(name.to_string()));
        }

        let opts = Options::default();
        for family in Family::ALL {
            db.create_cf(codec::family_cf(name, family), &opts).map_err(|e| {
                DbError::StoreUnavailable(format!("Failed to create table '{}': {}", name, e))
            })?;
        }
        db.create_cf(codec::rows_cf(name), &opts).map_err(|e| {
            DbError::StoreUnavailable(format!("Failed to create table '{}': {}", name, e))
        })?;

        tracing::info!("Created table '{}'", name);
        Ok(())
    }

    /// Delete a table and all its cells.
    pub fn drop_table(&self, name: &str) -> DbResult<()> {
        let mut db = self.db.write().unwrap();

        if db.cf_handle(&codec::rows_cf(name)).is_none() {
            return Err(DbError::TableNotFound(name.to_string()));
        }

        for family in Family::ALL {
            let cf_name = codec::family_cf(name, family);
            if db.cf_handle(&cf_name).is_some() {
                db.drop_cf(&cf_name).map_err(|e| {
                    DbError::StoreUnavailable(format!("Failed to drop table '{}': {}", name, e))
                })?;
            }
        }
        db.drop_cf(&codec::rows_cf(name)).map_err(|e| {
            DbError::StoreUnavailable(format!("Failed to drop table '{}': {}", name, e))
        })?;

        tracing::info!("Dropped table '{}'", name);
        Ok(())
    }

    /// Check whether a table exists.
    pub fn table_exists(&self, name: &str) -> bool {
        let db = self.db.read().unwrap();
        db.cf_handle(&codec::rows_cf(name)).is_some()
    }

    /// Get a handle to an existing table.
    pub fn table(&self, name: &str) -> DbResult<Table> {
        if !self.table_exists(name) {
            return Err(DbError::TableNotFound(name.to_string()));
        }
        Ok(Table::new(name.to_string(), self.db.clone()))
    }

    /// List all table names.
    pub fn list_tables(&self) -> Vec<String> {
        DB::list_cf(&Options::default(), &self.path)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|cf_name| cf_name.strip_suffix(ROWS_SUFFIX).map(|s| s.to_string()))
            .collect()
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> DbResult<()> {
        let db = self.db.read().unwrap();
        db.flush()
            .map_err(|e| DbError::StoreUnavailable(format!("Failed to flush: {}", e)))?;
        Ok(())
    }
}
