use rocksdb::{Direction, IteratorMode, WriteBatch, DB};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use super::codec;
use super::record::{Cell, Column, ScanRow};
use crate::error::{DbError, DbResult};

/// Row keys fetched from the presence index per cursor refill.
const SCAN_BATCH: usize = 256;

/// The store contract the ingest and analysis layers consume: upsert one
/// row's cells, and scan a column subset across all rows in one forward
/// pass.
pub trait RowStore {
    type Cursor: Iterator<Item = DbResult<ScanRow>>;

    /// Upsert the given cells under `row_key` atomically.
    fn put(&self, row_key: &str, cells: &[Cell]) -> DbResult<()>;

    /// Produce a forward-only cursor over all rows, restricted to
    /// `columns`. Every row appears exactly once, in an order that is
    /// unspecified but consistent across scans of an unchanged table.
    fn scan(&self, columns: &[Column]) -> DbResult<Self::Cursor>;
}

/// A wide-column table backed by RocksDB column families.
#[derive(Clone)]
pub struct Table {
    /// Table name (column family name prefix)
    name: String,
    /// RocksDB instance
    db: Arc<RwLock<DB>>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table").field("name", &self.name).finish()
    }
}

impl Table {
    pub(crate) fn new(name: String, db: Arc<RwLock<DB>>) -> Self {
        Self { name, db }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Count rows by walking the presence index.
    pub fn count(&self) -> DbResult<u64> {
        let db = self.db.read().unwrap();
        let rows_cf = db
            .cf_handle(&codec::rows_cf(&self.name))
            .ok_or_else(|| DbError::TableNotFound(self.name.clone()))?;

        let mut count = 0u64;
        for item in db.iterator_cf(rows_cf, IteratorMode::Start) {
            item.map_err(|e| {
                DbError::StoreUnavailable(format!("Count failed on '{}': {}", self.name, e))
            })?;
            count += 1;
        }
        Ok(count)
    }
}

impl RowStore for Table {
    type Cursor = ScanCursor;

    fn put(&self, row_key: &str, cells: &[Cell]) -> DbResult<()> {
        let db = self.db.read().unwrap();
        let rows_cf = db
            .cf_handle(&codec::rows_cf(&self.name))
            .ok_or_else(|| DbError::TableNotFound(self.name.clone()))?;

        let mut batch = WriteBatch::default();
        for cell in cells {
            let cf_name = codec::family_cf(&self.name, cell.column.family);
            let cf = db
                .cf_handle(&cf_name)
                .ok_or_else(|| DbError::TableNotFound(self.name.clone()))?;
            batch.put_cf(
                cf,
                codec::cell_key(row_key, cell.column.name),
                cell.value.as_bytes(),
            );
        }
        // Presence marker makes the row scannable even when every
        // requested column is absent from it.
        batch.put_cf(rows_cf, row_key.as_bytes(), b"");

        db.write(batch).map_err(|e| {
            DbError::StoreUnavailable(format!("Put failed for row '{}': {}", row_key, e))
        })
    }

    fn scan(&self, columns: &[Column]) -> DbResult<ScanCursor> {
        let db = self.db.read().unwrap();
        if db.cf_handle(&codec::rows_cf(&self.name)).is_none() {
            return Err(DbError::TableNotFound(self.name.clone()));
        }
        drop(db);

        Ok(ScanCursor {
            db: self.db.clone(),
            table: self.name.clone(),
            columns: columns.to_vec(),
            last_key: None,
            buffered: VecDeque::new(),
            done: false,
        })
    }
}

/// Forward-only cursor over a table. Row keys are pulled from the
/// presence index in batches, resuming after the last key seen, and the
/// requested cells are point-read per row, so a scan holds at most one
/// batch in memory.
pub struct ScanCursor {
    db: Arc<RwLock<DB>>,
    table: String,
    columns: Vec<Column>,
    last_key: Option<Vec<u8>>,
    buffered: VecDeque<ScanRow>,
    done: bool,
}

impl ScanCursor {
    fn fill(&mut self) -> DbResult<()> {
        let db = self.db.read().unwrap();
        let rows_cf = db
            .cf_handle(&codec::rows_cf(&self.table))
            .ok_or_else(|| DbError::TableNotFound(self.table.clone()))?;

        // Smallest key strictly greater than the last one seen.
        let seek = self.last_key.as_ref().map(|k| {
            let mut s = k.clone();
            s.push(0x00);
            s
        });
        let mode = match &seek {
            Some(k) => IteratorMode::From(k.as_slice(), Direction::Forward),
            None => IteratorMode::Start,
        };

        let mut fetched = 0usize;
        for item in db.iterator_cf(rows_cf, mode).take(SCAN_BATCH) {
            let (key, _) = item.map_err(|e| {
                DbError::StoreUnavailable(format!("Scan failed on '{}': {}", self.table, e))
            })?;
            fetched += 1;

            let row_key = String::from_utf8_lossy(&key).into_owned();
            let mut cells = HashMap::with_capacity(self.columns.len());
            for column in &self.columns {
                let cf_name = codec::family_cf(&self.table, column.family);
                let cf = db
                    .cf_handle(&cf_name)
                    .ok_or_else(|| DbError::TableNotFound(self.table.clone()))?;
                let value = db
                    .get_cf(cf, codec::cell_key(&row_key, column.name))
                    .map_err(|e| {
                        DbError::StoreUnavailable(format!(
                            "Scan failed on '{}': {}",
                            self.table, e
                        ))
                    })?;
                if let Some(raw) = value {
                    match String::from_utf8(raw) {
                        Ok(text) => {
                            cells.insert(*column, text);
                        }
                        Err(_) => {
                            tracing::warn!(
                                "Skipping undecodable cell {} of row '{}'",
                                column,
                                row_key
                            );
                        }
                    }
                }
            }

            self.buffered.push_back(ScanRow { key: row_key, cells });
            self.last_key = Some(key.into_vec());
        }

        if fetched < SCAN_BATCH {
            self.done = true;
        }
        Ok(())
    }
}

impl Iterator for ScanCursor {
    type Item = DbResult<ScanRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffered.is_empty() && !self.done {
            if let Err(e) = self.fill() {
                self.buffered.clear();
                self.done = true;
                return Some(Err(e));
            }
        }
        self.buffered.pop_front().map(Ok)
    }
}
