pub mod csv;

pub use csv::CsvSource;

use crate::error::DbResult;
use crate::storage::codec;
use crate::storage::record::ImageRecord;
use crate::storage::table::RowStore;

/// Drives the row codec and a store handle to load every input record.
/// Rows are keyed by their source position; a put failure halts the load
/// immediately, because no aggregation is correct against a partially
/// ingested table.
pub struct Ingestor<'a, S: RowStore> {
    store: &'a S,
}

impl<'a, S: RowStore> Ingestor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Load records in source order, assigning ordinals from 0. Returns
    /// the number of rows put.
    pub fn load<I>(&self, records: I) -> DbResult<u64>
    where
        I: IntoIterator<Item = DbResult<ImageRecord>>,
    {
        let mut count = 0u64;
        for (ordinal, record) in records.into_iter().enumerate() {
            let record = record?;
            let (row_key, cells) = codec::encode(&record, ordinal as u64);
            self.store.put(&row_key, &cells)?;
            count += 1;
            if count % 1000 == 0 {
                tracing::debug!("Ingested {} rows", count);
            }
        }
        tracing::info!("Ingest complete: {} rows", count);
        Ok(count)
    }
}
