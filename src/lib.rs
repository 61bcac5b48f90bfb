pub mod analysis;
pub mod error;
pub mod ingest;
pub mod report;
pub mod storage;

pub use analysis::{average, frequency_count, parse_metric, top_k, RankedEntry};
pub use error::{DbError, DbResult};
pub use ingest::{CsvSource, Ingestor};
pub use report::{build_report, Report, ReportOptions};
pub use storage::{Cell, Column, Family, ImageRecord, RowStore, ScanCursor, ScanRow, StorageEngine, Table};
