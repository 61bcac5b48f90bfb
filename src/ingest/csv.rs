use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, Reader, ReaderBuilder};

use crate::error::{DbError, DbResult};
use crate::storage::record::{ImageRecord, SOURCE_COLUMNS};

/// Streaming CSV front end. Resolves the fixed source column set against
/// the file header once, then yields one record per input row. Rows are
/// read at the byte level so invalid UTF-8 degrades a single field, not
/// the whole row.
pub struct CsvSource<R: Read> {
    reader: Reader<R>,
    indices: [usize; 14],
    buf: ByteRecord,
}

impl CsvSource<File> {
    /// Open a CSV file on disk.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::from_reader(File::open(path)?)
    }
}

impl<R: Read> CsvSource<R> {
    /// Wrap any reader producing CSV with a header row.
    pub fn from_reader(reader: R) -> DbResult<Self> {
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let indices = resolve_header(reader.byte_headers()?)?;
        Ok(Self {
            reader,
            indices,
            buf: ByteRecord::new(),
        })
    }
}

impl<R: Read> Iterator for CsvSource<R> {
    type Item = DbResult<ImageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_byte_record(&mut self.buf) {
            Ok(true) => Some(Ok(ImageRecord::from_byte_record(&self.indices, &self.buf))),
            Ok(false) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

/// Map every contract column name to its position in the header.
fn resolve_header(header: &ByteRecord) -> DbResult<[usize; 14]> {
    let names: Vec<String> = header
        .iter()
        .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
        .collect();

    let mut indices = [0usize; 14];
    for (slot, column) in indices.iter_mut().zip(SOURCE_COLUMNS) {
        *slot = names
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| DbError::MissingColumn(column.to_string()))?;
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "prompt,platform,creation_date,generation_time,gpu_usage,file_size_kb,\
likes,shares,comments,top_comment,resolution,style_accuracy_score,is_hand_edited,ethical_concerns_flag";

    #[test]
    fn test_reads_rows_in_order() {
        let data = format!(
            "{}\n{}\n{}\n",
            HEADER,
            "first,Twitter,2025-01-01,1.0,10,100,1,2,3,nice,512x512,0.5,false,false",
            "second,Reddit,2025-01-02,2.0,20,200,4,5,6,cool,512x512,0.6,true,false",
        );
        let records: Vec<ImageRecord> = CsvSource::from_reader(data.as_bytes())
            .unwrap()
            .collect::<DbResult<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].prompt.as_deref(), Some("first"));
        assert_eq!(records[1].platform.as_deref(), Some("Reddit"));
    }

    #[test]
    fn test_header_order_does_not_matter() {
        let data = "platform,prompt,creation_date,generation_time,gpu_usage,file_size_kb,\
likes,shares,comments,top_comment,resolution,style_accuracy_score,is_hand_edited,ethical_concerns_flag\n\
Twitter,hello,2025-01-01,1.0,10,100,1,2,3,nice,512x512,0.5,false,false\n";
        let records: Vec<ImageRecord> = CsvSource::from_reader(data.as_bytes())
            .unwrap()
            .collect::<DbResult<_>>()
            .unwrap();
        assert_eq!(records[0].prompt.as_deref(), Some("hello"));
        assert_eq!(records[0].platform.as_deref(), Some("Twitter"));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let data = "prompt,platform\nhello,Twitter\n";
        match CsvSource::from_reader(data.as_bytes()) {
            Err(DbError::MissingColumn(column)) => assert_eq!(column, "creation_date"),
            other => panic!("expected MissingColumn, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_ragged_row_surfaces_error() {
        let data = format!("{}\nonly,two\n", HEADER);
        let results: Vec<DbResult<ImageRecord>> =
            CsvSource::from_reader(data.as_bytes()).unwrap().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(DbError::Csv(_))));
    }
}
