use super::record::{Cell, Family, ImageRecord};

/// Prefix for synthetic row keys.
pub const ROW_KEY_PREFIX: &str = "img_";

/// Separator between row key and qualifier inside a cell key. Qualifiers
/// are fixed identifiers and never contain 0x00, so the split is
/// unambiguous for any row key.
const CELL_KEY_SEP: u8 = 0x00;

/// Derive the synthetic row key for a record at `ordinal` (zero-based
/// source position). Keys sort lexically, not numerically; nothing in the
/// read path depends on their order.
pub fn row_key(ordinal: u64) -> String {
    format!("{}{}", ROW_KEY_PREFIX, ordinal)
}

/// Map one record onto its row key and cell set. Fields that are absent
/// from the record produce no cell; no type validation happens here.
pub fn encode(record: &ImageRecord, ordinal: u64) -> (String, Vec<Cell>) {
    let mut cells = Vec::with_capacity(14);
    for (column, value) in record.fields() {
        if let Some(value) = value {
            cells.push(Cell::new(column, value));
        }
    }
    (row_key(ordinal), cells)
}

/// Key of a single cell inside its family column family.
pub(crate) fn cell_key(row_key: &str, qualifier: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(row_key.len() + 1 + qualifier.len());
    key.extend_from_slice(row_key.as_bytes());
    key.push(CELL_KEY_SEP);
    key.extend_from_slice(qualifier.as_bytes());
    key
}

/// RocksDB column family holding one family of a table.
pub(crate) fn family_cf(table: &str, family: Family) -> String {
    format!("{}:{}", table, family)
}

/// RocksDB column family holding the row-presence index of a table.
pub(crate) fn rows_cf(table: &str) -> String {
    format!("{}:_rows", table)
}
