use std::collections::HashMap;
use std::fmt;

use csv::ByteRecord;
use serde::Serialize;

use crate::error::DbError;

/// The four column families a table is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    BasicData,
    Performance,
    Engagement,
    Technical,
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::BasicData,
        Family::Performance,
        Family::Engagement,
        Family::Technical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::BasicData => "basic_data",
            Family::Performance => "performance",
            Family::Engagement => "engagement",
            Family::Technical => "technical",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified column address: family plus qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Column {
    pub family: Family,
    pub name: &'static str,
}

impl Column {
    pub const fn new(family: Family, name: &'static str) -> Self {
        Self { family, name }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.name)
    }
}

pub const PROMPT: Column = Column::new(Family::BasicData, "prompt");
pub const PLATFORM: Column = Column::new(Family::BasicData, "platform");
pub const CREATION_DATE: Column = Column::new(Family::BasicData, "creation_date");

pub const GENERATION_TIME: Column = Column::new(Family::Performance, "generation_time");
pub const GPU_USAGE: Column = Column::new(Family::Performance, "gpu_usage");
pub const FILE_SIZE: Column = Column::new(Family::Performance, "file_size");

pub const LIKES: Column = Column::new(Family::Engagement, "likes");
pub const SHARES: Column = Column::new(Family::Engagement, "shares");
pub const COMMENTS: Column = Column::new(Family::Engagement, "comments");
pub const TOP_COMMENT: Column = Column::new(Family::Engagement, "top_comment");

pub const RESOLUTION: Column = Column::new(Family::Technical, "resolution");
pub const STYLE_SCORE: Column = Column::new(Family::Technical, "style_score");
pub const IS_HAND_EDITED: Column = Column::new(Family::Technical, "is_hand_edited");
pub const ETHICAL_FLAG: Column = Column::new(Family::Technical, "ethical_flag");

/// One stored cell: a column address and its text value.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub column: Column,
    pub value: String,
}

impl Cell {
    pub fn new(column: Column, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// One row as yielded by a scan: the row key plus the requested cells
/// that are present for that row.
#[derive(Debug, Clone, Default)]
pub struct ScanRow {
    pub key: String,
    pub cells: HashMap<Column, String>,
}

impl ScanRow {
    pub fn cell(&self, column: Column) -> Option<&str> {
        self.cells.get(&column).map(|s| s.as_str())
    }
}

/// Column headers the source CSV must carry, in the order
/// [`ImageRecord::from_byte_record`] consumes resolved indices.
pub const SOURCE_COLUMNS: [&str; 14] = [
    "prompt",
    "platform",
    "creation_date",
    "generation_time",
    "gpu_usage",
    "file_size_kb",
    "likes",
    "shares",
    "comments",
    "top_comment",
    "resolution",
    "style_accuracy_score",
    "is_hand_edited",
    "ethical_concerns_flag",
];

/// One source row. Every field is optional: a field that is missing,
/// empty, or undecodable in the input simply never becomes a cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageRecord {
    pub prompt: Option<String>,
    pub platform: Option<String>,
    pub creation_date: Option<String>,
    pub generation_time: Option<String>,
    pub gpu_usage: Option<String>,
    pub file_size: Option<String>,
    pub likes: Option<String>,
    pub shares: Option<String>,
    pub comments: Option<String>,
    pub top_comment: Option<String>,
    pub resolution: Option<String>,
    pub style_score: Option<String>,
    pub is_hand_edited: Option<String>,
    pub ethical_flag: Option<String>,
}

impl ImageRecord {
    /// Build a record from a raw CSV record, using `indices` resolved
    /// against [`SOURCE_COLUMNS`]. Field-level failures (invalid UTF-8)
    /// drop that field and keep the rest of the row.
    pub fn from_byte_record(indices: &[usize; 14], record: &ByteRecord) -> Self {
        let field = |slot: usize| decode_field(SOURCE_COLUMNS[slot], record.get(indices[slot]));
        Self {
            prompt: field(0),
            platform: field(1),
            creation_date: field(2),
            generation_time: field(3),
            gpu_usage: field(4),
            file_size: field(5),
            likes: field(6),
            shares: field(7),
            comments: field(8),
            top_comment: field(9),
            resolution: field(10),
            style_score: field(11),
            is_hand_edited: field(12),
            ethical_flag: field(13),
        }
    }

    /// All fields paired with their column addresses, in family order.
    pub fn fields(&self) -> [(Column, Option<&str>); 14] {
        [
            (PROMPT, self.prompt.as_deref()),
            (PLATFORM, self.platform.as_deref()),
            (CREATION_DATE, self.creation_date.as_deref()),
            (GENERATION_TIME, self.generation_time.as_deref()),
            (GPU_USAGE, self.gpu_usage.as_deref()),
            (FILE_SIZE, self.file_size.as_deref()),
            (LIKES, self.likes.as_deref()),
            (SHARES, self.shares.as_deref()),
            (COMMENTS, self.comments.as_deref()),
            (TOP_COMMENT, self.top_comment.as_deref()),
            (RESOLUTION, self.resolution.as_deref()),
            (STYLE_SCORE, self.style_score.as_deref()),
            (IS_HAND_EDITED, self.is_hand_edited.as_deref()),
            (ETHICAL_FLAG, self.ethical_flag.as_deref()),
        ]
    }
}

/// Decode one raw field to text. Empty and all-whitespace fields are
/// treated as missing; invalid UTF-8 is an encoding failure that drops
/// the single field, never the row.
fn decode_field(name: &str, raw: Option<&[u8]>) -> Option<String> {
    let raw = raw?;
    match std::str::from_utf8(raw) {
        Ok(text) if text.trim().is_empty() => None,
        Ok(text) => Some(text.to_string()),
        Err(e) => {
            tracing::warn!(
                "{}",
                DbError::Encoding {
                    field: name.to_string(),
                    reason: e.to_string(),
                }
            );
            None
        }
    }
}
