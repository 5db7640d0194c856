//! Typed cell values and the wire mapping used for worksheet XML.
//!
//! Three cell shapes are produced and accepted: inline strings
//! (`t="inlineStr"`), bare numeric cells holding integers, and date-typed
//! cells (`t="d"`) holding an ISO-8601 value. Shared strings are never
//! written and are rejected on read.

use std::fmt;

use chrono::NaiveDateTime;

use crate::error::{Result, TableError};

/// Format of the `<v>` payload of a date-typed cell.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Int(i64),
    Timestamp(NaiveDateTime),
}

/// One ordered record of a document, header or data.
pub type Row = Vec<CellValue>;

impl CellValue {
    /// Value of the `t` attribute on the enclosing `<c>`, if one is needed.
    pub(crate) fn type_attr(&self) -> Option<&'static str> {
        match self {
            CellValue::Text(_) => Some("inlineStr"),
            CellValue::Int(_) => None,
            CellValue::Timestamp(_) => Some("d"),
        }
    }

    /// Raw text payload as it appears inside `<v>` or `<is><t>`.
    pub(crate) fn raw(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Int(n) => n.to_string(),
            CellValue::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(n) => write!(f, "{n}"),
            CellValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(ts: NaiveDateTime) -> Self {
        CellValue::Timestamp(ts)
    }
}

/// Builds a [`CellValue`] from a cell's `t` attribute and text payload.
pub(crate) fn parse_cell(cell_type: Option<&str>, raw: Option<&str>) -> Result<CellValue> {
    match cell_type {
        Some("inlineStr") => Ok(CellValue::Text(raw.unwrap_or_default().to_owned())),
        Some("d") => {
            let raw =
                raw.ok_or_else(|| TableError::Sheet("date cell without a value".to_owned()))?;
            NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
                .map(CellValue::Timestamp)
                .map_err(|e| TableError::Sheet(format!("bad date cell `{raw}`: {e}")))
        }
        Some(other) => Err(TableError::Sheet(format!("unsupported cell type `{other}`"))),
        None => {
            let raw = raw.unwrap_or_default();
            if raw.is_empty() {
                return Ok(CellValue::Text(String::new()));
            }
            raw.parse::<i64>()
                .map(CellValue::Int)
                .map_err(|_| TableError::Sheet(format!("non-integer numeric cell `{raw}`")))
        }
    }
}

/// 0-based column index to column letters (0 -> "A", 26 -> "AA").
pub(crate) fn col_letters(mut idx: usize) -> String {
    let mut s = String::new();
    loop {
        let rem = idx % 26;
        s.insert(0, (b'A' + rem as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    s
}

/// Leading column letters of a coordinate to a 1-based column number.
pub(crate) fn col_number(coord: &str) -> u32 {
    coord
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .fold(0, |acc, b| {
            acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as u32
        })
}
