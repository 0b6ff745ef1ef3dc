//! Cell values and SQL literal encoding.
//!
//! Rows arrive from the driver as [`DumpValue`] cells decoded according to
//! [`DecodeKind`] hints derived from the column classification; the encoder
//! renders each cell into the byte form it takes inside a `VALUES (...)`
//! tuple.

use rust_decimal::Decimal;

use crate::column::ColumnDescriptor;

/// Decode hint handed to the driver for one projected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    Int,
    UInt,
    Float,
    Double,
    Decimal,
    Text,
    Bytes,
}

/// A single decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub enum DumpValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
}

impl DumpValue {
    pub fn is_null(&self) -> bool {
        matches!(self, DumpValue::Null)
    }

    /// Raw textual rendering, without quoting. Used for numeric literals
    /// and for hex payloads that the select side already text-encoded.
    fn raw_text(&self) -> String {
        match self {
            DumpValue::Null => "NULL".to_string(),
            DumpValue::Int(v) => v.to_string(),
            DumpValue::UInt(v) => v.to_string(),
            DumpValue::Float(v) => v.to_string(),
            DumpValue::Double(v) => v.to_string(),
            DumpValue::Decimal(v) => v.to_string(),
            DumpValue::Text(v) => v.clone(),
            DumpValue::Bytes(v) => String::from_utf8_lossy(v).into_owned(),
        }
    }
}

impl From<&str> for DumpValue {
    fn from(v: &str) -> Self {
        DumpValue::Text(v.to_string())
    }
}

impl From<String> for DumpValue {
    fn from(v: String) -> Self {
        DumpValue::Text(v)
    }
}

impl From<i64> for DumpValue {
    fn from(v: i64) -> Self {
        DumpValue::Int(v)
    }
}

/// Derive the decode hint for a projected (non-virtual) column.
///
/// Hex-selected BLOB columns arrive as text because the projection already
/// applied `HEX()`; everything else follows the keyword classification.
pub fn decode_kind(col: &ColumnDescriptor, hex_blob: bool) -> DecodeKind {
    if hex_blob && col.is_blob {
        return DecodeKind::Text;
    }
    if col.is_numeric {
        return match col.type_keyword.as_str() {
            "float" => DecodeKind::Float,
            "double" | "real" => DecodeKind::Double,
            "decimal" | "numeric" => DecodeKind::Decimal,
            "bit" => DecodeKind::UInt,
            _ if col.is_unsigned() => DecodeKind::UInt,
            _ => DecodeKind::Int,
        };
    }
    if col.is_blob {
        return DecodeKind::Bytes;
    }
    DecodeKind::Text
}

/// Render one cell as a SQL literal into `out`.
pub fn encode_value(
    value: &DumpValue,
    col: &ColumnDescriptor,
    hex_blob: bool,
    out: &mut Vec<u8>,
) {
    if value.is_null() {
        out.extend_from_slice(b"NULL");
        return;
    }

    if hex_blob && col.is_blob {
        // The select side delivered the payload hex-encoded (bit columns
        // via LPAD(HEX(..),2,'0'), other BLOBs via HEX(..)).
        let hex = value.raw_text();
        if col.type_keyword == "bit" || !hex.is_empty() {
            out.extend_from_slice(b"0x");
            out.extend_from_slice(hex.as_bytes());
        } else {
            out.extend_from_slice(b"''");
        }
        return;
    }

    if col.is_numeric {
        out.extend_from_slice(value.raw_text().as_bytes());
        return;
    }

    match value {
        DumpValue::Bytes(bytes) => escape_quoted(bytes, out),
        other => escape_quoted(other.raw_text().as_bytes(), out),
    }
}

/// Write a single-quoted literal with MySQL backslash escaping.
pub fn escape_quoted(bytes: &[u8], out: &mut Vec<u8>) {
    out.push(b'\'');
    for &b in bytes {
        match b {
            0x00 => out.extend_from_slice(b"\\0"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0x1a => out.extend_from_slice(b"\\Z"),
            _ => out.push(b),
        }
    }
    out.push(b'\'');
}
