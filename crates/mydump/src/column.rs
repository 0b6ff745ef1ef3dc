//! Column classification.
//!
//! Each `(table, column)` pair is described once per session: the lowercase
//! type keyword, the original type expression, and the three membership
//! flags that drive value encoding and projection building.

/// Keywords treated as numeric when rendering literals.
const NUMERIC_TYPES: &[&str] = &[
    "bit", "tinyint", "smallint", "mediumint", "int", "integer", "bigint", "real", "double",
    "float", "decimal", "numeric",
];

/// Keywords selected as HEX() and rendered as `0x...` literals.
///
/// `bit` is a member of both sets: numeric for SQL purposes, but selected as
/// `LPAD(HEX(col),2,'0')` and emitted as a hex literal.
const BLOB_TYPES: &[&str] = &[
    "tinyblob",
    "blob",
    "mediumblob",
    "longblob",
    "binary",
    "varbinary",
    "bit",
    "geometry",
    "point",
    "linestring",
    "polygon",
    "multipoint",
    "multilinestring",
    "multipolygon",
    "geometrycollection",
];

/// Per-column classification built from a `SHOW COLUMNS` row.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    /// Column name, verbatim.
    pub name: String,
    /// Lowercase type keyword (`int`, `varchar`, `longblob`, ...).
    pub type_keyword: String,
    /// The original type expression (`int(11) unsigned`, `varchar(255)`, ...).
    pub raw_sql: String,
    pub is_numeric: bool,
    pub is_blob: bool,
    /// Set when `Extra` carries `VIRTUAL GENERATED` or `STORED GENERATED`.
    pub is_virtual: bool,
}

impl ColumnDescriptor {
    /// Classify a column from its `SHOW COLUMNS` `Type` and `Extra` fields.
    ///
    /// The keyword is the lowercase prefix before any `(`; the length and
    /// trailing attributes are retained only inside `raw_sql`. Unknown
    /// keywords classify as non-numeric, non-BLOB text.
    pub fn from_parts(name: &str, raw_type: &str, extra: &str) -> Self {
        let keyword = raw_type
            .split('(')
            .next()
            .unwrap_or("")
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase();

        let extra_upper = extra.to_uppercase();
        let is_virtual =
            extra_upper.contains("VIRTUAL GENERATED") || extra_upper.contains("STORED GENERATED");

        Self {
            name: name.to_string(),
            is_numeric: NUMERIC_TYPES.contains(&keyword.as_str()),
            is_blob: BLOB_TYPES.contains(&keyword.as_str()),
            is_virtual,
            type_keyword: keyword,
            raw_sql: raw_type.to_string(),
        }
    }

    /// Whether the raw type expression declares the column unsigned.
    pub fn is_unsigned(&self) -> bool {
        self.raw_sql.to_lowercase().contains("unsigned")
    }
}
