//! Dump option definitions.
//!
//! The option set is a frozen record: every recognized key is a field with
//! its documented default, and unknown keys are rejected at deserialization
//! time via `deny_unknown_fields`.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::sink::Compression;

/// Row-data suppression: a blanket flag or a pattern list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NoData {
    /// `true` skips row data for every table.
    Flag(bool),
    /// Skip row data only for tables matching one of these patterns.
    Tables(Vec<String>),
}

impl Default for NoData {
    fn default() -> Self {
        NoData::Flag(false)
    }
}

impl NoData {
    pub fn skips_all(&self) -> bool {
        matches!(self, NoData::Flag(true))
    }

    pub fn patterns(&self) -> &[String] {
        match self {
            NoData::Flag(_) => &[],
            NoData::Tables(list) => list,
        }
    }
}

/// Per-table row restriction: dump only rows whose `column` value is in `rows`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeepData {
    #[serde(alias = "col")]
    pub column: String,
    /// Literal values, already rendered for an `IN (...)` list.
    pub rows: Vec<String>,
}

/// The full dump option record.
///
/// Field defaults match the documented defaults of the canonical dump
/// format; every option is settable from a JSON/YAML settings file or
/// programmatically through struct update syntax.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct DumpOptions {
    /// Tables admitted to the dump; entries wrapped in `/` are regexes.
    pub include_tables: Vec<String>,

    /// Tables skipped unconditionally; also applied to views.
    pub exclude_tables: Vec<String>,

    /// Views admitted to the dump. When absent, the table include list is
    /// reused for views.
    pub include_views: Option<Vec<String>>,

    /// Skip row data entirely (`true`) or for matching tables (list).
    pub no_data: NoData,

    /// Per-table row restriction emitted as `WHERE column IN (...)`.
    pub keep_data: BTreeMap<String, KeepData>,

    /// Global WHERE clause appended to every row select.
    #[serde(rename = "where")]
    pub where_clause: String,

    /// Sink compression variant.
    pub compress: Compression,

    /// Character set for the post-connect `SET NAMES` statement.
    pub default_character_set: String,

    /// Extra SQL statements executed after connecting.
    #[serde(rename = "init_commands")]
    pub init_commands: Vec<String>,

    /// Strip `AUTO_INCREMENT=n` from `CREATE TABLE` bodies.
    pub reset_auto_increment: bool,

    /// Emit `DROP DATABASE IF EXISTS` inside the database wrapper.
    pub add_drop_database: bool,

    /// Emit `DROP TABLE IF EXISTS` before each `CREATE TABLE`.
    pub add_drop_table: bool,

    /// Emit `DROP TRIGGER IF EXISTS` before each trigger.
    pub add_drop_trigger: bool,

    /// Wrap each data section in replay-time `LOCK TABLES ... WRITE`.
    pub add_locks: bool,

    /// Take a server-side `LOCK TABLES ... READ LOCAL` while dumping.
    pub lock_tables: bool,

    /// Emit column names in every INSERT. Forced on for tables with
    /// generated columns, whose omission would misalign positional inserts.
    pub complete_insert: bool,

    /// Emit the `CREATE DATABASE` / `USE` wrapper.
    pub databases: bool,

    /// Wrap each data section in `DISABLE KEYS` / `ENABLE KEYS`.
    pub disable_keys: bool,

    /// Batch rows into multi-tuple INSERT statements.
    pub extended_insert: bool,

    /// Include scheduled events.
    pub events: bool,

    /// Select BLOB-like columns as HEX() and emit `0x...` literals.
    pub hex_blob: bool,

    /// Emit `INSERT IGNORE` instead of `INSERT`.
    pub insert_ignore: bool,

    /// Extended-insert batch threshold, in bytes.
    #[serde(rename = "net_buffer_length")]
    pub net_buffer_length: usize,

    /// Bracket each data section with `SET autocommit=0` / `COMMIT`.
    pub no_autocommit: bool,

    /// Suppress every CREATE statement.
    pub no_create_info: bool,

    /// Include stored procedures.
    pub routines: bool,

    /// Bracket the run in a REPEATABLE READ transaction.
    pub single_transaction: bool,

    /// Exclude triggers.
    pub skip_triggers: bool,

    /// Do not pin `TIME_ZONE='+00:00'`.
    pub skip_tz_utc: bool,

    /// Suppress `-- ` header and section comments.
    pub skip_comments: bool,

    /// Omit the date from the header and footer.
    pub skip_dump_date: bool,

    /// Strip DEFINER clauses from view/trigger/routine/event DDL.
    pub skip_definer: bool,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            include_tables: Vec::new(),
            exclude_tables: Vec::new(),
            include_views: None,
            no_data: NoData::default(),
            keep_data: BTreeMap::new(),
            where_clause: String::new(),
            compress: Compression::None,
            default_character_set: "utf8".to_string(),
            init_commands: Vec::new(),
            reset_auto_increment: false,
            add_drop_database: false,
            add_drop_table: false,
            add_drop_trigger: true,
            add_locks: true,
            lock_tables: true,
            complete_insert: false,
            databases: false,
            disable_keys: true,
            extended_insert: true,
            events: false,
            hex_blob: true,
            insert_ignore: false,
            net_buffer_length: 1_000_000,
            no_autocommit: true,
            no_create_info: false,
            routines: false,
            single_transaction: true,
            skip_triggers: false,
            skip_tz_utc: false,
            skip_comments: false,
            skip_dump_date: false,
            skip_definer: false,
        }
    }
}

impl DumpOptions {
    /// The include list applied to views: explicit `include-views` when
    /// given, otherwise a copy of `include-tables`. The exclude list is
    /// shared between tables and views.
    pub fn view_includes(&self) -> &[String] {
        self.include_views.as_deref().unwrap_or(&self.include_tables)
    }
}
