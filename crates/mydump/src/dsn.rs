//! Connection string (DSN) parsing.
//!
//! A DSN has the shape `<dialect>:<key1>=<value1>;<key2>=<value2>;...`.
//! Keys are case-insensitive; values are preserved verbatim.

use std::collections::HashMap;

use crate::error::{DumpError, Result};

/// The closed set of dialects a DSN may name.
///
/// Only [`Dialect::Mysql`] is dumpable; the others parse so that a caller
/// gets a precise error at session start instead of a string-matching
/// failure at the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Mysql,
    Pgsql,
    Dblib,
    Sqlite,
}

impl Dialect {
    /// Resolve a dialect from its DSN prefix.
    pub fn from_prefix(prefix: &str) -> Result<Self> {
        match prefix.to_lowercase().as_str() {
            "mysql" => Ok(Dialect::Mysql),
            "pgsql" => Ok(Dialect::Pgsql),
            "dblib" => Ok(Dialect::Dblib),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(DumpError::Config(format!(
                "Unknown dialect: '{}'. Supported dialects: mysql, pgsql, dblib, sqlite",
                other
            ))),
        }
    }

    /// The dialect identifier as it appears in a DSN.
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql",
            Dialect::Pgsql => "pgsql",
            Dialect::Dblib => "dblib",
            Dialect::Sqlite => "sqlite",
        }
    }
}

/// A parsed connection string.
#[derive(Debug, Clone)]
pub struct Dsn {
    /// The dialect named before the first `:`.
    pub dialect: Dialect,
    /// Attribute map with lowercased keys and verbatim values.
    attrs: HashMap<String, String>,
}

impl Dsn {
    /// Parse a DSN string.
    ///
    /// Fatal conditions: missing dialect, missing `dbname`, and missing
    /// `host`/`unix_socket` for every dialect except sqlite (which uses
    /// `dbname` as a file path).
    pub fn parse(dsn: &str) -> Result<Self> {
        let (prefix, rest) = dsn
            .split_once(':')
            .ok_or_else(|| DumpError::Config(format!("Invalid DSN '{}': missing dialect", dsn)))?;
        if prefix.trim().is_empty() {
            return Err(DumpError::Config(format!(
                "Invalid DSN '{}': missing dialect",
                dsn
            )));
        }
        let dialect = Dialect::from_prefix(prefix.trim())?;

        let mut attrs = HashMap::new();
        for part in rest.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').ok_or_else(|| {
                DumpError::Config(format!("Invalid DSN attribute '{}': expected key=value", part))
            })?;
            attrs.insert(key.trim().to_lowercase(), value.to_string());
        }

        let parsed = Self { dialect, attrs };

        if parsed.dbname().is_none() {
            return Err(DumpError::Config(
                "Invalid DSN: 'dbname' attribute is required".into(),
            ));
        }
        if dialect != Dialect::Sqlite && parsed.host().is_none() && parsed.unix_socket().is_none() {
            return Err(DumpError::Config(
                "Invalid DSN: 'host' or 'unix_socket' attribute is required".into(),
            ));
        }

        Ok(parsed)
    }

    /// Look up an attribute by (case-insensitive) key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attrs.get(&key.to_lowercase()).map(String::as_str)
    }

    /// The database name (or file path for sqlite).
    pub fn dbname(&self) -> Option<&str> {
        self.get("dbname")
    }

    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    pub fn unix_socket(&self) -> Option<&str> {
        self.get("unix_socket")
    }

    /// The TCP port, defaulting to 3306 when absent.
    pub fn port(&self) -> Result<u16> {
        match self.get("port") {
            None => Ok(3306),
            Some(raw) => raw
                .parse()
                .map_err(|_| DumpError::Config(format!("Invalid DSN port: '{}'", raw))),
        }
    }

    /// The host as it should appear in the dump header.
    pub fn display_host(&self) -> &str {
        self.host().unwrap_or("localhost")
    }
}
