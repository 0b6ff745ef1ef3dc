//! Server connection facade.
//!
//! The dump engine talks to the server through [`ServerConn`], a thin
//! metadata+query facade: fire-and-forget statements, buffered text replies
//! for catalog queries, and an unbuffered row stream for table data. The
//! production implementation wraps one dedicated `sqlx` MySQL connection --
//! a pool would scatter the session-scoped `SET`/`LOCK`/transaction
//! statements across connections and silently break read consistency.

use async_trait::async_trait;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow, MySqlSslMode};
use sqlx::{Column as _, ConnectOptions, Connection, Executor, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::dsn::Dsn;
use crate::error::{DumpError, Result};
use crate::value::{DecodeKind, DumpValue};

/// One row of a catalog reply, fully text-decoded.
#[derive(Debug, Clone)]
pub struct TextRow {
    names: Vec<String>,
    values: Vec<Option<String>>,
}

impl TextRow {
    pub fn new(names: Vec<String>, values: Vec<Option<String>>) -> Self {
        Self { names, values }
    }

    /// Look up a column by (case-insensitive) name. The outer `Option` is
    /// column presence; the inner is SQL NULL.
    pub fn get(&self, name: &str) -> Option<Option<&str>> {
        self.names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|idx| self.values[idx].as_deref())
    }

    /// Fetch a column that the reply shape guarantees to carry; a missing
    /// or NULL cell means the server replied with something unexpected.
    pub fn require(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(Some(value)) => Ok(value),
            _ => Err(DumpError::UnexpectedReply(format!(
                "reply is missing the '{}' column",
                name
            ))),
        }
    }

    /// First column of the row, for single-column listing queries.
    pub fn first(&self) -> Result<&str> {
        match self.values.first() {
            Some(Some(value)) => Ok(value),
            _ => Err(DumpError::UnexpectedReply(
                "reply row has no leading column".into(),
            )),
        }
    }
}

/// Per-row callback for streamed selects.
pub type RowCallback<'a> = &'a mut (dyn FnMut(Vec<DumpValue>) -> Result<()> + Send);

/// The opaque server facade the engine drives.
#[async_trait]
pub trait ServerConn: Send {
    /// Execute a statement, discarding any result rows.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Run a catalog query and buffer the reply as text rows.
    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<TextRow>>;

    /// Stream a data select without client-side buffering, decoding each
    /// row according to `kinds` and handing it to `on_row`.
    async fn fetch_streamed(
        &mut self,
        sql: &str,
        kinds: &[DecodeKind],
        on_row: RowCallback<'_>,
    ) -> Result<()>;

    /// Close the connection, best effort.
    async fn close(self: Box<Self>);
}

/// `ServerConn` over a single dedicated MySQL connection.
pub struct MysqlConn {
    conn: MySqlConnection,
}

impl MysqlConn {
    /// Connect using the DSN attributes and explicit credentials.
    pub async fn connect(dsn: &Dsn, user: &str, password: &str) -> Result<Self> {
        let mut options = MySqlConnectOptions::new()
            .host(dsn.display_host())
            .port(dsn.port()?)
            .username(user)
            .database(dsn.dbname().unwrap_or_default())
            .ssl_mode(MySqlSslMode::Preferred);
        if !password.is_empty() {
            options = options.password(password);
        }
        if let Some(socket) = dsn.unix_socket() {
            options = options.socket(socket);
        }

        let conn = options.connect().await.map_err(DumpError::Connection)?;
        info!(
            "Connected to MySQL server {}:{}/{}",
            dsn.display_host(),
            dsn.port()?,
            dsn.dbname().unwrap_or_default()
        );
        Ok(Self { conn })
    }
}

#[async_trait]
impl ServerConn for MysqlConn {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        // Raw &str goes through the text protocol, which also covers
        // statements the prepared protocol refuses (LOCK TABLES etc).
        self.conn
            .execute(sql)
            .await
            .map_err(|e| DumpError::query(sql.to_string(), e))?;
        Ok(())
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<TextRow>> {
        let rows: Vec<MySqlRow> = self
            .conn
            .fetch_all(sql)
            .await
            .map_err(|e| DumpError::query(sql.to_string(), e))?;
        debug!("{} -> {} rows", sql, rows.len());
        Ok(rows.iter().map(row_to_text).collect())
    }

    async fn fetch_streamed(
        &mut self,
        sql: &str,
        kinds: &[DecodeKind],
        on_row: RowCallback<'_>,
    ) -> Result<()> {
        let mut stream = self.conn.fetch(sql);
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| DumpError::query(sql.to_string(), e))?
        {
            on_row(decode_row(&row, kinds)?)?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) {
        let _ = self.conn.close().await;
    }
}

/// Decode every cell of a catalog reply row to text.
fn row_to_text(row: &MySqlRow) -> TextRow {
    let names = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let values = (0..row.columns().len())
        .map(|idx| cell_to_text(row, idx))
        .collect();
    TextRow::new(names, values)
}

/// Render one cell as text, tolerating the mixed column types that SHOW
/// statements return (strings, ints, datetimes).
fn cell_to_text(row: &MySqlRow, idx: usize) -> Option<String> {
    let type_name = {
        let raw = row.try_get_raw(idx).ok()?;
        if raw.is_null() {
            return None;
        }
        raw.type_info().name().to_uppercase()
    };

    if type_name.contains("INT") || type_name == "YEAR" {
        if type_name.contains("UNSIGNED") {
            if let Ok(v) = row.try_get::<u64, _>(idx) {
                return Some(v.to_string());
            }
        }
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(v.to_string());
        }
    }
    match type_name.as_str() {
        "FLOAT" => {
            if let Ok(v) = row.try_get::<f32, _>(idx) {
                return Some(v.to_string());
            }
        }
        "DOUBLE" => {
            if let Ok(v) = row.try_get::<f64, _>(idx) {
                return Some(v.to_string());
            }
        }
        "DECIMAL" => {
            if let Ok(v) = row.try_get::<Decimal, _>(idx) {
                return Some(v.to_string());
            }
        }
        "DATETIME" | "TIMESTAMP" => {
            if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(idx) {
                return Some(v.format("%Y-%m-%d %H:%M:%S%.f").to_string());
            }
        }
        "DATE" => {
            if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(idx) {
                return Some(v.format("%Y-%m-%d").to_string());
            }
        }
        "TIME" => {
            if let Ok(v) = row.try_get::<chrono::NaiveTime, _>(idx) {
                return Some(v.format("%H:%M:%S%.f").to_string());
            }
        }
        _ => {}
    }

    row.try_get::<String, _>(idx)
        .ok()
        .or_else(|| {
            row.try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|b| String::from_utf8_lossy(&b).into_owned())
        })
}

/// Decode a data row according to the projection's decode hints.
fn decode_row(row: &MySqlRow, kinds: &[DecodeKind]) -> Result<Vec<DumpValue>> {
    kinds
        .iter()
        .enumerate()
        .map(|(idx, kind)| decode_cell(row, idx, *kind))
        .collect()
}

fn decode_cell(row: &MySqlRow, idx: usize, kind: DecodeKind) -> Result<DumpValue> {
    let is_null = row.try_get_raw(idx).map(|r| r.is_null()).unwrap_or(true);
    if is_null {
        return Ok(DumpValue::Null);
    }

    let decoded = match kind {
        DecodeKind::Int => row.try_get::<i64, _>(idx).map(DumpValue::Int).ok(),
        DecodeKind::UInt => row
            .try_get::<u64, _>(idx)
            .map(DumpValue::UInt)
            .ok()
            .or_else(|| {
                // BIT cells arrive as raw big-endian bytes on the text protocol.
                row.try_get::<Vec<u8>, _>(idx)
                    .ok()
                    .filter(|b| b.len() <= 8)
                    .map(|b| DumpValue::UInt(b.iter().fold(0u64, |acc, &x| acc << 8 | x as u64)))
            }),
        DecodeKind::Float => row.try_get::<f32, _>(idx).map(DumpValue::Float).ok(),
        DecodeKind::Double => row.try_get::<f64, _>(idx).map(DumpValue::Double).ok(),
        DecodeKind::Decimal => row
            .try_get::<Decimal, _>(idx)
            .map(DumpValue::Decimal)
            .ok()
            .or_else(|| {
                row.try_get::<String, _>(idx)
                    .ok()
                    .and_then(|s| s.parse().ok().map(DumpValue::Decimal))
            }),
        DecodeKind::Text => cell_to_text(row, idx).map(DumpValue::Text),
        DecodeKind::Bytes => row.try_get::<Vec<u8>, _>(idx).map(DumpValue::Bytes).ok(),
    };

    decoded.ok_or_else(|| {
        DumpError::Encoding(format!(
            "column {} could not be decoded as {:?}",
            idx, kind
        ))
    })
}
