//! # mydump
//!
//! Streaming, replayable logical dumps of MySQL-compatible databases.
//!
//! The library walks the live catalog over a single dedicated connection,
//! emits schema DDL in a dependency-safe order (tables, triggers, view
//! stand-ins, views, routines, events), and streams table rows as batched
//! `INSERT` statements into a plain or gzip-compressed sink.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mydump::{DumpOptions, Dumper};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mydump::DumpError> {
//!     let options = DumpOptions {
//!         add_drop_table: true,
//!         ..Default::default()
//!     };
//!     let dumper = Dumper::new("mysql:host=localhost;dbname=shop", "backup", "secret", options)?;
//!     let summary = dumper.start("shop.sql").await?;
//!     println!("Dumped {} rows from {} tables", summary.rows, summary.tables);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod column;
pub mod config;
pub mod conn;
pub mod ddl;
pub mod dsn;
pub mod engine;
pub mod error;
pub mod insert;
pub mod matcher;
pub mod sink;
pub mod value;

// Re-exports for convenient access
pub use config::{DumpOptions, KeepData, NoData};
pub use conn::{MysqlConn, ServerConn, TextRow};
pub use dsn::{Dialect, Dsn};
pub use engine::{DumpSummary, Dumper, RowHook};
pub use error::{DumpError, Result};
pub use sink::{Compression, Sink};
pub use value::DumpValue;
