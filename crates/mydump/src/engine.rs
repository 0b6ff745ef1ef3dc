//! The dump engine.
//!
//! A [`Dumper`] owns the frozen option set and runs the staged pipeline:
//! connect, open sink, preamble, optional database wrapper, enumeration,
//! include validation, table DDL + row data, then triggers, views (two
//! passes), procedures, events, and the postamble. Any server or sink
//! failure aborts the run; the sink is closed best effort.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::catalog::MysqlCatalog;
use crate::column::ColumnDescriptor;
use crate::config::DumpOptions;
use crate::conn::{MysqlConn, ServerConn};
use crate::ddl::{self, quote_ident};
use crate::dsn::{Dialect, Dsn};
use crate::error::{DumpError, Result};
use crate::insert::InsertBatcher;
use crate::matcher::{parse_patterns, NameFilter, Pattern};
use crate::sink::Sink;
use crate::value::{decode_kind, encode_value, DecodeKind, DumpValue};

/// Per-cell transformation applied before encoding:
/// `(table, column, value, row) -> value`.
///
/// The hook may change the value's type; encoding stays driven by the
/// column descriptor.
pub type RowHook = Arc<dyn Fn(&str, &str, DumpValue, &[DumpValue]) -> DumpValue + Send + Sync>;

/// Counters returned by a completed dump.
#[derive(Debug, Clone, Default)]
pub struct DumpSummary {
    pub tables: usize,
    pub views: usize,
    pub triggers: usize,
    pub procedures: usize,
    pub events: usize,
    pub rows: u64,
    pub duration_seconds: f64,
}

/// The dump driver.
pub struct Dumper {
    dsn: Dsn,
    user: String,
    password: String,
    options: DumpOptions,
    hook: Option<RowHook>,
}

impl Dumper {
    /// Parse the DSN, validate the options, and build a dumper.
    pub fn new(dsn: &str, user: &str, password: &str, options: DumpOptions) -> Result<Self> {
        options.validate()?;
        let dsn = Dsn::parse(dsn)?;
        Ok(Self {
            dsn,
            user: user.to_string(),
            password: password.to_string(),
            options,
            hook: None,
        })
    }

    /// Install a per-cell transformation hook.
    pub fn set_row_hook(&mut self, hook: RowHook) {
        self.hook = Some(hook);
    }

    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    /// Run a dump to `path`, or to standard output when `path` is empty.
    pub async fn start(&self, path: &str) -> Result<DumpSummary> {
        if self.dsn.dialect != Dialect::Mysql {
            return Err(DumpError::Config(format!(
                "dialect '{}' is not supported for dumping; only mysql is",
                self.dsn.dialect.name()
            )));
        }

        let mut conn: Box<dyn ServerConn> =
            Box::new(MysqlConn::connect(&self.dsn, &self.user, &self.password).await?);
        let mut sink = Sink::open(path, self.options.compress)?;

        let result = self.dump_to(conn.as_mut(), &mut sink).await;

        // Close the sink and connection even when the run aborted; a dump
        // error outranks a close error.
        let close_result = sink.close();
        conn.close().await;

        let summary = result?;
        close_result?;
        Ok(summary)
    }

    /// Run the pipeline against an already-open connection and sink.
    ///
    /// This is the engine `start` uses internally; embedders and tests can
    /// call it with their own [`ServerConn`] implementation.
    pub async fn dump_to(
        &self,
        conn: &mut dyn ServerConn,
        sink: &mut Sink,
    ) -> Result<DumpSummary> {
        let database = self
            .dsn
            .dbname()
            .ok_or_else(|| DumpError::Config("DSN is missing 'dbname'".into()))?
            .to_string();

        let table_filter = NameFilter::new(
            parse_patterns(&self.options.include_tables)?,
            parse_patterns(&self.options.exclude_tables)?,
        );
        let view_filter = NameFilter::new(
            parse_patterns(self.options.view_includes())?,
            parse_patterns(&self.options.exclude_tables)?,
        );
        let no_data_patterns = parse_patterns(self.options.no_data.patterns())?;

        let mut session = Session {
            conn,
            sink,
            options: &self.options,
            hook: self.hook.as_ref(),
            catalog: MysqlCatalog::new(database),
            host: self.dsn.display_host().to_string(),
            table_filter,
            view_filter,
            no_data_patterns,
            column_cache: HashMap::new(),
            txn_active: false,
            tables: Vec::new(),
            views: Vec::new(),
            triggers: Vec::new(),
            procedures: Vec::new(),
            events: Vec::new(),
            summary: DumpSummary::default(),
        };
        session.run().await
    }
}

/// Per-run state: the live connection, the sink, the enumerated object
/// lists, and the column descriptor cache.
struct Session<'a> {
    conn: &'a mut dyn ServerConn,
    sink: &'a mut Sink,
    options: &'a DumpOptions,
    hook: Option<&'a RowHook>,
    catalog: MysqlCatalog,
    host: String,
    table_filter: NameFilter,
    view_filter: NameFilter,
    no_data_patterns: Vec<Pattern>,
    column_cache: HashMap<String, Vec<ColumnDescriptor>>,
    txn_active: bool,
    tables: Vec<String>,
    views: Vec<String>,
    triggers: Vec<String>,
    procedures: Vec<String>,
    events: Vec<String>,
    summary: DumpSummary,
}

impl<'a> Session<'a> {
    async fn run(mut self) -> Result<DumpSummary> {
        let started = Instant::now();

        self.setup_session().await?;
        self.write_preamble().await?;
        if self.options.databases {
            self.write_database_wrapper().await?;
        }
        self.enumerate().await?;
        self.validate_includes()?;
        self.dump_tables().await?;
        if !self.options.no_create_info {
            self.dump_triggers().await?;
            self.dump_views().await?;
            self.dump_procedures().await?;
            self.dump_events().await?;
        }
        self.write_postamble()?;

        self.summary.duration_seconds = started.elapsed().as_secs_f64();
        info!(
            "Dump finished: {} tables, {} views, {} rows in {:.2}s",
            self.summary.tables, self.summary.views, self.summary.rows, self.summary.duration_seconds
        );
        Ok(self.summary)
    }

    /// Post-connect session setup: `SET NAMES` plus caller-provided
    /// init commands, executed in order.
    async fn setup_session(&mut self) -> Result<()> {
        let set_names = format!("SET NAMES {}", self.options.default_character_set);
        self.conn.execute(&set_names).await?;
        for command in &self.options.init_commands {
            self.conn.execute(command).await?;
        }
        Ok(())
    }

    fn write_comment_block(&mut self, title: &str) -> Result<()> {
        if self.options.skip_comments {
            return Ok(());
        }
        self.sink
            .write_str(&format!("--\n-- {}\n--\n\n", title))
    }

    async fn write_preamble(&mut self) -> Result<()> {
        if !self.options.skip_comments {
            let version = self.catalog.server_version(&mut *self.conn).await?;
            let mut header = String::new();
            header.push_str("-- mydump, MySQL-compatible logical dump\n--\n");
            header.push_str(&format!(
                "-- Host: {}\tDatabase: {}\n",
                self.host,
                self.catalog.database()
            ));
            header.push_str("-- ------------------------------------------------------\n");
            header.push_str(&format!("-- Server version\t{}\n", version));
            if !self.options.skip_dump_date {
                header.push_str(&format!(
                    "-- Date: {}\n",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                ));
            }
            header.push('\n');
            self.sink.write_str(&header)?;
        }
        self.sink
            .write_str(&MysqlCatalog::backup_parameters(self.options))?;
        self.sink.write_str("\n")
    }

    async fn write_database_wrapper(&mut self) -> Result<()> {
        let charset = self
            .catalog
            .variable(&mut *self.conn, "character_set_database")
            .await?;
        let collation = self
            .catalog
            .variable(&mut *self.conn, "collation_database")
            .await?;
        let db = quote_ident(self.catalog.database());

        self.write_comment_block(&format!("Current Database: {}", db))?;
        if self.options.add_drop_database {
            self.sink
                .write_str(&format!("/*!40000 DROP DATABASE IF EXISTS {}*/;\n\n", db))?;
        }
        self.sink.write_str(&format!(
            "CREATE DATABASE /*!32312 IF NOT EXISTS*/ {} /*!40100 DEFAULT CHARACTER SET {} COLLATE {} */;\n\n",
            db, charset, collation
        ))?;
        self.sink.write_str(&format!("USE {};\n\n", db))
    }

    async fn enumerate(&mut self) -> Result<()> {
        self.tables = self.catalog.list_tables(&mut *self.conn).await?;
        self.views = self.catalog.list_views(&mut *self.conn).await?;
        if !self.options.skip_triggers {
            self.triggers = self.catalog.list_triggers(&mut *self.conn).await?;
        }
        if self.options.routines {
            self.procedures = self.catalog.list_procedures(&mut *self.conn).await?;
        }
        if self.options.events {
            self.events = self.catalog.list_events(&mut *self.conn).await?;
        }
        info!(
            "Enumerated {} tables, {} views, {} triggers, {} procedures, {} events",
            self.tables.len(),
            self.views.len(),
            self.triggers.len(),
            self.procedures.len(),
            self.events.len()
        );
        Ok(())
    }

    /// Every include entry must have matched something the catalog listed;
    /// leftovers are fatal before any data is emitted.
    fn validate_includes(&self) -> Result<()> {
        let unresolved = self.table_filter.unresolved_includes(&self.tables);
        if !unresolved.is_empty() {
            return Err(DumpError::Config(format!(
                "include-tables entries not found in database '{}': {}",
                self.catalog.database(),
                unresolved.join(", ")
            )));
        }
        // The view list is only validated when explicitly configured; the
        // seeded copy of include-tables legitimately names non-views.
        if self.options.include_views.is_some() {
            let unresolved = self.view_filter.unresolved_includes(&self.views);
            if !unresolved.is_empty() {
                return Err(DumpError::Config(format!(
                    "include-views entries not found in database '{}': {}",
                    self.catalog.database(),
                    unresolved.join(", ")
                )));
            }
        }
        Ok(())
    }

    async fn columns_for(&mut self, object: &str) -> Result<Vec<ColumnDescriptor>> {
        if let Some(columns) = self.column_cache.get(object) {
            return Ok(columns.clone());
        }
        let columns = self.catalog.columns(&mut *self.conn, object).await?;
        self.column_cache.insert(object.to_string(), columns.clone());
        Ok(columns)
    }

    fn skips_data(&self, table: &str) -> bool {
        self.options.no_data.skips_all()
            || self.no_data_patterns.iter().any(|p| p.matches(table))
    }

    async fn dump_tables(&mut self) -> Result<()> {
        let tables = self.tables.clone();
        for table in &tables {
            if !self.table_filter.admits(table) {
                debug!("Skipping table {}", table);
                continue;
            }
            let columns = self.columns_for(table).await?;

            if !self.options.no_create_info {
                self.write_comment_block(&format!(
                    "Table structure for table {}",
                    quote_ident(table)
                ))?;
                if self.options.add_drop_table {
                    self.sink
                        .write_str(&format!("DROP TABLE IF EXISTS {};\n", quote_ident(table)))?;
                }
                let raw = self.catalog.create_table_ddl(&mut *self.conn, table).await?;
                self.sink.write_str(&ddl::wrap_create_table(
                    &raw,
                    &self.options.default_character_set,
                    self.options.reset_auto_increment,
                ))?;
                self.sink.write_str("\n")?;
            }

            self.summary.tables += 1;

            if self.skips_data(table) {
                debug!("Skipping data for table {}", table);
                continue;
            }
            self.dump_table_rows(table, &columns).await?;
        }
        Ok(())
    }

    /// Compose the row select for one table from its projected columns.
    fn row_select_sql(&self, table: &str, projection: &[String]) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}.{}",
            projection.join(","),
            quote_ident(self.catalog.database()),
            quote_ident(table)
        );
        if !self.options.where_clause.is_empty() {
            sql.push_str(&format!(" WHERE {}", self.options.where_clause));
        } else if let Some(keep) = self.options.keep_data.get(table) {
            sql.push_str(&format!(
                " WHERE {} IN ({})",
                quote_ident(&keep.column),
                keep.rows.join(",")
            ));
        }
        sql
    }

    async fn dump_table_rows(&mut self, table: &str, columns: &[ColumnDescriptor]) -> Result<()> {
        let non_virtual: Vec<&ColumnDescriptor> =
            columns.iter().filter(|c| !c.is_virtual).collect();
        let has_virtual = non_virtual.len() != columns.len();
        // Omitting generated columns would misalign a positional insert, so
        // their presence forces the column list on.
        let complete_insert = self.options.complete_insert || has_virtual;

        let (projection, kinds) = build_projection(&non_virtual, self.options.hex_blob);
        let select = self.row_select_sql(table, &projection);

        // Prologue. Bracketing statements are emitted even for empty
        // tables so every pair stays matched.
        self.write_comment_block(&format!("Dumping data for table {}", quote_ident(table)))?;
        if self.options.single_transaction && !self.txn_active {
            self.conn.execute(MysqlCatalog::isolation_sql()).await?;
            self.conn
                .execute(MysqlCatalog::start_transaction_sql())
                .await?;
            self.txn_active = true;
        }
        if self.options.lock_tables {
            let sql = self.catalog.lock_table_read_sql(table);
            self.conn.execute(&sql).await?;
        }
        if self.options.add_locks {
            self.sink
                .write_str(&MysqlCatalog::lock_table_write_stmt(table))?;
        }
        if self.options.disable_keys {
            self.sink.write_str(&MysqlCatalog::disable_keys_stmt(table))?;
        }
        if self.options.no_autocommit {
            self.sink.write_str(MysqlCatalog::autocommit_off_stmt())?;
        }

        let names: Vec<String> = non_virtual.iter().map(|c| c.name.clone()).collect();
        let mut batcher = InsertBatcher::new(
            table,
            complete_insert.then_some(names.as_slice()),
            self.options.insert_ignore,
            self.options.extended_insert,
            self.options.net_buffer_length,
        );

        {
            let sink = &mut *self.sink;
            let hook = self.hook;
            let hex_blob = self.options.hex_blob;
            let descriptors = &non_virtual;
            let mut tuple: Vec<u8> = Vec::new();
            let mut on_row = |values: Vec<DumpValue>| -> Result<()> {
                tuple.clear();
                tuple.push(b'(');
                match hook {
                    // No hook installed: encode decoded cells in place.
                    None => {
                        for (idx, value) in values.iter().enumerate() {
                            if idx > 0 {
                                tuple.push(b',');
                            }
                            encode_value(value, descriptors[idx], hex_blob, &mut tuple);
                        }
                    }
                    Some(hook) => {
                        for (idx, descriptor) in descriptors.iter().enumerate() {
                            if idx > 0 {
                                tuple.push(b',');
                            }
                            let transformed =
                                hook(table, &descriptor.name, values[idx].clone(), &values);
                            encode_value(&transformed, descriptor, hex_blob, &mut tuple);
                        }
                    }
                }
                tuple.push(b')');
                batcher.push_row(sink, &tuple)
            };
            self.conn.fetch_streamed(&select, &kinds, &mut on_row).await?;
            batcher.finish(sink)?;
        }

        let rows = batcher.rows();
        self.summary.rows += rows;
        info!("{}: {} rows", table, rows);

        // Epilogue, symmetric with the prologue.
        if self.options.disable_keys {
            self.sink.write_str(&MysqlCatalog::enable_keys_stmt(table))?;
        }
        if self.options.add_locks {
            self.sink.write_str(MysqlCatalog::unlock_tables_stmt())?;
        }
        if self.txn_active {
            self.conn.execute(MysqlCatalog::commit_sql()).await?;
            self.txn_active = false;
        }
        if self.options.lock_tables {
            self.conn.execute(MysqlCatalog::unlock_tables_sql()).await?;
        }
        if self.options.no_autocommit {
            self.sink.write_str(MysqlCatalog::commit_stmt())?;
        }
        self.sink.write_str("\n")
    }

    async fn dump_triggers(&mut self) -> Result<()> {
        let triggers = self.triggers.clone();
        for trigger in &triggers {
            let raw = self
                .catalog
                .create_trigger_ddl(&mut *self.conn, trigger)
                .await?;
            self.sink.write_str(&ddl::trigger_section(
                trigger,
                &raw,
                self.options.add_drop_trigger,
                self.options.skip_definer,
            ))?;
            self.sink.write_str("\n")?;
            self.summary.triggers += 1;
        }
        Ok(())
    }

    /// Views are emitted in two passes: first a stand-in table per view so
    /// that replay can resolve forward references, then the real view
    /// definition replacing each stand-in.
    async fn dump_views(&mut self) -> Result<()> {
        let views = self.views.clone();

        for view in &views {
            if !self.view_filter.admits(view) {
                debug!("Skipping view {}", view);
                continue;
            }
            self.write_comment_block(&format!(
                "Temporary table structure for view {}",
                quote_ident(view)
            ))?;
            let columns = self.columns_for(view).await?;
            self.sink.write_str(&ddl::view_standin(view, &columns))?;
            self.sink.write_str("\n")?;
        }

        for view in &views {
            if !self.view_filter.admits(view) {
                continue;
            }
            self.write_comment_block(&format!(
                "Final view structure for view {}",
                quote_ident(view)
            ))?;
            self.sink
                .write_str(&format!("DROP TABLE IF EXISTS {};\n", quote_ident(view)))?;
            self.sink.write_str(&format!(
                "/*!50001 DROP VIEW IF EXISTS {}*/;\n",
                quote_ident(view)
            ))?;
            let raw = self.catalog.create_view_ddl(&mut *self.conn, view).await?;
            self.sink
                .write_str(&ddl::rewrite_create_view(&raw, self.options.skip_definer)?)?;
            self.sink.write_str("\n")?;
            self.summary.views += 1;
        }
        Ok(())
    }

    async fn dump_procedures(&mut self) -> Result<()> {
        if !self.procedures.is_empty() {
            self.write_comment_block(&format!(
                "Dumping routines for database '{}'",
                self.catalog.database()
            ))?;
        }
        let procedures = self.procedures.clone();
        for procedure in &procedures {
            let raw = self
                .catalog
                .create_procedure_ddl(&mut *self.conn, procedure)
                .await?;
            self.sink.write_str(&ddl::procedure_section(
                procedure,
                &raw,
                &self.options.default_character_set,
                self.options.skip_definer,
            ))?;
            self.sink.write_str("\n")?;
            self.summary.procedures += 1;
        }
        Ok(())
    }

    async fn dump_events(&mut self) -> Result<()> {
        if !self.events.is_empty() {
            self.write_comment_block(&format!(
                "Dumping events for database '{}'",
                self.catalog.database()
            ))?;
        }
        let events = self.events.clone();
        for event in &events {
            let raw = self.catalog.create_event_ddl(&mut *self.conn, event).await?;
            self.sink.write_str(&ddl::event_section(
                &raw,
                &self.options.default_character_set,
                self.options.skip_definer,
            ))?;
            self.sink.write_str("\n")?;
            self.summary.events += 1;
        }
        Ok(())
    }

    fn write_postamble(&mut self) -> Result<()> {
        self.sink
            .write_str(&MysqlCatalog::restore_parameters(self.options))?;
        if !self.options.skip_comments {
            if self.options.skip_dump_date {
                self.sink.write_str("\n-- Dump completed\n")?;
            } else {
                self.sink.write_str(&format!(
                    "\n-- Dump completed on {}\n",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                ))?;
            }
        }
        Ok(())
    }
}

/// Build the select projection and decode hints for the non-virtual columns
/// of a table.
fn build_projection(
    columns: &[&ColumnDescriptor],
    hex_blob: bool,
) -> (Vec<String>, Vec<DecodeKind>) {
    let mut projection = Vec::with_capacity(columns.len());
    let mut kinds = Vec::with_capacity(columns.len());
    for col in columns {
        let ident = quote_ident(&col.name);
        let expr = if hex_blob && col.is_blob && col.type_keyword == "bit" {
            format!("LPAD(HEX({ident}),2,'0') AS {ident}")
        } else if hex_blob && col.is_blob {
            format!("HEX({ident}) AS {ident}")
        } else {
            ident
        };
        projection.push(expr);
        kinds.push(decode_kind(col, hex_blob));
    }
    (projection, kinds)
}
