//! MySQL catalog adapter.
//!
//! Translates dump operations into MySQL SQL and parses the replies: object
//! listing, column metadata, `SHOW CREATE ...` retrieval, server variables,
//! and the session statement blocks written into (or executed around) the
//! dump.

use tracing::debug;

use crate::column::ColumnDescriptor;
use crate::config::DumpOptions;
use crate::conn::ServerConn;
use crate::ddl::quote_ident;
use crate::error::{DumpError, Result};

/// Render a string as a single-quoted SQL literal for catalog queries.
fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Dialect-bound catalog operations for one database.
pub struct MysqlCatalog {
    database: String,
}

impl MysqlCatalog {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Fully qualified, quoted `db`.`object` reference.
    fn qualified(&self, name: &str) -> String {
        format!("{}.{}", quote_ident(&self.database), quote_ident(name))
    }

    async fn list(&self, conn: &mut dyn ServerConn, sql: &str) -> Result<Vec<String>> {
        let rows = conn.fetch_all(sql).await?;
        rows.iter().map(|r| r.first().map(str::to_string)).collect()
    }

    // ===== Listing =====

    pub async fn list_tables(&self, conn: &mut dyn ServerConn) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE='BASE TABLE' AND TABLE_SCHEMA={}",
            quote_str(&self.database)
        );
        self.list(conn, &sql).await
    }

    pub async fn list_views(&self, conn: &mut dyn ServerConn) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE='VIEW' AND TABLE_SCHEMA={}",
            quote_str(&self.database)
        );
        self.list(conn, &sql).await
    }

    pub async fn list_triggers(&self, conn: &mut dyn ServerConn) -> Result<Vec<String>> {
        let sql = format!("SHOW TRIGGERS FROM {}", quote_ident(&self.database));
        let rows = conn.fetch_all(&sql).await?;
        rows.iter()
            .map(|r| r.require("Trigger").map(str::to_string))
            .collect()
    }

    pub async fn list_procedures(&self, conn: &mut dyn ServerConn) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT SPECIFIC_NAME FROM INFORMATION_SCHEMA.ROUTINES \
             WHERE ROUTINE_TYPE='PROCEDURE' AND ROUTINE_SCHEMA={}",
            quote_str(&self.database)
        );
        self.list(conn, &sql).await
    }

    pub async fn list_events(&self, conn: &mut dyn ServerConn) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT EVENT_NAME FROM INFORMATION_SCHEMA.EVENTS WHERE EVENT_SCHEMA={}",
            quote_str(&self.database)
        );
        self.list(conn, &sql).await
    }

    // ===== Column metadata =====

    /// Column descriptors for one table or view, in definition order.
    pub async fn columns(
        &self,
        conn: &mut dyn ServerConn,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>> {
        let sql = format!("SHOW COLUMNS FROM {}", self.qualified(table));
        let rows = conn.fetch_all(&sql).await?;
        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name = row.require("Field")?;
            let raw_type = row.require("Type")?;
            let extra = row.get("Extra").flatten().unwrap_or_default();
            columns.push(ColumnDescriptor::from_parts(name, raw_type, extra));
        }
        debug!("{}: {} columns", table, columns.len());
        Ok(columns)
    }

    // ===== DDL retrieval =====

    async fn show_create(
        &self,
        conn: &mut dyn ServerConn,
        kind: &str,
        name: &str,
        reply_column: &str,
    ) -> Result<String> {
        let sql = format!("SHOW CREATE {} {}", kind, self.qualified(name));
        let rows = conn.fetch_all(&sql).await?;
        let row = rows.first().ok_or_else(|| {
            DumpError::UnexpectedReply(format!("empty reply to SHOW CREATE {} {}", kind, name))
        })?;
        Ok(row.require(reply_column)?.to_string())
    }

    pub async fn create_table_ddl(&self, conn: &mut dyn ServerConn, table: &str) -> Result<String> {
        self.show_create(conn, "TABLE", table, "Create Table").await
    }

    pub async fn create_view_ddl(&self, conn: &mut dyn ServerConn, view: &str) -> Result<String> {
        self.show_create(conn, "VIEW", view, "Create View").await
    }

    pub async fn create_trigger_ddl(
        &self,
        conn: &mut dyn ServerConn,
        trigger: &str,
    ) -> Result<String> {
        self.show_create(conn, "TRIGGER", trigger, "SQL Original Statement")
            .await
    }

    pub async fn create_procedure_ddl(
        &self,
        conn: &mut dyn ServerConn,
        procedure: &str,
    ) -> Result<String> {
        self.show_create(conn, "PROCEDURE", procedure, "Create Procedure")
            .await
    }

    pub async fn create_event_ddl(&self, conn: &mut dyn ServerConn, event: &str) -> Result<String> {
        self.show_create(conn, "EVENT", event, "Create Event").await
    }

    // ===== Server variables =====

    pub async fn server_version(&self, conn: &mut dyn ServerConn) -> Result<String> {
        let rows = conn.fetch_all("SELECT VERSION()").await?;
        rows.first()
            .ok_or_else(|| DumpError::UnexpectedReply("empty reply to SELECT VERSION()".into()))?
            .first()
            .map(str::to_string)
    }

    /// Read a session/global variable such as `character_set_database`.
    pub async fn variable(&self, conn: &mut dyn ServerConn, name: &str) -> Result<String> {
        let sql = format!("SELECT @@{}", name);
        let rows = conn.fetch_all(&sql).await?;
        rows.first()
            .ok_or_else(|| DumpError::UnexpectedReply(format!("empty reply to {}", sql)))?
            .first()
            .map(str::to_string)
    }

    // ===== Session statements written into the dump =====

    /// The parameter save/override block at the top of every dump.
    pub fn backup_parameters(options: &DumpOptions) -> String {
        let charset = &options.default_character_set;
        let mut out = String::new();
        out.push_str("/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;\n");
        out.push_str("/*!40101 SET @OLD_CHARACTER_SET_RESULTS=@@CHARACTER_SET_RESULTS */;\n");
        out.push_str("/*!40101 SET @OLD_COLLATION_CONNECTION=@@COLLATION_CONNECTION */;\n");
        out.push_str(&format!("/*!40101 SET NAMES {charset} */;\n"));
        if !options.skip_tz_utc {
            out.push_str("/*!40103 SET @OLD_TIME_ZONE=@@TIME_ZONE */;\n");
            out.push_str("/*!40103 SET TIME_ZONE='+00:00' */;\n");
        }
        out.push_str("/*!40014 SET @OLD_UNIQUE_CHECKS=@@UNIQUE_CHECKS, UNIQUE_CHECKS=0 */;\n");
        out.push_str(
            "/*!40014 SET @OLD_FOREIGN_KEY_CHECKS=@@FOREIGN_KEY_CHECKS, FOREIGN_KEY_CHECKS=0 */;\n",
        );
        out.push_str("/*!40101 SET @OLD_SQL_MODE=@@SQL_MODE, SQL_MODE='NO_AUTO_VALUE_ON_ZERO' */;\n");
        out.push_str("/*!40111 SET @OLD_SQL_NOTES=@@SQL_NOTES, SQL_NOTES=0 */;\n");
        out
    }

    /// The symmetric restore block at the bottom of every dump.
    pub fn restore_parameters(options: &DumpOptions) -> String {
        let mut out = String::new();
        if !options.skip_tz_utc {
            out.push_str("/*!40103 SET TIME_ZONE=@OLD_TIME_ZONE */;\n");
        }
        out.push_str("/*!40101 SET SQL_MODE=@OLD_SQL_MODE */;\n");
        out.push_str("/*!40014 SET FOREIGN_KEY_CHECKS=@OLD_FOREIGN_KEY_CHECKS */;\n");
        out.push_str("/*!40014 SET UNIQUE_CHECKS=@OLD_UNIQUE_CHECKS */;\n");
        out.push_str("/*!40101 SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT */;\n");
        out.push_str("/*!40101 SET CHARACTER_SET_RESULTS=@OLD_CHARACTER_SET_RESULTS */;\n");
        out.push_str("/*!40101 SET COLLATION_CONNECTION=@OLD_COLLATION_CONNECTION */;\n");
        out.push_str("/*!40111 SET SQL_NOTES=@OLD_SQL_NOTES */;\n");
        out
    }

    /// Replay-time write lock emitted into the dump (`add-locks`).
    pub fn lock_table_write_stmt(table: &str) -> String {
        format!("LOCK TABLES {} WRITE;\n", quote_ident(table))
    }

    pub fn unlock_tables_stmt() -> &'static str {
        "UNLOCK TABLES;\n"
    }

    pub fn disable_keys_stmt(table: &str) -> String {
        format!("/*!40000 ALTER TABLE {} DISABLE KEYS */;\n", quote_ident(table))
    }

    pub fn enable_keys_stmt(table: &str) -> String {
        format!("/*!40000 ALTER TABLE {} ENABLE KEYS */;\n", quote_ident(table))
    }

    pub fn autocommit_off_stmt() -> &'static str {
        "SET autocommit=0;\n"
    }

    pub fn commit_stmt() -> &'static str {
        "COMMIT;\n"
    }

    // ===== Session statements executed server-side =====

    pub fn isolation_sql() -> &'static str {
        "SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ"
    }

    pub fn start_transaction_sql() -> &'static str {
        "START TRANSACTION"
    }

    pub fn commit_sql() -> &'static str {
        "COMMIT"
    }

    /// Server-side read lock held while a table's rows are streamed.
    pub fn lock_table_read_sql(&self, table: &str) -> String {
        format!("LOCK TABLES {} READ LOCAL", self.qualified(table))
    }

    pub fn unlock_tables_sql() -> &'static str {
        "UNLOCK TABLES"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_str() {
        assert_eq!(quote_str("shop"), "'shop'");
        assert_eq!(quote_str("o'clock"), "'o''clock'");
    }

    #[test]
    fn test_qualified_reference() {
        let catalog = MysqlCatalog::new("shop");
        assert_eq!(catalog.qualified("users"), "`shop`.`users`");
    }

    #[test]
    fn test_backup_parameters_default() {
        let out = MysqlCatalog::backup_parameters(&DumpOptions::default());
        assert!(out.contains("SET NAMES utf8 */;"));
        assert!(out.contains("SET TIME_ZONE='+00:00' */;"));
        assert!(out.contains("UNIQUE_CHECKS=0"));
        assert!(out.contains("FOREIGN_KEY_CHECKS=0"));
        assert!(out.contains("SQL_MODE='NO_AUTO_VALUE_ON_ZERO'"));
        assert!(out.contains("SQL_NOTES=0"));
    }

    #[test]
    fn test_backup_parameters_skip_tz_utc() {
        let options = DumpOptions {
            skip_tz_utc: true,
            ..Default::default()
        };
        let out = MysqlCatalog::backup_parameters(&options);
        assert!(!out.contains("TIME_ZONE"));
        let restore = MysqlCatalog::restore_parameters(&options);
        assert!(!restore.contains("TIME_ZONE"));
    }

    #[test]
    fn test_restore_is_symmetric() {
        let options = DumpOptions::default();
        let restore = MysqlCatalog::restore_parameters(&options);
        for var in [
            "TIME_ZONE",
            "SQL_MODE",
            "FOREIGN_KEY_CHECKS",
            "UNIQUE_CHECKS",
            "CHARACTER_SET_CLIENT",
            "CHARACTER_SET_RESULTS",
            "COLLATION_CONNECTION",
            "SQL_NOTES",
        ] {
            assert!(restore.contains(&format!("{}=@OLD_{}", var, var)), "{}", var);
        }
    }

    #[test]
    fn test_lock_statements() {
        assert_eq!(
            MysqlCatalog::lock_table_write_stmt("users"),
            "LOCK TABLES `users` WRITE;\n"
        );
        let catalog = MysqlCatalog::new("shop");
        assert_eq!(
            catalog.lock_table_read_sql("users"),
            "LOCK TABLES `shop`.`users` READ LOCAL"
        );
    }

    #[test]
    fn test_key_toggle_statements() {
        assert_eq!(
            MysqlCatalog::disable_keys_stmt("t"),
            "/*!40000 ALTER TABLE `t` DISABLE KEYS */;\n"
        );
        assert_eq!(
            MysqlCatalog::enable_keys_stmt("t"),
            "/*!40000 ALTER TABLE `t` ENABLE KEYS */;\n"
        );
    }
}
