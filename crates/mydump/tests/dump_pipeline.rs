//! End-to-end pipeline tests against a scripted server.
//!
//! The engine only sees the `ServerConn` facade, so a scripted fake can
//! stand in for a live server: catalog queries and row selects are keyed by
//! their exact SQL text, which doubles as a check that the engine issues
//! the statements it is supposed to.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mydump::conn::RowCallback;
use mydump::value::DecodeKind;
use mydump::{
    DumpError, DumpOptions, DumpSummary, DumpValue, Dumper, Result, ServerConn, Sink, TextRow,
};

#[derive(Default)]
struct MockServer {
    queries: HashMap<String, Vec<TextRow>>,
    streams: HashMap<String, Vec<Vec<DumpValue>>>,
    executed: Arc<Mutex<Vec<String>>>,
}

impl MockServer {
    fn new() -> Self {
        Self::default()
            .on_query("SELECT VERSION()", &["VERSION()"], &[&[Some("8.0.36")]])
            .on_query(
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_TYPE='BASE TABLE' AND TABLE_SCHEMA='mydb'",
                &["TABLE_NAME"],
                &[],
            )
            .on_query(
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                 WHERE TABLE_TYPE='VIEW' AND TABLE_SCHEMA='mydb'",
                &["TABLE_NAME"],
                &[],
            )
            .on_query("SHOW TRIGGERS FROM `mydb`", &["Trigger"], &[])
    }

    fn on_query(mut self, sql: &str, names: &[&str], rows: &[&[Option<&str>]]) -> Self {
        let parsed = rows
            .iter()
            .map(|row| {
                TextRow::new(
                    names.iter().map(|n| n.to_string()).collect(),
                    row.iter().map(|v| v.map(str::to_string)).collect(),
                )
            })
            .collect();
        self.queries.insert(sql.to_string(), parsed);
        self
    }

    fn on_stream(mut self, sql: &str, rows: Vec<Vec<DumpValue>>) -> Self {
        self.streams.insert(sql.to_string(), rows);
        self
    }

    /// Register a table with its column metadata and CREATE TABLE body.
    fn with_table(self, name: &str, columns: &[(&str, &str, &str)], ddl: &str) -> Self {
        let listing_sql = "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
                           WHERE TABLE_TYPE='BASE TABLE' AND TABLE_SCHEMA='mydb'";
        let mut listed: Vec<Vec<Option<String>>> = self.queries[listing_sql]
            .iter()
            .map(|r| vec![r.first().ok().map(str::to_string)])
            .collect();
        listed.push(vec![Some(name.to_string())]);
        let listed_refs: Vec<Vec<Option<&str>>> = listed
            .iter()
            .map(|r| r.iter().map(|v| v.as_deref()).collect())
            .collect();
        let listed_slices: Vec<&[Option<&str>]> =
            listed_refs.iter().map(|r| r.as_slice()).collect();

        self.on_query(listing_sql, &["TABLE_NAME"], &listed_slices)
            .with_columns(name, columns)
            .on_query(
                &format!("SHOW CREATE TABLE `mydb`.`{}`", name),
                &["Table", "Create Table"],
                &[&[Some(name), Some(ddl)]],
            )
    }

    fn with_columns(self, object: &str, columns: &[(&str, &str, &str)]) -> Self {
        let rows: Vec<Vec<Option<&str>>> = columns
            .iter()
            .map(|(name, ty, extra)| vec![Some(*name), Some(*ty), Some(*extra)])
            .collect();
        let slices: Vec<&[Option<&str>]> = rows.iter().map(|r| r.as_slice()).collect();
        self.on_query(
            &format!("SHOW COLUMNS FROM `mydb`.`{}`", object),
            &["Field", "Type", "Extra"],
            &slices,
        )
    }

    fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServerConn for MockServer {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn fetch_all(&mut self, sql: &str) -> Result<Vec<TextRow>> {
        self.queries
            .get(sql)
            .cloned()
            .ok_or_else(|| DumpError::UnexpectedReply(format!("unscripted query: {}", sql)))
    }

    async fn fetch_streamed(
        &mut self,
        sql: &str,
        _kinds: &[DecodeKind],
        on_row: RowCallback<'_>,
    ) -> Result<()> {
        let rows = self
            .streams
            .get(sql)
            .cloned()
            .ok_or_else(|| DumpError::UnexpectedReply(format!("unscripted select: {}", sql)))?;
        for row in rows {
            on_row(row)?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) {}
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

async fn run_dump(
    server: &mut MockServer,
    options: DumpOptions,
) -> (Result<DumpSummary>, String) {
    let dumper = Dumper::new("mysql:host=localhost;dbname=mydb", "root", "", options).unwrap();
    let captured = Captured::default();
    let mut sink = Sink::from_writer(Box::new(captured.clone()), mydump::Compression::None);
    let result = dumper.dump_to(server, &mut sink).await;
    sink.close().unwrap();
    let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    (result, text)
}

fn int_column() -> (&'static str, &'static str, &'static str) {
    ("a", "int(11)", "")
}

#[tokio::test]
async fn empty_database_with_databases_wrapper() {
    let mut server = MockServer::new()
        .on_query("SELECT @@character_set_database", &["@@character_set_database"], &[&[Some("utf8mb4")]])
        .on_query("SELECT @@collation_database", &["@@collation_database"], &[&[Some("utf8mb4_0900_ai_ci")]]);
    let options = DumpOptions {
        databases: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();

    assert_eq!(dump.matches("CREATE DATABASE /*!32312 IF NOT EXISTS*/ `mydb`").count(), 1);
    assert_eq!(dump.matches("USE `mydb`;").count(), 1);
    assert!(dump.contains("DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_0900_ai_ci"));
    assert!(!dump.contains("INSERT"));
    assert!(!dump.contains("DROP DATABASE"));
}

#[tokio::test]
async fn add_drop_database_emits_guarded_drop() {
    let mut server = MockServer::new()
        .on_query("SELECT @@character_set_database", &["v"], &[&[Some("utf8")]])
        .on_query("SELECT @@collation_database", &["v"], &[&[Some("utf8_general_ci")]]);
    let options = DumpOptions {
        databases: true,
        add_drop_database: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(dump.contains("/*!40000 DROP DATABASE IF EXISTS `mydb`*/;"));
}

#[tokio::test]
async fn null_and_hex_blob_row() {
    let mut server = MockServer::new()
        .with_table(
            "t",
            &[int_column(), ("b", "blob", "")],
            "CREATE TABLE `t` (\n  `a` int(11),\n  `b` blob\n)",
        )
        .on_stream(
            "SELECT `a`,HEX(`b`) AS `b` FROM `mydb`.`t`",
            vec![vec![DumpValue::Null, DumpValue::Text("DEADBEEF".into())]],
        );

    let (result, dump) = run_dump(&mut server, DumpOptions::default()).await;
    let summary = result.unwrap();

    assert!(dump.contains("INSERT INTO `t` VALUES (NULL,0xDEADBEEF);\n"));
    assert_eq!(summary.tables, 1);
    assert_eq!(summary.rows, 1);

    // Bracketing pairs around the data section, present exactly once each.
    assert_eq!(dump.matches("/*!40000 ALTER TABLE `t` DISABLE KEYS */;").count(), 1);
    assert_eq!(dump.matches("/*!40000 ALTER TABLE `t` ENABLE KEYS */;").count(), 1);
    assert_eq!(dump.matches("LOCK TABLES `t` WRITE;").count(), 1);
    assert_eq!(dump.matches("UNLOCK TABLES;").count(), 1);
    assert_eq!(dump.matches("SET autocommit=0;").count(), 1);
    assert_eq!(dump.matches("COMMIT;").count(), 1);

    // Server-side read consistency: isolation + transaction + read lock.
    let executed = server.executed();
    assert!(executed.contains(&"SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ".to_string()));
    assert!(executed.contains(&"START TRANSACTION".to_string()));
    assert!(executed.contains(&"COMMIT".to_string()));
    assert!(executed.contains(&"LOCK TABLES `mydb`.`t` READ LOCAL".to_string()));
    assert!(executed.contains(&"UNLOCK TABLES".to_string()));
    assert!(executed.contains(&"SET NAMES utf8".to_string()));
}

#[tokio::test]
async fn bracketing_pairs_emitted_for_empty_table() {
    let mut server = MockServer::new()
        .with_table("empty", &[int_column()], "CREATE TABLE `empty` (\n  `a` int(11)\n)")
        .on_stream("SELECT `a` FROM `mydb`.`empty`", vec![]);

    let (result, dump) = run_dump(&mut server, DumpOptions::default()).await;
    result.unwrap();

    assert!(!dump.contains("INSERT"));
    assert_eq!(dump.matches("DISABLE KEYS").count(), 1);
    assert_eq!(dump.matches("ENABLE KEYS").count(), 1);
    assert_eq!(dump.matches("LOCK TABLES `empty` WRITE;").count(), 1);
    assert_eq!(dump.matches("UNLOCK TABLES;").count(), 1);
}

#[tokio::test]
async fn disabled_bracketing_options_leave_no_trace() {
    let mut server = MockServer::new()
        .with_table("t", &[int_column()], "CREATE TABLE `t` (\n  `a` int(11)\n)")
        .on_stream("SELECT `a` FROM `mydb`.`t`", vec![vec![DumpValue::Int(1)]]);
    let options = DumpOptions {
        add_locks: false,
        disable_keys: false,
        no_autocommit: false,
        single_transaction: false,
        lock_tables: false,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();

    assert!(dump.contains("INSERT INTO `t` VALUES (1);\n"));
    assert!(!dump.contains("DISABLE KEYS"));
    assert!(!dump.contains("LOCK TABLES"));
    assert!(!dump.contains("autocommit"));
    let executed = server.executed();
    assert!(!executed.iter().any(|s| s.starts_with("LOCK TABLES")));
    assert!(!executed.contains(&"START TRANSACTION".to_string()));
}

#[tokio::test]
async fn virtual_column_forces_complete_insert() {
    let mut server = MockServer::new()
        .with_table(
            "t",
            &[("a", "int(11)", "VIRTUAL GENERATED"), ("b", "int(11)", "")],
            "CREATE TABLE `t` (\n  `a` int GENERATED ALWAYS AS (1) VIRTUAL,\n  `b` int\n)",
        )
        .on_stream("SELECT `b` FROM `mydb`.`t`", vec![vec![DumpValue::Int(7)]]);

    let (result, dump) = run_dump(&mut server, DumpOptions::default()).await;
    result.unwrap();

    assert!(dump.contains("INSERT INTO `t` (`b`) VALUES (7);\n"));
}

#[tokio::test]
async fn net_buffer_length_splits_batches() {
    let wide_a = "x".repeat(30);
    let wide_b = "y".repeat(30);
    let mut server = MockServer::new()
        .with_table("t", &[("s", "varchar(64)", "")], "CREATE TABLE `t` (\n  `s` varchar(64)\n)")
        .on_stream(
            "SELECT `s` FROM `mydb`.`t`",
            vec![
                vec![DumpValue::Text(wide_a.clone())],
                vec![DumpValue::Text(wide_b.clone())],
            ],
        );
    let options = DumpOptions {
        net_buffer_length: 50,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();

    // The first tuple alone crosses 50 bytes, so the batch closes before
    // row two and a fresh INSERT header precedes it.
    assert_eq!(dump.matches("INSERT INTO `t` VALUES ").count(), 2);
    assert!(dump.contains(&format!("INSERT INTO `t` VALUES ('{}');\n", wide_a)));
    assert!(dump.contains(&format!("INSERT INTO `t` VALUES ('{}');\n", wide_b)));
}

#[tokio::test]
async fn unresolved_include_aborts_before_data() {
    let mut server = MockServer::new()
        .with_table("users", &[int_column()], "CREATE TABLE `users` (\n  `a` int(11)\n)");
    let options = DumpOptions {
        include_tables: vec!["users".to_string(), "orders".to_string()],
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    let err = result.unwrap_err();

    assert!(matches!(err, DumpError::Config(_)));
    assert!(err.to_string().contains("orders"));
    assert!(!dump.contains("INSERT"));
    assert!(!dump.contains("CREATE TABLE"));
}

#[tokio::test]
async fn view_standin_precedes_real_view() {
    let mut server = MockServer::new()
        .with_table("t", &[int_column()], "CREATE TABLE `t` (\n  `a` int(11)\n)")
        .on_stream("SELECT `a` FROM `mydb`.`t`", vec![])
        .on_query(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE='VIEW' AND TABLE_SCHEMA='mydb'",
            &["TABLE_NAME"],
            &[&[Some("v")]],
        )
        .with_columns("v", &[int_column()])
        .on_query(
            "SHOW CREATE VIEW `mydb`.`v`",
            &["View", "Create View"],
            &[&[
                Some("v"),
                Some("CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`localhost` SQL SECURITY DEFINER VIEW `v` AS select `t`.`a` AS `a` from `t`"),
            ]],
        );

    let (result, dump) = run_dump(&mut server, DumpOptions::default()).await;
    let summary = result.unwrap();
    assert_eq!(summary.views, 1);

    let table_pos = dump.find("CREATE TABLE `t`").unwrap();
    let standin_pos = dump.find("CREATE TABLE IF NOT EXISTS `v`").unwrap();
    let drop_pos = dump.find("DROP TABLE IF EXISTS `v`;").unwrap();
    let view_pos = dump.find("/*!50001 VIEW `v` AS").unwrap();
    assert!(table_pos < standin_pos);
    assert!(standin_pos < drop_pos);
    assert!(drop_pos < view_pos);

    assert!(dump.contains("/*!50001 DROP VIEW IF EXISTS `v`*/;"));
    assert!(dump.contains("/*!50013 DEFINER=`root`@`localhost` SQL SECURITY DEFINER */"));
    assert!(dump.contains("CREATE TABLE IF NOT EXISTS `v` (\n  `a` int(11)\n);"));
}

#[tokio::test]
async fn exclude_tables_applies_to_views_too() {
    let mut server = MockServer::new()
        .on_query(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE='VIEW' AND TABLE_SCHEMA='mydb'",
            &["TABLE_NAME"],
            &[&[Some("v")]],
        );
    let options = DumpOptions {
        exclude_tables: vec!["v".to_string()],
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(!dump.contains("`v`"));
}

#[tokio::test]
async fn no_create_info_suppresses_all_ddl() {
    let mut server = MockServer::new()
        .with_table("t", &[int_column()], "CREATE TABLE `t` (\n  `a` int(11)\n)")
        .on_stream("SELECT `a` FROM `mydb`.`t`", vec![vec![DumpValue::Int(5)]])
        .on_query(
            "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE='VIEW' AND TABLE_SCHEMA='mydb'",
            &["TABLE_NAME"],
            &[&[Some("v")]],
        );
    let options = DumpOptions {
        no_create_info: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();

    assert!(!dump.contains("CREATE"));
    assert!(dump.contains("INSERT INTO `t` VALUES (5);\n"));
}

#[tokio::test]
async fn no_data_flag_skips_every_row_section() {
    let mut server = MockServer::new()
        .with_table("t", &[int_column()], "CREATE TABLE `t` (\n  `a` int(11)\n)");
    let options = DumpOptions {
        no_data: mydump::NoData::Flag(true),
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();

    assert!(dump.contains("CREATE TABLE `t`"));
    assert!(!dump.contains("INSERT"));
    assert!(!dump.contains("LOCK TABLES"));
    assert!(!dump.contains("DISABLE KEYS"));
}

#[tokio::test]
async fn no_data_pattern_skips_matching_tables_only() {
    let mut server = MockServer::new()
        .with_table("keep", &[int_column()], "CREATE TABLE `keep` (\n  `a` int(11)\n)")
        .with_table("audit_log", &[int_column()], "CREATE TABLE `audit_log` (\n  `a` int(11)\n)")
        .on_stream("SELECT `a` FROM `mydb`.`keep`", vec![vec![DumpValue::Int(1)]]);
    let options = DumpOptions {
        no_data: mydump::NoData::Tables(vec!["/^audit_/".to_string()]),
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();

    assert!(dump.contains("INSERT INTO `keep` VALUES (1);\n"));
    assert!(!dump.contains("INSERT INTO `audit_log`"));
}

#[tokio::test]
async fn where_clause_restricts_row_select() {
    let mut server = MockServer::new()
        .with_table("t", &[int_column()], "CREATE TABLE `t` (\n  `a` int(11)\n)")
        .on_stream(
            "SELECT `a` FROM `mydb`.`t` WHERE a > 10",
            vec![vec![DumpValue::Int(11)]],
        );
    let options = DumpOptions {
        where_clause: "a > 10".to_string(),
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(dump.contains("INSERT INTO `t` VALUES (11);\n"));
}

#[tokio::test]
async fn keep_data_restricts_rows_via_in_list() {
    let mut server = MockServer::new()
        .with_table("users", &[("id", "int(11)", "")], "CREATE TABLE `users` (\n  `id` int(11)\n)")
        .on_stream(
            "SELECT `id` FROM `mydb`.`users` WHERE `id` IN (1,2)",
            vec![vec![DumpValue::Int(1)], vec![DumpValue::Int(2)]],
        );
    let mut options = DumpOptions::default();
    options.keep_data.insert(
        "users".to_string(),
        mydump::KeepData {
            column: "id".to_string(),
            rows: vec!["1".to_string(), "2".to_string()],
        },
    );

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(dump.contains("INSERT INTO `users` VALUES (1),(2);\n"));
}

#[tokio::test]
async fn row_hook_transforms_cells_before_encoding() {
    let mut server = MockServer::new()
        .with_table(
            "people",
            &[("id", "int(11)", ""), ("email", "varchar(128)", "")],
            "CREATE TABLE `people` (\n  `id` int(11),\n  `email` varchar(128)\n)",
        )
        .on_stream(
            "SELECT `id`,`email` FROM `mydb`.`people`",
            vec![vec![DumpValue::Int(1), DumpValue::Text("real@example.com".into())]],
        );

    let mut dumper = Dumper::new(
        "mysql:host=localhost;dbname=mydb",
        "root",
        "",
        DumpOptions::default(),
    )
    .unwrap();
    dumper.set_row_hook(Arc::new(
        |_table: &str, column: &str, value: DumpValue, _row: &[DumpValue]| {
            if column == "email" {
                DumpValue::Text("redacted".to_string())
            } else {
                value
            }
        },
    ));

    let captured = Captured::default();
    let mut sink = Sink::from_writer(Box::new(captured.clone()), mydump::Compression::None);
    dumper.dump_to(&mut server, &mut sink).await.unwrap();
    sink.close().unwrap();
    let dump = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();

    assert!(dump.contains("INSERT INTO `people` VALUES (1,'redacted');\n"));
    assert!(!dump.contains("real@example.com"));
}

#[tokio::test]
async fn triggers_and_routines_and_events_are_emitted() {
    let mut server = MockServer::new()
        .on_query(
            "SHOW TRIGGERS FROM `mydb`",
            &["Trigger"],
            &[&[Some("trg_audit")]],
        )
        .on_query(
            "SHOW CREATE TRIGGER `mydb`.`trg_audit`",
            &["Trigger", "SQL Original Statement"],
            &[&[
                Some("trg_audit"),
                Some("CREATE DEFINER=`root`@`localhost` TRIGGER `trg_audit` BEFORE INSERT ON `t` FOR EACH ROW SET @n = 1"),
            ]],
        )
        .on_query(
            "SELECT SPECIFIC_NAME FROM INFORMATION_SCHEMA.ROUTINES \
             WHERE ROUTINE_TYPE='PROCEDURE' AND ROUTINE_SCHEMA='mydb'",
            &["SPECIFIC_NAME"],
            &[&[Some("refresh_totals")]],
        )
        .on_query(
            "SHOW CREATE PROCEDURE `mydb`.`refresh_totals`",
            &["Procedure", "Create Procedure"],
            &[&[
                Some("refresh_totals"),
                Some("CREATE PROCEDURE `refresh_totals`()\nBEGIN\nSELECT 1;\nEND"),
            ]],
        )
        .on_query(
            "SELECT EVENT_NAME FROM INFORMATION_SCHEMA.EVENTS WHERE EVENT_SCHEMA='mydb'",
            &["EVENT_NAME"],
            &[&[Some("nightly")]],
        )
        .on_query(
            "SHOW CREATE EVENT `mydb`.`nightly`",
            &["Event", "Create Event"],
            &[&[
                Some("nightly"),
                Some("CREATE EVENT `nightly` ON SCHEDULE EVERY 1 DAY DO SELECT 1"),
            ]],
        );
    let options = DumpOptions {
        routines: true,
        events: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    let summary = result.unwrap();

    assert_eq!(summary.triggers, 1);
    assert_eq!(summary.procedures, 1);
    assert_eq!(summary.events, 1);
    assert!(dump.contains("DROP TRIGGER IF EXISTS `trg_audit`;"));
    assert!(dump.contains("DELIMITER ;;"));
    assert!(dump.contains("/*!50003 DROP PROCEDURE IF EXISTS `refresh_totals` */;"));
    assert!(dump.contains("CREATE EVENT `nightly`"));
    assert!(dump.contains("/*!50106 SET @save_time_zone"));
}

#[tokio::test]
async fn skip_definer_strips_trigger_definers() {
    let mut server = MockServer::new()
        .on_query(
            "SHOW TRIGGERS FROM `mydb`",
            &["Trigger"],
            &[&[Some("trg")]],
        )
        .on_query(
            "SHOW CREATE TRIGGER `mydb`.`trg`",
            &["Trigger", "SQL Original Statement"],
            &[&[
                Some("trg"),
                Some("CREATE DEFINER=`root`@`localhost` TRIGGER `trg` BEFORE INSERT ON `t` FOR EACH ROW SET @n = 1"),
            ]],
        );
    let options = DumpOptions {
        skip_definer: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(!dump.contains("DEFINER"));
    assert!(dump.contains("CREATE TRIGGER `trg`"));
}

#[tokio::test]
async fn preamble_and_postamble_are_paired() {
    let mut server = MockServer::new();
    let (result, dump) = run_dump(&mut server, DumpOptions::default()).await;
    result.unwrap();

    assert!(dump.starts_with("-- mydump"));
    assert!(dump.contains("-- Host: localhost\tDatabase: mydb\n"));
    assert!(dump.contains("-- Server version\t8.0.36\n"));
    assert!(dump.contains("/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;"));
    assert!(dump.contains("/*!40101 SET CHARACTER_SET_CLIENT=@OLD_CHARACTER_SET_CLIENT */;"));
    assert!(dump.contains("/*!40103 SET TIME_ZONE='+00:00' */;"));
    assert!(dump.contains("/*!40103 SET TIME_ZONE=@OLD_TIME_ZONE */;"));
    assert!(dump.trim_end().ends_with("-- Dump completed on")
        || dump.contains("-- Dump completed on"));
}

#[tokio::test]
async fn skip_comments_suppresses_comment_lines_only() {
    let mut server = MockServer::new()
        .with_table("t", &[int_column()], "CREATE TABLE `t` (\n  `a` int(11)\n)")
        .on_stream("SELECT `a` FROM `mydb`.`t`", vec![]);
    let options = DumpOptions {
        skip_comments: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();

    assert!(!dump.lines().any(|l| l.starts_with("-- ")));
    assert!(dump.contains("/*!40101 SET @OLD_CHARACTER_SET_CLIENT=@@CHARACTER_SET_CLIENT */;"));
    assert!(dump.contains("CREATE TABLE `t`"));
}

#[tokio::test]
async fn skip_dump_date_omits_dates() {
    let mut server = MockServer::new();
    let options = DumpOptions {
        skip_dump_date: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(!dump.contains("-- Date:"));
    assert!(dump.contains("-- Dump completed\n"));
}

#[tokio::test]
async fn insert_ignore_and_extended_insert_off() {
    let mut server = MockServer::new()
        .with_table("t", &[int_column()], "CREATE TABLE `t` (\n  `a` int(11)\n)")
        .on_stream(
            "SELECT `a` FROM `mydb`.`t`",
            vec![vec![DumpValue::Int(1)], vec![DumpValue::Int(2)]],
        );
    let options = DumpOptions {
        insert_ignore: true,
        extended_insert: false,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(dump.contains("INSERT IGNORE INTO `t` VALUES (1);\n"));
    assert!(dump.contains("INSERT IGNORE INTO `t` VALUES (2);\n"));
}

#[tokio::test]
async fn reset_auto_increment_strips_table_option() {
    let mut server = MockServer::new()
        .with_table(
            "t",
            &[int_column()],
            "CREATE TABLE `t` (\n  `a` int(11)\n) ENGINE=InnoDB AUTO_INCREMENT=99 DEFAULT CHARSET=utf8mb4",
        )
        .on_stream("SELECT `a` FROM `mydb`.`t`", vec![]);
    let options = DumpOptions {
        reset_auto_increment: true,
        ..Default::default()
    };

    let (result, dump) = run_dump(&mut server, options).await;
    result.unwrap();
    assert!(!dump.contains("AUTO_INCREMENT=99"));
    assert!(dump.contains("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
}
