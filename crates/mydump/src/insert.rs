//! INSERT batching.
//!
//! Rows stream through one [`InsertBatcher`] per table. The batcher opens a
//! statement with the `INSERT ... VALUES ` header, appends `,(...)`
//! continuation tuples while extended inserts are on, and terminates the
//! statement once the bytes written since the last terminator exceed
//! `net_buffer_length` (or after every row when extended inserts are off).

use crate::ddl::quote_ident;
use crate::error::Result;
use crate::sink::Sink;

pub struct InsertBatcher {
    header: Vec<u8>,
    net_buffer_length: usize,
    extended: bool,
    /// Bytes written since the last statement terminator.
    line_size: usize,
    first_in_batch: bool,
    rows: u64,
}

impl InsertBatcher {
    /// Build a batcher for one table. `column_names` carries the projected
    /// column list when complete inserts are in effect.
    pub fn new(
        table: &str,
        column_names: Option<&[String]>,
        insert_ignore: bool,
        extended: bool,
        net_buffer_length: usize,
    ) -> Self {
        let mut header = String::from("INSERT ");
        if insert_ignore {
            header.push_str("IGNORE ");
        }
        header.push_str("INTO ");
        header.push_str(&quote_ident(table));
        if let Some(names) = column_names {
            let cols = names
                .iter()
                .map(|n| quote_ident(n))
                .collect::<Vec<_>>()
                .join(",");
            header.push_str(&format!(" ({})", cols));
        }
        header.push_str(" VALUES ");

        Self {
            header: header.into_bytes(),
            net_buffer_length,
            extended,
            line_size: 0,
            first_in_batch: true,
            rows: 0,
        }
    }

    /// Append one encoded `(...)` tuple, terminating the statement when the
    /// batch threshold is crossed.
    pub fn push_row(&mut self, sink: &mut Sink, tuple: &[u8]) -> Result<()> {
        if self.first_in_batch {
            sink.write(&self.header)?;
            sink.write(tuple)?;
            self.line_size += self.header.len() + tuple.len();
            self.first_in_batch = false;
        } else {
            sink.write(b",")?;
            sink.write(tuple)?;
            self.line_size += 1 + tuple.len();
        }
        self.rows += 1;

        if self.line_size > self.net_buffer_length || !self.extended {
            sink.write(b";\n")?;
            self.line_size = 0;
            self.first_in_batch = true;
        }
        Ok(())
    }

    /// Terminate the open statement, if any.
    pub fn finish(&mut self, sink: &mut Sink) -> Result<()> {
        if !self.first_in_batch {
            sink.write(b";\n")?;
            self.line_size = 0;
            self.first_in_batch = true;
        }
        Ok(())
    }

    /// Rows pushed so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Compression;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn capture() -> (Sink, Shared) {
        let shared = Shared::default();
        let sink = Sink::from_writer(Box::new(shared.clone()), Compression::None);
        (sink, shared)
    }

    fn text(shared: &Shared) -> String {
        String::from_utf8(shared.0.lock().unwrap().clone()).unwrap()
    }

    #[test]
    fn test_extended_batches_into_one_statement() {
        let (mut sink, out) = capture();
        let mut batcher = InsertBatcher::new("t", None, false, true, 1_000_000);
        batcher.push_row(&mut sink, b"(1,'a')").unwrap();
        batcher.push_row(&mut sink, b"(2,'b')").unwrap();
        batcher.finish(&mut sink).unwrap();
        assert_eq!(text(&out), "INSERT INTO `t` VALUES (1,'a'),(2,'b');\n");
        assert_eq!(batcher.rows(), 2);
    }

    #[test]
    fn test_non_extended_emits_one_statement_per_row() {
        let (mut sink, out) = capture();
        let mut batcher = InsertBatcher::new("t", None, false, false, 1_000_000);
        batcher.push_row(&mut sink, b"(1)").unwrap();
        batcher.push_row(&mut sink, b"(2)").unwrap();
        batcher.finish(&mut sink).unwrap();
        assert_eq!(
            text(&out),
            "INSERT INTO `t` VALUES (1);\nINSERT INTO `t` VALUES (2);\n"
        );
    }

    #[test]
    fn test_threshold_closes_batch_before_next_row() {
        let (mut sink, out) = capture();
        // Header is 24 bytes; the first 30-byte tuple pushes line_size past
        // 50, so the second row must open a fresh INSERT statement.
        let mut batcher = InsertBatcher::new("t", None, false, true, 50);
        let wide = format!("({})", "7".repeat(28));
        batcher.push_row(&mut sink, wide.as_bytes()).unwrap();
        batcher.push_row(&mut sink, b"(2)").unwrap();
        batcher.finish(&mut sink).unwrap();

        let dump = text(&out);
        assert_eq!(dump.matches("INSERT INTO `t` VALUES ").count(), 2);
        assert!(dump.ends_with("INSERT INTO `t` VALUES (2);\n"));
    }

    #[test]
    fn test_rows_stay_in_one_batch_under_threshold() {
        let (mut sink, out) = capture();
        let mut batcher = InsertBatcher::new("t", None, false, true, 1000);
        for i in 0..5 {
            batcher
                .push_row(&mut sink, format!("({})", i).as_bytes())
                .unwrap();
        }
        batcher.finish(&mut sink).unwrap();
        assert_eq!(text(&out).matches("INSERT").count(), 1);
    }

    #[test]
    fn test_insert_ignore_and_columns() {
        let (mut sink, out) = capture();
        let names = vec!["b".to_string()];
        let mut batcher = InsertBatcher::new("t", Some(&names), true, true, 1_000_000);
        batcher.push_row(&mut sink, b"(7)").unwrap();
        batcher.finish(&mut sink).unwrap();
        assert_eq!(text(&out), "INSERT IGNORE INTO `t` (`b`) VALUES (7);\n");
    }

    #[test]
    fn test_zero_rows_writes_nothing() {
        let (mut sink, out) = capture();
        let mut batcher = InsertBatcher::new("t", None, false, true, 100);
        batcher.finish(&mut sink).unwrap();
        assert!(text(&out).is_empty());
    }

    #[test]
    fn test_every_terminator_has_one_header() {
        let (mut sink, out) = capture();
        let mut batcher = InsertBatcher::new("t", None, false, true, 20);
        for i in 0..10 {
            batcher
                .push_row(&mut sink, format!("({:04})", i).as_bytes())
                .unwrap();
        }
        batcher.finish(&mut sink).unwrap();
        let dump = text(&out);
        assert_eq!(
            dump.matches(";\n").count(),
            dump.matches("INSERT INTO").count()
        );
    }
}
