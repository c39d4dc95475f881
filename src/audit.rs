//! Append-only audit output.
//!
//! One pipe-separated line per processed candidate: `id|name|error|deleted`.
//! Field values are whitespace-normalized so that every outcome stays on a
//! single line, and each line is flushed (and optionally synced) before
//! `write` returns.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::domain::OutcomeLine;
use crate::error::{PurgeError, Result};

/// Separator between audit fields
pub const FIELD_SEPARATOR: &str = "|";

/// Destination that can push written bytes to stable storage.
pub trait Durable: Write {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Durable for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl Durable for Vec<u8> {}

/// Writes one outcome line per processed candidate.
#[derive(Debug)]
pub struct AuditSink<W: Durable> {
    out: W,
    fsync: bool,
    lines: usize,
}

impl AuditSink<File> {
    /// Open `path` for appending, creating it if needed. Existing content is kept.
    pub fn open(path: &Path, fsync: bool) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| PurgeError::Audit(format!("cannot open {} for writing: {}", path.display(), e)))?;
        Ok(Self::new(file, fsync))
    }
}

impl<W: Durable> AuditSink<W> {
    pub fn new(out: W, fsync: bool) -> Self {
        Self { out, fsync, lines: 0 }
    }

    /// Append one outcome line and make it durable.
    pub fn write(&mut self, outcome: &OutcomeLine) -> Result<()> {
        let line = format_line(outcome);
        self.out
            .write_all(line.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| PurgeError::Audit(format!("cannot write outcome for {}: {}", outcome.id, e)))?;
        if self.fsync {
            self.out
                .sync()
                .map_err(|e| PurgeError::Audit(format!("cannot sync outcome for {}: {}", outcome.id, e)))?;
        }
        self.lines += 1;
        Ok(())
    }

    /// Number of lines written by this sink
    pub fn lines_written(&self) -> usize {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Render an outcome as a single audit line, newline included.
pub fn format_line(outcome: &OutcomeLine) -> String {
    let fields: Vec<String> = outcome.fields().iter().map(|f| normalize_whitespace(f)).collect();
    let mut line = fields.join(FIELD_SEPARATOR);
    line.push('\n');
    line
}

/// Collapse internal runs of whitespace (newlines included) to one space and trim the ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Deleted;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  Jane \n\t Doe  "), "Jane Doe");
        assert_eq!(normalize_whitespace("line1\r\nline2"), "line1 line2");
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace("   "), "");
    }

    #[test]
    fn test_format_line() {
        let line = format_line(&OutcomeLine::completed(10, "Jane   Doe", Deleted::Yes));
        assert_eq!(line, "10|Jane Doe||Y\n");

        let line = format_line(&OutcomeLine::not_found(11));
        assert_eq!(line, "11||not found|N\n");
    }

    #[test]
    fn test_multiline_error_stays_on_one_line() {
        let outcome = OutcomeLine::rejected(12, "Acme\nCorp", "FOREIGN KEY constraint failed\n  at delete");
        let line = format_line(&outcome);
        assert_eq!(line.matches('\n').count(), 1);
        assert_eq!(line, "12|Acme Corp|FOREIGN KEY constraint failed at delete|N\n");
    }

    #[test]
    fn test_sink_writes_to_buffer() {
        let mut sink = AuditSink::new(Vec::new(), false);
        sink.write(&OutcomeLine::completed(1, "a", Deleted::No)).unwrap();
        sink.write(&OutcomeLine::completed(2, "b", Deleted::Rollbacked)).unwrap();
        assert_eq!(sink.lines_written(), 2);

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "1|a||N\n2|b||Rollbacked\n");
    }

    #[test]
    fn test_open_appends_to_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.txt");
        fs::write(&path, "previous|run||N\n").unwrap();

        {
            let mut sink = AuditSink::open(&path, true).unwrap();
            sink.write(&OutcomeLine::completed(3, "c", Deleted::Yes)).unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "previous|run||N\n3|c||Y\n");
    }

    #[test]
    fn test_open_unwritable_destination() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("no_such_dir").join("out.txt");
        let result = AuditSink::open(&path, false);
        assert!(matches!(result, Err(PurgeError::Audit(_))));
    }
}
