//! Daily rotating statistics files.
//!
//! Each event becomes one line in `<directory>/<YYYY-MM-DD>.log`:
//!
//! ```text
//! 2024-01-01T23:59:59.999Z {"timestamp":"2024-01-01T23:59:59.999Z","kind":"...","fields":{...}}
//! ```
//!
//! The file is chosen by the event's own timestamp, not the wall clock. A
//! new file is opened lazily on the first event of a different day, and the
//! previous handle is closed at that point.

use super::error::{SinkError, SinkResult};
use super::EventSink;
use ac_protocol::Event;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
struct OpenLog {
    date: String,
    path: PathBuf,
    file: File,
}

/// [`EventSink`] writing one file per UTC day.
#[derive(Debug)]
pub struct FileEventSink {
    directory: PathBuf,
    current: Mutex<Option<OpenLog>>,
}

impl FileEventSink {
    /// Create a sink writing into `directory`, which must already exist.
    pub fn new(directory: impl Into<PathBuf>) -> SinkResult<Self> {
        let directory = directory.into();
        if !directory.is_dir() {
            return Err(SinkError::MissingDirectory(directory));
        }
        Ok(Self {
            directory,
            current: Mutex::new(None),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file receiving events of `date` (`YYYY-MM-DD`).
    pub fn file_for(&self, date: &str) -> PathBuf {
        self.directory.join(format!("{date}.log"))
    }

    fn open(&self, date: &str) -> SinkResult<OpenLog> {
        let path = self.file_for(date);
        // std::fs::File is unbuffered: every write reaches the OS immediately.
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| SinkError::Open {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(path = ?path, "Opened statistics log");
        Ok(OpenLog {
            date: date.to_string(),
            path,
            file,
        })
    }

    /// Write `event`, rolling over to another file if its day differs.
    pub fn write_event(&self, event: &Event) -> SinkResult<()> {
        let date = event.day();
        let line = format!("{} {}\n", event.timestamp_text(), serde_json::to_string(event)?);

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().map(|log| log.date.as_str()) != Some(date.as_str()) {
            // Drop the old handle before opening the next day.
            *current = None;
            *current = Some(self.open(&date)?);
        }

        if let Some(log) = current.as_mut() {
            log.file
                .write_all(line.as_bytes())
                .and_then(|()| log.file.flush())
                .map_err(|source| SinkError::Write {
                    path: log.path.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Close the open file, if any.
    pub fn close(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = None;
    }
}

impl EventSink for FileEventSink {
    fn emit(&self, event: Event) {
        if let Err(e) = self.write_event(&event) {
            tracing::warn!(error = %e, kind = %event.kind, "Failed to write statistics event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn test_missing_directory_is_rejected() {
        let dir = tempdir().unwrap();
        let result = FileEventSink::new(dir.path().join("nope"));
        assert!(matches!(result, Err(SinkError::MissingDirectory(_))));
    }

    #[test]
    fn test_file_path_is_rejected_as_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "").unwrap();
        assert!(matches!(
            FileEventSink::new(file),
            Err(SinkError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_line_format() {
        let dir = tempdir().unwrap();
        let sink = FileEventSink::new(dir.path()).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 8, 9, 10).unwrap() + TimeDelta::milliseconds(7);
        sink.emit(Event::at(ts, "core:test").with_field("k", "v"));

        let content = std::fs::read_to_string(dir.path().join("2024-03-05.log")).unwrap();
        assert!(content.starts_with("2024-03-05T08:09:10.007Z {"));
        assert!(content.ends_with("}\n"));
        let json: serde_json::Value =
            serde_json::from_str(content.trim_end().split_once(' ').unwrap().1).unwrap();
        assert_eq!(json["kind"], "core:test");
        assert_eq!(json["fields"]["k"], "v");
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("2024-03-05.log"), "earlier\n").unwrap();
        let sink = FileEventSink::new(dir.path()).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        sink.emit(Event::at(ts, "core:test"));

        let content = std::fs::read_to_string(dir.path().join("2024-03-05.log")).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("earlier\n"));
    }

    #[test]
    fn test_write_failure_is_not_propagated() {
        let dir = tempdir().unwrap();
        let sink = FileEventSink::new(dir.path()).unwrap();
        // A directory where the day's file should be makes the open fail.
        std::fs::create_dir(dir.path().join("2024-03-05.log")).unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        assert!(sink.write_event(&Event::at(ts, "core:test")).is_err());
        sink.emit(Event::at(ts, "core:test"));
    }
}
