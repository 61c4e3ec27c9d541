//! Background saving
//!
//! A [`FileSession`] writes output on its own thread to `<target>.tmp` and
//! renames it into place. Starting a new save first joins the previous one,
//! and the session version only advances once a save has joined cleanly, so
//! a failed write never counts as a saved version.

use crate::logging::{codes, Code};
use crate::printer::{PrintError, Sink, TextSink};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: PrintError,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Save thread for {path} panicked")]
    WorkerPanicked { path: PathBuf },
}

impl SaveError {
    pub fn error_code(&self) -> Code {
        match self {
            SaveError::Write { .. } => codes::save::WRITE_FAILED,
            SaveError::Rename { .. } => codes::save::RENAME_FAILED,
            SaveError::WorkerPanicked { .. } => codes::save::WORKER_PANICKED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub path: PathBuf,
    pub lines: usize,
    pub bytes: usize,
    pub duration: Duration,
    /// Session version this save produced
    pub version: u64,
}

pub fn tmp_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `text` to `<target>.tmp`, then rename over `target`
///
/// The temporary file is removed when either step fails.
pub fn write_atomically(target: &Path, text: &str) -> Result<(usize, usize), SaveError> {
    let tmp = tmp_path(target);
    let written = write_lines(&tmp, text);
    let result = written.and_then(|counts| {
        fs::rename(&tmp, target)
            .map(|()| counts)
            .map_err(|source| SaveError::Rename {
                from: tmp.clone(),
                to: target.to_path_buf(),
                source,
            })
    });
    if result.is_err() && tmp.exists() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_lines(path: &Path, text: &str) -> Result<(usize, usize), SaveError> {
    let write_error = |source| SaveError::Write {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(|source| write_error(PrintError::Io { source }))?;

    let mut sink = TextSink::new(BufWriter::new(file));
    for line in text.lines() {
        sink.write_line(line);
    }
    let counts = (sink.lines_written(), sink.bytes_written());
    sink.into_inner().map_err(write_error)?;
    Ok(counts)
}

type PendingSave = JoinHandle<Result<(usize, usize, Duration), SaveError>>;

/// Output file of one input, saved in the background
#[derive(Debug)]
pub struct FileSession {
    target: PathBuf,
    version: u64,
    pending: Option<PendingSave>,
}

impl FileSession {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            version: 0,
            pending: None,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Saves that completed successfully
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_saving(&self) -> bool {
        self.pending.is_some()
    }

    /// Start saving `text`, after joining the previous save
    ///
    /// Returns the outcome of that previous save, if there was one.
    pub fn save(&mut self, text: String) -> Result<Option<SaveReport>, SaveError> {
        let previous = self.wait();
        let target = self.target.clone();
        self.pending = Some(thread::spawn(move || {
            let started = Instant::now();
            let (lines, bytes) = write_atomically(&target, &text)?;
            Ok((lines, bytes, started.elapsed()))
        }));
        previous
    }

    /// Join the running save; the version advances only if it succeeded
    pub fn wait(&mut self) -> Result<Option<SaveReport>, SaveError> {
        let Some(handle) = self.pending.take() else {
            return Ok(None);
        };
        let joined = handle.join().unwrap_or_else(|_| {
            Err(SaveError::WorkerPanicked {
                path: self.target.clone(),
            })
        });

        match joined {
            Ok((lines, bytes, duration)) => {
                self.version += 1;
                log_success!(codes::success::SAVE_COMPLETE, "Saved",
                    "path" => self.target.display(),
                    "lines" => lines,
                    "version" => self.version);
                Ok(Some(SaveReport {
                    path: self.target.clone(),
                    lines,
                    bytes,
                    duration,
                    version: self.version,
                }))
            }
            Err(error) => {
                log_error!(error.error_code(), &error.to_string(),
                    "path" => self.target.display(),
                    "version" => self.version);
                Err(error)
            }
        }
    }
}

impl Drop for FileSession {
    fn drop(&mut self) {
        // never leave a half-written file behind an unjoined thread
        if let Some(handle) = self.pending.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    #[test]
    fn test_save_writes_and_advances_version() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.wrl");
        let mut session = FileSession::new(&target);

        assert_matches!(session.save("Group {\n}\n".to_string()), Ok(None));
        let report = session.wait().unwrap().unwrap();
        assert_eq!(report.lines, 2);
        assert_eq!(report.version, 1);
        assert_eq!(session.version(), 1);
        assert_eq!(fs::read_to_string(&target).unwrap(), "Group {\n}\n");
        assert!(!tmp_path(&target).exists());
    }

    #[test]
    fn test_new_save_joins_previous() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.wrl");
        let mut session = FileSession::new(&target);

        session.save("first\n".to_string()).unwrap();
        let previous = session.save("second\n".to_string()).unwrap();
        assert_eq!(previous.map(|r| r.version), Some(1));
        session.wait().unwrap();
        assert_eq!(session.version(), 2);
        assert_eq!(fs::read_to_string(&target).unwrap(), "second\n");
    }

    #[test]
    fn test_failed_save_keeps_version() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("out.wrl");
        let mut session = FileSession::new(&target);

        session.save("Group { }\n".to_string()).unwrap();
        assert_matches!(session.wait(), Err(SaveError::Write { .. }));
        assert_eq!(session.version(), 0);
        assert!(!target.exists());
        assert!(!tmp_path(&target).exists());
    }

    #[test]
    fn test_error_codes() {
        let error = SaveError::WorkerPanicked {
            path: PathBuf::from("a.wrl"),
        };
        assert_eq!(error.error_code(), codes::save::WORKER_PANICKED);
    }
}
