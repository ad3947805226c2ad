//! The append-only directory history log.
//!
//! Every line is one visit. Lines are written whole in append mode, so
//! several sessions can share one log without corrupting each other.

use crate::config::ScdConfig;
use crate::error::{HistoryError, ScdError};
use crate::session::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Source of visit timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Line layout of the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// `: <epoch-seconds>:0;<path>`, the zsh extended-history layout.
    #[default]
    Extended,
    /// The bare path.
    Plain,
}

impl LogFormat {
    /// One complete log line for `record`, newline included.
    pub fn encode(&self, record: &VisitRecord) -> Vec<u8> {
        let path = record.path.as_os_str().as_encoded_bytes();
        let mut line = match self {
            LogFormat::Extended => format!(": {}:0;", record.timestamp).into_bytes(),
            LogFormat::Plain => Vec::with_capacity(path.len() + 1),
        };
        line.extend_from_slice(path);
        line.push(b'\n');
        line
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Extended => write!(f, "extended"),
            LogFormat::Plain => write!(f, "plain"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ScdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "extended" | "zsh" => Ok(LogFormat::Extended),
            "plain" => Ok(LogFormat::Plain),
            other => Err(ScdError::InvalidConfig(format!(
                "unknown history format {other:?} (expected \"extended\" or \"plain\")"
            ))),
        }
    }
}

/// One visit about to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisitRecord {
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    pub path: PathBuf,
}

impl VisitRecord {
    pub fn new<P: Into<PathBuf>>(path: P, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.timestamp(),
            path: path.into(),
        }
    }
}

/// One visit read back from the log. Plain-format lines carry no timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedVisit {
    pub timestamp: Option<i64>,
    pub path: PathBuf,
}

impl LoggedVisit {
    /// Parse one log line in either format.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix(": ") else {
            return Some(Self {
                timestamp: None,
                path: PathBuf::from(line),
            });
        };

        let (meta, path) = rest.split_once(';')?;
        let (timestamp, _duration) = meta.split_once(':')?;
        let timestamp = timestamp.parse::<i64>().ok()?;
        if path.is_empty() {
            return None;
        }
        Some(Self {
            timestamp: Some(timestamp),
            path: PathBuf::from(path),
        })
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    format: LogFormat,
}

impl HistoryStore {
    pub fn new<P: Into<PathBuf>>(path: P, format: LogFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn from_config(config: &ScdConfig) -> crate::Result<Self> {
        Ok(Self::new(config.history_file()?, config.log_format()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// Log a visit to `dir` unless it repeats the session's last recorded
    /// directory.
    ///
    /// Returns whether a line was written. The session's last directory is
    /// updated before the write, so a failed append is not retried by an
    /// immediate repeat.
    pub fn record(
        &self,
        session: &mut SessionState,
        dir: &Path,
        clock: &dyn Clock,
    ) -> Result<bool, HistoryError> {
        validate_path(dir)?;
        if session.last_recorded() == Some(dir) {
            debug!(path = %dir.display(), "directory repeats last visit, not logged");
            return Ok(false);
        }
        session.set_last_recorded(dir.to_path_buf());
        self.append(&VisitRecord::new(dir, clock.now()))?;
        debug!(path = %dir.display(), log = %self.path.display(), "visit logged");
        Ok(true)
    }

    /// Append one record as a single write.
    pub fn append(&self, record: &VisitRecord) -> Result<(), HistoryError> {
        let line = self.format.encode(record);
        let mut file = self.open_for_append().map_err(|source| HistoryError::Append {
            path: self.path.clone(),
            source,
        })?;
        file.write_all(&line)
            .map_err(|source| HistoryError::Append {
                path: self.path.clone(),
                source,
            })
    }

    /// Every parseable visit in the log, oldest first.
    pub fn read(&self) -> Result<Vec<LoggedVisit>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut visits = Vec::new();
        for line in reader.split(b'\n') {
            let line = line?;
            if let Some(visit) = LoggedVisit::parse(&String::from_utf8_lossy(&line)) {
                visits.push(visit);
            }
        }
        Ok(visits)
    }

    /// Open the log for appending. A new log is created readable by its
    /// owner only; an existing one keeps its mode.
    fn open_for_append(&self) -> io::Result<File> {
        let mut create = OpenOptions::new();
        create.append(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            create.mode(0o600);
        }

        match create.open(&self.path) {
            Ok(file) => {
                debug!(log = %self.path.display(), "created history log");
                Ok(file)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                OpenOptions::new().append(true).open(&self.path)
            }
            Err(e) => Err(e),
        }
    }
}

fn validate_path(dir: &Path) -> Result<(), HistoryError> {
    let bytes = dir.as_os_str().as_encoded_bytes();
    if bytes.is_empty() || !dir.is_absolute() || bytes.contains(&b'\n') {
        return Err(HistoryError::InvalidPath(dir.to_path_buf()));
    }
    Ok(())
}
