use crate::error::{Result, ScdError};
use crate::history::LogFormat;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HISTFILE_ENV: &str = "SCD_HISTFILE";
pub const HISTFORMAT_ENV: &str = "SCD_HISTFORMAT";
pub const EXECUTABLE_ENV: &str = "SCD_EXECUTABLE";

/// Matcher looked up on `PATH` when no override is configured.
pub const DEFAULT_MATCHER: &str = "scd";

const DEFAULT_HISTFILE: &str = ".scdhistory";

#[derive(Debug, Clone)]
pub struct ScdConfig {
    home_dir: Option<PathBuf>,
    history_file: Option<PathBuf>,
    matcher: Option<PathBuf>,
    log_format: LogFormat,
    timeout: Option<Duration>,
}

impl Default for ScdConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScdConfig {
    pub fn new() -> Self {
        Self {
            home_dir: dirs::home_dir(),
            history_file: None,
            matcher: None,
            log_format: LogFormat::default(),
            timeout: None,
        }
    }

    /// Configuration taken from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var_os(key))
    }

    /// Configuration taken from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let mut config = Self::new();
        if let Some(home) = var("HOME").or_else(|| var("USERPROFILE")) {
            config.home_dir = Some(PathBuf::from(home));
        }
        if let Some(histfile) = var(HISTFILE_ENV) {
            config.history_file = Some(PathBuf::from(histfile));
        }
        if let Some(matcher) = var(EXECUTABLE_ENV) {
            config.matcher = Some(PathBuf::from(matcher));
        }
        if let Some(format) = var(HISTFORMAT_ENV) {
            let format = format.to_str().ok_or_else(|| {
                ScdError::InvalidConfig(format!("{HISTFORMAT_ENV} is not valid UTF-8"))
            })?;
            config.log_format = format.parse()?;
        }
        Ok(config)
    }

    pub fn with_home<P: Into<PathBuf>>(mut self, home: P) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    pub fn with_history_file<P: Into<PathBuf>>(mut self, history_file: P) -> Self {
        self.history_file = Some(history_file.into());
        self
    }

    pub fn with_matcher<P: Into<PathBuf>>(mut self, matcher: P) -> Self {
        self.matcher = Some(matcher.into());
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn home_dir(&self) -> Result<&Path> {
        self.home_dir.as_deref().ok_or(ScdError::NoHomeDirectory)
    }

    pub fn history_file(&self) -> Result<PathBuf> {
        if let Some(ref history_file) = self.history_file {
            return Ok(history_file.clone());
        }

        let home = self.home_dir()?;
        Ok(home.join(DEFAULT_HISTFILE))
    }

    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The configured matcher, or [`DEFAULT_MATCHER`].
    pub fn matcher(&self) -> &Path {
        self.matcher
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_MATCHER))
    }

    /// Absolute path of the matcher executable.
    pub fn locate_matcher(&self) -> Result<PathBuf> {
        find_executable(self.matcher())
    }
}

/// Resolve `program` to an absolute path of an executable file.
///
/// A bare name is searched on `PATH`; anything with a directory component
/// is checked where it points.
pub fn find_executable(program: &Path) -> Result<PathBuf> {
    let found = which::which(program)
        .map_err(|_| ScdError::MatcherNotFound(program.display().to_string()))?;
    std::path::absolute(&found).map_err(|_| ScdError::MatcherNotFound(found.display().to_string()))
}

mod dirs {
    use super::*;

    pub fn home_dir() -> Option<PathBuf> {
        env::var_os("HOME")
            .or_else(|| env::var_os("USERPROFILE"))
            .map(PathBuf::from)
    }
}
