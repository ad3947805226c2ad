//! Bridge to the external matcher process.
//!
//! The matcher receives the query as argv and the path of a scratch file in
//! `SCD_SCRIPT`. On success it writes a single `cd <dir>` or `pushd <dir>`
//! line there. Anything it has to tell the user goes to its own stderr.

use crate::error::ResolverError;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Environment variable naming the decision file.
pub const SCRIPT_ENV: &str = "SCD_SCRIPT";

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavVerb {
    Change,
    Push,
}

impl NavVerb {
    /// The token the matcher writes for this verb.
    pub fn token(&self) -> &'static str {
        match self {
            NavVerb::Change => "cd",
            NavVerb::Push => "pushd",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "cd" => Some(NavVerb::Change),
            "pushd" => Some(NavVerb::Push),
            _ => None,
        }
    }
}

impl fmt::Display for NavVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// What the matcher decided for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "lowercase")]
pub enum ResolutionDecision {
    Navigate { verb: NavVerb, target: String },
    NoDecision,
}

impl ResolutionDecision {
    /// Parse a decision line: a verb token, one space, and a single
    /// shell-quoted argument. Anything else is [`ResolutionDecision::NoDecision`].
    pub fn parse_line(line: &str) -> Self {
        let line = line.trim_end();
        let Some((token, rest)) = line.split_once(' ') else {
            return ResolutionDecision::NoDecision;
        };
        let Some(verb) = NavVerb::from_token(token) else {
            return ResolutionDecision::NoDecision;
        };
        match shlex::split(rest).as_deref() {
            Some([target]) if !target.is_empty() => ResolutionDecision::Navigate {
                verb,
                target: target.clone(),
            },
            _ => ResolutionDecision::NoDecision,
        }
    }

    pub fn is_navigate(&self) -> bool {
        matches!(self, ResolutionDecision::Navigate { .. })
    }

    /// The decision as a line the matcher could have written.
    pub fn to_line(&self) -> Option<String> {
        match self {
            ResolutionDecision::Navigate { verb, target } => {
                let quoted = shlex::try_quote(target).ok()?;
                Some(format!("{verb} {quoted}"))
            }
            ResolutionDecision::NoDecision => None,
        }
    }
}

/// Environment handed to the matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentSnapshot {
    vars: Vec<(OsString, OsString)>,
}

impl EnvironmentSnapshot {
    /// The current process environment.
    pub fn capture() -> Self {
        Self {
            vars: std::env::vars_os().collect(),
        }
    }

    /// Set `key`, replacing any existing value.
    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let key = key.into();
        let value = value.into();
        self.vars.retain(|(k, _)| *k != key);
        self.vars.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&OsStr> {
        self.vars
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

#[derive(Debug, Clone)]
pub struct ResolverBridge {
    matcher: PathBuf,
    timeout: Option<Duration>,
}

impl ResolverBridge {
    pub fn new<P: Into<PathBuf>>(matcher: P) -> Self {
        Self {
            matcher: matcher.into(),
            timeout: None,
        }
    }

    /// Kill the matcher if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn matcher(&self) -> &Path {
        &self.matcher
    }

    /// Run the matcher on `query` and read back its decision.
    ///
    /// A non-zero exit is a [`ResolutionDecision::NoDecision`], not an
    /// error. The decision file is removed however this returns.
    pub fn resolve(
        &self,
        query: &str,
        env: &EnvironmentSnapshot,
    ) -> Result<ResolutionDecision, ResolverError> {
        let args =
            shlex::split(query).ok_or_else(|| ResolverError::InvalidQuery(query.to_string()))?;
        let channel = tempfile::Builder::new().prefix("scd-").tempfile()?;

        debug!(
            matcher = %self.matcher.display(),
            ?args,
            channel = %channel.path().display(),
            "running matcher"
        );
        let mut child = Command::new(&self.matcher)
            .args(&args)
            .env_clear()
            .envs(env.iter())
            .env(SCRIPT_ENV, channel.path())
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => ResolverError::NotFound(self.matcher.clone()),
                _ => ResolverError::Spawn {
                    path: self.matcher.clone(),
                    source,
                },
            })?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            debug!(%status, "matcher made no decision");
            return Ok(ResolutionDecision::NoDecision);
        }

        // The matcher may have replaced the file, so read it by path.
        let output = std::fs::read(channel.path())?;
        let decision = String::from_utf8_lossy(&output)
            .lines()
            .next()
            .map(ResolutionDecision::parse_line)
            .unwrap_or(ResolutionDecision::NoDecision);
        debug!(?decision, "matcher finished");
        Ok(decision)
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, ResolverError> {
        let Some(timeout) = self.timeout else {
            return Ok(child.wait()?);
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if start.elapsed() >= timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ResolverError::Timeout(timeout));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cd() {
        assert_eq!(
            ResolutionDecision::parse_line("cd /tmp/project\n"),
            ResolutionDecision::Navigate {
                verb: NavVerb::Change,
                target: "/tmp/project".into()
            }
        );
    }

    #[test]
    fn test_parse_pushd_quoted() {
        assert_eq!(
            ResolutionDecision::parse_line("pushd '/home/alex/my docs'"),
            ResolutionDecision::Navigate {
                verb: NavVerb::Push,
                target: "/home/alex/my docs".into()
            }
        );
        assert_eq!(
            ResolutionDecision::parse_line(r"cd /home/alex/my\ docs"),
            ResolutionDecision::Navigate {
                verb: NavVerb::Change,
                target: "/home/alex/my docs".into()
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_verb() {
        assert_eq!(
            ResolutionDecision::parse_line("popd /tmp"),
            ResolutionDecision::NoDecision
        );
        assert_eq!(
            ResolutionDecision::parse_line("rm -rf /"),
            ResolutionDecision::NoDecision
        );
    }

    #[test]
    fn test_parse_rejects_missing_or_extra_argument() {
        for line in ["", "cd", "cd ", "cd /a /b", "pushd 'unterminated"] {
            assert_eq!(
                ResolutionDecision::parse_line(line),
                ResolutionDecision::NoDecision,
                "line {line:?}"
            );
        }
    }

    #[test]
    fn test_to_line_quotes_target() {
        let decision = ResolutionDecision::Navigate {
            verb: NavVerb::Push,
            target: "/tmp/a b".into(),
        };
        let line = decision.to_line().unwrap();
        assert_eq!(ResolutionDecision::parse_line(&line), decision);
        assert!(ResolutionDecision::NoDecision.to_line().is_none());
    }

    #[test]
    fn test_decision_json() {
        let decision = ResolutionDecision::Navigate {
            verb: NavVerb::Change,
            target: "/tmp".into(),
        };
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"decision": "navigate", "verb": "change", "target": "/tmp"})
        );
        let none = serde_json::to_value(ResolutionDecision::NoDecision).unwrap();
        assert_eq!(none, serde_json::json!({"decision": "nodecision"}));
    }

    #[test]
    fn test_snapshot_with_var_replaces() {
        let env = EnvironmentSnapshot::default()
            .with_var("A", "1")
            .with_var("B", "2")
            .with_var("A", "3");
        assert_eq!(env.get("A"), Some(OsStr::new("3")));
        assert_eq!(env.iter().count(), 2);
        assert!(env.get("C").is_none());
    }

    #[test]
    fn test_invalid_query() {
        let bridge = ResolverBridge::new("/nonexistent/scd");
        let err = bridge
            .resolve("\"unbalanced", &EnvironmentSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, ResolverError::InvalidQuery(_)));
    }

    #[test]
    fn test_missing_matcher() {
        let bridge = ResolverBridge::new("/nonexistent/dir/scd");
        let err = bridge
            .resolve("proj", &EnvironmentSnapshot::default())
            .unwrap_err();
        assert!(matches!(err, ResolverError::NotFound(_)));
    }

    #[cfg(unix)]
    mod with_matcher {
        use super::*;
        use crate::testing::fake_matcher;
        use std::fs;
        use tempfile::TempDir;

        fn base_env() -> EnvironmentSnapshot {
            EnvironmentSnapshot::default().with_var("PATH", "/usr/bin:/bin")
        }

        #[test]
        fn test_resolve_cd_decision() {
            let temp = TempDir::new().unwrap();
            let matcher = fake_matcher(temp.path(), "echo 'cd /tmp/project' > \"$SCD_SCRIPT\"");
            let decision = ResolverBridge::new(matcher)
                .resolve("proj", &base_env())
                .unwrap();
            assert_eq!(
                decision,
                ResolutionDecision::Navigate {
                    verb: NavVerb::Change,
                    target: "/tmp/project".into()
                }
            );
        }

        #[test]
        fn test_resolve_only_first_line_counts() {
            let temp = TempDir::new().unwrap();
            let matcher = fake_matcher(
                temp.path(),
                "printf 'pushd /srv\\ncd /etc\\n' > \"$SCD_SCRIPT\"",
            );
            let decision = ResolverBridge::new(matcher)
                .resolve("", &base_env())
                .unwrap();
            assert_eq!(
                decision,
                ResolutionDecision::Navigate {
                    verb: NavVerb::Push,
                    target: "/srv".into()
                }
            );
        }

        #[test]
        fn test_resolve_nonzero_exit_is_no_decision() {
            let temp = TempDir::new().unwrap();
            let matcher = fake_matcher(
                temp.path(),
                "echo 'cd /tmp' > \"$SCD_SCRIPT\"\necho 'no matching directory' >&2\nexit 1",
            );
            let decision = ResolverBridge::new(matcher)
                .resolve("zzz", &base_env())
                .unwrap();
            assert_eq!(decision, ResolutionDecision::NoDecision);
        }

        #[test]
        fn test_resolve_empty_output_is_no_decision() {
            let temp = TempDir::new().unwrap();
            let matcher = fake_matcher(temp.path(), "exit 0");
            let decision = ResolverBridge::new(matcher)
                .resolve("--list", &base_env())
                .unwrap();
            assert_eq!(decision, ResolutionDecision::NoDecision);
        }

        #[test]
        fn test_resolve_passes_split_query_and_env() {
            let temp = TempDir::new().unwrap();
            let args_file = temp.path().join("args");
            let body = format!(
                "for a in \"$@\"; do echo \"$a\"; done > '{}'\necho \"$GREETING\" >> '{}'",
                args_file.display(),
                args_file.display()
            );
            let matcher = fake_matcher(temp.path(), &body);
            let env = base_env().with_var("GREETING", "hello");
            ResolverBridge::new(matcher)
                .resolve("-p 'my docs' src", &env)
                .unwrap();
            assert_eq!(
                fs::read_to_string(&args_file).unwrap(),
                "-p\nmy docs\nsrc\nhello\n"
            );
        }

        #[test]
        fn test_channel_removed_after_call() {
            let temp = TempDir::new().unwrap();
            let seen = temp.path().join("channel");
            let body = format!(
                "echo \"$SCD_SCRIPT\" > '{}'\necho 'cd /tmp' > \"$SCD_SCRIPT\"",
                seen.display()
            );
            let matcher = fake_matcher(temp.path(), &body);
            ResolverBridge::new(matcher)
                .resolve("x", &base_env())
                .unwrap();
            let channel = fs::read_to_string(&seen).unwrap();
            assert!(!Path::new(channel.trim()).exists());
        }

        #[test]
        fn test_channel_removed_after_failure() {
            let temp = TempDir::new().unwrap();
            let seen = temp.path().join("channel");
            let body = format!("echo \"$SCD_SCRIPT\" > '{}'\nexit 3", seen.display());
            let matcher = fake_matcher(temp.path(), &body);
            ResolverBridge::new(matcher)
                .resolve("x", &base_env())
                .unwrap();
            let channel = fs::read_to_string(&seen).unwrap();
            assert!(!Path::new(channel.trim()).exists());
        }

        #[test]
        fn test_timeout() {
            let temp = TempDir::new().unwrap();
            let matcher = fake_matcher(temp.path(), "exec sleep 5");
            let err = ResolverBridge::new(matcher)
                .with_timeout(Some(Duration::from_millis(100)))
                .resolve("x", &base_env())
                .unwrap_err();
            assert!(matches!(err, ResolverError::Timeout(_)));
        }

        #[test]
        fn test_not_executable_is_spawn_error() {
            let temp = TempDir::new().unwrap();
            let plain = temp.path().join("scd");
            fs::write(&plain, "#!/bin/sh\nexit 0\n").unwrap();
            let err = ResolverBridge::new(&plain)
                .resolve("x", &base_env())
                .unwrap_err();
            assert!(matches!(err, ResolverError::Spawn { .. }));
        }
    }
}
