#![doc = include_str!("../README.md")]

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

// ── Error ────────────────────────────────────────────────────────────

/// Errors raised by host navigation primitives.
///
/// These are what the user sees when `cd`, `pushd` or `popd` rejects its
/// argument. Wrappers around the primitives pass them through untouched.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no such directory: {}", .0.display())]
    NoSuchDirectory(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("directory stack empty")]
    DirStackEmpty,

    #[error("{0}")]
    Usage(String),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

impl HostError {
    /// Classify a failed directory change on `target`.
    pub fn from_chdir<P: Into<PathBuf>>(target: P, err: io::Error) -> Self {
        let target = target.into();
        match err.kind() {
            io::ErrorKind::NotFound => HostError::NoSuchDirectory(target),
            io::ErrorKind::PermissionDenied => HostError::PermissionDenied(target),
            io::ErrorKind::NotADirectory => HostError::NotADirectory(target),
            _ => HostError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;

// ── Commands ─────────────────────────────────────────────────────────

type CommandFn = dyn Fn(&str) -> Result<()>;

/// A named host command that takes a free-text argument string.
///
/// Cloning yields another handle to the same function, so a handle taken
/// before a name is rebound keeps calling the function it was taken from.
#[derive(Clone)]
pub struct Command {
    name: String,
    func: Rc<CommandFn>,
}

impl Command {
    pub fn new<S, F>(name: S, func: F) -> Self
    where
        S: Into<String>,
        F: Fn(&str) -> Result<()> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, arg: &str) -> Result<()> {
        (self.func)(arg)
    }

    /// True when both handles point at the same underlying function.
    pub fn same_as(&self, other: &Command) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").field("name", &self.name).finish()
    }
}

// ── Traits ───────────────────────────────────────────────────────────

/// The command-binding surface of a host environment.
///
/// Implement this once per supported host. Code that installs or restores
/// commands only ever goes through this trait.
pub trait CommandRegistry {
    /// Short identifier for the host, used in diagnostics.
    fn host_name(&self) -> &str;

    /// The command currently bound to `name`.
    ///
    /// Hosts that cannot look commands up return `None`.
    fn find(&self, name: &str) -> Option<Command>;

    /// Bind `command` under its own name, replacing any previous binding.
    fn register(&mut self, command: Command);

    /// Drop the binding for `name` and return it.
    fn unregister(&mut self, name: &str) -> Option<Command>;
}

/// Where the host's current working directory is read from.
pub trait WorkingDirectory {
    fn current_dir(&self) -> io::Result<PathBuf>;
}

/// The working directory of this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCwd;

impl WorkingDirectory for ProcessCwd {
    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}

// ── CommandTable ─────────────────────────────────────────────────────

/// A map-backed [`CommandRegistry`].
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    host: String,
    commands: HashMap<String, Command>,
}

impl CommandTable {
    pub fn new<S: Into<String>>(host: S) -> Self {
        Self {
            host: host.into(),
            commands: HashMap::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Bound command names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Call the command bound to `name` with `arg`.
    pub fn dispatch(&self, name: &str, arg: &str) -> Result<()> {
        let command = self
            .find(name)
            .ok_or_else(|| HostError::UnknownCommand(name.to_string()))?;
        command.call(arg)
    }
}

impl CommandRegistry for CommandTable {
    fn host_name(&self) -> &str {
        &self.host
    }

    fn find(&self, name: &str) -> Option<Command> {
        self.commands.get(name).cloned()
    }

    fn register(&mut self, command: Command) {
        self.commands.insert(command.name().to_string(), command);
    }

    fn unregister(&mut self, name: &str) -> Option<Command> {
        self.commands.remove(name)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
