use crate::error::{Result, ScdError};
use smartcd_host::{Command, CommandRegistry};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub const CD: &str = "cd";
pub const PUSHD: &str = "pushd";
pub const POPD: &str = "popd";

/// The host's own navigation primitives, as bound before any wrapping.
#[derive(Debug, Clone)]
pub struct OriginalCommands {
    pub cd: Command,
    pub pushd: Command,
    pub popd: Command,
}

impl OriginalCommands {
    /// Look up `cd`, `pushd` and `popd` in `registry`.
    pub fn capture(registry: &dyn CommandRegistry) -> Result<Self> {
        let find = |name: &str| {
            registry
                .find(name)
                .ok_or_else(|| ScdError::MissingPrimitive {
                    host: registry.host_name().to_string(),
                    command: name.to_string(),
                })
        };
        Ok(Self {
            cd: find(CD)?,
            pushd: find(PUSHD)?,
            popd: find(POPD)?,
        })
    }

    /// Bind the captured primitives back under their own names.
    pub fn restore(&self, registry: &mut dyn CommandRegistry) {
        for command in [&self.cd, &self.pushd, &self.popd] {
            registry.register(command.clone());
        }
    }
}

/// Per-session bookkeeping shared by the lifecycle, the interceptor and the
/// history store.
#[derive(Debug, Default)]
pub struct SessionState {
    last_recorded: Option<PathBuf>,
    active: bool,
    originals: Option<OriginalCommands>,
}

pub type SharedSession = Rc<RefCell<SessionState>>;

impl SessionState {
    pub fn shared() -> SharedSession {
        Rc::new(RefCell::new(Self::default()))
    }

    /// The directory most recently written to the log. Used only to skip
    /// repeats.
    pub fn last_recorded(&self) -> Option<&Path> {
        self.last_recorded.as_deref()
    }

    pub fn set_last_recorded(&mut self, path: PathBuf) {
        self.last_recorded = Some(path);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn originals(&self) -> Option<&OriginalCommands> {
        self.originals.as_ref()
    }

    /// Keep `originals` unless some were already captured.
    ///
    /// Returns whether they were stored.
    pub(crate) fn capture_originals_once(&mut self, originals: OriginalCommands) -> bool {
        if self.originals.is_some() {
            return false;
        }
        self.originals = Some(originals);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smartcd_host::CommandTable;

    fn table_with(names: &[&str]) -> CommandTable {
        let mut table = CommandTable::new("test");
        for name in names {
            table.register(Command::new(*name, |_| Ok(())));
        }
        table
    }

    #[test]
    fn test_capture_all_three() {
        let table = table_with(&[CD, PUSHD, POPD]);
        let originals = OriginalCommands::capture(&table).unwrap();
        assert_eq!(originals.cd.name(), "cd");
        assert_eq!(originals.pushd.name(), "pushd");
        assert_eq!(originals.popd.name(), "popd");
    }

    #[test]
    fn test_capture_missing_primitive() {
        let table = table_with(&[CD, POPD]);
        let err = OriginalCommands::capture(&table).unwrap_err();
        match err {
            ScdError::MissingPrimitive { host, command } => {
                assert_eq!(host, "test");
                assert_eq!(command, "pushd");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_restore_rebinds_same_functions() {
        let mut table = table_with(&[CD, PUSHD, POPD]);
        let originals = OriginalCommands::capture(&table).unwrap();
        for name in [CD, PUSHD, POPD] {
            table.register(Command::new(name, |_| Ok(())));
        }
        originals.restore(&mut table);
        assert!(table.find(CD).unwrap().same_as(&originals.cd));
        assert!(table.find(PUSHD).unwrap().same_as(&originals.pushd));
        assert!(table.find(POPD).unwrap().same_as(&originals.popd));
    }

    #[test]
    fn test_capture_originals_once() {
        let table = table_with(&[CD, PUSHD, POPD]);
        let first = OriginalCommands::capture(&table).unwrap();
        let second = OriginalCommands {
            cd: Command::new(CD, |_| Ok(())),
            pushd: Command::new(PUSHD, |_| Ok(())),
            popd: Command::new(POPD, |_| Ok(())),
        };

        let mut state = SessionState::default();
        assert!(state.capture_originals_once(first.clone()));
        assert!(!state.capture_originals_once(second));
        assert!(state.originals().unwrap().cd.same_as(&first.cd));
    }

    #[test]
    fn test_default_state() {
        let shared = SessionState::shared();
        let state = shared.borrow();
        assert!(!state.is_active());
        assert!(state.last_recorded().is_none());
        assert!(state.originals().is_none());
    }
}
