//! Test doubles: an in-memory host, a fixed clock and throwaway matchers.

use crate::history::Clock;
use chrono::{DateTime, Utc};
use smartcd_host::{Command, CommandRegistry, CommandTable, HostError, WorkingDirectory};
use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub(crate) struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap()
    }
}

/// A host whose working directory lives in memory, so tests never touch the
/// process cwd. Targets still have to be real directories.
pub(crate) struct FakeHost {
    pub table: CommandTable,
    cwd: Rc<RefCell<PathBuf>>,
    stack: Rc<RefCell<Vec<PathBuf>>>,
}

struct FakeCwd(Rc<RefCell<PathBuf>>);

impl WorkingDirectory for FakeCwd {
    fn current_dir(&self) -> io::Result<PathBuf> {
        Ok(self.0.borrow().clone())
    }
}

impl FakeHost {
    pub fn new(start: &Path) -> Self {
        let cwd = Rc::new(RefCell::new(start.canonicalize().unwrap()));
        let stack = Rc::new(RefCell::new(Vec::new()));
        let mut table = CommandTable::new("fake");

        let cd_cwd = cwd.clone();
        table.register(Command::new("cd", move |arg| {
            let target = resolve(&cd_cwd.borrow(), arg)?;
            *cd_cwd.borrow_mut() = target;
            Ok(())
        }));

        let (push_cwd, push_stack) = (cwd.clone(), stack.clone());
        table.register(Command::new("pushd", move |arg| {
            let target = resolve(&push_cwd.borrow(), arg)?;
            let previous = push_cwd.replace(target);
            push_stack.borrow_mut().push(previous);
            Ok(())
        }));

        let (pop_cwd, pop_stack) = (cwd.clone(), stack.clone());
        table.register(Command::new("popd", move |_| {
            let previous = pop_stack
                .borrow_mut()
                .pop()
                .ok_or(HostError::DirStackEmpty)?;
            *pop_cwd.borrow_mut() = previous;
            Ok(())
        }));

        Self { table, cwd, stack }
    }

    pub fn cwd(&self) -> PathBuf {
        self.cwd.borrow().clone()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.borrow().len()
    }

    pub fn working_dir(&self) -> Rc<dyn WorkingDirectory> {
        Rc::new(FakeCwd(self.cwd.clone()))
    }

    pub fn run(&self, name: &str, arg: &str) -> smartcd_host::Result<()> {
        self.table
            .find(name)
            .ok_or_else(|| HostError::UnknownCommand(name.to_string()))?
            .call(arg)
    }
}

fn resolve(cwd: &Path, arg: &str) -> smartcd_host::Result<PathBuf> {
    let joined = cwd.join(arg.trim());
    let target = joined
        .canonicalize()
        .map_err(|e| HostError::from_chdir(&joined, e))?;
    if !target.is_dir() {
        return Err(HostError::NotADirectory(target));
    }
    Ok(target)
}

/// Write an executable `/bin/sh` script named `scd` into `dir`.
#[cfg(unix)]
pub(crate) fn fake_matcher(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("scd");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
