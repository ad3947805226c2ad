use crate::history::{Clock, HistoryStore, SystemClock};
use crate::resolver::{EnvironmentSnapshot, NavVerb, ResolutionDecision, ResolverBridge};
use crate::session::{CD, OriginalCommands, POPD, PUSHD, SharedSession};
use smartcd_host::{Command, HostError, ProcessCwd, WorkingDirectory};
use std::rc::Rc;
use tracing::{debug, warn};

/// Name of the smart change-directory command.
pub const SMART_COMMAND: &str = "scd";

/// Wraps the host's `cd`, `pushd` and `popd` so that each successful call
/// logs the directory it ended up in, and provides `scd`.
///
/// Logging is best effort. A failed append is reported through `tracing`
/// and never turns a successful navigation into an error.
pub struct NavigationInterceptor {
    session: SharedSession,
    history: HistoryStore,
    resolver: ResolverBridge,
    clock: Rc<dyn Clock>,
    cwd: Rc<dyn WorkingDirectory>,
}

impl NavigationInterceptor {
    pub fn new(session: SharedSession, history: HistoryStore, resolver: ResolverBridge) -> Self {
        Self {
            session,
            history,
            resolver,
            clock: Rc::new(SystemClock),
            cwd: Rc::new(ProcessCwd),
        }
    }

    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_working_directory(mut self, cwd: Rc<dyn WorkingDirectory>) -> Self {
        self.cwd = cwd;
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn resolver(&self) -> &ResolverBridge {
        &self.resolver
    }

    /// Ask the matcher where `query` leads and go there.
    pub fn smart_change(&self, query: &str) -> smartcd_host::Result<ResolutionDecision> {
        self.smart_change_with_env(query, &EnvironmentSnapshot::capture())
    }

    /// [`smart_change`](Self::smart_change) with an explicit matcher environment.
    pub fn smart_change_with_env(
        &self,
        query: &str,
        env: &EnvironmentSnapshot,
    ) -> smartcd_host::Result<ResolutionDecision> {
        let decision = match self.resolver.resolve(query, env) {
            Ok(decision) => decision,
            Err(e) => {
                warn!(error = %e, "scd: matcher failed, staying put");
                return Ok(ResolutionDecision::NoDecision);
            }
        };

        let (verb, target) = match decision {
            ResolutionDecision::Navigate { verb, target } => (verb, target),
            ResolutionDecision::NoDecision => return Ok(ResolutionDecision::NoDecision),
        };
        let originals = self.originals()?;
        let primitive = match verb {
            NavVerb::Change => &originals.cd,
            NavVerb::Push => &originals.pushd,
        };
        primitive.call(&target)?;
        self.record_cwd();
        Ok(ResolutionDecision::Navigate { verb, target })
    }

    pub fn change(&self, arg: &str) -> smartcd_host::Result<()> {
        let originals = self.originals()?;
        self.pass_through(&originals.cd, arg)
    }

    pub fn push(&self, arg: &str) -> smartcd_host::Result<()> {
        let originals = self.originals()?;
        self.pass_through(&originals.pushd, arg)
    }

    pub fn pop(&self, arg: &str) -> smartcd_host::Result<()> {
        let originals = self.originals()?;
        self.pass_through(&originals.popd, arg)
    }

    /// Log the host's current directory. Returns whether a line was written.
    pub fn record_cwd(&self) -> bool {
        if !self.session.borrow().is_active() {
            debug!("smart cd inactive, visit not logged");
            return false;
        }
        let cwd = match self.cwd.current_dir() {
            Ok(cwd) => cwd,
            Err(e) => {
                warn!(error = %e, "cannot read working directory, visit not logged");
                return false;
            }
        };
        let mut session = self.session.borrow_mut();
        match self.history.record(&mut session, &cwd, self.clock.as_ref()) {
            Ok(written) => written,
            Err(e) => {
                warn!(error = %e, "visit not logged");
                false
            }
        }
    }

    /// The four commands to bind in the host, in the order
    /// `scd`, `cd`, `pushd`, `popd`.
    pub fn commands(self: &Rc<Self>) -> [Command; 4] {
        let scd = Rc::clone(self);
        let cd = Rc::clone(self);
        let pushd = Rc::clone(self);
        let popd = Rc::clone(self);
        [
            Command::new(SMART_COMMAND, move |arg| scd.smart_change(arg).map(|_| ())),
            Command::new(CD, move |arg| cd.change(arg)),
            Command::new(PUSHD, move |arg| pushd.push(arg)),
            Command::new(POPD, move |arg| popd.pop(arg)),
        ]
    }

    fn pass_through(&self, primitive: &Command, arg: &str) -> smartcd_host::Result<()> {
        primitive.call(arg)?;
        self.record_cwd();
        Ok(())
    }

    fn originals(&self) -> smartcd_host::Result<OriginalCommands> {
        self.session
            .borrow()
            .originals()
            .cloned()
            .ok_or_else(|| HostError::Other("navigation commands were never captured".into()))
    }
}
