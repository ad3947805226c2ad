use crate::config::ScdConfig;
use crate::error::Result;
use crate::history::{Clock, HistoryStore, SystemClock};
use crate::interceptor::{NavigationInterceptor, SMART_COMMAND};
use crate::resolver::ResolverBridge;
use crate::session::{OriginalCommands, SessionState, SharedSession};
use smartcd_host::{CommandRegistry, ProcessCwd, WorkingDirectory};
use std::rc::Rc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Inactive,
    Active,
}

/// Installs and removes the wrapped navigation commands in a host.
///
/// The host's own `cd`, `pushd` and `popd` are captured on the first
/// activation and kept for the rest of the session, so activating again
/// after a deactivation never wraps a wrapper.
pub struct ExtensionLifecycle {
    config: ScdConfig,
    session: SharedSession,
    state: LifecycleState,
    clock: Rc<dyn Clock>,
    cwd: Rc<dyn WorkingDirectory>,
}

impl ExtensionLifecycle {
    pub fn new(config: ScdConfig) -> Self {
        Self {
            config,
            session: SessionState::shared(),
            state: LifecycleState::Inactive,
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

    pub fn config(&self) -> &ScdConfig {
        &self.config
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Bind `scd` and the wrapped `cd`, `pushd`, `popd` in `registry`.
    ///
    /// Fails without touching the registry when the matcher cannot be found
    /// or the host lacks one of the primitives. Activating while already
    /// active does nothing.
    pub fn activate(&mut self, registry: &mut dyn CommandRegistry) -> Result<()> {
        if self.is_active() {
            debug!(host = registry.host_name(), "smart cd already active");
            return Ok(());
        }

        let matcher = self.config.locate_matcher()?;
        let history = HistoryStore::from_config(&self.config)?;
        let resolver = ResolverBridge::new(&matcher).with_timeout(self.config.timeout());

        if self.session.borrow().originals().is_none() {
            let originals = OriginalCommands::capture(registry)?;
            self.session.borrow_mut().capture_originals_once(originals);
        }

        let interceptor = Rc::new(
            NavigationInterceptor::new(self.session.clone(), history, resolver)
                .with_clock(self.clock.clone())
                .with_working_directory(self.cwd.clone()),
        );
        for command in interceptor.commands() {
            registry.register(command);
        }

        self.session.borrow_mut().set_active(true);
        self.state = LifecycleState::Active;
        info!(
            host = registry.host_name(),
            matcher = %matcher.display(),
            log = %interceptor.history().path().display(),
            "smart cd activated"
        );
        Ok(())
    }

    /// Remove `scd` and rebind the host's original primitives.
    pub fn deactivate(&mut self, registry: &mut dyn CommandRegistry) {
        if !self.is_active() {
            return;
        }

        self.session.borrow_mut().set_active(false);
        registry.unregister(SMART_COMMAND);
        if let Some(originals) = self.session.borrow().originals() {
            originals.restore(registry);
        }
        self.state = LifecycleState::Inactive;
        info!(host = registry.host_name(), "smart cd deactivated");
    }
}
