#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod history;
pub mod interceptor;
pub mod lifecycle;
pub mod resolver;
pub mod session;
#[cfg(test)]
pub(crate) mod testing;

pub use config::{ScdConfig, find_executable};
pub use error::{HistoryError, ResolverError, Result, ScdError};
pub use history::{Clock, HistoryStore, LogFormat, LoggedVisit, SystemClock, VisitRecord};
pub use interceptor::{NavigationInterceptor, SMART_COMMAND};
pub use lifecycle::{ExtensionLifecycle, LifecycleState};
pub use resolver::{EnvironmentSnapshot, NavVerb, ResolutionDecision, ResolverBridge, SCRIPT_ENV};
pub use session::{OriginalCommands, SessionState, SharedSession};

/// Activates smart navigation in a host's command table.
///
/// This is the usual entry point: it reads the configuration from the
/// environment and binds `scd`, `cd`, `pushd` and `popd` in one call.
///
/// # Example
///
/// ```rust,no_run
/// use smartcd_host::CommandTable;
///
/// let mut table = CommandTable::new("my-repl");
/// // ... the host registers its own cd, pushd and popd here ...
///
/// let mut lifecycle = smartcd::load(&mut table)?;
/// table.dispatch("scd", "proj src")?;
///
/// lifecycle.deactivate(&mut table);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn load(registry: &mut dyn smartcd_host::CommandRegistry) -> Result<ExtensionLifecycle> {
    let mut lifecycle = ExtensionLifecycle::new(ScdConfig::from_env()?);
    lifecycle.activate(registry)?;
    Ok(lifecycle)
}
