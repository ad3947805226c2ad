use crate::GlobalOptions;
use anyhow::{Context, Result};
use smartcd::{EnvironmentSnapshot, ResolverBridge};

/// Print the matcher's decision. Exits with status 1 when there is none.
pub fn run(query: Vec<String>, json: bool, options: &GlobalOptions) -> Result<()> {
    let config = options.config()?;
    let matcher = config.locate_matcher()?;
    let bridge = ResolverBridge::new(matcher).with_timeout(config.timeout());

    // The words were already split by the calling shell; quote them back so
    // the bridge splits them the same way.
    let query = shlex::try_join(query.iter().map(String::as_str))
        .context("query contains a NUL byte")?;
    let decision = bridge.resolve(&query, &EnvironmentSnapshot::capture())?;

    if json {
        println!("{}", serde_json::to_string(&decision)?);
    } else if let Some(line) = decision.to_line() {
        println!("{}", line);
    }

    if !decision.is_navigate() {
        std::process::exit(1);
    }
    Ok(())
}
