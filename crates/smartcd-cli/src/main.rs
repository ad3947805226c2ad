mod cmd_history;
mod cmd_record;
mod cmd_resolve;
mod cmd_shell;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use smartcd::{LogFormat, ScdConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scdsh")]
#[command(about = "Change directories by pattern, ranked by your visit history")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    options: GlobalOptions,
}

/// Overrides for settings otherwise read from `SCD_*` variables.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Matcher executable [default: scd on PATH]
    #[arg(long, global = true)]
    matcher: Option<PathBuf>,

    /// History log file [default: ~/.scdhistory]
    #[arg(long, global = true)]
    histfile: Option<PathBuf>,

    /// History line format: extended or plain
    #[arg(long, global = true)]
    format: Option<LogFormat>,

    /// Stop waiting for the matcher after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

impl GlobalOptions {
    pub fn config(&self) -> Result<ScdConfig> {
        let mut config = ScdConfig::from_env()?;
        if let Some(ref matcher) = self.matcher {
            config = config.with_matcher(matcher);
        }
        if let Some(ref histfile) = self.histfile {
            config = config.with_history_file(histfile);
        }
        if let Some(format) = self.format {
            config = config.with_log_format(format);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Some(Duration::from_secs(secs)));
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the interactive navigation shell (the default)
    Shell {
        /// Start with plain cd/pushd/popd and no scd
        #[arg(long)]
        no_activate: bool,
    },
    /// Append a directory visit to the history log
    Record {
        /// Directory to record [default: current directory]
        dir: Option<PathBuf>,
    },
    /// Ask the matcher for a directory without changing to it
    Resolve {
        /// Print the decision as JSON
        #[arg(long)]
        json: bool,

        /// Patterns and options, passed to the matcher unchanged
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        query: Vec<String>,
    },
    /// List logged directory visits, oldest first
    History {
        /// Only show the most recent N visits
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Shell { no_activate: false }) {
        Commands::Shell { no_activate } => cmd_shell::run(no_activate, &cli.options),
        Commands::Record { dir } => cmd_record::run(dir, &cli.options),
        Commands::Resolve { json, query } => cmd_resolve::run(query, json, &cli.options),
        Commands::History { limit, json } => cmd_history::run(limit, json, &cli.options),
    }
}
