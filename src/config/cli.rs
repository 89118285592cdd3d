use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "container-deploy")]
#[command(about = "Deploy services and filters to a running container, or run one locally")]
pub struct Cli {
    #[arg(long, global = true, default_value = super::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Install the configured modules into a running container
    Deploy {
        /// Target as `host#port`
        #[arg(long)]
        container: Option<String>,

        /// Only deploy the module with this class name
        #[arg(long = "class")]
        class_name: Option<String>,

        /// Print the control calls instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Prepare a run directory and start a local container
    Run {
        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        dir: Option<PathBuf>,

        /// Only run the module with this class name
        #[arg(long = "class")]
        class_name: Option<String>,
    },
}

impl Command {
    pub fn class_filter(&self) -> Option<&str> {
        match self {
            Self::Deploy { class_name, .. } | Self::Run { class_name, .. } => class_name.as_deref(),
        }
    }
}
