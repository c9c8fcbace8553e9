//! layerconf CLI: the main entry point.
//!
//! Commands:
//! - `show`: Print the merged configuration
//! - `changes`: Report what the primary file changes
//! - `set`: Assign fields and save the delta to the primary file

use clap::{Parser, Subcommand};
use layerconf::commands;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "layerconf",
    about = "Layered configuration files with default-aware merging",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Index of the file to save changes to (default: the last one)
    #[arg(short, long, global = true, value_name = "INDEX")]
    primary: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged configuration as TOML
    Show {
        /// Configuration files, lowest precedence first
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the fields the primary file changes over the others
    Changes {
        /// Configuration files, lowest precedence first
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Assign fields and save the changes to the primary file
    Set {
        /// Configuration files, lowest precedence first
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Field assignment; VALUE is JSON or a plain string
        #[arg(short, long = "field", value_name = "KEY=VALUE", required = true)]
        fields: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Show { files } => commands::show::run(&files, cli.primary, &mut stdout)?,
        Commands::Changes { files } => commands::changes::run(&files, cli.primary, &mut stdout)?,
        Commands::Set { files, fields } => {
            commands::set::run(&files, cli.primary, &fields, &mut stdout)?
        }
    }

    Ok(())
}
