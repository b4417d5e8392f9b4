use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use kiroku::build::build_site;
use kiroku::config::Config;
use kiroku::converter::RestConverter;
use kiroku::init::init;
use std::path::PathBuf;

/// Builds a static blog from a directory of reStructuredText articles.
#[derive(Parser)]
#[command(name = "kiroku", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site into the project's `build` directory
    Build {
        /// The project directory
        #[arg(long, default_value = ".")]
        project: PathBuf,

        /// Log every file processed
        #[arg(long)]
        verbose: bool,
    },

    /// Create a new project with sample articles and the default templates
    Init {
        path: PathBuf,

        /// Replace `path` if it exists
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Command::Build { verbose: true, .. });
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if verbose { "debug" } else { "info" }),
    )
    .init();

    match cli.command {
        Command::Build { project, .. } => {
            let config = Config::from_directory(&project)?;
            build_site(&config, &RestConverter)
                .map_err(|e| anyhow!("Building '{}': {}", project.display(), e))
        }
        Command::Init { path, force } => Ok(init(&path, force)?),
    }
}
