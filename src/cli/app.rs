//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::output::{Output, OutputFormat};
use super::{edit_cmd, layout_cmd, mv_cmd, status_cmd};
use crate::storage::Config;

#[derive(Parser)]
#[command(name = "sk")]
#[command(author, version, about = "Track, lay out and move the documents of a scikick report")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global `default_format`)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show what a build would execute or re-render
    Status {
        /// Only show this document and what it depends on
        document: Option<String>,
    },

    /// Show or reorder the navigation tabs
    Layout {
        /// New order as 1-based indices (`3 1 2` or `312`)
        order: Vec<String>,

        /// Reorder the entries of this tab instead of the tabs
        #[arg(long, short = 's')]
        submenu: Option<String>,
    },

    /// Move or rename files and directories, keeping the report consistent
    Mv {
        /// Sources followed by the destination
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,

        /// Move with `git mv`
        #[arg(long, short = 'g')]
        git: bool,
    },

    /// Declare documents and their dependencies
    Add {
        /// Documents to declare
        #[arg(required = true)]
        documents: Vec<String>,

        /// Files the documents depend on
        #[arg(long, short = 'd', num_args = 1..)]
        depends_on: Vec<String>,

        /// Allow a second index document
        #[arg(long)]
        force: bool,
    },

    /// Remove documents, or only some of their dependencies
    Del {
        /// Documents to remove
        #[arg(required = true)]
        documents: Vec<String>,

        /// Remove only these dependencies
        #[arg(long, short = 'd', num_args = 1..)]
        depends_on: Vec<String>,
    },
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the level
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load()
            .map(|config| config.global.default_format)
            .unwrap_or_default(),
    };
    let output = Output::new(format, cli.verbose);

    match cli.command {
        Commands::Status { document } => {
            output.verbose_ctx("status", &format!("focus: {:?}", document));
            status_cmd::run(&output, document.as_deref())?
        }
        Commands::Layout { order, submenu } => {
            output.verbose_ctx("layout", &format!("order: {:?}, submenu: {:?}", order, submenu));
            layout_cmd::run(&output, &order, submenu.as_deref())?
        }
        Commands::Mv { mut paths, git } => {
            let dest = paths.pop().unwrap_or_default();
            mv_cmd::run(&output, &paths, &dest, git)?
        }
        Commands::Add {
            documents,
            depends_on,
            force,
        } => edit_cmd::add(&output, &documents, &depends_on, force)?,
        Commands::Del {
            documents,
            depends_on,
        } => edit_cmd::del(&output, &documents, &depends_on)?,
    }

    output.verbose("Command completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn mv_needs_source_and_destination() {
        assert!(Cli::try_parse_from(["sk", "mv", "a.Rmd"]).is_err());
        let cli = Cli::try_parse_from(["sk", "mv", "a.Rmd", "b.Rmd", "code", "--git"]).unwrap();
        match cli.command {
            Commands::Mv { paths, git } => {
                assert_eq!(paths, vec!["a.Rmd", "b.Rmd", "code"]);
                assert!(git);
            }
            _ => panic!("expected mv"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sk", "status", "-v", "--format", "json"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }
}
