//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// canopy content-graph builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Config file name (default: canopy.toml)
    #[arg(short = 'C', long, default_value = "canopy.toml")]
    pub config: PathBuf,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the content graph and write every output
    Build {
        /// Clean output directory completely before building
        #[arg(long)]
        clean: bool,
    },

    /// Build the content graph only and print a summary
    Check,
}

impl Cli {
    pub const fn is_check(&self) -> bool {
        matches!(self.command, Commands::Check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build_with_globals() {
        let cli = Cli::parse_from(["canopy", "-r", "site", "-o", "dist", "--quiet", "build", "--clean"]);
        assert_eq!(cli.root, Some(PathBuf::from("site")));
        assert_eq!(cli.output, Some(PathBuf::from("dist")));
        assert_eq!(cli.config, PathBuf::from("canopy.toml"));
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::Build { clean: true }));
        assert!(!cli.is_check());
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::parse_from(["canopy", "-C", "other.toml", "check"]);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert!(cli.is_check());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["canopy", "--quiet"]).is_err());
    }
}
