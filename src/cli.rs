// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
//   markdown-link-check check ./docs --config links.yaml
//   markdown-link-check check ./docs -c links.yaml --json -vv
//
// Rust concepts:
// - Derive macros: Automatically generate the parsing code for our types
// - ArgAction::Count: a flag that counts how often it was given (-vvv = 3)
// =============================================================================

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "markdown-link-check",
    version = "0.1.0",
    about = "Validate every link inside a tree of Markdown documentation",
    long_about = "markdown-link-check renders every Markdown file under a directory and checks each link it finds: \
                  local files and their headings, web pages and their anchors, GitHub repositories, issues, \
                  pull requests and commits, and the mail servers behind mailto: addresses."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable logging
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check every link in the Markdown files under a directory
    ///
    /// Example: markdown-link-check check ./docs --config links.yaml
    Check {
        /// Root of the documentation tree
        path: PathBuf,

        /// YAML configuration file (ignore rules, headers, GitHub tokens)
        #[arg(short, long)]
        config: PathBuf,

        /// Output every checked link as JSON instead of the report
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_command() {
        let cli = Cli::parse_from(["markdown-link-check", "check", "docs", "-c", "links.yaml", "-vv"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);

        let Commands::Check { path, config, json } = cli.command;
        assert_eq!(path, PathBuf::from("docs"));
        assert_eq!(config, PathBuf::from("links.yaml"));
        assert!(!json);
    }

    #[test]
    fn test_config_is_required() {
        assert!(Cli::try_parse_from(["markdown-link-check", "check", "docs"]).is_err());
    }

    #[test]
    fn test_quiet_and_verbose_conflict() {
        let result = Cli::try_parse_from(["markdown-link-check", "check", "docs", "-c", "x", "-q", "-v"]);
        assert!(result.is_err());
    }
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why PathBuf instead of String?
//    - Paths aren't always valid UTF-8 on every platform
//    - PathBuf is the owned path type; clap can parse it directly
//
// 2. What does `global = true` do?
//    - The flag can be written before or after the subcommand:
//      `markdown-link-check -v check ...` and `... check -v` both work
//
// 3. What is u8?
//    - An unsigned 8-bit integer (0 to 255), plenty for counting -v flags
// -----------------------------------------------------------------------------
