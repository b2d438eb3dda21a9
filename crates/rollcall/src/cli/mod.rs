//! Command-line interface for rollcall.
//!
//! This module provides the CLI structure for the `rollcall` binary. Every
//! command except `config` opens a station and requires an operator login.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, OutputFormat, ReportCommand, ScanCommand, SessionCommand, StudentCommand,
};

/// rollcall - Classroom attendance by QR code
///
/// Records one attendance event per student per cooldown window from QR
/// scans, keeps a shift log that survives restarts, and archives sessions
/// into dated CSV files.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Operator username (prompted for when omitted)
    #[arg(short, long, global = true, value_name = "NAME")]
    pub user: Option<String>,

    /// The command to execute (defaults to the interactive menu)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the interactive operator menu
    Menu,

    /// Scan QR codes from standard input
    Scan(ScanCommand),

    /// Show the current shift or a saved session
    Report(ReportCommand),

    /// Manage the student roster
    #[command(subcommand)]
    Student(StudentCommand),

    /// List, show or end sessions
    #[command(subcommand)]
    Session(SessionCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }

    /// The command to run, `menu` when none was given.
    #[must_use]
    pub fn command_or_menu(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Menu)
    }

    /// Check if the command needs an operator login.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        !matches!(self.command_or_menu(), Command::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "rollcall");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(parse(&["rollcall"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["rollcall", "-v"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["rollcall", "-vv"]).verbosity(), Verbosity::Debug);
        assert_eq!(parse(&["rollcall", "-vvv"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["rollcall", "-q"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_default_command_is_menu() {
        let cli = parse(&["rollcall"]);
        assert!(matches!(cli.command_or_menu(), Command::Menu));
        assert!(cli.requires_login());
    }

    #[test]
    fn test_config_does_not_require_login() {
        let cli = parse(&["rollcall", "config", "path"]);
        assert!(!cli.requires_login());
    }

    #[test]
    fn test_parse_scan() {
        let cli = parse(&["rollcall", "scan", "--live", "--archive"]);
        match cli.command_or_menu() {
            Command::Scan(scan) => {
                assert!(scan.live);
                assert!(scan.archive);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_report() {
        let cli = parse(&["rollcall", "report", "--archive", "2", "--class", "kelas_a", "--json"]);
        match cli.command_or_menu() {
            Command::Report(report) => {
                assert_eq!(report.archive.as_deref(), Some("2"));
                assert_eq!(report.class.as_deref(), Some("kelas_a"));
                assert!(report.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_student_add() {
        let cli = parse(&["rollcall", "student", "add", "001", "Ani", "--class", "kelas_a"]);
        match cli.command_or_menu() {
            Command::Student(StudentCommand::Add { id, name, class }) => {
                assert_eq!(id, "001");
                assert_eq!(name, "Ani");
                assert_eq!(class.as_deref(), Some("kelas_a"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_session_show() {
        let cli = parse(&["rollcall", "session", "show", "attendance-20240101_080500.csv"]);
        assert!(matches!(
            cli.command_or_menu(),
            Command::Session(SessionCommand::Show { .. })
        ));
    }

    #[test]
    fn test_parse_with_config_and_user() {
        let cli = parse(&["rollcall", "-c", "/custom/config.toml", "--user", "admin", "report"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert_eq!(cli.user.as_deref(), Some("admin"));
    }
}
