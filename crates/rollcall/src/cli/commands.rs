//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Scan command arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Keep scanning and redraw the shift report after each record
    #[arg(short, long)]
    pub live: bool,

    /// Archive the session when scanning stops
    #[arg(short, long)]
    pub archive: bool,
}

/// Report command arguments.
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Show a saved session (1-based index or file name) instead of the shift log
    #[arg(short, long, value_name = "SESSION")]
    pub archive: Option<String>,

    /// Only show rows for this class
    #[arg(long)]
    pub class: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,

    /// Output as JSON (same as --format json)
    #[arg(short, long)]
    pub json: bool,
}

impl ReportCommand {
    /// The effective output format.
    #[must_use]
    pub fn output_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Roster commands.
#[derive(Debug, Subcommand)]
pub enum StudentCommand {
    /// Add a student, or update one with the same id
    Add {
        /// Student id (the QR payload)
        id: String,

        /// Display name
        name: String,

        /// Class (defaults to "umum")
        #[arg(long)]
        class: Option<String>,
    },

    /// Remove a student and their QR image
    Remove {
        /// Student id
        id: String,
    },

    /// List students
    List {
        /// Only list this class
        #[arg(long)]
        class: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Merge students from a JSON roster file and regenerate QR images
    Import {
        /// File to import
        file: PathBuf,
    },

    /// Regenerate QR images for every student, per class
    Qr,
}

/// Session commands.
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// List saved sessions, oldest first
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show a saved session
    Show {
        /// 1-based index from `session list`, or the archive file name
        session: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// End the current shift without archiving it (deletes the shift log)
    End {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `id - name - class - timestamp` lines
    #[default]
    Plain,
    /// Aligned table
    Table,
    /// JSON output
    Json,
}
