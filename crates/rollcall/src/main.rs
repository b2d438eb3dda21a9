//! `rollcall` - CLI for the classroom attendance recorder
//!
//! This binary wires configuration, logging, operator login and the platform
//! audio cue around the `rollcall` library, then runs either the interactive
//! menu or one scripted command.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::warn;

use rollcall::cli::{
    Cli, Command, ConfigCommand, OutputFormat, ReportCommand, ScanCommand, SessionCommand,
    StudentCommand,
};
use rollcall::menu::Menu;
use rollcall::report::{self, DisplayRow};
use rollcall::{
    init_logging, AudioCue, Config, CredentialStore, LineSource, QrStatus, SaveOutcome,
    ScanMode, Scanner, SilentCue, Station, Student,
};

// Platform-specific imports using conditional compilation
#[cfg(target_os = "linux")]
use rollcall_linux as platform;

#[cfg(target_os = "macos")]
use rollcall_mac as platform;

/// Plays the configured WAV file through the platform player.
#[derive(Debug)]
struct PlatformCue {
    path: PathBuf,
}

impl AudioCue for PlatformCue {
    fn play(&self) {
        if let Err(err) = platform::play_sound(&self.path) {
            warn!("Audio cue failed: {}", err);
        }
    }
}

fn audio_cue(config: &Config) -> Box<dyn AudioCue> {
    match config.sound_path() {
        Some(path) => Box::new(PlatformCue { path }),
        None => Box::new(SilentCue),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    if let Command::Config(config_cmd) = cli.command_or_menu() {
        return handle_config(&config, config_cmd);
    }

    platform::init().map_err(|e| anyhow!("{} platform init failed: {e}", platform::platform_name()))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();

    if cli.requires_login() {
        let credentials = CredentialStore::load(config.credentials_path())
            .context("loading operator credentials")?;
        credentials.login(cli.user.as_deref(), &mut input, &mut output)?;
        writeln!(output, "Login successful.")?;
    }

    let cue = audio_cue(&config);
    let mut station = Station::open(config, cue).context("opening attendance station")?;

    match cli.command_or_menu() {
        Command::Menu => {
            let clear = io::stdout().is_terminal();
            Menu::new(&mut station, input, output)
                .clear_screen(clear)
                .run()?;
            Ok(())
        }
        Command::Scan(scan_cmd) => handle_scan(&mut station, scan_cmd, &mut input, &mut output),
        Command::Report(report_cmd) => handle_report(&station, report_cmd, &mut output),
        Command::Student(student_cmd) => handle_student(&mut station, student_cmd, &mut output),
        Command::Session(session_cmd) => handle_session(&mut station, session_cmd, &mut output),
        Command::Config(_) => Ok(()),
    }
}

fn handle_scan<R: BufRead, W: Write>(
    station: &mut Station,
    cmd: &ScanCommand,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    let mode = if cmd.live {
        ScanMode::Live
    } else {
        ScanMode::Single
    };
    let mut scanner = Scanner::new(mode, station.config().repeat_window())
        .clear_screen(cmd.live && io::stdout().is_terminal());
    let mut source = LineSource::new(input);
    let summary = scanner.run(station, &mut source, output)?;
    writeln!(
        output,
        "{} recorded, {} blocked by cooldown, {} failed.",
        summary.recorded, summary.blocked, summary.failed
    )?;

    if cmd.archive {
        match station
            .save_session(rollcall::record::now_local())
            .context("archiving session")?
        {
            SaveOutcome::Saved(archive) => {
                writeln!(output, "Session saved to {}", archive.path.display())?;
            }
            SaveOutcome::NoOp => writeln!(output, "No attendance in this session to save.")?,
        }
    }
    Ok(())
}

fn handle_report<W: Write>(station: &Station, cmd: &ReportCommand, output: &mut W) -> Result<()> {
    let rows = match &cmd.archive {
        Some(selector) => {
            let (archive, rows) = station.archive_report(selector)?;
            if cmd.output_format() != OutputFormat::Json {
                writeln!(output, "=== REPORT: {} ===", archive.name())?;
            }
            rows
        }
        None => station.shift_report().context("reading shift log")?,
    };
    let rows = match &cmd.class {
        Some(class) => report::filter_class(rows, class),
        None => rows,
    };
    print_rows(&rows, cmd.output_format(), output)
}

fn print_rows<W: Write>(rows: &[DisplayRow], format: OutputFormat, output: &mut W) -> Result<()> {
    match format {
        OutputFormat::Json => writeln!(output, "{}", report::to_json(rows)?)?,
        _ if rows.is_empty() => writeln!(output, "No attendance recorded yet.")?,
        OutputFormat::Plain => write!(output, "{}", report::format_lines(rows))?,
        OutputFormat::Table => write!(output, "{}", report::format_table(rows))?,
    }
    Ok(())
}

fn handle_student<W: Write>(
    station: &mut Station,
    cmd: &StudentCommand,
    output: &mut W,
) -> Result<()> {
    match cmd {
        StudentCommand::Add { id, name, class } => {
            let student = Student::new(id.as_str(), name.as_str(), class.clone().unwrap_or_default());
            let (previous, status) = station.add_student(student)?;
            writeln!(
                output,
                "{} student {id}.",
                if previous.is_some() { "Updated" } else { "Added" }
            )?;
            match status {
                QrStatus::Written(path) => writeln!(output, "QR code saved to {}", path.display())?,
                QrStatus::Failed(err) => writeln!(output, "QR code not generated: {err}")?,
                QrStatus::Disabled => {}
            }
        }
        StudentCommand::Remove { id } => match station.remove_student(id)? {
            Some(student) => writeln!(output, "Removed {} ({}).", student.name, student.id)?,
            None => return Err(anyhow!("student id '{id}' not found")),
        },
        StudentCommand::List { class, json } => {
            let students: Vec<&Student> = station
                .roster()
                .iter()
                .filter(|s| class.as_ref().map_or(true, |c| &s.class_name == c))
                .collect();
            if *json {
                let listing: Vec<_> = students
                    .iter()
                    .map(|s| serde_json::json!({"id": s.id, "name": s.name, "class": s.class_name}))
                    .collect();
                writeln!(output, "{}", serde_json::to_string_pretty(&listing)?)?;
            } else if students.is_empty() {
                writeln!(output, "No students.")?;
            } else {
                for s in students {
                    writeln!(output, "{} - {} - {}", s.id, s.name, s.class_name)?;
                }
            }
        }
        StudentCommand::Import { file } => {
            let (count, summary) = station
                .import_students(file)
                .with_context(|| format!("importing {}", file.display()))?;
            writeln!(output, "Imported {count} students.")?;
            if let Some(summary) = summary {
                writeln!(
                    output,
                    "{} QR codes written, {} failed.",
                    summary.written,
                    summary.failed.len()
                )?;
            }
        }
        StudentCommand::Qr => match station.generate_qr_images() {
            Some(summary) => {
                writeln!(output, "{} QR codes written.", summary.written)?;
                for (id, err) in &summary.failed {
                    writeln!(output, "  {id}: {err}")?;
                }
            }
            None => writeln!(output, "QR generation is disabled (qr.enabled = false).")?,
        },
    }
    Ok(())
}

fn handle_session<W: Write>(
    station: &mut Station,
    cmd: &SessionCommand,
    output: &mut W,
) -> Result<()> {
    match cmd {
        SessionCommand::List { json } => {
            let archives = station.list_archives()?;
            if *json {
                let listing: Vec<_> = archives
                    .iter()
                    .enumerate()
                    .map(|(i, a)| {
                        serde_json::json!({
                            "index": i + 1,
                            "name": a.name(),
                            "saved_at": rollcall::record::format_timestamp(&a.saved_at),
                            "path": a.path,
                        })
                    })
                    .collect();
                writeln!(output, "{}", serde_json::to_string_pretty(&listing)?)?;
            } else if archives.is_empty() {
                writeln!(output, "No saved sessions yet.")?;
            } else {
                for (i, archive) in archives.iter().enumerate() {
                    writeln!(output, "{}. {}", i + 1, archive.name())?;
                }
            }
        }
        SessionCommand::Show { session, json } => {
            let (archive, rows) = station.archive_report(session)?;
            if *json {
                print_rows(&rows, OutputFormat::Json, output)?;
            } else {
                writeln!(output, "=== REPORT: {} ===", archive.name())?;
                print_rows(&rows, OutputFormat::Plain, output)?;
            }
        }
        SessionCommand::End { yes } => {
            if *yes {
                station.end_shift().context("ending shift")?;
                writeln!(output, "Shift log cleared.")?;
            } else {
                writeln!(output, "This deletes the current shift log without archiving it.")?;
                writeln!(output, "Use --yes to confirm.")?;
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Data dir:           {}", config.data_dir().display());
                println!("  Roster:             {}", config.roster_path().display());
                println!("  Shift log:          {}", config.shift_log_path().display());
                println!("  Credentials:        {}", config.credentials_path().display());
                println!("  QR images:          {}", config.qr_dir().display());
                println!();
                println!("[Attendance]");
                println!("  Cooldown (secs):    {}", config.attendance.cooldown_secs);
                println!("  On log error:       {}", config.attendance.on_log_error);
                println!();
                println!("[Scan]");
                println!("  Repeat window:      {}", config.scan.repeat_window_secs);
                match config.sound_path() {
                    Some(path) => println!("  Sound:              {}", path.display()),
                    None => println!("  Sound:              off"),
                }
                println!();
                println!("[Session]");
                println!("  Archive on exit:    {}", config.session.archive_on_exit);
                println!();
                println!("[QR]");
                println!("  Enabled:            {}", config.qr.enabled);
                println!("  Program:            {}", config.qr.program);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.clone().unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
