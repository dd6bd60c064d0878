//! dmxtap command-line interface.
//!
//! This binary decodes raw oversampled captures of a DMX512 line (2 MHz SPI
//! taps, one sample per bit, MSB first) and emits a deterministic JSON
//! report to a file path you provide. It is a thin wrapper over the
//! `dmxtap-core` analysis pipeline.
//!
//! Typical usage:
//! - `dmxtap capture analyse capture.spi -o report.json`
//! - `dmxtap capture analyze capture.spi --stdout`
//! - `dmxtap capture info capture.spi --json`
//!
//! Errors are reported to stderr; a non-zero exit code indicates failure to
//! read the input capture or to write the report.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "dmxtap")]
#[command(
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (commit ",
        env!("DMXTAP_BUILD_COMMIT"),
        ", built ",
        env!("DMXTAP_BUILD_DATE"),
        ")"
    )
)]
#[command(
    about = "Offline-first decoder for raw DMX512 line captures (2 MHz SPI taps).",
    long_about = None,
    after_help = "Examples:\n  dmxtap capture analyse capture.spi -o report.json\n  dmxtap capture analyze capture.spi --stdout\n  dmxtap capture info capture.spi --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on raw capture files (offline-first).
    Capture {
        #[command(subcommand)]
        command: CaptureCommands,
    },
}

#[derive(Subcommand, Debug)]
enum CaptureCommands {
    /// Decode a capture and generate a versioned JSON report.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  dmxtap capture analyse capture.spi -o report.json\n  dmxtap capture analyze capture.spi --stdout --pretty"
    )]
    Analyse {
        /// Path to a .spi or .raw capture file
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if the capture carries no DMX frames
        #[arg(long)]
        require_frames: bool,

        /// List decoded frames after analysis
        #[arg(long)]
        list_frames: bool,
    },
    /// Show capture metadata (no decoding).
    Info {
        /// Path to a .spi or .raw capture file
        input: PathBuf,

        /// Output JSON metadata to stdout
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Capture { command } => match command {
            CaptureCommands::Analyse {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                require_frames,
                list_frames,
            } => cmd_capture_analyse(
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                require_frames,
                list_frames,
            ),
            CaptureCommands::Info {
                input,
                json,
                pretty,
                compact,
            } => cmd_capture_info(input, json, pretty, compact),
        },
    };

    if let Err(err) = result {
        eprintln!("error: {}", err.message);
        if let Some(hint) = &err.hint {
            eprintln!("hint: {hint}");
        }
        return ExitCode::from(2);
    }
    ExitCode::SUCCESS
}

/// Operator-facing failure: what went wrong and, when known, what to try.
#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn bare(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: None,
        }
    }

    fn hinted(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::bare(err.to_string())
    }
}

/// JSON output shape, settled once from the `--pretty`/`--compact` flags.
#[derive(Debug, Clone, Copy)]
enum JsonLayout {
    Compact,
    Pretty,
}

impl JsonLayout {
    fn from_flags(pretty: bool, compact: bool) -> Result<Self, CliError> {
        if pretty && compact {
            return Err(CliError::hinted(
                "cannot use --pretty and --compact together",
                "choose one output format",
            ));
        }
        Ok(if pretty { Self::Pretty } else { Self::Compact })
    }

    fn render<T: Serialize>(self, value: &T) -> Result<String, CliError> {
        let rendered = match self {
            Self::Pretty => serde_json::to_string_pretty(value),
            Self::Compact => serde_json::to_string(value),
        };
        rendered.map_err(|err| CliError::bare(format!("failed to serialize JSON: {err}")))
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_capture_analyse(
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    require_frames: bool,
    list_frames: bool,
) -> Result<(), CliError> {
    let input = expand_input_pattern(&input)?;
    validate_input_file(&input)?;
    let layout = JsonLayout::from_flags(pretty, compact)?;

    let report = if stdout {
        None
    } else {
        let report = report.ok_or_else(|| {
            CliError::hinted(
                "missing report output",
                "pass --report <FILE> or use --stdout",
            )
        })?;
        check_report_target(&input, &report)?;
        Some(report)
    };

    let rep = dmxtap_core::analyze_capture_file(&input)
        .map_err(|err| CliError::bare(format!("capture analysis failed: {err}")))?;
    let json = layout.render(&rep)?;

    if let Some(report_path) = report.as_ref() {
        if let Some(parent) = report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        fs::write(report_path, &json)
            .with_context(|| format!("Failed to write report: {}", report_path.display()))?;
    } else {
        print!("{}", json);
    }

    if list_frames && !quiet {
        print_frames_summary(&rep);
    }
    if !quiet {
        if let Some(report_path) = report.as_ref() {
            eprintln!("OK: report written -> {}", report_path.display());
        }
    }
    if require_frames && frames_total(&rep) == 0 {
        return Err(CliError::hinted(
            "no DMX frames decoded",
            "check the capture, sample clock or line polarity",
        ));
    }
    Ok(())
}

fn cmd_capture_info(
    input: PathBuf,
    json: bool,
    pretty: bool,
    compact: bool,
) -> Result<(), CliError> {
    let input = expand_input_pattern(&input)?;
    validate_input_file(&input)?;
    let meta = fs::metadata(&input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;

    let info = CaptureInfo::collect(&input, meta.len());
    if json || pretty || compact {
        let layout = JsonLayout::from_flags(pretty, compact)?;
        print!("{}", layout.render(&info)?);
        return Ok(());
    }

    println!("file: {}", info.path);
    println!("bytes: {}", info.size_bytes);
    println!("samples: {}", info.samples);
    println!("sample_rate_hz: {}", info.sample_rate_hz);
    println!("duration_s: {}", info.duration_s);
    Ok(())
}

#[derive(Debug, Serialize)]
struct CaptureInfo {
    path: String,
    size_bytes: u64,
    samples: u64,
    sample_rate_hz: u32,
    duration_s: f64,
}

impl CaptureInfo {
    fn collect(input: &Path, size_bytes: u64) -> Self {
        let samples = size_bytes * 8;
        Self {
            path: input.display().to_string(),
            size_bytes,
            samples,
            sample_rate_hz: dmxtap_core::timing::SAMPLE_RATE_HZ,
            duration_s: samples as f64 / f64::from(dmxtap_core::timing::SAMPLE_RATE_HZ),
        }
    }
}

fn frames_total(rep: &dmxtap_core::Report) -> u64 {
    rep.capture_summary
        .as_ref()
        .map(|summary| summary.frames_total)
        .unwrap_or(0)
}

fn print_frames_summary(rep: &dmxtap_core::Report) {
    eprintln!("Decoded frames:");
    for frame in &rep.frames {
        eprintln!(
            "  #{} nonzero_slots={} peak_level={}",
            frame.index, frame.nonzero_slots, frame.peak_level
        );
    }
}

/// Refuses to overwrite the capture with its own report.
fn check_report_target(input: &Path, report: &Path) -> Result<(), CliError> {
    let input_abs = fs::canonicalize(input)
        .with_context(|| format!("Failed to resolve input path: {}", input.display()))?;

    let report_dir = match report.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent).ok(),
        _ => fs::canonicalize(".").ok(),
    };
    if let (Some(report_dir), Some(file_name)) = (report_dir, report.file_name()) {
        if report_dir.join(file_name) == input_abs {
            return Err(CliError::hinted(
                format!("report path must differ from input: {}", report.display()),
                "choose a different output path",
            ));
        }
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::hinted(
            format!("input file not found: {}", input.display()),
            "use a .spi or .raw capture file",
        ));
    }
    let meta = fs::metadata(input)
        .with_context(|| format!("Failed to read input file: {}", input.display()))?;
    if !meta.is_file() {
        return Err(CliError::hinted(
            format!("input is not a file: {}", input.display()),
            "use a .spi or .raw capture file",
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "spi" && ext != "raw" {
        return Err(CliError::hinted(
            format!("unsupported input format '{}'", input.display()),
            "expected a .spi or .raw capture file",
        ));
    }
    Ok(())
}

/// Expands a shell-style pattern to exactly one capture file.
///
/// Plain paths pass through untouched. A pattern must match a single
/// regular file; zero or several matches are errors, and the first few
/// matches are listed so the operator can see what the pattern caught.
fn expand_input_pattern(input: &Path) -> Result<PathBuf, CliError> {
    let raw = input.to_string_lossy();
    if !raw.contains(['*', '?', '[']) {
        return Ok(input.to_path_buf());
    }

    let bad_pattern = |detail: String| {
        CliError::hinted(
            format!("invalid input pattern '{raw}'"),
            format!("pattern error: {detail}"),
        )
    };
    let entries = glob(&raw).map_err(|err| bad_pattern(err.msg.to_string()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| bad_pattern(err.to_string()))?;
        if path.is_file() {
            files.push(path);
        }
    }

    match files.len() {
        0 => Err(CliError::hinted(
            format!("no files match pattern '{raw}'"),
            "check the path or quote the pattern; expected .spi or .raw",
        )),
        1 => Ok(files.remove(0)),
        count => {
            let mut shown: Vec<String> = files
                .iter()
                .take(3)
                .map(|path| path.display().to_string())
                .collect();
            if count > 3 {
                shown.push("...".to_string());
            }
            Err(CliError::hinted(
                format!(
                    "pattern '{raw}' matches {count} files: {}",
                    shown.join(", ")
                ),
                "pass a single capture file, or run once per file",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::cmd_capture_analyse;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn missing_report_output_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let input = temp.path().join("capture.spi");
        std::fs::write(&input, []).expect("write capture");

        let err = cmd_capture_analyse(
            PathBuf::from(&input),
            None,
            false,
            false,
            false,
            true,
            false,
            false,
        )
        .expect_err("missing report should error");

        assert_eq!(err.message, "missing report output");
        assert_eq!(
            err.hint.as_deref(),
            Some("pass --report <FILE> or use --stdout")
        );
    }

    #[test]
    fn conflicting_json_flags_are_rejected() {
        let err = super::JsonLayout::from_flags(true, true).expect_err("conflict");
        assert_eq!(err.message, "cannot use --pretty and --compact together");
    }
}
