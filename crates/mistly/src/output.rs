//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders run summaries in the format selected by `--output`. Table uses
//! `tabled`, structured formats use serde, plain emits one tab-separated
//! line per result.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use mistly_core::{Outcome, OutcomeCounts, ProvisioningResult, RunMode, RunSummary};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled on `stream`.
pub fn should_color(mode: ColorMode, stream_is_terminal: bool) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => stream_is_terminal && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Outcome label, colored by severity when `color` is set.
pub fn outcome_label(outcome: &Outcome, color: bool) -> String {
    let label = outcome.to_string();
    if !color {
        return label;
    }
    match outcome {
        Outcome::Created => label.green().to_string(),
        Outcome::AlreadyExisted => label.dimmed().to_string(),
        Outcome::Configured => label.cyan().to_string(),
        Outcome::WouldCreate => label.yellow().to_string(),
        Outcome::Failed { .. } => label.red().bold().to_string(),
    }
}

/// One progress line for a completed step.
pub fn progress_line(result: &ProvisioningResult, color: bool) -> String {
    // Pad outside the label; escape codes would throw the width off.
    let width = result.outcome.to_string().len();
    let mut line = format!(
        "{}{} {:<18} {}",
        outcome_label(&result.outcome, color),
        " ".repeat(12usize.saturating_sub(width)),
        result.kind.to_string(),
        result.key
    );
    if let Some(ref id) = result.remote_id {
        let _ = write!(line, " [{id}]");
    }
    if let Outcome::Failed { ref reason } = result.outcome {
        let _ = write!(line, ": {reason}");
    }
    line
}

// ── Summary rendering ────────────────────────────────────────────────

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Detail")]
    detail: String,
}

impl ResultRow {
    fn new(result: &ProvisioningResult, color: bool) -> Self {
        Self {
            kind: result.kind.to_string(),
            key: result.key.clone(),
            id: result
                .remote_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            action: outcome_label(&result.outcome, color),
            detail: match result.outcome {
                Outcome::Failed { ref reason } => reason.clone(),
                _ => String::new(),
            },
        }
    }
}

/// Structured form: the summary plus its tally.
#[derive(Serialize)]
struct SummaryView<'a> {
    #[serde(flatten)]
    summary: &'a RunSummary,
    counts: OutcomeCounts,
    success: bool,
}

/// Render a run summary in the chosen format.
pub fn render_summary(
    format: OutputFormat,
    summary: &RunSummary,
    color: bool,
) -> Result<String, CliError> {
    let view = SummaryView {
        summary,
        counts: summary.counts(),
        success: summary.is_success(),
    };

    Ok(match format {
        OutputFormat::Table => render_table(summary, color),
        OutputFormat::Json => serde_json::to_string_pretty(&view)?,
        OutputFormat::JsonCompact => serde_json::to_string(&view)?,
        OutputFormat::Yaml => serde_yaml::to_string(&view)?,
        OutputFormat::Plain => summary
            .results
            .iter()
            .map(|r| {
                let id = r.remote_id.as_ref().map(ToString::to_string).unwrap_or_default();
                format!("{}\t{}\t{}\t{id}", r.kind, r.key, r.outcome)
            })
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

fn render_table(summary: &RunSummary, color: bool) -> String {
    let rows: Vec<ResultRow> = summary
        .results
        .iter()
        .map(|r| ResultRow::new(r, color))
        .collect();

    let mut out = Table::new(rows).with(Style::rounded()).to_string();
    out.push('\n');
    out.push_str(&tally_line(summary));
    if let Some(ref halt) = summary.halted {
        out.push('\n');
        let line = format!("halted: {}", halt.reason);
        if color {
            out.push_str(&line.red().to_string());
        } else {
            out.push_str(&line);
        }
    }
    out
}

/// e.g. `Lab-A: 6 created, 0 existed, 2 configured, 0 failed (1s 204ms)`
fn tally_line(summary: &RunSummary) -> String {
    let c = summary.counts();
    let elapsed = Duration::from_millis(
        u64::try_from(summary.duration().num_milliseconds()).unwrap_or_default(),
    );
    let elapsed = humantime::format_duration(elapsed);

    match summary.mode {
        RunMode::Provision => format!(
            "{}: {} created, {} existed, {} configured, {} failed ({elapsed})",
            summary.site, c.created, c.already_existed, c.configured, c.failed
        ),
        RunMode::Plan => format!(
            "{}: {} to create, {} existing, {} failed lookups ({elapsed})",
            summary.site, c.would_create, c.already_existed, c.failed
        ),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Whether stdout is attached to a terminal.
pub fn stdout_is_terminal() -> bool {
    io::stdout().is_terminal()
}
