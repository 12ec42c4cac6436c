//! `mistly provision`: apply a desired-state file.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use mistly_core::{DesiredState, HaltCause, RunMode, RunSummary, WorkflowContext};

use crate::cli::{GlobalOpts, ProvisionArgs};
use crate::error::CliError;
use crate::{config, document, output, progress};

pub async fn handle(args: ProvisionArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let state = document::load(&args.file)?;
    let summary = execute(RunMode::Provision, &state, global, args.deadline).await?;
    report(&summary, global)
}

// ── Shared run plumbing (provision + plan) ──────────────────────────

/// Cancellation sources for one run: Ctrl-C and an optional deadline.
struct Interrupts {
    cancel: CancellationToken,
    deadline_hit: CancellationToken,
    deadline: Option<Duration>,
    tasks: Vec<JoinHandle<()>>,
}

impl Interrupts {
    fn install(deadline: Option<Duration>) -> Self {
        let cancel = CancellationToken::new();
        let deadline_hit = CancellationToken::new();
        let mut tasks = Vec::new();

        let on_ctrl_c = cancel.clone();
        tasks.push(tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current call");
                on_ctrl_c.cancel();
            }
        }));

        if let Some(limit) = deadline {
            let on_deadline = cancel.clone();
            let hit = deadline_hit.clone();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                warn!(deadline = %humantime::format_duration(limit), "deadline reached, cancelling run");
                hit.cancel();
                on_deadline.cancel();
            }));
        }

        Self {
            cancel,
            deadline_hit,
            deadline,
            tasks,
        }
    }

    /// The error to report for a run that was cut short.
    fn cancelled_error(&self) -> CliError {
        match self.deadline {
            Some(limit) if self.deadline_hit.is_cancelled() => CliError::DeadlineExceeded {
                deadline: humantime::format_duration(limit).to_string(),
            },
            _ => CliError::Interrupted,
        }
    }
}

impl Drop for Interrupts {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Open a context, run the workflow with live progress, close the context.
///
/// Returns the summary even for runs with failures; only setup failures
/// and cancellation are errors here.
pub(crate) async fn execute(
    mode: RunMode,
    state: &DesiredState,
    global: &GlobalOpts,
    deadline: Option<Duration>,
) -> Result<RunSummary, CliError> {
    let client_config = config::build_client_config(global)?;
    let interrupts = Interrupts::install(deadline);

    let ctx = match WorkflowContext::open(&client_config, interrupts.cancel.clone()).await {
        Ok(ctx) => ctx,
        Err(mistly_core::CoreError::Cancelled) => return Err(interrupts.cancelled_error()),
        Err(e) => return Err(e.into()),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let printer = progress::spawn(rx, global);
    let mut ctx = ctx.with_progress(tx);

    debug!(mode = %mode, site = %state.site.name, "starting run");
    let summary = match mode {
        RunMode::Provision => mistly_core::provision(&mut ctx, state).await,
        RunMode::Plan => mistly_core::plan(&mut ctx, state).await,
    };

    // Closing drops the progress sender, which ends the printer.
    if let Err(e) = ctx.close().await {
        warn!(error = %e, "failed to revoke ephemeral token");
    }
    if let Err(e) = printer.await {
        debug!(error = %e, "progress printer ended abnormally");
    }

    if interrupts.cancel.is_cancelled() && !summary.is_success() {
        // Still show what did happen before the interruption.
        report_only(&summary, global)?;
        return Err(interrupts.cancelled_error());
    }
    Ok(summary)
}

fn report_only(summary: &RunSummary, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color, output::stdout_is_terminal());
    let rendered = output::render_summary(global.output, summary, color)?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Print the summary and turn failures into the process outcome.
pub(crate) fn report(summary: &RunSummary, global: &GlobalOpts) -> Result<(), CliError> {
    report_only(summary, global)?;

    if let Some(ref halt) = summary.halted {
        return Err(match halt.cause {
            HaltCause::Authentication => CliError::AuthFailed {
                message: halt.reason.clone(),
            },
            HaltCause::Unreachable => CliError::ConnectionFailed {
                url: global.api_url.clone().unwrap_or_else(|| "the configured API".into()),
                reason: halt.reason.clone(),
            },
            HaltCause::Cancelled => CliError::Interrupted,
            HaltCause::Failure => CliError::RunHalted {
                reason: halt.reason.clone(),
            },
        });
    }
    match summary.counts().failed {
        0 => Ok(()),
        failed => Err(CliError::RunFailed { failed }),
    }
}
