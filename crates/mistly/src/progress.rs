//! Live progress: one line per completed step, printed to stderr while
//! the run is still going.
//!
//! On a terminal the lines go through an `indicatif` spinner so they do
//! not tear its redraws; otherwise they are plain `eprintln!`s.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use mistly_core::ProvisioningResult;

use crate::cli::GlobalOpts;
use crate::output;

/// Consume results from `rx` until every sender is dropped.
pub fn spawn(
    mut rx: mpsc::UnboundedReceiver<ProvisioningResult>,
    global: &GlobalOpts,
) -> JoinHandle<()> {
    let quiet = global.quiet;
    let on_terminal = io::stderr().is_terminal();
    let color = output::should_color(global.color, on_terminal);

    tokio::spawn(async move {
        if quiet {
            while rx.recv().await.is_some() {}
            return;
        }

        let spinner = on_terminal.then(new_spinner);
        let mut done = 0usize;

        while let Some(result) = rx.recv().await {
            done += 1;
            let line = output::progress_line(&result, color);
            match spinner {
                Some(ref pb) => {
                    pb.println(line);
                    pb.set_message(format!("{done} step(s) done"));
                }
                None => eprintln!("{line}"),
            }
        }

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }
    })
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message("provisioning");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
