//! `mistly plan`: report what `provision` would create, read-only.

use mistly_core::RunMode;

use crate::cli::{GlobalOpts, PlanArgs};
use crate::commands::provision::{execute, report};
use crate::document;
use crate::error::CliError;

pub async fn handle(args: PlanArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let state = document::load(&args.file)?;
    let summary = execute(RunMode::Plan, &state, global, None).await?;
    report(&summary, global)
}
