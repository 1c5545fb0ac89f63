//! Code-host commands: prs, issues
//!
//! The code-host CLI is a convenience. Both commands are best-effort: a
//! missing `gh`, or one that isn't authenticated, degrades the Section and
//! the command still succeeds.

use super::LOG_LIMIT;
use crate::engine::{Context, Entry, Plan};
use crate::error::ReconError;
use crate::github::{self, ItemState};

/// Items requested from the code host; rendering truncates further
const FETCH_LIMIT: usize = 100;

pub fn prs(state: ItemState) -> Result<Plan, ReconError> {
    let entry = Entry::new("Pull requests", LOG_LIMIT, move |ctx: Context| async move {
        let stdout = ctx.run(&github::pr_list(state, FETCH_LIMIT)).await?.into_stdout()?;
        github::format_pull_requests(&stdout)
    });

    Ok(Plan::new("prs")
        .filters(vec![format!("state:{state}")])
        .entry(entry.best_effort()))
}

pub fn issues(state: ItemState) -> Result<Plan, ReconError> {
    let entry = Entry::new("Issues", LOG_LIMIT, move |ctx: Context| async move {
        let stdout = ctx.run(&github::issue_list(state, FETCH_LIMIT)).await?.into_stdout()?;
        github::format_issues(&stdout)
    });

    Ok(Plan::new("issues")
        .filters(vec![format!("state:{state}")])
        .entry(entry.best_effort()))
}
