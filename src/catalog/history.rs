//! Version-control commands: churn, branches, history

use super::LOG_LIMIT;
use crate::engine::{Context, Entry, Plan};
use crate::error::ReconError;
use crate::git;
use crate::invoke::Tool;

/// Default look-back window for `churn`
pub const DEFAULT_CHURN_DAYS: u32 = 30;

/// Commits fetched for `history`; rendering truncates further
const HISTORY_DEPTH: usize = 200;

pub fn churn(days: u32) -> Result<Plan, ReconError> {
    if days == 0 {
        return Err(ReconError::validation("0", "--days must be at least 1"));
    }

    let changed = Entry::new("Most changed files", LOG_LIMIT, move |ctx: Context| async move {
        let paths = ctx.lines(&git::changed_files(days)).await?;
        Ok(git::format_churn(&git::tally_churn(&paths)))
    });
    let commits = Entry::new("Recent commits", LOG_LIMIT, move |ctx: Context| async move {
        let lines = ctx.lines(&git::recent_commits(days)).await?;
        Ok(git::format_commits(&lines))
    });

    Ok(Plan::new("churn")
        .query(format!("{days} days"))
        .requires(Tool::Git)
        .entry(changed)
        .entry(commits))
}

pub fn branches() -> Result<Plan, ReconError> {
    let branches = Entry::new("Branches", LOG_LIMIT, |ctx: Context| async move {
        let lines = ctx.lines(&git::branches()).await?;
        Ok(git::format_branches(&lines))
    });

    Ok(Plan::new("branches").requires(Tool::Git).entry(branches))
}

pub fn history(path: &str) -> Result<Plan, ReconError> {
    let invocation = git::file_history(path, HISTORY_DEPTH)?;

    let history = Entry::new("History", LOG_LIMIT, move |ctx: Context| {
        let invocation = invocation.clone();
        async move {
            let lines = ctx.lines(&invocation).await?;
            Ok(git::format_commits(&lines))
        }
    });

    Ok(Plan::new("history")
        .query(path)
        .requires(Tool::Git)
        .entry(history))
}
