//! Code-host CLI (`gh`) argument builders and JSON parsers

use clap::ValueEnum;
use serde::Deserialize;
use strum::Display;

use crate::error::ReconError;
use crate::invoke::{Invocation, Tool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ItemState {
    Open,
    Closed,
    Merged,
    All,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub author: Option<Author>,
    #[serde(default)]
    pub head_ref_name: String,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub author: Option<Author>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

pub fn pr_list(state: ItemState, limit: usize) -> Invocation {
    Invocation::new(Tool::Gh).args([
        "pr".to_string(),
        "list".to_string(),
        format!("--state={state}"),
        format!("--limit={limit}"),
        "--json=number,title,author,headRefName,isDraft".to_string(),
    ])
}

/// `gh issue list` has no "merged" state; it is treated as closed
pub fn issue_list(state: ItemState, limit: usize) -> Invocation {
    let state = match state {
        ItemState::Merged => ItemState::Closed,
        other => other,
    };
    Invocation::new(Tool::Gh).args([
        "issue".to_string(),
        "list".to_string(),
        format!("--state={state}"),
        format!("--limit={limit}"),
        "--json=number,title,author,labels".to_string(),
    ])
}

fn parse<T: for<'de> Deserialize<'de>>(stdout: &str) -> Result<Vec<T>, ReconError> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(stdout).map_err(|e| ReconError::Invocation {
        tool: Tool::Gh,
        code: "invalid output".to_string(),
        message: e.to_string(),
    })
}

fn login(author: &Option<Author>) -> &str {
    author.as_ref().map(|a| a.login.as_str()).unwrap_or("ghost")
}

/// `#12 Title (@login, branch)` per pull request
pub fn format_pull_requests(stdout: &str) -> Result<Vec<String>, ReconError> {
    let prs: Vec<PullRequest> = parse(stdout)?;
    Ok(prs
        .iter()
        .map(|pr| {
            let draft = if pr.is_draft { " [draft]" } else { "" };
            format!(
                "#{} {}{} (@{}, {})",
                pr.number,
                pr.title,
                draft,
                login(&pr.author),
                pr.head_ref_name
            )
        })
        .collect())
}

/// `#34 Title (@login) [bug, ui]` per issue
pub fn format_issues(stdout: &str) -> Result<Vec<String>, ReconError> {
    let issues: Vec<Issue> = parse(stdout)?;
    Ok(issues
        .iter()
        .map(|issue| {
            let mut line = format!("#{} {} (@{})", issue.number, issue.title, login(&issue.author));
            if !issue.labels.is_empty() {
                let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
                line.push_str(&format!(" [{}]", labels.join(", ")));
            }
            line
        })
        .collect())
}
