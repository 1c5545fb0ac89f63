//! Git argument builders and output parsers
//!
//! Every builder returns an `Invocation` using git's machine-parseable
//! format strings (tab-separated fields), and every parser turns the raw
//! lines back into display lines. Nothing here spawns a process.

use std::collections::HashMap;

use crate::error::ReconError;
use crate::invoke::{Invocation, Tool};
use crate::pattern::validate_relative_path;

/// Field separator used in every `--format` string
const SEP: char = '\t';

/// Commits in the last `days` days: hash, date, author, subject
pub fn recent_commits(days: u32) -> Invocation {
    Invocation::new(Tool::Git).args([
        "log".to_string(),
        format!("--since={days}.days.ago"),
        "--date=short".to_string(),
        "--format=%h%x09%ad%x09%an%x09%s".to_string(),
        "--no-color".to_string(),
    ])
}

/// Every file touched by commits in the last `days` days, one per commit
pub fn changed_files(days: u32) -> Invocation {
    Invocation::new(Tool::Git).args([
        "log".to_string(),
        format!("--since={days}.days.ago"),
        "--name-only".to_string(),
        "--format=".to_string(),
        "--no-color".to_string(),
    ])
}

/// Local branches, most recently committed first
pub fn branches() -> Invocation {
    Invocation::new(Tool::Git).args([
        "for-each-ref",
        "--sort=-committerdate",
        "--format=%(refname:short)%09%(committerdate:relative)%09%(authorname)%09%(subject)",
        "refs/heads",
    ])
}

/// History of one file, following renames
///
/// `path` must be relative to the project root and free of `..`.
pub fn file_history(path: &str, limit: usize) -> Result<Invocation, ReconError> {
    validate_relative_path(path)?;
    Ok(Invocation::new(Tool::Git).args([
        "log".to_string(),
        "--follow".to_string(),
        format!("--max-count={limit}"),
        "--date=short".to_string(),
        "--format=%h%x09%ad%x09%an%x09%s".to_string(),
        "--no-color".to_string(),
        "--".to_string(),
        path.to_string(),
    ]))
}

/// Format `hash\tdate\tauthor\tsubject` lines as `hash date author: subject`
///
/// Lines that don't have four fields are passed through unchanged.
pub fn format_commits(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let fields: Vec<&str> = line.splitn(4, SEP).collect();
            match fields.as_slice() {
                [hash, date, author, subject] => format!("{hash} {date} {author}: {subject}"),
                _ => line.clone(),
            }
        })
        .collect()
}

/// Format `name\twhen\tauthor\tsubject` lines from `branches()`
pub fn format_branches(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            let fields: Vec<&str> = line.splitn(4, SEP).collect();
            match fields.as_slice() {
                [name, when, author, subject] => {
                    format!("{name} ({when}, {author}) {subject}")
                }
                _ => line.clone(),
            }
        })
        .collect()
}

/// Count how often each file appears and rank by count, then path
pub fn tally_churn(paths: &[String]) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for path in paths {
        let path = path.trim();
        if !path.is_empty() {
            *counts.entry(path).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(path, count)| (path.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Display lines for a churn ranking: right-aligned count, then path
pub fn format_churn(ranked: &[(String, usize)]) -> Vec<String> {
    ranked
        .iter()
        .map(|(path, count)| format!("{count:>4}  {path}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_recent_commits_args() {
        let inv = recent_commits(14);
        assert_eq!(inv.tool, Tool::Git);
        assert_eq!(inv.args[0], "log");
        assert!(inv.args.contains(&"--since=14.days.ago".to_string()));
    }

    #[test]
    fn test_file_history_validates_path() {
        let inv = file_history("src/lib/db.ts", 10).unwrap();
        assert_eq!(inv.args.last().unwrap(), "src/lib/db.ts");
        assert_eq!(inv.args[inv.args.len() - 2], "--");

        assert!(file_history("../other/repo", 10).is_err());
        assert!(file_history("/etc/passwd", 10).is_err());
    }

    #[test]
    fn test_format_commits() {
        let lines = owned(&["a1b2c3d\t2026-10-01\tAda\tfix: handle\ttabs in subject", "garbage"]);
        assert_eq!(
            format_commits(&lines),
            vec!["a1b2c3d 2026-10-01 Ada: fix: handle\ttabs in subject", "garbage"]
        );
    }

    #[test]
    fn test_format_branches() {
        let lines = owned(&["main\t2 hours ago\tAda\tMerge pull request #4"]);
        assert_eq!(
            format_branches(&lines),
            vec!["main (2 hours ago, Ada) Merge pull request #4"]
        );
    }

    #[test]
    fn test_tally_churn_ranks_by_count_then_path() {
        let paths = owned(&[
            "src/b.ts",
            "src/a.ts",
            "src/b.ts",
            "",
            "src/c.ts",
            "src/a.ts",
            "src/b.ts",
        ]);
        let ranked = tally_churn(&paths);
        assert_eq!(
            ranked,
            vec![
                ("src/b.ts".to_string(), 3),
                ("src/a.ts".to_string(), 2),
                ("src/c.ts".to_string(), 1),
            ]
        );
        assert_eq!(format_churn(&ranked)[0], "   3  src/b.ts");
    }
}
