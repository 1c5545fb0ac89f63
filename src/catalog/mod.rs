//! Command catalog
//!
//! Every inspection command is a function returning a `Plan`: a list of
//! titled entries and the producer behind each one. Input validation happens
//! while the plan is built, so a rejected argument never reaches a
//! subprocess. Adding a command means adding a builder here, never touching
//! the engine.

pub mod audit;
pub mod cloudflare;
pub mod github;
pub mod history;
pub mod search;
pub mod sveltekit;

use crate::engine::{Context, Entry};
use crate::error::ReconError;
use crate::pattern::RgQuery;

/// Default limit for plain file listings
pub const FILE_LIMIT: usize = 30;
/// Default limit for line-match results
pub const MATCH_LIMIT: usize = 25;
/// Default limit for commit logs and code-host lists
pub const LOG_LIMIT: usize = 15;
/// Default limit for per-file audits
pub const AUDIT_LIMIT: usize = 50;

/// Name, one-line summary and section titles for `rcn commands`
pub struct CommandInfo {
    pub name: &'static str,
    pub summary: &'static str,
    pub sections: &'static [&'static str],
}

pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "search",
        summary: "Lines and files matching a pattern",
        sections: &["Matches", "Files"],
    },
    CommandInfo {
        name: "files",
        summary: "Files passing a glob or type filter",
        sections: &["Files"],
    },
    CommandInfo {
        name: "fn",
        summary: "Definitions and call sites of a function",
        sections: &["Definitions", "Call sites"],
    },
    CommandInfo {
        name: "todos",
        summary: "TODO, FIXME, HACK and XXX markers",
        sections: &["TODO markers"],
    },
    CommandInfo {
        name: "imports",
        summary: "Where a package is imported and which copies are installed",
        sections: &["Imports", "Installed"],
    },
    CommandInfo {
        name: "routes",
        summary: "SvelteKit pages, endpoints and layouts",
        sections: &["Pages", "Endpoints", "Layouts"],
    },
    CommandInfo {
        name: "stores",
        summary: "Svelte store definitions and subscriptions",
        sections: &["Store definitions", "Store subscriptions"],
    },
    CommandInfo {
        name: "bindings",
        summary: "Cloudflare bindings declared in wrangler config and used in code",
        sections: &["Declared bindings", "Env usages"],
    },
    CommandInfo {
        name: "churn",
        summary: "Most changed files and recent commits",
        sections: &["Most changed files", "Recent commits"],
    },
    CommandInfo {
        name: "branches",
        summary: "Local branches by last commit",
        sections: &["Branches"],
    },
    CommandInfo {
        name: "history",
        summary: "Commit history of one file",
        sections: &["History"],
    },
    CommandInfo {
        name: "prs",
        summary: "Pull requests from the code host",
        sections: &["Pull requests"],
    },
    CommandInfo {
        name: "issues",
        summary: "Issues from the code host",
        sections: &["Issues"],
    },
    CommandInfo {
        name: "orphans",
        summary: "Source files no other file refers to",
        sections: &["Unreferenced files"],
    },
];

/// An entry that runs one ripgrep query and returns its lines as-is
pub(crate) fn rg_entry(title: &str, limit: usize, query: RgQuery) -> Entry {
    Entry::new(title, limit, move |ctx: Context| {
        let query = query.clone();
        async move { ctx.rg(&query).await }
    })
}

/// Validate a query without running it
pub(crate) fn check(query: &RgQuery) -> Result<(), ReconError> {
    query.to_args(&[]).map(|_| ())
}
