//! Per-file audits: orphans
//!
//! `orphans` lists candidate source files, then searches the tree once per
//! file for its name. The per-file searches go through `bounded_map` so a
//! large tree never has more than `FANOUT_POOL` ripgrep processes alive.

use std::path::Path;

use super::{AUDIT_LIMIT, check};
use crate::engine::{Context, Entry, Plan};
use crate::error::ReconError;
use crate::invoke::Tool;
use crate::pattern::{QueryFilter, RgQuery};
use crate::task_group::{FANOUT_POOL, bounded_map};

/// Types audited when the user names none
const DEFAULT_TYPES: &[&str] = &["ts", "js", "svelte"];

/// Entry points and tooling files that are referenced by convention, not by name
const ENTRY_POINTS: &[&str] = &[
    "**/src/routes/**",
    "**/*.d.ts",
    "**/*.config.*",
    "**/*.test.*",
    "**/*.spec.*",
    "**/hooks.*",
    "**/app.html",
    "**/service-worker.*",
];

/// Name other files would use to refer to `file`
///
/// `lib/Button.svelte` is `Button`; `lib/auth/index.ts` is `auth`.
pub fn reference_name(file: &str) -> Option<String> {
    let path = Path::new(file);
    let stem = path.file_stem()?.to_str()?;
    if stem == "index" {
        return path
            .parent()?
            .file_name()?
            .to_str()
            .map(str::to_string);
    }
    Some(stem.to_string())
}

fn with_default_types(filter: QueryFilter) -> QueryFilter {
    if !filter.type_names.is_empty() {
        return filter;
    }
    DEFAULT_TYPES.iter().fold(filter, |f, t| f.with_type(*t))
}

/// Whether any file other than `file` mentions its name
async fn is_referenced(
    ctx: Context,
    file: String,
    filter: QueryFilter,
) -> Result<Option<String>, ReconError> {
    let Some(name) = reference_name(&file) else {
        return Ok(None);
    };
    let query = RgQuery::files_with_matches(name)
        .fixed_strings(true)
        .filter(filter);
    let hits = ctx.rg(&query).await?;

    if hits.iter().any(|hit| hit != &file) {
        Ok(None)
    } else {
        Ok(Some(file))
    }
}

pub fn orphans(filter: QueryFilter) -> Result<Plan, ReconError> {
    let filter = with_default_types(filter);

    let candidates = ENTRY_POINTS
        .iter()
        .fold(filter.clone(), |f, glob| f.exclude(*glob));
    let candidates = RgQuery::files().filter(candidates);
    // References are searched everywhere, including entry points
    let references = filter.clone();

    check(&candidates)?;
    check(&RgQuery::files_with_matches("placeholder").filter(references.clone()))?;

    let entry = Entry::new("Unreferenced files", AUDIT_LIMIT, move |ctx: Context| {
        let candidates = candidates.clone();
        let references = references.clone();
        async move {
            let files = ctx.rg(&candidates).await?;
            log::debug!("orphans: checking {} candidate files", files.len());

            let parent = ctx.cancel.clone();
            let results = bounded_map(files, FANOUT_POOL, &parent, |file, token| {
                is_referenced(ctx.with_cancel(token), file, references.clone())
            })
            .await?;

            Ok(results.into_iter().flatten().collect())
        }
    });

    Ok(Plan::new("orphans")
        .filters(filter.describe())
        .requires(Tool::Rg)
        .entry(entry))
}
