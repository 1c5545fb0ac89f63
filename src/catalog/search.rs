//! Text search commands: search, files, fn, todos, imports

use regex::Regex;

use super::{FILE_LIMIT, MATCH_LIMIT, check, rg_entry};
use crate::engine::{Context, Entry, Plan};
use crate::error::ReconError;
use crate::invoke::Tool;
use crate::pattern::{
    GlobRule, QueryFilter, RgQuery, validate_glob, validate_identifier, validate_package_name,
};

/// Options shared by `search` queries
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub ignore_case: bool,
    pub fixed_strings: bool,
}

pub fn search(
    pattern: &str,
    filter: QueryFilter,
    options: SearchOptions,
) -> Result<Plan, ReconError> {
    let matches = RgQuery::lines(pattern)
        .filter(filter.clone())
        .ignore_case(options.ignore_case)
        .fixed_strings(options.fixed_strings);
    let files = RgQuery::files_with_matches(pattern)
        .filter(filter.clone())
        .ignore_case(options.ignore_case)
        .fixed_strings(options.fixed_strings);
    check(&matches)?;

    Ok(Plan::new("search")
        .query(pattern)
        .filters(filter.describe())
        .requires(Tool::Rg)
        .entry(rg_entry("Matches", MATCH_LIMIT, matches))
        .entry(rg_entry("Files", FILE_LIMIT, files)))
}

/// List files; positional globs are includes, `!glob` excludes
pub fn files(globs: &[String], mut filter: QueryFilter) -> Result<Plan, ReconError> {
    filter.extra_globs.extend(globs.iter().map(|raw| GlobRule::parse(raw)));
    let query = RgQuery::files().filter(filter.clone());
    check(&query)?;

    let mut plan = Plan::new("files")
        .filters(filter.describe())
        .requires(Tool::Rg)
        .entry(rg_entry("Files", FILE_LIMIT, query));
    if !globs.is_empty() {
        plan = plan.query(globs.join(" "));
    }
    Ok(plan)
}

/// Regex matching common definition forms of `name` in JS/TS, Svelte,
/// Rust, Python and Go
fn definition_pattern(name: &str) -> String {
    let n = regex::escape(name);
    [
        format!(r"function\*?\s+{n}\b"),
        format!(r"\b(const|let|var)\s+{n}\s*=\s*(async\s+)?(function\b|\([^)]*\)\s*=>|[A-Za-z_$][\w$]*\s*=>)"),
        format!(r"^\s*(export\s+)?(async\s+)?{n}\s*\([^)]*\)\s*\{{"),
        format!(r"\bfn\s+{n}\b"),
        format!(r"\bdef\s+{n}\b"),
        format!(r"\bfunc\s+(\([^)]*\)\s*)?{n}\b"),
    ]
    .join("|")
}

pub fn function(name: &str, filter: QueryFilter) -> Result<Plan, ReconError> {
    validate_identifier(name)?;
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        return Err(ReconError::validation(name, "not a function name"));
    }

    let defs_pattern = definition_pattern(name);
    let definitions = RgQuery::lines(&defs_pattern).filter(filter.clone());
    let calls =
        RgQuery::lines(format!(r"\b{}\s*\(", regex::escape(name))).filter(filter.clone());
    check(&definitions)?;

    let is_definition = Regex::new(&defs_pattern)
        .map_err(|e| ReconError::Internal(format!("definition pattern: {e}")))?;

    let call_sites = Entry::new("Call sites", MATCH_LIMIT, move |ctx: Context| {
        let calls = calls.clone();
        let is_definition = is_definition.clone();
        async move {
            let matches = ctx.rg_matches(&calls).await?;
            Ok(matches
                .iter()
                .filter(|m| !is_definition.is_match(&m.text))
                .map(|m| m.to_string())
                .collect())
        }
    });

    Ok(Plan::new("fn")
        .query(name)
        .filters(filter.describe())
        .requires(Tool::Rg)
        .entry(rg_entry("Definitions", MATCH_LIMIT, definitions))
        .entry(call_sites))
}

pub fn todos(filter: QueryFilter) -> Result<Plan, ReconError> {
    let query = RgQuery::lines(r"\b(TODO|FIXME|HACK|XXX)\b").filter(filter.clone());
    check(&query)?;

    Ok(Plan::new("todos")
        .filters(filter.describe())
        .requires(Tool::Rg)
        .entry(rg_entry("TODO markers", MATCH_LIMIT, query)))
}

/// Regex matching ES imports, re-exports, dynamic imports and `require`
/// of `package` or any of its subpaths
fn import_pattern(package: &str) -> String {
    let p = regex::escape(package);
    let quoted = format!(r#"['"]{p}(/[^'"]*)?['"]"#);
    [
        format!(r"\bfrom\s+{quoted}"),
        format!(r"\bimport\s+{quoted}"),
        format!(r"\bimport\s*\(\s*{quoted}"),
        format!(r"\brequire\s*\(\s*{quoted}"),
    ]
    .join("|")
}

pub fn imports(package: &str, filter: QueryFilter) -> Result<Plan, ReconError> {
    validate_package_name(package)?;

    let usages = RgQuery::lines(import_pattern(package)).filter(filter.clone());

    // Installed copies live under node_modules, which the defaults exclude
    // and .gitignore usually hides
    let manifest = format!("**/node_modules/{package}/package.json");
    validate_glob(&manifest)?;
    let installed = RgQuery::files().no_ignore(true).filter(
        QueryFilter::new()
            .without_default_excludes()
            .include(manifest)
            .exclude("**/.git/**"),
    );
    check(&usages)?;
    check(&installed)?;

    Ok(Plan::new("imports")
        .query(package)
        .filters(filter.describe())
        .requires(Tool::Rg)
        .entry(rg_entry("Imports", MATCH_LIMIT, usages))
        .entry(rg_entry("Installed", FILE_LIMIT, installed)))
}
