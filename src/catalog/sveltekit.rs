//! SvelteKit project commands: routes, stores

use super::{FILE_LIMIT, MATCH_LIMIT, check, rg_entry};
use crate::engine::{Context, Entry, Plan};
use crate::error::ReconError;
use crate::invoke::Tool;
use crate::pattern::{QueryFilter, RgQuery};

/// Directory holding filesystem routes
const ROUTES_DIR: &str = "src/routes";

/// Svelte 5 runes; `$name` tokens that are not store subscriptions
const RUNES: &[&str] = &[
    "$state",
    "$derived",
    "$effect",
    "$props",
    "$bindable",
    "$inspect",
    "$host",
];

/// SvelteKit module aliases; `$lib/db` in an import is not a store
const MODULE_ALIASES: &[&str] = &["$lib", "$app", "$env", "$service-worker"];

/// URL path for a route file: `src/routes/blog/[slug]/+page.svelte` is
/// `/blog/[slug]`; `(group)` segments don't appear in the URL
pub fn route_path(file: &str) -> String {
    let Some(start) = file.find(ROUTES_DIR) else {
        return file.to_string();
    };
    let rest = &file[start + ROUTES_DIR.len()..];

    let segments: Vec<&str> = rest
        .split('/')
        .filter(|s| !s.is_empty())
        .filter(|s| !s.starts_with('+'))
        .filter(|s| !(s.starts_with('(') && s.ends_with(')')))
        .collect();

    format!("/{}", segments.join("/"))
}

fn route_entry(title: &str, file_glob: &str) -> Result<Entry, ReconError> {
    let glob = format!("**/{ROUTES_DIR}/**/{file_glob}");
    let query = RgQuery::files().filter(QueryFilter::new().include(glob));
    check(&query)?;

    Ok(Entry::new(title, FILE_LIMIT, move |ctx: Context| {
        let query = query.clone();
        async move {
            let files = ctx.rg(&query).await?;
            Ok(files
                .iter()
                .map(|file| format!("{:<32} {}", route_path(file), file))
                .collect())
        }
    }))
}

pub fn routes() -> Result<Plan, ReconError> {
    Ok(Plan::new("routes")
        .requires(Tool::Rg)
        .entry(route_entry("Pages", "+page.svelte")?)
        .entry(route_entry("Endpoints", "+server.{ts,js}")?)
        .entry(route_entry("Layouts", "+layout.svelte")?))
}

/// Whether the `$` token spanning `text[start..end]` names a module alias
fn is_module_alias(text: &str, start: usize, end: usize) -> bool {
    if text[end..].starts_with('/') {
        return true;
    }
    MODULE_ALIASES.iter().any(|alias| {
        text[start..].starts_with(alias) && !continues_ident(text, start + alias.len())
    })
}

fn continues_ident(text: &str, at: usize) -> bool {
    text[at..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Whether a line subscribes to a store: `.subscribe(` or a `$store`
/// reference that is neither a rune nor a module alias
fn is_subscription(text: &str) -> bool {
    if text.contains(".subscribe(") {
        return true;
    }
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let end = text[i + 1..]
                .find(|c: char| !(c.is_alphanumeric() || c == '_'))
                .map(|n| i + 1 + n)
                .unwrap_or(text.len());
            let token = &text[i..end];
            let starts_ident = text[i + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_');
            if starts_ident && !RUNES.contains(&token) && !is_module_alias(text, i, end) {
                return true;
            }
            i = end.max(i + 1);
        } else {
            i += 1;
        }
    }
    false
}

pub fn stores(filter: QueryFilter) -> Result<Plan, ReconError> {
    let filter = if filter.type_names.is_empty() {
        filter.with_type("web")
    } else {
        filter
    };

    let definitions = RgQuery::lines(r"\b(writable|readable|derived)\s*(<[^>]*>)?\s*\(")
        .filter(filter.clone());
    let subscriptions =
        RgQuery::lines(r"\.subscribe\s*\(|\$[A-Za-z_]\w*").filter(filter.clone());
    check(&definitions)?;

    let subscriptions = Entry::new("Store subscriptions", MATCH_LIMIT, move |ctx: Context| {
        let query = subscriptions.clone();
        async move {
            let matches = ctx.rg_matches(&query).await?;
            Ok(matches
                .iter()
                .filter(|m| is_subscription(&m.text))
                .map(|m| m.to_string())
                .collect())
        }
    });

    Ok(Plan::new("stores")
        .filters(filter.describe())
        .requires(Tool::Rg)
        .entry(rg_entry("Store definitions", MATCH_LIMIT, definitions))
        .entry(subscriptions))
}
