//! Cloudflare Workers bindings: declared in wrangler config, used in code

use regex::Regex;

use super::{FILE_LIMIT, MATCH_LIMIT, check, rg_entry};
use crate::engine::{Context, Entry, Plan};
use crate::error::ReconError;
use crate::invoke::Tool;
use crate::pattern::{MatchLine, QueryFilter, RgQuery};

const WRANGLER_FILES: &[&str] = &["**/wrangler.toml", "**/wrangler.json", "**/wrangler.jsonc"];

/// `binding = "DB"` in TOML, `"binding": "DB"` in JSON
const BINDING_PATTERN: &str = r#"\bbinding"?\s*[=:]\s*"([^"]+)""#;

/// Turn a match into `NAME  path:line`
fn declared_binding(re: &Regex, m: &MatchLine) -> Option<String> {
    let name = re.captures(&m.text)?.get(1)?.as_str();
    Some(format!("{name:<24} {}:{}", m.path, m.line))
}

pub fn bindings(filter: QueryFilter) -> Result<Plan, ReconError> {
    let wrangler = WRANGLER_FILES
        .iter()
        .fold(QueryFilter::new(), |f, glob| f.include(*glob));
    let declared = RgQuery::lines(BINDING_PATTERN).filter(wrangler);

    let code_filter = if filter.type_names.is_empty() {
        filter.with_type("web")
    } else {
        filter
    };
    let usages = RgQuery::lines(r"\b(platform\??\.env|env)\.[A-Z_][A-Z0-9_]*\b")
        .filter(code_filter.clone());
    check(&declared)?;
    check(&usages)?;

    let re = Regex::new(BINDING_PATTERN)
        .map_err(|e| ReconError::Internal(format!("binding pattern: {e}")))?;

    let declared = Entry::new("Declared bindings", FILE_LIMIT, move |ctx: Context| {
        let query = declared.clone();
        let re = re.clone();
        async move {
            let matches = ctx.rg_matches(&query).await?;
            Ok(matches
                .iter()
                .filter_map(|m| declared_binding(&re, m))
                .collect())
        }
    });

    Ok(Plan::new("bindings")
        .filters(code_filter.describe())
        .requires(Tool::Rg)
        .entry(declared)
        .entry(rg_entry("Env usages", MATCH_LIMIT, usages)))
}
