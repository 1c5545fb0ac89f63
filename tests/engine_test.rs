//! End-to-end plan execution against a scripted invoker


use recon::catalog;
use recon::catalog::search::SearchOptions;
use recon::config::{Config, RenderMode};
use recon::engine;
use recon::error::{EXIT_FAILURE, EXIT_OK, EXIT_TOOL_MISSING};
use recon::github::ItemState;
use recon::render::Renderer;
use recon::section::SectionStatus;
use recon::{InvocationResult, QueryFilter, ReconError, Tool};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_helpers::*;

fn search_plan(pattern: &str) -> recon::Plan {
    catalog::search::search(pattern, QueryFilter::new(), SearchOptions::default()).unwrap()
}

#[tokio::test]
async fn test_zero_matches_is_success() {
    let invoker =
        Arc::new(ScriptedInvoker::new().on(Tool::Rg, InvocationResult::no_matches(Tool::Rg)));
    let mut outcome = engine::run(search_plan("nothing_here"), context(invoker))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, EXIT_OK);
    assert!(outcome.report.sections().iter().all(|s| s.count() == 0 && !s.is_degraded()));

    let human = Renderer::plain(RenderMode::Human).render(&mut outcome.report);
    assert_eq!(human.matches("(no results)").count(), 2);
}

#[tokio::test]
async fn test_tool_failure_is_command_error() {
    let invoker = Arc::new(ScriptedInvoker::new().on(
        Tool::Rg,
        InvocationResult::failed(Tool::Rg, 2, "regex parse error"),
    ));
    let err = engine::run(search_plan("(unclosed"), context(invoker))
        .await
        .unwrap_err();

    assert!(matches!(err.root(), ReconError::Invocation { tool: Tool::Rg, .. }));
    assert_eq!(err.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_missing_code_host_cli_degrades() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let mut outcome = engine::run(catalog::github::prs(ItemState::Open).unwrap(), context(invoker))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, EXIT_OK);
    assert_eq!(outcome.report.sections().len(), 1);
    assert_eq!(
        outcome.report.sections()[0].status,
        SectionStatus::Unavailable { tool: Tool::Gh }
    );
    assert_eq!(
        outcome.report.notices(),
        vec!["tool gh not found - install it to enable this check"]
    );

    let json = Renderer::plain(RenderMode::Json).render(&mut outcome.report);
    let doc: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(doc["command"], "prs");
    assert_eq!(doc["pull_requests"]["status"], "unavailable");
    assert_eq!(doc["pull_requests"]["count"], 0);
}

#[tokio::test]
async fn test_unauthenticated_code_host_cli_degrades() {
    let invoker = Arc::new(ScriptedInvoker::new().on(
        Tool::Gh,
        InvocationResult::failed(
            Tool::Gh,
            4,
            "To get started with GitHub CLI, please run: gh auth login",
        ),
    ));
    let outcome = engine::run(catalog::github::issues(ItemState::Open).unwrap(), context(invoker))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, EXIT_OK);
    assert!(matches!(
        outcome.report.sections()[0].status,
        SectionStatus::Failed { .. }
    ));
}

#[tokio::test]
async fn test_missing_required_tool_is_reported_once() {
    let invoker = Arc::new(ScriptedInvoker::new());
    let outcome = engine::run(search_plan("x"), context(invoker)).await.unwrap();

    assert_eq!(outcome.exit_code, EXIT_TOOL_MISSING);
    assert_eq!(outcome.report.sections().len(), 2);
    assert_eq!(outcome.report.notices().len(), 1);
}

#[tokio::test]
async fn test_truncation_human_vs_json() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .on_arg(Tool::Rg, "--files-with-matches", InvocationResult::success(Tool::Rg, ""))
            .on(Tool::Rg, InvocationResult::success(Tool::Rg, match_lines(12))),
    );
    let mut config = Config::default();
    config.limit_override = Some(5);
    let outcome = engine::run(search_plan("match"), context_with(invoker, config))
        .await
        .unwrap();

    let mut human_report = outcome.report.clone();
    let human = Renderer::plain(RenderMode::Human).render(&mut human_report);
    let shown: Vec<&str> = human
        .lines()
        .filter(|l| l.starts_with("  src/file"))
        .collect();
    assert_eq!(shown.len(), 5);
    assert!(human.contains("(7 more - refine your query)"));

    let mut json_report = outcome.report;
    let json = Renderer::plain(RenderMode::Json).render(&mut json_report);
    let doc: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(doc["matches"]["count"], 12);
    assert_eq!(doc["matches"]["results"].as_array().unwrap().len(), 12);

    // Same totals in both modes
    let human_total: usize = human_report.sections().iter().map(|s| s.count()).sum();
    let json_total: u64 = ["matches", "files"]
        .iter()
        .map(|k| doc[k]["count"].as_u64().unwrap())
        .sum();
    assert_eq!(human_total as u64, json_total);
}

#[tokio::test]
async fn test_validation_happens_before_any_spawn() {
    let invoker =
        Arc::new(ScriptedInvoker::new().on(Tool::Rg, InvocationResult::success(Tool::Rg, "x\n")));

    for bad in ["../../etc", "@scope/../x", "a/b/c", "-rf"] {
        let err = catalog::search::imports(bad, QueryFilter::new()).err().unwrap();
        assert!(matches!(err, ReconError::Validation { .. }), "accepted {:?}", bad);
    }
    assert!(catalog::history::history("../secret").is_err());
    assert!(catalog::search::files(&["src/[".to_string()], QueryFilter::new()).is_err());

    assert!(invoker.calls().is_empty());
}

#[tokio::test]
async fn test_first_fatal_error_cancels_slow_sibling() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .on_arg(
                Tool::Rg,
                "--files-with-matches",
                InvocationResult::failed(Tool::Rg, 2, "I/O error"),
            )
            .slow(
                Tool::Rg,
                "--line-number",
                Duration::from_secs(30),
                InvocationResult::success(Tool::Rg, "a\x001:b\n"),
            ),
    );

    let started = Instant::now();
    let err = engine::run(search_plan("x"), context(invoker)).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(err, ReconError::Producer { ref name, .. } if name == "Files"));
}

#[tokio::test]
async fn test_fn_call_sites_exclude_definitions() {
    let definitions = "src/lib/user.ts\x003:export async function loadUser(id) {\n";
    let calls = "src/lib/user.ts\x003:export async function loadUser(id) {\n\
                 src/routes/+page.server.ts\x008:  const user = await loadUser(params.id);\n";
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .on_arg(Tool::Rg, r"\bloadUser\s*\(", InvocationResult::success(Tool::Rg, calls))
            .on(Tool::Rg, InvocationResult::success(Tool::Rg, definitions)),
    );

    let plan = catalog::search::function("loadUser", QueryFilter::new()).unwrap();
    let outcome = engine::run(plan, context(invoker)).await.unwrap();
    let sections = outcome.report.sections();

    assert_eq!(sections[0].title, "Definitions");
    assert_eq!(sections[0].count(), 1);
    assert_eq!(sections[1].title, "Call sites");
    assert_eq!(
        sections[1].lines,
        vec!["src/routes/+page.server.ts:8:  const user = await loadUser(params.id);"]
    );
}

#[tokio::test]
async fn test_stores_keep_paths_with_colons() {
    let output = "src/lib/a:b/cart.svelte\x004:{#each $items as item}\n\
                  src/routes/+layout.svelte\x002:import { page } from '$app/stores';\n";
    let invoker =
        Arc::new(ScriptedInvoker::new().on(Tool::Rg, InvocationResult::success(Tool::Rg, output)));

    let plan = catalog::sveltekit::stores(QueryFilter::new()).unwrap();
    let outcome = engine::run(plan, context(invoker)).await.unwrap();
    let subscriptions = &outcome.report.sections()[1];

    assert_eq!(subscriptions.title, "Store subscriptions");
    assert_eq!(
        subscriptions.lines,
        vec!["src/lib/a:b/cart.svelte:4:{#each $items as item}"]
    );
}

#[tokio::test]
async fn test_churn_ranks_files() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .on_arg(
                Tool::Git,
                "--name-only",
                InvocationResult::success(
                    Tool::Git,
                    "src/a.ts\nsrc/b.ts\n\nsrc/a.ts\n\nsrc/a.ts\nsrc/b.ts\n",
                ),
            )
            .on(
                Tool::Git,
                InvocationResult::success(Tool::Git, "abc1234\t2026-10-01\tAda\tfix login\n"),
            ),
    );

    let outcome = engine::run(catalog::history::churn(7).unwrap(), context(invoker))
        .await
        .unwrap();
    let sections = outcome.report.sections();

    assert_eq!(sections[0].lines, vec!["   3  src/a.ts", "   2  src/b.ts"]);
    assert_eq!(sections[1].lines, vec!["abc1234 2026-10-01 Ada: fix login"]);
}

#[tokio::test]
async fn test_orphans_fan_out() {
    let invoker = Arc::new(
        ScriptedInvoker::new()
            .on_arg(
                Tool::Rg,
                "--files",
                InvocationResult::success(
                    Tool::Rg,
                    "src/lib/Button.svelte\nsrc/lib/Unused.svelte\nsrc/lib/helpers.ts\n",
                ),
            )
            .on_arg(
                Tool::Rg,
                "Button",
                InvocationResult::success(
                    Tool::Rg,
                    "src/lib/Button.svelte\nsrc/routes/+page.svelte\n",
                ),
            )
            .on_arg(
                Tool::Rg,
                "Unused",
                InvocationResult::success(Tool::Rg, "src/lib/Unused.svelte\n"),
            )
            .on(Tool::Rg, InvocationResult::no_matches(Tool::Rg)),
    );

    let plan = catalog::audit::orphans(QueryFilter::new()).unwrap();
    let outcome = engine::run(plan, context(invoker.clone())).await.unwrap();

    assert_eq!(
        outcome.report.sections()[0].lines,
        vec!["src/lib/Unused.svelte", "src/lib/helpers.ts"]
    );
    // one listing plus one search per candidate
    assert_eq!(invoker.calls().len(), 4);
}
