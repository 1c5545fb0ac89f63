//! Plan execution
//!
//! A command is a `Plan`: a list of titled entries, each with a producer
//! and a truncation limit. `run` executes every entry concurrently through a
//! `TaskGroup`, applies the degrade policy to producer errors, and races the
//! whole thing against Ctrl-C and the optional command timeout.

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Disposition, EXIT_OK, EXIT_TOOL_MISSING, ReconError};
use crate::invoke::{Invocation, InvocationResult, Invoker, Tool};
use crate::pattern::{MatchLine, RgQuery, SearchMode};
use crate::render::Report;
use crate::section::Section;
use crate::task_group::TaskGroup;

/// How long in-flight work gets to wind down after an interrupt or timeout
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Everything a producer may touch
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub invoker: Arc<dyn Invoker>,
    pub cancel: CancellationToken,
}

impl Context {
    pub fn new(config: Arc<Config>, invoker: Arc<dyn Invoker>) -> Self {
        Self {
            config,
            invoker,
            cancel: CancellationToken::new(),
        }
    }

    /// Same context under a different cancellation scope
    pub fn with_cancel(&self, cancel: CancellationToken) -> Self {
        Self {
            config: self.config.clone(),
            invoker: self.invoker.clone(),
            cancel,
        }
    }

    pub async fn run(&self, invocation: &Invocation) -> Result<InvocationResult, ReconError> {
        self.invoker.invoke(invocation, &self.cancel).await
    }

    /// Run and split stdout into lines
    pub async fn lines(&self, invocation: &Invocation) -> Result<Vec<String>, ReconError> {
        self.run(invocation).await?.into_lines()
    }

    /// Run a ripgrep query with the project's extra excludes applied
    ///
    /// Line matches come back as `path:line:text`; listings as plain paths.
    pub async fn rg(&self, query: &RgQuery) -> Result<Vec<String>, ReconError> {
        if query.mode == SearchMode::Lines {
            let matches = self.rg_matches(query).await?;
            return Ok(matches.iter().map(MatchLine::to_string).collect());
        }
        let invocation = query.to_invocation(&self.config.extra_excludes)?;
        self.lines(&invocation).await
    }

    /// Run a line-match query and parse every match
    pub async fn rg_matches(&self, query: &RgQuery) -> Result<Vec<MatchLine>, ReconError> {
        let invocation = query.to_invocation(&self.config.extra_excludes)?;
        self.lines(&invocation)
            .await?
            .iter()
            .map(|line| MatchLine::parse(line))
            .collect()
    }
}

pub type ProducerFuture = BoxFuture<'static, Result<Vec<String>, ReconError>>;

/// Produces the full, untruncated line list for one Section
pub type Producer = Arc<dyn Fn(Context) -> ProducerFuture + Send + Sync>;

/// One Section of a command
#[derive(Clone)]
pub struct Entry {
    pub title: String,
    /// Default human-mode limit
    pub limit: usize,
    /// Invocation failures degrade the Section instead of failing the command
    pub best_effort: bool,
    pub producer: Producer,
}

impl Entry {
    pub fn new<F, Fut>(title: impl Into<String>, limit: usize, producer: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<String>, ReconError>> + Send + 'static,
    {
        Self {
            title: title.into(),
            limit,
            best_effort: false,
            producer: Arc::new(move |ctx| -> ProducerFuture { Box::pin(producer(ctx)) }),
        }
    }

    pub fn best_effort(mut self) -> Self {
        self.best_effort = true;
        self
    }
}

/// Declarative description of one command
#[derive(Clone)]
pub struct Plan {
    pub command: String,
    pub query: Option<String>,
    pub filters: Vec<String>,
    pub entries: Vec<Entry>,
    /// Tools whose absence makes the command exit with 127
    pub required_tools: Vec<Tool>,
}

impl Plan {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            query: None,
            filters: Vec::new(),
            entries: Vec::new(),
            required_tools: Vec::new(),
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn requires(mut self, tool: Tool) -> Self {
        if !self.required_tools.contains(&tool) {
            self.required_tools.push(tool);
        }
        self
    }

    pub fn titles(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.title.as_str()).collect()
    }
}

/// A finished command: what to print and how to exit
#[derive(Debug)]
pub struct Outcome {
    pub report: Report,
    pub exit_code: i32,
}

/// Execute a plan's entries concurrently and collect the report
pub async fn execute(plan: Plan, ctx: Context) -> Result<Outcome, ReconError> {
    let mut group = TaskGroup::new(&ctx.cancel);
    let mut limits = Vec::with_capacity(plan.entries.len());

    for entry in plan.entries {
        limits.push(ctx.config.effective_limit(&plan.command, entry.limit));

        let producer = (entry.producer)(ctx.with_cancel(group.token()));
        let title = entry.title.clone();
        let best_effort = entry.best_effort;

        group.spawn(entry.title, async move {
            match producer.await {
                Ok(lines) => Ok(Section::new(title, lines)),
                Err(e) => match e.disposition(best_effort) {
                    Disposition::Degrade => {
                        log::info!("section '{}' degraded: {}", title, e);
                        Ok(degraded(title, &e))
                    }
                    Disposition::Fatal => Err(e),
                },
            }
        });
    }

    let sections = group.join().await?;

    let mut report = Report::new(plan.command).filters(plan.filters);
    if let Some(query) = plan.query {
        report = report.query(query);
    }
    for (section, limit) in sections.into_iter().zip(limits) {
        report.push(section, limit);
    }

    let missing = report.missing_tools();
    let exit_code = if plan.required_tools.iter().any(|t| missing.contains(t)) {
        EXIT_TOOL_MISSING
    } else {
        EXIT_OK
    };

    Ok(Outcome { report, exit_code })
}

fn degraded(title: String, error: &ReconError) -> Section {
    match error.root() {
        ReconError::ToolUnavailable { tool } => Section::unavailable(title, *tool),
        other => Section::failed(title, other.to_string()),
    }
}

/// Execute a plan, stopping on Ctrl-C or when the command timeout expires
///
/// Both paths cancel the context's token so every in-flight subprocess is
/// killed rather than orphaned.
pub async fn run(plan: Plan, ctx: Context) -> Result<Outcome, ReconError> {
    let root = ctx.cancel.clone();
    let timeout = ctx.config.timeout;

    let work = execute(plan, ctx);
    tokio::pin!(work);

    let deadline = async {
        match timeout {
            Some(timeout) => tokio::time::sleep(timeout).await,
            None => std::future::pending().await,
        }
    };

    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            log::debug!("Ctrl-C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    let stopped = tokio::select! {
        outcome = &mut work => return outcome,
        _ = interrupt => ReconError::Interrupted,
        _ = deadline => ReconError::TimedOut {
            secs: timeout.map(|t| t.as_secs()).unwrap_or_default(),
        },
    };

    log::debug!("stopping: {}", stopped);
    root.cancel();
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, &mut work).await;
    Err(stopped)
}
