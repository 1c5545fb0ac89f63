//! CLI argument parsing and command dispatch

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use crossterm::tty::IsTty;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{self, COMMANDS};
use crate::catalog::history::DEFAULT_CHURN_DAYS;
use crate::catalog::search::SearchOptions;
use crate::config::{self, Config, RenderMode};
use crate::engine::{self, Context, Plan};
use crate::error::{EXIT_OK, ReconError};
use crate::github::ItemState;
use crate::invoke::ProcessInvoker;
use crate::output;
use crate::pattern::{GlobRule, QueryFilter};
use crate::render::Renderer;

/// Recon: fast, read-only codebase inspection for humans and agents
#[derive(Parser, Debug)]
#[command(
    name = "rcn",
    version,
    about = "Fast codebase inspection built on ripgrep, git and gh",
    long_about = "Recon answers common questions about a codebase (where is this \
                  defined, what changed recently, which routes exist) by running \
                  ripgrep, git and gh concurrently and grouping their output into \
                  titled sections.\n\n\
                  Global flags go before the command: rcn --json search 'db.query'"
)]
pub struct Cli {
    /// Machine consumer: no color, no decoration
    #[arg(long, env = "RECON_AGENT")]
    pub agent: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Pretty-print JSON output (only with --json)
    #[arg(long)]
    pub pretty: bool,

    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Project root (defaults to the nearest directory with .git, package.json, ...)
    #[arg(long, env = "RECON_ROOT", value_name = "PATH")]
    pub root: Option<PathBuf>,

    /// Abort the whole command after this many seconds
    #[arg(long, env = "RECON_TIMEOUT", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show at most N lines per section in human output
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Don't truncate human output
    #[arg(long, conflicts_with = "limit")]
    pub all: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Filters shared by the text search commands
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// File types (ts, js, svelte, rust, py, go, css, html, json, toml, md, web,
    /// or any ripgrep type name)
    #[arg(short = 't', long = "type", value_delimiter = ',', value_name = "TYPE")]
    pub types: Vec<String>,

    /// Include glob; prefix with '!' to exclude
    #[arg(short, long, value_name = "GLOB")]
    pub glob: Vec<String>,

    /// Exclude glob, applied after every include
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Search node_modules, build output and VCS metadata too
    #[arg(long)]
    pub no_default_excludes: bool,
}

impl FilterArgs {
    pub fn to_filter(&self) -> QueryFilter {
        let mut filter = QueryFilter::new();
        for name in &self.types {
            filter = filter.with_type(name.trim());
        }
        filter
            .extra_globs
            .extend(self.glob.iter().map(|raw| GlobRule::parse(raw)));
        for glob in &self.exclude {
            filter = filter.exclude(glob);
        }
        if self.no_default_excludes {
            filter = filter.without_default_excludes();
        }
        filter
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search file contents for a pattern
    ///
    /// Examples:
    ///   rcn search 'db.prepare'              # Regex search
    ///   rcn search -F 'a.b(c)' --type ts     # Literal search in TypeScript
    ///   rcn search TODO --exclude '**/*.md'  # Exclude a glob
    Search {
        /// Regex (or literal with -F) to search for
        pattern: String,

        #[command(flatten)]
        filter: FilterArgs,

        /// Case-insensitive search
        #[arg(short, long)]
        ignore_case: bool,

        /// Treat the pattern as a literal string
        #[arg(short = 'F', long)]
        fixed_strings: bool,
    },

    /// List files, optionally filtered by globs ('!' excludes)
    Files {
        #[arg(value_name = "GLOB")]
        globs: Vec<String>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Find where a function is defined and called
    #[command(name = "fn")]
    Function {
        name: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List TODO, FIXME, HACK and XXX markers
    Todos {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show where a package is imported and which copies are installed
    Imports {
        /// Package name, e.g. zod or @sveltejs/kit
        package: String,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List SvelteKit pages, endpoints and layouts
    Routes,

    /// List Svelte store definitions and subscriptions
    Stores {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Cloudflare bindings from wrangler config and their uses in code
    Bindings {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Most changed files and recent commits
    Churn {
        /// Look-back window in days
        #[arg(long, default_value_t = DEFAULT_CHURN_DAYS)]
        days: u32,
    },

    /// Local branches, most recently committed first
    Branches,

    /// Commit history of one file, following renames
    History {
        /// File path relative to the project root
        path: String,
    },

    /// Pull requests from the code host (requires gh)
    Prs {
        #[arg(long, value_enum, default_value_t = ItemState::Open)]
        state: ItemState,
    },

    /// Issues from the code host (requires gh)
    Issues {
        #[arg(long, value_enum, default_value_t = ItemState::Open)]
        state: ItemState,
    },

    /// Source files whose name no other file mentions
    Orphans {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List available commands and their sections
    Commands,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Search { .. } => "search",
            Command::Files { .. } => "files",
            Command::Function { .. } => "fn",
            Command::Todos { .. } => "todos",
            Command::Imports { .. } => "imports",
            Command::Routes => "routes",
            Command::Stores { .. } => "stores",
            Command::Bindings { .. } => "bindings",
            Command::Churn { .. } => "churn",
            Command::Branches => "branches",
            Command::History { .. } => "history",
            Command::Prs { .. } => "prs",
            Command::Issues { .. } => "issues",
            Command::Orphans { .. } => "orphans",
            Command::Commands => "commands",
        }
    }

    /// Build the plan; all user input is validated here
    pub fn plan(&self) -> Result<Plan, ReconError> {
        match self {
            Command::Search {
                pattern,
                filter,
                ignore_case,
                fixed_strings,
            } => catalog::search::search(
                pattern,
                filter.to_filter(),
                SearchOptions {
                    ignore_case: *ignore_case,
                    fixed_strings: *fixed_strings,
                },
            ),
            Command::Files { globs, filter } => catalog::search::files(globs, filter.to_filter()),
            Command::Function { name, filter } => {
                catalog::search::function(name, filter.to_filter())
            }
            Command::Todos { filter } => catalog::search::todos(filter.to_filter()),
            Command::Imports { package, filter } => {
                catalog::search::imports(package, filter.to_filter())
            }
            Command::Routes => catalog::sveltekit::routes(),
            Command::Stores { filter } => catalog::sveltekit::stores(filter.to_filter()),
            Command::Bindings { filter } => catalog::cloudflare::bindings(filter.to_filter()),
            Command::Churn { days } => catalog::history::churn(*days),
            Command::Branches => catalog::history::branches(),
            Command::History { path } => catalog::history::history(path),
            Command::Prs { state } => catalog::github::prs(*state),
            Command::Issues { state } => catalog::github::issues(*state),
            Command::Orphans { filter } => catalog::audit::orphans(filter.to_filter()),
            Command::Commands => Err(ReconError::Internal("'commands' has no plan".to_string())),
        }
    }
}

impl Cli {
    /// Execute the parsed command and return the process exit code
    pub fn execute(self) -> Result<i32> {
        // Setup logging based on verbosity
        let log_level = match self.verbose {
            0 => "warn",  // Default: only warnings and errors
            1 => "info",  // -v: show info messages
            2 => "debug", // -vv: show debug messages
            _ => "trace", // -vvv: show trace messages
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .init();

        if let Command::Commands = self.command {
            print!("{}", list_commands(self.json, self.pretty)?);
            return Ok(EXIT_OK);
        }

        let name = self.command.name();
        let mode = if self.json {
            RenderMode::Json
        } else {
            RenderMode::Human
        };

        let config = match self.build_config(mode) {
            Ok(config) => config,
            Err(e) => {
                let err = ReconError::Config(format!("{e:#}"));
                return Ok(report_error(&Renderer::plain(mode), name, &err));
            }
        };
        let renderer = Renderer::new(&config);

        let plan = match self.command.plan() {
            Ok(plan) => plan,
            Err(e) => return Ok(report_error(&renderer, name, &e)),
        };
        log::debug!("{}: sections {:?}", name, plan.titles());

        let config = Arc::new(config);
        let invoker = Arc::new(ProcessInvoker::new(config.tools.clone(), config.root.clone()));
        let ctx = Context::new(config.clone(), invoker);

        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        let outcome = runtime.block_on(engine::run(plan, ctx));

        match outcome {
            Ok(mut outcome) => {
                let rendered = renderer.render(&mut outcome.report);
                if rendered.ends_with('\n') {
                    print!("{rendered}");
                } else {
                    println!("{rendered}");
                }
                if !config.is_json() {
                    let color = !config.agent && output::stderr_supports_color();
                    for notice in outcome.report.notices() {
                        output::warn(&notice, color);
                    }
                }
                Ok(outcome.exit_code)
            }
            Err(e) => Ok(report_error(&renderer, name, &e)),
        }
    }

    /// Flags and environment first, then `.recon.toml`, then defaults
    fn build_config(&self, mode: RenderMode) -> Result<Config> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => {
                let cwd = std::env::current_dir().context("Failed to read current directory")?;
                config::detect_root(&cwd)
            }
        };
        if !root.is_dir() {
            anyhow::bail!("project root {} is not a directory", root.display());
        }
        log::debug!("Project root: {}", root.display());

        let project = config::load_project_config(&root)?;
        let color = !self.agent
            && std::io::stdout().is_tty()
            && std::env::var_os("NO_COLOR").is_none();

        let config = Config {
            root,
            mode,
            agent: self.agent,
            pretty: self.pretty,
            color,
            limit_override: self.limit,
            show_all: self.all,
            timeout: self.timeout.filter(|secs| *secs > 0).map(Duration::from_secs),
            ..Config::default()
        };
        Ok(config.with_project(project))
    }
}

/// Print a fatal error the way the current mode expects and pick the exit code
///
/// JSON errors go to stdout so consumers always get one document; human
/// errors go to stderr.
fn report_error(renderer: &Renderer, command: &str, err: &ReconError) -> i32 {
    log::debug!("{} failed: {:?}", command, err);
    match renderer.mode {
        RenderMode::Json => {
            println!("{}", renderer.render_error(command, err.kind(), &err.to_string()));
        }
        RenderMode::Human => {
            let color = renderer.decorate && output::stderr_supports_color();
            output::error(&renderer.render_error(command, err.kind(), &err.to_string()), color);
        }
    }
    err.exit_code()
}

fn list_commands(json: bool, pretty: bool) -> Result<String> {
    if json {
        let commands: Vec<serde_json::Value> = COMMANDS
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "summary": c.summary,
                    "sections": c.sections,
                })
            })
            .collect();
        let doc = serde_json::json!({ "command": "commands", "commands": commands });
        let mut out = if pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        out.push('\n');
        return Ok(out);
    }

    let mut out = String::new();
    for c in COMMANDS {
        out.push_str(&format!("{:<10} {}\n", c.name, c.summary));
        out.push_str(&format!("{:<10} sections: {}\n", "", c.sections.join(", ")));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_before_command() {
        let cli = Cli::try_parse_from(["rcn", "--json", "--limit", "5", "search", "x"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.limit, Some(5));
        assert_eq!(cli.command.name(), "search");

        // global flags are not accepted after the command name
        assert!(Cli::try_parse_from(["rcn", "search", "x", "--agent"]).is_err());
    }

    #[test]
    fn test_limit_conflicts_with_all() {
        assert!(Cli::try_parse_from(["rcn", "--limit", "5", "--all", "todos"]).is_err());
    }

    #[test]
    fn test_filter_args_to_filter() {
        let cli = Cli::try_parse_from([
            "rcn",
            "search",
            "x",
            "--type",
            "ts,svelte",
            "-g",
            "src/**",
            "-g",
            "!**/*.test.ts",
            "--exclude",
            "dist/**",
            "--no-default-excludes",
        ])
        .unwrap();
        let Command::Search { filter, .. } = cli.command else {
            panic!("expected search");
        };
        let filter = filter.to_filter();
        assert_eq!(
            filter.describe(),
            vec![
                "type:svelte",
                "type:ts",
                "glob:src/**",
                "exclude:**/*.test.ts",
                "exclude:dist/**"
            ]
        );
    }

    #[test]
    fn test_every_command_has_catalog_entry() {
        for args in [
            vec!["rcn", "search", "x"],
            vec!["rcn", "files"],
            vec!["rcn", "fn", "load"],
            vec!["rcn", "todos"],
            vec!["rcn", "imports", "zod"],
            vec!["rcn", "routes"],
            vec!["rcn", "stores"],
            vec!["rcn", "bindings"],
            vec!["rcn", "churn"],
            vec!["rcn", "branches"],
            vec!["rcn", "history", "README.md"],
            vec!["rcn", "prs"],
            vec!["rcn", "issues", "--state", "closed"],
            vec!["rcn", "orphans"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            let plan = cli.command.plan().unwrap();
            let info = COMMANDS
                .iter()
                .find(|c| c.name == plan.command)
                .unwrap_or_else(|| panic!("no catalog entry for {}", plan.command));
            assert_eq!(plan.titles(), info.sections, "{}", plan.command);
        }
    }

    #[test]
    fn test_list_commands_json() {
        let out = list_commands(true, false).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(doc["commands"].as_array().unwrap().len(), COMMANDS.len());
    }
}
