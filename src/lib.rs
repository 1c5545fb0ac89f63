//! Recon: fast, read-only codebase inspection
//!
//! Recon answers everyday questions about a codebase by orchestrating
//! external tools (ripgrep, git, gh), running them concurrently and grouping
//! their output into titled Sections rendered for humans or as JSON.
//!
//! # Architecture
//!
//! - **Invocation Adapter** (`invoke`): runs one external tool, classifies its exit
//! - **Pattern Compiler** (`pattern`): friendly filters to ripgrep arguments, input validation
//! - **Task Group** (`task_group`): concurrent producers with cancellation and bounded fan-out
//! - **Renderer** (`render`): one Section list, two output modes
//! - **Catalog** (`catalog`): each command as a declarative `Plan`
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use recon::{catalog, engine, Config, Context, ProcessInvoker, QueryFilter, Renderer};
//!
//! let config = Arc::new(Config::default());
//! let invoker = Arc::new(ProcessInvoker::new(config.tools.clone(), config.root.clone()));
//! let plan = catalog::search::todos(QueryFilter::new()).unwrap();
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let mut outcome = runtime
//!     .block_on(engine::run(plan, Context::new(config.clone(), invoker)))
//!     .unwrap();
//! print!("{}", Renderer::new(&config).render(&mut outcome.report));
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod git;
pub mod github;
pub mod invoke;
pub mod output;
pub mod pattern;
pub mod render;
pub mod section;
pub mod task_group;

// Re-export commonly used types
pub use config::{Config, RenderMode};
pub use engine::{Context, Entry, Plan};
pub use error::ReconError;
pub use invoke::{Invocation, InvocationResult, Invoker, ProcessInvoker, Tool};
pub use pattern::{MatchLine, QueryFilter, RgQuery};
pub use render::{Renderer, Report};
pub use section::Section;
pub use task_group::TaskGroup;
