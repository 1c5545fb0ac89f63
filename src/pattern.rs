//! Pattern and glob compiler
//!
//! Translates friendly filters (type names, include/exclude globs, the
//! default exclude list) into ripgrep arguments, and validates every piece of
//! user input that ends up in a path-like position before anything runs.
//!
//! Friendly type names compile to ripgrep file types (`--type-add` then
//! `--type`), never to include globs: ripgrep ORs include globs together but
//! ANDs a type with them, so `--type ts --glob 'src/**'` narrows to `.ts`
//! files under `src/`.
//!
//! Glob order is fixed: includes first, then excludes. ripgrep lets a later
//! glob override an earlier one, so an include can never re-admit a path that
//! an exclude removed.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path};

use crate::error::ReconError;
use crate::invoke::{Invocation, Tool};

/// Bumped whenever `DEFAULT_EXCLUDES` changes
pub const DEFAULT_EXCLUDES_VERSION: u32 = 1;

/// Dependency directories, build output and VCS metadata
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/.svelte-kit/**",
    "**/.wrangler/**",
    "**/.next/**",
    "**/.turbo/**",
    "**/dist/**",
    "**/build/**",
    "**/target/**",
    "**/coverage/**",
    "**/vendor/**",
];

/// Friendly type names and the globs they stand for
const TYPE_GLOBS: &[(&str, &[&str])] = &[
    ("css", &["*.css", "*.scss", "*.postcss"]),
    ("go", &["*.go"]),
    ("html", &["*.html"]),
    ("js", &["*.js", "*.jsx", "*.mjs", "*.cjs"]),
    ("json", &["*.json", "*.jsonc"]),
    ("md", &["*.md", "*.mdx"]),
    ("py", &["*.py"]),
    ("rust", &["*.rs"]),
    ("svelte", &["*.svelte"]),
    ("toml", &["*.toml"]),
    ("ts", &["*.ts", "*.tsx", "*.mts", "*.cts"]),
    (
        "web",
        &["*.ts", "*.tsx", "*.js", "*.jsx", "*.mjs", "*.svelte"],
    ),
];

/// Prefix for the ripgrep types defined from `TYPE_GLOBS`
const TYPE_PREFIX: &str = "recon_";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlobRule {
    Include(String),
    Exclude(String),
}

impl GlobRule {
    /// Parse a user glob; a leading `!` marks an exclude, as in ripgrep
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('!') {
            Some(rest) => GlobRule::Exclude(rest.to_string()),
            None => GlobRule::Include(raw.to_string()),
        }
    }

    fn glob(&self) -> &str {
        match self {
            GlobRule::Include(g) | GlobRule::Exclude(g) => g,
        }
    }
}

/// Friendly filter for a ripgrep query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    pub type_names: BTreeSet<String>,
    pub extra_globs: Vec<GlobRule>,
    /// Apply `DEFAULT_EXCLUDES`; only turned off explicitly
    pub default_excludes: bool,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self {
            type_names: BTreeSet::new(),
            extra_globs: Vec::new(),
            default_excludes: true,
        }
    }
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, name: impl Into<String>) -> Self {
        self.type_names.insert(name.into());
        self
    }

    pub fn include(mut self, glob: impl Into<String>) -> Self {
        self.extra_globs.push(GlobRule::Include(glob.into()));
        self
    }

    pub fn exclude(mut self, glob: impl Into<String>) -> Self {
        self.extra_globs.push(GlobRule::Exclude(glob.into()));
        self
    }

    pub fn without_default_excludes(mut self) -> Self {
        self.default_excludes = false;
        self
    }

    /// Compile to ripgrep arguments
    ///
    /// `config_excludes` are the project-level extras from `.recon.toml`;
    /// they are added after the defaults and before command excludes.
    pub fn compile(&self, config_excludes: &[String]) -> Result<Vec<String>, ReconError> {
        let mut type_defs: Vec<String> = Vec::new();
        let mut rg_types: Vec<String> = Vec::new();

        for name in &self.type_names {
            match TYPE_GLOBS.iter().find(|(known, _)| known == name) {
                Some((known, globs)) => {
                    let rg_name = format!("{TYPE_PREFIX}{known}");
                    for glob in *globs {
                        type_defs.push(format!("{rg_name}:{glob}"));
                    }
                    rg_types.push(rg_name);
                }
                None => {
                    validate_identifier(name)?;
                    rg_types.push(name.clone());
                }
            }
        }

        let mut includes: Vec<String> = Vec::new();
        for rule in &self.extra_globs {
            validate_glob(rule.glob())?;
            if let GlobRule::Include(glob) = rule {
                push_unique(&mut includes, glob);
            }
        }

        let mut excludes: Vec<String> = Vec::new();
        if self.default_excludes {
            for glob in DEFAULT_EXCLUDES {
                push_unique(&mut excludes, glob);
            }
        }
        for glob in config_excludes {
            validate_glob(glob)?;
            push_unique(&mut excludes, glob);
        }
        for rule in &self.extra_globs {
            if let GlobRule::Exclude(glob) = rule {
                push_unique(&mut excludes, glob);
            }
        }

        let mut args = Vec::new();
        for def in type_defs {
            args.push("--type-add".to_string());
            args.push(def);
        }
        for name in rg_types {
            args.push("--type".to_string());
            args.push(name);
        }
        for glob in includes {
            args.push("--glob".to_string());
            args.push(glob);
        }
        for glob in excludes {
            args.push("--glob".to_string());
            args.push(format!("!{glob}"));
        }

        Ok(args)
    }

    /// Short labels for the filters in effect, for JSON metadata
    pub fn describe(&self) -> Vec<String> {
        let mut labels: Vec<String> = self
            .type_names
            .iter()
            .map(|name| format!("type:{name}"))
            .collect();
        for rule in &self.extra_globs {
            labels.push(match rule {
                GlobRule::Include(g) => format!("glob:{g}"),
                GlobRule::Exclude(g) => format!("exclude:{g}"),
            });
        }
        if self.default_excludes {
            labels.push(format!("default-excludes:v{DEFAULT_EXCLUDES_VERSION}"));
        }
        labels
    }
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}

/// Reject identifiers that could steer a path-like filter elsewhere
///
/// No sanitizing: `../../etc` is an error, never `etc`.
pub fn validate_identifier(name: &str) -> Result<(), ReconError> {
    if name.is_empty() {
        return Err(ReconError::validation(name, "must not be empty"));
    }
    if name.contains("..") {
        return Err(ReconError::validation(name, "contains '..'"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ReconError::validation(name, "contains a path separator"));
    }
    if name.contains('\0') {
        return Err(ReconError::validation(name, "contains a NUL byte"));
    }
    if name.starts_with('-') {
        return Err(ReconError::validation(name, "must not start with '-'"));
    }
    Ok(())
}

/// Validate a package name; `@scope/name` is checked part by part
pub fn validate_package_name(name: &str) -> Result<(), ReconError> {
    if let Some(scoped) = name.strip_prefix('@') {
        let Some((scope, package)) = scoped.split_once('/') else {
            return Err(ReconError::validation(name, "scoped name must look like @scope/name"));
        };
        validate_identifier(scope).map_err(|_| ReconError::validation(name, "invalid scope"))?;
        return validate_identifier(package).map_err(|e| match e {
            ReconError::Validation { reason, .. } => ReconError::validation(name, reason),
            other => other,
        });
    }
    validate_identifier(name)
}

/// Reject absolute paths and `..` components
pub fn validate_relative_path(path: &str) -> Result<(), ReconError> {
    if path.is_empty() {
        return Err(ReconError::validation(path, "must not be empty"));
    }
    if path.contains('\0') {
        return Err(ReconError::validation(path, "contains a NUL byte"));
    }
    if path.starts_with('-') {
        return Err(ReconError::validation(path, "must not start with '-'"));
    }
    let parsed = Path::new(path);
    if parsed.is_absolute() || path.starts_with('/') || path.starts_with('\\') {
        return Err(ReconError::validation(path, "must be relative to the project root"));
    }
    if parsed
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(ReconError::validation(path, "contains '..'"));
    }
    Ok(())
}

pub fn validate_glob(glob: &str) -> Result<(), ReconError> {
    if glob.is_empty() {
        return Err(ReconError::validation(glob, "empty glob"));
    }
    globset::Glob::new(glob)
        .map(|_| ())
        .map_err(|e| ReconError::validation(glob, e.kind().to_string()))
}

/// What ripgrep should print
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// One `MatchLine` per match
    Lines,
    /// Every file that passes the filter
    Files,
    /// Files containing at least one match
    FilesWithMatches,
}

/// A complete ripgrep query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgQuery {
    pub pattern: Option<String>,
    pub mode: SearchMode,
    pub filter: QueryFilter,
    pub fixed_strings: bool,
    pub ignore_case: bool,
    /// Also search files hidden by `.gitignore` and friends
    pub no_ignore: bool,
    /// Search roots relative to the project root; empty means the root
    pub paths: Vec<String>,
}

impl RgQuery {
    pub fn lines(pattern: impl Into<String>) -> Self {
        Self::with_mode(Some(pattern.into()), SearchMode::Lines)
    }

    pub fn files() -> Self {
        Self::with_mode(None, SearchMode::Files)
    }

    pub fn files_with_matches(pattern: impl Into<String>) -> Self {
        Self::with_mode(Some(pattern.into()), SearchMode::FilesWithMatches)
    }

    fn with_mode(pattern: Option<String>, mode: SearchMode) -> Self {
        Self {
            pattern,
            mode,
            filter: QueryFilter::default(),
            fixed_strings: false,
            ignore_case: false,
            no_ignore: false,
            paths: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn fixed_strings(mut self, yes: bool) -> Self {
        self.fixed_strings = yes;
        self
    }

    pub fn ignore_case(mut self, yes: bool) -> Self {
        self.ignore_case = yes;
        self
    }

    pub fn no_ignore(mut self, yes: bool) -> Self {
        self.no_ignore = yes;
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Full argument vector for ripgrep
    pub fn to_args(&self, config_excludes: &[String]) -> Result<Vec<String>, ReconError> {
        let mut args: Vec<String> = match self.mode {
            SearchMode::Lines => ["--no-heading", "--with-filename", "--line-number", "--null"]
                .map(String::from)
                .to_vec(),
            SearchMode::Files => vec!["--files".to_string()],
            SearchMode::FilesWithMatches => vec!["--files-with-matches".to_string()],
        };
        args.extend(["--color", "never", "--sort", "path"].map(String::from));
        if self.no_ignore {
            args.push("--no-ignore".to_string());
        }

        if self.mode != SearchMode::Files {
            if self.ignore_case {
                args.push("--ignore-case".to_string());
            }
            if self.fixed_strings {
                args.push("--fixed-strings".to_string());
            }
        }

        args.extend(self.filter.compile(config_excludes)?);

        match (self.mode, &self.pattern) {
            (SearchMode::Files, _) => {}
            (_, Some(pattern)) if !pattern.is_empty() => {
                // -e keeps patterns that start with '-' from parsing as flags
                args.push("-e".to_string());
                args.push(pattern.clone());
            }
            (_, _) => return Err(ReconError::validation("", "search pattern must not be empty")),
        }

        if !self.paths.is_empty() {
            args.push("--".to_string());
            for path in &self.paths {
                validate_relative_path(path)?;
                args.push(path.clone());
            }
        }

        Ok(args)
    }

    pub fn to_invocation(&self, config_excludes: &[String]) -> Result<Invocation, ReconError> {
        Ok(Invocation::new(Tool::Rg).args(self.to_args(config_excludes)?))
    }
}

/// One line of `--null` match output: `path\0line:text`
///
/// The NUL after the path keeps file names containing `:` intact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLine {
    pub path: String,
    pub line: u64,
    pub text: String,
}

impl MatchLine {
    pub fn parse(raw: &str) -> Result<Self, ReconError> {
        let invalid = || ReconError::Invocation {
            tool: Tool::Rg,
            code: "invalid output".to_string(),
            message: format!("unexpected match line: {raw:?}"),
        };
        let (path, rest) = raw.split_once('\0').ok_or_else(invalid)?;
        let (number, text) = rest.split_once(':').ok_or_else(invalid)?;
        let line = number.parse().map_err(|_| invalid())?;
        Ok(Self {
            path: path.to_string(),
            line,
            text: text.to_string(),
        })
    }
}

impl fmt::Display for MatchLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.text)
    }
}
