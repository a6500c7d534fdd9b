// scout-cli/src/models/cli.rs
use clap::{ArgAction, Args, Parser, Subcommand};
use scout_core::plan::find::{FindFlags, DEFAULT_MAX_RESULTS};
use scout_core::plan::grep::{GrepFlags, DEFAULT_MAX_LINES};
use scout_core::plan::regex::{RegexFlags, DEFAULT_MAX_MATCHES, DEFAULT_TIMEOUT_SECS};
use scout_core::skills::regex::InputSource;
use scout_core::ScoutConfig;
use std::path::PathBuf;

/// Scout: deterministic, bounded search and inventory for coding agents.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to a Scout.toml; by default the nearest one above the working directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search file contents with ripgrep, one invocation per pattern.
    Grep(GrepArgs),
    /// Enumerate paths with fd, one invocation per include pattern.
    Find(FindArgs),
    /// Enumerate paths matching any of several globs in one fd invocation.
    Glob(EnumerationArgs),
    /// Bounded directory inventory from an ls_plan_v1 on stdin.
    Ls(StdinArgs),
    /// Bounded git diff summaries.
    #[command(subcommand)]
    Diff(DiffCommand),
    /// Match a regex against text without touching the filesystem.
    Regex(RegexArgs),
    /// Enumerate a surface, then search it, from a scan_plan_v1 on stdin.
    Scan(StdinArgs),
    /// Check which external tools are available.
    Doctor(DoctorArgs),
}

#[derive(Subcommand, Debug)]
pub enum DiffCommand {
    /// List changed files from a diff_discovery_plan_v1 on stdin.
    Discover(StdinArgs),
    /// Summarize a diff from a diff_plan_v1 on stdin.
    Run(StdinArgs),
}

#[derive(Args, Debug)]
pub struct StdinArgs {
    /// Read the JSON plan from stdin.
    #[arg(long, required = true)]
    pub stdin: bool,
}

#[derive(Args, Debug)]
pub struct GrepArgs {
    #[arg(long, default_value = ".")]
    pub root: String,
    /// Content pattern; repeat for several.
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,
    /// Only search files matching this glob.
    #[arg(long = "glob")]
    pub globs: Vec<String>,
    /// Skip files matching this glob.
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,
    #[arg(long, default_value = "fixed", value_parser = ["fixed", "regex"])]
    pub mode: String,
    #[arg(long, default_value = "smart", value_parser = ["smart", "sensitive", "insensitive"])]
    pub case: String,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub context: i64,
    #[arg(long, default_value = "auto", value_parser = ["auto", "human", "jsonl"])]
    pub format: String,
    #[arg(long, default_value_t = DEFAULT_MAX_LINES as i64, allow_negative_numbers = true)]
    pub max_lines: i64,
    #[arg(long, allow_negative_numbers = true)]
    pub max_files: Option<i64>,
    #[arg(long, allow_negative_numbers = true)]
    pub max_matches: Option<i64>,
    /// Concurrent rg processes; defaults to executor.parallelism.
    #[arg(long, allow_negative_numbers = true)]
    pub parallelism: Option<i64>,
    #[arg(long)]
    pub hidden: bool,
    #[arg(long)]
    pub follow: bool,
    #[arg(long)]
    pub no_ignore: bool,
    /// Read a grep_plan_v1/v2 document from stdin instead of flags.
    #[arg(long)]
    pub stdin: bool,
}

impl GrepArgs {
    pub fn into_flags(self, config: &ScoutConfig) -> GrepFlags {
        GrepFlags {
            root: self.root,
            patterns: self.patterns,
            globs: self.globs,
            excludes: self.excludes,
            mode: self.mode,
            case: self.case,
            context: self.context,
            format: self.format,
            max_lines: self.max_lines,
            max_files: self.max_files,
            max_matches: self.max_matches,
            parallelism: self
                .parallelism
                .unwrap_or(config.executor.parallelism as i64),
            hidden: self.hidden,
            follow: self.follow,
            no_ignore: self.no_ignore,
            max_pattern_length: config.limits.max_pattern_length,
        }
    }
}

#[derive(Args, Debug)]
pub struct EnumerationArgs {
    #[arg(long, default_value = ".")]
    pub root: String,
    /// Glob an entry must match; repeat for several.
    #[arg(long = "pattern")]
    pub patterns: Vec<String>,
    #[arg(long = "extension")]
    pub extensions: Vec<String>,
    /// Glob of entries to leave out.
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,
    #[arg(long = "type", default_value = "file", value_parser = ["file", "directory", "any"])]
    pub entry_type: String,
    #[arg(long, allow_negative_numbers = true)]
    pub max_depth: Option<i64>,
    #[arg(long, default_value_t = DEFAULT_MAX_RESULTS as i64, allow_negative_numbers = true)]
    pub max_results: i64,
    #[arg(long, default_value = "auto", value_parser = ["auto", "human", "jsonl"])]
    pub format: String,
    #[arg(long)]
    pub hidden: bool,
    #[arg(long)]
    pub follow: bool,
    #[arg(long)]
    pub no_ignore: bool,
}

impl EnumerationArgs {
    pub fn into_flags(self, config: &ScoutConfig) -> FindFlags {
        FindFlags {
            root: self.root,
            patterns: self.patterns,
            extensions: self.extensions,
            excludes: self.excludes,
            entry_type: self.entry_type,
            max_depth: self.max_depth,
            max_results: self.max_results,
            format: self.format,
            hidden: self.hidden,
            follow: self.follow,
            no_ignore: self.no_ignore,
            max_pattern_length: config.limits.max_pattern_length,
        }
    }
}

#[derive(Args, Debug)]
pub struct FindArgs {
    #[command(flatten)]
    pub enumeration: EnumerationArgs,
    /// Read a find_plan_v1/v2 document from stdin instead of flags.
    #[arg(long)]
    pub stdin: bool,
}

#[derive(Args, Debug)]
pub struct RegexArgs {
    #[arg(long)]
    pub pattern: Option<String>,
    /// Text to match; stdin is read when neither --input nor --file is given.
    #[arg(long, conflicts_with = "file")]
    pub input: Option<String>,
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub ignore_case: bool,
    #[arg(long)]
    pub multiline: bool,
    #[arg(long)]
    pub dotall: bool,
    #[arg(long, default_value_t = DEFAULT_MAX_MATCHES as i64, allow_negative_numbers = true)]
    pub max_matches: i64,
    /// Seconds before matching is abandoned.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS as i64, allow_negative_numbers = true)]
    pub timeout: i64,
    #[arg(long, default_value = "auto", value_parser = ["auto", "human", "jsonl"])]
    pub format: String,
}

impl RegexArgs {
    pub fn into_parts(self) -> (RegexFlags, InputSource) {
        let source = match (self.input, self.file) {
            (Some(text), _) if !text.is_empty() => InputSource::Inline(text),
            (_, Some(path)) => InputSource::File(path),
            _ => InputSource::Stdin,
        };
        let flags = RegexFlags {
            pattern: self.pattern.unwrap_or_default(),
            ignore_case: self.ignore_case,
            multiline: self.multiline,
            dotall: self.dotall,
            max_matches: self.max_matches,
            timeout_secs: self.timeout,
            format: self.format,
        };
        (flags, source)
    }
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Only check the tools this skill needs.
    #[arg(long, value_parser = ["grep", "find", "glob", "ls", "diff", "regex", "scan"])]
    pub skill: Option<String>,
}
