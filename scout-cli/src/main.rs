// scout-cli/src/main.rs
mod models;

use anyhow::Context;
use clap::Parser;
use colored::*;
use scout_core::plan::diff::{DiffPlan, DiscoveryPlan};
use scout_core::plan::find::{FindPlan, Strategy};
use scout_core::plan::grep::GrepPlan;
use scout_core::plan::ls::LsPlan;
use scout_core::plan::regex::RegexPlan;
use scout_core::plan::scan::ScanPlan;
use scout_core::{load_config, skills, Outcome, ScoutError, SkillContext};
use std::env;
use std::fs;
use std::io::{self, BufWriter, IsTerminal, Write};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::models::cli::{Cli, Command, DiffCommand};

const LOG_FILE_NAME: &str = "scout.log";

fn read_stdin() -> Result<String, ScoutError> {
    Ok(io::read_to_string(io::stdin())?)
}

async fn dispatch(command: Command, ctx: &SkillContext, out: &mut dyn Write) -> Result<Outcome, ScoutError> {
    let config = &ctx.config;
    match command {
        Command::Grep(args) => {
            let plan = if args.stdin {
                GrepPlan::from_stdin(&read_stdin()?)?
            } else {
                GrepPlan::from_flags(args.into_flags(config))?
            };
            skills::grep::run(ctx, plan, out).await
        }
        Command::Find(args) => {
            let plan = if args.stdin {
                FindPlan::from_stdin(&read_stdin()?)?
            } else {
                FindPlan::from_flags(args.enumeration.into_flags(config), Strategy::FanOut)?
            };
            skills::find::run(ctx, plan, out).await
        }
        Command::Glob(args) => {
            let plan = FindPlan::from_flags(args.into_flags(config), Strategy::Combined)?;
            skills::find::run(ctx, plan, out).await
        }
        Command::Ls(_) => skills::ls::run(ctx, LsPlan::from_stdin(&read_stdin()?)?, out).await,
        Command::Diff(DiffCommand::Discover(_)) => {
            skills::diff::discover(ctx, DiscoveryPlan::from_stdin(&read_stdin()?)?, out).await
        }
        Command::Diff(DiffCommand::Run(_)) => skills::diff::run(ctx, DiffPlan::from_stdin(&read_stdin()?)?, out).await,
        Command::Regex(args) => {
            let (flags, source) = args.into_parts();
            let plan = RegexPlan::from_flags(flags)?;
            let text = source.read()?;
            skills::regex::run(ctx, plan, text, out).await
        }
        Command::Scan(_) => skills::scan::run(ctx, ScanPlan::from_stdin(&read_stdin()?)?, out).await,
        Command::Doctor(args) => skills::doctor::run(ctx, args.skill.as_deref(), out),
    }
}

fn report_error(message: &str) {
    eprintln!("{} {}", "error:".red(), message);
}

/// Prints a clap error or help text and reports whether it is a failure.
/// Help and version requests are not failures.
fn print_usage(e: &clap::Error) -> bool {
    if let Err(print_err) = e.print() {
        report_error(&format!("Failed to print usage: {}", print_err));
        return true;
    }
    e.use_stderr()
}

#[tokio::main]
async fn main() -> ExitCode {
    if !io::stderr().is_terminal() {
        colored::control::set_override(false);
    }

    dotenvy::dotenv().ok();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            return if print_usage(&e) { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    // --- Logging Setup ---
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let log_dir = dirs::cache_dir()
        .unwrap_or_else(env::temp_dir)
        .join("scout");
    if let Err(e) = fs::create_dir_all(&log_dir) {
        report_error(&format!("Failed to create log directory {}: {}", log_dir.display(), e));
        return ExitCode::FAILURE;
    }
    let log_path = log_dir.join(LOG_FILE_NAME);
    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let time_format_desc = match time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    ) {
        Ok(desc) => desc,
        Err(e) => {
            report_error(&format!("Failed to parse log time format: {}", e));
            return ExitCode::FAILURE;
        }
    };
    let local_timer = LocalTime::new(time_format_desc);

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer.clone())
        .with_target(false)
        .with_level(true);
    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        report_error(&format!("Failed to initialize logging: {}", e));
        return ExitCode::FAILURE;
    }
    info!(
        "Logging initialized. Level determined by RUST_LOG or -v flags (default: {}). Logging to stderr and {}",
        default_level,
        log_path.display()
    );
    // --- End Logging Setup ---

    let loaded = match load_config(cli.config.as_deref()).context("Failed to load configuration") {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("Configuration error: {:?}", e);
            report_error(&ScoutError::config(format!("{:#}", e)).to_string());
            return ExitCode::FAILURE;
        }
    };
    info!(project_root = %loaded.project_root.display(), source = ?loaded.source, "Configuration loaded");
    let ctx = SkillContext::system(loaded.config, loaded.project_root);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = dispatch(cli.command, &ctx, &mut out).await;
    if let Err(e) = out.flush() {
        error!(error = %e, "Failed to flush stdout");
    }

    match result {
        Ok(Outcome::Success) => ExitCode::SUCCESS,
        Ok(Outcome::Failure) => {
            info!("Query finished without usable results");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Command failed: {:?}", e);
            report_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
