// scout-core/src/skills/diff.rs

//! `diff discover` and `diff run`: bounded summaries of git diffs, written
//! as pretty JSON receipts.

use super::{Outcome, SkillContext};
use crate::errors::{InvocationError, ScoutError};
use crate::executor::ExitPolicy;
use crate::host::require_tool;
use crate::invocation::{diff_discovery_invocation, diff_numstat_invocation, git, Invocation};
use crate::normalize::{output_lines, parse_name_status_line, parse_numstat_line, NumstatRow};
use crate::plan::diff::{DiffPlan, DiscoveryPlan};
use crate::records::StructuredRecord;
use crate::tools::{ResolvedTool, GIT};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

pub const SUMMARY_ARTIFACT: &str = "diff_summary_v1.json";
pub const RECEIPT_ARTIFACT: &str = "diff_receipt_v1.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub git_detected: bool,
    pub git_root: Option<String>,
    pub git_version: Option<String>,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

fn write_pretty(out: &mut dyn Write, value: &Value) -> Result<(), ScoutError> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::from)?;
    writeln!(out, "{}", text)?;
    Ok(())
}

fn error_receipt(environment: &Environment, timestamp: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "timestamp": timestamp,
        "environment": environment,
        "error": message,
    })
}

/// Runs one git command under the diff timeout and returns its stdout.
async fn run_git(ctx: &SkillContext, invocation: Invocation) -> Result<String, String> {
    let executor = ctx.executor(1, ctx.config.diff_timeout());
    let mut reports = executor.run_all(vec![invocation], ExitPolicy::ZeroOnly).await;
    match reports.pop().map(|r| r.outcome) {
        Some(Ok(output)) => Ok(output.stdout),
        Some(Err(InvocationError::Timeout { .. })) => Err("git diff timed out".to_string()),
        Some(Err(InvocationError::Exit { code, stderr, .. })) => {
            let stderr = stderr.trim();
            if stderr.is_empty() {
                Err(format!("git exited with code {}", code))
            } else {
                Err(stderr.to_string())
            }
        }
        Some(Err(e)) => Err(e.to_string()),
        None => Err("git produced no result".to_string()),
    }
}

pub async fn detect_environment(ctx: &SkillContext, root: &Path, tool: &ResolvedTool) -> Environment {
    let mut environment = Environment {
        git_version: tool.version.clone(),
        ..Environment::default()
    };
    match run_git(ctx, git(&tool.program, root, &["rev-parse", "--show-toplevel"])).await {
        Ok(stdout) => {
            environment.git_detected = true;
            environment.git_root = Some(stdout.trim().to_string());
        }
        Err(message) => info!(root = %root.display(), %message, "No git work tree detected"),
    }
    environment
}

fn failures_json(failures: &[StructuredRecord]) -> Value {
    json!(failures
        .iter()
        .filter_map(|f| match f {
            StructuredRecord::ParseFailure { raw } => Some(raw.clone()),
            _ => None,
        })
        .collect::<Vec<_>>())
}

pub async fn discover(
    ctx: &SkillContext,
    plan: DiscoveryPlan,
    out: &mut dyn Write,
) -> Result<Outcome, ScoutError> {
    let tool = require_tool(ctx.host.as_ref(), &GIT)?;
    let stamp = timestamp();
    let environment = detect_environment(ctx, &plan.root, &tool).await;
    if !environment.git_detected {
        write_pretty(out, &error_receipt(&environment, &stamp, "Not a git repository"))?;
        return Ok(Outcome::Failure);
    }

    let stdout = match run_git(ctx, diff_discovery_invocation(&plan, &tool.program)).await {
        Ok(stdout) => stdout,
        Err(message) => {
            warn!(%message, "Diff discovery failed");
            write_pretty(out, &error_receipt(&environment, &stamp, &message))?;
            return Ok(Outcome::Failure);
        }
    };

    let mut files = Vec::new();
    let mut failures = Vec::new();
    for line in output_lines(&stdout) {
        match parse_name_status_line(line) {
            Ok(row) => files.push(json!({"status": row.status, "path": row.path})),
            Err(failure) => failures.push(failure),
        }
    }
    let truncated = files.len() > plan.max_files;
    files.truncate(plan.max_files);
    info!(count = files.len(), truncated, "Diff discovery finished");

    let receipt = json!({
        "status": "success",
        "timestamp": stamp,
        "environment": environment,
        "discovery": {
            "count": files.len(),
            "files": files,
            "truncated": truncated,
            "parse_failures": failures_json(&failures),
        },
    });
    write_pretty(out, &receipt)?;
    Ok(Outcome::Success)
}

/// Per-file numstat totals over the first `max_files` rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffTotals {
    pub files: Vec<NumstatRow>,
    pub insertions: u64,
    pub deletions: u64,
    pub truncated: bool,
}

pub fn summarize(mut rows: Vec<NumstatRow>, max_files: usize) -> DiffTotals {
    let truncated = rows.len() > max_files;
    rows.truncate(max_files);
    DiffTotals {
        insertions: rows.iter().map(|r| r.insertions).sum(),
        deletions: rows.iter().map(|r| r.deletions).sum(),
        files: rows,
        truncated,
    }
}

fn file_json(row: &NumstatRow) -> Value {
    json!({
        "path": row.path,
        "status": if row.binary { "binary" } else { "modified" },
        "insertions": row.insertions,
        "deletions": row.deletions,
        "binary": row.binary,
    })
}

pub async fn run(
    ctx: &SkillContext,
    plan: DiffPlan,
    out: &mut dyn Write,
) -> Result<Outcome, ScoutError> {
    let tool = require_tool(ctx.host.as_ref(), &GIT)?;
    let stamp = timestamp();
    let environment = detect_environment(ctx, &plan.root, &tool).await;
    if !environment.git_detected {
        write_pretty(out, &error_receipt(&environment, &stamp, "Not a git repository"))?;
        return Ok(Outcome::Failure);
    }

    let stdout = match run_git(ctx, diff_numstat_invocation(&plan, &tool.program)).await {
        Ok(stdout) => stdout,
        Err(message) => {
            warn!(%message, "Diff summary failed");
            write_pretty(out, &error_receipt(&environment, &stamp, &message))?;
            return Ok(Outcome::Failure);
        }
    };

    let mut rows = Vec::new();
    let mut failures = Vec::new();
    for line in output_lines(&stdout) {
        match parse_numstat_line(line) {
            Ok(row) => rows.push(row),
            Err(failure) => failures.push(failure),
        }
    }
    let totals = summarize(rows, plan.max_files);
    info!(
        files = totals.files.len(),
        insertions = totals.insertions,
        deletions = totals.deletions,
        truncated = totals.truncated,
        "Diff summary finished"
    );

    let document = json!({
        "summary": {
            "files_changed": totals.files.len(),
            "insertions": totals.insertions,
            "deletions": totals.deletions,
            "files": totals.files.iter().map(file_json).collect::<Vec<_>>(),
            "truncated": totals.truncated,
            "scope": plan.scope,
            "parse_failures": failures_json(&failures),
        },
        "receipt": {
            "status": if totals.truncated { "truncated" } else { "success" },
            "timestamp": stamp,
            "environment": environment,
            "bounds_applied": plan.bounds,
            "truncation": {
                "truncated": totals.truncated,
                "files_processed": totals.files.len(),
            },
            "artifacts_emitted": [SUMMARY_ARTIFACT, RECEIPT_ARTIFACT],
        },
    });
    write_pretty(out, &document)?;
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(path: &str, insertions: u64, deletions: u64, binary: bool) -> NumstatRow {
        NumstatRow {
            path: path.to_string(),
            insertions,
            deletions,
            binary,
        }
    }

    #[test]
    fn totals_cover_only_kept_files() {
        let rows = vec![row("a.rs", 3, 1, false), row("b.png", 0, 0, true), row("c.rs", 10, 10, false)];
        let totals = summarize(rows, 2);
        assert!(totals.truncated);
        assert_eq!(totals.files.len(), 2);
        assert_eq!(totals.insertions, 3);
        assert_eq!(totals.deletions, 1);
    }

    #[test]
    fn exactly_max_files_is_not_truncated() {
        let totals = summarize(vec![row("a.rs", 1, 0, false)], 1);
        assert!(!totals.truncated);
    }

    #[test]
    fn binary_rows_are_labelled() {
        let value = file_json(&row("logo.png", 0, 0, true));
        assert_eq!(value["status"], "binary");
        assert_eq!(value["binary"], true);
    }

    #[test]
    fn error_receipt_shape() {
        let receipt = error_receipt(&Environment::default(), "2024-01-01T00:00:00+00:00", "Not a git repository");
        assert_eq!(receipt["status"], "error");
        assert_eq!(receipt["environment"]["git_detected"], false);
        assert_eq!(receipt["error"], "Not a git repository");
    }
}
