// scout-core/src/skills/find.rs

//! `find` and `glob`: file enumeration through fd.

use super::{argv_by_pattern, outcome_for, partition, tool_versions, Outcome, SkillContext};
use crate::emit::{list, write_report, Report};
use crate::errors::{InvocationError, ScoutError};
use crate::executor::ExitPolicy;
use crate::host::require_tool;
use crate::invocation::find_invocations;
use crate::merge::union_paths;
use crate::normalize::{output_lines, relativize_path};
use crate::plan::find::{FindPlan, Strategy};
use crate::records::{EntryType, Pattern, StructuredRecord};
use crate::tools::{ResolvedTool, FD};
use crate::truncate::{cap_len, CapKind, TruncationReport};
use serde_json::{json, Map, Value};
use std::io::Write;
use tracing::{debug, info};

pub(crate) struct EnumerationResult {
    /// Entries after exclusion and the result cap, in path order.
    pub entries: Vec<StructuredRecord>,
    /// Paths surviving exclusion, before the result cap.
    pub total: usize,
    pub truncation: TruncationReport,
    pub errors: Vec<InvocationError>,
    pub argv: Value,
    pub attempted: usize,
}

impl EnumerationResult {
    pub fn count(&self, entry_type: EntryType) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, StructuredRecord::Entry { entry_type: t, .. } if *t == entry_type))
            .count()
    }
}

pub(crate) async fn enumerate(
    ctx: &SkillContext,
    plan: &FindPlan,
    fd: &ResolvedTool,
) -> Result<EnumerationResult, ScoutError> {
    let invocations = find_invocations(plan, &fd.program)?;
    let attempted = invocations.len();
    let executor = ctx.executor(ctx.config.executor.parallelism, ctx.config.invocation_timeout());
    let reports = executor.run_all(invocations, ExitPolicy::ZeroOnly).await;
    let argv = argv_by_pattern(&reports);
    let (outputs, errors) = partition(reports);

    let paths = union_paths(outputs.into_iter().map(|(_, stdout)| {
        output_lines(&stdout)
            .map(|line| relativize_path(line, &plan.root))
            .collect::<Vec<_>>()
    }));
    let before_exclude = paths.len();
    let paths: Vec<String> = paths.into_iter().filter(|p| !plan.excluder.excludes(p)).collect();
    debug!(before = before_exclude, after = paths.len(), "Applied exclude filter");

    let total = paths.len();
    let mut truncation = TruncationReport::default();
    let paths = cap_len(paths, plan.max_results, CapKind::MaxResults, &mut truncation);

    let entries = paths
        .into_iter()
        .map(|path| {
            let entry_type = if plan.root.join(&path).is_dir() {
                EntryType::Directory
            } else {
                EntryType::File
            };
            StructuredRecord::Entry { path, entry_type }
        })
        .collect();

    Ok(EnumerationResult {
        entries,
        total,
        truncation,
        errors,
        argv,
        attempted,
    })
}

fn parameter_block(plan: &FindPlan, fd: &ResolvedTool, argv: Value) -> Map<String, Value> {
    let patterns = |ps: &[Pattern]| ps.iter().map(Pattern::to_json).collect::<Vec<_>>();
    let mut block = Map::new();
    block.insert("plan_schema".to_string(), json!(plan.schema));
    block.insert("root".to_string(), json!(plan.root.to_string_lossy()));
    block.insert("include_patterns".to_string(), json!(patterns(&plan.include_patterns)));
    block.insert("exclude_patterns".to_string(), json!(patterns(&plan.exclude_patterns)));
    block.insert("extensions".to_string(), json!(plan.extensions));
    block.insert("type".to_string(), json!(plan.entry_type.as_str()));
    block.insert("max_depth".to_string(), json!(plan.max_depth));
    block.insert("max_results".to_string(), json!(plan.max_results));
    block.insert("format".to_string(), json!(plan.format.as_str()));
    block.insert("policy".to_string(), plan.policy.to_json());
    block.insert("tool_versions".to_string(), tool_versions(&[fd]));
    let single = plan.strategy == Strategy::Combined || plan.include_patterns.is_empty();
    match (single, argv) {
        (true, Value::Array(mut items)) if items.len() == 1 => {
            let mut only = items.remove(0);
            block.insert("argv".to_string(), only["argv"].take());
        }
        (_, argv) => {
            block.insert("argv_by_pattern".to_string(), argv);
        }
    }
    block.insert("query_id".to_string(), json!(plan.query_id()));
    block
}

pub async fn run(ctx: &SkillContext, plan: FindPlan, out: &mut dyn Write) -> Result<Outcome, ScoutError> {
    let fd = require_tool(ctx.host.as_ref(), &FD)?;
    let format = plan.format.resolve(ctx.host.as_ref());
    info!(
        query_id = %plan.query_id(),
        strategy = ?plan.strategy,
        patterns = plan.include_patterns.len(),
        "Starting enumeration"
    );

    let result = enumerate(ctx, &plan, &fd).await?;
    let outcome = outcome_for(result.attempted, &result.errors);
    info!(total = result.total, returned = result.entries.len(), "Enumeration finished");

    let values = |ps: &[Pattern]| ps.iter().map(|p| format!("{}:{}", p.kind, p.value)).collect::<Vec<_>>();
    let files = result.count(EntryType::File);
    let directories = result.count(EntryType::Directory);
    let report = Report {
        parameters: parameter_block(&plan, &fd, result.argv),
        header: vec![
            ("query_id".to_string(), plan.query_id()),
            ("root".to_string(), plan.root.display().to_string()),
            ("include_patterns".to_string(), list(&values(&plan.include_patterns))),
            ("extensions".to_string(), list(&plan.extensions)),
            ("exclude_patterns".to_string(), list(&values(&plan.exclude_patterns))),
            ("type".to_string(), plan.entry_type.as_str().to_string()),
        ],
        counts: vec![
            ("total", json!(result.total)),
            ("files", json!(files)),
            ("directories", json!(directories)),
        ],
        truncation: result.truncation,
        errors: result.errors,
        records: result.entries,
    };
    write_report(out, &report, format)?;
    Ok(outcome)
}
