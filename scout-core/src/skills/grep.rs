// scout-core/src/skills/grep.rs

use super::{argv_by_pattern, outcome_for, partition, tool_versions, Outcome, SkillContext};
use crate::emit::{list, write_report, Report};
use crate::errors::{InvocationError, ScoutError};
use crate::executor::ExitPolicy;
use crate::host::require_tool;
use crate::invocation::grep_invocations;
use crate::merge::{merge_lines, TaggedLine};
use crate::normalize::{output_lines, parse_search_line, relativize_record};
use crate::plan::grep::GrepPlan;
use crate::records::{Pattern, StructuredRecord};
use crate::tools::{ResolvedTool, RIPGREP};
use crate::truncate::{cap_files, cap_len, cap_matches, CapKind, TruncationReport};
use serde_json::{json, Map, Value};
use std::io::Write;
use tracing::info;

/// Merged, normalized and capped output of a content search.
pub(crate) struct SearchResult {
    pub records: Vec<StructuredRecord>,
    /// Distinct files after the file cap.
    pub files: usize,
    /// Match records after the file cap, before the match and line caps.
    pub matches: usize,
    pub truncation: TruncationReport,
    pub errors: Vec<InvocationError>,
    pub argv_by_pattern: Value,
    pub attempted: usize,
}

pub(crate) async fn search(ctx: &SkillContext, plan: &GrepPlan, rg: &ResolvedTool) -> SearchResult {
    let invocations = grep_invocations(plan, &rg.program);
    let attempted = invocations.len();
    let executor = ctx.executor(plan.parallelism, ctx.config.invocation_timeout());
    let reports = executor.run_all(invocations, ExitPolicy::ZeroOrNoMatches).await;
    let argv = argv_by_pattern(&reports);
    let (outputs, errors) = partition(reports);

    let batches: Vec<Vec<TaggedLine>> = outputs
        .into_iter()
        .map(|(pattern, stdout)| {
            output_lines(&stdout)
                .map(|line| TaggedLine {
                    text: line.to_string(),
                    pattern: pattern.clone(),
                })
                .collect()
        })
        .collect();

    let records: Vec<StructuredRecord> = merge_lines(batches)
        .into_iter()
        .filter_map(|tagged| {
            let mut record = parse_search_line(&tagged.text, tagged.pattern.as_ref())?;
            relativize_record(&mut record, &plan.root);
            Some(record)
        })
        .collect();

    let mut truncation = TruncationReport::default();
    let (records, files) = cap_files(records, plan.max_files, &mut truncation);
    let matches = records.iter().filter(|r| r.is_match()).count();
    let records = cap_matches(records, plan.max_matches, &mut truncation);
    let records = cap_len(records, plan.max_lines, CapKind::MaxLines, &mut truncation);

    SearchResult {
        records,
        files,
        matches,
        truncation,
        errors,
        argv_by_pattern: argv,
        attempted,
    }
}

fn parameter_block(plan: &GrepPlan, rg: &ResolvedTool, argv: Value) -> Map<String, Value> {
    let patterns: Vec<Value> = plan.patterns.iter().map(Pattern::to_json).collect();
    let mut block = json!({
        "plan_schema": plan.schema,
        "root": plan.root.to_string_lossy(),
        "content_patterns": patterns,
        "file_filters": {"include_globs": plan.include_globs, "exclude_globs": plan.exclude_globs},
        "case": plan.case.as_str(),
        "context": plan.context,
        "format": plan.format.as_str(),
        "max_lines": plan.max_lines,
        "max_files": plan.max_files,
        "max_matches": plan.max_matches,
        "parallelism": plan.parallelism,
        "policy": plan.policy.to_json(),
        "tool_versions": tool_versions(&[rg]),
        "argv_by_pattern": argv,
        "query_id": plan.query_id(),
    });
    // Flat v1-style fields when every pattern shares one kind.
    if let Some(mode) = plan.uniform_mode() {
        block["patterns"] = json!(plan.patterns.iter().map(|p| p.value.clone()).collect::<Vec<_>>());
        block["mode"] = json!(mode.as_str());
    }
    match block {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub async fn run(ctx: &SkillContext, plan: GrepPlan, out: &mut dyn Write) -> Result<Outcome, ScoutError> {
    let rg = require_tool(ctx.host.as_ref(), &RIPGREP)?;
    let format = plan.format.resolve(ctx.host.as_ref());
    info!(
        query_id = %plan.query_id(),
        patterns = plan.patterns.len(),
        parallelism = plan.parallelism,
        "Starting content search"
    );

    let result = search(ctx, &plan, &rg).await;
    let outcome = outcome_for(result.attempted, &result.errors);
    info!(
        files = result.files,
        matches = result.matches,
        returned = result.records.len(),
        errors = result.errors.len(),
        "Content search finished"
    );

    let pattern_values: Vec<String> = plan.patterns.iter().map(|p| format!("{}:{}", p.kind, p.value)).collect();
    let report = Report {
        parameters: parameter_block(&plan, &rg, result.argv_by_pattern),
        header: vec![
            ("query_id".to_string(), plan.query_id()),
            ("root".to_string(), plan.root.display().to_string()),
            ("content_patterns".to_string(), list(&pattern_values)),
            ("globs".to_string(), list(&plan.include_globs)),
            ("excludes".to_string(), list(&plan.exclude_globs)),
        ],
        counts: vec![
            ("files", json!(result.files)),
            ("matches", json!(result.matches)),
            ("returned", json!(result.records.len())),
        ],
        truncation: result.truncation,
        errors: result.errors,
        records: result.records,
    };
    write_report(out, &report, format)?;
    Ok(outcome)
}
