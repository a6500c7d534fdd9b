// scout-core/src/skills/scan.rs

//! `scan`: enumerate a surface with fd, then search exactly those files with rg.

use super::find::enumerate;
use super::grep::search;
use super::{outcome_for, tool_versions, Outcome, SkillContext};
use crate::emit::{list, write_report, Report};
use crate::errors::ScoutError;
use crate::host::require_tool;
use crate::plan::scan::ScanPlan;
use crate::records::{EntryType, Pattern, StructuredRecord};
use crate::tools::{FD, RIPGREP};
use serde_json::{json, Map, Value};
use std::io::Write;
use tracing::info;

pub async fn run(ctx: &SkillContext, plan: ScanPlan, out: &mut dyn Write) -> Result<Outcome, ScoutError> {
    let fd = require_tool(ctx.host.as_ref(), &FD)?;
    let rg = require_tool(ctx.host.as_ref(), &RIPGREP)?;
    let format = plan.format.resolve(ctx.host.as_ref());
    let query_id = plan.query_id();
    info!(query_id = %query_id, "Starting scan");

    let surface = enumerate(ctx, &plan.surface, &fd).await?;
    let files: Vec<String> = surface
        .entries
        .iter()
        .filter_map(|entry| match entry {
            StructuredRecord::Entry {
                path,
                entry_type: EntryType::File,
            } => Some(path.clone()),
            _ => None,
        })
        .collect();
    info!(surface_files = files.len(), "Surface enumerated");

    let mut parameters = Map::new();
    parameters.insert("plan_schema".to_string(), json!(plan.surface.schema));
    parameters.insert("root".to_string(), json!(plan.root.to_string_lossy()));
    parameters.insert("format".to_string(), json!(plan.format.as_str()));
    parameters.insert("surface_query_id".to_string(), json!(plan.surface.query_id()));
    parameters.insert("search_query_id".to_string(), json!(plan.search.query_id()));
    parameters.insert("surface_argv".to_string(), surface.argv.clone());
    parameters.insert("tool_versions".to_string(), tool_versions(&[&fd, &rg]));

    let mut truncation = surface.truncation;
    let mut errors = surface.errors;
    let mut outcome = outcome_for(surface.attempted, &errors);
    let surface_count = files.len();

    let (records, file_count, matches, search_argv) = if files.is_empty() {
        (Vec::new(), 0, 0, Value::Array(Vec::new()))
    } else {
        let mut search_plan = plan.search.clone();
        search_plan.files = Some(files);
        let result = search(ctx, &search_plan, &rg).await;
        if !outcome_for(result.attempted, &result.errors).is_success() {
            outcome = Outcome::Failure;
        }
        truncation.stages.extend(result.truncation.stages);
        errors.extend(result.errors);
        (result.records, result.files, result.matches, result.argv_by_pattern)
    };
    parameters.insert("argv_by_pattern".to_string(), search_argv);
    parameters.insert("query_id".to_string(), json!(query_id));
    info!(files = file_count, matches, returned = records.len(), "Scan finished");

    let pattern_values: Vec<String> = plan
        .search
        .patterns
        .iter()
        .map(|p: &Pattern| format!("{}:{}", p.kind, p.value))
        .collect();
    let report = Report {
        parameters,
        header: vec![
            ("query_id".to_string(), query_id.clone()),
            ("root".to_string(), plan.root.display().to_string()),
            ("content_patterns".to_string(), list(&pattern_values)),
        ],
        counts: vec![
            ("surface_files", json!(surface_count)),
            ("files", json!(file_count)),
            ("matches", json!(matches)),
            ("returned", json!(records.len())),
        ],
        truncation,
        errors,
        records,
    };
    write_report(out, &report, format)?;
    Ok(outcome)
}
