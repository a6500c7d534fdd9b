// scout-core/src/skills/regex.rs

//! In-process regex matching over a block of text. No external tool is
//! involved; the match loop runs on the blocking pool under a timeout. A
//! single regex search cannot be interrupted, so on timeout the loop is
//! cancelled between matches and the blocking thread finishes its current
//! search before it exits.

use super::{Outcome, SkillContext};
use crate::emit::jsonl_line;
use crate::errors::ScoutError;
use crate::plan::regex::RegexPlan;
use crate::plan::EffectiveFormat;
use crate::records::StructuredRecord;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Where the text to match comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Inline(String),
    File(PathBuf),
    Stdin,
}

impl InputSource {
    pub fn read(self) -> Result<String, ScoutError> {
        let text = match self {
            InputSource::Inline(text) => text,
            InputSource::File(path) => {
                if !path.exists() {
                    return Err(ScoutError::validation(
                        "file",
                        format!("input file not found: {}", path.display()),
                    ));
                }
                std::fs::read_to_string(&path)?
            }
            InputSource::Stdin => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                text
            }
        };
        if text.is_empty() {
            return Err(ScoutError::validation("input", "no input text provided"));
        }
        Ok(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSet {
    pub captures: Vec<StructuredRecord>,
    pub truncated: bool,
}

/// Collects up to `max_matches` captures with character offsets. Numbered
/// groups are keyed "1".."n", named groups additionally by name; groups that
/// did not participate are left out. Stops early, untruncated, once `cancel`
/// is set.
pub fn collect_matches(regex: &Regex, text: &str, max_matches: usize, cancel: &AtomicBool) -> MatchSet {
    let names: Vec<Option<&str>> = regex.capture_names().collect();
    let mut captures = Vec::new();
    let mut truncated = false;
    // Running byte -> char offset; match starts never decrease.
    let mut byte_pos = 0usize;
    let mut char_pos = 0usize;

    for caps in regex.captures_iter(text) {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if captures.len() >= max_matches {
            truncated = true;
            break;
        }
        let Some(whole) = caps.get(0) else { continue };
        char_pos += text[byte_pos..whole.start()].chars().count();
        byte_pos = whole.start();
        let start = char_pos;
        let end = start + whole.as_str().chars().count();

        let mut groups = BTreeMap::new();
        for index in 1..caps.len() {
            if let Some(group) = caps.get(index) {
                groups.insert(index.to_string(), group.as_str().to_string());
                if let Some(Some(name)) = names.get(index) {
                    groups.insert(name.to_string(), group.as_str().to_string());
                }
            }
        }
        captures.push(StructuredRecord::Capture {
            value: whole.as_str().to_string(),
            start,
            end,
            groups,
        });
    }
    MatchSet { captures, truncated }
}

pub async fn run(ctx: &SkillContext, plan: RegexPlan, text: String, out: &mut dyn Write) -> Result<Outcome, ScoutError> {
    let format = plan.format.resolve(ctx.host.as_ref());
    let input_length = text.chars().count();
    info!(query_id = %plan.query_id(), input_length, "Starting regex match");

    match format {
        EffectiveFormat::Jsonl => {
            let block = json!({"kind": "pattern_block", "pattern_block": plan.parameter_block(input_length)});
            writeln!(out, "{}", jsonl_line(&block))?;
        }
        EffectiveFormat::Human => {
            writeln!(out, "# query_id: {}", plan.query_id())?;
            writeln!(out, "# pattern: {}", plan.pattern)?;
            writeln!(
                out,
                "# flags: ignore_case={}, multiline={}, dotall={}",
                plan.ignore_case, plan.multiline, plan.dotall
            )?;
            writeln!(out, "# input_length: {}", input_length)?;
            writeln!(out)?;
        }
    }

    let regex = plan.compiled.clone();
    let max_matches = plan.max_matches;
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = Arc::clone(&cancel);
    let task = tokio::task::spawn_blocking(move || collect_matches(&regex, &text, max_matches, &worker_cancel));
    let set = match tokio::time::timeout(plan.timeout, task).await {
        Ok(Ok(set)) => set,
        Ok(Err(join_error)) => return Err(ScoutError::Execution(format!("regex match task failed: {}", join_error))),
        Err(_) => {
            cancel.store(true, Ordering::Relaxed);
            let secs = plan.timeout.as_secs();
            warn!(timeout_secs = secs, "Regex match timed out");
            return match format {
                EffectiveFormat::Jsonl => {
                    let error = json!({
                        "kind": "error",
                        "error": "timeout",
                        "message": format!("Pattern matching timed out after {}s", secs),
                    });
                    writeln!(out, "{}", jsonl_line(&error))?;
                    Ok(Outcome::Failure)
                }
                EffectiveFormat::Human => Err(ScoutError::Execution(format!(
                    "pattern matching timed out after {}s",
                    secs
                ))),
            };
        }
    };
    info!(matches = set.captures.len(), truncated = set.truncated, "Regex match finished");

    match format {
        EffectiveFormat::Jsonl => {
            let summary = json!({"kind": "summary", "matches": set.captures.len(), "truncated": set.truncated});
            writeln!(out, "{}", jsonl_line(&summary))?;
            for capture in &set.captures {
                writeln!(out, "{}", jsonl_line(&capture.to_json()))?;
            }
        }
        EffectiveFormat::Human => {
            writeln!(out, "matches: {}", set.captures.len())?;
            if set.truncated {
                writeln!(out, "(truncated)")?;
            }
            writeln!(out)?;
            for capture in &set.captures {
                writeln!(out, "{}", capture.render_human())?;
            }
        }
    }
    Ok(Outcome::Success)
}
