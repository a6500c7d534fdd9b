// scout-core/src/skills/doctor.rs

//! Reports which external tools resolve on this host.

use super::{Outcome, SkillContext};
use crate::errors::ScoutError;
use crate::tools::{ToolSpec, FD, GIT, RIPGREP};
use serde_json::{json, Map, Value};
use std::io::Write;
use tracing::info;

pub const SKILLS: &[&str] = &["grep", "find", "glob", "ls", "diff", "regex", "scan"];

/// Tools a skill uses, each with whether the skill cannot run without it.
pub fn tools_for(skill: Option<&str>) -> Result<Vec<(ToolSpec, bool)>, ScoutError> {
    let tools = match skill {
        None => vec![(RIPGREP, true), (FD, true), (GIT, true)],
        Some("grep") => vec![(RIPGREP, true)],
        Some("find") | Some("glob") => vec![(FD, true)],
        Some("scan") => vec![(FD, true), (RIPGREP, true)],
        // ls degrades to a plain inventory without git.
        Some("ls") => vec![(GIT, false)],
        Some("diff") => vec![(GIT, true)],
        Some("regex") => Vec::new(),
        Some(other) => {
            return Err(ScoutError::validation(
                "skill",
                format!("unknown skill '{}' (expected one of: {})", other, SKILLS.join(", ")),
            ))
        }
    };
    Ok(tools)
}

pub fn run(ctx: &SkillContext, skill: Option<&str>, out: &mut dyn Write) -> Result<Outcome, ScoutError> {
    let mut tools = Map::new();
    let mut missing = Vec::new();
    for (spec, required) in tools_for(skill)? {
        let resolved = ctx.host.resolve_tool(&spec);
        if resolved.is_none() && required {
            missing.push(spec.name);
        }
        tools.insert(
            spec.name.to_string(),
            json!({
                "available": resolved.is_some(),
                "required": required,
                "program": resolved.as_ref().map(|t| t.program.clone()),
                "version": resolved.as_ref().and_then(|t| t.version.clone()),
                "package": spec.package,
                "install": spec.install_url,
            }),
        );
    }

    let ok = missing.is_empty();
    let message = if ok {
        "all required tools are available".to_string()
    } else {
        format!("missing required tools: {}", missing.join(", "))
    };
    info!(skill = skill.unwrap_or("all"), ok, "Doctor check finished");

    let report = json!({
        "ok": ok,
        "skill": skill,
        "tools": Value::Object(tools),
        "message": message,
    });
    let text = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
    writeln!(out, "{}", text)?;
    Ok(if ok { Outcome::Success } else { Outcome::Failure })
}
