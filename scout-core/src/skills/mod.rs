// scout-core/src/skills/mod.rs

//! The user-facing query kinds. Each skill wires a plan through the
//! pipeline and writes its rendering to the given output.

pub mod diff;
pub mod doctor;
pub mod find;
pub mod grep;
pub mod ls;
pub mod regex;
pub mod scan;

use crate::config::ScoutConfig;
use crate::errors::InvocationError;
use crate::executor::{Executor, InvocationReport};
use crate::host::{HostEnv, SystemHost};
use crate::records::Pattern;
use crate::tools::process::{ProcessRunner, TokioProcessRunner};
use crate::tools::ResolvedTool;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How a finished query should end the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Output was written but the query as a whole failed.
    Failure,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        *self == Outcome::Success
    }
}

/// Shared collaborators for every skill.
#[derive(Clone)]
pub struct SkillContext {
    pub host: Arc<dyn HostEnv>,
    pub runner: Arc<dyn ProcessRunner>,
    pub config: ScoutConfig,
    /// Directory artifacts are written under.
    pub project_root: PathBuf,
}

impl SkillContext {
    pub fn new(
        host: Arc<dyn HostEnv>,
        runner: Arc<dyn ProcessRunner>,
        config: ScoutConfig,
        project_root: PathBuf,
    ) -> Self {
        Self {
            host,
            runner,
            config,
            project_root,
        }
    }

    /// Context backed by the real machine: PATH probing, the real terminal, tokio processes.
    pub fn system(config: ScoutConfig, project_root: PathBuf) -> Self {
        Self::new(Arc::new(SystemHost), Arc::new(TokioProcessRunner), config, project_root)
    }

    pub fn executor(&self, parallelism: usize, timeout: Duration) -> Executor {
        Executor::new(Arc::clone(&self.runner), parallelism, timeout)
    }
}

pub(crate) fn tool_versions(tools: &[&ResolvedTool]) -> Value {
    let mut versions = serde_json::Map::new();
    for tool in tools {
        versions.insert(tool.name.to_string(), json!(tool.version));
    }
    Value::Object(versions)
}

pub(crate) fn argv_by_pattern(reports: &[InvocationReport]) -> Value {
    json!(reports
        .iter()
        .map(|r| json!({
            "pattern": r.invocation.pattern.as_ref().map(Pattern::to_json),
            "argv": r.invocation.argv(),
        }))
        .collect::<Vec<_>>())
}

/// Splits reports into successful stdout batches (tagged with their pattern)
/// and the collected errors.
pub(crate) fn partition(reports: Vec<InvocationReport>) -> (Vec<(Option<Pattern>, String)>, Vec<InvocationError>) {
    let mut outputs = Vec::new();
    let mut errors = Vec::new();
    for report in reports {
        match report.outcome {
            Ok(output) => outputs.push((report.invocation.pattern, output.stdout)),
            Err(error) => errors.push(error),
        }
    }
    (outputs, errors)
}

/// A query whose every invocation failed has nothing to report.
pub(crate) fn outcome_for(attempted: usize, errors: &[InvocationError]) -> Outcome {
    if attempted > 0 && errors.len() == attempted {
        Outcome::Failure
    } else {
        Outcome::Success
    }
}
