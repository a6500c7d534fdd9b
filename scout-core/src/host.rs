// scout-core/src/host.rs

use crate::errors::ScoutError;
use crate::tools::{probe, ResolvedTool, ToolSpec};
use std::io::IsTerminal;
use tracing::info;

/// What the engine needs to know about the machine it runs on.
pub trait HostEnv: Send + Sync {
    /// Finds the first resolvable executable for `spec`.
    fn resolve_tool(&self, spec: &ToolSpec) -> Option<ResolvedTool>;
    fn stdout_is_terminal(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostEnv for SystemHost {
    fn resolve_tool(&self, spec: &ToolSpec) -> Option<ResolvedTool> {
        probe::resolve(spec)
    }

    fn stdout_is_terminal(&self) -> bool {
        std::io::stdout().is_terminal()
    }
}

/// Resolves `spec` or fails with an error naming the tool and how to install it.
pub fn require_tool(host: &dyn HostEnv, spec: &ToolSpec) -> Result<ResolvedTool, ScoutError> {
    match host.resolve_tool(spec) {
        Some(tool) => {
            info!(tool = spec.name, program = %tool.program, "Resolved external tool");
            Ok(tool)
        }
        None => Err(spec.missing()),
    }
}
