// scout-core/src/tools/probe.rs

use super::{ResolvedTool, ToolSpec};
use tracing::debug;

/// Runs `<program> --version` and returns its first output line, or `None`
/// when the program cannot be launched or exits non-zero.
pub fn probe_version(program: &str) -> Option<String> {
    let output = duct::cmd(program, ["--version"])
        .stdout_capture()
        .stderr_null()
        .unchecked()
        .run();
    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version = stdout.lines().next().unwrap_or_default().trim().to_string();
            debug!(program, version = %version, "Probed tool version");
            Some(version)
        }
        Ok(output) => {
            debug!(program, status = ?output.status, "Tool probe exited non-zero");
            None
        }
        Err(e) => {
            debug!(program, error = %e, "Tool probe failed to launch");
            None
        }
    }
}

/// First candidate executable of `spec` that answers a version probe.
pub fn resolve(spec: &ToolSpec) -> Option<ResolvedTool> {
    spec.candidates().find_map(|program| {
        probe_version(program).map(|version| ResolvedTool {
            name: spec.name,
            program: program.to_string(),
            version: Some(version).filter(|v| !v.is_empty()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_program_does_not_resolve() {
        assert_eq!(probe_version("this_command_should_not_exist_qwertyuiop"), None);
        let spec = ToolSpec {
            name: "this_command_should_not_exist_qwertyuiop",
            alternatives: &["neither_should_this_one_zxcvbnm"],
            package: "none",
            install_url: "https://example.invalid",
        };
        assert_eq!(resolve(&spec), None);
    }
}
