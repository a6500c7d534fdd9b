// scout-core/src/tools/mod.rs

//! External command-line tools: what they are called, how to find them, and
//! how to run them.

pub mod probe;
pub mod process;

use crate::errors::ScoutError;

/// Captured result of a finished external command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Exit code, or -1 when the process was ended by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// A tool the engine delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Canonical executable name, also the name reported in diagnostics.
    pub name: &'static str,
    /// Fallback executable names tried in order when `name` does not resolve.
    pub alternatives: &'static [&'static str],
    pub package: &'static str,
    pub install_url: &'static str,
}

pub const RIPGREP: ToolSpec = ToolSpec {
    name: "rg",
    alternatives: &[],
    package: "ripgrep",
    install_url: "https://github.com/BurntSushi/ripgrep#installation",
};

/// Debian and Ubuntu package fd as `fdfind`.
pub const FD: ToolSpec = ToolSpec {
    name: "fd",
    alternatives: &["fdfind"],
    package: "fd-find",
    install_url: "https://github.com/sharkdp/fd#installation",
};

pub const GIT: ToolSpec = ToolSpec {
    name: "git",
    alternatives: &[],
    package: "git",
    install_url: "https://git-scm.com/downloads",
};

impl ToolSpec {
    /// Executable names to try, canonical first.
    pub fn candidates(&self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.name).chain(self.alternatives.iter().copied())
    }

    pub fn missing(&self) -> ScoutError {
        ScoutError::DependencyMissing {
            tool: self.name.to_string(),
            package: self.package.to_string(),
            install: self.install_url.to_string(),
        }
    }
}

/// A tool found on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub name: &'static str,
    /// The executable name that actually resolved.
    pub program: String,
    pub version: Option<String>,
}
