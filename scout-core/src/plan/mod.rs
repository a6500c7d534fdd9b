// scout-core/src/plan/mod.rs

//! Plan normalization: CLI flags or schema-tagged JSON documents in,
//! immutable fully-specified plans out. Nothing here starts a process.

pub mod diff;
pub mod fields;
pub mod find;
pub mod grep;
pub mod ls;
pub mod regex;
pub mod scan;

use crate::errors::ScoutError;
use crate::host::HostEnv;
use fields::Fields;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

pub use fields::parse_document;

/// Input form recorded in the parameter block for flag-driven queries.
pub const CLI_SCHEMA: &str = "cli_args_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Auto,
    Jsonl,
    Human,
}

/// The encoding actually used once `auto` is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveFormat {
    Jsonl,
    Human,
}

impl OutputFormat {
    pub const NAMES: &'static [&'static str] = &["auto", "human", "jsonl"];

    pub fn parse(field: &str, s: &str) -> Result<Self, ScoutError> {
        match s {
            "auto" => Ok(OutputFormat::Auto),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "human" => Ok(OutputFormat::Human),
            _ => Err(ScoutError::validation(field, "must be one of: auto, human, jsonl")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Auto => "auto",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Human => "human",
        }
    }

    /// `auto` is human on an interactive terminal, JSONL everywhere else.
    pub fn resolve(&self, host: &dyn HostEnv) -> EffectiveFormat {
        match self {
            OutputFormat::Jsonl => EffectiveFormat::Jsonl,
            OutputFormat::Human => EffectiveFormat::Human,
            OutputFormat::Auto if host.stdout_is_terminal() => EffectiveFormat::Human,
            OutputFormat::Auto => EffectiveFormat::Jsonl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Smart,
    Sensitive,
    Insensitive,
}

impl Case {
    pub const NAMES: &'static [&'static str] = &["smart", "sensitive", "insensitive"];

    pub fn parse(field: &str, s: &str) -> Result<Self, ScoutError> {
        match s {
            "smart" => Ok(Case::Smart),
            "sensitive" => Ok(Case::Sensitive),
            "insensitive" => Ok(Case::Insensitive),
            _ => Err(ScoutError::validation(field, "must be one of: smart, sensitive, insensitive")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Case::Smart => "smart",
            Case::Sensitive => "sensitive",
            Case::Insensitive => "insensitive",
        }
    }
}

/// Which filesystem entries the search and enumeration tools may visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    pub hidden: bool,
    pub follow: bool,
    pub no_ignore: bool,
}

impl Policy {
    /// Reads a `policy` object; missing switches default to off.
    pub fn from_fields(fields: &Fields<'_>) -> Result<Self, ScoutError> {
        Ok(Self {
            hidden: fields.bool_or("hidden", false)?,
            follow: fields.bool_or("follow", false)?,
            no_ignore: fields.bool_or("no_ignore", false)?,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({ "hidden": self.hidden, "follow": self.follow, "no_ignore": self.no_ignore })
    }
}

/// Resolves `raw` to an absolute, canonical directory.
pub fn resolve_root(field: &str, raw: &str) -> Result<PathBuf, ScoutError> {
    if raw.is_empty() {
        return Err(ScoutError::validation(field, "must be a non-empty string"));
    }
    let root = Path::new(raw)
        .canonicalize()
        .map_err(|_| ScoutError::validation(field, format!("root directory not found: {}", raw)))?;
    if !root.is_dir() {
        return Err(ScoutError::validation(
            field,
            format!("root is not a directory: {}", root.display()),
        ));
    }
    Ok(root)
}

/// Converts a flag value that must be a positive integer.
pub fn positive_flag(field: &str, value: i64) -> Result<usize, ScoutError> {
    if value > 0 {
        Ok(value as usize)
    } else {
        Err(ScoutError::validation(field, "must be a positive integer"))
    }
}

pub fn opt_positive_flag(field: &str, value: Option<i64>) -> Result<Option<usize>, ScoutError> {
    value.map(|v| positive_flag(field, v)).transpose()
}

pub fn non_negative_flag(field: &str, value: i64) -> Result<usize, ScoutError> {
    if value >= 0 {
        Ok(value as usize)
    } else {
        Err(ScoutError::validation(field, "must be a non-negative integer"))
    }
}

/// Sorted, de-duplicated copy of a multi-valued flag.
pub fn sorted_set(mut values: Vec<String>) -> Vec<String> {
    values.sort();
    values.dedup();
    values
}
