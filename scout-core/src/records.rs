// scout-core/src/records.rs

//! Pattern and record types shared by every skill.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// How a pattern value is interpreted. Declaration order matches the
/// lexicographic order of the wire names so derived `Ord` sorts the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Fixed,
    Glob,
    Regex,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Fixed => "fixed",
            PatternKind::Glob => "glob",
            PatternKind::Regex => "regex",
        }
    }

    pub fn parse(s: &str) -> Option<PatternKind> {
        match s {
            "fixed" => Some(PatternKind::Fixed),
            "glob" => Some(PatternKind::Glob),
            "regex" => Some(PatternKind::Regex),
            _ => None,
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub value: String,
}

impl Pattern {
    pub fn new(kind: PatternKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "kind": self.kind.as_str(), "value": self.value })
    }
}

/// Sorts by `(kind, value)` and drops duplicates.
pub fn canonical_patterns(mut patterns: Vec<Pattern>) -> Vec<Pattern> {
    patterns.sort();
    patterns.dedup();
    patterns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    File,
    Directory,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Directory => "directory",
        }
    }
}

/// One normalized unit of tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredRecord {
    Match {
        path: String,
        line: u64,
        content: String,
        pattern: Option<Pattern>,
    },
    Context {
        path: String,
        line: u64,
        content: String,
    },
    Separator,
    /// Tool output that is neither a match nor context, kept verbatim.
    Line { text: String },
    Entry { path: String, entry_type: EntryType },
    Capture {
        value: String,
        start: usize,
        end: usize,
        groups: BTreeMap<String, String>,
    },
    ParseFailure { raw: String },
}

impl StructuredRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            StructuredRecord::Match { .. } | StructuredRecord::Capture { .. } => "match",
            StructuredRecord::Context { .. } => "context",
            StructuredRecord::Separator => "separator",
            StructuredRecord::Line { .. } => "line",
            StructuredRecord::Entry { .. } => "entry",
            StructuredRecord::ParseFailure { .. } => "parse_failure",
        }
    }

    /// The file a record belongs to, if it belongs to one.
    pub fn path(&self) -> Option<&str> {
        match self {
            StructuredRecord::Match { path, .. }
            | StructuredRecord::Context { path, .. }
            | StructuredRecord::Entry { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, StructuredRecord::Match { .. })
    }

    pub fn to_json(&self) -> Value {
        match self {
            StructuredRecord::Match {
                path,
                line,
                content,
                pattern,
            } => {
                let mut value = json!({
                    "kind": "match",
                    "path": path,
                    "line": line,
                    "content": content,
                });
                if let Some(p) = pattern {
                    value["pattern"] = p.to_json();
                }
                value
            }
            StructuredRecord::Context {
                path,
                line,
                content,
            } => json!({ "kind": "context", "path": path, "line": line, "content": content }),
            StructuredRecord::Separator => json!({ "kind": "separator" }),
            StructuredRecord::Line { text } => json!({ "kind": "line", "line": text }),
            StructuredRecord::Entry { path, entry_type } => {
                json!({ "kind": "entry", "path": path, "type": entry_type.as_str() })
            }
            StructuredRecord::Capture {
                value,
                start,
                end,
                groups,
            } => json!({
                "kind": "match",
                "value": value,
                "start": start,
                "end": end,
                "groups": groups,
            }),
            StructuredRecord::ParseFailure { raw } => json!({ "kind": "parse_failure", "raw": raw }),
        }
    }

    pub fn render_human(&self) -> String {
        match self {
            StructuredRecord::Match {
                path,
                line,
                content,
                ..
            } => format!("{}:{}:{}", path, line, content),
            StructuredRecord::Context {
                path,
                line,
                content,
            } => format!("{}-{}-{}", path, line, content),
            StructuredRecord::Separator => "--".to_string(),
            StructuredRecord::Line { text } => text.clone(),
            StructuredRecord::Entry { path, .. } => path.clone(),
            StructuredRecord::Capture {
                value,
                start,
                end,
                groups,
            } => {
                if groups.is_empty() {
                    format!("[{}:{}] {}", start, end, value)
                } else {
                    let rendered = groups
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("[{}:{}] {} | groups: {}", start, end, value, rendered)
                }
            }
            StructuredRecord::ParseFailure { raw } => raw.clone(),
        }
    }
}
