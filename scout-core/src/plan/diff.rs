// scout-core/src/plan/diff.rs

//! Git diff plans. Both documents must carry their schema tag; the other
//! fields are optional, take the defaults a bare `git diff` would, and are
//! type-checked when present.

use super::fields::{parse_document, schema_of, Fields};
use super::resolve_root;
use crate::errors::ScoutError;
use serde_json::{json, Value};
use std::path::PathBuf;

pub const DISCOVERY_SCHEMA: &str = "diff_discovery_plan_v1";
pub const RUN_SCHEMA: &str = "diff_plan_v1";
pub const DEFAULT_MAX_FILES: usize = 100;
pub const DEFAULT_BASE_REF: &str = "HEAD~1";
pub const DEFAULT_HEAD_REF: &str = "HEAD";

/// What the diff compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// Working tree against the index.
    WorkingTree,
    /// Index against HEAD (`--cached`).
    Staged,
    CommitRange { base_ref: String, head_ref: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whitespace {
    None,
    IgnoreSpaceChange,
    IgnoreAllSpace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryPlan {
    pub root: PathBuf,
    pub comparison: Comparison,
    pub paths: Vec<String>,
    pub max_files: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiffPlan {
    pub root: PathBuf,
    pub comparison: Comparison,
    pub paths: Vec<String>,
    pub max_files: usize,
    pub ignore_cr_at_eol: bool,
    pub whitespace: Whitespace,
    pub rename_detection: bool,
    /// `scope` and `bounds` exactly as submitted, echoed into the output.
    pub scope: Value,
    pub bounds: Value,
}

fn optional<'a>(parent: &Fields<'a>, key: &str) -> Result<Option<Fields<'a>>, ScoutError> {
    match parent.raw(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Fields::new(value, parent.path(key)).map(Some),
    }
}

/// An explicit root must be an existing directory; without one the diff runs
/// in the working directory.
fn root_of(top: &Fields<'_>) -> Result<PathBuf, ScoutError> {
    match top.opt_string("root")? {
        Some(root) => resolve_root(&top.path("root"), &root),
        None => Ok(std::env::current_dir()?),
    }
}

fn paths_of(scope: Option<&Fields<'_>>) -> Result<Vec<String>, ScoutError> {
    match scope {
        Some(scope) if scope.has("paths") => scope.string_list("paths"),
        _ => Ok(Vec::new()),
    }
}

fn max_files_of(top: &Fields<'_>) -> Result<usize, ScoutError> {
    match optional(top, "bounds")? {
        Some(bounds) if bounds.has("max_files") => bounds.positive_int("max_files"),
        _ => Ok(DEFAULT_MAX_FILES),
    }
}

fn comparison_of(scope: Option<&Fields<'_>>, key: &str, names: [&str; 3]) -> Result<Comparison, ScoutError> {
    let scope = match scope {
        Some(scope) if scope.has(key) => scope,
        _ => return Ok(Comparison::WorkingTree),
    };
    let chosen = scope.one_of(key, &names)?;
    if chosen == names[0] {
        Ok(Comparison::WorkingTree)
    } else if chosen == names[1] {
        Ok(Comparison::Staged)
    } else {
        Ok(Comparison::CommitRange {
            base_ref: scope.opt_string("base_ref")?.unwrap_or_else(|| DEFAULT_BASE_REF.to_string()),
            head_ref: scope.opt_string("head_ref")?.unwrap_or_else(|| DEFAULT_HEAD_REF.to_string()),
        })
    }
}

impl DiscoveryPlan {
    pub fn from_stdin(raw: &str) -> Result<Self, ScoutError> {
        let document = parse_document(raw)?;
        schema_of(&document, &[DISCOVERY_SCHEMA])?;
        let top = Fields::new(&document, "")?;
        let scope = optional(&top, "scope")?;
        Ok(DiscoveryPlan {
            root: root_of(&top)?,
            comparison: comparison_of(scope.as_ref(), "mode", ["working_tree", "staged", "commit_range"])?,
            paths: paths_of(scope.as_ref())?,
            max_files: max_files_of(&top)?,
        })
    }
}

impl DiffPlan {
    pub fn from_stdin(raw: &str) -> Result<Self, ScoutError> {
        let document = parse_document(raw)?;
        schema_of(&document, &[RUN_SCHEMA])?;
        let top = Fields::new(&document, "")?;
        let scope = optional(&top, "scope")?;
        let (ignore_cr_at_eol, whitespace) = match optional(&top, "normalization")? {
            Some(norm) => {
                let whitespace = if norm.has("whitespace") {
                    match norm
                        .one_of("whitespace", &["none", "ignore_space_change", "ignore_all_space"])?
                        .as_str()
                    {
                        "ignore_space_change" => Whitespace::IgnoreSpaceChange,
                        "ignore_all_space" => Whitespace::IgnoreAllSpace,
                        _ => Whitespace::None,
                    }
                } else {
                    Whitespace::None
                };
                (norm.bool_or("line_ending", false)?, whitespace)
            }
            None => (false, Whitespace::None),
        };
        Ok(DiffPlan {
            root: root_of(&top)?,
            comparison: comparison_of(
                scope.as_ref(),
                "comparison",
                ["working_tree_vs_index", "index_vs_head", "commit_range"],
            )?,
            paths: paths_of(scope.as_ref())?,
            max_files: max_files_of(&top)?,
            ignore_cr_at_eol,
            whitespace,
            rename_detection: top.bool_or("rename_detection", false)?,
            scope: top.raw("scope").cloned().unwrap_or_else(|| json!({})),
            bounds: top.raw("bounds").cloned().unwrap_or_else(|| json!({})),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn discovery(body: &str) -> Result<DiscoveryPlan, ScoutError> {
        DiscoveryPlan::from_stdin(&format!(r#"{{"schema": "diff_discovery_plan_v1", {}}}"#, body))
    }

    fn run(body: &str) -> Result<DiffPlan, ScoutError> {
        DiffPlan::from_stdin(&format!(r#"{{"schema": "diff_plan_v1", {}}}"#, body))
    }

    fn root_json(dir: &std::path::Path) -> String {
        serde_json::to_string(&dir.to_string_lossy()).unwrap()
    }

    #[test]
    fn discovery_defaults() {
        let dir = tempdir().unwrap();
        let plan = discovery(&format!(r#""root": {}"#, root_json(dir.path()))).unwrap();
        assert_eq!(plan.root, dir.path().canonicalize().unwrap());
        assert_eq!(plan.comparison, Comparison::WorkingTree);
        assert_eq!(plan.max_files, DEFAULT_MAX_FILES);
        assert!(plan.paths.is_empty());
    }

    #[test]
    fn commit_range_defaults_refs() {
        let dir = tempdir().unwrap();
        let plan = discovery(&format!(
            r#""root": {}, "scope": {{"mode": "commit_range", "paths": ["src"]}}, "bounds": {{"max_files": 5}}"#,
            root_json(dir.path())
        ))
        .unwrap();
        assert_eq!(
            plan.comparison,
            Comparison::CommitRange {
                base_ref: "HEAD~1".to_string(),
                head_ref: "HEAD".to_string()
            }
        );
        assert_eq!(plan.paths, vec!["src".to_string()]);
        assert_eq!(plan.max_files, 5);
    }

    #[test]
    fn run_plan_normalization() {
        let dir = tempdir().unwrap();
        let plan = run(&format!(
            r#""root": {},
                "scope": {{"comparison": "index_vs_head"}},
                "normalization": {{"line_ending": true, "whitespace": "ignore_all_space"}},
                "rename_detection": true"#,
            root_json(dir.path())
        ))
        .unwrap();
        assert_eq!(plan.comparison, Comparison::Staged);
        assert!(plan.ignore_cr_at_eol);
        assert_eq!(plan.whitespace, Whitespace::IgnoreAllSpace);
        assert!(plan.rename_detection);
        assert_eq!(plan.scope, json!({"comparison": "index_vs_head"}));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(run(r#""scope": {"comparison": "sideways"}"#).is_err());
        assert!(run(r#""bounds": {"max_files": 0}"#).is_err());
        assert!(DiffPlan::from_stdin(r#"{"schema": "diff_discovery_plan_v1"}"#).is_err());
        let err = discovery(r#""scope": {"paths": "src"}"#).unwrap_err();
        assert!(err.to_string().contains("scope.paths"));
    }

    #[test]
    fn schema_tag_is_required() {
        let dir = tempdir().unwrap();
        let body = format!(r#"{{"root": {}}}"#, root_json(dir.path()));
        for err in [
            DiffPlan::from_stdin(&body).unwrap_err(),
            DiscoveryPlan::from_stdin(&body).unwrap_err(),
        ] {
            match err {
                ScoutError::Validation { field, message } => {
                    assert_eq!(field, "schema");
                    assert!(message.contains("missing schema"), "{}", message);
                }
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }

    #[test]
    fn missing_root_is_rejected_at_normalization() {
        for err in [
            run(r#""root": "/definitely/not/here""#).unwrap_err(),
            discovery(r#""root": "/definitely/not/here""#).unwrap_err(),
        ] {
            match err {
                ScoutError::Validation { field, .. } => assert_eq!(field, "root"),
                other => panic!("expected validation error, got {:?}", other),
            }
        }
    }
}
