// scout-core/src/plan/grep.rs

//! Content-search plans (`grep_plan_v1`, `grep_plan_v2`, flags).

use super::fields::{check_pattern_value, parse_document, schema_of, Fields};
use super::{
    non_negative_flag, opt_positive_flag, positive_flag, resolve_root, sorted_set, Case, OutputFormat,
    Policy, CLI_SCHEMA,
};
use crate::errors::ScoutError;
use crate::records::{canonical_patterns, Pattern, PatternKind};
use crate::stamp::query_stamp;
use serde_json::{json, Value};
use std::path::PathBuf;

pub const GREP_SCHEMAS: &[&str] = &["grep_plan_v1", "grep_plan_v2"];
pub const GREP_KINDS: &[PatternKind] = &[PatternKind::Fixed, PatternKind::Regex];
/// Pattern length bound applied to `grep_plan_v1`, which has no `limits` block.
pub const V1_MAX_PATTERN_LENGTH: usize = 512;
pub const DEFAULT_MAX_LINES: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct GrepPlan {
    pub schema: String,
    pub root: PathBuf,
    pub patterns: Vec<Pattern>,
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub case: Case,
    pub context: usize,
    pub format: OutputFormat,
    pub max_lines: usize,
    pub max_files: Option<usize>,
    pub max_matches: Option<usize>,
    pub max_pattern_length: usize,
    pub parallelism: usize,
    pub policy: Policy,
    /// Explicit file list (relative to root) replacing the whole-tree search.
    pub files: Option<Vec<String>>,
}

/// Raw flag values, validated by [`GrepPlan::from_flags`].
#[derive(Debug, Clone)]
pub struct GrepFlags {
    pub root: String,
    pub patterns: Vec<String>,
    pub globs: Vec<String>,
    pub excludes: Vec<String>,
    pub mode: String,
    pub case: String,
    pub context: i64,
    pub format: String,
    pub max_lines: i64,
    pub max_files: Option<i64>,
    pub max_matches: Option<i64>,
    pub parallelism: i64,
    pub hidden: bool,
    pub follow: bool,
    pub no_ignore: bool,
    pub max_pattern_length: usize,
}

/// Fields shared by `grep_plan_v2` and the `search` half of a scan plan.
pub(crate) struct SearchBody {
    pub patterns: Vec<Pattern>,
    pub case: Case,
    pub context: usize,
    pub max_lines: usize,
    pub max_files: Option<usize>,
    pub max_matches: Option<usize>,
    pub max_pattern_length: usize,
    pub parallelism: usize,
    pub policy: Policy,
}

impl SearchBody {
    pub(crate) const KEYS: &'static [&'static str] = &[
        "content_patterns",
        "case",
        "context",
        "max_lines",
        "max_files",
        "max_matches",
        "parallelism",
        "policy",
        "limits",
    ];

    pub(crate) fn parse(search: &Fields<'_>) -> Result<Self, ScoutError> {
        search.require(Self::KEYS)?;
        let limits = search.nested("limits")?;
        let max_pattern_length = limits.positive_int("max_pattern_length")?;
        let patterns = search.pattern_list("content_patterns", GREP_KINDS, max_pattern_length)?;
        if patterns.is_empty() {
            return Err(ScoutError::validation(
                search.path("content_patterns"),
                "must be a non-empty array",
            ));
        }
        Ok(Self {
            patterns: canonical_patterns(patterns),
            case: Case::parse(&search.path("case"), &search.one_of("case", Case::NAMES)?)?,
            context: search.non_negative_int("context")?,
            max_lines: search.positive_int("max_lines")?,
            max_files: search.opt_positive_int("max_files")?,
            max_matches: search.opt_positive_int("max_matches")?,
            max_pattern_length,
            parallelism: search.positive_int("parallelism")?,
            policy: Policy::from_fields(&search.nested("policy")?)?,
        })
    }

    pub(crate) fn into_plan(
        self,
        schema: &str,
        root: PathBuf,
        format: OutputFormat,
        include_globs: Vec<String>,
        exclude_globs: Vec<String>,
    ) -> GrepPlan {
        GrepPlan {
            schema: schema.to_string(),
            root,
            patterns: self.patterns,
            include_globs: sorted_set(include_globs),
            exclude_globs: sorted_set(exclude_globs),
            case: self.case,
            context: self.context,
            format,
            max_lines: self.max_lines,
            max_files: self.max_files,
            max_matches: self.max_matches,
            max_pattern_length: self.max_pattern_length,
            parallelism: self.parallelism,
            policy: self.policy,
            files: None,
        }
    }
}

impl GrepPlan {
    pub fn from_flags(flags: GrepFlags) -> Result<Self, ScoutError> {
        let kind = match PatternKind::parse(&flags.mode) {
            Some(kind) if GREP_KINDS.contains(&kind) => kind,
            _ => return Err(ScoutError::validation("mode", "must be one of: fixed, regex")),
        };
        if flags.patterns.is_empty() {
            return Err(ScoutError::validation("pattern", "at least one pattern is required"));
        }
        let mut patterns = Vec::with_capacity(flags.patterns.len());
        for (i, value) in flags.patterns.into_iter().enumerate() {
            check_pattern_value(&format!("pattern[{}]", i), &value, flags.max_pattern_length)?;
            patterns.push(Pattern::new(kind, value));
        }
        Ok(GrepPlan {
            schema: CLI_SCHEMA.to_string(),
            root: resolve_root("root", &flags.root)?,
            patterns: canonical_patterns(patterns),
            include_globs: sorted_set(flags.globs),
            exclude_globs: sorted_set(flags.excludes),
            case: Case::parse("case", &flags.case)?,
            context: non_negative_flag("context", flags.context)?,
            format: OutputFormat::parse("format", &flags.format)?,
            max_lines: positive_flag("max_lines", flags.max_lines)?,
            max_files: opt_positive_flag("max_files", flags.max_files)?,
            max_matches: opt_positive_flag("max_matches", flags.max_matches)?,
            max_pattern_length: flags.max_pattern_length,
            parallelism: positive_flag("parallelism", flags.parallelism)?,
            policy: Policy {
                hidden: flags.hidden,
                follow: flags.follow,
                no_ignore: flags.no_ignore,
            },
            files: None,
        })
    }

    pub fn from_stdin(raw: &str) -> Result<Self, ScoutError> {
        Self::from_document(&parse_document(raw)?)
    }

    pub fn from_document(document: &Value) -> Result<Self, ScoutError> {
        let schema = schema_of(document, GREP_SCHEMAS)?;
        let top = Fields::new(document, "")?;
        let search = top.nested("search")?;
        match schema.as_str() {
            "grep_plan_v1" => Self::from_v1(&schema, &search),
            _ => Self::from_v2(&schema, &search),
        }
    }

    fn from_v1(schema: &str, search: &Fields<'_>) -> Result<Self, ScoutError> {
        search.require(&[
            "root",
            "pattern",
            "glob",
            "exclude",
            "mode",
            "case",
            "context",
            "format",
            "max_lines",
            "max_files",
            "max_matches",
            "parallelism",
            "policy",
        ])?;
        let kind = match search.one_of("mode", &["fixed", "regex"])?.as_str() {
            "fixed" => PatternKind::Fixed,
            _ => PatternKind::Regex,
        };
        let values = search.string_list("pattern")?;
        if values.is_empty() {
            return Err(ScoutError::validation(search.path("pattern"), "at least one pattern is required"));
        }
        let mut patterns = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            check_pattern_value(
                &format!("{}[{}]", search.path("pattern"), i),
                &value,
                V1_MAX_PATTERN_LENGTH,
            )?;
            patterns.push(Pattern::new(kind, value));
        }
        Ok(GrepPlan {
            schema: schema.to_string(),
            root: resolve_root(&search.path("root"), &search.string("root")?)?,
            patterns: canonical_patterns(patterns),
            include_globs: sorted_set(search.string_list("glob")?),
            exclude_globs: sorted_set(search.string_list("exclude")?),
            case: Case::parse(&search.path("case"), &search.one_of("case", Case::NAMES)?)?,
            context: search.non_negative_int("context")?,
            format: OutputFormat::parse(&search.path("format"), &search.one_of("format", OutputFormat::NAMES)?)?,
            max_lines: search.positive_int("max_lines")?,
            max_files: search.opt_positive_int("max_files")?,
            max_matches: search.opt_positive_int("max_matches")?,
            max_pattern_length: V1_MAX_PATTERN_LENGTH,
            parallelism: search.positive_int("parallelism")?,
            policy: Policy::from_fields(&search.nested("policy")?)?,
            files: None,
        })
    }

    fn from_v2(schema: &str, search: &Fields<'_>) -> Result<Self, ScoutError> {
        search.require(&["root", "file_filters", "format"])?;
        let body = SearchBody::parse(search)?;
        let filters = search.nested("file_filters")?;
        filters.require(&["include_globs", "exclude_globs"])?;
        let root = resolve_root(&search.path("root"), &search.string("root")?)?;
        let format = OutputFormat::parse(&search.path("format"), &search.one_of("format", OutputFormat::NAMES)?)?;
        Ok(body.into_plan(
            schema,
            root,
            format,
            filters.string_list("include_globs")?,
            filters.string_list("exclude_globs")?,
        ))
    }

    /// Fields that change the result set. Rendering and scheduling knobs
    /// (format, parallelism, schema) are left out so equal queries stamp equal.
    pub fn stamp_fields(&self) -> Value {
        json!({
            "root": self.root.to_string_lossy(),
            "content_patterns": self.patterns.iter().map(Pattern::to_json).collect::<Vec<_>>(),
            "include_globs": self.include_globs,
            "exclude_globs": self.exclude_globs,
            "case": self.case.as_str(),
            "context": self.context,
            "policy": self.policy.to_json(),
            "max_lines": self.max_lines,
            "max_files": self.max_files,
            "max_matches": self.max_matches,
        })
    }

    pub fn query_id(&self) -> String {
        query_stamp(&self.stamp_fields())
    }

    /// The single pattern kind shared by every pattern, if there is one.
    pub fn uniform_mode(&self) -> Option<PatternKind> {
        let first = self.patterns.first()?.kind;
        self.patterns.iter().all(|p| p.kind == first).then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn flags(root: &str) -> GrepFlags {
        GrepFlags {
            root: root.to_string(),
            patterns: vec!["beta".to_string(), "alpha".to_string()],
            globs: vec!["*.rs".to_string()],
            excludes: vec![],
            mode: "fixed".to_string(),
            case: "smart".to_string(),
            context: 0,
            format: "jsonl".to_string(),
            max_lines: 500,
            max_files: None,
            max_matches: Some(10),
            parallelism: 4,
            hidden: false,
            follow: false,
            no_ignore: false,
            max_pattern_length: 512,
        }
    }

    fn v2_document(root: &str) -> Value {
        json!({
            "schema": "grep_plan_v2",
            "search": {
                "root": root,
                "content_patterns": [
                    {"kind": "fixed", "value": "alpha"},
                    {"kind": "fixed", "value": "beta"}
                ],
                "file_filters": {"include_globs": ["*.rs"], "exclude_globs": []},
                "case": "smart",
                "context": 0,
                "format": "human",
                "max_lines": 500,
                "max_files": null,
                "max_matches": 10,
                "parallelism": 2,
                "policy": {"hidden": false, "follow": false, "no_ignore": false},
                "limits": {"max_pattern_length": 512}
            }
        })
    }

    #[test]
    fn patterns_are_sorted_by_kind_then_value() {
        let dir = tempdir().unwrap();
        let plan = GrepPlan::from_flags(flags(&dir.path().to_string_lossy())).unwrap();
        let values: Vec<&str> = plan.patterns.iter().map(|p| p.value.as_str()).collect();
        assert_eq!(values, vec!["alpha", "beta"]);
        assert_eq!(plan.schema, CLI_SCHEMA);
        assert_eq!(plan.uniform_mode(), Some(PatternKind::Fixed));
    }

    #[test]
    fn flags_and_document_stamp_equal() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let from_flags = GrepPlan::from_flags(flags(&root)).unwrap();
        let from_doc = GrepPlan::from_document(&v2_document(&root)).unwrap();
        // Format and parallelism differ; neither is semantic.
        assert_ne!(from_flags.format, from_doc.format);
        assert_eq!(from_flags.query_id(), from_doc.query_id());
    }

    #[test]
    fn semantic_changes_change_stamp() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let base = GrepPlan::from_flags(flags(&root)).unwrap();

        let mut other = flags(&root);
        other.max_matches = Some(11);
        assert_ne!(base.query_id(), GrepPlan::from_flags(other).unwrap().query_id());

        let mut other = flags(&root);
        other.patterns = vec!["alpha".to_string(), "gamma".to_string()];
        assert_ne!(base.query_id(), GrepPlan::from_flags(other).unwrap().query_id());

        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let other = flags(&sub.to_string_lossy());
        assert_ne!(base.query_id(), GrepPlan::from_flags(other).unwrap().query_id());
    }

    #[test]
    fn missing_v2_field_is_named() {
        let dir = tempdir().unwrap();
        let mut doc = v2_document(&dir.path().to_string_lossy());
        doc["search"]["limits"] = json!({});
        let err = GrepPlan::from_document(&doc).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid plan: search.limits.max_pattern_length: must be a positive integer"
        );
    }

    #[test]
    fn v1_document_uses_global_mode() {
        let dir = tempdir().unwrap();
        let doc = json!({
            "schema": "grep_plan_v1",
            "search": {
                "root": dir.path().to_string_lossy(),
                "pattern": ["fn\\s+main"],
                "glob": null,
                "exclude": ["target/**"],
                "mode": "regex",
                "case": "sensitive",
                "context": 2,
                "format": "jsonl",
                "max_lines": 100,
                "max_files": 5,
                "max_matches": null,
                "parallelism": 1,
                "policy": {}
            }
        });
        let plan = GrepPlan::from_document(&doc).unwrap();
        assert_eq!(plan.patterns, vec![Pattern::new(PatternKind::Regex, "fn\\s+main")]);
        assert_eq!(plan.exclude_globs, vec!["target/**".to_string()]);
        assert_eq!(plan.case, Case::Sensitive);
        assert_eq!(plan.max_files, Some(5));
        assert_eq!(plan.policy, Policy::default());
    }

    #[test]
    fn invalid_flags_fail_closed() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();

        let mut bad = flags(&root);
        bad.max_lines = 0;
        assert!(GrepPlan::from_flags(bad).is_err());

        let mut bad = flags(&root);
        bad.mode = "glob".to_string();
        assert!(GrepPlan::from_flags(bad).is_err());

        let mut bad = flags(&root);
        bad.patterns = vec!["x".repeat(513)];
        assert!(GrepPlan::from_flags(bad).is_err());

        let mut bad = flags(&root);
        bad.patterns.clear();
        assert!(GrepPlan::from_flags(bad).is_err());

        let bad = flags(&format!("{}/missing", root));
        assert!(GrepPlan::from_flags(bad).is_err());
    }

    #[test]
    fn unknown_schema_is_rejected() {
        let err = GrepPlan::from_stdin(r#"{"schema":"grep_plan_v3","search":{}}"#).unwrap_err();
        assert!(err.to_string().contains("schema"));
    }
}
