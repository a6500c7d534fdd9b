// scout-core/src/plan/find.rs

//! File-enumeration plans for the `find` (fan-out) and `glob` (combined)
//! skills.

use super::fields::{check_pattern_value, parse_document, schema_of, Fields};
use super::{opt_positive_flag, positive_flag, resolve_root, sorted_set, OutputFormat, Policy, CLI_SCHEMA};
use crate::errors::ScoutError;
use crate::records::{canonical_patterns, Pattern, PatternKind};
use crate::stamp::query_stamp;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde_json::{json, Value};
use std::path::PathBuf;

pub const FIND_SCHEMAS: &[&str] = &["find_plan_v1", "find_plan_v2"];
pub const FIND_KINDS: &[PatternKind] = &[PatternKind::Glob, PatternKind::Regex];
pub const DEFAULT_MAX_RESULTS: usize = 1000;
pub const V1_MAX_PATTERN_LENGTH: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryTypeFilter {
    File,
    Directory,
    Any,
}

impl EntryTypeFilter {
    pub const NAMES: &'static [&'static str] = &["file", "directory", "any"];

    pub fn parse(field: &str, s: &str) -> Result<Self, ScoutError> {
        match s {
            "file" => Ok(EntryTypeFilter::File),
            "directory" => Ok(EntryTypeFilter::Directory),
            "any" => Ok(EntryTypeFilter::Any),
            _ => Err(ScoutError::validation(field, "must be one of: file, directory, any")),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryTypeFilter::File => "file",
            EntryTypeFilter::Directory => "directory",
            EntryTypeFilter::Any => "any",
        }
    }
}

/// How include patterns map onto fd invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One invocation per include pattern, results unioned.
    FanOut,
    /// One invocation whose regex is the alternation of every include glob.
    Combined,
}

/// Post-union exclude filter, compiled during normalization so an invalid
/// pattern is rejected before anything runs.
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    globs: GlobSet,
    regexes: Vec<Regex>,
}

impl ExcludeFilter {
    pub fn compile(field: &str, patterns: &[Pattern]) -> Result<Self, ScoutError> {
        let mut builder = GlobSetBuilder::new();
        let mut regexes = Vec::new();
        for (i, pattern) in patterns.iter().enumerate() {
            match pattern.kind {
                PatternKind::Glob => {
                    let glob = Glob::new(&pattern.value).map_err(|e| {
                        ScoutError::validation(format!("{}[{}]", field, i), format!("invalid exclude glob: {}", e))
                    })?;
                    builder.add(glob);
                }
                PatternKind::Regex => {
                    let regex = Regex::new(&pattern.value).map_err(|e| {
                        ScoutError::validation(
                            format!("{}[{}]", field, i),
                            format!("invalid exclude regex '{}': {}", pattern.value, e),
                        )
                    })?;
                    regexes.push(regex);
                }
                PatternKind::Fixed => {
                    return Err(ScoutError::validation(
                        format!("{}[{}].kind", field, i),
                        "must be one of: glob, regex",
                    ))
                }
            }
        }
        let globs = builder
            .build()
            .map_err(|e| ScoutError::validation(field, format!("invalid exclude globs: {}", e)))?;
        Ok(Self { globs, regexes })
    }

    pub fn excludes(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        self.globs.is_match(&normalized) || self.regexes.iter().any(|r| r.is_match(&normalized))
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty() && self.regexes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct FindPlan {
    pub schema: String,
    pub strategy: Strategy,
    pub root: PathBuf,
    pub include_patterns: Vec<Pattern>,
    pub exclude_patterns: Vec<Pattern>,
    pub extensions: Vec<String>,
    pub entry_type: EntryTypeFilter,
    pub max_depth: Option<usize>,
    pub max_results: usize,
    pub format: OutputFormat,
    pub policy: Policy,
    pub excluder: ExcludeFilter,
}

#[derive(Debug, Clone)]
pub struct FindFlags {
    pub root: String,
    pub patterns: Vec<String>,
    pub extensions: Vec<String>,
    pub excludes: Vec<String>,
    pub entry_type: String,
    pub max_depth: Option<i64>,
    pub max_results: i64,
    pub format: String,
    pub hidden: bool,
    pub follow: bool,
    pub no_ignore: bool,
    pub max_pattern_length: usize,
}

/// Fields shared by `find_plan_v2` and the `surface` half of a scan plan.
pub(crate) struct SurfaceBody {
    pub include_patterns: Vec<Pattern>,
    pub exclude_patterns: Vec<Pattern>,
    pub extensions: Vec<String>,
    pub entry_type: EntryTypeFilter,
    pub max_depth: Option<usize>,
    pub max_results: usize,
    pub policy: Policy,
}

impl SurfaceBody {
    pub(crate) const KEYS: &'static [&'static str] = &[
        "include_patterns",
        "exclude_patterns",
        "extensions",
        "type",
        "max_depth",
        "max_results",
        "policy",
        "limits",
    ];

    pub(crate) fn parse(find: &Fields<'_>) -> Result<Self, ScoutError> {
        find.require(Self::KEYS)?;
        let limits = find.nested("limits")?;
        let max_pattern_length = limits.positive_int("max_pattern_length")?;
        let max_exclude_length = limits.positive_int("max_exclude_pattern_length")?;
        Ok(Self {
            include_patterns: find.pattern_list("include_patterns", FIND_KINDS, max_pattern_length)?,
            exclude_patterns: find.pattern_list("exclude_patterns", FIND_KINDS, max_exclude_length)?,
            extensions: find.string_list("extensions")?,
            entry_type: EntryTypeFilter::parse(&find.path("type"), &find.one_of("type", EntryTypeFilter::NAMES)?)?,
            max_depth: find.opt_positive_int("max_depth")?,
            max_results: find.positive_int("max_results")?,
            policy: Policy::from_fields(&find.nested("policy")?)?,
        })
    }

    pub(crate) fn into_plan(self, schema: &str, root: PathBuf, format: OutputFormat, field: &str) -> Result<FindPlan, ScoutError> {
        FindPlan::assemble(
            schema,
            Strategy::FanOut,
            root,
            self.include_patterns,
            self.exclude_patterns,
            self.extensions,
            self.entry_type,
            self.max_depth,
            self.max_results,
            format,
            self.policy,
            field,
        )
    }
}

impl FindPlan {
    #[allow(clippy::too_many_arguments)]
    fn assemble(
        schema: &str,
        strategy: Strategy,
        root: PathBuf,
        include_patterns: Vec<Pattern>,
        exclude_patterns: Vec<Pattern>,
        extensions: Vec<String>,
        entry_type: EntryTypeFilter,
        max_depth: Option<usize>,
        max_results: usize,
        format: OutputFormat,
        policy: Policy,
        exclude_field: &str,
    ) -> Result<Self, ScoutError> {
        let exclude_patterns = canonical_patterns(exclude_patterns);
        let excluder = ExcludeFilter::compile(exclude_field, &exclude_patterns)?;
        Ok(Self {
            schema: schema.to_string(),
            strategy,
            root,
            include_patterns: canonical_patterns(include_patterns),
            exclude_patterns,
            extensions: sorted_set(extensions),
            entry_type,
            max_depth,
            max_results,
            format,
            policy,
            excluder,
        })
    }

    /// Flag form for `find` (fan-out) and `glob` (combined). Every flag
    /// pattern and exclude is a glob.
    pub fn from_flags(flags: FindFlags, strategy: Strategy) -> Result<Self, ScoutError> {
        let globs = |field: &str, values: Vec<String>| -> Result<Vec<Pattern>, ScoutError> {
            values
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    check_pattern_value(&format!("{}[{}]", field, i), &value, flags.max_pattern_length)?;
                    Ok(Pattern::new(PatternKind::Glob, value))
                })
                .collect()
        };
        let include = globs("pattern", flags.patterns.clone())?;
        let exclude = globs("exclude", flags.excludes.clone())?;
        if strategy == Strategy::Combined {
            for (i, pattern) in include.iter().enumerate() {
                Glob::new(&pattern.value).map_err(|e| {
                    ScoutError::validation(format!("pattern[{}]", i), format!("invalid glob: {}", e))
                })?;
            }
        }
        let max_depth = opt_positive_flag("max_depth", flags.max_depth)?;
        Self::assemble(
            CLI_SCHEMA,
            strategy,
            resolve_root("root", &flags.root)?,
            include,
            exclude,
            flags.extensions,
            EntryTypeFilter::parse("type", &flags.entry_type)?,
            max_depth,
            positive_flag("max_results", flags.max_results)?,
            OutputFormat::parse("format", &flags.format)?,
            Policy {
                hidden: flags.hidden,
                follow: flags.follow,
                no_ignore: flags.no_ignore,
            },
            "exclude",
        )
    }

    pub fn from_stdin(raw: &str) -> Result<Self, ScoutError> {
        Self::from_document(&parse_document(raw)?)
    }

    pub fn from_document(document: &Value) -> Result<Self, ScoutError> {
        let schema = schema_of(document, FIND_SCHEMAS)?;
        let top = Fields::new(document, "")?;
        let find = top.nested("find")?;
        if schema == "find_plan_v1" {
            return Self::from_v1(&schema, &find);
        }
        find.require(&["root", "format"])?;
        let body = SurfaceBody::parse(&find)?;
        let root = resolve_root(&find.path("root"), &find.string("root")?)?;
        let format = OutputFormat::parse(&find.path("format"), &find.one_of("format", OutputFormat::NAMES)?)?;
        body.into_plan(&schema, root, format, &find.path("exclude_patterns"))
    }

    fn from_v1(schema: &str, find: &Fields<'_>) -> Result<Self, ScoutError> {
        find.require(&[
            "root",
            "pattern",
            "extension",
            "exclude",
            "type",
            "max_depth",
            "max_results",
            "format",
            "policy",
        ])?;
        let globs = |key: &str| -> Result<Vec<Pattern>, ScoutError> {
            find.string_list(key)?
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    check_pattern_value(&format!("{}[{}]", find.path(key), i), &value, V1_MAX_PATTERN_LENGTH)?;
                    Ok(Pattern::new(PatternKind::Glob, value))
                })
                .collect()
        };
        Self::assemble(
            schema,
            Strategy::FanOut,
            resolve_root(&find.path("root"), &find.string("root")?)?,
            globs("pattern")?,
            globs("exclude")?,
            find.string_list("extension")?,
            EntryTypeFilter::parse(&find.path("type"), &find.one_of("type", EntryTypeFilter::NAMES)?)?,
            find.opt_positive_int("max_depth")?,
            find.positive_int("max_results")?,
            OutputFormat::parse(&find.path("format"), &find.one_of("format", OutputFormat::NAMES)?)?,
            Policy::from_fields(&find.nested("policy")?)?,
            &find.path("exclude"),
        )
    }

    /// Glob-kind excludes, which fd can apply itself.
    pub fn fd_excludes(&self) -> Vec<&str> {
        self.exclude_patterns
            .iter()
            .filter(|p| p.kind == PatternKind::Glob)
            .map(|p| p.value.as_str())
            .collect()
    }

    pub fn stamp_fields(&self) -> Value {
        if self.strategy == Strategy::Combined {
            let values = |patterns: &[Pattern]| patterns.iter().map(|p| p.value.clone()).collect::<Vec<_>>();
            return json!({
                "root": self.root.to_string_lossy(),
                "patterns": values(&self.include_patterns),
                "extensions": self.extensions,
                "excludes": values(&self.exclude_patterns),
                "type": self.entry_type.as_str(),
                "max_depth": self.max_depth,
                "max_results": self.max_results,
                "policy": self.policy.to_json(),
            });
        }
        json!({
            "root": self.root.to_string_lossy(),
            "include_patterns": self.include_patterns.iter().map(Pattern::to_json).collect::<Vec<_>>(),
            "exclude_patterns": self.exclude_patterns.iter().map(Pattern::to_json).collect::<Vec<_>>(),
            "extensions": self.extensions,
            "type": self.entry_type.as_str(),
            "max_depth": self.max_depth,
            "max_results": self.max_results,
            "policy": self.policy.to_json(),
        })
    }

    pub fn query_id(&self) -> String {
        query_stamp(&self.stamp_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn flags(root: &str) -> FindFlags {
        FindFlags {
            root: root.to_string(),
            patterns: vec!["*.rs".to_string(), "*.md".to_string()],
            extensions: vec![],
            excludes: vec!["target/*".to_string()],
            entry_type: "file".to_string(),
            max_depth: None,
            max_results: 1000,
            format: "jsonl".to_string(),
            hidden: false,
            follow: false,
            no_ignore: false,
            max_pattern_length: 512,
        }
    }

    #[test]
    fn invalid_regex_exclude_fails_closed() {
        let dir = tempdir().unwrap();
        let doc = json!({
            "schema": "find_plan_v2",
            "find": {
                "root": dir.path().to_string_lossy(),
                "include_patterns": [{"kind": "glob", "value": "*.rs"}],
                "exclude_patterns": [{"kind": "regex", "value": "(unclosed"}],
                "extensions": [],
                "type": "file",
                "max_depth": null,
                "max_results": 100,
                "format": "jsonl",
                "policy": {},
                "limits": {"max_pattern_length": 512, "max_exclude_pattern_length": 512}
            }
        });
        let err = FindPlan::from_document(&doc).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("find.exclude_patterns[0]"), "{}", message);
        assert!(message.contains("invalid exclude regex"), "{}", message);
    }

    #[test]
    fn exclude_filter_matches_globs_and_regexes() {
        let filter = ExcludeFilter::compile(
            "exclude",
            &[
                Pattern::new(PatternKind::Glob, "target/*"),
                Pattern::new(PatternKind::Regex, r"\.lock$"),
            ],
        )
        .unwrap();
        assert!(filter.excludes("target/debug/build.rs"));
        assert!(filter.excludes("Cargo.lock"));
        assert!(!filter.excludes("src/main.rs"));
    }

    #[test]
    fn flags_sort_patterns_and_stamp_matches_v1() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_string_lossy().to_string();
        let plan = FindPlan::from_flags(flags(&root), Strategy::FanOut).unwrap();
        assert_eq!(plan.include_patterns[0].value, "*.md");
        assert_eq!(plan.fd_excludes(), vec!["target/*"]);

        let doc = json!({
            "schema": "find_plan_v1",
            "find": {
                "root": root,
                "pattern": ["*.rs", "*.md"],
                "extension": [],
                "exclude": ["target/*"],
                "type": "file",
                "max_depth": null,
                "max_results": 1000,
                "format": "human",
                "policy": {"hidden": false}
            }
        });
        let from_doc = FindPlan::from_document(&doc).unwrap();
        assert_eq!(plan.query_id(), from_doc.query_id());
    }

    #[test]
    fn zero_max_results_is_rejected() {
        let dir = tempdir().unwrap();
        let mut bad = flags(&dir.path().to_string_lossy());
        bad.max_results = 0;
        assert!(FindPlan::from_flags(bad, Strategy::FanOut).is_err());
    }
}
