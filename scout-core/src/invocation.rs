// scout-core/src/invocation.rs

//! Translation of normalized plans into concrete argument vectors. Pure:
//! nothing here touches the filesystem or starts a process.

use crate::plan::diff::{Comparison, DiffPlan, DiscoveryPlan, Whitespace};
use crate::plan::find::{EntryTypeFilter, FindPlan, Strategy};
use crate::plan::grep::GrepPlan;
use crate::plan::Case;
use crate::records::{Pattern, PatternKind};
use crate::errors::ScoutError;
use globset::Glob;
use std::path::{Path, PathBuf};

/// One external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// The plan pattern this invocation searches for, used to tag its output.
    pub pattern: Option<Pattern>,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: cwd.into(),
            pattern: None,
        }
    }

    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone()).chain(self.args.iter().cloned()).collect()
    }
}

/// One ripgrep invocation per content pattern, in plan pattern order.
pub fn grep_invocations(plan: &GrepPlan, program: &str) -> Vec<Invocation> {
    plan.patterns
        .iter()
        .map(|pattern| {
            let mut args: Vec<String> = ["--line-number", "--with-filename", "--no-heading", "--color", "never"]
                .iter()
                .map(|s| s.to_string())
                .collect();
            if pattern.kind == PatternKind::Fixed {
                args.push("--fixed-strings".to_string());
            }
            args.push(
                match plan.case {
                    Case::Smart => "--smart-case",
                    Case::Sensitive => "--case-sensitive",
                    Case::Insensitive => "--ignore-case",
                }
                .to_string(),
            );
            if plan.context > 0 {
                args.push("--context".to_string());
                args.push(plan.context.to_string());
            }
            push_policy(&mut args, plan.policy.hidden, plan.policy.follow, plan.policy.no_ignore);
            for glob in &plan.include_globs {
                args.push("--glob".to_string());
                args.push(glob.clone());
            }
            for glob in &plan.exclude_globs {
                args.push("--glob".to_string());
                args.push(format!("!{}", glob));
            }
            args.push("--".to_string());
            args.push(pattern.value.clone());
            match &plan.files {
                Some(files) => args.extend(files.iter().cloned()),
                None => args.push(".".to_string()),
            }
            Invocation {
                program: program.to_string(),
                args,
                cwd: plan.root.clone(),
                pattern: Some(pattern.clone()),
            }
        })
        .collect()
}

fn push_policy(args: &mut Vec<String>, hidden: bool, follow: bool, no_ignore: bool) {
    if hidden {
        args.push("--hidden".to_string());
    }
    if follow {
        args.push("--follow".to_string());
    }
    if no_ignore {
        args.push("--no-ignore".to_string());
    }
}

fn fd_common_args(plan: &FindPlan) -> Vec<String> {
    let mut args = Vec::new();
    match plan.entry_type {
        EntryTypeFilter::File => args.extend(["--type".to_string(), "f".to_string()]),
        EntryTypeFilter::Directory => args.extend(["--type".to_string(), "d".to_string()]),
        EntryTypeFilter::Any => {}
    }
    if let Some(depth) = plan.max_depth {
        args.push("--max-depth".to_string());
        args.push(depth.to_string());
    }
    push_policy(&mut args, plan.policy.hidden, plan.policy.follow, plan.policy.no_ignore);
    for extension in &plan.extensions {
        args.push("--extension".to_string());
        args.push(extension.clone());
    }
    for exclude in plan.fd_excludes() {
        args.push("--exclude".to_string());
        args.push(exclude.to_string());
    }
    args
}

/// fd invocations for an enumeration plan, run with the root as working
/// directory so fd reports root-relative paths.
pub fn find_invocations(plan: &FindPlan, program: &str) -> Result<Vec<Invocation>, ScoutError> {
    let single = |args: Vec<String>, pattern: Option<Pattern>| Invocation {
        program: program.to_string(),
        args,
        cwd: plan.root.clone(),
        pattern,
    };

    if plan.include_patterns.is_empty() {
        let mut args = fd_common_args(plan);
        args.push(".".to_string());
        return Ok(vec![single(args, None)]);
    }

    match plan.strategy {
        Strategy::FanOut => Ok(plan
            .include_patterns
            .iter()
            .map(|pattern| {
                let mut args = fd_common_args(plan);
                if pattern.kind == PatternKind::Glob {
                    args.push("--glob".to_string());
                }
                args.push(pattern.value.clone());
                single(args, Some(pattern.clone()))
            })
            .collect()),
        Strategy::Combined => {
            let mut args = fd_common_args(plan);
            args.push(combined_glob_regex(&plan.include_patterns)?);
            Ok(vec![single(args, None)])
        }
    }
}

/// Alternation of the regex translation of every glob, in the given order.
pub fn combined_glob_regex(patterns: &[Pattern]) -> Result<String, ScoutError> {
    let mut alternatives = Vec::with_capacity(patterns.len());
    for (i, pattern) in patterns.iter().enumerate() {
        let glob = Glob::new(&pattern.value)
            .map_err(|e| ScoutError::validation(format!("pattern[{}]", i), format!("invalid glob: {}", e)))?;
        // globset emits byte-oriented regexes; fd matches UTF-8 names.
        let regex = glob.regex().trim_start_matches("(?-u)").to_string();
        alternatives.push(format!("(?:{})", regex));
    }
    Ok(alternatives.join("|"))
}

fn comparison_args(args: &mut Vec<String>, comparison: &Comparison) {
    match comparison {
        Comparison::WorkingTree => {}
        Comparison::Staged => args.push("--cached".to_string()),
        Comparison::CommitRange { base_ref, head_ref } => {
            args.push(base_ref.clone());
            args.push(head_ref.clone());
        }
    }
}

fn path_args(args: &mut Vec<String>, paths: &[String]) {
    if !paths.is_empty() {
        args.push("--".to_string());
        args.extend(paths.iter().cloned());
    }
}

pub fn git(program: &str, cwd: &Path, args: &[&str]) -> Invocation {
    Invocation::new(program, args.iter().map(|s| s.to_string()).collect(), cwd)
}

pub fn diff_discovery_invocation(plan: &DiscoveryPlan, program: &str) -> Invocation {
    let mut args = vec!["diff".to_string(), "--name-status".to_string()];
    comparison_args(&mut args, &plan.comparison);
    path_args(&mut args, &plan.paths);
    Invocation::new(program, args, &plan.root)
}

pub fn diff_numstat_invocation(plan: &DiffPlan, program: &str) -> Invocation {
    let mut args = vec!["diff".to_string(), "--numstat".to_string()];
    comparison_args(&mut args, &plan.comparison);
    if plan.rename_detection {
        args.push("-M".to_string());
    }
    if plan.ignore_cr_at_eol {
        args.push("--ignore-cr-at-eol".to_string());
    }
    match plan.whitespace {
        Whitespace::None => {}
        Whitespace::IgnoreSpaceChange => args.push("-b".to_string()),
        Whitespace::IgnoreAllSpace => args.push("-w".to_string()),
    }
    path_args(&mut args, &plan.paths);
    Invocation::new(program, args, &plan.root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::find::FindFlags;
    use crate::plan::grep::GrepFlags;
    use tempfile::tempdir;

    fn grep_plan(root: &Path, mode: &str, case: &str) -> GrepPlan {
        GrepPlan::from_flags(GrepFlags {
            root: root.to_string_lossy().to_string(),
            patterns: vec!["b".to_string(), "a".to_string()],
            globs: vec!["*.rs".to_string()],
            excludes: vec!["target/**".to_string()],
            mode: mode.to_string(),
            case: case.to_string(),
            context: 2,
            format: "jsonl".to_string(),
            max_lines: 10,
            max_files: None,
            max_matches: None,
            parallelism: 2,
            hidden: true,
            follow: false,
            no_ignore: false,
            max_pattern_length: 512,
        })
        .unwrap()
    }

    #[test]
    fn grep_fans_out_one_invocation_per_pattern() {
        let dir = tempdir().unwrap();
        let plan = grep_plan(dir.path(), "fixed", "insensitive");
        let invocations = grep_invocations(&plan, "rg");
        assert_eq!(invocations.len(), 2);
        assert_eq!(
            invocations[0].argv(),
            vec![
                "rg", "--line-number", "--with-filename", "--no-heading", "--color", "never",
                "--fixed-strings", "--ignore-case", "--context", "2", "--hidden",
                "--glob", "*.rs", "--glob", "!target/**", "--", "a", "."
            ]
        );
        assert_eq!(invocations[1].pattern.as_ref().unwrap().value, "b");
        assert_eq!(invocations[0].cwd, plan.root);
    }

    #[test]
    fn grep_with_file_list_replaces_dot() {
        let dir = tempdir().unwrap();
        let mut plan = grep_plan(dir.path(), "regex", "sensitive");
        plan.files = Some(vec!["src/lib.rs".to_string(), "src/main.rs".to_string()]);
        let args = &grep_invocations(&plan, "rg")[0].args;
        assert!(!args.contains(&"--fixed-strings".to_string()));
        assert!(args.contains(&"--case-sensitive".to_string()));
        assert_eq!(&args[args.len() - 2..], &["src/lib.rs".to_string(), "src/main.rs".to_string()]);
    }

    fn find_flags(root: &Path) -> FindFlags {
        FindFlags {
            root: root.to_string_lossy().to_string(),
            patterns: vec!["*.rs".to_string(), "*.md".to_string()],
            extensions: vec!["rs".to_string()],
            excludes: vec!["target".to_string()],
            entry_type: "file".to_string(),
            max_depth: Some(3),
            max_results: 100,
            format: "jsonl".to_string(),
            hidden: false,
            follow: false,
            no_ignore: true,
            max_pattern_length: 512,
        }
    }

    #[test]
    fn fd_fan_out_argv() {
        let dir = tempdir().unwrap();
        let plan = FindPlan::from_flags(find_flags(dir.path()), Strategy::FanOut).unwrap();
        let invocations = find_invocations(&plan, "fdfind").unwrap();
        assert_eq!(invocations.len(), 2);
        assert_eq!(
            invocations[0].argv(),
            vec![
                "fdfind", "--type", "f", "--max-depth", "3", "--no-ignore", "--extension", "rs",
                "--exclude", "target", "--glob", "*.md"
            ]
        );
    }

    #[test]
    fn fd_without_patterns_lists_everything() {
        let dir = tempdir().unwrap();
        let mut flags = find_flags(dir.path());
        flags.patterns.clear();
        flags.entry_type = "any".to_string();
        let plan = FindPlan::from_flags(flags, Strategy::FanOut).unwrap();
        let invocations = find_invocations(&plan, "fd").unwrap();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].args.last().unwrap(), ".");
        assert!(!invocations[0].args.contains(&"--type".to_string()));
    }

    #[test]
    fn combined_glob_is_one_anchored_alternation() {
        let dir = tempdir().unwrap();
        let plan = FindPlan::from_flags(find_flags(dir.path()), Strategy::Combined).unwrap();
        let invocations = find_invocations(&plan, "fd").unwrap();
        assert_eq!(invocations.len(), 1);
        let combined = invocations[0].args.last().unwrap().clone();
        assert!(combined.starts_with("(?:"));
        assert!(!combined.contains("(?-u)"));
        let regex = regex::Regex::new(&combined).unwrap();
        assert!(regex.is_match("main.rs"));
        assert!(regex.is_match("README.md"));
        assert!(!regex.is_match("main.rsx"));
    }

    #[test]
    fn diff_argv() {
        let dir = tempdir().unwrap();
        let root = serde_json::to_string(&dir.path().to_string_lossy()).unwrap();
        let plan = DiffPlan::from_stdin(&format!(
            r#"{{"schema": "diff_plan_v1", "root": {},
                "scope": {{"comparison": "commit_range", "base_ref": "v1", "paths": ["src"]}},
                "normalization": {{"whitespace": "ignore_space_change"}}, "rename_detection": true}}"#,
            root
        ))
        .unwrap();
        assert_eq!(
            diff_numstat_invocation(&plan, "git").argv(),
            vec!["git", "diff", "--numstat", "v1", "HEAD", "-M", "-b", "--", "src"]
        );

        let plan = DiscoveryPlan::from_stdin(&format!(
            r#"{{"schema": "diff_discovery_plan_v1", "root": {}, "scope": {{"mode": "staged"}}}}"#,
            root
        ))
        .unwrap();
        assert_eq!(
            diff_discovery_invocation(&plan, "git").argv(),
            vec!["git", "diff", "--name-status", "--cached"]
        );
    }
}
