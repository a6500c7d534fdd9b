// scout-core/src/skills/ls.rs

//! Bounded directory inventory. The walk is done in-process; git status, when
//! requested, goes through the executor like any other tool.

use super::{Outcome, SkillContext};
use crate::errors::{InvocationError, ScoutError};
use crate::executor::ExitPolicy;
use crate::invocation::git;
use crate::merge::{rank, Rankable};
use crate::normalize::parse_porcelain_z;
use crate::plan::ls::{GitMode, LsPlan, View};
use crate::stamp::canonical_json;
use crate::tools::GIT;
use crate::truncate::{cap_bytes, cap_len, CapKind, TruncationReport};
use anyhow::Context;
use ignore::WalkBuilder;
use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

pub const INVENTORY_FILE: &str = "ls_inventory.json";
pub const RECEIPT_FILE: &str = "ls_receipt.json";
pub const VIEW_FILE: &str = "ls_view.txt";

lazy_static! {
    static ref COARSE_TYPES: HashMap<&'static str, &'static str> = {
        let mut table = HashMap::new();
        let groups: [(&str, &[&str]); 4] = [
            ("code", &["py", "js", "ts", "tsx", "jsx", "go", "rs", "java", "c", "cc", "cpp", "h", "hpp", "rb", "php"]),
            ("doc", &["md", "rst", "txt"]),
            ("config", &["json", "yaml", "yml", "toml", "ini", "cfg", "conf", "xml"]),
            ("binary", &["png", "jpg", "jpeg", "gif", "webp", "svg", "pdf", "zip", "gz", "tar", "7z", "mp3", "mp4"]),
        ];
        for (coarse, extensions) in groups {
            for ext in extensions {
                table.insert(*ext, coarse);
            }
        }
        table
    };
}

/// Coarse category of a file extension; `None` only when there is no extension.
pub fn coarse_type(extension: Option<&str>) -> Option<&'static str> {
    let ext = extension?.to_ascii_lowercase();
    Some(COARSE_TYPES.get(ext.as_str()).copied().unwrap_or("other"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: &'static str,
    pub size_bytes: u64,
    pub mtime_epoch_ms: i64,
    pub extension: Option<String>,
    pub coarse_type: Option<&'static str>,
    pub git_xy: Option<String>,
    pub git_rename_from: Option<String>,
}

impl Rankable for InventoryEntry {
    fn rank_path(&self) -> &str {
        &self.path
    }

    fn rank_size(&self) -> u64 {
        self.size_bytes
    }

    fn rank_mtime(&self) -> i64 {
        self.mtime_epoch_ms
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanError {
    pub path: String,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub entries: Vec<InventoryEntry>,
    pub scanned: usize,
    pub truncated: bool,
    pub errors: Vec<ScanError>,
}

fn relative(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        Err(_) => path.display().to_string(),
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => error_path(err),
        _ => None,
    }
}

fn scan_error(err: &ignore::Error, root: &Path) -> ScanError {
    let kind = match err.io_error().map(|e| e.kind()) {
        Some(std::io::ErrorKind::PermissionDenied) => "permission_denied",
        _ => "io",
    };
    ScanError {
        path: error_path(err).map(|p| relative(p, root)).unwrap_or_else(|| ".".to_string()),
        kind,
        message: err.to_string(),
    }
}

fn type_name(file_type: Option<std::fs::FileType>) -> &'static str {
    match file_type {
        Some(ft) if ft.is_symlink() => "symlink",
        Some(ft) if ft.is_dir() => "dir",
        Some(ft) if ft.is_file() => "file",
        _ => "other",
    }
}

/// Reads the immediate children of `dir` in file-name order. Unreadable
/// children are reported and skipped; an unreadable `dir` yields no children.
fn read_children(dir: &Path, root: &Path, errors: &mut Vec<ScanError>) -> Vec<ignore::DirEntry> {
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .max_depth(Some(1))
        .sort_by_file_name(|a, b| a.cmp(b))
        .build();
    let mut children = Vec::new();
    for result in walker {
        match result {
            Ok(entry) if entry.depth() == 0 => {}
            Ok(entry) => children.push(entry),
            Err(err) => {
                warn!(error = %err, dir = %dir.display(), "Failed to read directory entry");
                errors.push(scan_error(&err, root));
            }
        }
    }
    children
}

/// Walks `plan.root` with an explicit directory stack. Every entry of a
/// directory is recorded before any of its subdirectories is entered, and
/// subdirectories are entered in file-name order. The root's children are
/// depth 0 and directories are descended while their depth is below
/// `plan.depth`. Symlinks are never followed; hidden names are neither listed
/// nor entered unless the plan includes them.
pub fn walk(plan: &LsPlan) -> WalkOutcome {
    let mut outcome = WalkOutcome::default();
    let mut stack: Vec<(PathBuf, usize)> = vec![(plan.root.clone(), 0)];

    while let Some((dir, depth)) = stack.pop() {
        let mut subdirs = Vec::new();
        for entry in read_children(&dir, &plan.root, &mut outcome.errors) {
            if outcome.scanned >= plan.max_entries_scanned {
                outcome.truncated = true;
                break;
            }
            if !plan.include_hidden && entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            outcome.scanned += 1;

            let path = relative(entry.path(), &plan.root);
            let entry_type = type_name(entry.file_type());
            let (size_bytes, mtime_epoch_ms) = match entry.metadata() {
                Ok(meta) => {
                    let mtime = meta
                        .modified()
                        .ok()
                        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                        .map(|d| d.as_millis() as i64)
                        .unwrap_or(0);
                    (meta.len(), mtime)
                }
                Err(err) => {
                    outcome.errors.push(ScanError {
                        path: path.clone(),
                        kind: "stat_failed",
                        message: err.to_string(),
                    });
                    (0, 0)
                }
            };
            let extension = if entry_type == "file" && plan.classify_by_extension {
                entry
                    .path()
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .filter(|e| !e.is_empty())
            } else {
                None
            };
            let coarse = if plan.classify_by_coarse_type {
                coarse_type(extension.as_deref())
            } else {
                None
            };
            if entry_type == "dir" && depth < plan.depth {
                subdirs.push(entry.path().to_path_buf());
            }
            outcome.entries.push(InventoryEntry {
                path,
                entry_type,
                size_bytes,
                mtime_epoch_ms,
                extension,
                coarse_type: coarse,
                git_xy: None,
                git_rename_from: None,
            });
        }
        if outcome.truncated {
            break;
        }
        // Reversed so the stack pops subdirectories in file-name order.
        stack.extend(subdirs.into_iter().rev().map(|d| (d, depth + 1)));
    }
    debug!(scanned = outcome.scanned, truncated = outcome.truncated, "Directory walk finished");
    outcome
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitBlock {
    pub mode: &'static str,
    pub detected: bool,
    pub status: &'static str,
    pub message: Option<String>,
}

type GitMap = BTreeMap<String, (String, Option<String>)>;

/// Re-bases a repository-relative path onto the inventory root.
fn rebase(path: &str, prefix: &str) -> Option<String> {
    path.strip_prefix(prefix).map(|p| p.trim_end_matches('/').to_string())
}

async fn git_status(ctx: &SkillContext, plan: &LsPlan) -> (GitBlock, GitMap) {
    let mode = plan.git_status.as_str();
    let block = |detected, status, message: Option<String>| GitBlock {
        mode,
        detected,
        status,
        message,
    };
    if plan.git_status == GitMode::Off {
        return (block(false, "disabled", None), GitMap::new());
    }
    let Some(tool) = ctx.host.resolve_tool(&GIT) else {
        return (block(false, "git_not_found", Some("git not found".to_string())), GitMap::new());
    };

    let executor = ctx.executor(1, ctx.config.invocation_timeout());
    let probe = git(&tool.program, &plan.root, &["rev-parse", "--is-inside-work-tree", "--show-prefix"]);
    let mut reports = executor.run_all(vec![probe], ExitPolicy::ZeroOnly).await;
    let prefix = match reports.pop().map(|r| r.outcome) {
        Some(Ok(output)) => {
            let mut lines = output.stdout.lines();
            if lines.next().map(str::trim) != Some("true") {
                return (block(false, "not_a_repo", None), GitMap::new());
            }
            lines.next().unwrap_or_default().trim().to_string()
        }
        Some(Err(InvocationError::Exit { .. })) | None => {
            return (block(false, "not_a_repo", None), GitMap::new());
        }
        Some(Err(e)) => return (block(false, "error", Some(e.to_string())), GitMap::new()),
    };

    let status = git(&tool.program, &plan.root, &["status", "--porcelain=v1", "-z"]);
    let mut reports = executor.run_all(vec![status], ExitPolicy::ZeroOnly).await;
    let output = match reports.pop().map(|r| r.outcome) {
        Some(Ok(output)) => output,
        Some(Err(InvocationError::Exit { stderr, .. })) => {
            let message = if stderr.is_empty() { "git status failed".to_string() } else { stderr };
            return (block(true, "error", Some(message)), GitMap::new());
        }
        Some(Err(e)) => return (block(true, "error", Some(e.to_string())), GitMap::new()),
        None => return (block(true, "error", Some("git status failed".to_string())), GitMap::new()),
    };

    let (entries, failures) = parse_porcelain_z(&output.stdout);
    if !failures.is_empty() {
        debug!(count = failures.len(), "Skipped malformed porcelain records");
    }
    let mut map = GitMap::new();
    for entry in entries {
        if let Some(path) = rebase(&entry.path, &prefix) {
            let from = entry.rename_from.and_then(|f| rebase(&f, &prefix).or(Some(f)));
            map.insert(path, (entry.xy, from));
        }
    }
    (block(true, "enabled", None), map)
}

fn render_view(plan: &LsPlan, scanned: usize, entries: &[InventoryEntry], truncated: bool) -> String {
    let mut lines = vec![
        format!("root: {}", plan.root.display()),
        format!("scanned: {}", scanned),
        format!("returned: {}", entries.len()),
    ];
    if truncated {
        lines.push("(truncated)".to_string());
    }
    lines.push(String::new());
    match plan.view {
        View::Flat => lines.extend(entries.iter().map(|e| e.path.clone())),
        View::Tree => {
            let mut paths: Vec<&str> = entries.iter().map(|e| e.path.as_str()).collect();
            paths.sort_unstable();
            for path in paths {
                let depth = path.matches('/').count();
                let name = path.rsplit('/').next().unwrap_or(path);
                lines.push(format!("{}{}", "  ".repeat(depth), name));
            }
        }
    }
    lines.join("\n") + "\n"
}

fn write_json(path: &Path, value: &Value) -> anyhow::Result<()> {
    std::fs::write(path, canonical_json(value) + "\n")
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn write_artifacts(dir: &Path, inventory: &Value, receipt: &Value, view: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create artifact directory {}", dir.display()))?;
    write_json(&dir.join(INVENTORY_FILE), inventory)?;
    write_json(&dir.join(RECEIPT_FILE), receipt)?;
    let view_path = dir.join(VIEW_FILE);
    std::fs::write(&view_path, view).with_context(|| format!("Failed to write {}", view_path.display()))?;
    Ok(())
}

pub fn artifact_dir(ctx: &SkillContext) -> PathBuf {
    ctx.project_root.join(&ctx.config.ls.artifact_dir)
}

pub async fn run(ctx: &SkillContext, plan: LsPlan, out: &mut dyn Write) -> Result<Outcome, ScoutError> {
    plan.check_caps(&ctx.config.ls.caps)?;
    let query_id = plan.query_id();
    info!(query_id = %query_id, root = %plan.root.display(), depth = plan.depth, "Starting inventory");

    let walked = walk(&plan);
    let (git_block, git_map) = git_status(ctx, &plan).await;

    let mut entries = walked.entries;
    if git_block.status == "enabled" {
        for entry in entries.iter_mut() {
            if let Some((xy, from)) = git_map.get(&entry.path) {
                entry.git_xy = Some(xy.clone());
                entry.git_rename_from = from.clone();
            }
        }
    }

    let mut truncation = TruncationReport::default();
    truncation.record(
        CapKind::Scan,
        plan.max_entries_scanned,
        None,
        walked.scanned,
        walked.truncated,
    );
    rank(&mut entries, plan.sort, plan.order);
    let entries = cap_len(entries, plan.top_n, CapKind::Rank, &mut truncation);
    let rank_truncated = truncation.fired(CapKind::Rank);

    let mut counts_by_type = json!({"file": 0, "dir": 0, "symlink": 0, "other": 0});
    let mut bytes_total = 0u64;
    for entry in &entries {
        if let Some(n) = counts_by_type[entry.entry_type].as_u64() {
            counts_by_type[entry.entry_type] = json!(n + 1);
        }
        bytes_total += entry.size_bytes;
    }

    let inventory = json!({
        "schema": "ls_inventory_v1",
        "plan": plan.raw,
        "summary": {
            "root": plan.root.to_string_lossy(),
            "scanned": walked.scanned,
            "returned": entries.len(),
            "counts_by_type": counts_by_type,
            "bytes_total": bytes_total,
        },
        "entries": entries,
    });

    let view = render_view(&plan, walked.scanned, &entries, walked.truncated || rank_truncated);
    let view = cap_bytes(&view, plan.max_bytes_view, &mut truncation);

    let dir = artifact_dir(ctx);
    let receipt = json!({
        "schema": "ls_receipt_v1",
        "query_id": query_id,
        "plan": plan.raw,
        "scan": {
            "root": plan.root.to_string_lossy(),
            "depth": plan.depth,
            "entries_scanned": walked.scanned,
            "errors": walked.errors,
        },
        "ranking": {
            "sort": plan.sort.as_str(),
            "order": plan.order.as_str(),
            "top_n": plan.top_n,
            "entries_returned": entries.len(),
        },
        "git": git_block,
        "ignores": {"include_hidden": plan.include_hidden, "sources": ["none"]},
        "artifacts": {
            "inventory_json": dir.join(INVENTORY_FILE).to_string_lossy(),
            "view_txt": dir.join(VIEW_FILE).to_string_lossy(),
        },
        "truncation": {
            "scan_truncated": walked.truncated,
            "rank_truncated": rank_truncated,
            "view_truncated": truncation.fired(CapKind::View),
            "reason": truncation.reason(),
        },
    });

    write_artifacts(&dir, &inventory, &receipt, &view)?;
    out.write_all(view.as_bytes())?;
    info!(
        scanned = walked.scanned,
        returned = entries.len(),
        truncated = truncation.truncated(),
        "Inventory finished"
    );
    Ok(Outcome::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{SortKey, SortOrder};
    use std::fs;
    use tempfile::tempdir;

    fn plan(root: &Path, depth: usize) -> LsPlan {
        LsPlan::from_document(json!({
            "schema": "ls_plan_v1",
            "ls": {
                "root": root.to_string_lossy(),
                "depth": depth,
                "view": "flat",
                "sort": "name",
                "order": "asc",
                "top_n": 100,
                "include_hidden": false,
                "classify": {"by_extension": true, "by_coarse_type": true},
                "git_status": "off",
                "limits": {"max_entries_scanned": 1000, "max_bytes_view": 4096}
            }
        }))
        .unwrap()
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join("README.md"), "readme").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();
        fs::write(dir.path().join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("src/nested/deep.toml"), "a = 1").unwrap();
        fs::write(dir.path().join("Makefile"), "all:").unwrap();
        dir
    }

    #[test]
    fn coarse_types() {
        assert_eq!(coarse_type(Some("RS")), Some("code"));
        assert_eq!(coarse_type(Some("yml")), Some("config"));
        assert_eq!(coarse_type(Some("weird")), Some("other"));
        assert_eq!(coarse_type(None), None);
    }

    #[test]
    fn walk_respects_depth_and_hidden() {
        let dir = fixture();
        let outcome = walk(&plan(dir.path(), 0));
        let paths: Vec<&str> = outcome.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["Makefile", "README.md", "src"]);

        let outcome = walk(&plan(dir.path(), 1));
        let paths: Vec<&str> = outcome.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["Makefile", "README.md", "src", "src/main.rs", "src/nested"]);
        let main = &outcome.entries[3];
        assert_eq!(main.entry_type, "file");
        assert_eq!(main.extension.as_deref(), Some("rs"));
        assert_eq!(main.coarse_type, Some("code"));
        assert_eq!(main.size_bytes, 12);
        assert_eq!(outcome.entries[0].extension, None);
        assert_eq!(outcome.entries[2].entry_type, "dir");
    }

    #[test]
    fn scan_cap_stops_the_walk() {
        let dir = fixture();
        let mut p = plan(dir.path(), 4);
        p.max_entries_scanned = 2;
        let outcome = walk(&p);
        assert!(outcome.truncated);
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.entries.len(), 2);
    }

    #[test]
    fn directory_is_listed_before_its_subdirectories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/x"), "x").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let full = walk(&plan(dir.path(), 1));
        let paths: Vec<&str> = full.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b.txt", "a/x"]);

        let mut p = plan(dir.path(), 1);
        p.max_entries_scanned = 2;
        let capped = walk(&p);
        let paths: Vec<&str> = capped.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "b.txt"]);
        assert!(capped.truncated);
        assert_eq!(capped.scanned, 2);
    }

    #[test]
    fn size_ranking_breaks_ties_by_path() {
        let mut entries = vec![
            InventoryEntry {
                path: "b".to_string(),
                entry_type: "file",
                size_bytes: 5,
                mtime_epoch_ms: 0,
                extension: None,
                coarse_type: None,
                git_xy: None,
                git_rename_from: None,
            },
            InventoryEntry {
                path: "a".to_string(),
                entry_type: "file",
                size_bytes: 5,
                mtime_epoch_ms: 0,
                extension: None,
                coarse_type: None,
                git_xy: None,
                git_rename_from: None,
            },
        ];
        rank(&mut entries, SortKey::Size, SortOrder::Desc);
        assert_eq!(entries[0].path, "a");
    }

    #[test]
    fn tree_view_indents_by_depth() {
        let dir = fixture();
        let mut p = plan(dir.path(), 2);
        p.view = View::Tree;
        let outcome = walk(&p);
        let view = render_view(&p, outcome.scanned, &outcome.entries, false);
        assert!(view.contains("\nsrc\n  main.rs\n  nested\n    deep.toml\n"), "{}", view);
        assert!(!view.contains("(truncated)"));
    }

    #[test]
    fn porcelain_paths_rebase_onto_root() {
        assert_eq!(rebase("sub/a.rs", "sub/"), Some("a.rs".to_string()));
        assert_eq!(rebase("other/a.rs", "sub/"), None);
        assert_eq!(rebase("dir/", ""), Some("dir".to_string()));
    }
}
