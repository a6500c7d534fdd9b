// scout-core/src/plan/ls.rs

use super::fields::{parse_document, schema_of, Fields};
use super::resolve_root;
use crate::config::LsCaps;
use crate::errors::ScoutError;
use crate::merge::{SortKey, SortOrder};
use crate::stamp::query_stamp;
use serde_json::{json, Value};
use std::path::PathBuf;

pub const LS_SCHEMA: &str = "ls_plan_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Flat,
    Tree,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitMode {
    Auto,
    On,
    Off,
}

impl GitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitMode::Auto => "auto",
            GitMode::On => "on",
            GitMode::Off => "off",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LsPlan {
    pub root: PathBuf,
    pub depth: usize,
    pub view: View,
    pub sort: SortKey,
    pub order: SortOrder,
    pub top_n: usize,
    pub include_hidden: bool,
    pub classify_by_extension: bool,
    pub classify_by_coarse_type: bool,
    pub git_status: GitMode,
    pub max_entries_scanned: usize,
    pub max_bytes_view: usize,
    /// The submitted document, echoed into the inventory and receipt.
    pub raw: Value,
}

impl LsPlan {
    pub fn from_stdin(raw: &str) -> Result<Self, ScoutError> {
        Self::from_document(parse_document(raw)?)
    }

    pub fn from_document(document: Value) -> Result<Self, ScoutError> {
        schema_of(&document, &[LS_SCHEMA])?;
        let top = Fields::new(&document, "")?;
        let ls = top.nested("ls")?;
        ls.require(&[
            "root",
            "depth",
            "view",
            "sort",
            "order",
            "top_n",
            "include_hidden",
            "classify",
            "git_status",
            "limits",
        ])?;

        let root = resolve_root(&ls.path("root"), &ls.string("root")?)?;
        let view = match ls.one_of("view", &["flat", "tree"])?.as_str() {
            "flat" => View::Flat,
            _ => View::Tree,
        };
        let sort = match ls.one_of("sort", &["mtime", "size", "name"])?.as_str() {
            "mtime" => SortKey::Mtime,
            "size" => SortKey::Size,
            _ => SortKey::Name,
        };
        let order = match ls.one_of("order", &["asc", "desc"])?.as_str() {
            "asc" => SortOrder::Asc,
            _ => SortOrder::Desc,
        };
        let git_status = match ls.one_of("git_status", &["auto", "on", "off"])?.as_str() {
            "auto" => GitMode::Auto,
            "on" => GitMode::On,
            _ => GitMode::Off,
        };
        let classify = ls.nested("classify")?;
        classify.require(&["by_extension", "by_coarse_type"])?;
        let limits = ls.nested("limits")?;
        limits.require(&["max_entries_scanned", "max_bytes_view"])?;

        let plan = LsPlan {
            root,
            depth: ls.non_negative_int("depth")?,
            view,
            sort,
            order,
            top_n: ls.positive_int("top_n")?,
            include_hidden: ls.bool("include_hidden")?,
            classify_by_extension: classify.bool("by_extension")?,
            classify_by_coarse_type: classify.bool("by_coarse_type")?,
            git_status,
            max_entries_scanned: limits.positive_int("max_entries_scanned")?,
            max_bytes_view: limits.positive_int("max_bytes_view")?,
            raw: Value::Null,
        };
        Ok(LsPlan { raw: document, ..plan })
    }

    /// Rejects plans that ask for more than the configured ceilings allow.
    pub fn check_caps(&self, caps: &LsCaps) -> Result<(), ScoutError> {
        let checks = [
            ("ls.depth", self.depth, caps.max_depth, "plan depth exceeds config cap"),
            ("ls.top_n", self.top_n, caps.max_top_n, "plan top_n exceeds config cap"),
            (
                "ls.limits.max_entries_scanned",
                self.max_entries_scanned,
                caps.max_entries_scanned,
                "plan max_entries_scanned exceeds config cap",
            ),
            (
                "ls.limits.max_bytes_view",
                self.max_bytes_view,
                caps.max_view_bytes,
                "plan max_bytes_view exceeds config cap",
            ),
        ];
        for (field, asked, ceiling, message) in checks {
            if asked > ceiling {
                return Err(ScoutError::validation(field, message));
            }
        }
        Ok(())
    }

    pub fn stamp_fields(&self) -> Value {
        json!({
            "root": self.root.to_string_lossy(),
            "depth": self.depth,
            "sort": self.sort.as_str(),
            "order": self.order.as_str(),
            "top_n": self.top_n,
            "include_hidden": self.include_hidden,
            "classify": {
                "by_extension": self.classify_by_extension,
                "by_coarse_type": self.classify_by_coarse_type,
            },
            "git_status": self.git_status.as_str(),
            "limits": {
                "max_entries_scanned": self.max_entries_scanned,
                "max_bytes_view": self.max_bytes_view,
            },
        })
    }

    pub fn query_id(&self) -> String {
        query_stamp(&self.stamp_fields())
    }
}
