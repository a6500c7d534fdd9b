// scout-core/src/plan/scan.rs

//! Two-stage plans: an enumeration (`surface`) whose file list feeds a
//! content search (`search`).

use super::fields::{parse_document, schema_of, Fields};
use super::find::{FindPlan, SurfaceBody};
use super::grep::{GrepPlan, SearchBody};
use super::{resolve_root, OutputFormat};
use crate::errors::ScoutError;
use crate::stamp::query_stamp;
use serde_json::{json, Value};
use std::path::PathBuf;

pub const SCAN_SCHEMA: &str = "scan_plan_v1";

#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub root: PathBuf,
    pub format: OutputFormat,
    pub surface: FindPlan,
    /// The search half; its explicit file list is filled in from the surface results.
    pub search: GrepPlan,
}

impl ScanPlan {
    pub fn from_stdin(raw: &str) -> Result<Self, ScoutError> {
        Self::from_document(&parse_document(raw)?)
    }

    pub fn from_document(document: &Value) -> Result<Self, ScoutError> {
        schema_of(document, &[SCAN_SCHEMA])?;
        let top = Fields::new(document, "")?;
        let scan = top.nested("scan")?;
        scan.require(&["root", "format", "surface", "search"])?;
        let root = resolve_root(&scan.path("root"), &scan.string("root")?)?;
        let format = OutputFormat::parse(&scan.path("format"), &scan.one_of("format", OutputFormat::NAMES)?)?;

        let surface_fields = scan.nested("surface")?;
        let surface = SurfaceBody::parse(&surface_fields)?.into_plan(
            SCAN_SCHEMA,
            root.clone(),
            format,
            &surface_fields.path("exclude_patterns"),
        )?;
        let search = SearchBody::parse(&scan.nested("search")?)?.into_plan(
            SCAN_SCHEMA,
            root.clone(),
            format,
            Vec::new(),
            Vec::new(),
        );
        Ok(ScanPlan {
            root,
            format,
            surface,
            search,
        })
    }

    pub fn stamp_fields(&self) -> Value {
        json!({
            "surface": self.surface.query_id(),
            "search": self.search.query_id(),
        })
    }

    pub fn query_id(&self) -> String {
        query_stamp(&self.stamp_fields())
    }
}
