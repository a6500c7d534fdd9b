// scout-core/src/emit.rs

//! Rendering of a finished query as JSONL or human-readable text.

use crate::errors::InvocationError;
use crate::plan::EffectiveFormat;
use crate::records::StructuredRecord;
use crate::stamp::sort_keys;
use crate::truncate::TruncationReport;
use serde_json::{json, Map, Value};
use std::io::{self, Write};

/// Everything a query reports, independent of encoding.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// The parameter block: normalized plan, argv, tool versions and `query_id`.
    pub parameters: Map<String, Value>,
    /// `# key: value` lines heading the human rendering.
    pub header: Vec<(String, String)>,
    /// Summary counts in display order.
    pub counts: Vec<(&'static str, Value)>,
    pub truncation: TruncationReport,
    pub errors: Vec<InvocationError>,
    pub records: Vec<StructuredRecord>,
}

impl Report {
    pub fn truncated(&self) -> bool {
        self.truncation.truncated()
    }

    pub fn summary_json(&self) -> Value {
        let mut summary = Map::new();
        summary.insert("kind".to_string(), json!("summary"));
        for (key, value) in &self.counts {
            summary.insert(key.to_string(), value.clone());
        }
        summary.insert("truncated".to_string(), json!(self.truncated()));
        summary.insert(
            "truncation".to_string(),
            json!({
                "reason": self.truncation.reason(),
                "stages": self.truncation,
            }),
        );
        summary.insert("errors".to_string(), json!(self.errors));
        Value::Object(summary)
    }
}

/// One compact JSON line with keys in sorted order.
pub fn jsonl_line(value: &Value) -> String {
    serde_json::to_string(&sort_keys(value)).unwrap_or_default()
}

pub fn write_jsonl(out: &mut dyn Write, report: &Report) -> io::Result<()> {
    let param_block = json!({ "kind": "param_block", "param_block": Value::Object(report.parameters.clone()) });
    writeln!(out, "{}", jsonl_line(&param_block))?;
    writeln!(out, "{}", jsonl_line(&report.summary_json()))?;
    for record in &report.records {
        writeln!(out, "{}", jsonl_line(&record.to_json()))?;
    }
    Ok(())
}

pub fn write_human(out: &mut dyn Write, report: &Report) -> io::Result<()> {
    for (key, value) in &report.header {
        writeln!(out, "# {}: {}", key, value)?;
    }
    writeln!(out)?;
    for (key, value) in &report.counts {
        match value {
            Value::String(s) => writeln!(out, "{}: {}", key, s)?,
            other => writeln!(out, "{}: {}", key, other)?,
        }
    }
    if report.truncated() {
        writeln!(out, "(truncated)")?;
    }
    for error in &report.errors {
        writeln!(out, "error: {}", error)?;
    }
    writeln!(out)?;
    for record in &report.records {
        writeln!(out, "{}", record.render_human())?;
    }
    Ok(())
}

pub fn write_report(out: &mut dyn Write, report: &Report, format: EffectiveFormat) -> io::Result<()> {
    match format {
        EffectiveFormat::Jsonl => write_jsonl(out, report),
        EffectiveFormat::Human => write_human(out, report),
    }
}

/// Renders a list the way the human header shows it: `[a, b]`.
pub fn list(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}
