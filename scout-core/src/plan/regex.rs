// scout-core/src/plan/regex.rs

use super::{positive_flag, OutputFormat, CLI_SCHEMA};
use crate::errors::ScoutError;
use crate::stamp::query_stamp;
use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_MAX_MATCHES: usize = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RegexFlags {
    pub pattern: String,
    pub ignore_case: bool,
    pub multiline: bool,
    pub dotall: bool,
    pub max_matches: i64,
    pub timeout_secs: i64,
    pub format: String,
}

#[derive(Debug, Clone)]
pub struct RegexPlan {
    pub schema: String,
    pub pattern: String,
    pub ignore_case: bool,
    pub multiline: bool,
    pub dotall: bool,
    pub max_matches: usize,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub compiled: Regex,
}

impl RegexPlan {
    pub fn from_flags(flags: RegexFlags) -> Result<Self, ScoutError> {
        if flags.pattern.is_empty() {
            return Err(ScoutError::validation("pattern", "--pattern is required"));
        }
        let compiled = RegexBuilder::new(&flags.pattern)
            .case_insensitive(flags.ignore_case)
            .multi_line(flags.multiline)
            .dot_matches_new_line(flags.dotall)
            .build()
            .map_err(|e| ScoutError::validation("pattern", format!("invalid regex pattern: {}", e)))?;
        Ok(RegexPlan {
            schema: CLI_SCHEMA.to_string(),
            pattern: flags.pattern,
            ignore_case: flags.ignore_case,
            multiline: flags.multiline,
            dotall: flags.dotall,
            max_matches: positive_flag("max_matches", flags.max_matches)?,
            timeout: Duration::from_secs(positive_flag("timeout", flags.timeout_secs)? as u64),
            format: OutputFormat::parse("format", &flags.format)?,
            compiled,
        })
    }

    fn flags_json(&self) -> Value {
        json!({
            "ignore_case": self.ignore_case,
            "multiline": self.multiline,
            "dotall": self.dotall,
        })
    }

    /// Only the pattern and its flags identify the query; the input text does not.
    pub fn stamp_fields(&self) -> Value {
        json!({ "pattern": self.pattern, "flags": self.flags_json() })
    }

    pub fn query_id(&self) -> String {
        query_stamp(&self.stamp_fields())
    }

    pub fn parameter_block(&self, input_length: usize) -> Value {
        json!({
            "pattern": self.pattern,
            "flags": self.flags_json(),
            "max_matches": self.max_matches,
            "timeout": self.timeout.as_secs(),
            "format": self.format.as_str(),
            "input_length": input_length,
            "query_id": self.query_id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(pattern: &str) -> RegexFlags {
        RegexFlags {
            pattern: pattern.to_string(),
            ignore_case: false,
            multiline: false,
            dotall: false,
            max_matches: DEFAULT_MAX_MATCHES as i64,
            timeout_secs: DEFAULT_TIMEOUT_SECS as i64,
            format: "jsonl".to_string(),
        }
    }

    #[test]
    fn flags_reach_the_compiled_regex() {
        let mut f = flags("^b.c$");
        f.ignore_case = true;
        f.multiline = true;
        f.dotall = true;
        let plan = RegexPlan::from_flags(f).unwrap();
        assert!(plan.compiled.is_match("a\nB\nC"));
    }

    #[test]
    fn invalid_regex_is_a_validation_error() {
        let err = RegexPlan::from_flags(flags("(")).unwrap_err();
        assert!(err.to_string().contains("invalid regex pattern"));
        assert!(RegexPlan::from_flags(flags("")).is_err());
    }

    #[test]
    fn stamp_ignores_limits_and_format() {
        let a = RegexPlan::from_flags(flags("x+")).unwrap();
        let mut other = flags("x+");
        other.max_matches = 3;
        other.format = "human".to_string();
        let b = RegexPlan::from_flags(other).unwrap();
        assert_eq!(a.query_id(), b.query_id());

        let mut other = flags("x+");
        other.ignore_case = true;
        assert_ne!(a.query_id(), RegexPlan::from_flags(other).unwrap().query_id());

        let block = a.parameter_block(12);
        assert_eq!(block["input_length"], 12);
        assert_eq!(block["query_id"], a.query_id());
    }
}
