// scout-core/src/plan/fields.rs

//! Typed, path-aware access to the fields of a JSON plan document. Every
//! failure names the full dotted path of the offending field.

use crate::errors::ScoutError;
use crate::records::{Pattern, PatternKind};
use serde_json::{Map, Value};

type Result<T> = std::result::Result<T, ScoutError>;

/// Parses stdin text into a JSON object.
pub fn parse_document(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Err(ScoutError::validation("<stdin>", "no plan JSON provided on stdin"));
    }
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ScoutError::validation("<stdin>", format!("invalid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(ScoutError::validation("<stdin>", "plan JSON must be an object"));
    }
    Ok(value)
}

/// Reads the `schema` tag and checks it against the schemas a skill accepts.
pub fn schema_of(document: &Value, accepted: &[&str]) -> Result<String> {
    match document.get("schema").and_then(Value::as_str) {
        Some(schema) if accepted.contains(&schema) => Ok(schema.to_string()),
        Some(other) => Err(ScoutError::validation(
            "schema",
            format!("unsupported schema '{}' (expected one of: {})", other, accepted.join(", ")),
        )),
        None => Err(ScoutError::validation(
            "schema",
            format!("missing schema tag (expected one of: {})", accepted.join(", ")),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    prefix: String,
}

impl<'a> Fields<'a> {
    /// Views `value` as an object whose fields are reported under `prefix`.
    pub fn new(value: &'a Value, prefix: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        match value.as_object() {
            Some(map) => Ok(Self { map, prefix }),
            None => Err(ScoutError::validation(prefix, "must be an object")),
        }
    }

    pub fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    fn invalid(&self, key: &str, message: impl Into<String>) -> ScoutError {
        ScoutError::validation(self.path(key), message)
    }

    /// Fails on the first required key that is absent.
    pub fn require(&self, keys: &[&str]) -> Result<()> {
        match keys.iter().find(|k| !self.map.contains_key(**k)) {
            Some(missing) => Err(self.invalid(missing, "missing required field")),
            None => Ok(()),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    /// The object at `key`, reported under this object's path.
    pub fn nested(&self, key: &str) -> Result<Fields<'a>> {
        match self.map.get(key) {
            Some(value) => Fields::new(value, self.path(key)),
            None => Err(self.invalid(key, "missing required field")),
        }
    }

    pub fn string(&self, key: &str) -> Result<String> {
        match self.map.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
            _ => Err(self.invalid(key, "must be a non-empty string")),
        }
    }

    pub fn opt_string(&self, key: &str) -> Result<Option<String>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(key).map(Some),
        }
    }

    pub fn one_of(&self, key: &str, allowed: &[&str]) -> Result<String> {
        match self.map.get(key).and_then(Value::as_str) {
            Some(s) if allowed.contains(&s) => Ok(s.to_string()),
            _ => Err(self.invalid(key, format!("must be one of: {}", allowed.join(", ")))),
        }
    }

    pub fn bool(&self, key: &str) -> Result<bool> {
        match self.map.get(key) {
            Some(Value::Bool(b)) => Ok(*b),
            _ => Err(self.invalid(key, "must be boolean")),
        }
    }

    /// An optional boolean; absent or null means `default`.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.bool(key),
        }
    }

    pub fn positive_int(&self, key: &str) -> Result<usize> {
        match self.map.get(key).and_then(Value::as_u64) {
            Some(n) if n > 0 => Ok(n as usize),
            _ => Err(self.invalid(key, "must be a positive integer")),
        }
    }

    /// A positive integer or `null`.
    pub fn opt_positive_int(&self, key: &str) -> Result<Option<usize>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.positive_int(key).map(Some),
        }
    }

    pub fn non_negative_int(&self, key: &str) -> Result<usize> {
        match self.map.get(key).and_then(Value::as_u64) {
            Some(n) => Ok(n as usize),
            None => Err(self.invalid(key, "must be a non-negative integer")),
        }
    }

    /// An array of strings; `null` is read as empty.
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.map.get(key) {
            Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    _ => Err(ScoutError::validation(
                        format!("{}[{}]", self.path(key), i),
                        "must be a string",
                    )),
                })
                .collect(),
            _ => Err(self.invalid(key, "must be an array")),
        }
    }

    /// An array of `{kind, value}` pattern objects restricted to `allowed` kinds.
    pub fn pattern_list(&self, key: &str, allowed: &[PatternKind], max_len: usize) -> Result<Vec<Pattern>> {
        let items = match self.map.get(key) {
            Some(Value::Array(items)) => items,
            _ => return Err(self.invalid(key, "must be an array")),
        };
        let base = self.path(key);
        let mut patterns = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let field = format!("{}[{}]", base, i);
            let obj = Fields::new(item, field.clone())?;
            obj.require(&["kind", "value"])?;
            let kind = item
                .get("kind")
                .and_then(Value::as_str)
                .and_then(PatternKind::parse)
                .filter(|k| allowed.contains(k))
                .ok_or_else(|| {
                    let names: Vec<&str> = allowed.iter().map(PatternKind::as_str).collect();
                    ScoutError::validation(
                        format!("{}.kind", field),
                        format!("must be one of: {}", names.join(", ")),
                    )
                })?;
            let value = obj.string("value")?;
            check_pattern_value(&format!("{}.value", field), &value, max_len)?;
            patterns.push(Pattern::new(kind, value));
        }
        Ok(patterns)
    }
}

/// Rejects empty pattern values and values longer than `max_len` characters.
pub fn check_pattern_value(field: &str, value: &str, max_len: usize) -> Result<()> {
    if value.is_empty() {
        return Err(ScoutError::validation(field, "must be a non-empty string"));
    }
    if value.chars().count() > max_len {
        return Err(ScoutError::validation(field, format!("exceeds max length {}", max_len)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_field_reports_full_path() {
        let doc = json!({"limits": {}});
        let limits = &doc["limits"];
        let fields = Fields::new(limits, "search.limits").unwrap();
        let err = fields.require(&["max_pattern_length"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid plan: search.limits.max_pattern_length: missing required field"
        );
    }

    #[test]
    fn integers_must_be_positive() {
        let doc = json!({"a": 0, "b": -3, "c": 2.5, "d": 7, "e": null});
        let fields = Fields::new(&doc, "search").unwrap();
        assert!(fields.positive_int("a").is_err());
        assert!(fields.positive_int("b").is_err());
        assert!(fields.positive_int("c").is_err());
        assert_eq!(fields.positive_int("d").unwrap(), 7);
        assert_eq!(fields.opt_positive_int("e").unwrap(), None);
        assert_eq!(fields.non_negative_int("a").unwrap(), 0);
    }

    #[test]
    fn pattern_list_enforces_kind_and_length() {
        let doc = json!({"p": [{"kind": "glob", "value": "*.rs"}]});
        let fields = Fields::new(&doc, "find").unwrap();
        let err = fields.pattern_list("p", &[PatternKind::Fixed, PatternKind::Regex], 512).unwrap_err();
        assert!(err.to_string().contains("find.p[0].kind"));

        let long = json!({"p": [{"kind": "fixed", "value": "abcdef"}]});
        let fields = Fields::new(&long, "search").unwrap();
        let err = fields.pattern_list("p", &[PatternKind::Fixed], 3).unwrap_err();
        assert!(err.to_string().contains("exceeds max length 3"));
    }

    #[test]
    fn schema_dispatch() {
        let doc = json!({"schema": "grep_plan_v9"});
        assert!(schema_of(&doc, &["grep_plan_v1", "grep_plan_v2"]).is_err());
        assert!(schema_of(&json!({}), &["grep_plan_v1"]).is_err());
        let doc = json!({"schema": "grep_plan_v2"});
        assert_eq!(schema_of(&doc, &["grep_plan_v1", "grep_plan_v2"]).unwrap(), "grep_plan_v2");
    }

    #[test]
    fn parse_document_rejects_non_objects() {
        assert!(parse_document("").is_err());
        assert!(parse_document("[1,2]").is_err());
        assert!(parse_document("{not json").is_err());
        assert!(parse_document("{\"schema\":\"x\"}").is_ok());
    }
}
