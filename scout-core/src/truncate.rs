// scout-core/src/truncate.rs

//! Ordered result caps. Each stage consumes the previous stage's output and
//! records whether it removed anything.

use crate::records::StructuredRecord;
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapKind {
    MaxFiles,
    MaxMatches,
    MaxLines,
    MaxResults,
    Scan,
    Rank,
    View,
}

impl CapKind {
    pub fn reason(&self) -> &'static str {
        match self {
            CapKind::MaxFiles => "file cap reached",
            CapKind::MaxMatches => "match cap reached",
            CapKind::MaxLines => "line cap reached",
            CapKind::MaxResults => "result cap reached",
            CapKind::Scan => "scan cap reached",
            CapKind::Rank => "rank cap reached",
            CapKind::View => "view cap reached",
        }
    }
}

/// Outcome of one cap. `before` is `None` when the cap stopped a traversal
/// and the uncapped total was never observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapStage {
    pub cap: CapKind,
    pub limit: usize,
    pub before: Option<usize>,
    pub after: usize,
    pub fired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TruncationReport {
    pub stages: Vec<CapStage>,
}

impl TruncationReport {
    pub fn record(&mut self, cap: CapKind, limit: usize, before: Option<usize>, after: usize, fired: bool) {
        self.stages.push(CapStage {
            cap,
            limit,
            before,
            after,
            fired,
        });
    }

    pub fn truncated(&self) -> bool {
        self.stages.iter().any(|s| s.fired)
    }

    pub fn fired(&self, cap: CapKind) -> bool {
        self.stages.iter().any(|s| s.cap == cap && s.fired)
    }

    /// Reason of the first cap that fired, in application order.
    pub fn reason(&self) -> Option<&'static str> {
        self.stages.iter().find(|s| s.fired).map(|s| s.cap.reason())
    }
}

/// Keeps the records of the lexicographically first `max_files` files.
/// Records without a path are kept. Returns the number of files kept.
pub fn cap_files(
    records: Vec<StructuredRecord>,
    max_files: Option<usize>,
    report: &mut TruncationReport,
) -> (Vec<StructuredRecord>, usize) {
    let files: BTreeSet<&str> = records.iter().filter_map(|r| r.path()).collect();
    let total = files.len();
    let Some(limit) = max_files else {
        return (records, total);
    };
    if total <= limit {
        report.record(CapKind::MaxFiles, limit, Some(total), total, false);
        return (records, total);
    }
    let kept_files: BTreeSet<String> = files.into_iter().take(limit).map(str::to_string).collect();
    let kept = records
        .into_iter()
        .filter(|r| match r.path() {
            Some(path) => kept_files.contains(path),
            None => true,
        })
        .collect();
    report.record(CapKind::MaxFiles, limit, Some(total), limit, true);
    (kept, limit)
}

/// Keeps at most `max_matches` match records in sequence order. Records of
/// other kinds are never dropped here.
pub fn cap_matches(
    records: Vec<StructuredRecord>,
    max_matches: Option<usize>,
    report: &mut TruncationReport,
) -> Vec<StructuredRecord> {
    let Some(limit) = max_matches else {
        return records;
    };
    let total = records.iter().filter(|r| r.is_match()).count();
    let mut seen = 0usize;
    let kept: Vec<StructuredRecord> = records
        .into_iter()
        .filter(|r| {
            if !r.is_match() {
                return true;
            }
            seen += 1;
            seen <= limit
        })
        .collect();
    report.record(CapKind::MaxMatches, limit, Some(total), total.min(limit), total > limit);
    kept
}

/// Cuts a sequence to its first `limit` items.
pub fn cap_len<T>(mut items: Vec<T>, limit: usize, cap: CapKind, report: &mut TruncationReport) -> Vec<T> {
    let before = items.len();
    let fired = before > limit;
    items.truncate(limit);
    report.record(cap, limit, Some(before), items.len(), fired);
    items
}

/// Cuts `text` to at most `max_bytes` bytes on a character boundary.
pub fn cap_bytes(text: &str, max_bytes: usize, report: &mut TruncationReport) -> String {
    let before = text.len();
    if before <= max_bytes {
        report.record(CapKind::View, max_bytes, Some(before), before, false);
        return text.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    report.record(CapKind::View, max_bytes, Some(before), end, true);
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(path: &str, line: u64) -> StructuredRecord {
        StructuredRecord::Match {
            path: path.to_string(),
            line,
            content: "x".to_string(),
            pattern: None,
        }
    }

    fn c(path: &str, line: u64) -> StructuredRecord {
        StructuredRecord::Context {
            path: path.to_string(),
            line,
            content: "ctx".to_string(),
        }
    }

    #[test]
    fn file_cap_keeps_first_files_lexicographically() {
        let records = vec![m("a", 1), m("a", 2), m("b", 1), m("c", 1), m("c", 2)];
        let mut report = TruncationReport::default();
        let (kept, files) = cap_files(records, Some(2), &mut report);
        assert_eq!(files, 2);
        assert_eq!(kept, vec![m("a", 1), m("a", 2), m("b", 1)]);
        assert!(report.truncated());
        assert_eq!(report.reason(), Some("file cap reached"));
    }

    #[test]
    fn match_cap_alone() {
        let records = vec![m("a", 1), m("a", 2), m("b", 1), m("c", 1), m("c", 2)];
        let mut report = TruncationReport::default();
        let kept = cap_matches(records, Some(3), &mut report);
        assert_eq!(kept, vec![m("a", 1), m("a", 2), m("b", 1)]);
        assert_eq!(report.stages[0].before, Some(5));
        assert_eq!(report.stages[0].after, 3);
        assert!(report.truncated());
    }

    #[test]
    fn file_then_match_cap_in_sequence() {
        let records = vec![m("a", 1), m("a", 2), m("b", 1), m("c", 1), m("c", 2)];
        let mut report = TruncationReport::default();
        let (kept, _) = cap_files(records, Some(2), &mut report);
        let kept = cap_matches(kept, Some(2), &mut report);
        assert_eq!(kept, vec![m("a", 1), m("a", 2)]);
        assert_eq!(report.stages.len(), 2);
        assert!(report.fired(CapKind::MaxFiles));
        assert!(report.fired(CapKind::MaxMatches));
    }

    #[test]
    fn only_the_file_cap_fires_when_matches_fit() {
        let records = vec![m("a", 1), m("a", 2), m("b", 1), m("c", 1), m("c", 2)];
        let mut report = TruncationReport::default();
        let (kept, _) = cap_files(records, Some(2), &mut report);
        // Five matches overall, but only three survive the file cap.
        let kept = cap_matches(kept, Some(4), &mut report);
        assert_eq!(kept.len(), 3);
        let caps: Vec<CapKind> = report.stages.iter().map(|s| s.cap).collect();
        assert_eq!(caps, vec![CapKind::MaxFiles, CapKind::MaxMatches]);
        assert!(report.fired(CapKind::MaxFiles));
        assert!(!report.fired(CapKind::MaxMatches));
        assert_eq!(report.stages[1].before, Some(3));
        assert_eq!(report.stages[1].after, 3);
        assert_eq!(report.reason(), Some("file cap reached"));
    }

    #[test]
    fn match_cap_counts_what_the_file_cap_left() {
        let records = vec![m("a", 1), m("a", 2), m("a", 3), m("b", 1), m("c", 1)];
        let mut report = TruncationReport::default();
        let (kept, files) = cap_files(records, Some(2), &mut report);
        assert_eq!(files, 2);
        let kept = cap_matches(kept, Some(3), &mut report);
        assert_eq!(kept, vec![m("a", 1), m("a", 2), m("a", 3)]);
        let matches = &report.stages[1];
        assert_eq!(matches.cap, CapKind::MaxMatches);
        assert_eq!(matches.before, Some(4));
        assert_eq!(matches.after, 3);
        assert!(matches.fired);
        // The first cap to fire names the truncation.
        assert_eq!(report.reason(), Some("file cap reached"));
    }

    #[test]
    fn match_cap_preserves_other_kinds() {
        let records = vec![m("a", 1), c("a", 2), m("a", 3), c("a", 4), StructuredRecord::Separator];
        let mut report = TruncationReport::default();
        let kept = cap_matches(records, Some(1), &mut report);
        assert_eq!(kept, vec![m("a", 1), c("a", 2), c("a", 4), StructuredRecord::Separator]);
    }

    #[test]
    fn caps_that_do_not_fire_leave_truncated_false() {
        let records = vec![m("a", 1)];
        let mut report = TruncationReport::default();
        let (kept, _) = cap_files(records, Some(5), &mut report);
        let kept = cap_matches(kept, Some(5), &mut report);
        let kept = cap_len(kept, 5, CapKind::MaxLines, &mut report);
        assert_eq!(kept.len(), 1);
        assert!(!report.truncated());
        assert_eq!(report.reason(), None);
    }

    #[test]
    fn cap_bytes_respects_char_boundaries() {
        let mut report = TruncationReport::default();
        let cut = cap_bytes("aé", 2, &mut report);
        assert_eq!(cut, "a");
        assert!(report.fired(CapKind::View));
    }
}
