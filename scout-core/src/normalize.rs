// scout-core/src/normalize.rs

//! Parsers that turn raw tool output into structured records.
//!
//! Search output (`path:line:content` / `path-line-content`) is ambiguous
//! whenever content or paths contain the delimiter, so it is classified by an
//! explicit left-to-right scan for the first `<sep><digits><sep>` marker.

use crate::records::{Pattern, StructuredRecord};
use std::path::Path;

/// Non-empty lines of captured stdout. Only `\n` delimits; a trailing `\r`
/// stays part of the line.
pub fn output_lines(stdout: &str) -> impl Iterator<Item = &str> {
    stdout.split('\n').filter(|line| !line.is_empty())
}

#[derive(Clone, Copy)]
enum ScanState {
    Seeking,
    AfterSeparator { sep_at: usize },
    InDigits { sep_at: usize },
}

/// Finds the first `<sep><digits><sep>` run, returning the byte offsets of
/// the two separators.
fn locate_numbered_field(bytes: &[u8], sep: u8) -> Option<(usize, usize)> {
    let mut state = ScanState::Seeking;
    for (pos, &b) in bytes.iter().enumerate() {
        state = match state {
            ScanState::Seeking if b == sep => ScanState::AfterSeparator { sep_at: pos },
            ScanState::Seeking => ScanState::Seeking,
            ScanState::AfterSeparator { sep_at } if b.is_ascii_digit() => {
                ScanState::InDigits { sep_at }
            }
            ScanState::AfterSeparator { .. } if b == sep => {
                ScanState::AfterSeparator { sep_at: pos }
            }
            ScanState::AfterSeparator { .. } => ScanState::Seeking,
            ScanState::InDigits { sep_at } if b.is_ascii_digit() => ScanState::InDigits { sep_at },
            ScanState::InDigits { sep_at } if b == sep => return Some((sep_at, pos)),
            ScanState::InDigits { .. } => ScanState::Seeking,
        };
    }
    None
}

fn split_numbered(line: &str, sep: u8) -> Option<(&str, u64, &str)> {
    let (first, second) = locate_numbered_field(line.as_bytes(), sep)?;
    // Line numbers too large for u64 are not line numbers.
    let number = line[first + 1..second].parse::<u64>().ok()?;
    Some((&line[..first], number, &line[second + 1..]))
}

/// Classifies one line of ripgrep output. Returns `None` for empty lines.
pub fn parse_search_line(line: &str, pattern: Option<&Pattern>) -> Option<StructuredRecord> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    if line == "--" {
        return Some(StructuredRecord::Separator);
    }
    if let Some((path, number, content)) = split_numbered(line, b':') {
        return Some(StructuredRecord::Match {
            path: path.to_string(),
            line: number,
            content: content.to_string(),
            pattern: pattern.cloned(),
        });
    }
    if let Some((path, number, content)) = split_numbered(line, b'-') {
        return Some(StructuredRecord::Context {
            path: path.to_string(),
            line: number,
            content: content.to_string(),
        });
    }
    Some(StructuredRecord::Line {
        text: line.to_string(),
    })
}

/// Rewrites a tool-reported path relative to `root`: drops a leading `./`,
/// strips the root prefix from absolute paths under it, and drops a trailing
/// `/`. Absolute paths outside `root` are kept as reported.
pub fn relativize_path(raw: &str, root: &Path) -> String {
    let mut trimmed = raw.strip_prefix("./").unwrap_or(raw);
    let as_path = Path::new(trimmed);
    let relative;
    if as_path.is_absolute() {
        if let Ok(rel) = as_path.strip_prefix(root) {
            relative = rel.to_string_lossy().into_owned();
            trimmed = &relative;
        }
    }
    let without_slash = trimmed.trim_end_matches('/');
    if without_slash.is_empty() {
        trimmed.to_string()
    } else {
        without_slash.to_string()
    }
}

/// Normalizes the path carried by a search record in place.
pub fn relativize_record(record: &mut StructuredRecord, root: &Path) {
    match record {
        StructuredRecord::Match { path, .. }
        | StructuredRecord::Context { path, .. }
        | StructuredRecord::Entry { path, .. } => *path = relativize_path(path, root),
        _ => {}
    }
}

/// One row of `git diff --numstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatRow {
    pub path: String,
    pub insertions: u64,
    pub deletions: u64,
    pub binary: bool,
}

pub fn parse_numstat_line(line: &str) -> Result<NumstatRow, StructuredRecord> {
    let failure = || StructuredRecord::ParseFailure {
        raw: line.to_string(),
    };
    let mut parts = line.splitn(3, '\t');
    let (ins, dels, path) = match (parts.next(), parts.next(), parts.next()) {
        (Some(ins), Some(dels), Some(path)) if !path.is_empty() => (ins, dels, path),
        _ => return Err(failure()),
    };
    let binary = ins == "-" && dels == "-";
    let count = |field: &str| -> Result<u64, StructuredRecord> {
        if field == "-" {
            Ok(0)
        } else {
            field.parse::<u64>().map_err(|_| failure())
        }
    };
    Ok(NumstatRow {
        path: path.to_string(),
        insertions: count(ins)?,
        deletions: count(dels)?,
        binary,
    })
}

/// One row of `git diff --name-status`; renames and copies report the new path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameStatusRow {
    pub status: String,
    pub path: String,
}

pub fn parse_name_status_line(line: &str) -> Result<NameStatusRow, StructuredRecord> {
    let parts: Vec<&str> = line.split('\t').collect();
    match parts.as_slice() {
        [status, .., path] if parts.len() >= 2 && !status.is_empty() && !path.is_empty() => {
            Ok(NameStatusRow {
                status: status.to_string(),
                path: path.to_string(),
            })
        }
        _ => Err(StructuredRecord::ParseFailure {
            raw: line.to_string(),
        }),
    }
}

/// One entry of `git status --porcelain=v1 -z`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PorcelainEntry {
    pub xy: String,
    pub path: String,
    pub rename_from: Option<String>,
}

/// Parses NUL-separated porcelain v1 output. Renames and copies carry their
/// source path in the following field.
pub fn parse_porcelain_z(stdout: &str) -> (Vec<PorcelainEntry>, Vec<StructuredRecord>) {
    let mut entries = Vec::new();
    let mut failures = Vec::new();
    let mut fields = stdout.split('\0').filter(|f| !f.is_empty());
    while let Some(field) = fields.next() {
        let bytes = field.as_bytes();
        if bytes.len() < 4 || bytes[2] != b' ' || !field.is_char_boundary(2) {
            failures.push(StructuredRecord::ParseFailure {
                raw: field.to_string(),
            });
            continue;
        }
        let xy = &field[..2];
        let rename_from = if xy.contains('R') || xy.contains('C') {
            fields.next().map(str::to_string)
        } else {
            None
        };
        entries.push(PorcelainEntry {
            xy: xy.to_string(),
            path: field[3..].to_string(),
            rename_from,
        });
    }
    (entries, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PatternKind;
    use std::path::PathBuf;

    #[test]
    fn match_uses_first_numbered_colon_field() {
        let record = parse_search_line("notes.txt:7:a:42:b", None).unwrap();
        assert_eq!(
            record,
            StructuredRecord::Match {
                path: "notes.txt".to_string(),
                line: 7,
                content: "a:42:b".to_string(),
                pattern: None,
            }
        );
    }

    #[test]
    fn path_with_colons_and_drive_letters() {
        let record = parse_search_line(r"C:\src\a:b.rs:12:let x = 1;", None).unwrap();
        match record {
            StructuredRecord::Match { path, line, content, .. } => {
                assert_eq!(path, r"C:\src\a:b.rs");
                assert_eq!(line, 12);
                assert_eq!(content, "let x = 1;");
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn context_line_with_dashes_in_content() {
        let record = parse_search_line("src/my-file.rs-3-fn a-1-b()", None).unwrap();
        assert_eq!(
            record,
            StructuredRecord::Context {
                path: "src/my-file.rs".to_string(),
                line: 3,
                content: "fn a-1-b()".to_string(),
            }
        );
    }

    #[test]
    fn separator_empty_and_informational_lines() {
        assert_eq!(parse_search_line("--", None), Some(StructuredRecord::Separator));
        assert_eq!(parse_search_line("", None), None);
        assert_eq!(
            parse_search_line("binary file matches (found \"\\0\")", None),
            Some(StructuredRecord::Line {
                text: "binary file matches (found \"\\0\")".to_string()
            })
        );
    }

    #[test]
    fn empty_content_and_trailing_carriage_return_are_verbatim() {
        let pattern = Pattern::new(PatternKind::Fixed, "x");
        assert_eq!(
            parse_search_line("a.txt:1:", Some(&pattern)),
            Some(StructuredRecord::Match {
                path: "a.txt".to_string(),
                line: 1,
                content: String::new(),
                pattern: Some(pattern.clone()),
            })
        );
        match parse_search_line("a.txt:2:x\r", None) {
            Some(StructuredRecord::Match { content, .. }) => assert_eq!(content, "x\r"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn output_lines_skips_blanks() {
        let lines: Vec<&str> = output_lines("a\n\nb\n").collect();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn relativize_strips_dot_prefix_and_root() {
        let root = PathBuf::from("/repo");
        assert_eq!(relativize_path("./src/lib.rs", &root), "src/lib.rs");
        assert_eq!(relativize_path("/repo/src/lib.rs", &root), "src/lib.rs");
        assert_eq!(relativize_path("/elsewhere/x", &root), "/elsewhere/x");
        assert_eq!(relativize_path("docs/", &root), "docs");
    }

    #[test]
    fn numstat_rows_and_failures() {
        assert_eq!(
            parse_numstat_line("3\t1\tsrc/lib.rs").unwrap(),
            NumstatRow {
                path: "src/lib.rs".to_string(),
                insertions: 3,
                deletions: 1,
                binary: false
            }
        );
        let binary = parse_numstat_line("-\t-\tlogo.png").unwrap();
        assert!(binary.binary);
        assert_eq!(binary.insertions, 0);
        assert!(matches!(
            parse_numstat_line("x\t1\tfile"),
            Err(StructuredRecord::ParseFailure { .. })
        ));
    }

    #[test]
    fn name_status_rename_reports_new_path() {
        let row = parse_name_status_line("R100\told.rs\tnew.rs").unwrap();
        assert_eq!(row.status, "R100");
        assert_eq!(row.path, "new.rs");
        assert!(parse_name_status_line("M").is_err());
    }

    #[test]
    fn porcelain_z_with_rename() {
        let raw = " M src/lib.rs\0R  new.rs\0old.rs\0?? notes.md\0";
        let (entries, failures) = parse_porcelain_z(raw);
        assert!(failures.is_empty());
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].xy, " M");
        assert_eq!(entries[1].path, "new.rs");
        assert_eq!(entries[1].rename_from.as_deref(), Some("old.rs"));
        assert_eq!(entries[2].xy, "??");
    }
}
