// scout-core/src/merge.rs

//! Canonical ordering of results gathered from concurrent invocations.
//! Nothing upstream of this module may be relied on for order.

use crate::records::Pattern;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A raw output line and the pattern whose invocation produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedLine {
    pub text: String,
    pub pattern: Option<Pattern>,
}

impl Ord for TaggedLine {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text
            .cmp(&other.text)
            .then_with(|| self.pattern.cmp(&other.pattern))
    }
}

impl PartialOrd for TaggedLine {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Flattens per-invocation batches and sorts by raw text, ties broken by the
/// originating pattern.
pub fn merge_lines(batches: Vec<Vec<TaggedLine>>) -> Vec<TaggedLine> {
    let mut merged: Vec<TaggedLine> = batches.into_iter().flatten().collect();
    merged.sort();
    merged
}

/// Set union of enumerated paths in ascending order.
pub fn union_paths<I>(batches: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = String>,
{
    batches
        .into_iter()
        .flatten()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    Size,
    Mtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::Size => "size",
            SortKey::Mtime => "mtime",
        }
    }
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Anything the inventory ranker can order.
pub trait Rankable {
    fn rank_path(&self) -> &str;
    fn rank_size(&self) -> u64;
    fn rank_mtime(&self) -> i64;
}

/// Sorts by `key` in `order`; equal keys always fall back to path ascending
/// so the result is a strict total order.
pub fn rank<T: Rankable>(items: &mut [T], key: SortKey, order: SortOrder) {
    items.sort_by(|a, b| {
        let primary = match key {
            SortKey::Name => a.rank_path().cmp(b.rank_path()),
            SortKey::Size => a.rank_size().cmp(&b.rank_size()),
            SortKey::Mtime => a.rank_mtime().cmp(&b.rank_mtime()),
        };
        let primary = match order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.rank_path().cmp(b.rank_path()))
    });
}
