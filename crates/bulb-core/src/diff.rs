//! Line diffs for reviewing file changes.
//!
//! [`GreedyDiff`] is the two-pointer walk the review panel has always used.
//! It never looks ahead, so reordered lines or a deletion followed by
//! unrelated insertions are reported as more changes than strictly needed.
//! [`MyersDiff`] produces a minimal edit script behind the same trait.

use serde::Serialize;
use similar::{Algorithm, DiffTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Same,
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    fn new(kind: LineKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

pub trait LineDiff {
    fn diff(&self, old: &str, new: &str) -> Vec<DiffLine>;
}

/// Diff with the default (greedy) renderer.
pub fn diff(old: &str, new: &str) -> Vec<DiffLine> {
    GreedyDiff.diff(old, new)
}

/// Lines are split on `\n` only, so `"a\n"` is `["a", ""]`.
fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n').collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyDiff;

impl LineDiff for GreedyDiff {
    fn diff(&self, old: &str, new: &str) -> Vec<DiffLine> {
        let old = split_lines(old);
        let new = split_lines(new);
        let mut out = Vec::with_capacity(old.len().max(new.len()));

        let (mut oi, mut ni) = (0, 0);
        while oi < old.len() || ni < new.len() {
            if oi < old.len() && ni < new.len() && old[oi] == new[ni] {
                out.push(DiffLine::new(LineKind::Same, old[oi]));
                oi += 1;
                ni += 1;
            } else if oi < old.len() && (ni >= new.len() || old[oi] != new[ni]) {
                out.push(DiffLine::new(LineKind::Remove, old[oi]));
                oi += 1;
            } else {
                out.push(DiffLine::new(LineKind::Add, new[ni]));
                ni += 1;
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MyersDiff;

impl LineDiff for MyersDiff {
    fn diff(&self, old: &str, new: &str) -> Vec<DiffLine> {
        let old = split_lines(old);
        let new = split_lines(new);
        let mut out = Vec::new();

        for op in similar::capture_diff_slices(Algorithm::Myers, &old, &new) {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    out.extend(old[old_range].iter().map(|l| DiffLine::new(LineKind::Same, l)));
                }
                DiffTag::Delete => {
                    out.extend(old[old_range].iter().map(|l| DiffLine::new(LineKind::Remove, l)));
                }
                DiffTag::Insert => {
                    out.extend(new[new_range].iter().map(|l| DiffLine::new(LineKind::Add, l)));
                }
                DiffTag::Replace => {
                    out.extend(old[old_range].iter().map(|l| DiffLine::new(LineKind::Remove, l)));
                    out.extend(new[new_range].iter().map(|l| DiffLine::new(LineKind::Add, l)));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAIRS: &[(&str, &str)] = &[
        ("", ""),
        ("a", ""),
        ("", "a\nb"),
        ("a\nb\nc", "a\nb\nc"),
        ("a\nb\nc", "a\nx\nc"),
        ("a\nb\nc\n", "c\nb\na\n"),
        ("fn main() {\n}\n", "fn main() {\n    run();\n}\n"),
        ("one\ntwo\nthree", "zero\none\ntwo\nthree\nfour"),
        ("x\ny", "y\nx\ny\nz"),
    ];

    fn rebuild(lines: &[DiffLine], skip: LineKind) -> String {
        lines
            .iter()
            .filter(|l| l.kind != skip)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn kinds(lines: &[DiffLine]) -> Vec<LineKind> {
        lines.iter().map(|l| l.kind).collect()
    }

    #[test]
    fn identical_input_is_all_same() {
        for text in ["", "a", "a\nb\n", "  indented\n\n\nblank lines"] {
            for differ in [&GreedyDiff as &dyn LineDiff, &MyersDiff] {
                let lines = differ.diff(text, text);
                assert_eq!(lines.len(), text.split('\n').count());
                assert!(lines.iter().all(|l| l.kind == LineKind::Same));
            }
        }
    }

    #[test]
    fn both_sides_are_reconstructed() {
        for (old, new) in PAIRS {
            for differ in [&GreedyDiff as &dyn LineDiff, &MyersDiff] {
                let lines = differ.diff(old, new);
                assert_eq!(rebuild(&lines, LineKind::Add), *old, "{old:?} -> {new:?}");
                assert_eq!(rebuild(&lines, LineKind::Remove), *new, "{old:?} -> {new:?}");
            }
        }
    }

    #[test]
    fn greedy_walk_emits_remove_before_add() {
        let lines = diff("a\nb\nc", "a\nx\nc");
        assert_eq!(
            kinds(&lines),
            [
                LineKind::Same,
                LineKind::Remove,
                LineKind::Remove,
                LineKind::Add,
                LineKind::Add,
            ]
        );
    }

    // Known limitation: no re-synchronisation after a mismatch, so one
    // inserted line at the top turns the whole file into remove + add.
    #[test]
    fn greedy_overreports_an_insertion_at_the_top() {
        let old = "one\ntwo\nthree";
        let new = "zero\none\ntwo\nthree";

        let greedy = GreedyDiff.diff(old, new);
        assert_eq!(greedy.iter().filter(|l| l.kind == LineKind::Remove).count(), 3);
        assert_eq!(greedy.iter().filter(|l| l.kind == LineKind::Add).count(), 4);

        let myers = MyersDiff.diff(old, new);
        assert_eq!(
            kinds(&myers),
            [LineKind::Add, LineKind::Same, LineKind::Same, LineKind::Same]
        );
    }

    #[test]
    fn greedy_overreports_reordered_lines() {
        let old = "a\nb\nc\nd";
        let new = "b\na\nc\nd";
        fn same(lines: &[DiffLine]) -> usize {
            lines.iter().filter(|l| l.kind == LineKind::Same).count()
        }

        assert_eq!(same(&GreedyDiff.diff(old, new)), 1);
        assert_eq!(same(&MyersDiff.diff(old, new)), 3);
    }

    #[test]
    fn serializes_with_type_tags() {
        let json = serde_json::to_value(diff("a", "b")).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "type": "remove", "text": "a" },
                { "type": "add", "text": "b" },
            ])
        );
    }
}
