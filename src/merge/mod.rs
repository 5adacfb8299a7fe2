//! Deep merge of ordered documents
//!
//! Documents are folded left to right into an accumulator that starts as an
//! empty mapping. Precedence is purely positional: the later document wins at
//! every path it mentions.
//!
//! - mapping × mapping merges key by key; new keys are appended in the order
//!   they are first seen
//! - sequence × sequence follows the [`ListStrategy`]
//! - every other pair is an override by the later value
//! - a null on the later side removes the key; omitting the key keeps it

use clap::ValueEnum;
use std::fmt;

use crate::document::{display_path, Document, Mapping};
use crate::error::{Error, Result};

/// How two sequences at the same path combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListStrategy {
    /// The later sequence replaces the earlier one
    #[default]
    Replace,
    /// Items of the later sequence are appended
    Concat,
    /// Items of the later sequence are appended unless already present
    Union,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub list_strategy: ListStrategy,
    /// Abort on the first change of kind at a path instead of logging it.
    pub strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Same kind, later value taken
    Overridden,
    /// Kind changed, later value taken
    KindChanged,
    /// Null sentinel removed the earlier value
    Removed,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resolution::Overridden => "overridden",
            Resolution::KindChanged => "type changed",
            Resolution::Removed => "removed",
        })
    }
}

/// A path where the later document overrode or removed a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub path: Vec<String>,
    pub old: Document,
    /// `None` when the value was removed.
    pub new: Option<Document>,
    pub resolution: Resolution,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.new {
            Some(new) => write!(
                f,
                "{}: {} -> {} ({})",
                display_path(&self.path),
                self.old,
                new,
                self.resolution
            ),
            None => write!(f, "{}: {} ({})", display_path(&self.path), self.old, self.resolution),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeResult {
    pub document: Document,
    pub conflicts: Vec<Conflict>,
}

/// Fold `documents` left to right.
///
/// Only strict mode can fail; otherwise every combination of kinds has a
/// defined result and overrides are reported in [`MergeResult::conflicts`].
pub fn merge<I>(documents: I, options: MergeOptions) -> Result<MergeResult>
where
    I: IntoIterator<Item = Document>,
{
    let mut accumulator = Document::empty();
    let mut conflicts = Vec::new();
    for (idx, next) in documents.into_iter().enumerate() {
        accumulator = merge_into(accumulator, next, options, &mut conflicts)?;
        tracing::debug!("merged document {}, {} conflicts so far", idx + 1, conflicts.len());
    }
    Ok(MergeResult { document: accumulator, conflicts })
}

/// One fold step: merge `next` over `accumulator`.
///
/// Conflicts are appended to `conflicts`. In strict mode the first kind
/// change returns [`Error::Conflict`] immediately.
pub fn merge_into(
    accumulator: Document,
    next: Document,
    options: MergeOptions,
    conflicts: &mut Vec<Conflict>,
) -> Result<Document> {
    // An empty root mapping holds nothing, so adopting any root is not an override.
    if matches!(&accumulator, Document::Mapping(map) if map.is_empty()) {
        return Ok(strip_nulls(next).unwrap_or_default());
    }
    if next.is_null() {
        return Ok(accumulator);
    }
    let mut path = Vec::new();
    merge_values(accumulator, next, options, &mut path, conflicts)
}

fn merge_values(
    old: Document,
    new: Document,
    options: MergeOptions,
    path: &mut Vec<String>,
    conflicts: &mut Vec<Conflict>,
) -> Result<Document> {
    match (old, new) {
        (Document::Mapping(old), Document::Mapping(new)) => {
            merge_mappings(old, new, options, path, conflicts).map(Document::Mapping)
        }
        (Document::Sequence(old), Document::Sequence(new)) => {
            Ok(merge_sequences(old, new, options.list_strategy, path, conflicts))
        }
        (old, new) => {
            if old == new {
                return Ok(new);
            }
            let resolution = if old.kind() == new.kind() {
                Resolution::Overridden
            } else {
                Resolution::KindChanged
            };
            if resolution == Resolution::KindChanged && options.strict {
                return Err(Error::Conflict {
                    path: display_path(path),
                    old: old.kind(),
                    new: new.kind(),
                });
            }
            let new = strip_nulls(new).unwrap_or_default();
            conflicts.push(Conflict {
                path: path.clone(),
                old,
                new: Some(new.clone()),
                resolution,
            });
            Ok(new)
        }
    }
}

fn merge_mappings(
    mut old: Mapping,
    new: Mapping,
    options: MergeOptions,
    path: &mut Vec<String>,
    conflicts: &mut Vec<Conflict>,
) -> Result<Mapping> {
    for (key, value) in new {
        if value.is_null() {
            if let Some(removed) = old.shift_remove(&key) {
                path.push(key);
                conflicts.push(Conflict {
                    path: path.clone(),
                    old: removed,
                    new: None,
                    resolution: Resolution::Removed,
                });
                path.pop();
            }
            continue;
        }

        match old.get_index_of(&key) {
            Some(idx) => {
                let previous = std::mem::take(&mut old[idx]);
                path.push(key);
                old[idx] = merge_values(previous, value, options, path, conflicts)?;
                path.pop();
            }
            None => {
                if let Some(value) = strip_nulls(value) {
                    old.insert(key, value);
                }
            }
        }
    }
    Ok(old)
}

fn merge_sequences(
    mut old: Vec<Document>,
    new: Vec<Document>,
    strategy: ListStrategy,
    path: &[String],
    conflicts: &mut Vec<Conflict>,
) -> Document {
    match strategy {
        ListStrategy::Replace => {
            if old != new {
                conflicts.push(Conflict {
                    path: path.to_vec(),
                    old: Document::Sequence(old),
                    new: Some(Document::Sequence(new.clone())),
                    resolution: Resolution::Overridden,
                });
            }
            Document::Sequence(new)
        }
        ListStrategy::Concat => {
            old.extend(new);
            Document::Sequence(old)
        }
        ListStrategy::Union => {
            for item in new {
                if !old.contains(&item) {
                    old.push(item);
                }
            }
            Document::Sequence(old)
        }
    }
}

/// Drop null-valued mapping entries at every depth. Returns `None` for a bare
/// null. Sequence contents are data and are left alone.
fn strip_nulls(doc: Document) -> Option<Document> {
    match doc {
        Document::Mapping(map) => Some(Document::Mapping(
            map.into_iter()
                .filter_map(|(key, value)| strip_nulls(value).map(|value| (key, value)))
                .collect(),
        )),
        other if other.is_null() => None,
        other => Some(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Kind;
    use similar_asserts::assert_eq;

    fn doc(text: &str) -> Document {
        serde_json::from_str(text).expect("valid json")
    }

    fn merged(docs: &[&str]) -> Document {
        merged_with(docs, MergeOptions::default()).expect("non-strict merge").document
    }

    fn merged_with(docs: &[&str], options: MergeOptions) -> Result<MergeResult> {
        merge(docs.iter().map(|d| doc(d)), options)
    }

    fn merge_docs<const N: usize>(docs: [Document; N]) -> MergeResult {
        merge(docs, MergeOptions::default()).expect("non-strict merge")
    }

    fn keys(doc: &Document) -> Vec<String> {
        doc.as_mapping().expect("mapping").keys().cloned().collect()
    }

    #[test]
    fn test_nested_mappings_merge_per_key() {
        assert_eq!(
            merged(&[r#"{"a": {"x": 1, "y": 2}}"#, r#"{"a": {"y": 3, "z": 4}}"#]),
            doc(r#"{"a": {"x": 1, "y": 3, "z": 4}}"#)
        );
    }

    #[test]
    fn test_key_order_is_first_seen() {
        let result = merged(&[r#"{"b": 1, "a": {"q": 1}}"#, r#"{"c": 1, "a": {"p": 1}, "b": 2}"#]);
        assert_eq!(keys(&result), ["b", "a", "c"]);
        assert_eq!(keys(result.get_path(&["a"]).unwrap()), ["q", "p"]);
    }

    #[test]
    fn test_list_strategies() {
        let docs = [r#"{"list": [1, 2]}"#, r#"{"list": [3]}"#];
        assert_eq!(merged(&docs), doc(r#"{"list": [3]}"#));

        let concat = MergeOptions { list_strategy: ListStrategy::Concat, strict: false };
        assert_eq!(merged_with(&docs, concat).unwrap().document, doc(r#"{"list": [1, 2, 3]}"#));

        let dup = [r#"{"list": [1, 2, 1]}"#, r#"{"list": [3, 4, 1, 5]}"#];
        assert_eq!(
            merged_with(&dup, concat).unwrap().document,
            doc(r#"{"list": [1, 2, 1, 3, 4, 1, 5]}"#)
        );
        let union = MergeOptions { list_strategy: ListStrategy::Union, strict: false };
        assert_eq!(
            merged_with(&dup, union).unwrap().document,
            doc(r#"{"list": [1, 2, 1, 3, 4, 5]}"#)
        );
    }

    #[test]
    fn test_union_compares_structurally() {
        let union = MergeOptions { list_strategy: ListStrategy::Union, strict: false };
        let result = merged_with(
            &[r#"{"l": [{"a": 1}, [1, 2]]}"#, r#"{"l": [{"a": 1}, [2, 1], {"a": 2}]}"#],
            union,
        )
        .unwrap();
        assert_eq!(result.document, doc(r#"{"l": [{"a": 1}, [1, 2], [2, 1], {"a": 2}]}"#));
    }

    #[test]
    fn test_null_removes_and_omission_keeps() {
        let base = r#"{"a": {"deep": {"x": 1}}, "b": 1}"#;
        let removed = merged(&[base, r#"{"a": null}"#]);
        assert_eq!(removed, doc(r#"{"b": 1}"#));

        let omitted = merged(&[base, r#"{"b": 2}"#]);
        assert_eq!(omitted, doc(r#"{"a": {"deep": {"x": 1}}, "b": 2}"#));

        let nested = merged(&[base, r#"{"a": {"deep": {"x": null}}}"#]);
        assert_eq!(nested, doc(r#"{"a": {"deep": {}}, "b": 1}"#));
    }

    #[test]
    fn test_null_for_missing_key_is_noop() {
        let result = merge_docs([doc(r#"{"a": 1}"#), doc(r#"{"zzz": null, "n": {"x": null, "y": 1}}"#)]);
        assert_eq!(result.document, doc(r#"{"a": 1, "n": {"y": 1}}"#));
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn test_nulls_in_sequences_are_kept() {
        let kept = r#"{"l": [null, 1, {"n": null}]}"#;
        assert_eq!(merged(&[kept]), doc(kept));
    }

    #[test]
    fn test_removal_is_logged() {
        let result = merge_docs([doc(r#"{"a": {"b": 1}}"#), doc(r#"{"a": {"b": null}}"#)]);
        assert_eq!(
            result.conflicts,
            vec![Conflict {
                path: vec!["a".into(), "b".into()],
                old: doc("1"),
                new: None,
                resolution: Resolution::Removed,
            }]
        );
        assert_eq!(result.conflicts[0].to_string(), "a.b: 1 (removed)");
    }

    #[test]
    fn test_overrides_and_kind_changes_are_logged() {
        let result = merge_docs([
            doc(r#"{"port": 80, "host": "a", "same": true, "tls": {"on": true}}"#),
            doc(r#"{"port": 8080, "host": "a", "same": true, "tls": "off"}"#),
        ]);
        assert_eq!(result.document, doc(r#"{"port": 8080, "host": "a", "same": true, "tls": "off"}"#));
        assert_eq!(result.conflicts.len(), 2);
        assert_eq!(result.conflicts[0].resolution, Resolution::Overridden);
        assert_eq!(result.conflicts[0].to_string(), "port: 80 -> 8080 (overridden)");
        assert_eq!(result.conflicts[1].resolution, Resolution::KindChanged);
        assert_eq!(result.conflicts[1].to_string(), r#"tls: {on: true} -> "off" (type changed)"#);
    }

    #[test]
    fn test_integer_to_float_is_not_a_kind_change() {
        let result = merge_docs([doc(r#"{"ratio": 1}"#), doc(r#"{"ratio": 1.5}"#)]);
        assert_eq!(result.conflicts[0].resolution, Resolution::Overridden);
    }

    #[test]
    fn test_strict_mode_fails_on_first_kind_change() {
        let strict = MergeOptions { strict: true, ..MergeOptions::default() };
        let err = merged_with(
            &[r#"{"a": {"b": 1}, "c": [1]}"#, r#"{"a": {"b": "x"}, "c": "y"}"#],
            strict,
        )
        .unwrap_err();
        match err {
            Error::Conflict { path, old, new } => {
                assert_eq!(path, "a.b");
                assert_eq!(old, Kind::Number);
                assert_eq!(new, Kind::String);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_strict_mode_allows_same_kind_overrides() {
        let strict = MergeOptions { strict: true, ..MergeOptions::default() };
        let result = merged_with(&[r#"{"a": 1, "b": [1]}"#, r#"{"a": 2, "b": [2], "c": null}"#], strict)
            .unwrap();
        assert_eq!(result.document, doc(r#"{"a": 2, "b": [2]}"#));
        assert_eq!(result.conflicts.len(), 2);
    }

    #[test]
    fn test_non_strict_collects_every_conflict() {
        let result = merged_with(
            &[r#"{"a": {"b": 1}, "c": [1]}"#, r#"{"a": {"b": "x"}, "c": "y"}"#],
            MergeOptions::default(),
        )
        .unwrap();
        let paths: Vec<String> = result.conflicts.iter().map(|c| display_path(&c.path)).collect();
        assert_eq!(paths, ["a.b", "c"]);
    }

    #[test]
    fn test_first_document_root_is_adopted_without_conflict() {
        let result = merge_docs([doc("[1, 2]")]);
        assert_eq!(result.document, doc("[1, 2]"));
        assert!(result.conflicts.is_empty());

        let strict = MergeOptions { strict: true, ..MergeOptions::default() };
        assert!(merged_with(&["[1]", "[2]"], strict).is_ok());
    }

    #[test]
    fn test_self_merge_is_idempotent() {
        let a = r#"{"a": {"b": 1, "c": {"d": "x"}}, "e": true}"#;
        assert_eq!(merged(&[a, a]), merged(&[a]));
        assert_eq!(merged(&[a]), doc(a));
    }

    #[test]
    fn test_untouched_paths_pass_through() {
        let a = r#"{"only_a": {"x": 1}, "shared": {"from_a": 1, "v": 1}}"#;
        let b = r#"{"only_b": [1], "shared": {"from_b": 2, "v": 2}}"#;
        let result = merged(&[a, b]);
        assert_eq!(result.get_path(&["only_a"]), doc(a).get_path(&["only_a"]));
        assert_eq!(result.get_path(&["only_b"]), doc(b).get_path(&["only_b"]));
        assert_eq!(result.get_path(&["shared", "from_a"]), Some(&doc("1")));
        assert_eq!(result.get_path(&["shared", "from_b"]), Some(&doc("2")));
        assert_eq!(result.get_path(&["shared", "v"]), Some(&doc("2")));
    }

    #[test]
    fn test_fold_is_associative() {
        let a = r#"{"a": {"x": 1}, "l": [1], "gone": 1}"#;
        let b = r#"{"a": {"y": 2}, "l": [2], "gone": null, "n": {"k": null, "v": 1}}"#;
        let c = r#"{"a": {"x": 3}, "l": [3], "gone": 5}"#;
        for strategy in [ListStrategy::Replace, ListStrategy::Concat, ListStrategy::Union] {
            let options = MergeOptions { list_strategy: strategy, strict: false };
            let ab = merged_with(&[a, b], options).unwrap().document;
            let ab_c = merge([ab, doc(c)], options).unwrap().document;
            let abc = merged_with(&[a, b, c], options).unwrap().document;
            assert_eq!(ab_c, abc, "{strategy:?}");
        }
    }

    #[test]
    fn test_merge_into_is_a_single_step() {
        let mut conflicts = Vec::new();
        let acc = merge_into(
            doc(r#"{"a": 1}"#),
            doc(r#"{"a": 2}"#),
            MergeOptions::default(),
            &mut conflicts,
        )
        .unwrap();
        assert_eq!(acc, doc(r#"{"a": 2}"#));
        assert_eq!(conflicts.len(), 1);
    }

    #[test]
    fn test_scalar_root_replaced_by_mapping() {
        let result = merge_docs([doc("1"), doc(r#"{"a": 1}"#)]);
        assert_eq!(result.document, doc(r#"{"a": 1}"#));
        assert_eq!(result.conflicts[0].resolution, Resolution::KindChanged);
        assert_eq!(result.conflicts[0].to_string(), "(root): 1 -> {a: 1} (type changed)");
    }
}
