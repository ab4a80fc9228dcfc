use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::Deserialize;
use serde::Serialize;

use super::desc::{check_lengths, mismatch, ChangeDesc, Lengths};
use super::section::{add_insert, add_section, compose_sections, iter_changes, map_sections, Section, SectionIter, KEPT};
use super::{Assoc, MapMode, RangeTouch};
use crate::chars::split_lines;
use crate::error::{Error, Result};
use crate::text::Text;

/// A change with its inserted text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeSet {
    desc: ChangeDesc,
    /// Inserted text per section, padded with empty texts.
    inserted: Vec<Text>,
}

/// Text to insert with a [`ChangeSpec::Change`].
#[derive(Debug, Clone, Default)]
pub enum Insert {
    #[default]
    Empty,
    /// Split into lines on `"\r\n"`, `"\r"` and `"\n"`, or on the separator
    /// given to [`ChangeSet::of`].
    Str(String),
    Text(Text),
}

impl Insert {
    fn into_text(self, line_sep: Option<&str>) -> Text {
        return match self {
            Insert::Empty => Text::empty(),
            Insert::Str(s) => Text::from_lines(split_lines(&s, line_sep)),
            Insert::Text(text) => text,
        };
    }
}

impl From<&str> for Insert {
    fn from(s: &str) -> Insert {
        return Insert::Str(s.to_string());
    }
}

impl From<String> for Insert {
    fn from(s: String) -> Insert {
        return Insert::Str(s);
    }
}

impl From<Text> for Insert {
    fn from(text: Text) -> Insert {
        return Insert::Text(text);
    }
}

/// A description of changes to a document of known length.
///
/// All positions refer to the original document, whatever their order.
#[derive(Debug, Clone)]
pub enum ChangeSpec {
    /// Replace `[from, to)` with `insert`.
    Change { from: usize, to: usize, insert: Insert },
    /// A change set over the same document.
    Set(ChangeSet),
    Many(Vec<ChangeSpec>),
}

impl ChangeSpec {
    pub fn replace(from: usize, to: usize, insert: impl Into<Insert>) -> ChangeSpec {
        return ChangeSpec::Change {
            from,
            to,
            insert: insert.into(),
        };
    }

    pub fn insert(pos: usize, insert: impl Into<Insert>) -> ChangeSpec {
        return ChangeSpec::replace(pos, pos, insert);
    }

    pub fn delete(from: usize, to: usize) -> ChangeSpec {
        return ChangeSpec::replace(from, to, Insert::Empty);
    }
}

impl From<ChangeSet> for ChangeSpec {
    fn from(set: ChangeSet) -> ChangeSpec {
        return ChangeSpec::Set(set);
    }
}

impl From<Vec<ChangeSpec>> for ChangeSpec {
    fn from(specs: Vec<ChangeSpec>) -> ChangeSpec {
        return ChangeSpec::Many(specs);
    }
}

/// Result of [`ChangeSet::filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filtered {
    /// The parts of the change outside the filtered ranges.
    pub changes: ChangeSet,
    /// The dropped parts, against the same document as `changes`.
    pub filtered: ChangeDesc,
}

/// Accumulates specs in ascending position order. A spec that goes
/// backwards closes the current batch, which is mapped over and composed
/// with the batches before it.
struct Builder<'s> {
    length: usize,
    line_sep: Option<&'s str>,
    sections: Vec<Section>,
    inserted: Vec<Text>,
    pos: usize,
    total: Option<ChangeSet>,
}

impl Builder<'_> {
    fn process(&mut self, spec: ChangeSpec) -> Result<()> {
        match spec {
            ChangeSpec::Many(specs) => {
                for spec in specs {
                    self.process(spec)?;
                }
            }
            ChangeSpec::Set(set) => {
                check_lengths(self.length, set.length())?;
                self.flush(false)?;
                self.merge(set)?;
            }
            ChangeSpec::Change { from, to, insert } => {
                if from > to || to > self.length {
                    return Err(Error::InvalidChangeRange {
                        from,
                        to,
                        len: self.length,
                    });
                }
                let text = insert.into_text(self.line_sep);
                let ins_len = text.len();
                if from == to && ins_len == 0 {
                    return Ok(());
                }
                if from < self.pos {
                    self.flush(false)?;
                }
                if from > self.pos {
                    add_section(&mut self.sections, from - self.pos, KEPT, false);
                }
                add_section(&mut self.sections, to - from, ins_len as isize, false);
                add_insert(&mut self.inserted, &self.sections, text);
                self.pos = to;
            }
        }
        return Ok(());
    }

    fn flush(&mut self, force: bool) -> Result<()> {
        if !force && self.sections.is_empty() {
            return Ok(());
        }
        if self.pos < self.length {
            add_section(&mut self.sections, self.length - self.pos, KEPT, false);
        }
        let set = ChangeSet::from_parts(std::mem::take(&mut self.sections), std::mem::take(&mut self.inserted));
        self.pos = 0;
        return self.merge(set);
    }

    fn merge(&mut self, set: ChangeSet) -> Result<()> {
        let total = match self.total.take() {
            Some(total) => total.compose(&set.map(total.desc(), false)?)?,
            None => set,
        };
        self.total = Some(total);
        return Ok(());
    }

    fn finish(mut self) -> Result<ChangeSet> {
        let force = self.total.is_none();
        self.flush(force)?;
        return Ok(self.total.unwrap_or_else(|| ChangeSet::empty(self.length)));
    }
}

impl ChangeSet {
    pub(crate) fn from_parts(sections: Vec<Section>, inserted: Vec<Text>) -> ChangeSet {
        return ChangeSet {
            desc: ChangeDesc::new(sections),
            inserted,
        };
    }

    /// Build a change set from a spec against a document of `length`.
    ///
    /// `line_sep` splits string insertions; by default any of `"\r\n"`,
    /// `"\r"` and `"\n"` ends a line.
    ///
    /// ```
    /// use docmodel::{ChangeSet, ChangeSpec, Text};
    ///
    /// let doc = Text::from("hello world");
    /// let set = ChangeSet::of(ChangeSpec::replace(6, 11, "there"), 11, None).unwrap();
    /// assert_eq!(set.apply(&doc).unwrap().to_string(), "hello there");
    /// ```
    pub fn of(spec: impl Into<ChangeSpec>, length: usize, line_sep: Option<&str>) -> Result<ChangeSet> {
        let mut builder = Builder {
            length,
            line_sep,
            sections: Vec::new(),
            inserted: Vec::new(),
            pos: 0,
            total: None,
        };
        builder.process(spec.into())?;
        return builder.finish();
    }

    /// A change set that keeps a document of `length` as is.
    pub fn empty(length: usize) -> ChangeSet {
        let sections = if length > 0 { vec![Section::kept(length)] } else { Vec::new() };
        return ChangeSet::from_parts(sections, Vec::new());
    }

    /// The shape of this change.
    pub fn desc(&self) -> &ChangeDesc {
        return &self.desc;
    }

    /// Inserted text per section. Kept sections and pure deletions have
    /// empty entries, and trailing ones may be missing.
    pub fn inserted(&self) -> &[Text] {
        return &self.inserted;
    }

    pub fn length(&self) -> usize {
        return self.desc.length();
    }

    pub fn new_length(&self) -> usize {
        return self.desc.new_length();
    }

    pub fn is_empty(&self) -> bool {
        return self.desc.is_empty();
    }

    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
        return self.desc.map_pos(pos, assoc);
    }

    pub fn map_pos_mode(&self, pos: usize, assoc: Assoc, mode: MapMode) -> Result<Option<usize>> {
        return self.desc.map_pos_mode(pos, assoc, mode);
    }

    pub fn touches_range(&self, from: usize, to: usize) -> RangeTouch {
        return self.desc.touches_range(from, to);
    }

    pub fn iter_gaps<F: FnMut(usize, usize, usize)>(&self, f: F) {
        self.desc.iter_gaps(f);
    }

    pub fn iter_changed_ranges<F: FnMut(usize, usize, usize, usize)>(&self, f: F, individual: bool) {
        self.desc.iter_changed_ranges(f, individual);
    }

    /// Call `f(from_a, to_a, from_b, to_b, inserted)` for each replaced
    /// range. Adjacent replacements are joined unless `individual` is set.
    pub fn iter_changes<F: FnMut(usize, usize, usize, usize, &Text)>(&self, f: F, individual: bool) {
        iter_changes(&self.desc.sections, Some(&self.inserted), individual, f);
    }

    /// Apply the change to `doc`, which must have the change's length.
    pub fn apply(&self, doc: &Text) -> Result<Text> {
        check_lengths(self.length(), doc.len())?;
        let mut doc = doc.clone();
        self.iter_changes(
            |from_a, to_a, from_b, _, text| {
                doc = doc.replace(from_b, from_b + (to_a - from_a), text);
            },
            false,
        );
        return Ok(doc);
    }

    /// The change that undoes this one. `doc` is the document this change
    /// applies to, which supplies the deleted text.
    pub fn invert(&self, doc: &Text) -> Result<ChangeSet> {
        check_lengths(self.length(), doc.len())?;
        let mut sections = self.desc.sections.clone();
        let mut inserted = Vec::new();
        let mut pos = 0;
        for (i, section) in sections.iter_mut().enumerate() {
            let len = section.len;
            if !section.is_kept() {
                *section = Section {
                    len: section.ins as usize,
                    ins: len as isize,
                };
                if len > 0 {
                    inserted.resize(i, Text::empty());
                    inserted.push(doc.slice(pos, pos + len));
                }
            }
            pos += len;
        }
        return Ok(ChangeSet::from_parts(sections, inserted));
    }

    /// Compose with `other`, which applies to the document this change
    /// produces.
    pub fn compose(&self, other: &ChangeSet) -> Result<ChangeSet> {
        check_lengths(self.new_length(), other.length())?;
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        let walked = compose_sections(
            SectionIter::new(&self.desc.sections, Some(&self.inserted)),
            SectionIter::new(&other.desc.sections, Some(&other.inserted)),
            true,
        );
        let Some((sections, inserted)) = walked else {
            return Err(mismatch(self.new_length(), other.length()));
        };
        tracing::trace!(sections = sections.len(), length = self.length(), "composed change sets");
        return Ok(ChangeSet::from_parts(sections, inserted));
    }

    /// Rebase onto `other`, a change of the same document.
    ///
    /// Insertions survive mapping; deletions of text `other` already deleted
    /// are dropped. Where both insert at one position, `before` puts this
    /// change's insertion first.
    pub fn map(&self, other: &ChangeDesc, before: bool) -> Result<ChangeSet> {
        check_lengths(other.length(), self.length())?;
        if other.is_empty() {
            return Ok(self.clone());
        }
        let walked = map_sections(
            SectionIter::new(&self.desc.sections, Some(&self.inserted)),
            SectionIter::new(&other.sections, None),
            before,
            true,
        );
        let Some((sections, inserted)) = walked else {
            return Err(mismatch(other.length(), self.length()));
        };
        tracing::trace!(sections = sections.len(), before, "mapped change set");
        return Ok(ChangeSet::from_parts(sections, inserted));
    }

    /// Split the change around `ranges`, sorted non-overlapping `(from, to)`
    /// pairs in the original document. Parts inside the ranges move to
    /// `filtered`.
    pub fn filter(&self, ranges: &[(usize, usize)]) -> Filtered {
        let mut result = Vec::new();
        let mut result_inserted = Vec::new();
        let mut filtered = Vec::new();
        let mut iter = SectionIter::new(&self.desc.sections, Some(&self.inserted));
        let mut ranges = ranges.iter().copied();
        let mut pos = 0;
        'done: loop {
            let (next, end) = ranges.next().unwrap_or((usize::MAX, usize::MAX));
            while pos < next || (pos == next && iter.len == 0) {
                if iter.done() {
                    break 'done;
                }
                let len = iter.len.min(next - pos);
                add_section(&mut filtered, len, KEPT, false);
                let ins = section_remainder(&iter);
                add_section(&mut result, len, ins, false);
                if ins > 0 {
                    add_insert(&mut result_inserted, &result, iter.text());
                }
                iter.forward(len);
                pos += len;
            }
            while pos < end {
                if iter.done() {
                    break 'done;
                }
                let len = iter.len.min(end - pos);
                add_section(&mut result, len, KEPT, false);
                add_section(&mut filtered, len, section_remainder(&iter), false);
                iter.forward(len);
                pos += len;
            }
        }
        return Filtered {
            changes: ChangeSet::from_parts(result, result_inserted),
            filtered: ChangeDesc::new(filtered),
        };
    }

    /// Serialize as an array where a number is a kept length, `[len]` a
    /// deletion and `[len, line, ...]` a replacement.
    pub fn to_json(&self) -> serde_json::Value {
        let parts = self.desc.sections.iter().enumerate().map(|(i, section)| {
            if section.is_kept() {
                return serde_json::Value::from(section.len);
            }
            let mut part = vec![serde_json::Value::from(section.len)];
            if section.ins > 0 {
                if let Some(text) = self.inserted.get(i) {
                    part.extend(text.to_lines().into_iter().map(serde_json::Value::String));
                }
            }
            return serde_json::Value::Array(part);
        });
        return serde_json::Value::Array(parts.collect());
    }

    /// Parse the form produced by [`ChangeSet::to_json`].
    pub fn from_json(value: &serde_json::Value) -> Result<ChangeSet> {
        let invalid = || {
            tracing::debug!("rejected malformed change set JSON");
            return Error::InvalidJson("ChangeSet");
        };
        let parts = value.as_array().ok_or_else(invalid)?;
        let mut sections = Vec::with_capacity(parts.len());
        let mut inserted = Vec::new();
        let mut lengths = Lengths::default();
        for part in parts {
            let (section, text) = match part {
                serde_json::Value::Array(items) => {
                    let len = items.first().and_then(json_len).ok_or_else(invalid)?;
                    let lines = items[1..]
                        .iter()
                        .map(|item| item.as_str().map(String::from))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(invalid)?;
                    let text = if lines.is_empty() { Text::empty() } else { Text::of(lines).map_err(|_| invalid())? };
                    let section = Section {
                        len,
                        ins: text.len() as isize,
                    };
                    (section, text)
                }
                _ => (Section::kept(json_len(part).ok_or_else(invalid)?), Text::empty()),
            };
            if lengths.add(section).is_none() {
                tracing::debug!("rejected change set with overflowing length");
                return Err(Error::InvalidJson("ChangeSet"));
            }
            add_section(&mut sections, section.len, section.ins, false);
            add_insert(&mut inserted, &sections, text);
        }
        return Ok(ChangeSet::from_parts(sections, inserted));
    }
}

/// A section length in JSON: a non-negative integer that fits `usize`.
fn json_len(value: &serde_json::Value) -> Option<usize> {
    return value.as_u64().and_then(|len| usize::try_from(len).ok());
}

/// What a section contributes from the iterator's current offset: kept, its
/// whole insertion at its start, or nothing further once partly consumed.
fn section_remainder(iter: &SectionIter<'_>) -> isize {
    if iter.ins == KEPT {
        return KEPT;
    }
    if iter.off == 0 {
        return iter.ins;
    }
    return 0;
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return fmt::Display::fmt(&self.desc, f);
    }
}

impl Serialize for ChangeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        return self.to_json().serialize(serializer);
    }
}

impl<'de> Deserialize<'de> for ChangeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<ChangeSet, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        return ChangeSet::from_json(&value).map_err(serde::de::Error::custom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(spec: impl Into<ChangeSpec>, length: usize) -> ChangeSet {
        return ChangeSet::of(spec, length, None).unwrap();
    }

    #[test]
    fn of_sorts_into_sections() {
        let c = set(vec![ChangeSpec::insert(1, "ab"), ChangeSpec::delete(3, 5)], 8);
        assert_eq!(c.to_string(), "1 0:2 2 2:0 3");
        assert_eq!(c.new_length(), 8);
        assert_eq!(c.apply(&Text::from("01234567")).unwrap().to_string(), "0ab12567");
    }

    #[test]
    fn of_composes_out_of_order_specs() {
        let c = set(vec![ChangeSpec::replace(5, 6, "X"), ChangeSpec::insert(1, "Y")], 8);
        assert_eq!(c.apply(&Text::from("01234567")).unwrap().to_string(), "0Y1234X67");
    }

    #[test]
    fn of_rejects_bad_ranges() {
        assert!(matches!(
            ChangeSet::of(ChangeSpec::delete(3, 9), 8, None),
            Err(Error::InvalidChangeRange { from: 3, to: 9, len: 8 })
        ));
        assert!(ChangeSet::of(ChangeSpec::delete(4, 3), 8, None).is_err());
        let nested = ChangeSet::empty(3);
        assert!(matches!(
            ChangeSet::of(nested, 8, None),
            Err(Error::LengthMismatch { expected: 8, actual: 3 })
        ));
    }

    #[test]
    fn of_splits_insertions_with_separator() {
        let c = ChangeSet::of(ChangeSpec::insert(0, "a|b"), 0, Some("|")).unwrap();
        let doc = c.apply(&Text::empty()).unwrap();
        assert_eq!(doc.lines(), 2);
        assert_eq!(doc.to_string(), "a\nb");
    }

    #[test]
    fn empty_specs_give_empty_sets() {
        let c = set(Vec::<ChangeSpec>::new(), 5);
        assert!(c.is_empty());
        assert_eq!(c, ChangeSet::empty(5));
        assert_eq!(set(ChangeSpec::insert(2, ""), 5), ChangeSet::empty(5));
    }

    #[test]
    fn apply_and_invert_roundtrip() {
        let doc = Text::from("hello world");
        let c = set(ChangeSpec::replace(6, 11, "there"), 11);
        let changed = c.apply(&doc).unwrap();
        assert_eq!(changed.to_string(), "hello there");
        let undone = c.invert(&doc).unwrap().apply(&changed).unwrap();
        assert_eq!(undone.to_string(), "hello world");
        assert!(matches!(c.apply(&Text::from("short")), Err(Error::LengthMismatch { .. })));
        assert!(c.invert(&Text::from("short")).is_err());
    }

    #[test]
    fn compose_matches_sequential_application() {
        let doc = Text::from("abcdef");
        let a = set(ChangeSpec::replace(1, 3, "XYZ"), 6);
        let b = set(vec![ChangeSpec::delete(2, 5), ChangeSpec::insert(7, "!")], 7);
        let ab = a.compose(&b).unwrap();
        let step = b.apply(&a.apply(&doc).unwrap()).unwrap();
        assert_eq!(ab.apply(&doc).unwrap(), step);
        assert_eq!(step.to_string(), "aXef!");
        assert!(b.compose(&a).is_err());
    }

    #[test]
    fn map_keeps_insertions_inside_deleted_ranges() {
        let doc = Text::from("abcdef");
        let a = set(ChangeSpec::insert(3, "X"), 6);
        let b = set(ChangeSpec::delete(2, 4), 6);
        let left = a.compose(&b.map(a.desc(), false).unwrap()).unwrap();
        let right = b.compose(&a.map(b.desc(), true).unwrap()).unwrap();
        let merged = left.apply(&doc).unwrap();
        assert_eq!(merged, right.apply(&doc).unwrap());
        assert_eq!(merged.to_string(), "abXef");
    }

    #[test]
    fn map_orders_same_position_insertions() {
        let doc = Text::from("ab");
        let a = set(ChangeSpec::insert(1, "A"), 2);
        let b = set(ChangeSpec::insert(1, "B"), 2);
        let b_doc = b.apply(&doc).unwrap();
        assert_eq!(a.map(b.desc(), false).unwrap().apply(&b_doc).unwrap().to_string(), "aBAb");
        assert_eq!(a.map(b.desc(), true).unwrap().apply(&b_doc).unwrap().to_string(), "aABb");
    }

    #[test]
    fn filter_splits_changes_around_ranges() {
        let doc = Text::from("0123456789");
        let c = set(vec![ChangeSpec::delete(1, 3), ChangeSpec::delete(6, 8)], 10);
        let Filtered { changes, filtered } = c.filter(&[(5, 9)]);
        assert_eq!(changes.apply(&doc).unwrap().to_string(), "03456789");
        assert_eq!(filtered.to_string(), "6 2:0 2");
        assert_eq!(filtered.length(), changes.length());
    }

    #[test]
    fn json_roundtrip_and_rejection() {
        let c = set(vec![ChangeSpec::replace(1, 2, "x\ny"), ChangeSpec::delete(4, 5)], 6);
        let json = c.to_json();
        assert_eq!(json.to_string(), r#"[1,[1,"x","y"],2,[1],1]"#);
        assert_eq!(ChangeSet::from_json(&json).unwrap(), c);
        for bad in [r#"{}"#, r#"[[]]"#, r#"[["a"]]"#, r#"[[1, 2]]"#, r#"[-3]"#, r#"["x"]"#] {
            let value: serde_json::Value = serde_json::from_str(bad).unwrap();
            assert!(ChangeSet::from_json(&value).is_err(), "{bad}");
        }
    }

    #[test]
    fn json_rejects_overflowing_lengths() {
        let huge = serde_json::json!([18446744073709551615u64, 5]);
        assert_eq!(ChangeSet::from_json(&huge), Err(Error::InvalidJson("ChangeSet")));
        let max = i64::MAX;
        assert!(ChangeSet::from_json(&serde_json::json!([max, [max], max])).is_err());
        assert!(ChangeSet::from_json(&serde_json::json!([max, [1, "x"]])).is_err());
        assert_eq!(ChangeSet::from_json(&serde_json::json!([max])).unwrap().length(), max as usize);
        assert!(serde_json::from_value::<ChangeSet>(huge).is_err());
    }

    #[test]
    fn json_merges_adjacent_runs() {
        assert_eq!(ChangeSet::from_json(&serde_json::json!([1, 1])).unwrap(), ChangeSet::empty(2));
        assert!(ChangeSet::from_json(&serde_json::json!([0, 3, [0]])).unwrap().is_empty());

        let parsed = ChangeSet::from_json(&serde_json::json!([1, [0, "a"], [0, "b", "c"], [1], [2], 1])).unwrap();
        let built = set(vec![ChangeSpec::insert(1, "ab\nc"), ChangeSpec::delete(1, 4)], 5);
        assert_eq!(parsed, built);
        assert_eq!(parsed.to_json(), serde_json::json!([1, [0, "ab", "c"], [3], 1]));
        assert_eq!(parsed.apply(&Text::from("01234")).unwrap().to_string(), "0ab\nc4");
    }

    #[test]
    fn inverse_has_no_padding_for_pure_insertions() {
        let doc = Text::from("abc");
        let c = set(ChangeSpec::insert(3, "xyz"), 3);
        let inverse = c.invert(&doc).unwrap();
        assert!(inverse.inserted().is_empty());
        assert_eq!(ChangeSet::from_json(&inverse.to_json()).unwrap(), inverse);
    }
}
