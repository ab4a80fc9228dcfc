use std::fmt;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::Deserialize;
use serde::Serialize;

use super::section::{add_section, compose_sections, iter_changes, map_sections, Section, SectionIter, KEPT};
use super::{Assoc, MapMode, RangeTouch};
use crate::error::{Error, Result};

/// The shape of a change: kept and replaced runs, without inserted text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ChangeDesc {
    pub(crate) sections: Vec<Section>,
}

impl ChangeDesc {
    pub(crate) fn new(sections: Vec<Section>) -> ChangeDesc {
        return ChangeDesc { sections };
    }

    /// Length of the document the change applies to.
    pub fn length(&self) -> usize {
        return self.sections.iter().map(|section| section.len).sum();
    }

    /// Length of the document the change produces.
    pub fn new_length(&self) -> usize {
        return self.sections.iter().map(Section::new_len).sum();
    }

    /// Whether the change leaves the document untouched.
    pub fn is_empty(&self) -> bool {
        return match self.sections.as_slice() {
            [] => true,
            [only] => only.is_kept(),
            _ => false,
        };
    }

    /// Call `f(pos_a, pos_b, len)` for each kept run, with its start in the
    /// old and the new document.
    pub fn iter_gaps<F: FnMut(usize, usize, usize)>(&self, mut f: F) {
        let mut pos_a = 0;
        let mut pos_b = 0;
        for section in &self.sections {
            if section.is_kept() {
                f(pos_a, pos_b, section.len);
            }
            pos_a += section.len;
            pos_b += section.new_len();
        }
    }

    /// Call `f(from_a, to_a, from_b, to_b)` for each replaced range.
    /// Adjacent replacements are joined unless `individual` is set.
    pub fn iter_changed_ranges<F: FnMut(usize, usize, usize, usize)>(&self, mut f: F, individual: bool) {
        iter_changes(&self.sections, None, individual, |from_a, to_a, from_b, to_b, _| {
            f(from_a, to_a, from_b, to_b)
        });
    }

    /// The shape of the inverse change.
    pub fn inverted_desc(&self) -> ChangeDesc {
        let sections = self
            .sections
            .iter()
            .map(|section| {
                if section.is_kept() {
                    return *section;
                }
                return Section {
                    len: section.ins as usize,
                    ins: section.len as isize,
                };
            })
            .collect();
        return ChangeDesc::new(sections);
    }

    /// Compose with a change that applies to this change's output.
    pub fn compose_desc(&self, other: &ChangeDesc) -> Result<ChangeDesc> {
        check_lengths(self.new_length(), other.length())?;
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        let walked = compose_sections(
            SectionIter::new(&self.sections, None),
            SectionIter::new(&other.sections, None),
            false,
        );
        let Some((sections, _)) = walked else {
            return Err(mismatch(self.new_length(), other.length()));
        };
        return Ok(ChangeDesc::new(sections));
    }

    /// Rebase onto `other`, a change of the same document. With `before`,
    /// insertions at the same position as one in `other` go first.
    pub fn map_desc(&self, other: &ChangeDesc, before: bool) -> Result<ChangeDesc> {
        check_lengths(other.length(), self.length())?;
        if other.is_empty() {
            return Ok(self.clone());
        }
        let walked = map_sections(
            SectionIter::new(&self.sections, None),
            SectionIter::new(&other.sections, None),
            before,
            false,
        );
        let Some((sections, _)) = walked else {
            return Err(mismatch(other.length(), self.length()));
        };
        return Ok(ChangeDesc::new(sections));
    }

    /// Map a position in the old document to the new one.
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> Result<usize> {
        return match self.map_pos_mode(pos, assoc, MapMode::Simple)? {
            Some(mapped) => Ok(mapped),
            None => unreachable!("simple mapping always yields a position"),
        };
    }

    /// Map a position, returning `None` when `mode` says the position was
    /// deleted.
    ///
    /// A position at the edge of a replaced range maps to the start of the
    /// replacement when it is the range's start or `assoc` is
    /// [`Assoc::Before`], otherwise to its end.
    pub fn map_pos_mode(&self, pos: usize, assoc: Assoc, mode: MapMode) -> Result<Option<usize>> {
        let mut pos_a = 0;
        let mut pos_b = 0;
        for section in &self.sections {
            let end_a = pos_a + section.len;
            if section.is_kept() {
                if end_a > pos {
                    return Ok(Some(pos_b + (pos - pos_a)));
                }
                pos_b += section.len;
            } else {
                let ins = section.ins as usize;
                let deleted = match mode {
                    MapMode::Simple => false,
                    MapMode::TrackDel => pos_a < pos && end_a > pos,
                    MapMode::TrackBefore => pos_a < pos,
                    MapMode::TrackAfter => end_a > pos,
                };
                if end_a >= pos && deleted {
                    return Ok(None);
                }
                if end_a > pos || (end_a == pos && assoc == Assoc::Before && section.len == 0) {
                    if pos == pos_a || assoc == Assoc::Before {
                        return Ok(Some(pos_b));
                    }
                    return Ok(Some(pos_b + ins));
                }
                pos_b += ins;
            }
            pos_a = end_a;
        }
        if pos > pos_a {
            return Err(Error::PositionOutOfRange { pos, len: pos_a });
        }
        return Ok(Some(pos_b));
    }

    /// Check whether the change touches `[from, to]`.
    pub fn touches_range(&self, from: usize, to: usize) -> RangeTouch {
        let mut pos = 0;
        for section in &self.sections {
            if pos > to {
                break;
            }
            let end = pos + section.len;
            if !section.is_kept() && end >= from {
                if pos < from && end > to {
                    return RangeTouch::Covers;
                }
                return RangeTouch::Touches;
            }
            pos = end;
        }
        return RangeTouch::No;
    }

    /// Serialize as a flat array of `len, ins` numbers, `-1` marking kept
    /// runs.
    pub fn to_json(&self) -> serde_json::Value {
        let mut values = Vec::with_capacity(self.sections.len() * 2);
        for section in &self.sections {
            values.push(serde_json::Value::from(section.len));
            values.push(serde_json::Value::from(section.ins));
        }
        return serde_json::Value::Array(values);
    }

    /// Parse the form produced by [`ChangeDesc::to_json`].
    pub fn from_json(value: &serde_json::Value) -> Result<ChangeDesc> {
        let numbers = value
            .as_array()
            .and_then(|items| items.iter().map(serde_json::Value::as_i64).collect::<Option<Vec<_>>>());
        let Some(numbers) = numbers else {
            tracing::debug!("rejected non-numeric change description JSON");
            return Err(Error::InvalidJson("ChangeDesc"));
        };
        return ChangeDesc::from_numbers(&numbers);
    }

    fn from_numbers(numbers: &[i64]) -> Result<ChangeDesc> {
        if numbers.len() % 2 != 0 {
            tracing::debug!(len = numbers.len(), "rejected odd-length change description JSON");
            return Err(Error::InvalidJson("ChangeDesc"));
        }
        let mut sections = Vec::with_capacity(numbers.len() / 2);
        let mut lengths = Lengths::default();
        for pair in numbers.chunks_exact(2) {
            let (Ok(len), Ok(ins)) = (usize::try_from(pair[0]), isize::try_from(pair[1])) else {
                return Err(Error::InvalidJson("ChangeDesc"));
            };
            if ins < KEPT {
                tracing::debug!(ins, "rejected change description section marker");
                return Err(Error::InvalidJson("ChangeDesc"));
            }
            if lengths.add(Section { len, ins }).is_none() {
                tracing::debug!("rejected change description with overflowing length");
                return Err(Error::InvalidJson("ChangeDesc"));
            }
            add_section(&mut sections, len, ins, false);
        }
        return Ok(ChangeDesc::new(sections));
    }
}

/// Running old and new document lengths of sections read from untrusted
/// input. Both stay within `isize::MAX`, so merged section counts fit.
#[derive(Debug, Default)]
pub(crate) struct Lengths {
    length: usize,
    new_length: usize,
}

impl Lengths {
    /// Count `section`, or return `None` if either total leaves the range.
    pub fn add(&mut self, section: Section) -> Option<()> {
        let limit = isize::MAX as usize;
        self.length = self.length.checked_add(section.len).filter(|&len| len <= limit)?;
        self.new_length = self.new_length.checked_add(section.new_len()).filter(|&len| len <= limit)?;
        return Some(());
    }
}

pub(crate) fn check_lengths(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(mismatch(expected, actual));
    }
    return Ok(());
}

pub(crate) fn mismatch(expected: usize, actual: usize) -> Error {
    return Error::LengthMismatch { expected, actual };
}

impl fmt::Display for ChangeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", section.len)?;
            if !section.is_kept() {
                write!(f, ":{}", section.ins)?;
            }
        }
        return Ok(());
    }
}

impl Serialize for ChangeDesc {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        return self.to_json().serialize(serializer);
    }
}

impl<'de> Deserialize<'de> for ChangeDesc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<ChangeDesc, D::Error> {
        let numbers = Vec::<i64>::deserialize(deserializer)?;
        return ChangeDesc::from_numbers(&numbers).map_err(serde::de::Error::custom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(numbers: &[i64]) -> ChangeDesc {
        return ChangeDesc::from_numbers(numbers).unwrap();
    }

    #[test]
    fn lengths_count_both_sides() {
        let d = desc(&[2, -1, 3, 1, 4, -1, 0, 5]);
        assert_eq!(d.length(), 9);
        assert_eq!(d.new_length(), 12);
        assert!(!d.is_empty());
        assert!(desc(&[5, -1]).is_empty());
        assert!(ChangeDesc::default().is_empty());
    }

    #[test]
    fn map_pos_tracks_deletions() {
        // Delete [2, 6) of a 10-character document.
        let d = desc(&[2, -1, 4, 0, 4, -1]);
        assert_eq!(d.map_pos_mode(4, Assoc::Before, MapMode::TrackDel).unwrap(), None);
        assert_eq!(d.map_pos_mode(2, Assoc::Before, MapMode::TrackDel).unwrap(), Some(2));
        assert_eq!(d.map_pos_mode(6, Assoc::Before, MapMode::TrackBefore).unwrap(), None);
        assert_eq!(d.map_pos_mode(2, Assoc::Before, MapMode::TrackAfter).unwrap(), None);
        assert_eq!(d.map_pos_mode(8, Assoc::Before, MapMode::TrackDel).unwrap(), Some(4));
        assert_eq!(d.map_pos(4, Assoc::Before).unwrap(), 2);
    }

    #[test]
    fn map_pos_associates_around_insertions() {
        // Insert three characters at 2.
        let d = desc(&[2, -1, 0, 3, 2, -1]);
        assert_eq!(d.map_pos(2, Assoc::Before).unwrap(), 2);
        assert_eq!(d.map_pos(2, Assoc::After).unwrap(), 5);
        assert_eq!(d.map_pos(4, Assoc::Before).unwrap(), 7);
        assert!(matches!(d.map_pos(5, Assoc::Before), Err(Error::PositionOutOfRange { pos: 5, len: 4 })));
    }

    #[test]
    fn touches_range_distinguishes_cover() {
        let d = desc(&[2, -1, 4, 1, 4, -1]);
        assert_eq!(d.touches_range(3, 4), RangeTouch::Covers);
        assert_eq!(d.touches_range(0, 2), RangeTouch::Touches);
        assert_eq!(d.touches_range(6, 8), RangeTouch::Touches);
        assert_eq!(d.touches_range(7, 9), RangeTouch::No);
    }

    #[test]
    fn gaps_and_changed_ranges() {
        let d = desc(&[2, -1, 4, 1, 4, -1]);
        let mut gaps = Vec::new();
        d.iter_gaps(|a, b, len| gaps.push((a, b, len)));
        assert_eq!(gaps, vec![(0, 0, 2), (6, 3, 4)]);
        let mut changed = Vec::new();
        d.iter_changed_ranges(|fa, ta, fb, tb| changed.push((fa, ta, fb, tb)), false);
        assert_eq!(changed, vec![(2, 6, 2, 3)]);
    }

    #[test]
    fn inverted_desc_swaps_lengths() {
        let d = desc(&[2, -1, 4, 1, 4, -1]);
        assert_eq!(d.inverted_desc().to_string(), "2 1:4 4");
        assert_eq!(d.inverted_desc().length(), d.new_length());
    }

    #[test]
    fn compose_and_map_check_lengths() {
        let a = desc(&[2, -1, 0, 1]);
        let b = desc(&[4, -1]);
        assert!(matches!(
            a.compose_desc(&b),
            Err(Error::LengthMismatch { expected: 3, actual: 4 })
        ));
        assert!(a.map_desc(&b, false).is_err());
        assert_eq!(a.compose_desc(&desc(&[3, -1])).unwrap(), a);
    }

    #[test]
    fn json_rejects_malformed_values() {
        let d = desc(&[2, -1, 4, 1]);
        assert_eq!(ChangeDesc::from_json(&d.to_json()).unwrap(), d);
        for bad in [r#"[1, -1, 2]"#, r#"[1, -2]"#, r#"{"a": 1}"#, r#"[1, "x"]"#, r#"[-1, 0]"#] {
            let value: serde_json::Value = serde_json::from_str(bad).unwrap();
            assert!(ChangeDesc::from_json(&value).is_err(), "{bad}");
        }
    }

    #[test]
    fn json_rejects_overflowing_lengths() {
        let max = i64::MAX;
        let single = serde_json::json!([max, -1]);
        assert_eq!(ChangeDesc::from_json(&single).unwrap().length(), max as usize);
        let three = serde_json::json!([max, -1, max, -1, max, -1]);
        assert_eq!(ChangeDesc::from_json(&three), Err(Error::InvalidJson("ChangeDesc")));
        assert!(ChangeDesc::from_json(&serde_json::json!([max, -1, 1, 0])).is_err());
        assert!(ChangeDesc::from_json(&serde_json::json!([0, max, 0, 1])).is_err());
        assert!(serde_json::from_value::<ChangeDesc>(three).is_err());
    }

    #[test]
    fn json_merges_adjacent_runs() {
        let parsed = ChangeDesc::from_json(&serde_json::json!([0, -1, 1, -1, 1, -1, 2, 0, 1, 0, 0, 0])).unwrap();
        assert_eq!(parsed, desc(&[2, -1, 3, 0]));
        assert!(ChangeDesc::from_json(&serde_json::json!([1, -1, 1, -1])).unwrap().is_empty());
        assert_eq!(ChangeDesc::from_json(&serde_json::json!([0, -1])).unwrap(), ChangeDesc::default());
    }
}
