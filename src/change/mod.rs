//! The change algebra.
//!
//! A [`ChangeDesc`] describes the shape of an edit: which runs of the old
//! document are kept and which are replaced, and by how much. A
//! [`ChangeSet`] adds the inserted text. Together they support:
//!
//! - **apply**: produce the edited document;
//! - **invert**: produce the change that undoes an edit;
//! - **compose**: merge an edit `A -> B` and an edit `B -> C` into `A -> C`;
//! - **map**: rebase an edit over a concurrent edit of the same document.
//!
//! Mapping is asymmetric only where both edits insert at the same position,
//! and the `before` flag picks the order. For edits `a` and `b` of one
//! document this makes the two merge orders agree:
//!
//! ```
//! use docmodel::{ChangeSet, ChangeSpec, Text};
//!
//! let doc = Text::from("abcdef");
//! let a = ChangeSet::of(ChangeSpec::insert(3, "X"), 6, None).unwrap();
//! let b = ChangeSet::of(ChangeSpec::delete(2, 4), 6, None).unwrap();
//!
//! let left = a.compose(&b.map(a.desc(), false).unwrap()).unwrap();
//! let right = b.compose(&a.map(b.desc(), true).unwrap()).unwrap();
//! assert_eq!(left.apply(&doc).unwrap(), right.apply(&doc).unwrap());
//! assert_eq!(left.apply(&doc).unwrap().to_string(), "abXef");
//! ```

mod desc;
mod section;
mod set;

pub use desc::ChangeDesc;
pub use set::{ChangeSet, ChangeSpec, Filtered, Insert};

/// Which side a position sticks to when text is inserted exactly at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assoc {
    /// Stay before the inserted text.
    #[default]
    Before,
    /// Move past the inserted text.
    After,
}

/// How [`ChangeDesc::map_pos_mode`] treats positions next to deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapMode {
    /// Always map to a position.
    #[default]
    Simple,
    /// Drop positions strictly inside a deleted range.
    TrackDel,
    /// Drop positions whose preceding character was deleted.
    TrackBefore,
    /// Drop positions whose following character was deleted.
    TrackAfter,
}

/// How a change relates to a range, see [`ChangeDesc::touches_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeTouch {
    /// No replaced section overlaps or borders the range.
    No,
    /// Some replaced section overlaps or borders the range.
    Touches,
    /// One replaced section strictly contains the range.
    Covers,
}
