//! docmodel - A persistent rope and change algebra for text editors.
//!
//! # Quick Start
//!
//! ```
//! use docmodel::{ChangeSet, ChangeSpec, Text};
//!
//! // Create a document
//! let doc = Text::of(["hello", "world"]).unwrap();
//! assert_eq!(doc.len(), 11);
//! assert_eq!(doc.line(2).unwrap().text, "world");
//!
//! // Describe an edit against it
//! let change = ChangeSet::of(ChangeSpec::replace(0, 5, "goodbye"), doc.len(), None).unwrap();
//! let edited = change.apply(&doc).unwrap();
//! assert_eq!(edited.to_string(), "goodbye\nworld");
//!
//! // Undo it
//! let undo = change.invert(&doc).unwrap();
//! assert_eq!(undo.apply(&edited).unwrap(), doc);
//! ```
//!
//! # Modules
//!
//! - [`text`]: the rope and its cursors
//! - [`change`]: change descriptions, change sets and their algebra
//! - [`chars`]: char offset, line splitting and column helpers
//! - [`error`]: the error type shared by all of the above

pub mod change;
pub mod chars;
pub mod error;
pub mod text;

pub use change::{Assoc, ChangeDesc, ChangeSet, ChangeSpec, Filtered, Insert, MapMode, RangeTouch};
pub use error::{Error, ErrorKind, Result};
pub use text::cursor::{Direction, LineCursor, RangeCursor, RawCursor, TextCursor};
pub use text::{Line, Text};
