//! Persistent rope.
//!
//! A [`Text`] is an immutable tree of lines. Leaves hold up to [`BRANCH`]
//! lines (stored without separators); branches hold child ropes plus their
//! aggregate length and line count. Every edit returns a new rope that
//! shares all untouched subtrees with the old one, so keeping many versions
//! around (for undo, or for concurrent peers) costs only the edited path.
//!
//! # Positions
//!
//! Offsets count `char`s. A line break counts as one character, so a rope of
//! `n` lines with `c` characters of line content has length `c + n - 1`.
//!
//! # Balancing
//!
//! [`Text::from_parts`] groups pieces into chunks of roughly
//! `max(BRANCH, lines >> BRANCH_SHIFT)` lines, merging runs of small leaves
//! and flattening oversized branches, which keeps depth at O(log lines)
//! after any single edit.

pub mod cursor;

use std::fmt;
use std::ops::Bound;
use std::ops::RangeBounds;
use std::sync::Arc;
use std::sync::OnceLock;

use serde::de::Deserializer;
use serde::ser::SerializeSeq;
use serde::ser::Serializer;
use serde::Deserialize;
use serde::Serialize;

use crate::chars::{char_len, char_slice, split_lines};
use crate::error::{Error, Result};
use cursor::{Direction, LineCursor, RangeCursor, RawCursor, TextCursor};

/// log2 of [`BRANCH`].
pub const BRANCH_SHIFT: usize = 5;

/// Maximum number of lines in a leaf, and the minimum chunk size of a branch.
pub const BRANCH: usize = 1 << BRANCH_SHIFT;

/// The left edge of a decomposed piece must join the previous piece.
const OPEN_FROM: u8 = 1;
/// The right edge of a decomposed piece must join the next piece.
const OPEN_TO: u8 = 2;

/// An immutable, structurally shared document.
#[derive(Clone)]
pub struct Text {
    node: Arc<Node>,
}

pub(crate) enum Node {
    Leaf {
        text: Vec<String>,
        length: usize,
    },
    Branch {
        children: Vec<Text>,
        length: usize,
        lines: usize,
    },
}

/// A line of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// Offset of the start of the line.
    pub from: usize,
    /// Offset of the end of the line, before its line break.
    pub to: usize,
    /// 1-based line number.
    pub number: usize,
    /// The line's content.
    pub text: &'a str,
}

impl Line<'_> {
    /// Length of the line in chars, excluding the line break.
    pub fn len(&self) -> usize {
        return self.to - self.from;
    }

    /// Whether the line has no content.
    pub fn is_empty(&self) -> bool {
        return self.from == self.to;
    }
}

impl Text {
    /// The empty document.
    pub fn empty() -> Text {
        static EMPTY: OnceLock<Text> = OnceLock::new();
        return EMPTY
            .get_or_init(|| Text::leaf_with_len(vec![String::new()], 0))
            .clone();
    }

    /// Create a document from its lines.
    ///
    /// Fails if no lines are given or a line contains `'\n'`.
    pub fn of<I, S>(lines: I) -> Result<Text>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        if lines.is_empty() {
            return Err(Error::EmptyDocument);
        }
        if let Some(index) = lines.iter().position(|line| line.contains('\n')) {
            return Err(Error::LineContainsBreak { index });
        }
        return Ok(Text::from_lines(lines));
    }

    /// Build from lines already known to be free of line breaks.
    pub(crate) fn from_lines(lines: Vec<String>) -> Text {
        if lines.len() == 1 && lines[0].is_empty() {
            return Text::empty();
        }
        if lines.len() <= BRANCH {
            return Text::leaf(lines);
        }
        let length = text_length(&lines);
        return Text::from_parts(split_leaves(lines), length);
    }

    fn leaf(text: Vec<String>) -> Text {
        let length = text_length(&text);
        return Text::leaf_with_len(text, length);
    }

    fn leaf_with_len(text: Vec<String>, length: usize) -> Text {
        return Text {
            node: Arc::new(Node::Leaf { text, length }),
        };
    }

    fn branch(children: Vec<Text>, length: usize) -> Text {
        let lines = children.iter().map(Text::lines).sum();
        return Text {
            node: Arc::new(Node::Branch {
                children,
                length,
                lines,
            }),
        };
    }

    pub(crate) fn node(&self) -> &Node {
        return &self.node;
    }

    /// Number of entries (lines or children) in the root node.
    pub(crate) fn node_size(&self) -> usize {
        return match &*self.node {
            Node::Leaf { text, .. } => text.len(),
            Node::Branch { children, .. } => children.len(),
        };
    }

    /// Length of the document in chars.
    pub fn len(&self) -> usize {
        return match &*self.node {
            Node::Leaf { length, .. } | Node::Branch { length, .. } => *length,
        };
    }

    /// Whether the document has length zero.
    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// Number of lines. Always at least one.
    pub fn lines(&self) -> usize {
        return match &*self.node {
            Node::Leaf { text, .. } => text.len(),
            Node::Branch { lines, .. } => *lines,
        };
    }

    /// The child ropes of a branch, or `None` for a leaf.
    pub fn children(&self) -> Option<&[Text]> {
        return match &*self.node {
            Node::Leaf { .. } => None,
            Node::Branch { children, .. } => Some(children),
        };
    }

    /// The line containing `pos`.
    pub fn line_at(&self, pos: usize) -> Result<Line<'_>> {
        if pos > self.len() {
            return Err(Error::PositionOutOfRange {
                pos,
                len: self.len(),
            });
        }
        return Ok(self.line_inner(pos, false, 1, 0));
    }

    /// The line with 1-based number `n`.
    pub fn line(&self, n: usize) -> Result<Line<'_>> {
        if n < 1 || n > self.lines() {
            return Err(Error::LineOutOfRange {
                line: n,
                lines: self.lines(),
            });
        }
        return Ok(self.line_inner(n, true, 1, 0));
    }

    fn line_inner(&self, target: usize, is_line: bool, mut line: usize, mut offset: usize) -> Line<'_> {
        match &*self.node {
            Node::Leaf { text, .. } => {
                for string in text {
                    let end = offset + char_len(string);
                    if (if is_line { line } else { end }) >= target {
                        return Line {
                            from: offset,
                            to: end,
                            number: line,
                            text: string,
                        };
                    }
                    offset = end + 1;
                    line += 1;
                }
            }
            Node::Branch { children, .. } => {
                for child in children {
                    let end = offset + child.len();
                    let end_line = line + child.lines() - 1;
                    if (if is_line { end_line } else { end }) >= target {
                        return child.line_inner(target, is_line, line, offset);
                    }
                    offset = end + 1;
                    line = end_line + 1;
                }
            }
        }
        panic!("line lookup for {target} ran past the end of the document");
    }

    fn clip(&self, from: usize, to: usize) -> (usize, usize) {
        let from = from.min(self.len());
        let to = to.min(self.len());
        if from > to {
            return (to, from);
        }
        return (from, to);
    }

    /// Replace `[from, to)` with `text`.
    ///
    /// Positions are clipped to the document and swapped if reversed.
    pub fn replace(&self, from: usize, to: usize, text: &Text) -> Text {
        let (from, to) = self.clip(from, to);
        match (&*self.node, &*text.node) {
            (
                Node::Leaf { text: lines, length },
                Node::Leaf {
                    text: inserted,
                    length: inserted_len,
                },
            ) => {
                let before = slice_text(lines, 0, from);
                let joined = append_text(lines, append_text(inserted, before, 0, usize::MAX), to, usize::MAX);
                let length = length - (to - from) + inserted_len;
                if joined.len() <= BRANCH {
                    return Text::leaf_with_len(joined, length);
                }
                return Text::from_parts(split_leaves(joined), length);
            }
            (Node::Branch { children, .. }, _) if text.lines() < self.lines() => {
                let mut pos = 0;
                for (i, child) in children.iter().enumerate() {
                    let end = pos + child.len();
                    if from >= pos && to <= end {
                        // Only this child changes. Keep the rest of the
                        // node when the child stays within its size band.
                        let updated = child.replace(from - pos, to - pos, text);
                        let total_lines = self.lines() - child.lines() + updated.lines();
                        if updated.lines() < (total_lines >> (BRANCH_SHIFT - 1))
                            && updated.lines() > (total_lines >> (BRANCH_SHIFT + 1))
                        {
                            let mut copy = children.clone();
                            copy[i] = updated;
                            return Text::branch(copy, self.len() - (to - from) + text.len());
                        }
                        return self.replace_parts(pos, end, &updated);
                    }
                    pos = end + 1;
                }
                return self.replace_parts(from, to, text);
            }
            _ => return self.replace_parts(from, to, text),
        }
    }

    fn replace_parts(&self, from: usize, to: usize, text: &Text) -> Text {
        let mut parts = Vec::new();
        self.decompose(0, from, &mut parts, OPEN_TO);
        if !text.is_empty() {
            text.decompose(0, text.len(), &mut parts, OPEN_FROM | OPEN_TO);
        }
        self.decompose(to, self.len(), &mut parts, OPEN_FROM);
        return Text::from_parts(parts, self.len() - (to - from) + text.len());
    }

    /// Append `other` to the end of this document.
    pub fn append(&self, other: &Text) -> Text {
        return self.replace(self.len(), self.len(), other);
    }

    /// The document between `from` and `to`.
    pub fn slice(&self, from: usize, to: usize) -> Text {
        let (from, to) = self.clip(from, to);
        let mut parts = Vec::new();
        self.decompose(from, to, &mut parts, 0);
        return Text::from_parts(parts, to - from);
    }

    /// Push the pieces covering `[from, to)` onto `target`.
    ///
    /// `from` may lie before this node (it is then treated as 0). With
    /// `OPEN_FROM`, the first piece is merged into the last piece already on
    /// `target`, which must be a leaf. With `OPEN_TO`, the last piece pushed
    /// is always a leaf so the next piece can join it.
    fn decompose(&self, from: usize, to: usize, target: &mut Vec<Text>, open: u8) {
        match &*self.node {
            Node::Leaf { text, length } => {
                let piece = if from == 0 && to >= *length {
                    self.clone()
                } else {
                    Text::leaf_with_len(slice_text(text, from, to), to.min(*length) - from)
                };
                if open & OPEN_FROM == 0 {
                    target.push(piece);
                    return;
                }
                let Some(prev) = target.pop() else {
                    panic!("open decomposition without a preceding piece");
                };
                let Node::Leaf { text: prev_text, length: prev_len } = &*prev.node else {
                    panic!("open decomposition joined onto a branch");
                };
                let Node::Leaf { text: piece_text, .. } = &*piece.node else {
                    unreachable!();
                };
                let mut joined = append_text(piece_text, prev_text.clone(), 0, piece.len());
                if joined.len() <= BRANCH {
                    target.push(Text::leaf_with_len(joined, prev_len + piece.len()));
                } else {
                    let right = joined.split_off(joined.len() >> 1);
                    target.push(Text::leaf(joined));
                    target.push(Text::leaf(right));
                }
            }
            Node::Branch { children, .. } => {
                let mut pos = 0;
                for child in children {
                    if pos > to {
                        break;
                    }
                    let end = pos + child.len();
                    if from <= end && to >= pos {
                        let child_open = open
                            & ((if pos <= from { OPEN_FROM } else { 0 }) | (if end >= to { OPEN_TO } else { 0 }));
                        if pos >= from && end <= to && child_open == 0 {
                            target.push(child.clone());
                        } else {
                            child.decompose(from.saturating_sub(pos), to - pos, target, child_open);
                        }
                    }
                    pos = end + 1;
                }
            }
        }
    }

    /// Build a balanced rope from adjacent pieces.
    ///
    /// Pieces are joined by line breaks; `length` is their total length
    /// including those breaks.
    pub(crate) fn from_parts(children: Vec<Text>, length: usize) -> Text {
        let lines: usize = children.iter().map(Text::lines).sum();
        if lines < BRANCH {
            if length == 0 {
                return Text::empty();
            }
            let mut flat = Vec::with_capacity(lines);
            for child in &children {
                child.flatten(&mut flat);
            }
            return Text::leaf_with_len(flat, length);
        }

        let chunk = BRANCH.max(lines >> BRANCH_SHIFT);
        let mut chunker = Chunker::new(chunk);
        for child in children {
            chunker.add(child);
        }
        chunker.flush();
        let mut chunked = chunker.chunked;
        if chunked.len() == 1 {
            if let Some(only) = chunked.pop() {
                return only;
            }
        }
        tracing::trace!(lines, length, chunks = chunked.len(), "rebalanced rope");
        return Text::branch(chunked, length);
    }

    fn flatten(&self, target: &mut Vec<String>) {
        match &*self.node {
            Node::Leaf { text, .. } => target.extend(text.iter().cloned()),
            Node::Branch { children, .. } => {
                for child in children {
                    child.flatten(target);
                }
            }
        }
    }

    /// Length of the run of identical (shared) subtrees at the start, or
    /// with `forward == false` the end, of both documents.
    fn scan_identical(&self, other: &Text, forward: bool) -> usize {
        let (Node::Branch { children: a, .. }, Node::Branch { children: b, .. }) = (&*self.node, &*other.node) else {
            return 0;
        };
        let mut length = 0;
        for k in 0..a.len().min(b.len()) {
            let (child_a, child_b) = if forward {
                (&a[k], &b[k])
            } else {
                (&a[a.len() - 1 - k], &b[b.len() - 1 - k])
            };
            if !Arc::ptr_eq(&child_a.node, &child_b.node) {
                return length + child_a.scan_identical(child_b, forward);
            }
            length += child_a.len() + 1;
        }
        return length;
    }

    /// Iterate over the chunks of the whole document.
    pub fn iter(&self, dir: Direction) -> RawCursor<'_> {
        return RawCursor::new(self, dir);
    }

    /// Iterate over the chunks between `from` and `to`. Runs backward when
    /// `from > to`.
    pub fn iter_range(&self, from: usize, to: usize) -> RangeCursor<'_> {
        return RangeCursor::new(self, from, to);
    }

    /// Iterate over the lines in a range of 1-based line numbers.
    ///
    /// ```
    /// use docmodel::Text;
    ///
    /// let text = Text::from("one\ntwo\n\nfour");
    /// let lines: Vec<&str> = text.iter_lines(2..4).unwrap().collect();
    /// assert_eq!(lines, vec!["two", ""]);
    /// ```
    pub fn iter_lines<R: RangeBounds<usize>>(&self, lines: R) -> Result<LineCursor<'_, RangeCursor<'_>>> {
        let from = match lines.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n + 1,
            Bound::Unbounded => 1,
        };
        let to = match lines.end_bound() {
            Bound::Included(&n) => n + 1,
            Bound::Excluded(&n) => n,
            Bound::Unbounded => self.lines() + 1,
        };
        let start = self.line(from)?.from;
        let end = if to == self.lines() + 1 {
            self.len()
        } else if to <= 1 {
            0
        } else {
            self.line(to - 1)?.to
        };
        return Ok(LineCursor::new(RangeCursor::new(self, start, start.max(end))));
    }

    /// The text between `from` and `to`, with lines joined by `line_sep`.
    pub fn slice_string(&self, from: usize, to: usize, line_sep: &str) -> String {
        let (from, to) = self.clip(from, to);
        let mut result = String::new();
        self.write_string(from, to, line_sep, &mut result);
        return result;
    }

    fn write_string(&self, from: usize, to: usize, line_sep: &str, out: &mut String) {
        match &*self.node {
            Node::Leaf { text, .. } => {
                let mut pos = 0;
                for (i, line) in text.iter().enumerate() {
                    if pos > to {
                        break;
                    }
                    let end = pos + char_len(line);
                    if pos > from && i > 0 {
                        out.push_str(line_sep);
                    }
                    if from < end && to > pos {
                        out.push_str(char_slice(line, from.saturating_sub(pos), to - pos));
                    }
                    pos = end + 1;
                }
            }
            Node::Branch { children, .. } => {
                let mut pos = 0;
                for (i, child) in children.iter().enumerate() {
                    if pos > to {
                        break;
                    }
                    let end = pos + child.len();
                    if pos > from && i > 0 {
                        out.push_str(line_sep);
                    }
                    if from < end && to > pos {
                        child.write_string(from.saturating_sub(pos), to - pos, line_sep, out);
                    }
                    pos = end + 1;
                }
            }
        }
    }

    /// The lines of the document.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.lines());
        self.flatten(&mut lines);
        return lines;
    }

    /// Serialize as a JSON array of line strings.
    pub fn to_json(&self) -> serde_json::Value {
        return serde_json::Value::Array(self.to_lines().into_iter().map(serde_json::Value::String).collect());
    }

    /// Parse the JSON array-of-lines form produced by [`Text::to_json`].
    pub fn from_json(value: &serde_json::Value) -> Result<Text> {
        let lines = value
            .as_array()
            .and_then(|items| items.iter().map(|item| item.as_str().map(String::from)).collect::<Option<Vec<_>>>());
        let Some(lines) = lines else {
            tracing::debug!("rejected malformed text JSON");
            return Err(Error::InvalidJson("Text"));
        };
        return Text::of(lines);
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        return match &*self.node {
            Node::Leaf { .. } => 1,
            Node::Branch { children, .. } => 1 + children.iter().map(Text::depth).max().unwrap_or(0),
        };
    }
}

/// Groups pieces into balanced chunks for [`Text::from_parts`].
struct Chunker {
    chunk: usize,
    max_chunk: usize,
    min_chunk: usize,
    chunked: Vec<Text>,
    current: Vec<Text>,
    current_lines: usize,
    /// Sum of `len + 1` over `current`.
    current_len: usize,
}

impl Chunker {
    fn new(chunk: usize) -> Chunker {
        return Chunker {
            chunk,
            max_chunk: chunk << 1,
            min_chunk: chunk >> 1,
            chunked: Vec::new(),
            current: Vec::new(),
            current_lines: 0,
            current_len: 0,
        };
    }

    fn add(&mut self, child: Text) {
        if child.lines() > self.max_chunk {
            if let Node::Branch { children, .. } = &*child.node {
                for node in children {
                    self.add(node.clone());
                }
                return;
            }
        }

        if child.lines() > self.min_chunk && (self.current_lines > self.min_chunk || self.current_lines == 0) {
            self.flush();
            self.chunked.push(child);
            return;
        }

        if let (Node::Leaf { text, length }, Some(last)) = (&*child.node, self.current.last_mut()) {
            if let Node::Leaf {
                text: last_text,
                length: last_len,
            } = &*last.node
            {
                if text.len() + last_text.len() <= BRANCH {
                    self.current_lines += text.len();
                    self.current_len += length + 1;
                    let merged_len = last_len + 1 + length;
                    let mut merged = last_text.clone();
                    merged.extend(text.iter().cloned());
                    *last = Text::leaf_with_len(merged, merged_len);
                    return;
                }
            }
        }

        if self.current_lines + child.lines() > self.chunk {
            self.flush();
        }
        self.current_lines += child.lines();
        self.current_len += child.len() + 1;
        self.current.push(child);
    }

    fn flush(&mut self) {
        if self.current_lines == 0 {
            return;
        }
        let length = self.current_len - 1;
        let mut current = std::mem::take(&mut self.current);
        let piece = if current.len() == 1 {
            current.pop()
        } else {
            Some(Text::from_parts(current, length))
        };
        self.chunked.extend(piece);
        self.current_lines = 0;
        self.current_len = 0;
    }
}

/// Total length of a run of lines joined by breaks.
fn text_length(text: &[String]) -> usize {
    return text.iter().map(|line| char_len(line) + 1).sum::<usize>() - 1;
}

/// Cut lines into leaves of at most [`BRANCH`] lines.
fn split_leaves(lines: Vec<String>) -> Vec<Text> {
    let mut leaves = Vec::with_capacity(lines.len().div_ceil(BRANCH));
    let mut part = Vec::with_capacity(BRANCH);
    for line in lines {
        part.push(line);
        if part.len() == BRANCH {
            leaves.push(Text::leaf(std::mem::replace(&mut part, Vec::with_capacity(BRANCH))));
        }
    }
    if !part.is_empty() {
        leaves.push(Text::leaf(part));
    }
    return leaves;
}

/// Append the content of `text` between `from` and `to` to `target`, gluing
/// the first appended line onto the last line already in `target`.
fn append_text(text: &[String], mut target: Vec<String>, from: usize, to: usize) -> Vec<String> {
    let mut pos = 0;
    let mut first = true;
    for line in text {
        if pos > to {
            break;
        }
        let len = char_len(line);
        let end = pos + len;
        if end >= from {
            let piece = char_slice(line, from.saturating_sub(pos), len.min(to - pos));
            match target.last_mut() {
                Some(last) if first => last.push_str(piece),
                _ => target.push(piece.to_string()),
            }
            first = false;
        }
        pos = end + 1;
    }
    return target;
}

fn slice_text(text: &[String], from: usize, to: usize) -> Vec<String> {
    return append_text(text, vec![String::new()], from, to);
}

impl Default for Text {
    fn default() -> Self {
        return Text::empty();
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Text) -> bool {
        if Arc::ptr_eq(&self.node, &other.node) {
            return true;
        }
        if other.len() != self.len() || other.lines() != self.lines() {
            return false;
        }
        let start = self.scan_identical(other, true);
        let end = self.len().saturating_sub(self.scan_identical(other, false));
        let mut a = RawCursor::new(self, Direction::Forward);
        let mut b = RawCursor::new(other, Direction::Forward);
        let mut skip = start as isize;
        let mut pos = start;
        loop {
            a.advance(skip);
            b.advance(skip);
            skip = 0;
            if a.line_break() != b.line_break() || a.is_done() != b.is_done() || a.value() != b.value() {
                return false;
            }
            pos += char_len(a.value());
            if a.is_done() || pos >= end {
                return true;
            }
        }
    }
}

impl Eq for Text {}

impl From<&str> for Text {
    /// Split on `"\r\n"`, `"\r"` or `"\n"`.
    fn from(s: &str) -> Text {
        return Text::from_lines(split_lines(s, None));
    }
}

impl From<String> for Text {
    fn from(s: String) -> Text {
        return Text::from(s.as_str());
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.slice_string(0, self.len(), "\n"));
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match &*self.node {
            Node::Leaf { text, .. } => f.debug_list().entries(text).finish(),
            Node::Branch { children, .. } => f.debug_list().entries(children).finish(),
        };
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.lines()))?;
        for line in self.to_lines() {
            seq.serialize_element(&line)?;
        }
        return seq.end();
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Text, D::Error> {
        let lines = Vec::<String>::deserialize(deserializer)?;
        return Text::of(lines).map_err(serde::de::Error::custom);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(count: usize) -> Text {
        return Text::of((0..count).map(|i| format!("line {i}"))).unwrap();
    }

    #[test]
    fn small_documents_are_single_leaves() {
        let text = Text::of(["abc", "def"]).unwrap();
        assert!(text.children().is_none());
        assert_eq!(text.len(), 7);
        assert_eq!(text.lines(), 2);
    }

    #[test]
    fn large_documents_are_balanced() {
        let text = numbered(5000);
        assert_eq!(text.lines(), 5000);
        assert!(text.depth() <= 4, "depth {}", text.depth());
        for child in text.children().unwrap() {
            assert!(child.lines() >= BRANCH / 2);
        }
    }

    #[test]
    fn edits_share_untouched_subtrees() {
        let text = numbered(2000);
        let edited = text.replace(10, 12, &Text::from("XY"));
        let old = text.children().unwrap();
        let new = edited.children().unwrap();
        assert_eq!(old.len(), new.len());
        let shared = old
            .iter()
            .zip(new)
            .filter(|(a, b)| Arc::ptr_eq(&a.node, &b.node))
            .count();
        assert_eq!(shared, old.len() - 1);
    }

    #[test]
    fn scan_identical_skips_shared_prefix_and_suffix() {
        let text = numbered(2000);
        let edited = text.replace(10, 12, &Text::from("XY"));
        let first = &text.children().unwrap()[0];
        assert_eq!(text.scan_identical(&edited, true), 0);
        assert!(text.scan_identical(&edited, false) >= text.len() - first.len() - 1);
        assert_ne!(text, edited);
        assert_eq!(edited, edited.slice(0, edited.len()));
    }

    #[test]
    fn repeated_edits_keep_depth_logarithmic() {
        let mut text = numbered(100);
        for i in 0..500 {
            let pos = (i * 37) % text.len();
            text = text.replace(pos, pos, &Text::from("a\nb\nc"));
        }
        assert_eq!(text.lines(), 100 + 500 * 2);
        assert!(text.depth() <= 5, "depth {}", text.depth());
    }

    #[test]
    fn splice_boundaries_do_not_add_breaks() {
        let text = Text::from("ab\ncd");
        let joined = text.replace(1, 4, &Text::from("X"));
        assert_eq!(joined.to_string(), "aXd");
        assert_eq!(joined.lines(), 1);
    }

    #[test]
    fn empty_results_are_canonical() {
        let text = numbered(100);
        let cleared = text.slice(5, 5);
        assert!(cleared.is_empty());
        assert_eq!(cleared.lines(), 1);
        assert!(Arc::ptr_eq(&cleared.node, &Text::empty().node));
    }
}
