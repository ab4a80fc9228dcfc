//! Streaming cursors over a [`Text`].
//!
//! Cursors walk the rope chunk by chunk without materialising it. A chunk is
//! either a fragment of a single line or the line break marker `"\n"`. Every
//! cursor can skip characters ahead of the next chunk without copying them.
//!
//! - [`RawCursor`] walks the whole tree in either direction.
//! - [`RangeCursor`] clips a raw cursor to a range.
//! - [`LineCursor`] hides break markers and yields one chunk per line.
//!
//! Cursors borrow the rope they walk and carry their own position, so each
//! one belongs to exactly one traversal.

use smallvec::SmallVec;

use super::{Node, Text};
use crate::chars::{char_len, char_slice};

/// Direction of iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// `1` for forward, `-1` for backward.
    #[inline]
    pub fn sign(self) -> isize {
        return match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        };
    }

    /// The opposite direction.
    #[inline]
    pub fn reverse(self) -> Direction {
        return match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        };
    }
}

/// A stateful chunk iterator over a rope.
pub trait TextCursor<'a> {
    /// Move to the next chunk, first skipping `skip` characters.
    ///
    /// A negative skip moves against the cursor's direction first.
    fn advance(&mut self, skip: isize) -> &mut Self;

    /// The current chunk. Empty once the cursor is done.
    fn value(&self) -> &'a str;

    /// Whether the current chunk is a line break.
    fn line_break(&self) -> bool;

    /// Whether the cursor has run past the end of its range.
    fn is_done(&self) -> bool;
}

/// Cursor over every chunk of a rope.
///
/// The stack holds the path from the root to the node being read. Each
/// offset encodes `index << 1 | bit`, where the low bit tells whether the
/// line break in front of child `index` has already been produced.
pub struct RawCursor<'a> {
    dir: Direction,
    nodes: SmallVec<[&'a Text; 8]>,
    offsets: SmallVec<[usize; 8]>,
    value: &'a str,
    line_break: bool,
    done: bool,
}

impl<'a> RawCursor<'a> {
    /// Create a cursor at the start (or, for [`Direction::Backward`], the
    /// end) of `text`.
    pub fn new(text: &'a Text, dir: Direction) -> RawCursor<'a> {
        let mut nodes = SmallVec::new();
        let mut offsets = SmallVec::new();
        nodes.push(text);
        offsets.push(start_offset(text, dir));
        return RawCursor {
            dir,
            nodes,
            offsets,
            value: "",
            line_break: false,
            done: false,
        };
    }

    /// The direction this cursor moves in.
    pub fn direction(&self) -> Direction {
        return self.dir;
    }

    fn step(&mut self, dir: Direction) {
        let last = self.offsets.len() - 1;
        match dir {
            Direction::Forward => self.offsets[last] += 1,
            Direction::Backward => self.offsets[last] -= 1,
        }
    }

    fn advance_inner(&mut self, mut skip: usize, dir: Direction) {
        let forward = dir == Direction::Forward;
        self.done = false;
        self.line_break = false;
        loop {
            let last = self.nodes.len() - 1;
            let top = self.nodes[last];
            let offset_value = self.offsets[last];
            let offset = offset_value >> 1;
            let size = top.node_size();

            if offset == if forward { size } else { 0 } {
                if last == 0 {
                    self.done = true;
                    self.value = "";
                    return;
                }
                if forward {
                    self.offsets[last - 1] += 1;
                }
                self.nodes.pop();
                self.offsets.pop();
            } else if (offset_value & 1) == if forward { 0 } else { 1 } {
                self.step(dir);
                if skip == 0 {
                    self.line_break = true;
                    self.value = "\n";
                    return;
                }
                skip -= 1;
            } else {
                let index = if forward { offset } else { offset - 1 };
                match top.node() {
                    Node::Leaf { text, .. } => {
                        let next = text[index].as_str();
                        self.step(dir);
                        let len = char_len(next);
                        if len > skip {
                            self.value = if skip == 0 {
                                next
                            } else if forward {
                                char_slice(next, skip, len)
                            } else {
                                char_slice(next, 0, len - skip)
                            };
                            return;
                        }
                        skip -= len;
                    }
                    Node::Branch { children, .. } => {
                        let next = &children[index];
                        if skip > next.len() {
                            skip -= next.len();
                            self.step(dir);
                        } else {
                            if !forward {
                                self.offsets[last] -= 1;
                            }
                            self.nodes.push(next);
                            self.offsets.push(start_offset(next, dir));
                        }
                    }
                }
            }
        }
    }
}

fn start_offset(text: &Text, dir: Direction) -> usize {
    return match dir {
        Direction::Forward => 1,
        Direction::Backward => text.node_size() << 1,
    };
}

impl<'a> TextCursor<'a> for RawCursor<'a> {
    fn advance(&mut self, skip: isize) -> &mut Self {
        let mut skip = skip;
        if skip < 0 {
            self.advance_inner(skip.unsigned_abs(), self.dir.reverse());
            skip = char_len(self.value) as isize;
        }
        self.advance_inner(skip as usize, self.dir);
        return self;
    }

    fn value(&self) -> &'a str {
        return self.value;
    }

    fn line_break(&self) -> bool {
        return self.line_break;
    }

    fn is_done(&self) -> bool {
        return self.done;
    }
}

/// Cursor over the chunks of a rope between two positions.
///
/// Built with `from > to`, it runs backward from `from` down to `to`.
pub struct RangeCursor<'a> {
    cursor: RawCursor<'a>,
    value: &'a str,
    done: bool,
    pos: usize,
    from: usize,
    to: usize,
}

impl<'a> RangeCursor<'a> {
    /// Create a cursor over `[start, end]`, clipped to the rope.
    pub fn new(text: &'a Text, start: usize, end: usize) -> RangeCursor<'a> {
        let start = start.min(text.len());
        let end = end.min(text.len());
        let dir = if start > end { Direction::Backward } else { Direction::Forward };
        return RangeCursor {
            cursor: RawCursor::new(text, dir),
            value: "",
            done: false,
            pos: if dir == Direction::Backward { text.len() } else { 0 },
            from: start.min(end),
            to: start.max(end),
        };
    }

    fn advance_inner(&mut self, skip: isize, dir: Direction) {
        let forward = dir == Direction::Forward;
        if if forward { self.pos >= self.to } else { self.pos <= self.from } {
            self.value = "";
            self.done = true;
            return;
        }

        let pos = self.pos as isize;
        let from = self.from as isize;
        let to = self.to as isize;
        let mut skip = skip + if forward { (from - pos).max(0) } else { (pos - to).max(0) };
        let mut limit = if forward { to - pos } else { pos - from };
        if skip > limit {
            skip = limit;
        }
        limit -= skip;

        let value = self.cursor.advance(skip).value();
        let len = char_len(value) as isize;
        self.pos = (pos + (len + skip) * dir.sign()).max(0) as usize;
        self.value = if len <= limit {
            value
        } else if forward {
            char_slice(value, 0, limit as usize)
        } else {
            char_slice(value, (len - limit) as usize, len as usize)
        };
        self.done = self.value.is_empty();
    }
}

impl<'a> TextCursor<'a> for RangeCursor<'a> {
    fn advance(&mut self, skip: isize) -> &mut Self {
        let skip = if skip < 0 {
            skip.max(self.from as isize - self.pos as isize)
        } else if skip > 0 {
            skip.min(self.to as isize - self.pos as isize)
        } else {
            0
        };
        let dir = self.cursor.direction();
        self.advance_inner(skip, dir);
        return self;
    }

    fn value(&self) -> &'a str {
        return self.value;
    }

    fn line_break(&self) -> bool {
        return self.cursor.line_break() && !self.value.is_empty();
    }

    fn is_done(&self) -> bool {
        return self.done;
    }
}

/// Cursor that yields whole lines instead of chunks.
///
/// Break markers are swallowed, and an empty line still yields one empty
/// chunk, so a range spanning `n` lines produces exactly `n` values.
pub struct LineCursor<'a, C> {
    inner: C,
    after_break: bool,
    value: &'a str,
    done: bool,
}

impl<'a, C: TextCursor<'a>> LineCursor<'a, C> {
    /// Wrap a chunk cursor.
    pub fn new(inner: C) -> LineCursor<'a, C> {
        return LineCursor {
            inner,
            after_break: true,
            value: "",
            done: false,
        };
    }
}

impl<'a, C: TextCursor<'a>> TextCursor<'a> for LineCursor<'a, C> {
    fn advance(&mut self, skip: isize) -> &mut Self {
        let inner = self.inner.advance(skip);
        let (done, line_break, value) = (inner.is_done(), inner.line_break(), inner.value());
        if done && self.after_break {
            self.value = "";
            self.after_break = false;
        } else if done {
            self.done = true;
            self.value = "";
        } else if line_break {
            if self.after_break {
                self.value = "";
            } else {
                self.after_break = true;
                self.advance(0);
            }
        } else {
            self.value = value;
            self.after_break = false;
        }
        return self;
    }

    fn value(&self) -> &'a str {
        return self.value;
    }

    fn line_break(&self) -> bool {
        return false;
    }

    fn is_done(&self) -> bool {
        return self.done;
    }
}

impl<'a> Iterator for RawCursor<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.advance(0).done {
            return None;
        }
        return Some(self.value);
    }
}

impl<'a> Iterator for RangeCursor<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.advance(0).done {
            return None;
        }
        return Some(self.value);
    }
}

impl<'a, C: TextCursor<'a>> Iterator for LineCursor<'a, C> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.advance(0).done {
            return None;
        }
        return Some(self.value);
    }
}
