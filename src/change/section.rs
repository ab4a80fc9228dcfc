//! Run-length section lists and the walks over them.
//!
//! A change is stored as a list of [`Section`]s. A section with `ins < 0`
//! keeps `len` characters; any other section replaces `len` characters of
//! the old document with `ins` characters of new content. Change sets keep a
//! parallel list of inserted texts indexed by section, padded with empty
//! texts where a section inserts nothing.

use crate::text::Text;

/// Marker for a section that keeps its characters.
pub(crate) const KEPT: isize = -1;
/// Marker an exhausted [`SectionIter`] reports.
const DONE: isize = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Section {
    /// Characters covered in the old document.
    pub len: usize,
    /// [`KEPT`], or the number of characters inserted in their place.
    pub ins: isize,
}

impl Section {
    pub fn kept(len: usize) -> Section {
        return Section { len, ins: KEPT };
    }

    pub fn is_kept(&self) -> bool {
        return self.ins < 0;
    }

    /// Characters this section covers in the new document.
    pub fn new_len(&self) -> usize {
        if self.ins < 0 {
            return self.len;
        }
        return self.ins as usize;
    }
}

/// Push a section, merging it into the previous one where the two describe
/// one run. `force_join` merges unconditionally.
pub(crate) fn add_section(sections: &mut Vec<Section>, len: usize, ins: isize, force_join: bool) {
    if len == 0 && ins <= 0 {
        return;
    }
    if let Some(last) = sections.last_mut() {
        if ins <= 0 && ins == last.ins {
            last.len += len;
            return;
        }
        if len == 0 && last.len == 0 {
            last.ins += ins;
            return;
        }
        if force_join {
            last.len += len;
            last.ins += ins;
            return;
        }
    }
    sections.push(Section { len, ins });
}

/// Record `value` as the insertion of the last section in `sections`.
///
/// If that section already has text (it was extended by a merge), the new
/// text is appended to it.
pub(crate) fn add_insert(values: &mut Vec<Text>, sections: &[Section], value: Text) {
    if value.is_empty() {
        return;
    }
    let index = sections.len().saturating_sub(1);
    if index < values.len() {
        if let Some(last) = values.last_mut() {
            *last = last.append(&value);
        }
        return;
    }
    values.resize(index, Text::empty());
    values.push(value);
}

/// Call `f(from_a, to_a, from_b, to_b, inserted)` for each replaced range.
///
/// Adjacent replaced sections are reported as one range unless `individual`
/// is set. Without inserted texts, `inserted` is always empty.
pub(crate) fn iter_changes<F>(sections: &[Section], inserted: Option<&[Text]>, individual: bool, mut f: F)
where
    F: FnMut(usize, usize, usize, usize, &Text),
{
    let mut pos_a = 0;
    let mut pos_b = 0;
    let mut i = 0;
    while i < sections.len() {
        let Section { mut len, mut ins } = sections[i];
        i += 1;
        if ins < 0 {
            pos_a += len;
            pos_b += len;
            continue;
        }
        let mut end_a = pos_a;
        let mut end_b = pos_b;
        let mut text = Text::empty();
        loop {
            end_a += len;
            end_b += ins as usize;
            if ins > 0 {
                if let Some(piece) = inserted.and_then(|inserted| inserted.get(i - 1)) {
                    text = text.append(piece);
                }
            }
            if individual || i == sections.len() || sections[i].ins < 0 {
                break;
            }
            Section { len, ins } = sections[i];
            i += 1;
        }
        f(pos_a, end_a, pos_b, end_b, &text);
        pos_a = end_a;
        pos_b = end_b;
    }
}

/// A cursor over a section list that can consume partial sections.
pub(crate) struct SectionIter<'a> {
    sections: &'a [Section],
    inserted: Option<&'a [Text]>,
    /// Index of the section after the current one.
    pub i: usize,
    /// Remaining old-document length of the current section.
    pub len: usize,
    /// Remaining insertion of the current section, or a marker.
    pub ins: isize,
    /// How much of the current section has been consumed.
    pub off: usize,
}

impl<'a> SectionIter<'a> {
    pub fn new(sections: &'a [Section], inserted: Option<&'a [Text]>) -> SectionIter<'a> {
        let mut iter = SectionIter {
            sections,
            inserted,
            i: 0,
            len: 0,
            ins: DONE,
            off: 0,
        };
        iter.next();
        return iter;
    }

    pub fn next(&mut self) {
        match self.sections.get(self.i) {
            Some(section) => {
                self.len = section.len;
                self.ins = section.ins;
                self.i += 1;
            }
            None => {
                self.len = 0;
                self.ins = DONE;
            }
        }
        self.off = 0;
    }

    pub fn done(&self) -> bool {
        return self.ins == DONE;
    }

    /// Remaining new-document length of the current section.
    pub fn len2(&self) -> usize {
        if self.ins < 0 {
            return self.len;
        }
        return self.ins as usize;
    }

    fn current_text(&self) -> Option<&'a Text> {
        let index = self.i.checked_sub(1)?;
        return self.inserted?.get(index);
    }

    /// The full insertion of the current section.
    pub fn text(&self) -> Text {
        return self.current_text().cloned().unwrap_or_else(Text::empty);
    }

    /// `len` characters of the current insertion, from the current offset.
    pub fn text_bit(&self, len: usize) -> Text {
        return match self.current_text() {
            Some(text) => text.slice(self.off, self.off + len),
            None => Text::empty(),
        };
    }

    /// Consume `len` characters of the old-document side.
    pub fn forward(&mut self, len: usize) {
        if len == self.len {
            self.next();
        } else {
            self.len -= len;
            self.off += len;
        }
    }

    /// Consume `len` characters of the new-document side.
    pub fn forward2(&mut self, len: usize) {
        if self.ins == KEPT {
            self.forward(len);
        } else if len as isize == self.ins {
            self.next();
        } else {
            self.ins -= len as isize;
            self.off += len;
        }
    }
}

/// Result of a section walk: the sections and, when requested, the inserted
/// texts.
pub(crate) type Walked = (Vec<Section>, Vec<Text>);

/// Rebase `a` over `b`. Both must start from the same document. Returns
/// `None` when their lengths disagree.
pub(crate) fn map_sections(mut a: SectionIter<'_>, mut b: SectionIter<'_>, before: bool, mk_set: bool) -> Option<Walked> {
    let mut sections = Vec::new();
    let mut insert = Vec::new();
    // Index (as in `SectionIter::i`) of the last `a` section whose
    // insertion was emitted.
    let mut inserted: Option<usize> = None;
    loop {
        let fresh = inserted.is_none_or(|index| index < a.i);
        if (a.done() && b.len > 0) || (b.done() && a.len > 0) {
            return None;
        } else if a.ins == KEPT && b.ins == KEPT {
            let len = a.len.min(b.len);
            add_section(&mut sections, len, KEPT, false);
            a.forward(len);
            b.forward(len);
        } else if b.ins >= 0
            && (a.ins < 0
                || inserted == Some(a.i)
                || (a.off == 0 && (b.len < a.len || (b.len == a.len && !before))))
        {
            // `b` replaces this span first: keep its insertion and drop what
            // `a` would have deleted inside it.
            let mut len = b.len;
            add_section(&mut sections, b.ins as usize, KEPT, false);
            while len > 0 {
                let piece = a.len.min(len);
                if a.ins >= 0 && inserted.is_none_or(|index| index < a.i) && a.len <= piece {
                    add_section(&mut sections, 0, a.ins, false);
                    if mk_set {
                        add_insert(&mut insert, &sections, a.text());
                    }
                    inserted = Some(a.i);
                }
                a.forward(piece);
                len -= piece;
            }
            b.next();
        } else if a.ins >= 0 {
            // `a` replaces: extend the replaced length over whatever of its
            // span `b` kept, skipping spans `b` already deleted.
            let mut len = 0;
            let mut left = a.len;
            while left > 0 {
                if b.ins == KEPT {
                    let piece = left.min(b.len);
                    len += piece;
                    left -= piece;
                    b.forward(piece);
                } else if b.ins == 0 && b.len < left {
                    left -= b.len;
                    b.next();
                } else {
                    break;
                }
            }
            add_section(&mut sections, len, if fresh { a.ins } else { 0 }, false);
            if mk_set && fresh {
                add_insert(&mut insert, &sections, a.text());
            }
            inserted = Some(a.i);
            a.forward(a.len - left);
        } else if a.done() && b.done() {
            return Some((sections, insert));
        } else {
            return None;
        }
    }
}

/// Compose `a` (document A to B) with `b` (B to C). Returns `None` when
/// `a`'s new length is not `b`'s length.
pub(crate) fn compose_sections(mut a: SectionIter<'_>, mut b: SectionIter<'_>, mk_set: bool) -> Option<Walked> {
    let mut sections = Vec::new();
    let mut insert = Vec::new();
    let mut open = false;
    loop {
        if a.done() && b.done() {
            return Some((sections, insert));
        } else if a.ins == 0 {
            // Deletion in a.
            add_section(&mut sections, a.len, 0, open);
            a.next();
        } else if b.len == 0 && !b.done() {
            // Insertion in b.
            add_section(&mut sections, 0, b.ins, open);
            if mk_set {
                add_insert(&mut insert, &sections, b.text());
            }
            b.next();
        } else if a.done() || b.done() {
            return None;
        } else {
            let len = a.len2().min(b.len);
            let section_count = sections.len();
            if a.ins == KEPT {
                let ins_b = if b.ins == KEPT {
                    KEPT
                } else if b.off > 0 {
                    0
                } else {
                    b.ins
                };
                add_section(&mut sections, len, ins_b, open);
                if mk_set && ins_b > 0 {
                    add_insert(&mut insert, &sections, b.text());
                }
            } else if b.ins == KEPT {
                add_section(&mut sections, if a.off > 0 { 0 } else { a.len }, len as isize, open);
                if mk_set {
                    add_insert(&mut insert, &sections, a.text_bit(len));
                }
            } else {
                add_section(
                    &mut sections,
                    if a.off > 0 { 0 } else { a.len },
                    if b.off > 0 { 0 } else { b.ins },
                    open,
                );
                if mk_set && b.off == 0 {
                    add_insert(&mut insert, &sections, b.text());
                }
            }
            open = (a.ins > len as isize || (b.ins >= 0 && b.len > len)) && (open || sections.len() > section_count);
            a.forward2(len);
            b.forward(len);
        }
    }
}
