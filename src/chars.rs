//! Character-offset helpers shared by the rope and its consumers.
//!
//! Document positions count `char`s, while Rust strings index bytes. The
//! functions here do that translation, split raw strings into lines, and
//! answer the grapheme and column questions an editor asks about a line.

use unicode_segmentation::UnicodeSegmentation;

/// Number of chars in `s`.
#[inline]
pub fn char_len(s: &str) -> usize {
    return s.chars().count();
}

/// Byte offset of the char at `pos`, or `s.len()` when `pos` is past the end.
#[inline]
pub fn byte_offset(s: &str, pos: usize) -> usize {
    if pos == 0 {
        return 0;
    }
    return s.char_indices().nth(pos).map_or(s.len(), |(i, _)| i);
}

/// The chars of `s` in `[from, to)`, clamped to the string.
pub fn char_slice(s: &str, from: usize, to: usize) -> &str {
    if from >= to {
        return "";
    }
    let start = byte_offset(s, from);
    let rest = &s[start..];
    let end = byte_offset(rest, to - from);
    return &rest[..end];
}

/// Split `s` into lines.
///
/// With no separator, `"\r\n"`, `"\r"` and `"\n"` all end a line. The result
/// always holds at least one (possibly empty) line.
pub fn split_lines(s: &str, separator: Option<&str>) -> Vec<String> {
    if let Some(sep) = separator.filter(|sep| !sep.is_empty()) {
        return s.split(sep).map(String::from).collect();
    }

    let bytes = s.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(s[start..i].to_string());
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(s[start..i].to_string());
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(s[start..].to_string());
    return lines;
}

/// Find the grapheme cluster boundary after (`forward`) or before `pos`.
///
/// Positions are char offsets into `s`. Moving forward from the end returns
/// the end; moving backward from the start returns 0.
pub fn find_cluster_break(s: &str, pos: usize, forward: bool) -> usize {
    let mut boundary = 0;
    for grapheme in s.graphemes(true) {
        let next = boundary + char_len(grapheme);
        if forward && next > pos {
            return next;
        }
        if !forward && next >= pos {
            return boundary;
        }
        boundary = next;
    }
    return boundary;
}

/// Count the column of char offset `to` in `s`, expanding tabs to the next
/// multiple of `tab_size`. Each grapheme cluster counts as one column.
pub fn count_column(s: &str, tab_size: usize, to: usize) -> usize {
    let tab_size = tab_size.max(1);
    let mut column = 0;
    let mut pos = 0;
    for grapheme in s.graphemes(true) {
        if pos >= to {
            break;
        }
        if grapheme == "\t" {
            column += tab_size - (column % tab_size);
        } else {
            column += 1;
        }
        pos += char_len(grapheme);
    }
    return column;
}

/// Find the char offset in `s` that corresponds to column `column`.
///
/// When the line is shorter than the column, returns the line's length, or
/// `None` if `strict` is set.
pub fn find_column(s: &str, column: usize, tab_size: usize, strict: bool) -> Option<usize> {
    let tab_size = tab_size.max(1);
    let mut current = 0;
    let mut pos = 0;
    let mut graphemes = s.graphemes(true);
    loop {
        if current >= column {
            return Some(pos);
        }
        let Some(grapheme) = graphemes.next() else {
            break;
        };
        current += if grapheme == "\t" { tab_size - (current % tab_size) } else { 1 };
        pos += char_len(grapheme);
    }
    if strict {
        return None;
    }
    return Some(pos);
}
