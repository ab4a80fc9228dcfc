//! AFL fuzz harness for the change algebra
//!
//! This harness checks the properties collaborative editing relies on:
//! 1. Convergence: two concurrent edits merged in either order give one document
//! 2. Inversion: applying a change and then its inverse restores the document
//! 3. Composition: applying a composed change equals applying both in turn
//!
//! Model: two peers edit the same document concurrently, then exchange their
//! changes and rebase them onto each other.

use afl::fuzz;
use docmodel::{ChangeSet, ChangeSpec, Text};

/// Edit types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzEdit {
    Insert { pos_frac: u8, len: u8, lines: u8 },
    Delete { pos_frac: u8, len: u8 },
    Replace { pos_frac: u8, del: u8, len: u8 },
}

impl FuzzEdit {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzEdit, &[u8])> {
        let (&op_type, rest) = bytes.split_first()?;
        match op_type % 3 {
            0 if rest.len() >= 3 => {
                let edit = FuzzEdit::Insert {
                    pos_frac: rest[0],
                    len: (rest[1] % 16).saturating_add(1),
                    lines: rest[2] % 3,
                };
                Some((edit, &rest[3..]))
            }
            1 if rest.len() >= 2 => {
                let edit = FuzzEdit::Delete {
                    pos_frac: rest[0],
                    len: (rest[1] % 16).saturating_add(1),
                };
                Some((edit, &rest[2..]))
            }
            2 if rest.len() >= 3 => {
                let edit = FuzzEdit::Replace {
                    pos_frac: rest[0],
                    del: rest[1] % 8,
                    len: (rest[2] % 8).saturating_add(1),
                };
                Some((edit, &rest[3..]))
            }
            _ => None,
        }
    }

    fn to_spec(self, doc_len: usize, peer: u8) -> ChangeSpec {
        let at = |frac: u8| (frac as usize * doc_len) / 256;
        let content = |len: u8, lines: u8| -> String {
            let mut s: String = (0..len).map(|i| (b'a' + (peer * 7 + i) % 26) as char).collect();
            for _ in 0..lines {
                s.push('\n');
            }
            s
        };
        match self {
            FuzzEdit::Insert { pos_frac, len, lines } => ChangeSpec::insert(at(pos_frac), content(len, lines)),
            FuzzEdit::Delete { pos_frac, len } => {
                let from = at(pos_frac);
                ChangeSpec::delete(from, (from + len as usize).min(doc_len))
            }
            FuzzEdit::Replace { pos_frac, del, len } => {
                let from = at(pos_frac);
                ChangeSpec::replace(from, (from + del as usize).min(doc_len), content(len, 0))
            }
        }
    }
}

/// Build one peer's change from up to four edits, all against `doc`.
fn peer_change<'a>(doc: &Text, mut data: &'a [u8], peer: u8) -> (ChangeSet, &'a [u8]) {
    let mut specs = Vec::new();
    while specs.len() < 4 {
        let Some((edit, rest)) = FuzzEdit::from_bytes(data) else {
            break;
        };
        data = rest;
        specs.push(edit.to_spec(doc.len(), peer));
    }
    let set = ChangeSet::of(specs, doc.len(), None).expect("generated specs are in range");
    (set, data)
}

fn main() {
    fuzz!(|data: &[u8]| {
        let mut doc = Text::from("The quick brown fox\njumps over\n\nthe lazy dog.");
        let mut remaining = data;

        while !remaining.is_empty() {
            let (a, rest) = peer_change(&doc, remaining, 0);
            let (b, rest) = peer_change(&doc, rest, 1);
            if rest.len() == remaining.len() {
                break;
            }
            remaining = rest;

            // CRITICAL INVARIANT: both merge orders converge
            let left = a.compose(&b.map(a.desc(), false).unwrap()).unwrap();
            let right = b.compose(&a.map(b.desc(), true).unwrap()).unwrap();
            let merged = left.apply(&doc).unwrap();
            assert_eq!(merged, right.apply(&doc).unwrap(), "Convergence failure for {a} and {b}");

            // Composition matches sequential application
            let after_a = a.apply(&doc).unwrap();
            let b_over_a = b.map(a.desc(), false).unwrap();
            assert_eq!(b_over_a.apply(&after_a).unwrap(), merged, "Compose mismatch");

            // Inverse restores the document
            let undo = left.invert(&doc).unwrap();
            assert_eq!(undo.apply(&merged).unwrap(), doc, "Inverse failure for {left}");

            // Position mapping stays within the new document
            for pos in 0..=doc.len() {
                assert!(left.map_pos(pos, Default::default()).unwrap() <= merged.len());
            }

            doc = merged;
        }
    });
}
