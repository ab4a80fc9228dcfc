//! Property-based tests for the rope and the change algebra.

use docmodel::{Assoc, ChangeDesc, ChangeSet, ChangeSpec, MapMode, Text};
use proptest::prelude::*;

// =============================================================================
// Test helpers
// =============================================================================

/// Document content: short lines of ASCII and a few multi-byte chars.
fn arbitrary_doc() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-c é日]{0,12}", 1..80).prop_map(|lines| lines.join("\n"))
}

/// An edit with positions as fractions of the document length.
#[derive(Clone, Debug)]
struct EditOp {
    from_pct: f64,
    len_pct: f64,
    insert: String,
}

fn arbitrary_edit_op() -> impl Strategy<Value = EditOp> {
    (0.0..=1.0f64, 0.0..=0.3f64, "[xyz\n]{0,6}").prop_map(|(from_pct, len_pct, insert)| EditOp {
        from_pct,
        len_pct,
        insert,
    })
}

fn to_spec(op: &EditOp, length: usize) -> ChangeSpec {
    let from = ((op.from_pct * length as f64) as usize).min(length);
    let to = (from + (op.len_pct * length as f64) as usize).min(length);
    return ChangeSpec::replace(from, to, op.insert.as_str());
}

fn change(ops: &[EditOp], length: usize) -> ChangeSet {
    let specs: Vec<ChangeSpec> = ops.iter().map(|op| to_spec(op, length)).collect();
    return ChangeSet::of(specs, length, None).unwrap();
}

/// Char-indexed replacement on a plain string.
fn splice(s: &str, from: usize, to: usize, insert: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out: String = chars[..from].iter().collect();
    out.push_str(insert);
    out.extend(&chars[to..]);
    return out;
}

// =============================================================================
// Rope properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// replace matches the same edit on a plain string
    #[test]
    fn replace_matches_string_splice(
        content in arbitrary_doc(),
        op in arbitrary_edit_op(),
    ) {
        let text = Text::from(content.as_str());
        let len = text.len();
        let from = ((op.from_pct * len as f64) as usize).min(len);
        let to = (from + (op.len_pct * len as f64) as usize).min(len);
        let insert = Text::from(op.insert.as_str());

        let replaced = text.replace(from, to, &insert);
        prop_assert_eq!(replaced.len(), len - (to - from) + insert.len());
        prop_assert_eq!(replaced.to_string(), splice(&content, from, to, &op.insert));
        prop_assert_eq!(replaced.slice(0, replaced.len()), replaced.clone());
    }

    /// line(n) and line_at agree for every line
    #[test]
    fn line_addressing_is_consistent(content in arbitrary_doc()) {
        let text = Text::from(content.as_str());
        let expected: Vec<&str> = content.split('\n').collect();
        prop_assert_eq!(text.lines(), expected.len());
        for n in 1..=text.lines() {
            let line = text.line(n).unwrap();
            prop_assert_eq!(line.number, n);
            prop_assert_eq!(line.text, expected[n - 1]);
            prop_assert_eq!(text.line_at(line.from).unwrap().number, n);
        }
    }

    /// iter_range concatenates to the same text as slice_string
    #[test]
    fn iter_range_matches_slice_string(
        content in arbitrary_doc(),
        a_pct in 0.0..=1.0f64,
        b_pct in 0.0..=1.0f64,
    ) {
        let text = Text::from(content.as_str());
        let a = (a_pct * text.len() as f64) as usize;
        let b = (b_pct * text.len() as f64) as usize;
        let (from, to) = (a.min(b), a.max(b));
        let forward: String = text.iter_range(from, to).collect();
        prop_assert_eq!(&forward, &text.slice_string(from, to, "\n"));
        let mut backward: Vec<&str> = text.iter_range(to, from).collect();
        backward.reverse();
        prop_assert_eq!(backward.concat(), forward);
    }

    /// a line cursor over the whole document yields every line once
    #[test]
    fn iter_lines_yields_every_line(content in arbitrary_doc()) {
        let text = Text::from(content.as_str());
        let lines: Vec<&str> = text.iter_lines(..).unwrap().collect();
        let expected: Vec<&str> = content.split('\n').collect();
        prop_assert_eq!(lines, expected);
    }

    /// JSON round trip preserves the document
    #[test]
    fn text_json_roundtrip(content in arbitrary_doc()) {
        let text = Text::from(content.as_str());
        prop_assert_eq!(Text::from_json(&text.to_json()).unwrap(), text);
    }
}

// =============================================================================
// Change algebra properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// invert(T) undoes apply
    #[test]
    fn invert_undoes_apply(
        content in arbitrary_doc(),
        ops in prop::collection::vec(arbitrary_edit_op(), 1..5),
    ) {
        let doc = Text::from(content.as_str());
        let c = change(&ops, doc.len());
        let changed = c.apply(&doc).unwrap();
        prop_assert_eq!(changed.len(), c.new_length());
        prop_assert_eq!(c.invert(&doc).unwrap().apply(&changed).unwrap(), doc);
    }

    /// applying a then b equals applying a.compose(b)
    #[test]
    fn compose_equals_sequential_apply(
        content in arbitrary_doc(),
        ops_a in prop::collection::vec(arbitrary_edit_op(), 1..5),
        ops_b in prop::collection::vec(arbitrary_edit_op(), 1..5),
    ) {
        let doc = Text::from(content.as_str());
        let a = change(&ops_a, doc.len());
        let b = change(&ops_b, a.new_length());
        let sequential = b.apply(&a.apply(&doc).unwrap()).unwrap();
        prop_assert_eq!(a.compose(&b).unwrap().apply(&doc).unwrap(), sequential);
    }

    /// both merge orders of concurrent changes converge
    #[test]
    fn concurrent_changes_converge(
        content in arbitrary_doc(),
        ops_a in prop::collection::vec(arbitrary_edit_op(), 1..5),
        ops_b in prop::collection::vec(arbitrary_edit_op(), 1..5),
    ) {
        let doc = Text::from(content.as_str());
        let a = change(&ops_a, doc.len());
        let b = change(&ops_b, doc.len());
        let left = a.compose(&b.map(a.desc(), false).unwrap()).unwrap();
        let right = b.compose(&a.map(b.desc(), true).unwrap()).unwrap();
        prop_assert_eq!(left.apply(&doc).unwrap(), right.apply(&doc).unwrap());
    }

    /// mapping positions through an empty change is the identity
    #[test]
    fn empty_change_maps_positions_to_themselves(length in 0usize..500, pct in 0.0..=1.0f64) {
        let pos = (pct * length as f64) as usize;
        let empty = ChangeSet::empty(length);
        prop_assert_eq!(empty.map_pos(pos, Assoc::Before).unwrap(), pos);
        prop_assert_eq!(empty.map_pos(pos, Assoc::After).unwrap(), pos);
    }

    /// mapped positions stay inside the new document, and tracked ones
    /// survive exactly when simple mapping keeps them off deleted text
    #[test]
    fn map_pos_stays_in_bounds(
        content in arbitrary_doc(),
        ops in prop::collection::vec(arbitrary_edit_op(), 1..5),
    ) {
        let doc = Text::from(content.as_str());
        let c = change(&ops, doc.len());
        for pos in 0..=doc.len() {
            prop_assert!(c.map_pos(pos, Assoc::Before).unwrap() <= c.new_length());
            prop_assert!(c.map_pos(pos, Assoc::After).unwrap() <= c.new_length());
            if let Some(mapped) = c.map_pos_mode(pos, Assoc::Before, MapMode::TrackDel).unwrap() {
                prop_assert_eq!(mapped, c.map_pos(pos, Assoc::Before).unwrap());
            }
        }
        prop_assert!(c.map_pos(doc.len() + 1, Assoc::Before).is_err());
    }

    /// filter splits a change into parts that together cover it
    #[test]
    fn filter_covers_the_change(
        content in arbitrary_doc(),
        ops in prop::collection::vec(arbitrary_edit_op(), 1..5),
        from_pct in 0.0..=1.0f64,
        len_pct in 0.0..=1.0f64,
    ) {
        let doc = Text::from(content.as_str());
        let c = change(&ops, doc.len());
        let from = (from_pct * doc.len() as f64) as usize;
        let to = (from + (len_pct * doc.len() as f64) as usize).min(doc.len());
        let filtered = c.filter(&[(from, to)]);
        prop_assert_eq!(filtered.changes.length(), c.length());
        prop_assert_eq!(filtered.filtered.length(), c.length());
        prop_assert!(filtered.changes.apply(&doc).is_ok());
    }

    /// JSON round trips for sets and descriptions
    #[test]
    fn change_json_roundtrip(
        content in arbitrary_doc(),
        ops in prop::collection::vec(arbitrary_edit_op(), 1..5),
    ) {
        let doc = Text::from(content.as_str());
        let c = change(&ops, doc.len());
        let parsed = ChangeSet::from_json(&c.to_json()).unwrap();
        prop_assert_eq!(parsed.apply(&doc).unwrap(), c.apply(&doc).unwrap());
        prop_assert_eq!(&ChangeDesc::from_json(&c.desc().to_json()).unwrap(), c.desc());
    }
}
