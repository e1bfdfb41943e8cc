//! Character-diff tests.

use jot_sync::merge::diff::{diff_chars, Diff, DiffOp};

// ============================================================================
// Helpers
// ============================================================================

/// Reassemble the old text from a script (Equal + Delete segments).
fn old_of(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != DiffOp::Insert)
        .map(|d| d.text.as_str())
        .collect()
}

/// Reassemble the new text from a script (Equal + Insert segments).
fn new_of(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.op != DiffOp::Delete)
        .map(|d| d.text.as_str())
        .collect()
}

fn assert_reconstructs(old: &str, new: &str) {
    let diffs = diff_chars(old, new);
    assert_eq!(old_of(&diffs), old, "old side mismatch for {old:?} -> {new:?}");
    assert_eq!(new_of(&diffs), new, "new side mismatch for {old:?} -> {new:?}");
    assert_coalesced(&diffs);
}

/// No empty segments, no adjacent same-op segments, deletes before inserts
/// inside each change block.
fn assert_coalesced(diffs: &[Diff]) {
    for d in diffs {
        assert!(!d.text.is_empty(), "empty segment in {diffs:?}");
    }
    for pair in diffs.windows(2) {
        assert_ne!(pair[0].op, pair[1].op, "adjacent same-op segments: {diffs:?}");
        assert!(
            !(pair[0].op == DiffOp::Insert && pair[1].op == DiffOp::Delete),
            "insert before delete: {diffs:?}"
        );
    }
}

// ============================================================================
// Basic shapes
// ============================================================================

#[test]
fn identical_inputs_yield_one_equal_segment() {
    let diffs = diff_chars("same", "same");
    assert_eq!(
        diffs,
        vec![Diff {
            op: DiffOp::Equal,
            text: "same".to_string()
        }]
    );
}

#[test]
fn both_empty_yields_empty_script() {
    assert!(diff_chars("", "").is_empty());
}

#[test]
fn pure_insert_and_pure_delete() {
    let ins = diff_chars("", "abc");
    assert_eq!(ins.len(), 1);
    assert_eq!(ins[0].op, DiffOp::Insert);
    assert_eq!(ins[0].text, "abc");

    let del = diff_chars("abc", "");
    assert_eq!(del.len(), 1);
    assert_eq!(del[0].op, DiffOp::Delete);
    assert_eq!(del[0].text, "abc");
}

#[test]
fn disjoint_inputs_become_delete_then_insert() {
    let diffs = diff_chars("aaa", "bbb");
    assert_eq!(diffs.len(), 2);
    assert_eq!(diffs[0].op, DiffOp::Delete);
    assert_eq!(diffs[0].text, "aaa");
    assert_eq!(diffs[1].op, DiffOp::Insert);
    assert_eq!(diffs[1].text, "bbb");
}

#[test]
fn insertion_in_the_middle_keeps_surrounding_equality() {
    let diffs = diff_chars("Hello World", "Hello Brave World");
    assert_eq!(old_of(&diffs), "Hello World");
    assert_eq!(new_of(&diffs), "Hello Brave World");
    // The shared prefix and suffix must survive as Equal segments.
    assert_eq!(diffs.first().map(|d| d.op), Some(DiffOp::Equal));
    assert_eq!(diffs.last().map(|d| d.op), Some(DiffOp::Equal));
}

// ============================================================================
// Reconstruction invariant
// ============================================================================

#[test]
fn reconstruction_holds_across_shapes() {
    let cases = [
        ("", "abc"),
        ("abc", ""),
        ("abc", "abc"),
        ("Line1\nLine2\nLine3", "Line1 changed\nLine2\nLine3"),
        ("Line1\nLine2\nLine3", "Line1\nLine2\nLine3 changed"),
        ("the quick brown fox", "the slow brown dog"),
        ("abcdef", "abdcef"),
        ("aaaa", "aabaa"),
        ("kitten", "sitting"),
        ("a long sentence with words", "words with sentence a long"),
    ];
    for (old, new) in cases {
        assert_reconstructs(old, new);
    }
}

#[test]
fn multibyte_text_diffs_on_char_boundaries() {
    let cases = [
        ("caf\u{e9}", "cafe"),
        ("日本語のテキスト", "日本語テキスト"),
        ("notes 📝 here", "notes 📝📝 here"),
        ("αβγδ", "αxγδ"),
    ];
    for (old, new) in cases {
        // Would panic on a byte-slicing bug before any assertion fires.
        assert_reconstructs(old, new);
    }
}
