//! Context patches built from a diff, and their fuzzy application to a text
//! that may have drifted from the diff's original base.
//!
//! A patch carries up to [`CONTEXT_LEN`] characters of surrounding context on
//! each side. Application locates each patch by its context, preferring the
//! position predicted by earlier patches' drift, and degrades gracefully:
//! nearest occurrence anywhere in the text, then a retry with halved context,
//! then failure. Failures are counted, never fatal.

use super::diff::{Diff, DiffOp};

/// Characters of context captured on each side of a change.
pub const CONTEXT_LEN: usize = 4;

// ============================================================================
// Patch construction
// ============================================================================

/// One contiguous change against a base text, with surrounding context.
///
/// All positions and lengths count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Char index in the base text where the removed run starts.
    pub offset: usize,
    pub context_before: String,
    pub remove: String,
    pub insert: String,
    pub context_after: String,
}

/// Convert an edit script into context patches, one per change block.
pub fn build_patches(diffs: &[Diff]) -> Vec<Patch> {
    // Base text is the Equal + Delete segments in order.
    let base: Vec<char> = diffs
        .iter()
        .filter(|d| d.op != DiffOp::Insert)
        .flat_map(|d| d.text.chars())
        .collect();

    let mut patches = Vec::new();
    let mut pos = 0usize;
    let mut i = 0usize;
    while i < diffs.len() {
        if diffs[i].op == DiffOp::Equal {
            pos += diffs[i].text.chars().count();
            i += 1;
            continue;
        }

        let start = pos;
        let mut remove = String::new();
        let mut insert = String::new();
        while i < diffs.len() && diffs[i].op != DiffOp::Equal {
            match diffs[i].op {
                DiffOp::Delete => {
                    remove.push_str(&diffs[i].text);
                    pos += diffs[i].text.chars().count();
                }
                DiffOp::Insert => insert.push_str(&diffs[i].text),
                DiffOp::Equal => unreachable!(),
            }
            i += 1;
        }

        let ctx_start = start.saturating_sub(CONTEXT_LEN);
        let ctx_end = (pos + CONTEXT_LEN).min(base.len());
        patches.push(Patch {
            offset: start,
            context_before: base[ctx_start..start].iter().collect(),
            remove,
            insert,
            context_after: base[pos..ctx_end].iter().collect(),
        });
    }
    patches
}

// ============================================================================
// Patch application
// ============================================================================

/// Outcome of applying a patch set.
#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub text: String,
    pub attempted: usize,
    pub applied: usize,
}

/// Apply `patches` to `target` in order, tracking positional drift from
/// earlier applications. A patch that cannot be located is skipped and
/// counted; it does not abort the rest of the set.
pub fn apply_patches(target: &str, patches: &[Patch]) -> ApplyReport {
    let mut text: Vec<char> = target.chars().collect();
    let mut drift = 0isize;
    let mut applied = 0usize;

    for patch in patches {
        let ctx_before: Vec<char> = patch.context_before.chars().collect();
        let ctx_after: Vec<char> = patch.context_after.chars().collect();
        let remove: Vec<char> = patch.remove.chars().collect();
        let insert: Vec<char> = patch.insert.chars().collect();

        let located = locate(&text, &ctx_before, &remove, &ctx_after, patch.offset, drift)
            .or_else(|| {
                // Halve the context and try again; a neighbour's edit may
                // have touched the outer context chars.
                let half_before = &ctx_before[ctx_before.len() - ctx_before.len() / 2..];
                let half_after = &ctx_after[..ctx_after.len() / 2];
                locate(&text, half_before, &remove, half_after, patch.offset, drift)
            });

        if let Some(remove_start) = located {
            let remove_end = remove_start + remove.len();
            text.splice(remove_start..remove_end, insert.iter().copied());
            drift += insert.len() as isize - remove.len() as isize;
            applied += 1;
        }
    }

    ApplyReport {
        text: text.iter().collect(),
        attempted: patches.len(),
        applied,
    }
}

/// Find where a patch's removed run starts in `text`, or `None`.
///
/// The needle is `context_before + remove + context_after`. The position
/// predicted by `offset + drift` wins when it matches exactly; otherwise the
/// occurrence nearest to the prediction is used. An empty needle is a pure
/// insertion and lands at the predicted position.
fn locate(
    text: &[char],
    ctx_before: &[char],
    remove: &[char],
    ctx_after: &[char],
    offset: usize,
    drift: isize,
) -> Option<usize> {
    let mut needle = Vec::with_capacity(ctx_before.len() + remove.len() + ctx_after.len());
    needle.extend_from_slice(ctx_before);
    needle.extend_from_slice(remove);
    needle.extend_from_slice(ctx_after);

    let expected = clamp_pos(offset as isize - ctx_before.len() as isize + drift, text.len());

    if needle.is_empty() {
        return Some(clamp_pos(offset as isize + drift, text.len()));
    }

    let needle_start = find_nearest(text, &needle, expected)?;
    Some(needle_start + ctx_before.len())
}

fn clamp_pos(pos: isize, len: usize) -> usize {
    pos.clamp(0, len as isize) as usize
}

/// Occurrence of `needle` in `haystack` nearest to `expected`, by start index.
fn find_nearest(haystack: &[char], needle: &[char], expected: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .min_by_key(|i| i.abs_diff(expected))
}
