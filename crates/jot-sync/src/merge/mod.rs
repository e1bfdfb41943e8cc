//! Three-way text merge.
//!
//! Pure and deterministic: no I/O, no logging, no clocks. The gateway calls
//! [`resolve_with`] when a conditional write loses a revision race, but the
//! module is equally usable standalone.

pub mod diff;
pub mod patch;

use diff::diff_chars;
use patch::{apply_patches, build_patches};

// ============================================================================
// Configuration and outcome
// ============================================================================

/// Tunables for conflict resolution.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    /// Minimum fraction of patches that must apply for the merged text to be
    /// trusted. Below it the local text wins wholesale.
    pub success_threshold: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            success_threshold: 0.5,
        }
    }
}

/// Result of a three-way merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged_text: String,
    /// True whenever both sides diverged from the base, even if every patch
    /// applied cleanly.
    pub was_conflicted: bool,
    /// False when too few patches applied and the outcome fell back to the
    /// local text.
    pub merge_successful: bool,
}

// ============================================================================
// Resolution
// ============================================================================

/// Merge `local` and `remote` against their common ancestor `base` with the
/// default configuration.
pub fn resolve(base: &str, local: &str, remote: &str) -> MergeOutcome {
    resolve_with(&MergeConfig::default(), base, local, remote)
}

/// Merge `local` and `remote` against their common ancestor `base`.
///
/// One-sided edits pass the edited side through unchanged. When both sides
/// diverged, the local edits are lifted as context patches and replayed on
/// top of the remote text; if fewer than `success_threshold` of them land,
/// the local text is kept as-is so the user's words are never silently
/// dropped.
pub fn resolve_with(config: &MergeConfig, base: &str, local: &str, remote: &str) -> MergeOutcome {
    if local == remote {
        return MergeOutcome {
            merged_text: local.to_string(),
            was_conflicted: false,
            merge_successful: true,
        };
    }
    if local == base {
        return MergeOutcome {
            merged_text: remote.to_string(),
            was_conflicted: false,
            merge_successful: true,
        };
    }
    if remote == base {
        return MergeOutcome {
            merged_text: local.to_string(),
            was_conflicted: false,
            merge_successful: true,
        };
    }

    let patches = build_patches(&diff_chars(base, local));
    let report = apply_patches(remote, &patches);
    let ratio = if report.attempted == 0 {
        1.0
    } else {
        report.applied as f64 / report.attempted as f64
    };

    if ratio >= config.success_threshold {
        MergeOutcome {
            merged_text: report.text,
            was_conflicted: true,
            merge_successful: true,
        }
    } else {
        MergeOutcome {
            merged_text: local.to_string(),
            was_conflicted: true,
            merge_successful: false,
        }
    }
}
