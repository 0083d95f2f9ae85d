//! # Function-Pattern Mask
//!
//! For each version, which modules belong to function patterns (finder
//! patterns with their format strips, timing patterns, alignment patterns
//! and version-info blocks) rather than to the data region. The codeword
//! traversal skips every module this mask marks.
//!
//! The mask is a pure function of the version, so it is computed once per
//! version into a process-wide table of write-once cells; entries are
//! immutable after publication and safe to share across threads.

use std::sync::OnceLock;

use crate::common::BitMatrix;
use crate::qr::version::Version;

static CACHE: [OnceLock<BitMatrix>; 40] = [const { OnceLock::new() }; 40];

/// The function-pattern mask for `version`, set bits marking non-data
/// modules.
pub fn function_pattern_mask(version: Version) -> &'static BitMatrix {
    CACHE[version.number() - 1].get_or_init(|| build(version))
}

fn build(version: Version) -> BitMatrix {
    let dimension = version.dimension();
    let mut mask = BitMatrix::square(dimension);

    // Finder patterns with separators and format-info strips.
    mask.set_region(0, 0, 9, 9);
    mask.set_region(dimension - 8, 0, 8, 9);
    mask.set_region(0, dimension - 8, 9, 8);

    // Alignment patterns, skipping the three that would sit on finder
    // corners.
    let centers = version.alignment_centers();
    let max = centers.len().saturating_sub(1);
    for (yi, &cy) in centers.iter().enumerate() {
        for (xi, &cx) in centers.iter().enumerate() {
            let on_finder = (xi == 0 && yi == 0)
                || (xi == max && yi == 0)
                || (xi == 0 && yi == max);
            if on_finder {
                continue;
            }
            mask.set_region(cx - 2, cy - 2, 5, 5);
        }
    }

    // Timing patterns between the finder regions.
    mask.set_region(6, 9, 1, dimension - 17);
    mask.set_region(9, 6, dimension - 17, 1);

    // Version info blocks for versions 7 and up.
    if version.number() >= 7 {
        mask.set_region(dimension - 11, 0, 3, 6);
        mask.set_region(0, dimension - 11, 6, 3);
    }

    mask
}

// ============================================================================
// TESTS
// ============================================================================
