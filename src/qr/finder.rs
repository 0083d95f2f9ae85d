//! # Finder Pattern Search
//!
//! Locates the three 7x7 concentric square markers of a QR symbol by their
//! 1:1:3:1:1 dark/light run signature.
//!
//! ## How the scan works
//!
//! Rows are scanned three apart (a finder is at least seven modules tall, so
//! a decodable pattern cannot slip between scanned rows). Each row is walked
//! through a five-run state machine; uniform 32-pixel words are consumed in
//! one step straight from the packed matrix. When five runs match the
//! 1:1:3:1:1 ratios, the candidate center is cross-checked vertically and
//! merged into the candidate list, averaging positions weighted by how many
//! times each center has been seen.

use crate::common::BitMatrix;
use crate::error::LectoraError;

/// Rows skipped between horizontal scans.
const ROW_SKIP: usize = 3;

/// Candidates closer than this (both axes) are the same center.
const MERGE_DISTANCE: f32 = 10.0;

/// A possible finder-pattern center.
#[derive(Clone, Copy, Debug)]
pub struct FinderPattern {
    pub x: f32,
    pub y: f32,
    pub module_size: f32,
    pub count: usize,
}

impl FinderPattern {
    fn near(&self, x: f32, y: f32) -> bool {
        (self.x - x).abs() <= MERGE_DISTANCE && (self.y - y).abs() <= MERGE_DISTANCE
    }

    /// Fold a new sighting into the running count-weighted averages.
    fn merge(&mut self, x: f32, y: f32, module_size: f32) {
        let n = self.count as f32;
        self.x = (self.x * n + x) / (n + 1.0);
        self.y = (self.y * n + y) / (n + 1.0);
        self.module_size = (self.module_size * n + module_size) / (n + 1.0);
        self.count += 1;
    }

    pub fn distance(&self, other: &FinderPattern) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The three finder patterns of one symbol, in canonical order. The pair
/// with the largest separation spans the hypotenuse (bottom-left to
/// top-right); the cross-product sign pins the orientation in y-down screen
/// coordinates.
#[derive(Clone, Copy, Debug)]
pub struct FinderTriplet {
    pub bottom_left: FinderPattern,
    pub top_left: FinderPattern,
    pub top_right: FinderPattern,
}

/// Find the single most confirmed finder triplet.
pub fn find(matrix: &BitMatrix) -> Result<FinderTriplet, LectoraError> {
    let mut candidates = scan(matrix);
    if candidates.len() < 3 {
        return Err(LectoraError::Detection);
    }
    candidates.sort_by(|a, b| b.count.cmp(&a.count));
    log::debug!("finder scan: {} candidates", candidates.len());
    Ok(order_triplet([candidates[0], candidates[1], candidates[2]]))
}

/// Enumerate triplets for every QR in the image. Each candidate center joins
/// at most one returned triplet.
pub fn find_all(matrix: &BitMatrix) -> Vec<FinderTriplet> {
    let mut candidates = scan(matrix);
    candidates.retain(|c| c.count >= 2);
    candidates.sort_by(|a, b| b.count.cmp(&a.count));

    let n = candidates.len();
    let mut used = vec![false; n];
    let mut triplets = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                if used[i] || used[j] || used[k] {
                    continue;
                }
                let triplet = order_triplet([candidates[i], candidates[j], candidates[k]]);
                if is_valid_triplet(&triplet) {
                    triplets.push(triplet);
                    used[i] = true;
                    used[j] = true;
                    used[k] = true;
                }
            }
        }
    }
    triplets
}

/// Geometric sanity for a candidate triplet: the two legs agree within 20%,
/// the hypotenuse sits within 20% of sqrt(2) times a leg, and the three
/// module-size estimates agree within 50%.
fn is_valid_triplet(t: &FinderTriplet) -> bool {
    let leg_a = t.top_left.distance(&t.top_right);
    let leg_b = t.top_left.distance(&t.bottom_left);
    let hypotenuse = t.bottom_left.distance(&t.top_right);

    if (leg_a - leg_b).abs() > 0.2 * leg_a.max(leg_b) {
        return false;
    }
    let expected = std::f32::consts::SQRT_2 * 0.5 * (leg_a + leg_b);
    if (hypotenuse - expected).abs() > 0.2 * expected {
        return false;
    }

    let sizes = [
        t.bottom_left.module_size,
        t.top_left.module_size,
        t.top_right.module_size,
    ];
    let min = sizes.iter().cloned().fold(f32::MAX, f32::min);
    let max = sizes.iter().cloned().fold(0.0f32, f32::max);
    max <= 1.5 * min
}

/// Assign corner roles to three centers.
fn order_triplet(points: [FinderPattern; 3]) -> FinderTriplet {
    let [p0, p1, p2] = points;
    let d01 = p0.distance(&p1);
    let d12 = p1.distance(&p2);
    let d02 = p0.distance(&p2);

    // The corner off the longest side is the top-left.
    let (mut a, b, mut c) = if d12 >= d01 && d12 >= d02 {
        (p1, p0, p2)
    } else if d02 >= d12 && d02 >= d01 {
        (p0, p1, p2)
    } else {
        (p0, p2, p1)
    };

    // Positively-oriented frame in y-down coordinates.
    if cross_product_z(&a, &b, &c) < 0.0 {
        std::mem::swap(&mut a, &mut c);
    }
    FinderTriplet { bottom_left: a, top_left: b, top_right: c }
}

fn cross_product_z(a: &FinderPattern, b: &FinderPattern, c: &FinderPattern) -> f32 {
    (c.x - b.x) * (a.y - b.y) - (c.y - b.y) * (a.x - b.x)
}

/// Scan every `ROW_SKIP`-th row for 1:1:3:1:1 run windows.
fn scan(matrix: &BitMatrix) -> Vec<FinderPattern> {
    let mut candidates: Vec<FinderPattern> = Vec::new();
    let mut i = ROW_SKIP - 1;
    while i < matrix.height() {
        scan_row(matrix, i, &mut candidates);
        i += ROW_SKIP;
    }
    candidates
}

fn scan_row(matrix: &BitMatrix, i: usize, candidates: &mut Vec<FinderPattern>) {
    let width = matrix.width();
    let row = matrix.row(i);
    let mut counts = [0usize; 5];
    let mut state = 0usize; // even states count dark runs, odd states white

    let mut j = 0;
    while j < width {
        // 32x batched fast paths on aligned uniform words.
        if j & 31 == 0 && j + 32 <= width {
            let word = row[j >> 5];
            let counting_dark = state & 1 == 0;
            if word == u32::MAX && counting_dark && counts[state] > 0 {
                counts[state] += 32;
                j += 32;
                continue;
            }
            if word == 0 {
                if !counting_dark {
                    counts[state] += 32;
                    j += 32;
                    continue;
                }
                if state == 0 && counts[0] == 0 {
                    // Leading whitespace, nothing started yet.
                    j += 32;
                    continue;
                }
            }
        }

        let dark = (row[j >> 5] >> (j & 31)) & 1 != 0;
        if dark {
            if state & 1 == 1 {
                state += 1;
            }
            counts[state] += 1;
        } else if state & 1 == 1 {
            counts[state] += 1;
        } else if state == 4 {
            // Five runs complete; this white pixel ends the window.
            if found_pattern_cross(&counts)
                && handle_possible_center(matrix, &counts, i, j, candidates)
            {
                counts = [0; 5];
                state = 0;
            } else {
                shift_window(&mut counts);
                state = 3;
            }
        } else if counts[0] > 0 || state > 0 {
            state += 1;
            counts[state] += 1;
        }
        j += 1;
    }
    if found_pattern_cross(&counts) {
        handle_possible_center(matrix, &counts, i, width, candidates);
    }
}

/// Drop the first dark/white run pair and keep scanning: the window slides
/// by one run pair, with the current white pixel opening run 3.
fn shift_window(counts: &mut [usize; 5]) {
    counts[0] = counts[2];
    counts[1] = counts[3];
    counts[2] = counts[4];
    counts[3] = 1;
    counts[4] = 0;
}

/// Do five runs look like 1:1:3:1:1? Total must cover at least 7 modules;
/// outer runs stay within m/2 of m and the center within 3m/2 of 3m.
fn found_pattern_cross(counts: &[usize; 5]) -> bool {
    let total: usize = counts.iter().sum();
    if total < 7 || counts.iter().any(|&c| c == 0) {
        return false;
    }
    let module = total as f32 / 7.0;
    let max_variance = module / 2.0;
    for (idx, &count) in counts.iter().enumerate() {
        let expected = if idx == 2 { 3.0 * module } else { module };
        let allowed = if idx == 2 { 3.0 * max_variance } else { max_variance };
        if (expected - count as f32).abs() >= allowed {
            return false;
        }
    }
    true
}

/// Center x of a run window ending at `end`.
fn center_from_end(counts: &[usize; 5], end: usize) -> f32 {
    end as f32 - counts[4] as f32 - counts[3] as f32 - counts[2] as f32 / 2.0
}

/// Vertically confirm a horizontal hit, then add or merge the candidate.
fn handle_possible_center(
    matrix: &BitMatrix,
    counts: &[usize; 5],
    i: usize,
    j: usize,
    candidates: &mut Vec<FinderPattern>,
) -> bool {
    let total: usize = counts.iter().sum();
    let center_x = center_from_end(counts, j);
    let Some(center_y) = cross_check_vertical(matrix, i, center_x as usize, counts[2], total)
    else {
        return false;
    };
    let module_size = total as f32 / 7.0;

    for candidate in candidates.iter_mut() {
        if candidate.near(center_x, center_y) {
            candidate.merge(center_x, center_y, module_size);
            return true;
        }
    }
    candidates.push(FinderPattern { x: center_x, y: center_y, module_size, count: 1 });
    true
}

/// Walk up and down from the candidate center expecting the same
/// black-white-black-white-black bands. `max_count` bounds the outer bands;
/// the total may differ from the horizontal total by less than 40%.
fn cross_check_vertical(
    matrix: &BitMatrix,
    start_i: usize,
    center_x: usize,
    max_count: usize,
    original_total: usize,
) -> Option<f32> {
    if center_x >= matrix.width() {
        return None;
    }
    let height = matrix.height();
    let mut cc = [0usize; 5];

    let mut i = start_i as isize;
    while i >= 0 && matrix.get(center_x, i as usize) {
        cc[2] += 1;
        i -= 1;
    }
    if i < 0 {
        return None;
    }
    while i >= 0 && !matrix.get(center_x, i as usize) && cc[1] <= max_count {
        cc[1] += 1;
        i -= 1;
    }
    if i < 0 || cc[1] > max_count {
        return None;
    }
    while i >= 0 && matrix.get(center_x, i as usize) && cc[0] <= max_count {
        cc[0] += 1;
        i -= 1;
    }
    if cc[0] > max_count {
        return None;
    }

    let mut i = start_i + 1;
    while i < height && matrix.get(center_x, i) {
        cc[2] += 1;
        i += 1;
    }
    if i == height {
        return None;
    }
    while i < height && !matrix.get(center_x, i) && cc[3] <= max_count {
        cc[3] += 1;
        i += 1;
    }
    if i == height || cc[3] > max_count {
        return None;
    }
    while i < height && matrix.get(center_x, i) && cc[4] <= max_count {
        cc[4] += 1;
        i += 1;
    }
    if cc[4] > max_count {
        return None;
    }

    let total: usize = cc.iter().sum();
    if 5 * total.abs_diff(original_total) >= 2 * original_total {
        return None;
    }
    if found_pattern_cross(&cc) {
        Some(center_from_end(&cc, i))
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
