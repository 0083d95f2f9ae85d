//! # QR Detector Geometry
//!
//! Turns a finder-pattern triplet into a resampled square bit matrix:
//! estimates the module size by walking black-white-black runs between the
//! finder centers, snaps the dimension to a legal QR size, hunts the
//! bottom-right alignment pattern, then resamples the image through a
//! perspective transform.

use crate::common::BitMatrix;
use crate::error::LectoraError;
use crate::qr::finder::{FinderPattern, FinderTriplet};
use crate::qr::perspective::PerspectiveTransform;
use crate::qr::version::Version;

/// A detected, resampled QR symbol.
pub struct Detection {
    /// The `N x N` sampled module grid.
    pub bits: BitMatrix,
    pub top_left: (f32, f32),
    pub top_right: (f32, f32),
    pub bottom_left: (f32, f32),
    /// Alignment pattern center, when one was found.
    pub alignment: Option<(f32, f32)>,
}

/// Resample the symbol described by `triplet` out of `matrix`.
pub fn detect(matrix: &BitMatrix, triplet: &FinderTriplet) -> Result<Detection, LectoraError> {
    let tl = &triplet.top_left;
    let tr = &triplet.top_right;
    let bl = &triplet.bottom_left;

    let module_size = calculate_module_size(matrix, tl, tr, bl);
    if !(module_size >= 1.0) {
        return Err(LectoraError::Detection);
    }
    let dimension = compute_dimension(tl, tr, bl, module_size);
    let version = Version::for_dimension(dimension).map_err(|_| LectoraError::Detection)?;
    log::debug!(
        "detector: module size {module_size:.2}, dimension {dimension} (v{})",
        version.number()
    );

    let mut alignment = None;
    if !version.alignment_centers().is_empty() {
        // Algebraic guess for the bottom-right corner, pulled inward to the
        // alignment-pattern position (3 modules off the corner).
        let br_x = tr.x - tl.x + bl.x;
        let br_y = tr.y - tl.y + bl.y;
        let correction = 1.0 - 3.0 / (dimension as f32 - 7.0);
        let est_x = tl.x + correction * (br_x - tl.x);
        let est_y = tl.y + correction * (br_y - tl.y);
        for allowance_factor in [4.0, 8.0, 16.0] {
            alignment =
                find_alignment_in_region(matrix, module_size, est_x, est_y, allowance_factor);
            if alignment.is_some() {
                break;
            }
        }
        // Not found: the transform falls back to the algebraic guess.
    }

    let transform = create_transform(tl, tr, bl, alignment, dimension);
    let bits = sample_grid(matrix, &transform, dimension);
    Ok(Detection {
        bits,
        top_left: (tl.x, tl.y),
        top_right: (tr.x, tr.y),
        bottom_left: (bl.x, bl.y),
        alignment,
    })
}

/// Map the sampling grid corners onto the located image points. The seventh
/// corner (bottom-right) uses the alignment center at 6.5 modules off the
/// far edges, or the full-corner algebraic guess when no alignment pattern
/// was found.
fn create_transform(
    tl: &FinderPattern,
    tr: &FinderPattern,
    bl: &FinderPattern,
    alignment: Option<(f32, f32)>,
    dimension: usize,
) -> PerspectiveTransform {
    let dim_minus_three = dimension as f32 - 3.5;
    let (br, src_br) = match alignment {
        Some(ap) => (ap, dim_minus_three - 3.0),
        None => ((tr.x - tl.x + bl.x, tr.y - tl.y + bl.y), dim_minus_three),
    };
    PerspectiveTransform::quadrilateral_to_quadrilateral(
        [
            (3.5, 3.5),
            (dim_minus_three, 3.5),
            (src_br, src_br),
            (3.5, dim_minus_three),
        ],
        [(tl.x, tl.y), (tr.x, tr.y), br, (bl.x, bl.y)],
    )
}

/// Probe the image at the transformed center of every module. Out-of-range
/// probes read as white.
fn sample_grid(
    matrix: &BitMatrix,
    transform: &PerspectiveTransform,
    dimension: usize,
) -> BitMatrix {
    let mut bits = BitMatrix::square(dimension);
    let width = matrix.width() as f32;
    let height = matrix.height() as f32;
    let mut points = vec![0.0f32; 2 * dimension];
    for y in 0..dimension {
        for x in 0..dimension {
            points[2 * x] = x as f32 + 0.5;
            points[2 * x + 1] = y as f32 + 0.5;
        }
        transform.transform_points(&mut points);
        for x in 0..dimension {
            let px = points[2 * x];
            let py = points[2 * x + 1];
            if px >= 0.0 && px < width && py >= 0.0 && py < height {
                if matrix.get(px as usize, py as usize) {
                    bits.set(x, y);
                }
            }
        }
    }
    bits
}

/// Average of the two independent edge estimates.
fn calculate_module_size(
    matrix: &BitMatrix,
    tl: &FinderPattern,
    tr: &FinderPattern,
    bl: &FinderPattern,
) -> f32 {
    (module_size_one_way(matrix, tl, tr) + module_size_one_way(matrix, tl, bl)) / 2.0
}

/// Estimate along one edge: black-white-black runs measured from both ends,
/// each covering 3.5 modules past its own finder center in each direction.
fn module_size_one_way(matrix: &BitMatrix, a: &FinderPattern, b: &FinderPattern) -> f32 {
    let forward =
        bwb_run_both_ways(matrix, a.x as i32, a.y as i32, b.x as i32, b.y as i32);
    let backward =
        bwb_run_both_ways(matrix, b.x as i32, b.y as i32, a.x as i32, a.y as i32);
    if forward.is_nan() {
        return backward / 7.0;
    }
    if backward.is_nan() {
        return forward / 7.0;
    }
    (forward + backward) / 14.0
}

fn bwb_run_both_ways(matrix: &BitMatrix, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> f32 {
    let mut result = bwb_run(matrix, from_x, from_y, to_x, to_y);

    // Extend in the opposite direction, clamping to the image and scaling
    // the other coordinate to keep the direction.
    let width = matrix.width() as i32;
    let height = matrix.height() as i32;
    let mut scale = 1.0f32;
    let mut other_to_x = from_x - (to_x - from_x);
    if other_to_x < 0 {
        scale = from_x as f32 / (from_x - other_to_x) as f32;
        other_to_x = 0;
    } else if other_to_x >= width {
        scale = (width - 1 - from_x) as f32 / (other_to_x - from_x) as f32;
        other_to_x = width - 1;
    }
    let mut other_to_y = (from_y as f32 - (to_y - from_y) as f32 * scale) as i32;
    scale = 1.0;
    if other_to_y < 0 {
        scale = from_y as f32 / (from_y - other_to_y) as f32;
        other_to_y = 0;
    } else if other_to_y >= height {
        scale = (height - 1 - from_y) as f32 / (other_to_y - from_y) as f32;
        other_to_y = height - 1;
    }
    let other_to_x = (from_x as f32 + (other_to_x - from_x) as f32 * scale) as i32;

    result += bwb_run(matrix, from_x, from_y, other_to_x, other_to_y);
    result - 1.0 // the center pixel is counted twice
}

/// Bresenham walk counting the distance until a black-white-black transition
/// sequence completes. NaN when the run never completes.
fn bwb_run(matrix: &BitMatrix, from_x: i32, from_y: i32, to_x: i32, to_y: i32) -> f32 {
    let steep = (to_y - from_y).abs() > (to_x - from_x).abs();
    let (mut from_x, mut from_y, to_x, to_y) = if steep {
        (from_y, from_x, to_y, to_x)
    } else {
        (from_x, from_y, to_x, to_y)
    };

    let dx = (to_x - from_x).abs();
    let dy = (to_y - from_y).abs();
    let mut error = -dx / 2;
    let x_step = if from_x < to_x { 1 } else { -1 };
    let y_step = if from_y < to_y { 1 } else { -1 };

    // Count transitions black->white->black.
    let mut state = 0;
    let x_limit = to_x + x_step;
    let mut x = from_x;
    let mut y = from_y;
    while x != x_limit {
        let (real_x, real_y) = if steep { (y, x) } else { (x, y) };
        if real_x >= 0
            && real_y >= 0
            && (real_x as usize) < matrix.width()
            && (real_y as usize) < matrix.height()
        {
            // Scanning black in states 0 and 2, white in state 1; the wrong
            // colour advances the state.
            let dark = matrix.get(real_x as usize, real_y as usize);
            if (state == 1) == dark {
                if state == 2 {
                    return distance(x, y, from_x, from_y);
                }
                state += 1;
            }
        }
        error += dy;
        if error > 0 {
            if y == to_y {
                break;
            }
            y += y_step;
            error -= dx;
        }
        x += x_step;
    }
    if state == 2 {
        // The run was still open at the border; credit it to the edge.
        return distance(to_x + x_step, to_y, from_x, from_y);
    }
    f32::NAN
}

fn distance(ax: i32, ay: i32, bx: i32, by: i32) -> f32 {
    (((ax - bx).pow(2) + (ay - by).pow(2)) as f32).sqrt()
}

fn point_distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

/// Dimension estimate snapped to the nearest legal QR size by the
/// `n mod 4` rule: 0 -> n+1, 1 -> n, 2 -> n-1, 3 -> n+2.
fn compute_dimension(
    tl: &FinderPattern,
    tr: &FinderPattern,
    bl: &FinderPattern,
    module_size: f32,
) -> usize {
    let tltr = (point_distance(tl.x, tl.y, tr.x, tr.y) / module_size).round() as i64;
    let tlbl = (point_distance(tl.x, tl.y, bl.x, bl.y) / module_size).round() as i64;
    let dimension = (tltr + tlbl) / 2 + 7;
    let snapped = match dimension & 3 {
        0 => dimension + 1,
        1 => dimension,
        2 => dimension - 1,
        _ => dimension + 2,
    };
    snapped.max(0) as usize
}

// ----------------------------------------------------------------------------
// Alignment pattern search
// ----------------------------------------------------------------------------

/// Look for the 1:1:1 alignment signature inside a window of
/// `allowance_factor` modules around the estimated center.
fn find_alignment_in_region(
    matrix: &BitMatrix,
    module_size: f32,
    est_x: f32,
    est_y: f32,
    allowance_factor: f32,
) -> Option<(f32, f32)> {
    let allowance = (allowance_factor * module_size) as i32;
    let left = ((est_x as i32) - allowance).max(0);
    let right = ((est_x as i32) + allowance).min(matrix.width() as i32 - 1);
    if ((right - left) as f32) < module_size * 3.0 {
        return None;
    }
    let top = ((est_y as i32) - allowance).max(0);
    let bottom = ((est_y as i32) + allowance).min(matrix.height() as i32 - 1);
    if ((bottom - top) as f32) < module_size * 3.0 {
        return None;
    }
    AlignmentScan {
        matrix,
        start_x: left as usize,
        start_y: top as usize,
        width: (right - left) as usize,
        height: (bottom - top) as usize,
        module_size,
        candidates: Vec::new(),
    }
    .find()
}

#[derive(Clone, Copy)]
struct AlignmentCandidate {
    x: f32,
    y: f32,
    module_size: f32,
}

struct AlignmentScan<'a> {
    matrix: &'a BitMatrix,
    start_x: usize,
    start_y: usize,
    width: usize,
    height: usize,
    module_size: f32,
    candidates: Vec<AlignmentCandidate>,
}

impl AlignmentScan<'_> {
    /// Scan rows middle-out; a center seen twice wins immediately, otherwise
    /// any single sighting is accepted at the end.
    fn find(mut self) -> Option<(f32, f32)> {
        let middle = self.start_y + self.height / 2;
        for i_gen in 0..self.height {
            let offset = (i_gen + 1) / 2;
            let i = if i_gen & 1 == 0 {
                middle + offset
            } else {
                match middle.checked_sub(offset) {
                    Some(i) => i,
                    None => continue,
                }
            };
            if i < self.start_y || i >= self.start_y + self.height || i >= self.matrix.height() {
                continue;
            }
            if let Some(found) = self.scan_row(i) {
                return Some(found);
            }
        }
        self.candidates.first().map(|c| (c.x, c.y))
    }

    fn scan_row(&mut self, i: usize) -> Option<(f32, f32)> {
        let max_j = self.start_x + self.width;
        let mut j = self.start_x;
        // Burn leading white: a run cut off by the region edge has an
        // unknown length.
        while j < max_j && !self.matrix.get(j, i) {
            j += 1;
        }
        let mut counts = [0usize; 3];
        let mut state = 0usize;
        while j < max_j {
            if self.matrix.get(j, i) {
                if state == 1 {
                    counts[1] += 1;
                } else if state == 2 {
                    // Window complete: white-black-white behind us.
                    if self.found_pattern_cross(&counts) {
                        if let Some(found) = self.handle_possible_center(&counts, i, j) {
                            return Some(found);
                        }
                    }
                    counts[0] = counts[2];
                    counts[1] = 1;
                    counts[2] = 0;
                    state = 1;
                } else {
                    state += 1;
                    counts[state] += 1;
                }
            } else {
                if state == 1 {
                    state = 2;
                }
                counts[state] += 1;
            }
            j += 1;
        }
        if self.found_pattern_cross(&counts) {
            if let Some(found) = self.handle_possible_center(&counts, i, max_j) {
                return Some(found);
            }
        }
        None
    }

    /// All three runs within half a module of the expected module size.
    fn found_pattern_cross(&self, counts: &[usize; 3]) -> bool {
        let max_variance = self.module_size / 2.0;
        counts
            .iter()
            .all(|&c| (self.module_size - c as f32).abs() < max_variance)
    }

    fn handle_possible_center(&mut self, counts: &[usize; 3], i: usize, j: usize) -> Option<(f32, f32)> {
        let center_x = j as f32 - counts[2] as f32 - counts[1] as f32 / 2.0;
        let total = counts[0] + counts[1] + counts[2];
        let center_y =
            self.cross_check_vertical(i, center_x as usize, 2 * counts[1], total)?;
        let estimated_module = total as f32 / 3.0;
        for candidate in &mut self.candidates {
            if (candidate.x - center_x).abs() <= candidate.module_size
                && (candidate.y - center_y).abs() <= candidate.module_size
            {
                let size_diff = (candidate.module_size - estimated_module).abs();
                if size_diff <= 1.0 || size_diff <= candidate.module_size {
                    // Second sighting confirms the pattern.
                    return Some((
                        (candidate.x + center_x) / 2.0,
                        (candidate.y + center_y) / 2.0,
                    ));
                }
            }
        }
        self.candidates.push(AlignmentCandidate {
            x: center_x,
            y: center_y,
            module_size: estimated_module,
        });
        None
    }

    fn cross_check_vertical(
        &self,
        start_i: usize,
        center_x: usize,
        max_count: usize,
        original_total: usize,
    ) -> Option<f32> {
        if center_x >= self.matrix.width() {
            return None;
        }
        let matrix = self.matrix;
        let max_i = matrix.height();
        let mut counts = [0usize; 3];

        let mut i = start_i as isize;
        while i >= 0 && matrix.get(center_x, i as usize) && counts[1] <= max_count {
            counts[1] += 1;
            i -= 1;
        }
        if i < 0 || counts[1] > max_count {
            return None;
        }
        while i >= 0 && !matrix.get(center_x, i as usize) && counts[0] <= max_count {
            counts[0] += 1;
            i -= 1;
        }
        if counts[0] > max_count {
            return None;
        }

        let mut i = start_i + 1;
        while i < max_i && matrix.get(center_x, i) && counts[1] <= max_count {
            counts[1] += 1;
            i += 1;
        }
        if i == max_i || counts[1] > max_count {
            return None;
        }
        while i < max_i && !matrix.get(center_x, i) && counts[2] <= max_count {
            counts[2] += 1;
            i += 1;
        }
        if counts[2] > max_count {
            return None;
        }

        let total: usize = counts.iter().sum();
        if 5 * total.abs_diff(original_total) >= 2 * original_total {
            return None;
        }
        if self.found_pattern_cross(&counts) {
            Some(i as f32 - counts[2] as f32 - counts[1] as f32 / 2.0)
        } else {
            None
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(x: f32, y: f32, module_size: f32) -> FinderPattern {
        FinderPattern { x, y, module_size, count: 1 }
    }

    #[test]
    fn test_compute_dimension_snapping() {
        let m = 1.0;
        // Perfect version 1: centers 14 modules apart -> 14 + 7 = 21.
        let tl = pattern(10.0, 10.0, m);
        let tr = pattern(24.0, 10.0, m);
        let bl = pattern(10.0, 24.0, m);
        assert_eq!(compute_dimension(&tl, &tr, &bl, m), 21);

        // One module short (n = 20, mod 4 == 0): snaps up to 21.
        let tr = pattern(23.0, 10.0, m);
        let bl = pattern(10.0, 23.0, m);
        assert_eq!(compute_dimension(&tl, &tr, &bl, m), 21);

        // One over (n = 22, mod 4 == 2): snaps down to 21.
        let tr = pattern(25.0, 10.0, m);
        let bl = pattern(10.0, 25.0, m);
        assert_eq!(compute_dimension(&tl, &tr, &bl, m), 21);

        // n = 23 (mod 4 == 3): snaps up to 25.
        let tr = pattern(26.0, 10.0, m);
        let bl = pattern(10.0, 26.0, m);
        assert_eq!(compute_dimension(&tl, &tr, &bl, m), 25);
    }

    /// Paint one module square.
    fn paint_module(matrix: &mut BitMatrix, mx: usize, my: usize, scale: usize) {
        for dy in 0..scale {
            for dx in 0..scale {
                matrix.set(mx * scale + dx, my * scale + dy);
            }
        }
    }

    /// Paint a full 5x5 alignment pattern centered at module (cx, cy).
    fn paint_alignment(matrix: &mut BitMatrix, cx: usize, cy: usize, scale: usize) {
        for my in cy - 2..=cy + 2 {
            for mx in cx - 2..=cx + 2 {
                let ring = mx.abs_diff(cx) == 2 || my.abs_diff(cy) == 2;
                let center = mx == cx && my == cy;
                if ring || center {
                    paint_module(matrix, mx, my, scale);
                }
            }
        }
    }

    #[test]
    fn test_alignment_pattern_found_in_region() {
        let scale = 6;
        let mut m = BitMatrix::new(40 * scale, 40 * scale);
        paint_alignment(&mut m, 20, 20, scale);
        let expected = 20.0 * scale as f32 + scale as f32 / 2.0;
        let found = find_alignment_in_region(
            &m,
            scale as f32,
            expected + 4.0, // estimate a little off
            expected - 3.0,
            4.0,
        )
        .expect("alignment pattern not found");
        assert!((found.0 - expected).abs() <= 2.0, "x = {}", found.0);
        assert!((found.1 - expected).abs() <= 2.0, "y = {}", found.1);
    }

    #[test]
    fn test_alignment_absent_returns_none() {
        let m = BitMatrix::new(120, 120);
        assert!(find_alignment_in_region(&m, 4.0, 60.0, 60.0, 4.0).is_none());
    }

    #[test]
    fn test_bwb_run_measures_module_transitions() {
        // Finder-like stripe: 12 px black, 6 white, 6 black along a row.
        let mut m = BitMatrix::new(120, 20);
        for x in 30..42 {
            for y in 0..20 {
                m.set(x, y);
            }
        }
        for x in 48..54 {
            for y in 0..20 {
                m.set(x, y);
            }
        }
        // From inside the first black band heading right: the run completes
        // where the second black band ends, at x = 54.
        let run = bwb_run(&m, 36, 10, 100, 10);
        assert!((run - 18.0).abs() <= 1.0, "run = {run}");
    }
}
