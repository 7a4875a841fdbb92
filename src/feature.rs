// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Geometric descriptor of four stars.
//!
//! Of the four stars, the two farthest apart form the "baseline" (`f1`, `f2`);
//! the other two (`o1`, `o2`) are described by their distances to the
//! baseline endpoints. These distances are translation invariant, and after
//! multiplying by the ratio of two features' baseline lengths they can be
//! compared across images taken at different scales.
//!
//! Canonicalization is partial: the baseline endpoints are ordered by x
//! (`f1` is the leftmost), which normalizes the left/right assignment of the
//! baseline but does not make the descriptor invariant to arbitrary rotation
//! or reflection. A rotation that reverses the x order of the baseline
//! endpoints exchanges the roles of `f1` and `f2` and generally changes the
//! descriptor.

use std::f64::consts::PI;

use crate::algorithm::Star;

/// Features whose angle (see [Feature::angle]) is below this are rejected by
/// default. Nearly collinear star arrangements are unstable under centroid
/// noise and discriminate poorly.
pub const DEFAULT_MIN_FEATURE_ANGLE: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Feature {
    /// Baseline endpoints, with `f1.centroid_x <= f2.centroid_x`.
    pub f1: Star,
    pub f2: Star,

    /// Distance from `f1` to `f2`. No other pair of the feature's four stars is
    /// farther apart.
    pub baseline: f64,

    /// Distances from `o1` to `f1` and `f2`.
    pub d1: [f64; 2],

    /// Distances from `o2` to `f1` and `f2`.
    pub d2: [f64; 2],

    /// The non-baseline stars, with `o1` no farther from `f1` than `o2` is.
    pub o1: Star,
    pub o2: Star,

    /// Angle in radians at `f1` between the directions towards `o1` and
    /// towards `f2`. It is near zero when `o1` lies close to the baseline;
    /// features are built only when it is at least the minimum angle.
    pub angle: f64,
}

// Angle at `vertex` between the rays towards `a` and towards `b`, in [0, PI].
// NaN if either ray has zero length.
fn angle_at_vertex(vertex: &Star, a: &Star, b: &Star) -> f64 {
    let v1x = a.centroid_x - vertex.centroid_x;
    let v1y = a.centroid_y - vertex.centroid_y;
    let v2x = b.centroid_x - vertex.centroid_x;
    let v2y = b.centroid_y - vertex.centroid_y;

    let dot_product = v1x * v2x + v1y * v2y;
    let magnitude_v1 = (v1x * v1x + v1y * v1y).sqrt();
    let magnitude_v2 = (v2x * v2x + v2y * v2y).sqrt();

    // Clamp absorbs rounding that pushes the cosine just past +/-1. A NaN
    // cosine stays NaN.
    let cos_theta = (dot_product / (magnitude_v1 * magnitude_v2)).clamp(-1.0, 1.0);
    let angle = cos_theta.acos();
    if angle > PI {
        2.0 * PI - angle
    } else {
        angle
    }
}

impl Feature {
    /// Builds the descriptor of `stars`. The order of `stars` only matters for
    /// tie breaking: the first of equally long farthest pairs (in the order
    /// (0,1), (0,2), (0,3), (1,2), (1,3), (2,3)) becomes the baseline.
    ///
    /// Returns None if the arrangement is degenerate: coincident stars, an
    /// angle below `min_angle` (nearly collinear stars), or non-finite
    /// coordinates.
    pub fn from_stars(stars: [&Star; 4], min_angle: f64) -> Option<Feature> {
        if stars.iter().any(|s| !s.centroid_x.is_finite() ||
                                !s.centroid_y.is_finite()) {
            return None;
        }

        // Find the farthest pair.
        let mut baseline = (0, 1);
        let mut max_dist = -1.0;
        for a in 0..4 {
            for b in a + 1..4 {
                let d = stars[a].distance(stars[b]);
                if d > max_dist {
                    max_dist = d;
                    baseline = (a, b);
                }
            }
        }
        let mut others = [0_usize; 2];
        let mut num_others = 0;
        for i in 0..4 {
            if i != baseline.0 && i != baseline.1 {
                others[num_others] = i;
                num_others += 1;
            }
        }

        let mut f1 = stars[baseline.0];
        let mut f2 = stars[baseline.1];
        if f1.centroid_x > f2.centroid_x {
            std::mem::swap(&mut f1, &mut f2);
        }
        let mut o1 = stars[others[0]];
        let mut o2 = stars[others[1]];
        if o2.distance(f1) < o1.distance(f1) {
            std::mem::swap(&mut o1, &mut o2);
        }

        let angle = angle_at_vertex(f1, o1, f2);
        // Negated comparison also rejects NaN.
        if !(angle >= min_angle) {
            return None;
        }

        Some(Feature{f1: *f1, f2: *f2,
                     baseline: max_dist,
                     d1: [o1.distance(f1), o1.distance(f2)],
                     d2: [o2.distance(f1), o2.distance(f2)],
                     o1: *o1, o2: *o2,
                     angle})
    }

    /// The feature's stars in (f1, f2, o1, o2) order.
    pub fn stars(&self) -> [Star; 4] {
        [self.f1, self.f2, self.o1, self.o2]
    }
}

/// Iterator over the 4-element combinations of a slice, each yielded once, in
/// lexicographic order of element index. Combinations are produced one at a
/// time; memory use does not depend on the number of combinations.
pub struct Combinations4<'s, T> {
    items: &'s [T],
    // Indices of the next combination; strictly increasing.
    indices: [usize; 4],
    done: bool,
}

pub fn combinations_of_4<T>(items: &[T]) -> Combinations4<'_, T> {
    Combinations4{items, indices: [0, 1, 2, 3], done: items.len() < 4}
}

impl<'s, T> Iterator for Combinations4<'s, T> {
    type Item = [&'s T; 4];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let n = self.items.len();
        let items = self.items;
        let combination = self.indices.map(|i| &items[i]);

        // Advance the rightmost index that still has room, then reset the
        // indices to its right to consecutive values.
        let mut pos = 4;
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            if self.indices[pos] < n - 4 + pos {
                self.indices[pos] += 1;
                for q in pos + 1..4 {
                    self.indices[q] = self.indices[q - 1] + 1;
                }
                break;
            }
        }
        Some(combination)
    }
}

// mod tests.
