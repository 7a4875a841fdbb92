// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::time::Instant;

use log::debug;

use crate::algorithm::Star;
use crate::matcher::Correspondence;

/// Maps image-1 coordinates to image-2 coordinates. A point (x, y) is
/// transformed by:
/// 1. if `reflected`, negating y;
/// 2. scaling by `scale`;
/// 3. rotating counterclockwise (in x-right, y-down image coordinates this
///    appears clockwise) by `rotation` radians;
/// 4. translating by (`translation_x`, `translation_y`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityTransform {
    pub scale: f64,
    pub rotation: f64,
    pub translation_x: f64,
    pub translation_y: f64,
    pub reflected: bool,
}

// Signed area of the parallelogram spanned by b-a and c-a.
fn orientation(a: &Star, b: &Star, c: &Star) -> f64 {
    (b.centroid_x - a.centroid_x) * (c.centroid_y - a.centroid_y) -
        (b.centroid_y - a.centroid_y) * (c.centroid_x - a.centroid_x)
}

impl SimilarityTransform {
    /// Derives the transform that carries `correspondence.first`'s baseline
    /// onto `correspondence.second`'s. The two features have the opposite
    /// handedness when their (f1, f2, o1) triangles wind in opposite
    /// directions; the transform is then `reflected`.
    ///
    /// Returns None if either baseline has zero length.
    pub fn from_correspondence(correspondence: &Correspondence)
                               -> Option<SimilarityTransform> {
        let first = &correspondence.first;
        let second = &correspondence.second;
        let reflected = orientation(&first.f1, &first.f2, &first.o1) *
            orientation(&second.f1, &second.f2, &second.o1) < 0.0;
        let y_sign = if reflected { -1.0 } else { 1.0 };

        let (p1x, p1y) = (first.f1.centroid_x, y_sign * first.f1.centroid_y);
        let (p2x, p2y) = (first.f2.centroid_x, y_sign * first.f2.centroid_y);
        let (ux, uy) = (p2x - p1x, p2y - p1y);
        let (vx, vy) = (second.f2.centroid_x - second.f1.centroid_x,
                        second.f2.centroid_y - second.f1.centroid_y);
        let u_len = ux.hypot(uy);
        let v_len = vx.hypot(vy);
        if !(u_len > 0.0) || !(v_len > 0.0) {
            return None;
        }
        let scale = v_len / u_len;
        let rotation = (ux * vy - uy * vx).atan2(ux * vx + uy * vy);

        // Translation carries the transformed f1 onto its counterpart.
        let (sin, cos) = rotation.sin_cos();
        let translation_x = second.f1.centroid_x - scale * (cos * p1x - sin * p1y);
        let translation_y = second.f1.centroid_y - scale * (sin * p1x + cos * p1y);
        Some(SimilarityTransform{scale, rotation, translation_x, translation_y,
                                 reflected})
    }

    /// Maps the image-1 position (x, y) into image 2.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let y = if self.reflected { -y } else { y };
        let (sin, cos) = self.rotation.sin_cos();
        (self.scale * (cos * x - sin * y) + self.translation_x,
         self.scale * (sin * x + cos * y) + self.translation_y)
    }

    /// Root mean square distance, in image-2 pixels, between the transformed
    /// image-1 stars of `correspondence` and their image-2 counterparts.
    pub fn residual(&self, correspondence: &Correspondence) -> f64 {
        let mut sum_squares = 0.0;
        for (a, b) in correspondence.star_pairs() {
            let (x, y) = self.apply(a.centroid_x, a.centroid_y);
            let dx = x - b.centroid_x;
            let dy = y - b.centroid_y;
            sum_squares += dx * dx + dy * dy;
        }
        (sum_squares / 4.0).sqrt()
    }
}

/// Star pairs whose transformed image-1 star lands within this many image-2
/// pixels of its counterpart count as inliers by default.
pub const DEFAULT_INLIER_TOLERANCE: f64 = 2.0;

/// A candidate transform scored against a set of correspondences.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformFit {
    pub transform: SimilarityTransform,

    /// Star pairs, over all correspondences, that the transform maps within
    /// the inlier tolerance.
    pub inliers: usize,

    /// Total star pairs scored: four per correspondence.
    pub pairs: usize,

    /// RMS distance, in image-2 pixels, over the inlier pairs.
    pub residual: f64,
}

// Inlier count and sum of squared inlier distances of `transform` over all of
// the star pairs of `correspondences`.
fn score(transform: &SimilarityTransform, correspondences: &[Correspondence],
         inlier_tolerance: f64) -> (usize, f64) {
    let tolerance_sq = inlier_tolerance * inlier_tolerance;
    let mut inliers = 0;
    let mut sum_squares = 0.0;
    for correspondence in correspondences {
        for (a, b) in correspondence.star_pairs() {
            let (x, y) = transform.apply(a.centroid_x, a.centroid_y);
            let dist_sq = (x - b.centroid_x).powi(2) + (y - b.centroid_y).powi(2);
            if dist_sq <= tolerance_sq {
                inliers += 1;
                sum_squares += dist_sq;
            }
        }
    }
    (inliers, sum_squares)
}

/// Derives a transform from each of `correspondences` and scores it against
/// the star pairs of all of them. The transform with the most inliers wins;
/// ties go to the lower inlier residual. A wrong correspondence fits itself
/// exactly, but agrees with few others, so consensus outvotes it.
///
/// Returns None if `correspondences` is empty.
pub fn best_transform(correspondences: &[Correspondence], inlier_tolerance: f64)
                      -> Option<TransformFit> {
    let fit_start = Instant::now();
    let mut best: Option<TransformFit> = None;
    for correspondence in correspondences {
        let Some(transform) =
            SimilarityTransform::from_correspondence(correspondence) else {
            continue;
        };
        let (inliers, sum_squares) =
            score(&transform, correspondences, inlier_tolerance);
        let residual = if inliers > 0 {
            (sum_squares / inliers as f64).sqrt()
        } else {
            f64::INFINITY
        };
        let better = match &best {
            None => true,
            Some(b) => inliers > b.inliers ||
                (inliers == b.inliers && residual < b.residual),
        };
        if better {
            best = Some(TransformFit{transform, inliers,
                                     pairs: 4 * correspondences.len(),
                                     residual});
        }
    }
    if let Some(fit) = &best {
        debug!("Best transform {:?}: {} of {} pairs within {} px, residual {:.4}; \
                scored in {:?}", fit.transform, fit.inliers, fit.pairs,
               inlier_tolerance, fit.residual, fit_start.elapsed());
    }
    best
}

// mod tests.
