// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Cross-image matching of 4-star features.
//!
//! Each image's stars are bucketed with a [SpatialGrid]. For every grid cell,
//! all 4-combinations of the stars in the cell's 3x3 neighborhood are turned
//! into [Feature]s; this restricts features to stars that are near each
//! other, so the work grows with local star density rather than as the fourth
//! power of the total star count. Neighborhoods overlap, so a given quadruple
//! can produce several identical features; these are not deduplicated.
//!
//! Matching is greedy: each image-1 feature is paired with the FIRST image-2
//! feature (in enumeration order) that passes [is_similar()], not with the
//! closest one. An image-2 feature can be paired with several image-1
//! features. The comparison is brute force, O(F1 x F2) in the feature counts.

use std::time::Instant;

use log::{debug, info};

use crate::algorithm::Star;
use crate::feature::{combinations_of_4, Feature, DEFAULT_MIN_FEATURE_ANGLE};
use crate::grid::SpatialGrid;

/// Parameters for [match_stars()].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchParams {
    /// Number of grid cells along each image axis. Larger values restrict
    /// features to smaller neighborhoods. Must be at least 1; 1 disables the
    /// restriction.
    pub grid_size: usize,

    /// Absolute tolerance, in image-1 pixels, on each scale-normalized
    /// distance compared by [is_similar()]. Must not be negative.
    pub tolerance: f64,

    /// Minimum angle, in radians, for a feature to be built. See
    /// [Feature::angle].
    pub min_feature_angle: f64,

    /// If given, stars whose brightness is not above this are dropped before
    /// features are built. Dim stars are the least reliably detected in both
    /// images, and the feature count grows steeply with star density.
    pub min_brightness: Option<f64>,
}

impl Default for MatchParams {
    fn default() -> Self {
        MatchParams{grid_size: 10,
                    tolerance: 0.1,
                    min_feature_angle: DEFAULT_MIN_FEATURE_ANGLE,
                    min_brightness: None}
    }
}

/// A feature of image 1 and a feature of image 2 with the same shape. The
/// stars of the two features correspond pairwise; see [star_pairs()](Correspondence::star_pairs).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correspondence {
    pub first: Feature,
    pub second: Feature,
}

impl Correspondence {
    /// (image 1 star, image 2 star) for f1, f2, o1 and o2, in that order.
    pub fn star_pairs(&self) -> [(Star, Star); 4] {
        let first = self.first.stars();
        let second = self.second.stars();
        [(first[0], second[0]), (first[1], second[1]),
         (first[2], second[2]), (first[3], second[3])]
    }
}

/// Tests whether `b`, scaled so that its baseline matches `a`'s, has the
/// same shape as `a`: each of the four star-to-baseline-endpoint distances
/// must agree within `tolerance`.
pub fn is_similar(a: &Feature, b: &Feature, tolerance: f64) -> bool {
    // Features never have a zero-length baseline.
    let scale = a.baseline / b.baseline;
    (a.d1[0] - b.d1[0] * scale).abs() <= tolerance &&
        (a.d1[1] - b.d1[1] * scale).abs() <= tolerance &&
        (a.d2[0] - b.d2[0] * scale).abs() <= tolerance &&
        (a.d2[1] - b.d2[1] * scale).abs() <= tolerance
}

/// Enumerates the features of one image. For each grid cell in row major
/// order, every 4-combination of the stars in the cell's 3x3 neighborhood is
/// passed to [Feature::from_stars()]; the accepted features are returned in
/// that order.
///
/// # Panics
/// If `grid_size` is 0 or either image dimension is 0.
pub fn build_features(stars: &[Star], image_width: u32, image_height: u32,
                      grid_size: usize, min_feature_angle: f64) -> Vec<Feature> {
    let features_start = Instant::now();
    let grid = SpatialGrid::build(stars, image_width, image_height, grid_size);
    let mut features = Vec::<Feature>::new();
    let mut num_combinations = 0;
    for row in 0..grid_size {
        for col in 0..grid_size {
            let local_stars = grid.neighborhood(row, col);
            for combination in combinations_of_4(&local_stars) {
                num_combinations += 1;
                if let Some(feature) = Feature::from_stars(
                    combination.map(|s| *s), min_feature_angle) {
                    features.push(feature);
                }
            }
        }
    }
    debug!("Built {} features from {} combinations of {} stars in {:?}",
           features.len(), num_combinations, stars.len(),
           features_start.elapsed());
    features
}

/// For each feature of `features1`, in order, finds the first feature of
/// `features2` that [is_similar()] to it at `tolerance`. Image-1 features with
/// no similar image-2 feature are skipped.
pub fn match_features(features1: &[Feature], features2: &[Feature],
                      tolerance: f64) -> Vec<Correspondence> {
    let mut correspondences = Vec::<Correspondence>::new();
    // Progress is reported in 10% steps; the comparison can take a while for
    // dense star fields.
    let mut last_reported = 0;
    for (index, first) in features1.iter().enumerate() {
        if let Some(second) =
            features2.iter().find(|b| is_similar(first, b, tolerance)) {
            correspondences.push(Correspondence{first: *first, second: *second});
        }
        let percent = (index + 1) * 100 / features1.len();
        if percent / 10 > last_reported / 10 {
            debug!("Matching {}% done; {} correspondences so far",
                   percent, correspondences.len());
            last_reported = percent;
        }
    }
    correspondences
}

/// Checks `params` and the image dimensions for [match_stars()]. Besides the
/// basic range checks, `grid_size` may not exceed the smallest image
/// dimension; finer grids would have cells smaller than a pixel.
pub fn validate_params(params: &MatchParams,
                       (width1, height1): (u32, u32),
                       (width2, height2): (u32, u32)) -> Result<(), String> {
    if params.grid_size < 1 {
        return Err(format!("grid_size must be at least 1, got {}",
                           params.grid_size));
    }
    if !(params.tolerance >= 0.0) {
        return Err(format!("tolerance must not be negative, got {}",
                           params.tolerance));
    }
    if width1 == 0 || height1 == 0 || width2 == 0 || height2 == 0 {
        return Err(format!("Image dimensions must be positive, got {}x{} and {}x{}",
                           width1, height1, width2, height2));
    }
    let max_grid_size = [width1, height1, width2, height2].into_iter()
        .min().unwrap_or(0) as usize;
    if params.grid_size > max_grid_size {
        return Err(format!("grid_size {} exceeds the smallest image dimension {}",
                           params.grid_size, max_grid_size));
    }
    Ok(())
}

/// Result of [match_stars_detailed()].
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSummary {
    pub correspondences: Vec<Correspondence>,

    /// Number of features built for each image, duplicates included.
    pub feature_count1: usize,
    pub feature_count2: usize,
}

// Stars brighter than `min_brightness`, or all of them.
fn bright_stars(stars: &[Star], min_brightness: Option<f64>) -> Vec<Star> {
    match min_brightness {
        Some(min_brightness) =>
            stars.iter().filter(|s| s.brightness > min_brightness).copied().collect(),
        None => stars.to_vec(),
    }
}

/// Matches the stars of two images.
///
/// # Arguments
///   `stars1`, `stars2` - The stars detected in each image, e.g. by
///   [detect_stars()](crate::algorithm::detect_stars).
///
///   `(width1, height1)`, `(width2, height2)` - Image dimensions, used to lay
///   out each image's grid.
///
///   `params` - See [MatchParams].
///
/// # Returns
/// Vec<[Correspondence]> in image-1 feature enumeration order. Empty if
/// either image has fewer than 4 usable stars or no feature survives.
///
/// # Panics
/// If [validate_params()] rejects `params` or the dimensions.
pub fn match_stars(stars1: &[Star], dimensions1: (u32, u32),
                   stars2: &[Star], dimensions2: (u32, u32),
                   params: &MatchParams) -> Vec<Correspondence> {
    match_stars_detailed(stars1, dimensions1, stars2, dimensions2, params)
        .correspondences
}

/// Like [match_stars()], also reporting the feature counts.
pub fn match_stars_detailed(stars1: &[Star], (width1, height1): (u32, u32),
                            stars2: &[Star], (width2, height2): (u32, u32),
                            params: &MatchParams) -> MatchSummary {
    if let Err(msg) = validate_params(params, (width1, height1),
                                      (width2, height2)) {
        panic!("{}", msg);
    }
    let match_start = Instant::now();
    let stars1 = bright_stars(stars1, params.min_brightness);
    let stars2 = bright_stars(stars2, params.min_brightness);
    if let Some(min_brightness) = params.min_brightness {
        info!("{} and {} stars brighter than {}",
              stars1.len(), stars2.len(), min_brightness);
    }
    if stars1.is_empty() || stars2.is_empty() {
        info!("Nothing to match: {} and {} stars", stars1.len(), stars2.len());
        return MatchSummary{correspondences: Vec::new(),
                            feature_count1: 0, feature_count2: 0};
    }
    let features1 = build_features(&stars1, width1, height1,
                                   params.grid_size, params.min_feature_angle);
    let features2 = build_features(&stars2, width2, height2,
                                   params.grid_size, params.min_feature_angle);
    info!("Built {} features for image 1 and {} for image 2",
          features1.len(), features2.len());
    let correspondences =
        match_features(&features1, &features2, params.tolerance);
    info!("Found {} correspondences in {:?}",
          correspondences.len(), match_start.elapsed());
    MatchSummary{correspondences,
                 feature_count1: features1.len(),
                 feature_count2: features2.len()}
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use approx::assert_abs_diff_eq;
    use image::{GrayImage, Luma};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use super::*;
    use crate::algorithm::detect_stars;

    fn star_at(x: f64, y: f64) -> Star {
        Star{centroid_x: x, centroid_y: y, radius: 2.0, brightness: 180.0}
    }

    fn stars_at(points: &[(f64, f64)]) -> Vec<Star> {
        points.iter().map(|&(x, y)| star_at(x, y)).collect()
    }

    fn feature_of(stars: &[Star]) -> Feature {
        Feature::from_stars([&stars[0], &stars[1], &stars[2], &stars[3]],
                            DEFAULT_MIN_FEATURE_ANGLE).unwrap()
    }

    // Applies x' = scale * x + dx, y' = scale * y + dy.
    fn transformed(stars: &[Star], scale: f64, dx: f64, dy: f64) -> Vec<Star> {
        stars.iter().map(|s| Star{centroid_x: scale * s.centroid_x + dx,
                                  centroid_y: scale * s.centroid_y + dy,
                                  ..*s}).collect()
    }

    // Position key for comparing star sets exactly.
    fn key(star: &Star) -> (u64, u64) {
        (star.centroid_x.to_bits(), star.centroid_y.to_bits())
    }

    // The distinct (image-1 quadruple, image-2 quadruple) pairs.
    fn quadruple_pairs(correspondences: &[Correspondence])
                       -> HashSet<Vec<(u64, u64)>> {
        correspondences.iter().map(|c| {
            c.star_pairs().iter()
                .flat_map(|(a, b)| [key(a), key(b)]).collect()
        }).collect()
    }

    #[test]
    fn test_default_params() {
        let params = MatchParams::default();
        assert_eq!(params.grid_size, 10);
        assert_eq!(params.tolerance, 0.1);
        assert_eq!(params.min_feature_angle, 0.1);
        assert_eq!(params.min_brightness, None);
    }

    #[test]
    fn test_validate_params() {
        let params = MatchParams::default();
        assert!(validate_params(&params, (100, 100), (640, 480)).is_ok());
        // grid_size may equal the smallest dimension.
        let fine = MatchParams{grid_size: 480, ..params};
        assert!(validate_params(&fine, (640, 480), (640, 480)).is_ok());

        let too_fine = MatchParams{grid_size: 481, ..params};
        let msg = validate_params(&too_fine, (640, 480), (640, 480)).unwrap_err();
        assert!(msg.contains("exceeds the smallest image dimension 480"), "{}", msg);
        let huge = MatchParams{grid_size: i32::MAX as usize, ..params};
        assert!(validate_params(&huge, (640, 480), (640, 480)).is_err());

        let zero = MatchParams{grid_size: 0, ..params};
        assert!(validate_params(&zero, (10, 10), (10, 10)).unwrap_err()
                .contains("grid_size must be at least 1"));
        let nan = MatchParams{tolerance: f64::NAN, ..params};
        assert!(validate_params(&nan, (10, 10), (10, 10)).unwrap_err()
                .contains("tolerance must not be negative"));
        assert!(validate_params(&params, (10, 10), (0, 10)).unwrap_err()
                .contains("Image dimensions must be positive"));
    }

    #[test]
    fn test_dim_stars_excluded() {
        let mut stars1 = stars_at(&[(40.0, 40.0), (70.0, 45.0), (50.0, 65.0),
                                    (62.0, 30.0), (55.0, 50.0), (45.0, 55.0)]);
        // The last two are dim.
        stars1[4].brightness = 60.0;
        stars1[5].brightness = 60.0;
        let stars2 = transformed(&stars1, 1.0, 20.0, 10.0);
        let unfiltered = MatchParams{grid_size: 1, tolerance: 1e-6,
                                     ..MatchParams::default()};
        let filtered = MatchParams{min_brightness: Some(100.0), ..unfiltered};

        let all = match_stars_detailed(&stars1, (200, 200), &stars2, (200, 200),
                                       &unfiltered);
        assert_eq!(all.feature_count1, 12);
        assert_eq!(all.feature_count2, 12);

        let bright = match_stars_detailed(&stars1, (200, 200), &stars2, (200, 200),
                                          &filtered);
        assert_eq!(bright.feature_count1, 1);
        assert_eq!(bright.feature_count2, 1);
        assert_eq!(bright.correspondences.len(), 1);
        for (a, b) in bright.correspondences[0].star_pairs() {
            assert!(a.brightness > 100.0 && b.brightness > 100.0);
        }

        // The threshold is exclusive; nothing is left to match.
        let none = MatchParams{min_brightness: Some(180.0), ..unfiltered};
        let empty = match_stars_detailed(&stars1, (200, 200), &stars2, (200, 200),
                                         &none);
        assert!(empty.correspondences.is_empty());
        assert_eq!(empty.feature_count1, 0);
    }

    #[test]
    fn test_is_similar_tolerance() {
        let stars = stars_at(&[(0.0, 0.0), (10.0, 0.0), (3.0, 4.0), (6.0, -5.0)]);
        let a = feature_of(&stars);
        assert!(is_similar(&a, &a, 0.0));

        // Move o1 by 0.05 along the baseline direction.
        let mut moved = stars.clone();
        moved[2].centroid_x += 0.05;
        let b = feature_of(&moved);
        assert!(is_similar(&a, &b, 0.1));
        assert!(!is_similar(&a, &b, 0.01));
    }

    #[test]
    fn test_is_similar_scale_covariance() {
        let stars1 = stars_at(&[(20.0, 20.0), (45.0, 23.0), (28.0, 35.0),
                                (37.0, 11.0)]);
        let stars2 = transformed(&stars1, 1.0, 3.5, -2.0);
        // A slightly distorted copy that is similar only at a loose tolerance.
        let mut distorted = stars2.clone();
        distorted[3].centroid_y += 0.3;
        let a = feature_of(&stars1);
        let b = feature_of(&stars2);
        let c = feature_of(&distorted);
        assert!(is_similar(&a, &b, 1e-9));
        assert!(is_similar(&a, &c, 0.5));
        assert!(!is_similar(&a, &c, 0.1));

        for k in [0.25, 0.8, 1.5, 3.0, 12.0] {
            let bk = feature_of(&transformed(&stars2, k, 0.0, 0.0));
            let ck = feature_of(&transformed(&distorted, k, 0.0, 0.0));
            assert_abs_diff_eq!(bk.baseline, b.baseline * k, epsilon = 1e-9);
            assert!(is_similar(&a, &bk, 1e-9), "k={}", k);
            assert!(is_similar(&a, &ck, 0.5), "k={}", k);
        }
    }

    #[test]
    fn test_build_features_single_cell() {
        let stars = stars_at(&[(10.0, 10.0), (30.0, 12.0), (15.0, 28.0),
                               (27.0, 25.0), (50.0, 40.0)]);
        // 5 choose 4 combinations, none degenerate.
        let features = build_features(&stars, 100, 100, 1,
                                      DEFAULT_MIN_FEATURE_ANGLE);
        assert_eq!(features.len(), 5);
        assert!(build_features(&stars[..3], 100, 100, 1,
                               DEFAULT_MIN_FEATURE_ANGLE).is_empty());
        assert!(build_features(&[], 100, 100, 3,
                               DEFAULT_MIN_FEATURE_ANGLE).is_empty());
    }

    #[test]
    fn test_build_features_skips_collinear() {
        let stars = stars_at(&[(10.0, 10.0), (20.0, 10.0), (30.0, 10.0),
                               (40.0, 10.0)]);
        assert!(build_features(&stars, 100, 100, 1,
                               DEFAULT_MIN_FEATURE_ANGLE).is_empty());
    }

    #[test]
    fn test_build_features_restricted_to_neighborhoods() {
        // Two tight groups of four stars in opposite corners of a 100x100
        // image, with a 10x10 grid. Only within-group quadruples are local.
        let mut points = vec![(2.0, 2.0), (8.0, 3.0), (4.0, 9.0), (9.0, 8.0)];
        points.extend([(92.0, 92.0), (98.0, 93.0), (94.0, 99.0), (99.0, 98.0)]);
        let stars = stars_at(&points);
        let features = build_features(&stars, 100, 100, 10,
                                      DEFAULT_MIN_FEATURE_ANGLE);
        // Each group sits in a corner cell, which lies in the neighborhoods of
        // 4 cells (itself and three neighbors).
        assert_eq!(features.len(), 8);
        for feature in &features {
            let xs: Vec<f64> = feature.stars().iter()
                .map(|s| s.centroid_x).collect();
            assert!(xs.iter().all(|&x| x < 10.0) || xs.iter().all(|&x| x > 90.0));
        }
        // Without the restriction, all 8 choose 4 quadruples are candidates.
        let unrestricted = build_features(&stars, 100, 100, 1,
                                          DEFAULT_MIN_FEATURE_ANGLE);
        assert!(unrestricted.len() > 2);
        assert!(unrestricted.len() <= 70);
    }

    #[test]
    fn test_match_features_takes_first_similar() {
        let base = stars_at(&[(0.0, 0.0), (10.0, 0.0), (3.0, 4.0), (6.0, -5.0)]);
        let a = feature_of(&base);
        let other = feature_of(&stars_at(&[(0.0, 0.0), (10.0, 0.0), (1.0, 6.0),
                                           (8.0, 2.0)]));
        let near = feature_of(&transformed(&base, 2.0, 1.0, 1.0));
        let exact = feature_of(&transformed(&base, 3.0, 0.0, 0.0));
        let correspondences = match_features(&[a, other],
                                             &[other, near, exact], 1e-6);
        // `a` pairs with `near`, the first similar feature, not the later
        // one; `other` pairs with itself.
        assert_eq!(correspondences.len(), 2);
        assert_eq!(correspondences[0].first, a);
        assert_eq!(correspondences[0].second, near);
        assert_eq!(correspondences[1].first, other);
        assert_eq!(correspondences[1].second, other);

        // An image-2 feature can be used more than once.
        let reused = match_features(&[a, a], &[exact], 1e-6);
        assert_eq!(reused.len(), 2);
        assert!(match_features(&[], &[a], 1.0).is_empty());
        assert!(match_features(&[a], &[], 1.0).is_empty());
    }

    #[test]
    fn test_match_translated_and_scaled() {
        let stars1 = stars_at(&[(40.0, 40.0), (70.0, 45.0), (50.0, 65.0),
                                (62.0, 30.0)]);
        let stars2 = transformed(&stars1, 1.5, 50.0, 50.0);
        let params = MatchParams{grid_size: 1, tolerance: 1e-6,
                                 ..MatchParams::default()};
        let correspondences = match_stars(&stars1, (200, 200),
                                          &stars2, (300, 300), &params);
        assert_eq!(correspondences.len(), 1);
        for (a, b) in correspondences[0].star_pairs() {
            assert_abs_diff_eq!(b.centroid_x, 1.5 * a.centroid_x + 50.0,
                                epsilon = 1e-9);
            assert_abs_diff_eq!(b.centroid_y, 1.5 * a.centroid_y + 50.0,
                                epsilon = 1e-9);
        }
    }

    #[test]
    fn test_match_translated_scaled_mirrored() {
        // An isosceles trapezoid, symmetric about the perpendicular bisector
        // of its baseline.
        let stars1 = stars_at(&[(20.0, 30.0), (40.0, 30.0), (26.0, 38.0),
                                (34.0, 38.0)]);
        // Translate by (50, 50), scale by 1.5, then mirror horizontally
        // within a 200 pixel wide image.
        let stars2: Vec<Star> = transformed(&stars1, 1.5, 50.0, 50.0).iter()
            .map(|s| Star{centroid_x: 200.0 - s.centroid_x, ..*s}).collect();
        let params = MatchParams{grid_size: 1, tolerance: 1e-9,
                                 ..MatchParams::default()};
        let correspondences = match_stars(&stars1, (200, 200),
                                          &stars2, (200, 200), &params);
        assert!(!correspondences.is_empty());
        let c = &correspondences[0];
        assert_abs_diff_eq!(c.second.baseline / c.first.baseline, 1.5,
                            epsilon = 1e-12);
        let image2: HashSet<(u64, u64)> = stars2.iter().map(key).collect();
        for (_a, b) in c.star_pairs() {
            assert!(image2.contains(&key(&b)));
        }
    }

    #[test]
    fn test_match_mirrored_vertical_baseline() {
        // With a vertical baseline, mirroring does not reorder f1 and f2, so
        // an asymmetric shape still matches.
        let stars1 = stars_at(&[(60.0, 20.0), (60.0, 50.0), (69.0, 32.0),
                                (45.0, 41.0)]);
        let stars2: Vec<Star> = transformed(&stars1, 1.5, 50.0, 50.0).iter()
            .map(|s| Star{centroid_x: 300.0 - s.centroid_x, ..*s}).collect();
        let params = MatchParams{grid_size: 1, tolerance: 1e-9,
                                 ..MatchParams::default()};
        let correspondences = match_stars(&stars1, (200, 200),
                                          &stars2, (300, 300), &params);
        assert_eq!(correspondences.len(), 1);
        for (a, b) in correspondences[0].star_pairs() {
            assert_abs_diff_eq!(b.centroid_x, 300.0 - (1.5 * a.centroid_x + 50.0),
                                epsilon = 1e-9);
            assert_abs_diff_eq!(b.centroid_y, 1.5 * a.centroid_y + 50.0,
                                epsilon = 1e-9);
        }
    }

    #[test]
    fn test_grid_restriction_matches_single_cell() {
        // All stars fit inside one cell of a 10x10 grid over 500x500 images.
        let stars1 = stars_at(&[(210.0, 310.0), (240.0, 305.0), (222.0, 338.0),
                                (235.0, 322.0), (215.0, 345.0), (248.0, 331.0)]);
        let stars2 = transformed(&stars1, 0.9, 15.0, -20.0);
        let single = MatchParams{grid_size: 1, tolerance: 1e-6,
                                 ..MatchParams::default()};
        let gridded = MatchParams{grid_size: 10, ..single};
        let expected = match_stars(&stars1, (500, 500), &stars2, (500, 500),
                                   &single);
        let actual = match_stars(&stars1, (500, 500), &stars2, (500, 500),
                                 &gridded);
        assert!(!expected.is_empty());
        // The gridded run repeats each feature once per neighborhood that
        // contains the stars' cell, but matches the same quadruples.
        assert!(actual.len() >= expected.len());
        assert_eq!(quadruple_pairs(&actual), quadruple_pairs(&expected));
    }

    #[test]
    fn test_detect_then_match() {
        let corners = [(20, 30), (60, 35), (35, 80), (90, 70), (50, 120),
                       (110, 40)];
        let mut image1 = GrayImage::new(200, 200);
        let mut image2 = GrayImage::new(200, 200);
        for (x, y) in corners {
            draw_filled_rect_mut(&mut image1, Rect::at(x, y).of_size(3, 3),
                                 Luma::<u8>([200]));
            draw_filled_rect_mut(&mut image2, Rect::at(x + 17, y + 9).of_size(3, 3),
                                 Luma::<u8>([200]));
        }
        let stars1 = detect_stars(&image1, 100.0);
        let stars2 = detect_stars(&image2, 100.0);
        assert_eq!(stars1.len(), 6);
        assert_eq!(stars2.len(), 6);

        let params = MatchParams{grid_size: 1, tolerance: 1e-6,
                                 ..MatchParams::default()};
        let correspondences = match_stars(&stars1, (200, 200),
                                          &stars2, (200, 200), &params);
        // One per non-degenerate quadruple.
        assert_eq!(correspondences.len(),
                   build_features(&stars1, 200, 200, 1,
                                  DEFAULT_MIN_FEATURE_ANGLE).len());
        for c in &correspondences {
            for (a, b) in c.star_pairs() {
                assert_abs_diff_eq!(b.centroid_x - a.centroid_x, 17.0,
                                    epsilon = 1e-9);
                assert_abs_diff_eq!(b.centroid_y - a.centroid_y, 9.0,
                                    epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_no_stars_no_correspondences() {
        let stars = stars_at(&[(10.0, 10.0), (30.0, 12.0), (15.0, 28.0),
                               (27.0, 25.0)]);
        let params = MatchParams::default();
        assert!(match_stars(&[], (100, 100), &stars, (100, 100), &params)
                .is_empty());
        assert!(match_stars(&stars, (100, 100), &[], (100, 100), &params)
                .is_empty());
        // Too few stars for a feature.
        assert!(match_stars(&stars[..3], (100, 100), &stars, (100, 100), &params)
                .is_empty());
    }

    #[test]
    #[should_panic(expected = "grid_size must be at least 1")]
    fn test_match_zero_grid_size() {
        let params = MatchParams{grid_size: 0, ..MatchParams::default()};
        let _ = match_stars(&[], (10, 10), &[], (10, 10), &params);
    }

    #[test]
    #[should_panic(expected = "tolerance must not be negative")]
    fn test_match_negative_tolerance() {
        let params = MatchParams{tolerance: -1.0, ..MatchParams::default()};
        let _ = match_stars(&[], (10, 10), &[], (10, 10), &params);
    }

    #[test]
    #[should_panic(expected = "Image dimensions must be positive")]
    fn test_match_zero_dimension() {
        let _ = match_stars(&[], (10, 0), &[], (10, 10), &MatchParams::default());
    }

    #[test]
    #[should_panic(expected = "exceeds the smallest image dimension")]
    fn test_match_grid_finer_than_pixels() {
        let params = MatchParams{grid_size: 50, ..MatchParams::default()};
        let _ = match_stars(&[], (40, 40), &[], (100, 100), &params);
    }
}  // mod tests.
