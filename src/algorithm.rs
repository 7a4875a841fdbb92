// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! Blob detection. Every maximal 4-connected region of pixels brighter than a
//! threshold becomes a candidate; candidates with fewer than
//! [MIN_REGION_PIXELS] pixels are discarded as hot pixels or noise, and the
//! rest are summarized as [Star]s.
//!
//! The scan visits pixels in raster order. When it reaches an above-threshold
//! pixel not yet claimed by a region, it grows that pixel's region with an
//! explicit stack (no recursion, so large saturated areas cannot overflow the
//! call stack). A dense visited map scoped to the call ensures that each pixel
//! is claimed by at most one region.
//!
//! The per-region summaries depend only on which pixels belong to the region,
//! not on the order in which they were reached, so the result is independent
//! of traversal order apart from floating point summation order.

use std::f64::consts::PI;
use std::time::Instant;

use log::{debug, info};

use crate::image_funcs::PixelField;

/// Regions smaller than this are not reported as stars.
pub const MIN_REGION_PIXELS: usize = 3;

/// Summarizes a star-like blob found by [detect_stars()].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Star {
    /// Location of the star centroid in image coordinates: the mean of the
    /// region's pixel coordinates. (0, 0) corresponds to the center of the
    /// image's upper left pixel.
    pub centroid_x: f64,
    pub centroid_y: f64,

    /// Radius of a disk with the same area as the region, in pixels.
    pub radius: f64,

    /// Mean brightness over the region's pixels.
    pub brightness: f64,
}

impl Star {
    /// Euclidean distance between the two centroids.
    pub fn distance(&self, other: &Star) -> f64 {
        let dx = self.centroid_x - other.centroid_x;
        let dy = self.centroid_y - other.centroid_y;
        (dx * dx + dy * dy).sqrt()
    }
}

// Pixels of one connected region, as linear indices (y * width + x), and
// their summed brightness.
struct Region {
    pixels: Vec<usize>,
    brightness_sum: f64,
}

// Claims the region containing `seed` and returns its pixels. `seed` must be
// unvisited and above `threshold`. On return, all of the region's pixels are
// marked in `visited`; `stack` is left empty and may be reused by the caller.
fn grow_region<F: PixelField>(field: &F, threshold: f64, seed: usize,
                              visited: &mut [bool], stack: &mut Vec<usize>)
                              -> Region {
    let (width, height) = field.dimensions();
    let (width, height) = (width as usize, height as usize);
    let mut region = Region{pixels: Vec::new(), brightness_sum: 0.0};

    // A pixel is marked visited when pushed, so it is pushed at most once.
    visited[seed] = true;
    stack.push(seed);
    while let Some(index) = stack.pop() {
        let x = index % width;
        let y = index / width;
        region.pixels.push(index);
        region.brightness_sum += field.brightness(x as u32, y as u32);

        let mut neighbors = [usize::MAX; 4];
        if x > 0 {
            neighbors[0] = index - 1;
        }
        if x + 1 < width {
            neighbors[1] = index + 1;
        }
        if y > 0 {
            neighbors[2] = index - width;
        }
        if y + 1 < height {
            neighbors[3] = index + width;
        }
        for neighbor in neighbors {
            if neighbor == usize::MAX || visited[neighbor] {
                continue;
            }
            let brightness = field.brightness((neighbor % width) as u32,
                                              (neighbor / width) as u32);
            // Negated comparison also excludes NaN.
            if !(brightness > threshold) {
                continue;
            }
            visited[neighbor] = true;
            stack.push(neighbor);
        }
    }
    region
}

// Returns None if the region is too small to be a star.
fn star_from_region(region: &Region, width: usize) -> Option<Star> {
    let area = region.pixels.len();
    if area < MIN_REGION_PIXELS {
        return None;
    }
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for &index in &region.pixels {
        sum_x += (index % width) as f64;
        sum_y += (index / width) as f64;
    }
    let area_f64 = area as f64;
    Some(Star{centroid_x: sum_x / area_f64,
              centroid_y: sum_y / area_f64,
              radius: (area_f64 / PI).sqrt(),
              brightness: region.brightness_sum / area_f64})
}

/// Finds the stars of `field`.
///
/// # Arguments
///   `field` - The image to analyze. All pixels are scanned.
///
///   `threshold` - A pixel belongs to a star region only if its brightness is
///   strictly greater than `threshold`. For 8-bit images this is on the
///   0..255 scale. See [suggest_threshold()](crate::histogram_funcs::suggest_threshold)
///   for a data-driven choice.
///
/// # Returns
/// Vec<[Star]>, one per connected region of at least [MIN_REGION_PIXELS]
/// above-threshold pixels, ordered by the raster position of each region's
/// first scanned pixel. A field with no pixel above `threshold` yields an
/// empty vector.
pub fn detect_stars<F: PixelField>(field: &F, threshold: f64) -> Vec<Star> {
    let detect_start = Instant::now();
    let (width, height) = field.dimensions();
    let (width, height) = (width as usize, height as usize);

    let mut visited = vec![false; width * height];
    let mut stack = Vec::<usize>::new();
    let mut stars = Vec::<Star>::new();
    let mut num_small_regions = 0;
    for y in 0..height {
        for x in 0..width {
            let index = y * width + x;
            if visited[index] {
                continue;
            }
            if !(field.brightness(x as u32, y as u32) > threshold) {
                continue;
            }
            let region = grow_region(field, threshold, index,
                                     &mut visited, &mut stack);
            match star_from_region(&region, width) {
                Some(star) => stars.push(star),
                None => {
                    debug!("Discarding {}-pixel region at row {} col {}",
                           region.pixels.len(), y, x);
                    num_small_regions += 1;
                },
            }
        }
    }
    info!("Found {} stars ({} regions too small) at threshold {} in {:?}",
          stars.len(), num_small_regions, threshold, detect_start.elapsed());
    stars
}

// mod tests.
