// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::time::Instant;

use log::debug;

use crate::image_funcs::PixelField;

#[derive(Debug)]
pub struct HistogramStats {
    pub mean: f64,
    pub median: usize,
    pub stddev: f64,
}

/// Histogram of the field's brightness values, each rounded to the nearest
/// integer and clamped to 0..=255.
pub fn brightness_histogram<F: PixelField>(field: &F) -> [u32; 256] {
    let mut histogram = [0_u32; 256];
    let (width, height) = field.dimensions();
    for y in 0..height {
        for x in 0..width {
            let bin = field.brightness(x, y).round().clamp(0.0, 255.0) as usize;
            histogram[bin] += 1;
        }
    }
    histogram
}

pub fn stats_for_histogram(histogram: &[u32]) -> HistogramStats {
    let count: u64 = histogram.iter().map(|&c| c as u64).sum();
    if count == 0 {
        return HistogramStats{mean: 0.0, median: 0, stddev: 0.0};
    }
    let first_moment: u64 = histogram.iter().enumerate()
        .map(|(h, &c)| h as u64 * c as u64).sum();
    let mean = first_moment as f64 / count as f64;
    let second_moment: f64 = histogram.iter().enumerate()
        .map(|(h, &c)| c as f64 * (h as f64 - mean) * (h as f64 - mean)).sum();
    // Lower median.
    let mut cumulative: u64 = 0;
    let median = histogram.iter().position(|&c| {
        cumulative += c as u64;
        2 * cumulative >= count
    }).unwrap_or(0);
    HistogramStats{mean, median, stddev: (second_moment / count as f64).sqrt()}
}

/// Zeroes the histogram bins attributed to star pixels, assuming the histogram
/// comes from well focused stars on a mostly dark background. Bins at or
/// above `sigma` background standard deviations over the background mean are
/// cleared; what remains approximates the histogram of the sky alone.
///
/// The background statistics are taken after provisionally discarding the
/// brightest tenth of the pixels, so that bright stars do not inflate them.
pub fn remove_stars_from_histogram(histogram: &mut [u32], sigma: f64) {
    let pixel_count: u64 = histogram.iter().map(|&c| c as u64).sum();
    let mut background = histogram.to_vec();
    trim_histogram(&mut background, pixel_count * 9 / 10);
    let stats = stats_for_histogram(&background);
    let star_cutoff = (stats.mean + sigma * f64::max(stats.stddev, 1.0)) as usize;
    for bin in histogram.iter_mut().skip(star_cutoff) {
        *bin = 0;
    }
}

// Removes counts from the bright end until `count_to_keep` remain.
fn trim_histogram(histogram: &mut [u32], count_to_keep: u64) {
    let mut remaining = count_to_keep;
    for bin in histogram.iter_mut() {
        let kept = u64::min(*bin as u64, remaining);
        *bin = kept as u32;
        remaining -= kept;
    }
}

/// Proposes a detection threshold for `field`: the sky background level plus
/// `sigma` times the background noise. Both are measured on the field's
/// brightness histogram after the star pixels have been removed from it. The
/// noise is floored at 1 so that a crushed-to-black background still yields a
/// threshold above it.
///
/// The result is clamped to 0..=254 so that a saturated pixel always exceeds
/// it.
pub fn suggest_threshold<F: PixelField>(field: &F, sigma: f64) -> f64 {
    let threshold_start = Instant::now();
    let mut histogram = brightness_histogram(field);
    remove_stars_from_histogram(&mut histogram, sigma);
    let stats = stats_for_histogram(&histogram);
    let threshold =
        (stats.mean + sigma * f64::max(stats.stddev, 1.0)).clamp(0.0, 254.0);
    debug!("Background mean {:.2} stddev {:.2}; threshold {:.2} found in {:?}",
           stats.mean, stats.stddev, threshold, threshold_start.elapsed());
    threshold
}

// mod tests.
