// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use env_logger;
use image::{ImageReader, Rgb, RgbImage};
use imageproc::drawing;
use log::{info, warn};

use star_match::algorithm::{detect_stars, Star};
use star_match::histogram_funcs::suggest_threshold;
use star_match::matcher::{match_stars, validate_params, Correspondence, MatchParams};
use star_match::transform::{best_transform, DEFAULT_INLIER_TOLERANCE};

/// Example program for detecting the stars of two images and matching them
/// to each other.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Path of the first image.
    #[arg(long)]
    image1: String,

    /// Path of the second image.
    #[arg(long)]
    image2: String,

    /// Directory where annotated copies of the images are written.
    #[arg(short, long)]
    output: String,

    /// Brightness above which pixels are part of a star. If omitted, a
    /// threshold is derived from each image's background using `sigma`.
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Statistical significance factor for the derived threshold.
    #[arg(short, long, default_value_t = 5.0)]
    sigma: f64,

    /// Number of grid cells along each image axis.
    #[arg(short, long, default_value_t = 29)]
    grid_size: usize,

    /// Shape tolerance, in pixels, for matching features.
    #[arg(long, default_value_t = 0.245)]
    tolerance: f64,

    /// Minimum feature angle, in radians.
    #[arg(long, default_value_t = 0.1)]
    min_angle: f64,

    /// If given, stars no brighter than this are left out of matching.
    #[arg(long)]
    min_brightness: Option<f64>,

    /// Pixel distance within which a star pair agrees with a candidate
    /// transform.
    #[arg(long, default_value_t = DEFAULT_INLIER_TOLERANCE)]
    inlier_tolerance: f64,

    /// Output list of star centroids.
    #[arg(short, long, default_value_t = false)]
    coords: std::primitive::bool,
}

// Line colors, cycled through by correspondence.
const PALETTE: [[u8; 3]; 8] = [
    [255, 64, 64], [64, 255, 64], [64, 128, 255], [255, 255, 64],
    [255, 64, 255], [64, 255, 255], [255, 160, 32], [160, 96, 255],
];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let output_metadata = fs::metadata(&args.output).map_err(|e| {
        format!("Output dir '{}' does not exist? {:?}", args.output, e)
    })?;
    if !output_metadata.is_dir() {
        return Err(format!("Output '{}' must be a directory", args.output).into());
    }

    let img1 = load_image(&args.image1)?;
    let img2 = load_image(&args.image2)?;
    let stars1 = find_stars(&args.image1, &img1, &args);
    let stars2 = find_stars(&args.image2, &img2, &args);

    let params = MatchParams{grid_size: args.grid_size,
                             tolerance: args.tolerance,
                             min_feature_angle: args.min_angle,
                             min_brightness: args.min_brightness};
    validate_params(&params, img1.dimensions(), img2.dimensions())?;
    let match_start = Instant::now();
    let correspondences = match_stars(&stars1, img1.dimensions(),
                                      &stars2, img2.dimensions(), &params);
    info!("Matching found {} correspondences in {:?}",
          correspondences.len(), match_start.elapsed());
    match best_transform(&correspondences, args.inlier_tolerance) {
        Some(fit) => {
            let transform = fit.transform;
            info!("Best transform: scale {:.4} rotation {:.2} deg \
                   translation ({:.1}, {:.1}){}; {} of {} star pairs agree, \
                   residual {:.3} pixels",
                  transform.scale, transform.rotation.to_degrees(),
                  transform.translation_x, transform.translation_y,
                  if transform.reflected { " reflected" } else { "" },
                  fit.inliers, fit.pairs, fit.residual);
        },
        None => warn!("No correspondences; cannot estimate a transform"),
    }

    let first_features: Vec<[Star; 4]> =
        correspondences.iter().map(|c| c.first.stars()).collect();
    let second_features: Vec<[Star; 4]> =
        correspondences.iter().map(|c| c.second.stars()).collect();
    save_annotated(img1, &stars1, &first_features,
                   output_path(&args.output, &args.image1, "1")?)?;
    save_annotated(img2, &stars2, &second_features,
                   output_path(&args.output, &args.image2, "2")?)?;
    if args.coords {
        log_correspondences(&correspondences);
    }
    Ok(())
}

fn load_image(file: &str) -> Result<RgbImage, Box<dyn Error>> {
    info!("Loading {}", file);
    let img = ImageReader::open(file)?.decode().map_err(|e| {
        warn!("Could not decode {}: {:?}", file, e);
        e
    })?;
    Ok(img.into_rgb8())
}

fn find_stars(file: &str, img: &RgbImage, args: &Args) -> Vec<Star> {
    let (width, height) = img.dimensions();
    let detect_start = Instant::now();
    let threshold = match args.threshold {
        Some(threshold) => threshold,
        None => suggest_threshold(img, args.sigma),
    };
    let stars = detect_stars(img, threshold);
    let elapsed = detect_start.elapsed();
    info!("{}: WxH {}x{}; threshold {:.1}", file, width, height, threshold);
    info!("Star detection found {} stars in {:?}", stars.len(), elapsed);
    if args.coords {
        let mut coords_str = String::new();
        coords_str.push_str(format!("# {} WxH {}x{}\n", file, width, height).as_str());
        coords_str.push_str("# (x, y, radius, brightness)\n");
        for star in &stars {
            coords_str.push_str(format!(
                "({:.2}, {:.2}, {:.2}, {:.1}),\n", star.centroid_x, star.centroid_y,
                star.radius, star.brightness).as_str());
        }
        info!("{}", coords_str);
    }
    stars
}

// <output dir>/<input file stem>_<tag>.bmp
fn output_path(output_dir: &str, input: &str, tag: &str)
               -> Result<PathBuf, Box<dyn Error>> {
    let stem = Path::new(input).file_stem()
        .ok_or_else(|| format!("No file name in '{}'", input))?;
    let mut output_path = PathBuf::from(output_dir);
    output_path.push(format!("{}_{}", stem.to_string_lossy(), tag));
    output_path.set_extension("bmp");
    Ok(output_path)
}

// Circles every star and connects the stars of each matched feature in
// f1, f2, o1, o2 order.
fn save_annotated(mut img: RgbImage, stars: &[Star], features: &[[Star; 4]],
                  output_path: PathBuf) -> Result<(), Box<dyn Error>> {
    for star in stars {
        drawing::draw_hollow_circle_mut(
            &mut img,
            (star.centroid_x as i32, star.centroid_y as i32),
            star.radius as i32 + 2,
            Rgb::<u8>([255, 0, 0]));
    }
    for (index, feature) in features.iter().enumerate() {
        let color = Rgb::<u8>(PALETTE[index % PALETTE.len()]);
        for segment in feature.windows(2) {
            drawing::draw_line_segment_mut(
                &mut img,
                (segment[0].centroid_x as f32, segment[0].centroid_y as f32),
                (segment[1].centroid_x as f32, segment[1].centroid_y as f32),
                color);
        }
    }
    info!("Writing {:?}", output_path);
    img.save(output_path)?;
    Ok(())
}

fn log_correspondences(correspondences: &[Correspondence]) {
    let mut pairs_str = String::new();
    pairs_str.push_str("# (x1, y1) -> (x2, y2)\n");
    for (index, correspondence) in correspondences.iter().enumerate() {
        pairs_str.push_str(format!("# Correspondence {}\n", index).as_str());
        for (a, b) in correspondence.star_pairs() {
            pairs_str.push_str(format!(
                "({:.2}, {:.2}) -> ({:.2}, {:.2}),\n",
                a.centroid_x, a.centroid_y, b.centroid_x, b.centroid_y).as_str());
        }
    }
    info!("{}", pairs_str);
}
