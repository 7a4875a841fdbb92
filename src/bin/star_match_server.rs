// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

use std::net::SocketAddr;
use std::time::Instant;

use clap::Parser;
use env_logger;
use image::{GrayImage, RgbImage};
use log::{debug, info};

use ::star_match::algorithm::{detect_stars, Star};
use ::star_match::feature::{Feature, DEFAULT_MIN_FEATURE_ANGLE};
use ::star_match::histogram_funcs::suggest_threshold;
use ::star_match::image_funcs::{mean_brightness, PixelField};
use ::star_match::matcher::{match_stars_detailed, validate_params, MatchParams};
use ::star_match::transform::{best_transform, DEFAULT_INLIER_TOLERANCE};
use crate::star_match::star_match_server::{StarMatch, StarMatchServer};

use tonic_web::GrpcWebLayer;

pub mod star_match {
    // The string specified here must match the proto package name.
    tonic::include_proto!("star_match");
}

const DEFAULT_SIGMA: f64 = 5.0;

struct MyStarMatch {
    // No server state; pure function calls.
}

fn detect<F: PixelField>(field: &F, threshold: Option<f64>, sigma: f64)
                         -> (Vec<Star>, f64, f64) {
    let threshold = match threshold {
        Some(threshold) => threshold,
        None => suggest_threshold(field, sigma),
    };
    (detect_stars(field, threshold), threshold, mean_brightness(field))
}

fn star_to_proto(star: &Star) -> star_match::Star {
    star_match::Star{x: star.centroid_x,
                     y: star.centroid_y,
                     radius: star.radius,
                     brightness: star.brightness}
}

fn star_from_proto(star: &star_match::Star) -> Star {
    Star{centroid_x: star.x,
         centroid_y: star.y,
         radius: star.radius,
         brightness: star.brightness}
}

fn feature_to_proto(feature: &Feature) -> star_match::Feature {
    star_match::Feature{f1: Some(star_to_proto(&feature.f1)),
                        f2: Some(star_to_proto(&feature.f2)),
                        o1: Some(star_to_proto(&feature.o1)),
                        o2: Some(star_to_proto(&feature.o2)),
                        baseline: feature.baseline,
                        angle: feature.angle}
}

fn validate_dimensions(which: &str, width: i32, height: i32)
                       -> Result<(u32, u32), tonic::Status> {
    if width <= 0 || height <= 0 {
        return Err(tonic::Status::invalid_argument(format!(
            "Invalid {} dimensions {}x{}", which, width, height)));
    }
    Ok((width as u32, height as u32))
}

#[tonic::async_trait]
impl StarMatch for MyStarMatch {
    async fn detect_stars(
        &self, request: tonic::Request<star_match::DetectRequest>)
        -> Result<tonic::Response<star_match::DetectResult>, tonic::Status>
    {
        let rpc_start = Instant::now();
        let req: star_match::DetectRequest = request.into_inner();

        let Some(input_image) = req.input_image else {
            return Err(tonic::Status::invalid_argument(
                "Request 'input_image' field is missing"));
        };
        let (width, height) =
            validate_dimensions("image", input_image.width, input_image.height)?;
        let sigma = req.sigma.unwrap_or(DEFAULT_SIGMA);
        let data_len = input_image.image_data.len();
        let rgb = input_image.rgb;
        let size_mismatch = || tonic::Status::invalid_argument(format!(
            "Image data has {} bytes; wrong size for {}x{} {}",
            data_len, width, height, if rgb { "RGB" } else { "grayscale" }));
        let (stars, threshold, mean) = if rgb {
            let image = RgbImage::from_raw(width, height, input_image.image_data)
                .ok_or_else(size_mismatch)?;
            detect(&image, req.threshold, sigma)
        } else {
            let image = GrayImage::from_raw(width, height, input_image.image_data)
                .ok_or_else(size_mismatch)?;
            detect(&image, req.threshold, sigma)
        };
        debug!("Detected {} stars in {} byte image", stars.len(), data_len);

        let response = star_match::DetectResult{
            stars: stars.iter().map(star_to_proto).collect(),
            threshold,
            mean_brightness: mean,
            algorithm_time: prost_types::Duration::try_from(
                rpc_start.elapsed()).ok(),
        };
        Ok(tonic::Response::new(response))
    }

    async fn match_stars(
        &self, request: tonic::Request<star_match::MatchRequest>)
        -> Result<tonic::Response<star_match::MatchResult>, tonic::Status>
    {
        let rpc_start = Instant::now();
        let req: star_match::MatchRequest = request.into_inner();

        let (width1, height1) =
            validate_dimensions("image 1", req.width1, req.height1)?;
        let (width2, height2) =
            validate_dimensions("image 2", req.width2, req.height2)?;
        if req.grid_size < 1 {
            return Err(tonic::Status::invalid_argument(format!(
                "grid_size must be at least 1, got {}", req.grid_size)));
        }
        let params = MatchParams{
            grid_size: req.grid_size as usize,
            tolerance: req.tolerance,
            min_feature_angle: req.min_feature_angle
                .unwrap_or(DEFAULT_MIN_FEATURE_ANGLE),
            min_brightness: req.min_brightness,
        };
        validate_params(&params, (width1, height1), (width2, height2))
            .map_err(tonic::Status::invalid_argument)?;
        let inlier_tolerance =
            req.inlier_tolerance.unwrap_or(DEFAULT_INLIER_TOLERANCE);
        if !(inlier_tolerance >= 0.0) {
            return Err(tonic::Status::invalid_argument(format!(
                "inlier_tolerance must not be negative, got {}", inlier_tolerance)));
        }

        let stars1: Vec<Star> = req.stars1.iter().map(star_from_proto).collect();
        let stars2: Vec<Star> = req.stars2.iter().map(star_from_proto).collect();
        let summary = match_stars_detailed(&stars1, (width1, height1),
                                           &stars2, (width2, height2), &params);
        let correspondences = summary.correspondences;

        let transform = best_transform(&correspondences, inlier_tolerance).map(|fit| {
            star_match::Transform{scale: fit.transform.scale,
                                  rotation: fit.transform.rotation,
                                  translation_x: fit.transform.translation_x,
                                  translation_y: fit.transform.translation_y,
                                  reflected: fit.transform.reflected,
                                  residual: fit.residual,
                                  inliers: fit.inliers as i32,
                                  pairs: fit.pairs as i32}
        });
        let response = star_match::MatchResult{
            correspondences: correspondences.iter().map(|c| {
                star_match::Correspondence{
                    first: Some(feature_to_proto(&c.first)),
                    second: Some(feature_to_proto(&c.second)),
                }
            }).collect(),
            feature_count1: summary.feature_count1 as i32,
            feature_count2: summary.feature_count2 as i32,
            transform,
            algorithm_time: prost_types::Duration::try_from(
                rpc_start.elapsed()).ok(),
        };
        Ok(tonic::Response::new(response))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about=None)]
struct Args {
    /// Port that the gRPC server listens on.
    #[arg(short, long, default_value_t = 50051)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Listen on any address for the given port.
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("StarMatchServer listening on {}", addr);

    tonic::transport::Server::builder()
        .accept_http1(true)
        .layer(GrpcWebLayer::new())
        .add_service(StarMatchServer::new(MyStarMatch{}))
        .serve(addr)
        .await?;
    Ok(())
}
