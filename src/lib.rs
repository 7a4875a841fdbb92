// Copyright (c) 2025 Steven Rosenthal smr@dt3.org
// See LICENSE file in root directory for license terms.

//! StarMatch finds stars in a pair of sky images and identifies which stars of
//! the first image correspond to which stars of the second.
//!
//! # Overview
//!
//! The work is done in two stages:
//!
//! * [algorithm::detect_stars()] thresholds an image's brightness and reports
//!   each sufficiently large connected blob of bright pixels as a [Star] with
//!   its centroid, disk-equivalent radius and mean brightness. If you don't
//!   have a threshold in mind, [histogram_funcs::suggest_threshold()] proposes
//!   one from the image's background level and noise.
//! * [matcher::match_stars()] groups each image's stars into 4-star
//!   [Feature](feature::Feature)s whose shape is described by distances that
//!   survive translation and uniform scaling, and pairs up features of the two
//!   images with the same shape. A [spatial grid](grid::SpatialGrid) limits
//!   features to stars that are near each other.
//!
//! Each resulting [Correspondence](matcher::Correspondence) names four star
//! pairs; [transform::best_transform()] turns the correspondences into a
//! consensus estimate of the scale, rotation and translation between the
//! images.
//!
//! # Caveats
//!
//! ## Rotation
//!
//! A feature orders its baseline endpoints by x coordinate. When the second
//! image is rotated or mirrored relative to the first such that the x order of
//! a baseline's endpoints is reversed, the feature's description changes and
//! it will usually not be matched. Features with nearly vertical baselines
//! and features that are symmetric about their baseline's bisector are the
//! exception.
//!
//! ## Cost
//!
//! Feature matching compares every feature of the first image with the
//! features of the second, so the time taken grows with the product of the two
//! feature counts. The grid size is the main control: a finer grid yields
//! fewer, more local features.
//!
//! ## Greedy matching
//!
//! A feature of the first image is paired with the first similar feature of
//! the second image that is found, not necessarily the most similar one. In
//! dense star fields with a loose tolerance some correspondences will be
//! wrong. [transform::best_transform()] picks the transform that the most
//! star pairs agree with, so a minority of wrong correspondences does not
//! spoil the estimate. Dropping dim stars with
//! [MatchParams::min_brightness](matcher::MatchParams::min_brightness) cuts
//! both the feature counts and the wrong matches.

pub mod algorithm;
pub mod feature;
pub mod grid;
pub mod histogram_funcs;
pub mod image_funcs;
pub mod matcher;
pub mod transform;

pub use algorithm::Star;
