// SPDX-License-Identifier: MIT
//! # stitch-featurematch: Corner-Tracking Seam Corrector
//!
//! Per overlap region between two adjacent cameras, this crate detects
//! strong corners in the left-camera crop, tracks them into the
//! right-camera crop with Lucas-Kanade optical flow, and derives the
//! per-side scale-factor corrections the geomap remapper applies on the
//! *next* frame (§4.D). Transient drops below `min_corners` are recoverable:
//! the matcher leaves the previous frame's offset untouched and logs a
//! warning rather than failing the call.
//!
//! ## Architecture
//!
//! - [`corners`]: Shi-Tomasi-style corner detection
//! - [`optical_flow`]: single-level Lucas-Kanade tracking
//! - This module: per-pair state, outlier rejection, and the offset → scale
//!   factor conversion

pub mod corners;
pub mod optical_flow;

use stitch_geomap::{Frame, Rect, ScaleFactor};

/// Tuning knobs for the matcher (§4.D).
#[derive(Clone, Copy, Debug)]
pub struct FmConfig {
    pub stitch_min_width: u32,
    pub min_corners: usize,
    /// Exponential-smoothing weight applied to the new offset each frame.
    pub offset_factor: f32,
    /// Maximum allowed per-point deviation from the previous frame's mean
    /// offset before a tracked point is dropped as an outlier.
    pub delta_mean_offset: f32,
    pub recur_offset_error: f32,
    /// Maximum per-frame change applied to the smoothed offset.
    pub max_adjusted_offset: f32,
    pub max_valid_offset_y: f32,
    pub max_track_error: f32,
}

impl Default for FmConfig {
    fn default() -> Self {
        Self {
            stitch_min_width: 64,
            min_corners: 8,
            offset_factor: 0.5,
            delta_mean_offset: 8.0,
            recur_offset_error: 2.0,
            max_adjusted_offset: 4.0,
            max_valid_offset_y: 8.0,
            max_track_error: 28.0,
        }
    }
}

/// The crop rectangles (within each tile's own coordinate space) a pair's
/// corner search and tracking are restricted to (§4.D step 1).
#[derive(Clone, Copy, Debug)]
pub struct PairCrop {
    pub left_crop: Rect,
    pub right_crop: Rect,
}

/// The panorama-space slice centers and overlap center feeding the offset →
/// scale-factor conversion (§4.D step 6).
#[derive(Clone, Copy, Debug)]
pub struct PairCenters {
    pub left_slice_center_x: f32,
    pub right_slice_center_x: f32,
    pub overlap_center_x: f32,
}

/// Per-frame result of matching one overlap pair.
#[derive(Clone, Copy, Debug)]
pub struct FmOutcome {
    pub left_offset_x: f32,
    pub right_offset_x: f32,
    pub retained_points: usize,
    /// Scale-factor corrections to multiply into the remapper state of
    /// camera `i`'s right half and camera `i+1`'s left half, respectively.
    /// `None` when the pair was skipped (retained points below
    /// `min_corners`) — factors are left unchanged by the caller.
    pub correction: Option<(ScaleFactor, ScaleFactor)>,
}

#[derive(Clone, Copy, Debug, Default)]
struct PairState {
    prev_offset_x: f32,
}

/// Owns per-pair smoothing state across frames.
pub struct FeatureMatcher {
    config: FmConfig,
    pairs: Vec<PairState>,
}

impl FeatureMatcher {
    pub fn new(config: FmConfig, pair_count: usize) -> Self {
        Self {
            config,
            pairs: vec![PairState::default(); pair_count],
        }
    }

    /// Runs the full match-and-correct algorithm for one overlap pair
    /// against the current frame's remapped left/right tiles (§4.D steps
    /// 1–7).
    pub fn feature_match(
        &mut self,
        pair_index: usize,
        left_tile: &Frame,
        right_tile: &Frame,
        crop: PairCrop,
        centers: PairCenters,
    ) -> FmOutcome {
        let state = &mut self.pairs[pair_index];

        let left_full = left_tile.luma_view();
        let right_full = right_tile.luma_view();
        let left_view = left_full.sub(crop.left_crop.x, crop.left_crop.y, crop.left_crop.width, crop.left_crop.height);
        let right_view = right_full.sub(
            crop.right_crop.x,
            crop.right_crop.y,
            crop.right_crop.width,
            crop.right_crop.height,
        );

        if crop.left_crop.width < self.config.stitch_min_width {
            tracing::warn!(pair_index, "overlap crop narrower than stitch_min_width, skipping");
            return FmOutcome {
                left_offset_x: state.prev_offset_x,
                right_offset_x: state.prev_offset_x,
                retained_points: 0,
                correction: None,
            };
        }

        let found = corners::good_features_to_track(
            &left_view,
            crop.left_crop.width,
            crop.left_crop.height,
            self.config.min_corners * 4,
        );
        if found.len() < self.config.min_corners {
            tracing::warn!(
                pair_index,
                found = found.len(),
                min = self.config.min_corners,
                "too few corners found, leaving factors unchanged"
            );
            return FmOutcome {
                left_offset_x: state.prev_offset_x,
                right_offset_x: state.prev_offset_x,
                retained_points: 0,
                correction: None,
            };
        }

        let tracked = optical_flow::track(&left_view, &right_view, &found);

        let retained: Vec<f32> = tracked
            .iter()
            .filter(|t| t.track_error <= self.config.max_track_error)
            .filter(|t| t.dy.abs() <= self.config.max_valid_offset_y)
            .filter(|t| (t.dx - state.prev_offset_x).abs() <= self.config.delta_mean_offset)
            .map(|t| t.dx)
            .collect();

        if retained.len() < self.config.min_corners {
            tracing::warn!(
                pair_index,
                retained = retained.len(),
                min = self.config.min_corners,
                "too few points survived outlier rejection"
            );
            return FmOutcome {
                left_offset_x: state.prev_offset_x,
                right_offset_x: state.prev_offset_x,
                retained_points: retained.len(),
                correction: None,
            };
        }

        let median_dx = median(&retained);
        let raw_offset =
            self.config.offset_factor * median_dx + (1.0 - self.config.offset_factor) * state.prev_offset_x;
        let step = (raw_offset - state.prev_offset_x).clamp(-self.config.max_adjusted_offset, self.config.max_adjusted_offset);
        let offset_x = state.prev_offset_x + step;
        state.prev_offset_x = offset_x;

        let range_right = centers.overlap_center_x - centers.left_slice_center_x;
        let range_left = centers.right_slice_center_x - centers.overlap_center_x;

        let right_factor_x = if range_right.abs() > 1e-3 {
            (range_right + offset_x / 2.0) / range_right
        } else {
            1.0
        };
        let left_factor_x = if range_left.abs() > 1e-3 {
            (range_left + offset_x / 2.0) / range_left
        } else {
            1.0
        };

        FmOutcome {
            left_offset_x: offset_x,
            right_offset_x: offset_x,
            retained_points: retained.len(),
            correction: Some((
                ScaleFactor { x: right_factor_x, y: 1.0 },
                ScaleFactor { x: left_factor_x, y: 1.0 },
            )),
        }
    }
}

fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
