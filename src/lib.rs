// SPDX-License-Identifier: MIT
//! # stitcher: 360° Multi-Camera Fisheye Image Stitcher
//!
//! Combines `N` fisheye camera frames into one panorama per call: each
//! camera's frame is dewarped onto a shared panorama geometry
//! (`stitch-geomap`), adjacent cameras' overlap regions are corrected with
//! corner tracking (`stitch-featurematch`) and seam-blended with a Laplacian
//! pyramid, and the untouched remainder is copied through unchanged (§4).
//!
//! ## Architecture
//!
//! - [`config`]: `StitcherConfig` and the mode tags it accepts
//! - [`calibration`]: intrinsic/extrinsic/combined/JSON calibration file parsing
//! - [`blend`]: the pyramid blender
//! - [`copy_task`]: the non-overlap copy task
//! - [`orchestrator`]: `Stitcher`, the top-level entry point
//! - [`core`]: buffer pooling and the per-frame work counter
//! - [`error`]: `StitchError` and its classification traits
//!
//! The geometry (dewarp table generation, bilinear remapping) and
//! feature-match seam correction live in the sibling `stitch-geomap` and
//! `stitch-featurematch` crates.

pub mod blend;
pub mod calibration;
pub mod config;
pub mod copy_task;
pub mod core;
pub mod error;
pub mod orchestrator;

pub use config::{DewarpMode, FmMode, ScaleMode, StitchInfo, StitcherConfig};
pub use error::{ErrorContext, ErrorSeverity, Recoverable, Retryable, StitchError};
pub use orchestrator::{StitchOutcome, StitchStats, Stitcher};

pub use stitch_featurematch::FmConfig;
pub use stitch_geomap::{
    align_up, BowlConfig, CameraInfo, CopyArea, Extrinsic, Frame, Intrinsic, OverlapInfo, PixelFormat, Rect,
    RoundViewSlice,
};
pub use stitch_geomap::presets::{ResolutionBundle, ResolutionMode};
