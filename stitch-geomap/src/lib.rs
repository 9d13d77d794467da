// SPDX-License-Identifier: MIT
//! # stitch-geomap: Fisheye Dewarp Tables and Bilinear Geomap Remapping
//!
//! This crate provides the geometry half of the stitcher core: per-camera
//! dewarp table generation for sphere and bowl projections, the image-view
//! primitives bilinear sampling is built on, and the geomap remapper that
//! applies a table with a dynamic per-half scale factor.
//!
//! ## Key Components
//!
//! - [`image_view`]: typed, bordered 2-D pixel views over NV12 frames
//! - [`dewarp`]: sphere and bowl dewarp table generators
//! - [`remap`]: the `GeoMapper` that applies a table to remap one camera's
//!   frame into a panorama tile
//! - [`geometry`]: shared calibration and rectangle types
//! - [`slices`]: round-view slice layout, overlap, and copy-area derivation
//! - [`presets`]: resolution-mode sugar bundles

pub mod dewarp;
pub mod geometry;
pub mod image_view;
pub mod presets;
pub mod remap;
pub mod slices;

pub use geometry::{
    align_up, BowlConfig, CameraInfo, CopyArea, Extrinsic, Intrinsic, OverlapInfo, Rect,
    RoundViewSlice,
};
pub use image_view::{ChromaView, ChromaViewMut, Frame, PixelFormat, PlaneView, PlaneViewMut};
pub use remap::{GeoMapper, RemapError, ScaleFactor};
