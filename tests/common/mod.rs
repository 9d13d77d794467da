//! Shared test helpers: synthetic NV12 frame builders and a minimal
//! single/multi-camera `StitcherConfig` factory, used by both the unit and
//! integration suites (§8).

#![allow(dead_code)]

use stitcher::{
    BowlConfig, CameraInfo, Extrinsic, FmConfig, Frame, Intrinsic, StitchInfo, StitcherConfig,
};

/// `Y[y,x] = (x + y) mod 256`, `UV = (128, 128)` everywhere — the exact
/// pattern scenario 1 of §8 specifies.
pub fn gradient_frame(width: u32, height: u32) -> Frame {
    let mut frame = Frame::new_nv12(width, height);
    for y in 0..height {
        for x in 0..width {
            frame.y[(y * width + x) as usize] = ((x + y) % 256) as u8;
        }
    }
    for p in frame.u_or_uv.iter_mut() {
        *p = 128;
    }
    frame
}

/// A uniform frame: `Y = luma`, `UV = (128, 128)`.
pub fn uniform_frame(width: u32, height: u32, luma: u8) -> Frame {
    let mut frame = Frame::new_nv12(width, height);
    frame.y.fill(luma);
    frame.u_or_uv.fill(128);
    frame
}

/// `Y[y,x] = (32*camera_idx + (x+y) mod 32)` — scenario 3's per-camera test
/// pattern.
pub fn camera_pattern_frame(width: u32, height: u32, camera_idx: u32) -> Frame {
    let mut frame = Frame::new_nv12(width, height);
    for y in 0..height {
        for x in 0..width {
            frame.y[(y * width + x) as usize] = (32 * camera_idx + (x + y) % 32) as u8;
        }
    }
    frame.u_or_uv.fill(128);
    frame
}

/// A flat (non-fisheye) lens model wide enough to cover its assigned
/// viewpoint range, used where the exact intrinsic shape doesn't matter.
pub fn flat_camera(width: u32, height: u32) -> CameraInfo {
    CameraInfo {
        intrinsic: Intrinsic {
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            fx: width as f32 / 3.0,
            fy: width as f32 / 3.0,
            fov: 190.0,
            skew: 0.0,
            flip: false,
            width,
            height,
            poly_coeff: vec![0.0, 1.0],
            c: 1.0,
            d: 0.0,
            e: 1.0,
        },
        extrinsic: Extrinsic::default(),
        radius: width.min(height) as f32 / 2.0,
        distort_coeff: [0.0; 4],
    }
}

/// The sample bowl from scenario 3: `{a=6060, b=4388, c=3003.4, wall=1800,
/// ground=3000, angle [0,360]}`.
pub fn sample_bowl() -> BowlConfig {
    BowlConfig {
        a: 6060.0,
        b: 4388.0,
        c: 3003.4,
        angle_start: 0.0,
        angle_end: 360.0,
        center_z: 0.0,
        wall_height: 1800.0,
        ground_length: 3000.0,
    }
}

/// Builds a fully-configured single-camera sphere config: `N=1`, FM off,
/// blend off (1 level), `std_output_size == output_size == in.size`.
pub fn single_camera_config(size: (u32, u32)) -> StitcherConfig {
    let mut cfg = StitcherConfig::new();
    cfg.set_camera_num(1).unwrap();
    cfg.set_output_size(size.0, size.1).unwrap();
    cfg.set_viewpoints_range(vec![360.0]).unwrap();
    cfg.set_stitch_info(StitchInfo { merge_widths: vec![0], fm_config: FmConfig::default() }).unwrap();
    cfg.set_camera_info(0, flat_camera(size.0, size.1)).unwrap();
    cfg
}

/// Builds a fully-configured two-camera sphere config: `N=2`, FM off.
pub fn two_camera_config(output_size: (u32, u32), camera_size: (u32, u32), merge_width: u32) -> StitcherConfig {
    let mut cfg = StitcherConfig::new();
    cfg.set_camera_num(2).unwrap();
    cfg.set_output_size(output_size.0, output_size.1).unwrap();
    cfg.set_viewpoints_range(vec![202.8, 202.8]).unwrap();
    cfg.set_stitch_info(StitchInfo { merge_widths: vec![merge_width, merge_width], fm_config: FmConfig::default() })
        .unwrap();
    cfg.set_camera_info(0, flat_camera(camera_size.0, camera_size.1)).unwrap();
    cfg.set_camera_info(1, flat_camera(camera_size.0, camera_size.1)).unwrap();
    cfg
}
