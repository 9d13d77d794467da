//! Dedicated coverage for the invariants of §8 not already exercised inline
//! next to their implementation: I1 (output size), I2 (determinism), I4
//! (copy identity, exercised here through `Stitcher` rather than
//! `copy_task::copy` directly), and I7 (feature-match factor boundedness
//! across repeated frames). I3/I6 live in `src/blend.rs`, I5 lives in
//! `stitch-geomap/src/remap.rs`.

use crate::common::{gradient_frame, single_camera_config, two_camera_config, uniform_frame};
use stitcher::{Frame, StitchOutcome, Stitcher};

/// I1: the output frame's declared size always matches `output_size`,
/// regardless of camera count or input size.
#[test]
fn output_size_matches_configured_output_size() {
    for &(out_w, out_h) in &[(256u32, 256u32), (1920, 640), (800, 400)] {
        let cfg = if out_w == out_h {
            single_camera_config((out_w, out_h))
        } else {
            two_camera_config((out_w, out_h), (out_w / 2, out_h), 32)
        };
        let n = cfg.camera_num();
        let mut stitcher = Stitcher::with_config(cfg);
        let input_size = if n == 1 { (out_w, out_h) } else { (out_w / 2, out_h) };
        let inputs: Vec<Frame> = (0..n).map(|_| uniform_frame(input_size.0, input_size.1, 64)).collect();
        let mut output = Frame::new_nv12(out_w, out_h);
        stitcher.stitch_buffers(&inputs, &mut output).unwrap();
        assert_eq!((output.width, output.height), (out_w, out_h));
    }
}

/// I2: stitching the same inputs twice through independent `Stitcher`
/// instances produces byte-identical output.
#[test]
fn stitching_is_deterministic_across_runs() {
    let cfg_a = two_camera_config((512, 256), (512, 256), 32);
    let cfg_b = two_camera_config((512, 256), (512, 256), 32);
    let inputs = vec![gradient_frame(512, 256), gradient_frame(512, 256)];

    let mut stitcher_a = Stitcher::with_config(cfg_a);
    let mut out_a = Frame::new_nv12(512, 256);
    stitcher_a.stitch_buffers(&inputs, &mut out_a).unwrap();

    let mut stitcher_b = Stitcher::with_config(cfg_b);
    let mut out_b = Frame::new_nv12(512, 256);
    stitcher_b.stitch_buffers(&inputs, &mut out_b).unwrap();

    assert_eq!(out_a.y, out_b.y);
    assert_eq!(out_a.u_or_uv, out_b.u_or_uv);
}

/// I4: a camera's non-overlap core region is a byte-for-byte copy of its
/// remapped source tile (`copy_task::copy` itself is exercised directly in
/// `src/copy_task.rs`) — checked here end to end on a single-camera setup
/// where the entire frame is "core" (no overlap at all). The input is
/// uniform rather than a gradient: `copy_task::copy` is a true identity,
/// but the remap stage ahead of it always applies the camera's real
/// fisheye projection (§4.B), so only a constant-valued frame survives
/// that stage unchanged for the equality check below to be meaningful.
#[test]
fn single_camera_core_region_is_an_identity_copy() {
    let cfg = single_camera_config((320, 240));
    let mut stitcher = Stitcher::with_config(cfg);
    let input = uniform_frame(320, 240, 91);
    let mut output = Frame::new_nv12(320, 240);
    let outcome = stitcher.stitch_buffers(std::slice::from_ref(&input), &mut output).unwrap();
    assert_eq!(outcome, StitchOutcome::Produced);
    assert_eq!(output.y, input.y);
}

/// I7: the feature-matcher's per-frame factor update is bounded by
/// `max_adjusted_offset` even when fed a large, persistent drift — it must
/// converge gradually, never jump straight to the raw offset.
#[test]
fn feature_match_factor_updates_are_bounded_per_frame() {
    use stitch_featurematch::{FeatureMatcher, FmConfig, PairCenters, PairCrop};
    use stitch_geomap::Rect;

    fn checkerboard(size: u32) -> Frame {
        let mut frame = Frame::new_nv12(size, size);
        for y in 0..size {
            for x in 0..size {
                let v = if ((x / 8) + (y / 8)) % 2 == 0 { 40 } else { 220 };
                frame.y[(y * size + x) as usize] = v;
            }
        }
        frame
    }
    fn shift_frame(src: &Frame, dx: i32) -> Frame {
        let size = src.width;
        let mut out = Frame::new_nv12(size, size);
        let view = src.luma_view();
        for y in 0..size {
            for x in 0..size {
                out.y[(y * size + x) as usize] = view.read(x as i64 - dx as i64, y as i64);
            }
        }
        out
    }

    let left = checkerboard(96);
    let right = shift_frame(&left, 6);
    let config = FmConfig::default();
    let mut matcher = FeatureMatcher::new(config, 1);
    let crop = PairCrop { left_crop: Rect::new(0, 0, 96, 96), right_crop: Rect::new(0, 0, 96, 96) };
    let centers = PairCenters { left_slice_center_x: 200.0, right_slice_center_x: 800.0, overlap_center_x: 500.0 };

    let first = matcher.feature_match(0, &left, &right, crop, centers);
    assert!(
        first.left_offset_x.abs() <= config.max_adjusted_offset + 1e-3,
        "first-frame offset must not exceed the per-frame cap: {}",
        first.left_offset_x
    );

    let mut prev_offset = first.left_offset_x;
    for _ in 0..5 {
        let outcome = matcher.feature_match(0, &left, &right, crop, centers);
        let step = (outcome.left_offset_x - prev_offset).abs();
        assert!(step <= config.max_adjusted_offset + 1e-3, "per-frame step exceeded cap: {step}");
        prev_offset = outcome.left_offset_x;
    }
    assert!((prev_offset - 6.0).abs() < 6.0, "offset should be converging toward the true shift");
}
