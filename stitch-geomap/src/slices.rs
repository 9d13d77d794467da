//! Round-view slice distribution, overlap estimation, and copy-area
//! derivation (§4.G steps 1–4: `estimate_round_slices`,
//! `estimate_coarse_crops`/`mark_centers`, `estimate_overlap`,
//! `update_copy_areas`).
//!
//! These are pure functions over slice geometry; the orchestrator in the
//! root crate calls them once at `configure` time and caches the result.

use crate::geometry::{CopyArea, OverlapInfo, Rect, RoundViewSlice, align_up};

/// Distributes `Σ viewpoints_range` across the panorama. Each camera gets a
/// slice of width `slice_range/360 · W`, aligned to 8, preserving its
/// angular center.
pub fn estimate_round_slices(viewpoints_range: &[f32], panorama_width: u32) -> Vec<RoundViewSlice> {
    let mut start_angle = 0.0f32;
    viewpoints_range
        .iter()
        .map(|&range| {
            let slice = RoundViewSlice {
                width: align_up((range / 360.0 * panorama_width as f32).round() as u32, 8),
                height: 0,
                hori_angle_start: start_angle,
                hori_angle_range: range,
            };
            start_angle += range;
            slice
        })
        .collect()
}

/// Lays out slices left-to-right starting at panorama x=0, giving each a
/// coarse crop rectangle in panorama space.
pub fn estimate_coarse_crops(
    slices: &[RoundViewSlice],
    panorama_height: u32,
) -> Vec<Rect> {
    let mut x = 0u32;
    slices
        .iter()
        .map(|slice| {
            let rect = Rect::new(x, 0, slice.width, panorama_height);
            x += slice.width;
            rect
        })
        .collect()
}

/// Center x-coordinate (panorama space) of each crop.
pub fn mark_centers(crops: &[Rect]) -> Vec<u32> {
    crops.iter().map(|r| r.x + r.width / 2).collect()
}

/// Derives one `OverlapInfo` per adjacent camera pair `(i, i+1 mod N)`.
///
/// The wraparound pair (the last camera against the first) would need its
/// blended output rectangle to straddle the panorama's right edge and the
/// left edge at once — a single `Rect` can't express that circular split —
/// so that one pair is given a zero-width overlap instead: a hard seam with
/// no blend, rather than a rectangle that silently overflows past
/// `panorama_width` and drops pixels. Every other pair blends normally.
pub fn estimate_overlap(crops: &[Rect], merge_widths: &[u32]) -> Vec<OverlapInfo> {
    let n = crops.len();
    (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            let is_wraparound = j == 0;
            let overlap_width =
                if is_wraparound { 0 } else { align_up(merge_widths[i].max(merge_widths[j]) * 2, 8) };
            let out_x = crops[j].x.saturating_sub(overlap_width / 2);
            OverlapInfo {
                left: Rect::new(
                    crops[i].width.saturating_sub(overlap_width),
                    0,
                    overlap_width,
                    crops[i].height,
                ),
                right: Rect::new(0, 0, overlap_width, crops[j].height),
                out_area: Rect::new(out_x, 0, overlap_width, crops[i].height),
            }
        })
        .collect()
}

/// Produces the non-overlap `CopyArea`s for every camera. A camera whose
/// in-panorama copy region straddles the x=W/x=0 seam is split into two
/// records; all others get exactly one.
pub fn update_copy_areas(
    crops: &[Rect],
    overlaps: &[OverlapInfo],
    panorama_width: u32,
) -> Vec<Vec<CopyArea>> {
    let n = crops.len();
    (0..n)
        .map(|i| {
            let prev = (i + n - 1) % n;
            // Each overlap's blended strip is centered on the crop boundary
            // (§ `estimate_overlap`'s `out_x`), so only half its width
            // actually encroaches on this camera's own core area.
            let left_w = overlaps[prev].right.width / 2;
            let right_w = overlaps[i].left.width / 2;
            let copy_width = crops[i].width.saturating_sub(left_w + right_w);
            let in_x = left_w;
            let out_x = crops[i].x + left_w;

            if out_x + copy_width <= panorama_width {
                vec![CopyArea {
                    in_idx: i,
                    in_area: Rect::new(in_x, 0, copy_width, crops[i].height),
                    out_area: Rect::new(out_x, 0, copy_width, crops[i].height),
                }]
            } else {
                let first_width = panorama_width - out_x;
                let second_width = copy_width - first_width;
                vec![
                    CopyArea {
                        in_idx: i,
                        in_area: Rect::new(in_x, 0, first_width, crops[i].height),
                        out_area: Rect::new(out_x, 0, first_width, crops[i].height),
                    },
                    CopyArea {
                        in_idx: i,
                        in_area: Rect::new(in_x + first_width, 0, second_width, crops[i].height),
                        out_area: Rect::new(0, 0, second_width, crops[i].height),
                    },
                ]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_camera_slices_cover_full_panorama_width() {
        let slices = estimate_round_slices(&[202.8, 202.8], 1920);
        let crops = estimate_coarse_crops(&slices, 640);
        assert_eq!(crops.len(), 2);
        for c in &crops {
            assert_eq!(c.width % 8, 0);
        }
    }

    #[test]
    fn overlap_sizes_match_on_both_sides() {
        let slices = estimate_round_slices(&[202.8, 202.8], 1920);
        let crops = estimate_coarse_crops(&slices, 640);
        let overlaps = estimate_overlap(&crops, &[64, 64]);
        for o in &overlaps {
            assert_eq!(o.left.size(), o.right.size());
            assert_eq!(o.left.size(), o.out_area.size());
        }
    }

    #[test]
    fn copy_areas_partition_each_camera_tile() {
        let slices = estimate_round_slices(&[120.0, 120.0, 120.0], 1920);
        let crops = estimate_coarse_crops(&slices, 480);
        let overlaps = estimate_overlap(&crops, &[32, 32, 32]);
        let copies = update_copy_areas(&crops, &overlaps, 1920);
        assert_eq!(copies.len(), 3);
        for per_camera in &copies {
            assert!(!per_camera.is_empty() && per_camera.len() <= 2);
        }
    }
}
