//! # Copy Task
//!
//! Copies a non-overlap rectangle from a camera's remapped tile into the
//! panorama frame, luma and half-resolution chroma, byte for byte (§4.F).
//! The per-camera `merge_width` trim that widens a copy area at the expense
//! of the neighboring overlap is already folded into the rectangles
//! `stitch_geomap::slices::estimate_overlap`/`update_copy_areas` hand the
//! orchestrator — there is no further adjustment to make here.

use stitch_geomap::{ChromaViewMut, Frame, PlaneViewMut, Rect};

use crate::error::StitchError;

/// Copies `in_area` from `in_tile` to `out_area` in `out_frame`. The two
/// rectangles must share a size (§4.F, invariant I4: identity copy when
/// `in_area == out_area` and no blend overlaps it).
pub fn copy(in_tile: &Frame, in_area: Rect, out_frame: &mut Frame, out_area: Rect) -> Result<(), StitchError> {
    if in_area.size() != out_area.size() {
        return Err(StitchError::param("copy_area", "in_area and out_area must share size"));
    }
    let (w, h) = in_area.size();
    if w == 0 || h == 0 {
        return Ok(());
    }

    let in_luma = in_tile.luma_view();
    let out_stride = out_frame.y_stride;
    let mut out_luma = PlaneViewMut::new(&mut out_frame.y, out_frame.width, out_frame.height, out_stride, 0);
    for y in 0..h {
        if out_area.y + y >= out_frame.height {
            continue;
        }
        for x in 0..w {
            if out_area.x + x >= out_frame.width {
                continue;
            }
            let v = in_luma.read((in_area.x + x) as i64, (in_area.y + y) as i64);
            out_luma.write(out_area.x + x, out_area.y + y, v);
        }
    }

    let in_chroma = in_tile.chroma_view_nv12();
    let out_cw = out_frame.width.div_ceil(2);
    let out_ch = out_frame.height.div_ceil(2);
    let out_pitch = out_frame.chroma_stride / 2;
    let mut out_chroma = ChromaViewMut::new(&mut out_frame.u_or_uv, out_cw, out_ch, out_pitch);
    let cw = w.div_ceil(2);
    let ch = h.div_ceil(2);
    let in_cx0 = in_area.x / 2;
    let in_cy0 = in_area.y / 2;
    let out_cx0 = out_area.x / 2;
    let out_cy0 = out_area.y / 2;
    for y in 0..ch {
        if out_cy0 + y >= out_ch {
            continue;
        }
        for x in 0..cw {
            if out_cx0 + x >= out_cw {
                continue;
            }
            let uv = in_chroma.read((in_cx0 + x) as i64, (in_cy0 + y) as i64);
            out_chroma.write(out_cx0 + x, out_cy0 + y, uv);
        }
    }

    Ok(())
}
