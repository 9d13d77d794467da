//! # Pyramid Blender
//!
//! Multi-level Laplacian pyramid blending across one overlap region (§4.E).
//! No example in the retrieval pack builds an image pyramid, so the
//! algorithm itself is learned from the data model's description; the
//! surrounding style (typed view accessors, `StitchError` on bad input,
//! `#[cfg(test)]` unit tests) follows the rest of this crate.
//!
//! Internally the pyramid is built in `f32` rather than the data model's
//! u8-centered-at-128 Laplacian storage — a deliberate simplification noted
//! in DESIGN.md: it buys exact reconstruction in the `A == B` and
//! all-255/all-0 mask cases without a fixed-point rounding budget to track,
//! at the cost of the per-level buffer reuse the source's memory-bound
//! embedded target needed and this one does not.

use stitch_geomap::{ChromaViewMut, Frame, PlaneViewMut, Rect};

use crate::error::StitchError;

const GAUSS_KERNEL: [f32; 5] = [0.152, 0.222, 0.252, 0.222, 0.152];

/// Blends two remapped tiles' overlap region into the panorama output using
/// an `L`-level Laplacian pyramid and a seam mask.
pub struct PyramidBlender {
    levels: usize,
}

impl PyramidBlender {
    pub fn new(levels: usize) -> Result<Self, StitchError> {
        if !(1..=4).contains(&levels) {
            return Err(StitchError::param("blend_pyr_levels", format!("must be in [1,4], got {levels}")));
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Blends `in0`'s `overlap_in0` rectangle with `in1`'s `overlap_in1`
    /// rectangle into `out`'s `overlap_out` rectangle (§4.E contract). The
    /// three rectangles must share the same size (the data model's overlap
    /// invariant).
    pub fn blend(
        &self,
        in0: &Frame,
        overlap_in0: Rect,
        in1: &Frame,
        overlap_in1: Rect,
        out: &mut Frame,
        overlap_out: Rect,
    ) -> Result<(), StitchError> {
        if overlap_in0.size() != overlap_in1.size() || overlap_in0.size() != overlap_out.size() {
            return Err(StitchError::param("overlap_rect", "in0/in1/out overlap rectangles must share size"));
        }
        let (w, h) = overlap_in0.size();
        if w == 0 || h == 0 {
            return Err(StitchError::param("overlap_rect", "overlap size must be non-zero"));
        }

        let mask = seam_mask(w as usize);

        let luma0 = extract_luma(in0, overlap_in0);
        let luma1 = extract_luma(in1, overlap_in1);
        let blended_luma = blend_plane(&luma0, &luma1, w as usize, h as usize, &mask, self.levels);
        write_luma(out, overlap_out, &blended_luma, w, h);

        let cw = w.div_ceil(2);
        let ch = h.div_ceil(2);
        let chroma_mask = even_index_subsample(&mask);
        let (u0, v0) = extract_chroma(in0, overlap_in0, cw, ch);
        let (u1, v1) = extract_chroma(in1, overlap_in1, cw, ch);
        let blended_u = blend_plane(&u0, &u1, cw as usize, ch as usize, &chroma_mask, self.levels);
        let blended_v = blend_plane(&v0, &v1, cw as usize, ch as usize, &chroma_mask, self.levels);
        write_chroma(out, overlap_out, &blended_u, &blended_v, cw, ch);

        Ok(())
    }
}

/// Builds the 1-D seam mask row (§3 "Seam mask"): saturated outer quarters,
/// a smooth non-increasing ramp across the middle half.
fn seam_mask(width: usize) -> Vec<u8> {
    let quarter = width / 4;
    let middle = width.saturating_sub(2 * quarter).max(1);
    (0..width)
        .map(|i| {
            if i < quarter {
                255
            } else if i >= width - quarter {
                0
            } else {
                let t = (i - quarter) as f32 / middle as f32;
                let v = 0.5 * (1.0 + (std::f32::consts::PI * t).cos());
                (v * 255.0).round().clamp(0.0, 255.0) as u8
            }
        })
        .collect()
}

/// Chroma's seam mask is every second luma-mask byte (§3, resolved open
/// question: even-index subsampling).
fn even_index_subsample(mask: &[u8]) -> Vec<u8> {
    mask.iter().step_by(2).copied().collect()
}

fn extract_luma(frame: &Frame, rect: Rect) -> Vec<f32> {
    let view = frame.luma_view();
    let mut out = Vec::with_capacity((rect.width * rect.height) as usize);
    for y in 0..rect.height {
        for x in 0..rect.width {
            out.push(view.read((rect.x + x) as i64, (rect.y + y) as i64) as f32);
        }
    }
    out
}

fn extract_chroma(frame: &Frame, rect: Rect, cw: u32, ch: u32) -> (Vec<f32>, Vec<f32>) {
    let view = frame.chroma_view_nv12();
    let cx0 = rect.x / 2;
    let cy0 = rect.y / 2;
    let mut u = Vec::with_capacity((cw * ch) as usize);
    let mut v = Vec::with_capacity((cw * ch) as usize);
    for y in 0..ch {
        for x in 0..cw {
            let (uu, vv) = view.read((cx0 + x) as i64, (cy0 + y) as i64);
            u.push(uu as f32);
            v.push(vv as f32);
        }
    }
    (u, v)
}

fn write_luma(out: &mut Frame, rect: Rect, values: &[f32], w: u32, h: u32) {
    let stride = out.y_stride;
    let mut view = PlaneViewMut::new(&mut out.y, out.width, out.height, stride, 0);
    for y in 0..h {
        if rect.y + y >= out.height {
            continue;
        }
        for x in 0..w {
            if rect.x + x >= out.width {
                continue;
            }
            let v = values[(y * w + x) as usize];
            view.write(rect.x + x, rect.y + y, round_half_up_saturate(v));
        }
    }
}

fn write_chroma(out: &mut Frame, rect: Rect, u: &[f32], v: &[f32], cw: u32, ch: u32) {
    let out_cw = out.width.div_ceil(2);
    let out_ch = out.height.div_ceil(2);
    let pitch = out.chroma_stride / 2;
    let mut view = ChromaViewMut::new(&mut out.u_or_uv, out_cw, out_ch, pitch);
    let cx0 = rect.x / 2;
    let cy0 = rect.y / 2;
    for y in 0..ch {
        if cy0 + y >= out_ch {
            continue;
        }
        for x in 0..cw {
            if cx0 + x >= out_cw {
                continue;
            }
            let idx = (y * cw + x) as usize;
            view.write(cx0 + x, cy0 + y, (round_half_up_saturate(u[idx]), round_half_up_saturate(v[idx])));
        }
    }
}

fn round_half_up_saturate(v: f32) -> u8 {
    (v + 0.5).floor().clamp(0.0, 255.0) as u8
}

fn downscale_dims(w: usize, h: usize) -> (usize, usize) {
    (w.div_ceil(2).max(1), h.div_ceil(2).max(1))
}

/// Separable 5-tap Gaussian downscale by 2x (§4.E step 1).
fn gauss_downscale(src: &[f32], w: usize, h: usize) -> (Vec<f32>, usize, usize) {
    let (nw, nh) = downscale_dims(w, h);

    let mut rows = vec![0f32; w * nh];
    for oy in 0..nh {
        let sy = (oy * 2) as i64;
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &kw) in GAUSS_KERNEL.iter().enumerate() {
                let dy = sy + k as i64 - 2;
                let cy = dy.clamp(0, h as i64 - 1) as usize;
                acc += kw * src[cy * w + x];
            }
            rows[oy * w + x] = acc;
        }
    }

    let mut out = vec![0f32; nw * nh];
    for oy in 0..nh {
        for ox in 0..nw {
            let sx = (ox * 2) as i64;
            let mut acc = 0.0;
            for (k, &kw) in GAUSS_KERNEL.iter().enumerate() {
                let dx = sx + k as i64 - 2;
                let cx = dx.clamp(0, w as i64 - 1) as usize;
                acc += kw * rows[oy * w + cx];
            }
            out[oy * nw + ox] = acc;
        }
    }
    (out, nw, nh)
}

/// Bilinear upsample from `(sw, sh)` to `(dw, dh)` (§4.E step 2's "interpolate
/// level-`l` gauss back to level-`(l-1)` resolution").
fn upsample(src: &[f32], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<f32> {
    let mut out = vec![0f32; dw * dh];
    for y in 0..dh {
        let sy = (y as f32 + 0.5) * sh as f32 / dh as f32 - 0.5;
        let y0f = sy.floor();
        let ay = sy - y0f;
        let y0 = (y0f as i64).clamp(0, sh as i64 - 1) as usize;
        let y1 = (y0f as i64 + 1).clamp(0, sh as i64 - 1) as usize;
        for x in 0..dw {
            let sx = (x as f32 + 0.5) * sw as f32 / dw as f32 - 0.5;
            let x0f = sx.floor();
            let ax = sx - x0f;
            let x0 = (x0f as i64).clamp(0, sw as i64 - 1) as usize;
            let x1 = (x0f as i64 + 1).clamp(0, sw as i64 - 1) as usize;

            let p00 = src[y0 * sw + x0];
            let p01 = src[y0 * sw + x1];
            let p10 = src[y1 * sw + x0];
            let p11 = src[y1 * sw + x1];
            out[y * dw + x] =
                (1.0 - ax) * (1.0 - ay) * p00 + ax * (1.0 - ay) * p01 + (1.0 - ax) * ay * p10 + ax * ay * p11;
        }
    }
    out
}

fn downscale_mask_1d(mask: &[f32]) -> Vec<f32> {
    let w = mask.len();
    let nw = w.div_ceil(2).max(1);
    (0..nw)
        .map(|ox| {
            let sx = (ox * 2) as i64;
            GAUSS_KERNEL
                .iter()
                .enumerate()
                .map(|(k, &kw)| {
                    let dx = sx + k as i64 - 2;
                    let cx = dx.clamp(0, w as i64 - 1) as usize;
                    kw * mask[cx]
                })
                .sum()
        })
        .collect()
}

fn mask_pyramid(level0: &[u8], levels: usize) -> Vec<Vec<f32>> {
    let mut cur: Vec<f32> = level0.iter().map(|&v| v as f32 / 255.0).collect();
    let mut pyr = vec![cur.clone()];
    for _ in 1..levels {
        cur = downscale_mask_1d(&cur);
        pyr.push(cur.clone());
    }
    pyr
}

fn lerp_plane(a: &[f32], b: &[f32], mask_row: &[f32], w: usize, h: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let idx = y * w + x;
            let m = mask_row[x.min(mask_row.len() - 1)];
            out.push(a[idx] * m + b[idx] * (1.0 - m));
        }
    }
    out
}

/// Builds Gaussian pyramids for both sides, Laplacians from them, blends at
/// the coarsest level, and reconstructs bottom-up (§4.E steps 1–4).
fn blend_plane(a: &[f32], b: &[f32], w: usize, h: usize, mask0: &[u8], levels: usize) -> Vec<f32> {
    let mut dims = vec![(w, h)];
    let mut gauss_a = vec![a.to_vec()];
    let mut gauss_b = vec![b.to_vec()];
    for l in 1..levels {
        let (prev_w, prev_h) = dims[l - 1];
        let (ga, nw, nh) = gauss_downscale(&gauss_a[l - 1], prev_w, prev_h);
        let (gb, _, _) = gauss_downscale(&gauss_b[l - 1], prev_w, prev_h);
        dims.push((nw, nh));
        gauss_a.push(ga);
        gauss_b.push(gb);
    }

    let mut lap_a = Vec::with_capacity(levels.saturating_sub(1));
    let mut lap_b = Vec::with_capacity(levels.saturating_sub(1));
    for l in 0..levels.saturating_sub(1) {
        let (cw, ch) = dims[l];
        let (nw, nh) = dims[l + 1];
        let up_a = upsample(&gauss_a[l + 1], nw, nh, cw, ch);
        let up_b = upsample(&gauss_b[l + 1], nw, nh, cw, ch);
        lap_a.push(gauss_a[l].iter().zip(up_a.iter()).map(|(g, u)| g - u).collect::<Vec<_>>());
        lap_b.push(gauss_b[l].iter().zip(up_b.iter()).map(|(g, u)| g - u).collect::<Vec<_>>());
    }

    let mask_pyr = mask_pyramid(mask0, levels);

    let top = levels - 1;
    let (tw, th) = dims[top];
    let mut recon = lerp_plane(&gauss_a[top], &gauss_b[top], &mask_pyr[top], tw, th);

    for l in (0..top).rev() {
        let (cw, ch) = dims[l];
        let (pw, ph) = dims[l + 1];
        let up = upsample(&recon, pw, ph, cw, ch);
        let lap_blend = lerp_plane(&lap_a[l], &lap_b[l], &mask_pyr[l], cw, ch);
        recon = up.iter().zip(lap_blend.iter()).map(|(u, lp)| u + lp).collect();
    }
    recon
}
