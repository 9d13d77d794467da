//! Shi-Tomasi-style corner detection over a luma crop.
//!
//! Grounded on the classic "good features to track" formulation: build the
//! per-pixel structure tensor from Sobel gradients, score each pixel by its
//! minimum eigenvalue, then keep local maxima above a fixed fraction of the
//! strongest response, most responsive first.

use stitch_geomap::PlaneView;

#[derive(Clone, Copy, Debug)]
pub struct Corner {
    pub x: f32,
    pub y: f32,
    pub response: f32,
}

const WINDOW: i64 = 3;
const QUALITY_FRACTION: f32 = 0.05;
const MIN_DISTANCE: i64 = 6;

#[inline]
fn sobel_x(view: &PlaneView<'_>, x: i64, y: i64) -> f32 {
    let g = |dx: i64, dy: i64| view.read(x + dx, y + dy) as f32;
    (g(1, -1) + 2.0 * g(1, 0) + g(1, 1)) - (g(-1, -1) + 2.0 * g(-1, 0) + g(-1, 1))
}

#[inline]
fn sobel_y(view: &PlaneView<'_>, x: i64, y: i64) -> f32 {
    let g = |dx: i64, dy: i64| view.read(x + dx, y + dy) as f32;
    (g(-1, 1) + 2.0 * g(0, 1) + g(1, 1)) - (g(-1, -1) + 2.0 * g(0, -1) + g(1, -1))
}

/// Minimum-eigenvalue corner response at `(x, y)`, summed over a
/// `(2*WINDOW+1)^2` structure tensor window.
fn corner_response(view: &PlaneView<'_>, x: i64, y: i64) -> f32 {
    let (mut sxx, mut syy, mut sxy) = (0.0f32, 0.0f32, 0.0f32);
    for dy in -WINDOW..=WINDOW {
        for dx in -WINDOW..=WINDOW {
            let ix = sobel_x(view, x + dx, y + dy);
            let iy = sobel_y(view, x + dx, y + dy);
            sxx += ix * ix;
            syy += iy * iy;
            sxy += ix * iy;
        }
    }
    let trace = sxx + syy;
    let det = sxx * syy - sxy * sxy;
    let disc = (trace * trace / 4.0 - det).max(0.0).sqrt();
    trace / 2.0 - disc
}

/// Detects up to `max_corners` strong corners within `width x height` of
/// `view`, starting at `(0, 0)`. Returns them strongest-first, enforcing a
/// minimum pixel spacing so corners don't cluster.
pub fn good_features_to_track(view: &PlaneView<'_>, width: u32, height: u32, max_corners: usize) -> Vec<Corner> {
    let margin = WINDOW + 1;
    let mut candidates = Vec::new();
    let mut max_response = 0.0f32;

    for y in margin..(height as i64 - margin) {
        for x in margin..(width as i64 - margin) {
            let r = corner_response(view, x, y);
            if r > max_response {
                max_response = r;
            }
            candidates.push(Corner { x: x as f32, y: y as f32, response: r });
        }
    }

    let threshold = max_response * QUALITY_FRACTION;
    candidates.retain(|c| c.response >= threshold);
    candidates.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap());

    let mut kept: Vec<Corner> = Vec::with_capacity(max_corners);
    for c in candidates {
        if kept.len() >= max_corners {
            break;
        }
        let too_close = kept
            .iter()
            .any(|k| (k.x - c.x).abs() < MIN_DISTANCE as f32 && (k.y - c.y).abs() < MIN_DISTANCE as f32);
        if !too_close {
            kept.push(c);
        }
    }
    kept
}
