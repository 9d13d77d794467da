//! Single-level Lucas-Kanade optical flow, used to track corners detected in
//! the left crop into the right crop of an overlap pair.

use crate::corners::Corner;
use stitch_geomap::PlaneView;

const PATCH_RADIUS: i64 = 7;
const MAX_ITERATIONS: u32 = 12;
const CONVERGENCE_EPS: f32 = 0.01;

/// Outcome of tracking one corner.
#[derive(Clone, Copy, Debug)]
pub struct TrackedPoint {
    pub src: Corner,
    pub dx: f32,
    pub dy: f32,
    /// Mean squared residual after convergence.
    pub track_error: f32,
}

/// Tracks `corners` (in `from`'s coordinate space) into `to`, starting each
/// search at the same `(x, y)` (zero initial displacement — the two crops
/// are expected to be roughly aligned already by the dewarp geometry).
pub fn track(from: &PlaneView<'_>, to: &PlaneView<'_>, corners: &[Corner]) -> Vec<TrackedPoint> {
    corners
        .iter()
        .map(|&corner| track_one(from, to, corner))
        .collect()
}

fn track_one(from: &PlaneView<'_>, to: &PlaneView<'_>, corner: Corner) -> TrackedPoint {
    let (mut dx, mut dy) = (0.0f32, 0.0f32);

    for _ in 0..MAX_ITERATIONS {
        let (mut gxx, mut gxy, mut gyy) = (0.0f32, 0.0f32, 0.0f32);
        let (mut bx, mut by) = (0.0f32, 0.0f32);

        for wy in -PATCH_RADIUS..=PATCH_RADIUS {
            for wx in -PATCH_RADIUS..=PATCH_RADIUS {
                let sx = corner.x + wx as f32;
                let sy = corner.y + wy as f32;
                let ix = 0.5
                    * (from.read_interpolate(sx + 1.0, sy) as f32
                        - from.read_interpolate(sx - 1.0, sy) as f32);
                let iy = 0.5
                    * (from.read_interpolate(sx, sy + 1.0) as f32
                        - from.read_interpolate(sx, sy - 1.0) as f32);
                let it = to.read_interpolate(sx + dx, sy + dy) as f32
                    - from.read_interpolate(sx, sy) as f32;

                gxx += ix * ix;
                gxy += ix * iy;
                gyy += iy * iy;
                bx += ix * it;
                by += iy * it;
            }
        }

        let det = gxx * gyy - gxy * gxy;
        if det.abs() < 1e-6 {
            break;
        }
        let step_x = -(gyy * bx - gxy * by) / det;
        let step_y = -(gxx * by - gxy * bx) / det;
        dx += step_x;
        dy += step_y;
        if step_x * step_x + step_y * step_y < CONVERGENCE_EPS {
            break;
        }
    }

    let mut squared_error = 0.0f32;
    let mut count = 0.0f32;
    for wy in -PATCH_RADIUS..=PATCH_RADIUS {
        for wx in -PATCH_RADIUS..=PATCH_RADIUS {
            let sx = corner.x + wx as f32;
            let sy = corner.y + wy as f32;
            let residual =
                to.read_interpolate(sx + dx, sy + dy) as f32 - from.read_interpolate(sx, sy) as f32;
            squared_error += residual * residual;
            count += 1.0;
        }
    }

    TrackedPoint {
        src: corner,
        dx,
        dy,
        track_error: squared_error / count,
    }
}
