//! Fisheye dewarp table generation (§4.B).
//!
//! Both variants share the same output contract: a dense `tbl_w × tbl_h`
//! lookup of `(xf, yf)` fisheye-space coordinates, one entry per
//! `MAP_FACTOR_X × MAP_FACTOR_Y` block of the destination image. The
//! remapper (`crate::remap`) bilinearly interpolates this table at runtime.

use crate::geometry::{BowlConfig, CameraInfo};
use std::f32::consts::PI;

/// Table sampling spacing: one lookup entry per 16×16 destination pixels.
pub const MAP_FACTOR_X: u32 = 16;
pub const MAP_FACTOR_Y: u32 = 16;

#[derive(Debug, thiserror::Error)]
pub enum DewarpError {
    #[error("table dimensions must be non-zero, got {0}x{1}")]
    EmptyTable(u32, u32),
    #[error("camera field of view must be positive, got {0}")]
    InvalidFov(f32),
}

/// Produces a sphere (equirectangular) dewarp table for one camera.
///
/// `dst_lon`/`dst_lat` are the angular extent (degrees) the `tbl_w × tbl_h`
/// table covers in the destination panorama.
pub fn gen_sphere_table(
    camera: &CameraInfo,
    dst_lon: f32,
    dst_lat: f32,
    tbl_w: u32,
    tbl_h: u32,
    out: &mut Vec<(f32, f32)>,
) -> Result<(), DewarpError> {
    if tbl_w == 0 || tbl_h == 0 {
        return Err(DewarpError::EmptyTable(tbl_w, tbl_h));
    }
    if camera.intrinsic.fov <= 0.0 {
        return Err(DewarpError::InvalidFov(camera.intrinsic.fov));
    }

    let fov = camera.intrinsic.fov.to_radians();
    let roll = camera.extrinsic.roll.to_radians();
    let cx = camera.intrinsic.cx;
    let cy = camera.intrinsic.cy;
    let radius = camera.radius;

    let rx = dst_lon.to_radians() / tbl_w as f32;
    let ry = dst_lat.to_radians() / tbl_h as f32;

    let (sin_roll, cos_roll) = roll.sin_cos();
    let half_w = tbl_w as f32 / 2.0;
    let half_h = tbl_h as f32 / 2.0;

    out.clear();
    out.reserve((tbl_w * tbl_h) as usize);

    for row in 0..tbl_h {
        for col in 0..tbl_w {
            let gx = (col as f32 - half_w) * rx + PI / 2.0;
            let gy = (row as f32 - half_h) * ry + PI / 2.0;

            let z = gy.cos();
            let x = gy.sin() * gx.cos();
            let y = gy.sin() * gx.sin();

            let r_angle = y.clamp(-1.0, 1.0).acos();
            let r = r_angle * 2.0 * radius / fov;
            let xz = (x * x + z * z).sqrt().max(1e-12);
            let dx = -r * x / xz;
            let dy = -r * z / xz;

            let px = cos_roll * dx - sin_roll * dy + cx;
            let py = sin_roll * dx + cos_roll * dy + cy;

            let px = px.clamp(cx - radius, cx + radius);
            let py = py.clamp(cy - radius, cy + radius);

            out.push((px, py));
        }
    }
    Ok(())
}

/// A right-handed rotation matrix built from roll/pitch/yaw (radians),
/// composed as `Rz(yaw) * Ry(pitch) * Rx(roll)` — the common aerospace ZYX
/// convention. Recorded as a deliberate choice in DESIGN.md since the source
/// left the composition order implicit.
fn rotation_matrix(roll: f32, pitch: f32, yaw: f32) -> [[f32; 3]; 3] {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    let rz = [[cy, -sy, 0.0], [sy, cy, 0.0], [0.0, 0.0, 1.0]];
    let ry = [[cp, 0.0, sp], [0.0, 1.0, 0.0], [-sp, 0.0, cp]];
    let rx = [[1.0, 0.0, 0.0], [0.0, cr, -sr], [0.0, sr, cr]];

    mat_mul(&mat_mul(&rz, &ry), &rx)
}

fn mat_mul(a: &[[f32; 3]; 3], b: &[[f32; 3]; 3]) -> [[f32; 3]; 3] {
    let mut out = [[0.0f32; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

fn mat_transpose_mul_vec(m: &[[f32; 3]; 3], v: [f32; 3]) -> [f32; 3] {
    [
        m[0][0] * v[0] + m[1][0] * v[1] + m[2][0] * v[2],
        m[0][1] * v[0] + m[1][1] * v[1] + m[2][1] * v[2],
        m[0][2] * v[0] + m[1][2] * v[1] + m[2][2] * v[2],
    ]
}

/// Produces a bowl (PolyBowl) surround-view dewarp table for one camera.
///
/// `out_w`/`out_h` are the panorama tile dimensions the bowl surface is
/// parameterized over; `tbl_w`/`tbl_h` are the lookup table dimensions
/// (typically `ceil(out_w / MAP_FACTOR_X), ceil(out_h / MAP_FACTOR_Y)`).
pub fn gen_bowl_table(
    camera: &CameraInfo,
    bowl: &BowlConfig,
    out_w: u32,
    out_h: u32,
    tbl_w: u32,
    tbl_h: u32,
    out: &mut Vec<(f32, f32)>,
) -> Result<(), DewarpError> {
    if tbl_w == 0 || tbl_h == 0 {
        return Err(DewarpError::EmptyTable(tbl_w, tbl_h));
    }

    let rot = rotation_matrix(
        camera.extrinsic.roll.to_radians(),
        camera.extrinsic.pitch.to_radians(),
        camera.extrinsic.yaw.to_radians(),
    );
    let trans = [camera.extrinsic.tx, camera.extrinsic.ty, camera.extrinsic.tz];

    let angle_start = bowl.angle_start.to_radians();
    let angle_range = (bowl.angle_end - bowl.angle_start).to_radians();
    let wall_frac = bowl.wall_height / (bowl.wall_height + bowl.ground_length);

    let sx = out_w as f32 / tbl_w as f32;
    let sy = out_h as f32 / tbl_h as f32;

    out.clear();
    out.reserve((tbl_w * tbl_h) as usize);

    for row in 0..tbl_h {
        for col in 0..tbl_w {
            let px = col as f32 * sx;
            let py = row as f32 * sy;

            let angle = angle_start + (px / out_w.max(1) as f32) * angle_range;
            let v = py / out_h.max(1) as f32;

            let world = if v < wall_frac {
                // Upper wall: point on the ellipsoid surface, parameterized
                // from the rim (v=0) down to the ground junction (v=wall_frac).
                let t = v / wall_frac.max(1e-6);
                let z = bowl.center_z + bowl.wall_height * (1.0 - t);
                [bowl.a * angle.cos(), bowl.b * angle.sin(), z]
            } else {
                // Flat ground disc, radius shrinking from the wall base to
                // the center as v goes from wall_frac to 1.
                let t = (v - wall_frac) / (1.0 - wall_frac).max(1e-6);
                let radius_frac = 1.0 - t;
                [
                    bowl.a * radius_frac * angle.cos(),
                    bowl.b * radius_frac * angle.sin(),
                    bowl.center_z,
                ]
            };

            let rel = [world[0] - trans[0], world[1] - trans[1], world[2] - trans[2]];
            let cam = mat_transpose_mul_vec(&rot, rel);
            // Coordinate swap into the fisheye's optical frame.
            let (x, y, z) = (-cam[1], -cam[2], -cam[0]);

            let d = (x * x + y * y).sqrt();
            let (u, v_img) = if d < 1e-9 {
                (camera.intrinsic.cy, camera.intrinsic.cy)
            } else {
                let theta = (z / d).atan();
                let rho: f32 = camera
                    .intrinsic
                    .poly_coeff
                    .iter()
                    .enumerate()
                    .map(|(k, c)| c * theta.powi(k as i32))
                    .sum();
                let ix = x * rho / d;
                let iy = y * rho / d;
                (
                    ix * camera.intrinsic.c + iy * camera.intrinsic.d + camera.intrinsic.cx,
                    ix * camera.intrinsic.e + iy + camera.intrinsic.cy,
                )
            };

            out.push((u, v_img));
        }
    }
    Ok(())
}
