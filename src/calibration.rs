//! # Calibration File Parsing
//!
//! The text and JSON calibration formats consumed to build a camera's
//! intrinsic/extrinsic calibration (§6). No `original_source/` sample
//! shipped with the retrieval pack for this spec, so the text-format
//! grammars below follow spec.md §6 literally rather than an observed
//! reference implementation.

use serde::Deserialize;
use stitch_geomap::Extrinsic;

use crate::error::StitchError;

/// The fields carried by an intrinsic calibration file: `poly_length`
/// coefficients, principal point, and the bowl projection's affine terms.
/// `fx`/`fy`/`fov`/`width`/`height` are not part of this format and must be
/// supplied by the caller to assemble a full `Intrinsic`.
#[derive(Clone, Debug, PartialEq)]
pub struct IntrinsicFile {
    pub poly_coeff: Vec<f32>,
    pub cx: f32,
    pub cy: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
}

/// The six floats carried by an extrinsic calibration file.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ExtrinsicFile {
    pub trans_x: f32,
    pub trans_y: f32,
    pub trans_z: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl From<ExtrinsicFile> for Extrinsic {
    fn from(f: ExtrinsicFile) -> Self {
        Extrinsic { roll: f.roll, pitch: f.pitch, yaw: f.yaw, tx: f.trans_x, ty: f.trans_y, tz: f.trans_z }
    }
}

/// One camera's K/R/T block from a combined calibration file.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedCameraEntry {
    pub camera_id: u32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub skew: f32,
    pub extrinsic: ExtrinsicFile,
}

fn tokens(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .flat_map(str::split_whitespace)
        .collect()
}

fn next_f32<'a>(path: &str, it: &mut impl Iterator<Item = &'a str>, field: &str) -> Result<f32, StitchError> {
    let tok = it.next().ok_or_else(|| StitchError::file(path, None, format!("missing value for `{field}`")))?;
    tok.parse::<f32>().map_err(|e| StitchError::file(path, None, format!("`{field}` is not a number ({e}): {tok}")))
}

fn next_usize<'a>(path: &str, it: &mut impl Iterator<Item = &'a str>, field: &str) -> Result<usize, StitchError> {
    let tok = it.next().ok_or_else(|| StitchError::file(path, None, format!("missing value for `{field}`")))?;
    tok.parse::<usize>().map_err(|e| StitchError::file(path, None, format!("`{field}` is not an integer ({e}): {tok}")))
}

/// Parses an intrinsic calibration file: `poly_length` + coefficients, then
/// `cy cx`, then `c d e` (§6).
pub fn parse_intrinsic_file(path: &str, text: &str) -> Result<IntrinsicFile, StitchError> {
    let toks = tokens(text);
    let mut it = toks.into_iter();

    let poly_length = next_usize(path, &mut it, "poly_length")?;
    if poly_length > 18 {
        return Err(StitchError::file(path, None, format!("poly_length {poly_length} exceeds the maximum of 18")));
    }
    let poly_coeff = (0..poly_length).map(|_| next_f32(path, &mut it, "poly_coeff")).collect::<Result<Vec<_>, _>>()?;

    let cy = next_f32(path, &mut it, "cy")?;
    let cx = next_f32(path, &mut it, "cx")?;
    let c = next_f32(path, &mut it, "c")?;
    let d = next_f32(path, &mut it, "d")?;
    let e = next_f32(path, &mut it, "e")?;

    Ok(IntrinsicFile { poly_coeff, cx, cy, c, d, e })
}

/// Parses an extrinsic calibration file: six consecutive floats
/// `trans_x trans_y trans_z roll pitch yaw` in degrees (§6).
pub fn parse_extrinsic_file(path: &str, text: &str) -> Result<ExtrinsicFile, StitchError> {
    let toks = tokens(text);
    let mut it = toks.into_iter();
    Ok(ExtrinsicFile {
        trans_x: next_f32(path, &mut it, "trans_x")?,
        trans_y: next_f32(path, &mut it, "trans_y")?,
        trans_z: next_f32(path, &mut it, "trans_z")?,
        roll: next_f32(path, &mut it, "roll")?,
        pitch: next_f32(path, &mut it, "pitch")?,
        yaw: next_f32(path, &mut it, "yaw")?,
    })
}

/// Parses a combined calibration file: repeated `camera_id` / `K_matrix` /
/// `R_matrix` / `T_matrix` sections, one block per camera (§6). Rotation
/// matrices are decomposed to roll/pitch/yaw Euler degrees using the same
/// ZYX convention `stitch_geomap::dewarp` composes with.
pub fn parse_combined_file(path: &str, text: &str) -> Result<Vec<CombinedCameraEntry>, StitchError> {
    let toks = tokens(text);
    let mut it = toks.into_iter().peekable();
    let mut entries = Vec::new();

    while let Some(&tok) = it.peek() {
        if !tok.eq_ignore_ascii_case("camera_id") {
            return Err(StitchError::file(path, None, format!("expected `camera_id`, found `{tok}`")));
        }
        it.next();
        let camera_id = next_usize(path, &mut it, "camera_id")? as u32;

        expect_keyword(path, &mut it, "K_matrix")?;
        let fx = next_f32(path, &mut it, "fx")?;
        let fy = next_f32(path, &mut it, "fy")?;
        let cx = next_f32(path, &mut it, "cx")?;
        let cy = next_f32(path, &mut it, "cy")?;
        let skew = next_f32(path, &mut it, "skew")?;

        expect_keyword(path, &mut it, "R_matrix")?;
        let mut r = [[0f32; 3]; 3];
        for row in r.iter_mut() {
            for v in row.iter_mut() {
                *v = next_f32(path, &mut it, "R_matrix entry")?;
            }
        }

        expect_keyword(path, &mut it, "T_matrix")?;
        let trans_x = next_f32(path, &mut it, "tx")?;
        let trans_y = next_f32(path, &mut it, "ty")?;
        let trans_z = next_f32(path, &mut it, "tz")?;

        let (roll, pitch, yaw) = euler_from_rotation_matrix(r);
        entries.push(CombinedCameraEntry {
            camera_id,
            fx,
            fy,
            cx,
            cy,
            skew,
            extrinsic: ExtrinsicFile {
                trans_x,
                trans_y,
                trans_z,
                roll: roll.to_degrees(),
                pitch: pitch.to_degrees(),
                yaw: yaw.to_degrees(),
            },
        });
    }

    Ok(entries)
}

fn expect_keyword<'a>(path: &str, it: &mut impl Iterator<Item = &'a str>, keyword: &str) -> Result<(), StitchError> {
    let tok = it.next().ok_or_else(|| StitchError::file(path, None, format!("expected `{keyword}`, found end of file")))?;
    if !tok.eq_ignore_ascii_case(keyword) {
        return Err(StitchError::file(path, None, format!("expected `{keyword}`, found `{tok}`")));
    }
    Ok(())
}

/// Extracts `(roll, pitch, yaw)` radians from a rotation matrix composed as
/// `Rz(yaw) * Ry(pitch) * Rx(roll)`, matching `stitch_geomap::dewarp`'s
/// convention.
fn euler_from_rotation_matrix(r: [[f32; 3]; 3]) -> (f32, f32, f32) {
    let pitch = (-r[2][0]).clamp(-1.0, 1.0).asin();
    let roll = r[2][1].atan2(r[2][2]);
    let yaw = r[1][0].atan2(r[0][0]);
    (roll, pitch, yaw)
}

#[derive(Deserialize)]
struct CalibrationJson {
    cameras: CamerasJson,
}

#[derive(Deserialize)]
struct CamerasJson {
    camera: Vec<JsonCameraEntry>,
}

#[derive(Deserialize)]
struct JsonCameraEntry {
    radius: f32,
    cx: f32,
    cy: f32,
    w: u32,
    h: u32,
    skew: f32,
    fx: f32,
    fy: f32,
    fov: f32,
    flip: bool,
    yaw: f32,
    pitch: f32,
    roll: f32,
    #[serde(rename = "D", default)]
    d: [f32; 4],
    #[serde(rename = "R", default)]
    r: Option<[f32; 9]>,
    #[serde(rename = "t", default)]
    t: [f32; 3],
    #[serde(default)]
    c: [f32; 3],
}

/// One camera's calibration as parsed from the optional JSON format (§6).
#[derive(Clone, Debug)]
pub struct JsonCamera {
    pub radius: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: u32,
    pub height: u32,
    pub skew: f32,
    pub fx: f32,
    pub fy: f32,
    pub fov: f32,
    pub flip: bool,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub distort_coeff: [f32; 4],
    pub translation: [f32; 3],
    /// The bowl projection's `c, d, e` affine/skew terms.
    pub affine: [f32; 3],
}

/// Parses the optional JSON calibration format: a `cameras.camera[]` array.
/// When a camera entry carries an `R` matrix, its Euler decomposition
/// overrides the scalar `yaw`/`pitch`/`roll` fields (§6).
pub fn parse_json_calibration(path: &str, text: &str) -> Result<Vec<JsonCamera>, StitchError> {
    let parsed: CalibrationJson =
        serde_json::from_str(text).map_err(|e| StitchError::file(path, Some(e.line() as u32), e.to_string()))?;

    Ok(parsed
        .cameras
        .camera
        .into_iter()
        .map(|entry| {
            let (roll, pitch, yaw) = match entry.r {
                Some(flat) => {
                    let r = [[flat[0], flat[1], flat[2]], [flat[3], flat[4], flat[5]], [flat[6], flat[7], flat[8]]];
                    let (roll, pitch, yaw) = euler_from_rotation_matrix(r);
                    (roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees())
                }
                None => (entry.roll, entry.pitch, entry.yaw),
            };
            JsonCamera {
                radius: entry.radius,
                cx: entry.cx,
                cy: entry.cy,
                width: entry.w,
                height: entry.h,
                skew: entry.skew,
                fx: entry.fx,
                fy: entry.fy,
                fov: entry.fov,
                flip: entry.flip,
                roll,
                pitch,
                yaw,
                distort_coeff: entry.d,
                translation: entry.t,
                affine: entry.c,
            }
        })
        .collect())
}
