//! Geomap remapper (§4.C): applies a dewarp table with bilinear sampling and
//! a dynamic per-half scale factor.

use crate::dewarp::{MAP_FACTOR_X, MAP_FACTOR_Y};
use crate::geometry::Rect;
use crate::image_view::{Frame, PlaneViewMut};

#[derive(Debug, thiserror::Error)]
pub enum RemapError {
    #[error("std_output_size must be non-zero")]
    EmptyStdOutputSize,
    #[error("output_size must be non-zero")]
    EmptyOutputSize,
    #[error("lookup table is empty")]
    EmptyTable,
    #[error("scale factor must be non-zero, got ({0}, {1})")]
    ZeroFactor(f32, f32),
}

/// A `(fx, fy)` scale factor pair. `1.0` means "use the table verbatim".
/// Values outside `(0, 2)` are flagged (via `is_suspicious`) for debugging
/// but not rejected, per §4.C.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactor {
    pub x: f32,
    pub y: f32,
}

impl ScaleFactor {
    pub const IDENTITY: ScaleFactor = ScaleFactor { x: 1.0, y: 1.0 };

    pub fn is_suspicious(&self) -> bool {
        !(0.0..2.0).contains(&self.x) || !(0.0..2.0).contains(&self.y)
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Consumes a dewarp table + input frame, emits a remapped output tile.
///
/// State is cached across calls: a dense per-pixel forward map is only
/// rebuilt when the table, factors, `std_area`, `std_output_size`, or
/// `extended_offset` change (§4.C).
pub struct GeoMapper {
    table: Vec<(f32, f32)>,
    tbl_w: u32,
    tbl_h: u32,
    std_output_size: (u32, u32),
    std_area: Rect,
    output_size: (u32, u32),
    extended_offset: u32,
    left_factor: ScaleFactor,
    right_factor: ScaleFactor,
    forward_map: Vec<(f32, f32)>,
    dirty: bool,
}

impl GeoMapper {
    pub fn new(
        table: Vec<(f32, f32)>,
        tbl_w: u32,
        tbl_h: u32,
        std_output_size: (u32, u32),
        std_area: Rect,
        output_size: (u32, u32),
        extended_offset: u32,
    ) -> Self {
        Self {
            table,
            tbl_w,
            tbl_h,
            std_output_size,
            std_area,
            output_size,
            extended_offset,
            left_factor: ScaleFactor::IDENTITY,
            right_factor: ScaleFactor::IDENTITY,
            forward_map: Vec::new(),
            dirty: true,
        }
    }

    /// Multiplies the current factors by a feature-match correction, applied
    /// at the start of the next frame (§4.D step 7, §5 ordering guarantee).
    pub fn apply_factor_correction(&mut self, left: ScaleFactor, right: ScaleFactor) {
        self.left_factor = ScaleFactor {
            x: self.left_factor.x * left.x,
            y: self.left_factor.y * left.y,
        };
        self.right_factor = ScaleFactor {
            x: self.right_factor.x * right.x,
            y: self.right_factor.y * right.y,
        };
        self.dirty = true;
    }

    pub fn set_std_area(&mut self, area: Rect) {
        if area != self.std_area {
            self.std_area = area;
            self.dirty = true;
        }
    }

    pub fn set_extended_offset(&mut self, offset: u32) {
        if offset != self.extended_offset {
            self.extended_offset = offset;
            self.dirty = true;
        }
    }

    pub fn left_factor(&self) -> ScaleFactor {
        self.left_factor
    }

    pub fn right_factor(&self) -> ScaleFactor {
        self.right_factor
    }

    fn validate(&self) -> Result<(), RemapError> {
        if self.std_output_size.0 == 0 || self.std_output_size.1 == 0 {
            return Err(RemapError::EmptyStdOutputSize);
        }
        if self.output_size.0 == 0 || self.output_size.1 == 0 {
            return Err(RemapError::EmptyOutputSize);
        }
        if self.table.is_empty() || self.tbl_w == 0 || self.tbl_h == 0 {
            return Err(RemapError::EmptyTable);
        }
        if self.left_factor.x == 0.0 || self.left_factor.y == 0.0 {
            return Err(RemapError::ZeroFactor(self.left_factor.x, self.left_factor.y));
        }
        if self.right_factor.x == 0.0 || self.right_factor.y == 0.0 {
            return Err(RemapError::ZeroFactor(self.right_factor.x, self.right_factor.y));
        }
        Ok(())
    }

    /// Bilinearly interpolates the lookup table at the fractional table cell
    /// `(tx, ty)`.
    fn sample_table(&self, tx: f32, ty: f32) -> (f32, f32) {
        let x0 = tx.floor().max(0.0) as u32;
        let y0 = ty.floor().max(0.0) as u32;
        let x1 = (x0 + 1).min(self.tbl_w - 1);
        let y1 = (y0 + 1).min(self.tbl_h - 1);
        let ax = tx - x0 as f32;
        let ay = ty - y0 as f32;

        let at = |x: u32, y: u32| self.table[(y * self.tbl_w + x) as usize];
        let (x00, y00) = at(x0, y0);
        let (x01, y01) = at(x1, y0);
        let (x10, y10) = at(x0, y1);
        let (x11, y11) = at(x1, y1);

        let sx = (1.0 - ax) * (1.0 - ay) * x00
            + ax * (1.0 - ay) * x01
            + (1.0 - ax) * ay * x10
            + ax * ay * x11;
        let sy = (1.0 - ax) * (1.0 - ay) * y00
            + ax * (1.0 - ay) * y01
            + (1.0 - ax) * ay * y10
            + ax * ay * y11;
        (sx, sy)
    }

    fn rebuild_forward_map(&mut self) {
        let w = self.std_area.width as usize;
        let h = self.std_area.height as usize;
        self.forward_map.clear();
        self.forward_map.resize(w * h, (0.0, 0.0));

        let half_w = self.std_area.width / 2;
        for ly in 0..self.std_area.height {
            let ty = (self.std_area.y + ly) as f32 / MAP_FACTOR_Y as f32;
            for lx in 0..self.std_area.width {
                let tx = (self.std_area.x + lx) as f32 / MAP_FACTOR_X as f32;
                let (sx, sy) = self.sample_table(tx, ty);
                let factor = if lx < half_w { self.left_factor } else { self.right_factor };
                self.forward_map[(ly * self.std_area.width + lx) as usize] =
                    (sx / factor.x, sy / factor.y);
            }
        }
        self.dirty = false;
    }

    /// Applies the lookup to `input` and writes the remapped tile into
    /// `output`, positioned at `(extended_offset, std_area.y)` within it.
    pub fn remap(&mut self, input: &Frame, output: &mut Frame) -> Result<(), RemapError> {
        self.validate()?;
        if self.dirty {
            self.rebuild_forward_map();
        }

        let in_luma = input.luma_view();
        let in_chroma = input.chroma_view_nv12();
        let out_y_stride = output.y_stride;
        let out_chroma_stride = output.chroma_stride;
        let mut out_luma =
            PlaneViewMut::new(&mut output.y, output.width, output.height, out_y_stride, 0);

        for ly in 0..self.std_area.height {
            let out_y = self.std_area.y + ly;
            if out_y >= output.height {
                continue;
            }
            for lx in 0..self.std_area.width {
                let out_x = self.extended_offset + lx;
                if out_x >= output.width {
                    continue;
                }
                let (sx, sy) = self.forward_map[(ly * self.std_area.width + lx) as usize];
                out_luma.write(out_x, out_y, in_luma.read_interpolate(sx, sy));
            }
        }

        let cw = output.width.div_ceil(2);
        let ch = output.height.div_ceil(2);
        let mut out_chroma =
            crate::image_view::ChromaViewMut::new(&mut output.u_or_uv, cw, ch, out_chroma_stride / 2);
        for ly in (0..self.std_area.height).step_by(2) {
            let out_y = (self.std_area.y + ly) / 2;
            if out_y >= ch {
                continue;
            }
            for lx in (0..self.std_area.width).step_by(2) {
                let out_x = (self.extended_offset + lx) / 2;
                if out_x >= cw {
                    continue;
                }
                let (sx, sy) = self.forward_map[(ly * self.std_area.width + lx) as usize];
                out_chroma.write(out_x, out_y, in_chroma.read_interpolate(sx / 2.0, sy / 2.0));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_view::Frame;

    fn identity_table(tbl_w: u32, tbl_h: u32) -> Vec<(f32, f32)> {
        let mut t = Vec::with_capacity((tbl_w * tbl_h) as usize);
        for row in 0..tbl_h {
            for col in 0..tbl_w {
                t.push((
                    (col * MAP_FACTOR_X) as f32,
                    (row * MAP_FACTOR_Y) as f32,
                ));
            }
        }
        t
    }

    #[test]
    fn identity_remap_reproduces_input_within_rounding() {
        let size = 64u32;
        let mut input = Frame::new_nv12(size, size);
        for y in 0..size {
            for x in 0..size {
                input.y[(y * size + x) as usize] = ((x + y) % 256) as u8;
            }
        }
        let tbl_w = size.div_ceil(MAP_FACTOR_X) + 1;
        let tbl_h = size.div_ceil(MAP_FACTOR_Y) + 1;
        let table = identity_table(tbl_w, tbl_h);

        let mut mapper = GeoMapper::new(
            table,
            tbl_w,
            tbl_h,
            (size, size),
            Rect::new(0, 0, size, size),
            (size, size),
            0,
        );
        let mut output = Frame::new_nv12(size, size);
        mapper.remap(&input, &mut output).unwrap();

        let mut max_diff = 0i32;
        for y in 0..size {
            for x in 0..size {
                let a = input.y[(y * size + x) as usize] as i32;
                let b = output.y[(y * size + x) as usize] as i32;
                max_diff = max_diff.max((a - b).abs());
            }
        }
        assert!(max_diff <= 2, "max_diff={max_diff}");
    }

    #[test]
    fn zero_factor_is_rejected() {
        let size = 16u32;
        let tbl_w = size.div_ceil(MAP_FACTOR_X) + 1;
        let tbl_h = size.div_ceil(MAP_FACTOR_Y) + 1;
        let mut mapper = GeoMapper::new(
            identity_table(tbl_w, tbl_h),
            tbl_w,
            tbl_h,
            (size, size),
            Rect::new(0, 0, size, size),
            (size, size),
            0,
        );
        mapper.apply_factor_correction(ScaleFactor { x: 0.0, y: 1.0 }, ScaleFactor::IDENTITY);
        let input = Frame::new_nv12(size, size);
        let mut output = Frame::new_nv12(size, size);
        assert!(mapper.remap(&input, &mut output).is_err());
    }
}
