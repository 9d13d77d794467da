//! # Stitcher Configuration
//!
//! Grounded in the teacher's `CaptureConfig`: a struct of `set_*` knobs, each
//! validated on configure, plus a `validate()` that is re-run before the
//! orchestrator builds its tables on first `stitch_buffers` (§4.G).

use stitch_featurematch::FmConfig;
use stitch_geomap::presets::ResolutionMode;
use stitch_geomap::{BowlConfig, CameraInfo};

use crate::error::StitchError;

/// Dewarp projection tag (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DewarpMode {
    Sphere,
    Bowl,
}

/// Selects whether remap factors are shared across a tile's two halves, and
/// for `DualCurve`, whether a vertical blend curve applies at the
/// wall/ground boundary (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScaleMode {
    SingleConst,
    DualConst,
    DualCurve,
}

/// Feature-match backend tag (§6). `None` disables feature-match entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FmMode {
    None,
    Default,
    Cluster,
    Capi,
}

/// The per-camera merge-width trims (§4.F) plus the feature-matcher tuning
/// bundle, set together since both are sized by `camera_num`.
#[derive(Clone, Debug)]
pub struct StitchInfo {
    pub merge_widths: Vec<u32>,
    pub fm_config: FmConfig,
}

/// All `set_*` configuration accepted by the stitcher orchestrator (§4.G).
#[derive(Clone, Debug)]
pub struct StitcherConfig {
    camera_num: usize,
    output_size: (u32, u32),
    dewarp_mode: DewarpMode,
    scale_mode: ScaleMode,
    blend_pyr_levels: usize,
    fm_mode: FmMode,
    bowl_config: Option<BowlConfig>,
    stitch_info: Option<StitchInfo>,
    viewpoints_range: Vec<f32>,
    cameras: Vec<Option<CameraInfo>>,
}

impl Default for StitcherConfig {
    fn default() -> Self {
        Self {
            camera_num: 0,
            output_size: (0, 0),
            dewarp_mode: DewarpMode::Sphere,
            scale_mode: ScaleMode::SingleConst,
            blend_pyr_levels: 2,
            fm_mode: FmMode::None,
            bowl_config: None,
            stitch_info: None,
            viewpoints_range: Vec::new(),
            cameras: Vec::new(),
        }
    }
}

impl StitcherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config pre-populated from a resolution-mode preset bundle
    /// (§6); camera info still needs to be set per-camera afterward.
    pub fn from_resolution_mode(mode: ResolutionMode, fm_config: FmConfig) -> Result<Self, StitchError> {
        let bundle = mode.bundle();
        let mut cfg = Self::new();
        cfg.set_camera_num(bundle.camera_count)?;
        cfg.set_viewpoints_range(bundle.viewpoints_range)?;
        cfg.set_stitch_info(StitchInfo { merge_widths: bundle.merge_widths, fm_config })?;
        Ok(cfg)
    }

    pub fn set_camera_num(&mut self, n: usize) -> Result<(), StitchError> {
        if n == 0 {
            return Err(StitchError::param("camera_num", "must be non-zero"));
        }
        self.camera_num = n;
        self.cameras = vec![None; n];
        Ok(())
    }

    pub fn set_output_size(&mut self, width: u32, height: u32) -> Result<(), StitchError> {
        if width == 0 || height == 0 {
            return Err(StitchError::param("output_size", "must be non-zero"));
        }
        self.output_size = (width, height);
        Ok(())
    }

    pub fn set_dewarp_mode(&mut self, mode: DewarpMode) {
        self.dewarp_mode = mode;
    }

    pub fn set_scale_mode(&mut self, mode: ScaleMode) {
        self.scale_mode = mode;
    }

    pub fn set_blend_pyr_levels(&mut self, levels: usize) -> Result<(), StitchError> {
        if !(1..=4).contains(&levels) {
            return Err(StitchError::param("blend_pyr_levels", format!("must be in [1,4], got {levels}")));
        }
        self.blend_pyr_levels = levels;
        Ok(())
    }

    pub fn set_fm_mode(&mut self, mode: FmMode) {
        self.fm_mode = mode;
    }

    pub fn set_bowl_config(&mut self, bowl: BowlConfig) {
        self.bowl_config = Some(bowl);
    }

    pub fn set_stitch_info(&mut self, info: StitchInfo) -> Result<(), StitchError> {
        if self.camera_num != 0 && info.merge_widths.len() != self.camera_num {
            return Err(StitchError::param("stitch_info.merge_widths", "length must equal camera_num"));
        }
        self.stitch_info = Some(info);
        Ok(())
    }

    pub fn set_viewpoints_range(&mut self, ranges: Vec<f32>) -> Result<(), StitchError> {
        if ranges.len() != self.camera_num {
            return Err(StitchError::param("viewpoints_range", "length must equal camera_num"));
        }
        self.viewpoints_range = ranges;
        Ok(())
    }

    pub fn set_camera_info(&mut self, index: usize, info: CameraInfo) -> Result<(), StitchError> {
        let slot = self
            .cameras
            .get_mut(index)
            .ok_or_else(|| StitchError::param("camera_index", format!("{index} out of range [0, {})", self.camera_num)))?;
        *slot = Some(info);
        Ok(())
    }

    /// Checked before the orchestrator builds tables on first `stitch_buffers`.
    pub fn validate(&self) -> Result<(), StitchError> {
        if self.camera_num == 0 {
            return Err(StitchError::param("camera_num", "not configured"));
        }
        if self.output_size.0 == 0 || self.output_size.1 == 0 {
            return Err(StitchError::param("output_size", "not configured"));
        }
        if self.viewpoints_range.len() != self.camera_num {
            return Err(StitchError::param("viewpoints_range", "not configured for all cameras"));
        }
        if self.cameras.iter().any(Option::is_none) {
            return Err(StitchError::param("camera_info", "missing camera_info for one or more cameras"));
        }
        if self.dewarp_mode == DewarpMode::Bowl && self.bowl_config.is_none() {
            return Err(StitchError::param("bowl_config", "required when dewarp_mode is Bowl"));
        }
        if self.stitch_info.is_none() {
            return Err(StitchError::param("stitch_info", "not configured"));
        }
        Ok(())
    }

    pub fn camera_num(&self) -> usize {
        self.camera_num
    }

    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    pub fn dewarp_mode(&self) -> DewarpMode {
        self.dewarp_mode
    }

    pub fn scale_mode(&self) -> ScaleMode {
        self.scale_mode
    }

    pub fn blend_pyr_levels(&self) -> usize {
        self.blend_pyr_levels
    }

    pub fn fm_mode(&self) -> FmMode {
        self.fm_mode
    }

    pub fn bowl_config(&self) -> Option<&BowlConfig> {
        self.bowl_config.as_ref()
    }

    pub fn stitch_info(&self) -> Option<&StitchInfo> {
        self.stitch_info.as_ref()
    }

    pub fn viewpoints_range(&self) -> &[f32] {
        &self.viewpoints_range
    }

    pub fn camera_info(&self, index: usize) -> Option<&CameraInfo> {
        self.cameras.get(index).and_then(|c| c.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_geomap::Extrinsic;

    fn flat_camera() -> CameraInfo {
        CameraInfo {
            intrinsic: stitch_geomap::Intrinsic {
                cx: 640.0,
                cy: 640.0,
                fx: 400.0,
                fy: 400.0,
                fov: 190.0,
                skew: 0.0,
                flip: false,
                width: 1280,
                height: 1280,
                poly_coeff: vec![0.0, 1.0],
                c: 1.0,
                d: 0.0,
                e: 1.0,
            },
            extrinsic: Extrinsic::default(),
            radius: 640.0,
            distort_coeff: [0.0; 4],
        }
    }

    #[test]
    fn validate_fails_until_every_knob_is_set() {
        let mut cfg = StitcherConfig::new();
        assert!(cfg.validate().is_err());
        cfg.set_camera_num(2).unwrap();
        assert!(cfg.validate().is_err());
        cfg.set_output_size(1920, 640).unwrap();
        cfg.set_viewpoints_range(vec![202.8, 202.8]).unwrap();
        cfg.set_stitch_info(StitchInfo { merge_widths: vec![64, 64], fm_config: FmConfig::default() }).unwrap();
        assert!(cfg.validate().is_err(), "camera_info still missing");
        cfg.set_camera_info(0, flat_camera()).unwrap();
        cfg.set_camera_info(1, flat_camera()).unwrap();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bowl_mode_requires_bowl_config() {
        let mut cfg = StitcherConfig::new();
        cfg.set_camera_num(1).unwrap();
        cfg.set_output_size(640, 480).unwrap();
        cfg.set_viewpoints_range(vec![360.0]).unwrap();
        cfg.set_stitch_info(StitchInfo { merge_widths: vec![0], fm_config: FmConfig::default() }).unwrap();
        cfg.set_camera_info(0, flat_camera()).unwrap();
        cfg.set_dewarp_mode(DewarpMode::Bowl);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_pyramid_levels() {
        let mut cfg = StitcherConfig::new();
        assert!(cfg.set_blend_pyr_levels(0).is_err());
        assert!(cfg.set_blend_pyr_levels(5).is_err());
        assert!(cfg.set_blend_pyr_levels(3).is_ok());
    }

    #[test]
    fn resolution_mode_preset_populates_camera_num_and_stitch_info() {
        let cfg = StitcherConfig::from_resolution_mode(ResolutionMode::P1080p2Cams, FmConfig::default()).unwrap();
        assert_eq!(cfg.camera_num(), 2);
        assert_eq!(cfg.stitch_info().unwrap().merge_widths, vec![64, 64]);
    }
}
