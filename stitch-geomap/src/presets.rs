//! Resolution-mode preset bundles (§6 "Resolution-mode tags").
//!
//! Each tag is sugar for a bundle of camera count, per-camera viewpoint
//! range, and merge width — the stitcher equivalent of the teacher's
//! token-preset-to-`ScalePlan` mapping.

/// Sugar tags selecting a canned camera rig configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionMode {
    P1080p2Cams,
    P1080p4Cams,
    P4k2Cams,
    P8k3Cams,
    P8k6Cams,
}

/// The bundle a `ResolutionMode` tag expands to.
#[derive(Clone, Debug)]
pub struct ResolutionBundle {
    pub camera_count: usize,
    /// Degrees of horizontal field of view each camera's slice covers.
    pub viewpoints_range: Vec<f32>,
    /// Pixels of merge width trimmed into each overlap (§4.F).
    pub merge_widths: Vec<u32>,
}

impl ResolutionMode {
    pub fn bundle(self) -> ResolutionBundle {
        match self {
            ResolutionMode::P1080p2Cams => ResolutionBundle {
                camera_count: 2,
                viewpoints_range: vec![202.8, 202.8],
                merge_widths: vec![64, 64],
            },
            ResolutionMode::P1080p4Cams => ResolutionBundle {
                camera_count: 4,
                viewpoints_range: vec![110.0; 4],
                merge_widths: vec![48; 4],
            },
            ResolutionMode::P4k2Cams => ResolutionBundle {
                camera_count: 2,
                viewpoints_range: vec![202.8, 202.8],
                merge_widths: vec![96, 96],
            },
            ResolutionMode::P8k3Cams => ResolutionBundle {
                camera_count: 3,
                viewpoints_range: vec![135.0; 3],
                merge_widths: vec![128; 3],
            },
            ResolutionMode::P8k6Cams => ResolutionBundle {
                camera_count: 6,
                viewpoints_range: vec![70.0; 6],
                merge_widths: vec![96; 6],
            },
        }
    }
}
