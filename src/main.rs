use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use stitcher::{CameraInfo, Extrinsic, FmConfig, Frame, Intrinsic, StitchInfo, Stitcher, StitcherConfig};

/// Stitches raw NV12 frame files from `N` fisheye cameras into one
/// equirectangular panorama frame, for manual inspection and benchmarking.
#[derive(Parser, Debug)]
#[command(name = "cap-stitch")]
#[command(about = "Stitch raw NV12 fisheye frames into a panorama")]
struct Args {
    /// Raw NV12 frame file per camera, in camera order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output raw NV12 panorama file.
    #[arg(short, long)]
    output: PathBuf,

    /// Width of each input camera frame.
    #[arg(long)]
    camera_width: u32,

    /// Height of each input camera frame.
    #[arg(long)]
    camera_height: u32,

    /// Output panorama width.
    #[arg(long)]
    output_width: u32,

    /// Output panorama height.
    #[arg(long)]
    output_height: u32,

    /// Number of Laplacian pyramid levels used to blend seams (1-4).
    #[arg(long, default_value_t = 2)]
    blend_levels: usize,

    /// Pixels of merge width trimmed into each camera's overlap (§4.F).
    #[arg(long, default_value_t = 64)]
    merge_width: u32,
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_some() {
        tracing_subscriber::fmt::init();
    }

    let args = Args::parse();
    let n = args.inputs.len();

    let mut config = StitcherConfig::new();
    config.set_camera_num(n).context("configuring camera_num")?;
    config.set_output_size(args.output_width, args.output_height).context("configuring output_size")?;
    config.set_blend_pyr_levels(args.blend_levels).context("configuring blend_pyr_levels")?;

    let viewpoint = 360.0 / n as f32;
    config.set_viewpoints_range(vec![viewpoint; n]).context("configuring viewpoints_range")?;
    config
        .set_stitch_info(StitchInfo { merge_widths: vec![args.merge_width; n], fm_config: FmConfig::default() })
        .context("configuring stitch_info")?;

    for i in 0..n {
        config.set_camera_info(i, flat_camera(args.camera_width, args.camera_height)).context("configuring camera_info")?;
    }

    let mut stitcher = Stitcher::with_config(config);

    let frame_bytes = (args.camera_width * args.camera_height) as usize
        + (args.camera_width.div_ceil(2) * 2 * args.camera_height.div_ceil(2)) as usize;
    let mut inputs = Vec::with_capacity(n);
    for path in &args.inputs {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        if bytes.len() != frame_bytes {
            bail!("{}: expected {frame_bytes} bytes for {}x{} NV12, got {}", path.display(), args.camera_width, args.camera_height, bytes.len());
        }
        inputs.push(bytes_to_nv12(&bytes, args.camera_width, args.camera_height));
    }

    let mut output = Frame::new_nv12(args.output_width, args.output_height);
    stitcher.stitch_buffers(&inputs, &mut output).context("stitch_buffers")?;

    let mut out_bytes = output.y.clone();
    out_bytes.extend_from_slice(&output.u_or_uv);
    fs::write(&args.output, out_bytes).with_context(|| format!("writing {}", args.output.display()))?;

    let stats = stitcher.last_stats();
    tracing::info!(
        remap_us = stats.remap_us,
        blend_us = stats.blend_us,
        copy_us = stats.copy_us,
        feature_match_us = stats.feature_match_us,
        "stitched {} cameras into {}",
        n,
        args.output.display()
    );

    Ok(())
}

fn bytes_to_nv12(bytes: &[u8], width: u32, height: u32) -> Frame {
    let y_len = (width * height) as usize;
    let mut frame = Frame::new_nv12(width, height);
    frame.y.copy_from_slice(&bytes[..y_len]);
    frame.u_or_uv.copy_from_slice(&bytes[y_len..]);
    frame
}

/// A reasonable default flat-lens calibration for cameras with no
/// calibration file supplied; `stitcher::calibration` provides real parsers
/// for production rigs.
fn flat_camera(width: u32, height: u32) -> CameraInfo {
    CameraInfo {
        intrinsic: Intrinsic {
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            fx: width as f32 / 3.0,
            fy: width as f32 / 3.0,
            fov: 190.0,
            skew: 0.0,
            flip: false,
            width,
            height,
            poly_coeff: vec![0.0, 1.0],
            c: 1.0,
            d: 0.0,
            e: 1.0,
        },
        extrinsic: Extrinsic::default(),
        radius: width.min(height) as f32 / 2.0,
        distort_coeff: [0.0; 4],
    }
}
