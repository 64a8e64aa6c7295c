//! Example: thumbnail generation with each downscaling path.
//!
//! Loads a PNG, downscales it to the requested size with the chosen method
//! (area average, nearest neighbor, or gamma-correct area average), and
//! writes the result next to the input. Timing is printed to stdout.
//!
//! Run from the workspace root:
//!   cargo run -p raster-downscale --example thumbnail -- --help
//!   cargo run -p raster-downscale --example thumbnail -- --input photo.png --width 320

use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::{ImageReader, RgbaImage};
use raster_downscale::{
    CancelToken, RgbaView, RgbaViewMut, resize_nrgba, resize_nrgba_fast, resize_nrgba_gamma,
};

#[derive(Parser, Debug)]
#[command(about = "Downscale a PNG into a thumbnail")]
struct Args {
    /// Path to the input image
    #[arg(long)]
    input: String,

    /// Target width in pixels; height defaults to preserving aspect ratio
    #[arg(long)]
    width: u32,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Downscaling method: area, fast, or gamma
    #[arg(long, default_value = "area")]
    method: String,

    /// Encoding gamma for the gamma method
    #[arg(long, default_value_t = 2.2)]
    gamma: f64,

    /// Output path (default: <input stem>_thumb.png next to the input)
    #[arg(long)]
    out: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let img = ImageReader::open(&args.input)
        .with_context(|| format!("opening {}", args.input))?
        .decode()
        .context("decoding input image")?
        .to_rgba8();
    let (sw, sh) = img.dimensions();

    let dw = args.width;
    let dh = args
        .height
        .unwrap_or_else(|| ((u64::from(dw) * u64::from(sh)) / u64::from(sw)).max(1) as u32);
    if dw > sw || dh > sh {
        bail!("target {dw}x{dh} exceeds source {sw}x{sh}; only downscaling is supported");
    }

    let src = RgbaView::from_slice(sw as usize, sh as usize, img.as_raw())
        .context("building source view")?;
    let mut out = vec![0u8; dw as usize * dh as usize * 4];
    let mut dst = RgbaViewMut::from_slice_mut(dw as usize, dh as usize, &mut out)
        .context("building destination view")?;

    let token = CancelToken::new();
    let start = Instant::now();
    match args.method.as_str() {
        "area" => resize_nrgba(&src, &mut dst, &token)?,
        "fast" => resize_nrgba_fast(&src, &mut dst, &token)?,
        "gamma" => resize_nrgba_gamma(&src, &mut dst, args.gamma, &token)?,
        other => bail!("unknown method {other:?}; expected area, fast, or gamma"),
    }
    let elapsed = start.elapsed();
    println!(
        "{}: {sw}x{sh} -> {dw}x{dh} in {:.2} ms",
        args.method,
        elapsed.as_secs_f64() * 1e3
    );

    let out_path = args.out.unwrap_or_else(|| {
        let stem = args.input.strip_suffix(".png").unwrap_or(&args.input);
        format!("{stem}_thumb.png")
    });
    let thumb = RgbaImage::from_raw(dw, dh, out).expect("buffer matches dimensions");
    thumb
        .save(&out_path)
        .with_context(|| format!("writing {out_path}"))?;
    println!("wrote {out_path}");

    Ok(())
}
