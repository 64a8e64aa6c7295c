use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::{ImageReader, RgbaImage};
use raster_downscale::{
    CancelToken, GammaTable, RgbaView, RgbaViewMut, resize_nrgba, resize_nrgba_fast,
    resize_nrgba_gamma_with_table,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

#[derive(Parser, Debug)]
#[command(name = "rd_gallery")]
#[command(about = "Run every downscaling method on an image and write the results")]
struct Cli {
    /// Input image (any format the image crate decodes)
    #[arg(long, required = true)]
    input: PathBuf,

    /// Target width in pixels
    #[arg(long, required = true)]
    width: u32,

    /// Target height in pixels; defaults to preserving aspect ratio
    #[arg(long)]
    height: Option<u32>,

    /// Encoding gamma used by the gamma-correct run
    #[arg(long, default_value_t = 2.2)]
    gamma: f64,

    /// Output directory (default: alongside the input)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Log verbosity: off, error, warn, info, debug, trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    TermLogger::init(
        cli.log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("installing logger")?;

    let img = ImageReader::open(&cli.input)
        .with_context(|| format!("opening {}", cli.input.display()))?
        .decode()
        .context("decoding input image")?
        .to_rgba8();
    let (sw, sh) = img.dimensions();

    let dw = cli.width;
    let dh = cli
        .height
        .unwrap_or_else(|| ((u64::from(dw) * u64::from(sh)) / u64::from(sw)).max(1) as u32);
    if dw > sw || dh > sh {
        bail!("target {dw}x{dh} exceeds source {sw}x{sh}; only downscaling is supported");
    }
    log::info!("downscaling {sw}x{sh} -> {dw}x{dh}");

    let src =
        RgbaView::from_slice(sw as usize, sh as usize, img.as_raw()).context("source view")?;
    let out_dir = cli
        .out
        .clone()
        .or_else(|| cli.input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = cli
        .input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let token = CancelToken::new();
    let table = GammaTable::new(cli.gamma);

    run_method(&out_dir, &stem, "area", dw, dh, |dst| {
        resize_nrgba(&src, dst, &token)
    })?;
    run_method(&out_dir, &stem, "fast", dw, dh, |dst| {
        resize_nrgba_fast(&src, dst, &token)
    })?;
    run_method(&out_dir, &stem, "gamma", dw, dh, |dst| {
        resize_nrgba_gamma_with_table(&src, dst, &table, &token)
    })?;

    Ok(())
}

fn run_method<F>(out_dir: &Path, stem: &str, name: &str, dw: u32, dh: u32, f: F) -> Result<()>
where
    F: FnOnce(&mut RgbaViewMut<'_>) -> Result<(), raster_downscale::Error>,
{
    let mut out = vec![0u8; dw as usize * dh as usize * 4];
    let mut dst =
        RgbaViewMut::from_slice_mut(dw as usize, dh as usize, &mut out).context("dest view")?;

    let start = Instant::now();
    f(&mut dst).with_context(|| format!("{name} resize"))?;
    let elapsed = start.elapsed();
    log::info!("{name}: {:.2} ms", elapsed.as_secs_f64() * 1e3);

    let path = out_dir.join(format!("{stem}_{name}.png"));
    let img = RgbaImage::from_raw(dw, dh, out).expect("buffer matches dimensions");
    img.save(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    log::info!("wrote {}", path.display());

    Ok(())
}
