use std::thread;

use rd_core::{CancelToken, Error, RgbaView, RgbaViewMut, TileCoord, TileSink};

const SHIFT: u32 = 16;

/// Nearest-neighbor downscale, straight alpha.
pub fn resize_nrgba_fast(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    token: &CancelToken,
) -> Result<(), Error> {
    let (sw, sh) = (src.width() as u32, src.height() as u32);
    let (dw, dh) = (dst.width() as u32, dst.height() as u32);
    nearest(dst.data_mut(), (dw, dh), src.data(), (sw, sh), token)
}

/// Nearest-neighbor downscale, premultiplied alpha. Point sampling never
/// mixes pixels, so this is the same computation as the straight path.
pub fn resize_rgba_fast(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    token: &CancelToken,
) -> Result<(), Error> {
    let (sw, sh) = (src.width() as u32, src.height() as u32);
    let (dw, dh) = (dst.width() as u32, dst.height() as u32);
    nearest(dst.data_mut(), (dw, dh), src.data(), (sw, sh), token)
}

/// Partial nearest-neighbor downscale, straight alpha. Only destination
/// tiles mapped from `dirty` source tiles are rewritten.
pub fn resize_nrgba_fast_partial(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
) -> Result<(), Error> {
    let (sw, sh) = (src.width() as u32, src.height() as u32);
    let (dw, dh) = (dst.width() as u32, dst.height() as u32);
    nearest_partial(
        dst.data_mut(),
        (dw, dh),
        src.data(),
        (sw, sh),
        src_tile_size,
        dst_tile_size,
        dirty,
        token,
    )
}

/// Partial nearest-neighbor downscale, premultiplied alpha.
pub fn resize_rgba_fast_partial(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
) -> Result<(), Error> {
    let (sw, sh) = (src.width() as u32, src.height() as u32);
    let (dw, dh) = (dst.width() as u32, dst.height() as u32);
    nearest_partial(
        dst.data_mut(),
        (dw, dh),
        src.data(),
        (sw, sh),
        src_tile_size,
        dst_tile_size,
        dirty,
        token,
    )
}

struct FixedPoint {
    x_step: usize,
    x_half: usize,
    y_step: usize,
    y_half: usize,
}

impl FixedPoint {
    fn new(sw: u32, sh: u32, dw: u32, dh: u32) -> Self {
        let x_step = ((sw as usize) << SHIFT) / dw as usize;
        let y_step = ((sh as usize) << SHIFT) / dh as usize;
        Self {
            x_step,
            x_half: x_step >> 1,
            y_step,
            y_half: y_step >> 1,
        }
    }
}

fn nearest(
    dst: &mut [u8],
    (dw, dh): (u32, u32),
    src: &[u8],
    (sw, sh): (u32, u32),
    token: &CancelToken,
) -> Result<(), Error> {
    if dw == 0 || dh == 0 {
        return Ok(());
    }
    if sw < dw || sh < dh {
        return Err(Error::UpscaleUnsupported);
    }

    let avail = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let workers = avail.min((dh as usize / 2).max(1));
    log::debug!("nearest dispatch {sw}x{sh} -> {dw}x{dh}: {workers} workers");

    let fp = FixedPoint::new(sw, sh, dw, dh);
    let dst_stride = dw as usize * 4;
    let rows_per_worker = dh as usize / workers;

    thread::scope(|s| {
        let mut rest: &mut [u8] = dst;
        let mut y = 0usize;
        for i in 0..workers {
            let y_end = if i + 1 == workers {
                dh as usize
            } else {
                y + rows_per_worker
            };
            let (band, tail) =
                std::mem::take(&mut rest).split_at_mut((y_end - y) * dst_stride);
            rest = tail;
            let fp = &fp;
            s.spawn(move || {
                nearest_band(band, y, y_end, dw as usize, sw as usize, fp, src, token);
            });
            y = y_end;
        }
    });

    if token.is_cancelled() {
        Err(Error::Aborted)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn nearest_band(
    band: &mut [u8],
    y_min: usize,
    y_max: usize,
    dw: usize,
    sw: usize,
    fp: &FixedPoint,
    src: &[u8],
    token: &CancelToken,
) {
    let src_stride = sw * 4;
    let dst_stride = dw * 4;

    let mut y_fp = y_min * fp.y_step + fp.y_half;
    for dy in y_min..y_max {
        if dy & 7 == 7 && token.is_cancelled() {
            return;
        }
        let sy = y_fp >> SHIFT;
        let row = &src[sy * src_stride..][..src_stride];
        let out = &mut band[(dy - y_min) * dst_stride..][..dst_stride];

        let mut x_fp = fp.x_half;
        for dx in 0..dw {
            let si = (x_fp >> SHIFT) * 4;
            out[dx * 4..dx * 4 + 4].copy_from_slice(&row[si..si + 4]);
            x_fp += fp.x_step;
        }
        y_fp += fp.y_step;
    }
}

#[allow(clippy::too_many_arguments)]
fn nearest_partial(
    dst: &mut [u8],
    (dw, dh): (u32, u32),
    src: &[u8],
    (sw, sh): (u32, u32),
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
) -> Result<(), Error> {
    if dw == 0 || dh == 0 {
        return Ok(());
    }
    if sw < dw || sh < dh {
        return Err(Error::UpscaleUnsupported);
    }
    if dirty.is_empty() {
        return Ok(());
    }

    let tiles = rd_core::dst_dirty_tiles(sw, sh, dw, dh, src_tile_size, dst_tile_size, dirty);
    if tiles.is_empty() {
        return Ok(());
    }

    let avail = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    let workers = avail.min(tiles.len());
    log::debug!(
        "nearest partial dispatch {sw}x{sh} -> {dw}x{dh}: {} tiles, {workers} workers",
        tiles.len()
    );

    let fp = FixedPoint::new(sw, sh, dw, dh);
    let (tx, rx) = flume::bounded(tiles.len());
    for &tile in &tiles {
        tx.send(tile).expect("channel capacity equals tile count");
    }
    drop(tx);

    let sink = TileSink::new(dst);
    thread::scope(|s| {
        for _ in 0..workers {
            let rx = rx.clone();
            let sink = &sink;
            let fp = &fp;
            s.spawn(move || {
                for tile in rx.iter() {
                    if token.is_cancelled() {
                        return;
                    }
                    nearest_tile(
                        sink,
                        tile,
                        dst_tile_size,
                        dw as usize,
                        dh as usize,
                        sw as usize,
                        fp,
                        src,
                    );
                }
            });
        }
    });

    if token.is_cancelled() {
        Err(Error::Aborted)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn nearest_tile(
    sink: &TileSink<'_, u8>,
    tile: TileCoord,
    tile_size: u32,
    dw: usize,
    dh: usize,
    sw: usize,
    fp: &FixedPoint,
    src: &[u8],
) {
    let src_stride = sw * 4;
    let dst_stride = dw * 4;
    let dx_start = tile.x as usize;
    let dy_start = tile.y as usize;
    let dx_end = (dx_start + tile_size as usize).min(dw);
    let dy_end = (dy_start + tile_size as usize).min(dh);

    let mut y_fp = dy_start * fp.y_step + fp.y_half;
    for dy in dy_start..dy_end {
        let sy = y_fp >> SHIFT;
        let row = &src[sy * src_stride..][..src_stride];

        let mut x_fp = dx_start * fp.x_step + fp.x_half;
        let mut di = dy * dst_stride + dx_start * 4;
        for _ in dx_start..dx_end {
            let si = (x_fp >> SHIFT) * 4;
            // SAFETY: Dirty destination tiles are disjoint and owned by one
            // worker each; `di` stays inside this tile's rows.
            unsafe { sink.write4(di, [row[si], row[si + 1], row[si + 2], row[si + 3]]) };
            x_fp += fp.x_step;
            di += 4;
        }
        y_fp += fp.y_step;
    }
}

#[cfg(test)]
mod tests {
    use rd_core::{CancelToken, Error, RgbaView, RgbaViewMut, TileCoord};

    use super::{resize_nrgba_fast, resize_nrgba_fast_partial};

    fn labeled(w: usize, h: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(w * h * 4);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
            }
        }
        data
    }

    fn run(src: &[u8], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<u8> {
        let src = RgbaView::from_slice(sw, sh, src).expect("valid source");
        let mut out = vec![0u8; dw * dh * 4];
        let mut dst = RgbaViewMut::from_slice_mut(dw, dh, &mut out).expect("valid dest");
        resize_nrgba_fast(&src, &mut dst, &CancelToken::new()).expect("resize");
        out
    }

    #[test]
    fn halving_samples_the_fixed_point_centers() {
        // For S = 2D the destination pixel center lands exactly on the
        // boundary fixed-point coordinate 2*dx + 1.
        let src = labeled(4, 4);
        let out = run(&src, 4, 4, 2, 2);
        for dy in 0..2u8 {
            for dx in 0..2u8 {
                let px = &out[((dy as usize * 2) + dx as usize) * 4..][..4];
                assert_eq!(px, [2 * dx + 1, 2 * dy + 1, 0, 255]);
            }
        }
    }

    #[test]
    fn non_divisible_ratio_stays_in_bounds_and_deterministic() {
        let src = labeled(100, 80);
        let a = run(&src, 100, 80, 33, 27);
        let b = run(&src, 100, 80, 33, 27);
        assert_eq!(a, b);
        // Every output pixel is a verbatim source pixel.
        for px in a.chunks_exact(4) {
            assert!(usize::from(px[0]) < 100);
            assert!(usize::from(px[1]) < 80);
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn upscale_is_refused() {
        let src_data = labeled(2, 2);
        let src = RgbaView::from_slice(2, 2, &src_data).expect("valid source");
        let mut out = vec![0u8; 4 * 1 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(4, 1, &mut out).expect("valid dest");
        assert_eq!(
            resize_nrgba_fast(&src, &mut dst, &CancelToken::new()),
            Err(Error::UpscaleUnsupported)
        );
    }

    #[test]
    fn zero_size_destination_is_a_no_op() {
        let src_data = labeled(2, 2);
        let src = RgbaView::from_slice(2, 2, &src_data).expect("valid source");
        let mut out = Vec::new();
        let mut dst = RgbaViewMut::from_slice_mut(0, 0, &mut out).expect("valid dest");
        assert!(resize_nrgba_fast(&src, &mut dst, &CancelToken::new()).is_ok());
    }

    #[test]
    fn cancelled_token_reports_abort() {
        let src_data = labeled(64, 64);
        let src = RgbaView::from_slice(64, 64, &src_data).expect("valid source");
        let mut out = vec![0u8; 32 * 32 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(32, 32, &mut out).expect("valid dest");
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(resize_nrgba_fast(&src, &mut dst, &token), Err(Error::Aborted));
    }

    #[test]
    fn all_dirty_partial_matches_full_resize() {
        let src_data = labeled(256, 256);
        let full = run(&src_data, 256, 256, 128, 128);

        let src = RgbaView::from_slice(256, 256, &src_data).expect("valid source");
        let mut out = vec![0u8; 128 * 128 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(128, 128, &mut out).expect("valid dest");
        let mut dirty = Vec::new();
        for ty in (0..256).step_by(64) {
            for tx in (0..256).step_by(64) {
                dirty.push(TileCoord::new(tx, ty));
            }
        }
        resize_nrgba_fast_partial(&src, &mut dst, 64, 64, &dirty, &CancelToken::new())
            .expect("partial resize");

        assert_eq!(out, full);
    }

    #[test]
    fn single_dirty_tile_leaves_the_rest_untouched() {
        let mut src_data: Vec<u8> = [255u8, 0, 0, 255]
            .iter()
            .copied()
            .cycle()
            .take(256 * 256 * 4)
            .collect();
        let src = RgbaView::from_slice(256, 256, &src_data).expect("valid source");
        let mut out = vec![0u8; 128 * 128 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(128, 128, &mut out).expect("valid dest");
        resize_nrgba_fast(&src, &mut dst, &CancelToken::new()).expect("initial resize");

        for y in 0..64 {
            for x in 0..64 {
                let i = (y * 256 + x) * 4;
                src_data[i..i + 4].copy_from_slice(&[0, 255, 0, 255]);
            }
        }
        let src = RgbaView::from_slice(256, 256, &src_data).expect("valid source");
        let mut dst = RgbaViewMut::from_slice_mut(128, 128, &mut out).expect("valid dest");
        resize_nrgba_fast_partial(
            &src,
            &mut dst,
            64,
            64,
            &[TileCoord::new(0, 0)],
            &CancelToken::new(),
        )
        .expect("partial resize");

        assert_eq!(&out[0..4], &[0, 255, 0, 255]);
        let br = (127 * 128 + 127) * 4;
        assert_eq!(&out[br..br + 4], &[255, 0, 0, 255]);
    }
}
