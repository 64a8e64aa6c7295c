use rd_core::{CancelToken, Error, RgbaView, RgbaViewMut, TileCoord};

use crate::engine::{POOL_BUF_LEN, TILE_SIZE, run_tiled};
use crate::linear16::Linear16Kernel;
use crate::pool::BufferPool;
use crate::tables::{GammaTable, div_table};
use crate::{finish, precheck};

static LINEAR_POOL: BufferPool<u16> = BufferPool::new(POOL_BUF_LEN);

/// Gamma-correct downscale of a straight-alpha image.
///
/// Pixels are converted to 16-bit linear light, resampled there, and encoded
/// back, which avoids the darkening artifacts of averaging gamma-encoded
/// values. `gamma` is the encoding exponent of the input, e.g. 2.2.
pub fn resize_nrgba_gamma(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    gamma: f64,
    token: &CancelToken,
) -> Result<(), Error> {
    resize_nrgba_gamma_with_table(src, dst, &GammaTable::new(gamma), token)
}

/// Like [`resize_nrgba_gamma`] with a caller-built [`GammaTable`], for
/// amortizing table construction across many images.
pub fn resize_nrgba_gamma_with_table(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    table: &GammaTable,
    token: &CancelToken,
) -> Result<(), Error> {
    let (sw, sh) = (src.width() as u32, src.height() as u32);
    let (dw, dh) = (dst.width() as u32, dst.height() as u32);
    if !precheck(sw, sh, dw, dh)? {
        return Ok(());
    }
    if sw == dw && sh == dh {
        dst.data_mut().copy_from_slice(src.data());
        return Ok(());
    }

    let mut tmp_src = vec![0u16; src.data().len()];
    linearize_straight(table, src.data(), &mut tmp_src);
    if token.is_cancelled() {
        return Err(Error::Aborted);
    }

    let mut tmp_dst = vec![0u16; dst.data().len()];
    let tiles = rd_core::tile_grid(dw, dh, TILE_SIZE);
    run_tiled(
        &Linear16Kernel,
        token,
        &mut tmp_dst,
        (dw, dh),
        &tmp_src,
        (sw, sh),
        TILE_SIZE,
        &tiles,
        Some(&LINEAR_POOL),
    );
    if token.is_cancelled() {
        return Err(Error::Aborted);
    }

    delinearize_straight(table, &tmp_dst, dst.data_mut());
    finish(token)
}

/// Gamma-correct downscale of a premultiplied-alpha image.
///
/// Gamma is non-linear, so samples are unpremultiplied before linearization
/// and re-premultiplied after encoding.
pub fn resize_rgba_gamma(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    gamma: f64,
    token: &CancelToken,
) -> Result<(), Error> {
    resize_rgba_gamma_with_table(src, dst, &GammaTable::new(gamma), token)
}

/// Like [`resize_rgba_gamma`] with a caller-built [`GammaTable`].
pub fn resize_rgba_gamma_with_table(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    table: &GammaTable,
    token: &CancelToken,
) -> Result<(), Error> {
    let (sw, sh) = (src.width() as u32, src.height() as u32);
    let (dw, dh) = (dst.width() as u32, dst.height() as u32);
    if !precheck(sw, sh, dw, dh)? {
        return Ok(());
    }
    if sw == dw && sh == dh {
        dst.data_mut().copy_from_slice(src.data());
        return Ok(());
    }

    let mut tmp_src = vec![0u16; src.data().len()];
    linearize_premul(table, src.data(), &mut tmp_src);
    if token.is_cancelled() {
        return Err(Error::Aborted);
    }

    let mut tmp_dst = vec![0u16; dst.data().len()];
    let tiles = rd_core::tile_grid(dw, dh, TILE_SIZE);
    run_tiled(
        &Linear16Kernel,
        token,
        &mut tmp_dst,
        (dw, dh),
        &tmp_src,
        (sw, sh),
        TILE_SIZE,
        &tiles,
        Some(&LINEAR_POOL),
    );
    if token.is_cancelled() {
        return Err(Error::Aborted);
    }

    delinearize_premul(table, &tmp_dst, dst.data_mut());
    finish(token)
}

/// Gamma-correct partial update, straight alpha. See
/// [`resize_nrgba_partial`](crate::resize_nrgba_partial) for the dirty-tile
/// contract.
pub fn resize_nrgba_gamma_partial(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    gamma: f64,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
) -> Result<(), Error> {
    resize_nrgba_gamma_partial_with_table(
        src,
        dst,
        &GammaTable::new(gamma),
        src_tile_size,
        dst_tile_size,
        dirty,
        token,
    )
}

/// Like [`resize_nrgba_gamma_partial`] with a caller-built [`GammaTable`].
pub fn resize_nrgba_gamma_partial_with_table(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    table: &GammaTable,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
) -> Result<(), Error> {
    gamma_partial(
        src,
        dst,
        table,
        src_tile_size,
        dst_tile_size,
        dirty,
        token,
        linearize_straight,
        delinearize_straight,
    )
}

/// Gamma-correct partial update, premultiplied alpha.
pub fn resize_rgba_gamma_partial(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    gamma: f64,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
) -> Result<(), Error> {
    resize_rgba_gamma_partial_with_table(
        src,
        dst,
        &GammaTable::new(gamma),
        src_tile_size,
        dst_tile_size,
        dirty,
        token,
    )
}

/// Like [`resize_rgba_gamma_partial`] with a caller-built [`GammaTable`].
pub fn resize_rgba_gamma_partial_with_table(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    table: &GammaTable,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
) -> Result<(), Error> {
    gamma_partial(
        src,
        dst,
        table,
        src_tile_size,
        dst_tile_size,
        dirty,
        token,
        linearize_premul,
        delinearize_premul,
    )
}

#[allow(clippy::too_many_arguments)]
fn gamma_partial(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    table: &GammaTable,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
    linearize: fn(&GammaTable, &[u8], &mut [u16]),
    delinearize: fn(&GammaTable, &[u16], &mut [u8]),
) -> Result<(), Error> {
    let (sw, sh) = (src.width() as u32, src.height() as u32);
    let (dw, dh) = (dst.width() as u32, dst.height() as u32);
    if !precheck(sw, sh, dw, dh)? || dirty.is_empty() {
        return Ok(());
    }

    let tiles = rd_core::dst_dirty_tiles(sw, sh, dw, dh, src_tile_size, dst_tile_size, dirty);
    if tiles.is_empty() {
        return Ok(());
    }

    let mut tmp_src = vec![0u16; src.data().len()];
    linearize(table, src.data(), &mut tmp_src);
    if token.is_cancelled() {
        return Err(Error::Aborted);
    }

    let mut tmp_dst = vec![0u16; dst.data().len()];
    run_tiled(
        &Linear16Kernel,
        token,
        &mut tmp_dst,
        (dw, dh),
        &tmp_src,
        (sw, sh),
        dst_tile_size,
        &tiles,
        None,
    );
    if token.is_cancelled() {
        return Err(Error::Aborted);
    }

    // Encode back only the recomputed tiles; the rest of the destination
    // keeps its previous contents.
    let dst_px = dst.data_mut();
    for tile in &tiles {
        let x0 = tile.x as usize;
        let x1 = (tile.x + dst_tile_size).min(dw) as usize;
        let y1 = (tile.y + dst_tile_size).min(dh) as usize;
        for y in tile.y as usize..y1 {
            let start = (y * dw as usize + x0) * 4;
            let end = (y * dw as usize + x1) * 4;
            delinearize(table, &tmp_dst[start..end], &mut dst_px[start..end]);
        }
    }
    finish(token)
}

fn linearize_straight(table: &GammaTable, src: &[u8], dst: &mut [u16]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        d[0] = table.to_linear(s[0]);
        d[1] = table.to_linear(s[1]);
        d[2] = table.to_linear(s[2]);
        d[3] = u16::from(s[3]) * 0x101;
    }
}

fn delinearize_straight(table: &GammaTable, src: &[u16], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        d[0] = table.to_gamma(s[0]);
        d[1] = table.to_gamma(s[1]);
        d[2] = table.to_gamma(s[2]);
        d[3] = (s[3] >> 8) as u8;
    }
}

fn linearize_premul(table: &GammaTable, src: &[u8], dst: &mut [u16]) {
    let div = div_table();
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let a = s[3];
        if a == 255 {
            d[0] = table.to_linear(s[0]);
            d[1] = table.to_linear(s[1]);
            d[2] = table.to_linear(s[2]);
            d[3] = 65535;
        } else if a > 0 {
            let a = usize::from(a);
            d[0] = table.to_linear(div[(usize::from(s[0]) << 8) + a]);
            d[1] = table.to_linear(div[(usize::from(s[1]) << 8) + a]);
            d[2] = table.to_linear(div[(usize::from(s[2]) << 8) + a]);
            d[3] = a as u16 * 0x101;
        } else {
            d.fill(0);
        }
    }
}

fn delinearize_premul(table: &GammaTable, src: &[u16], dst: &mut [u8]) {
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let a = s[3];
        if a == 65535 {
            d[0] = table.to_gamma(s[0]);
            d[1] = table.to_gamma(s[1]);
            d[2] = table.to_gamma(s[2]);
            d[3] = 255;
        } else if a == 0 {
            d.fill(0);
        } else {
            let a8 = u32::from(a >> 8);
            let m = a8 * 32897;
            d[0] = ((u32::from(table.to_gamma(s[0])) * m) >> 23) as u8;
            d[1] = ((u32::from(table.to_gamma(s[1])) * m) >> 23) as u8;
            d[2] = ((u32::from(table.to_gamma(s[2])) * m) >> 23) as u8;
            d[3] = a8 as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use rd_core::{CancelToken, RgbaView, RgbaViewMut, TileCoord};

    use super::{resize_nrgba_gamma, resize_nrgba_gamma_partial, resize_rgba_gamma};

    fn solid(w: usize, h: usize, px: [u8; 4]) -> Vec<u8> {
        px.iter().copied().cycle().take(w * h * 4).collect()
    }

    #[test]
    fn midgray_survives_the_gamma_round_trip() {
        let src_data = solid(300, 300, [128, 128, 128, 255]);
        let src = RgbaView::from_slice(300, 300, &src_data).expect("valid source");
        let mut out = vec![0u8; 100 * 100 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(100, 100, &mut out).expect("valid dest");
        resize_nrgba_gamma(&src, &mut dst, 2.2, &CancelToken::new()).expect("resize");

        for px in out.chunks_exact(4) {
            for c in 0..3 {
                assert!(
                    px[c] >= 127 && px[c] <= 129,
                    "channel {c} drifted to {}",
                    px[c]
                );
            }
            assert_eq!(px[3], 255);
        }
    }

    #[test]
    fn transparent_output_is_zero_even_after_pool_reuse() {
        let token = CancelToken::new();

        // Fill the shared 16-bit pool with saturated data.
        let opaque = solid(300, 300, [255, 128, 64, 255]);
        let src = RgbaView::from_slice(300, 300, &opaque).expect("valid source");
        let mut first = vec![0u8; 100 * 100 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(100, 100, &mut first).expect("valid dest");
        resize_nrgba_gamma(&src, &mut dst, 2.2, &token).expect("first resize");

        // Now a mostly transparent image: only the top-left corner is opaque.
        let mut sparse = vec![0u8; 300 * 300 * 4];
        for y in 0..30 {
            for x in 0..30 {
                let i = (y * 300 + x) * 4;
                sparse[i..i + 4].copy_from_slice(&[0, 255, 0, 255]);
            }
        }
        let src = RgbaView::from_slice(300, 300, &sparse).expect("valid source");
        let mut out = vec![0u8; 100 * 100 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(100, 100, &mut out).expect("valid dest");
        resize_nrgba_gamma(&src, &mut dst, 2.2, &token).expect("second resize");

        for y in 20..100 {
            for x in 20..100 {
                let i = (y * 100 + x) * 4;
                assert_eq!(
                    &out[i..i + 4],
                    &[0, 0, 0, 0],
                    "stale data leaked at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn premul_transparent_output_is_zero() {
        let token = CancelToken::new();
        let opaque = solid(300, 300, [255, 128, 64, 255]);
        let src = RgbaView::from_slice(300, 300, &opaque).expect("valid source");
        let mut first = vec![0u8; 100 * 100 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(100, 100, &mut first).expect("valid dest");
        resize_rgba_gamma(&src, &mut dst, 2.2, &token).expect("first resize");

        let mut sparse = vec![0u8; 300 * 300 * 4];
        for y in 0..30 {
            for x in 0..30 {
                let i = (y * 300 + x) * 4;
                sparse[i..i + 4].copy_from_slice(&[0, 255, 0, 255]);
            }
        }
        let src = RgbaView::from_slice(300, 300, &sparse).expect("valid source");
        let mut out = vec![0u8; 100 * 100 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(100, 100, &mut out).expect("valid dest");
        resize_rgba_gamma(&src, &mut dst, 2.2, &token).expect("second resize");

        for y in 20..100 {
            for x in 20..100 {
                let i = (y * 100 + x) * 4;
                assert_eq!(
                    &out[i..i + 4],
                    &[0, 0, 0, 0],
                    "stale data leaked at ({x}, {y})"
                );
            }
        }
    }

    #[test]
    fn all_dirty_gamma_partial_matches_full_resize() {
        let mut src_data = Vec::with_capacity(256 * 256 * 4);
        for y in 0..256usize {
            for x in 0..256usize {
                src_data.extend_from_slice(&[x as u8, y as u8, ((x + y) / 2) as u8, 255]);
            }
        }
        let src = RgbaView::from_slice(256, 256, &src_data).expect("valid source");

        let mut full = vec![0u8; 128 * 128 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(128, 128, &mut full).expect("valid dest");
        resize_nrgba_gamma(&src, &mut dst, 2.2, &CancelToken::new()).expect("full resize");

        let mut partial = vec![0u8; 128 * 128 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(128, 128, &mut partial).expect("valid dest");
        let mut dirty = Vec::new();
        for ty in (0..256).step_by(64) {
            for tx in (0..256).step_by(64) {
                dirty.push(TileCoord::new(tx, ty));
            }
        }
        resize_nrgba_gamma_partial(&src, &mut dst, 2.2, 64, 64, &dirty, &CancelToken::new())
            .expect("partial resize");

        for (i, (f, p)) in full.iter().zip(partial.iter()).enumerate() {
            let diff = (i16::from(*f) - i16::from(*p)).unsigned_abs();
            assert!(diff <= 2, "byte {i}: full={f} partial={p}");
        }
    }

    #[test]
    fn gamma_partial_updates_only_dirty_tiles() {
        let mut src_data = solid(256, 256, [255, 0, 0, 255]);
        let src = RgbaView::from_slice(256, 256, &src_data).expect("valid source");
        let mut out = vec![0u8; 128 * 128 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(128, 128, &mut out).expect("valid dest");
        resize_nrgba_gamma(&src, &mut dst, 2.2, &CancelToken::new()).expect("initial resize");

        for y in 0..64 {
            for x in 0..64 {
                let i = (y * 256 + x) * 4;
                src_data[i..i + 4].copy_from_slice(&[0, 255, 0, 255]);
            }
        }
        let src = RgbaView::from_slice(256, 256, &src_data).expect("valid source");
        let mut dst = RgbaViewMut::from_slice_mut(128, 128, &mut out).expect("valid dest");
        resize_nrgba_gamma_partial(
            &src,
            &mut dst,
            2.2,
            64,
            64,
            &[TileCoord::new(0, 0)],
            &CancelToken::new(),
        )
        .expect("partial resize");

        assert!(out[1] > 200, "top-left should be green, got {}", out[1]);
        let br = (127 * 128 + 127) * 4;
        assert!(out[br] > 200, "bottom-right should be red, got {}", out[br]);
    }

    #[test]
    fn unit_gamma_solid_color_is_exact() {
        let src_data = solid(9, 9, [40, 90, 200, 255]);
        let src = RgbaView::from_slice(9, 9, &src_data).expect("valid source");
        let mut out = vec![0u8; 3 * 3 * 4];
        let mut dst = RgbaViewMut::from_slice_mut(3, 3, &mut out).expect("valid dest");
        resize_nrgba_gamma(&src, &mut dst, 1.0, &CancelToken::new()).expect("resize");
        for px in out.chunks_exact(4) {
            assert_eq!(px, [40, 90, 200, 255]);
        }
    }
}
