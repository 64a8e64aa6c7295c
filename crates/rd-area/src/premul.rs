use rd_core::{CancelToken, Error, RgbaView, RgbaViewMut, TileCoord, TileSink};

use crate::engine::{POOL_BUF_LEN, TILE_SIZE, TileKernel, run_tiled};
use crate::pool::BufferPool;
use crate::tables::div_table;
use crate::weights::AxisWeights;
use crate::{finish, precheck};

static RGBA_POOL: BufferPool<u8> = BufferPool::new(POOL_BUF_LEN);

/// Area-weighted downscale of a premultiplied-alpha image.
///
/// Samples are unpremultiplied through the reciprocal table before
/// weighting, averaged in straight-color space, and re-premultiplied on
/// write with the `* 32897 >> 23` divide-by-255 identity. A destination
/// pixel whose accumulated alpha is zero is written as `(0, 0, 0, 0)`.
pub fn resize_rgba(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
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

    let tiles = rd_core::tile_grid(dw, dh, TILE_SIZE);
    run_tiled(
        &PremulKernel::new(),
        token,
        dst.data_mut(),
        (dw, dh),
        src.data(),
        (sw, sh),
        TILE_SIZE,
        &tiles,
        Some(&RGBA_POOL),
    );
    finish(token)
}

/// Premultiplied-alpha counterpart of
/// [`resize_nrgba_partial`](crate::resize_nrgba_partial).
pub fn resize_rgba_partial(
    src: &RgbaView<'_>,
    dst: &mut RgbaViewMut<'_>,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
    token: &CancelToken,
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

    run_tiled(
        &PremulKernel::new(),
        token,
        dst.data_mut(),
        (dw, dh),
        src.data(),
        (sw, sh),
        dst_tile_size,
        &tiles,
        None,
    );
    finish(token)
}

pub(crate) struct PremulKernel {
    div: &'static [u8; 65536],
}

impl PremulKernel {
    pub fn new() -> Self {
        Self { div: div_table() }
    }
}

impl TileKernel for PremulKernel {
    type Sample = u8;

    fn horz_row(&self, dst: &mut [u8], src_row: &[u8], dx_start: u32, dx_end: u32, w: &AxisWeights) {
        let s_lcm = w.s_lcm();
        let d_lcm = w.d_lcm();
        let mut di = 0usize;
        let mut fr = if dx_start > 0 { w.ft(dx_start - 1) } else { 0 };

        for dx in dx_start..dx_end {
            let (tl, tr) = (w.tt(dx), w.tt(dx + 1));
            let fl = s_lcm - fr;
            fr = w.ft(dx);

            let (mut r, mut g, mut b, mut a) = (0u32, 0u32, 0u32, 0u32);
            let mut si = tl as usize * 4;

            if fl != 0 {
                let ta = u32::from(src_row[si + 3]);
                if ta > 0 {
                    let wt = ta * fl;
                    r += u32::from(self.div[(usize::from(src_row[si]) << 8) + ta as usize]) * wt;
                    g += u32::from(self.div[(usize::from(src_row[si + 1]) << 8) + ta as usize]) * wt;
                    b += u32::from(self.div[(usize::from(src_row[si + 2]) << 8) + ta as usize]) * wt;
                    a += wt;
                }
                si += 4;
            }
            for _ in tl + 1..tr {
                let ta = u32::from(src_row[si + 3]);
                if ta > 0 {
                    let wt = ta * s_lcm;
                    r += u32::from(self.div[(usize::from(src_row[si]) << 8) + ta as usize]) * wt;
                    g += u32::from(self.div[(usize::from(src_row[si + 1]) << 8) + ta as usize]) * wt;
                    b += u32::from(self.div[(usize::from(src_row[si + 2]) << 8) + ta as usize]) * wt;
                    a += wt;
                }
                si += 4;
            }
            if fr != 0 {
                let ta = u32::from(src_row[si + 3]);
                if ta > 0 {
                    let wt = ta * fr;
                    r += u32::from(self.div[(usize::from(src_row[si]) << 8) + ta as usize]) * wt;
                    g += u32::from(self.div[(usize::from(src_row[si + 1]) << 8) + ta as usize]) * wt;
                    b += u32::from(self.div[(usize::from(src_row[si + 2]) << 8) + ta as usize]) * wt;
                    a += wt;
                }
            }

            if a == 0 {
                dst[di..di + 4].fill(0);
            } else {
                dst[di] = ((r / d_lcm * 32897) >> 23) as u8;
                dst[di + 1] = ((g / d_lcm * 32897) >> 23) as u8;
                dst[di + 2] = ((b / d_lcm * 32897) >> 23) as u8;
                dst[di + 3] = (a / d_lcm) as u8;
            }
            di += 4;
        }
    }

    fn vert_col(
        &self,
        dst: &TileSink<'_, u8>,
        inter: &[u8],
        dx: u32,
        dy_start: u32,
        dy_end: u32,
        sx: u32,
        sy_start: u32,
        w: &AxisWeights,
        dst_stride: usize,
        inter_stride: usize,
    ) {
        let s_lcm = w.s_lcm();
        let d_lcm = w.d_lcm();
        let mut di = dy_start as usize * dst_stride + dx as usize * 4;
        let mut fr = if dy_start > 0 { w.ft(dy_start - 1) } else { 0 };

        for dy in dy_start..dy_end {
            let (tl, tr) = (w.tt(dy), w.tt(dy + 1));
            let fl = s_lcm - fr;
            fr = w.ft(dy);

            let (mut r, mut g, mut b, mut a) = (0u32, 0u32, 0u32, 0u32);
            let mut si = (tl - sy_start) as usize * inter_stride + sx as usize * 4;

            if fl != 0 {
                let ta = u32::from(inter[si + 3]);
                if ta > 0 {
                    let wt = ta * fl;
                    r += u32::from(self.div[(usize::from(inter[si]) << 8) + ta as usize]) * wt;
                    g += u32::from(self.div[(usize::from(inter[si + 1]) << 8) + ta as usize]) * wt;
                    b += u32::from(self.div[(usize::from(inter[si + 2]) << 8) + ta as usize]) * wt;
                    a += wt;
                }
                si += inter_stride;
            }
            for _ in tl + 1..tr {
                let ta = u32::from(inter[si + 3]);
                if ta > 0 {
                    let wt = ta * s_lcm;
                    r += u32::from(self.div[(usize::from(inter[si]) << 8) + ta as usize]) * wt;
                    g += u32::from(self.div[(usize::from(inter[si + 1]) << 8) + ta as usize]) * wt;
                    b += u32::from(self.div[(usize::from(inter[si + 2]) << 8) + ta as usize]) * wt;
                    a += wt;
                }
                si += inter_stride;
            }
            if fr != 0 {
                let ta = u32::from(inter[si + 3]);
                if ta > 0 {
                    let wt = ta * fr;
                    r += u32::from(self.div[(usize::from(inter[si]) << 8) + ta as usize]) * wt;
                    g += u32::from(self.div[(usize::from(inter[si + 1]) << 8) + ta as usize]) * wt;
                    b += u32::from(self.div[(usize::from(inter[si + 2]) << 8) + ta as usize]) * wt;
                    a += wt;
                }
            }

            let px = if a == 0 {
                [0, 0, 0, 0]
            } else {
                [
                    ((r / d_lcm * 32897) >> 23) as u8,
                    ((g / d_lcm * 32897) >> 23) as u8,
                    ((b / d_lcm * 32897) >> 23) as u8,
                    (a / d_lcm) as u8,
                ]
            };
            // SAFETY: Each worker owns disjoint destination tiles; `di` stays
            // within this tile's column and inside the destination buffer.
            unsafe { dst.write4(di, px) };
            di += dst_stride;
        }
    }
}
