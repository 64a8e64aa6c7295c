use std::thread;

use rd_core::{CancelToken, TileCoord, TileSink};

use crate::pool::BufferPool;
use crate::weights::AxisWeights;

/// Destination tile side in pixels. A 64x64 RGBA tile is 16 KiB and stays
/// L1-resident through both resampling passes.
pub const TILE_SIZE: u32 = 64;

/// Pooled intermediate capacity in samples: source spans of up to four tile
/// heights fit without reallocation.
pub(crate) const POOL_BUF_LEN: usize = (TILE_SIZE * TILE_SIZE * 4 * 4) as usize;

/// One channel flavor of the area resampler.
///
/// Both passes run the same weighted-sum recurrence over the axis weights;
/// the kernel decides how a sample contributes (straight, unpremultiplied
/// via the reciprocal table, or 16-bit linear) and how the accumulated sums
/// are written back. Zero accumulated alpha must write `(0, 0, 0, 0)`.
pub(crate) trait TileKernel: Sync {
    type Sample: Copy + Default + Send + Sync;

    /// Horizontally averages one source row into `dst` for destination
    /// columns `[dx_start, dx_end)`.
    fn horz_row(
        &self,
        dst: &mut [Self::Sample],
        src_row: &[Self::Sample],
        dx_start: u32,
        dx_end: u32,
        w: &AxisWeights,
    );

    /// Vertically averages intermediate column `sx` into destination column
    /// `dx` for destination rows `[dy_start, dy_end)`. Intermediate row
    /// indices are offset by `sy_start` so the buffer stays compact.
    #[allow(clippy::too_many_arguments)]
    fn vert_col(
        &self,
        dst: &TileSink<'_, Self::Sample>,
        inter: &[Self::Sample],
        dx: u32,
        dy_start: u32,
        dy_end: u32,
        sx: u32,
        sy_start: u32,
        w: &AxisWeights,
        dst_stride: usize,
        inter_stride: usize,
    );
}

/// Runs the tiled two-pass resample over `tiles`.
///
/// Tiles are prefilled onto a closed bounded channel and pulled by
/// `min(available_parallelism, tiles.len())` workers. Workers write disjoint
/// destination tiles, so the output is bitwise identical for any worker
/// count and completion order. With `pool` set, intermediates come from the
/// flavor's shared free-list; partial updates pass `None` and size fresh
/// buffers from the caller-chosen `tile_size` instead.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_tiled<K: TileKernel>(
    kernel: &K,
    token: &CancelToken,
    dst: &mut [K::Sample],
    (dw, dh): (u32, u32),
    src: &[K::Sample],
    (sw, sh): (u32, u32),
    tile_size: u32,
    tiles: &[TileCoord],
    pool: Option<&BufferPool<K::Sample>>,
) {
    if tiles.is_empty() {
        return;
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(tiles.len());
    log::debug!(
        "tiled dispatch {sw}x{sh} -> {dw}x{dh}: {} tiles, {workers} workers",
        tiles.len()
    );

    let hw = AxisWeights::new(sw, dw);
    let vw = AxisWeights::new(sh, dh);

    let (tx, rx) = flume::bounded(tiles.len());
    for &tile in tiles {
        tx.send(tile).expect("channel capacity equals tile count");
    }
    drop(tx);

    let fresh_len = (tile_size as usize) * (tile_size as usize) * 4 * 4;
    let sink = TileSink::new(dst);

    thread::scope(|s| {
        for _ in 0..workers {
            let rx = rx.clone();
            let sink = &sink;
            let hw = &hw;
            let vw = &vw;
            s.spawn(move || {
                let mut buf = match pool {
                    Some(pool) => pool.checkout(),
                    None => vec![K::Sample::default(); fresh_len],
                };
                drain_tiles(
                    kernel, token, &rx, sink, src, (sw, sh), (dw, dh), tile_size, hw, vw, &mut buf,
                );
                if let Some(pool) = pool {
                    pool.restore(buf);
                }
            });
        }
    });
}

#[allow(clippy::too_many_arguments)]
fn drain_tiles<K: TileKernel>(
    kernel: &K,
    token: &CancelToken,
    rx: &flume::Receiver<TileCoord>,
    sink: &TileSink<'_, K::Sample>,
    src: &[K::Sample],
    (sw, sh): (u32, u32),
    (dw, dh): (u32, u32),
    tile_size: u32,
    hw: &AxisWeights,
    vw: &AxisWeights,
    buf: &mut Vec<K::Sample>,
) {
    let src_stride = sw as usize * 4;
    let dst_stride = dw as usize * 4;
    let mut scratch: Vec<K::Sample> = Vec::new();

    for tile in rx.iter() {
        if token.is_cancelled() {
            return;
        }

        let dx_start = tile.x;
        let dy_start = tile.y;
        let dx_end = (dx_start + tile_size).min(dw);
        let dy_end = (dy_start + tile_size).min(dh);
        let tile_w = (dx_end - dx_start) as usize;

        // Source rows feeding this tile's vertical pass. The last bin in the
        // tile straddles one extra source row when its fractional overflow
        // is non-zero.
        let sy_start = vw.tt(dy_start);
        let mut sy_end = vw.tt(dy_end);
        if dy_end < dh && vw.ft(dy_end - 1) > 0 {
            sy_end += 1;
        }
        sy_end = sy_end.min(sh);

        let inter_stride = tile_w * 4;
        let needed = (sy_end - sy_start) as usize * inter_stride;
        let inter: &mut [K::Sample] = if needed <= buf.len() {
            &mut buf[..needed]
        } else {
            scratch.resize(needed, K::Sample::default());
            &mut scratch[..needed]
        };

        for sy in sy_start..sy_end {
            let row = &src[sy as usize * src_stride..][..src_stride];
            let out = &mut inter[(sy - sy_start) as usize * inter_stride..][..inter_stride];
            kernel.horz_row(out, row, dx_start, dx_end, hw);
        }

        for dx in dx_start..dx_end {
            kernel.vert_col(
                sink,
                inter,
                dx,
                dy_start,
                dy_end,
                dx - dx_start,
                sy_start,
                vw,
                dst_stride,
                inter_stride,
            );
        }
    }
}
