use rd_core::TileSink;

use crate::engine::TileKernel;
use crate::weights::AxisWeights;

/// 16-bit straight-alpha kernel used by the gamma-correct path.
///
/// Accumulation is 64-bit: products of a 16-bit sample, a 16-bit alpha and
/// an LCM weight exceed 32 bits.
pub(crate) struct Linear16Kernel;

impl TileKernel for Linear16Kernel {
    type Sample = u16;

    fn horz_row(
        &self,
        dst: &mut [u16],
        src_row: &[u16],
        dx_start: u32,
        dx_end: u32,
        w: &AxisWeights,
    ) {
        let s_lcm = u64::from(w.s_lcm());
        let d_lcm = u64::from(w.d_lcm());
        let mut di = 0usize;
        let mut fr = if dx_start > 0 {
            u64::from(w.ft(dx_start - 1))
        } else {
            0
        };

        for dx in dx_start..dx_end {
            let (tl, tr) = (w.tt(dx), w.tt(dx + 1));
            let fl = s_lcm - fr;
            fr = u64::from(w.ft(dx));

            let (mut r, mut g, mut b, mut a) = (0u64, 0u64, 0u64, 0u64);
            let mut si = tl as usize * 4;

            if fl != 0 {
                let wt = u64::from(src_row[si + 3]) * fl;
                r += u64::from(src_row[si]) * wt;
                g += u64::from(src_row[si + 1]) * wt;
                b += u64::from(src_row[si + 2]) * wt;
                a += wt;
                si += 4;
            }
            for _ in tl + 1..tr {
                let wt = u64::from(src_row[si + 3]) * s_lcm;
                r += u64::from(src_row[si]) * wt;
                g += u64::from(src_row[si + 1]) * wt;
                b += u64::from(src_row[si + 2]) * wt;
                a += wt;
                si += 4;
            }
            if fr != 0 {
                let wt = u64::from(src_row[si + 3]) * fr;
                r += u64::from(src_row[si]) * wt;
                g += u64::from(src_row[si + 1]) * wt;
                b += u64::from(src_row[si + 2]) * wt;
                a += wt;
            }

            if a == 0 {
                dst[di..di + 4].fill(0);
            } else {
                dst[di] = ((r + a / 2) / a) as u16;
                dst[di + 1] = ((g + a / 2) / a) as u16;
                dst[di + 2] = ((b + a / 2) / a) as u16;
                dst[di + 3] = ((a + d_lcm / 2) / d_lcm) as u16;
            }
            di += 4;
        }
    }

    fn vert_col(
        &self,
        dst: &TileSink<'_, u16>,
        inter: &[u16],
        dx: u32,
        dy_start: u32,
        dy_end: u32,
        sx: u32,
        sy_start: u32,
        w: &AxisWeights,
        dst_stride: usize,
        inter_stride: usize,
    ) {
        let s_lcm = u64::from(w.s_lcm());
        let d_lcm = u64::from(w.d_lcm());
        let mut di = dy_start as usize * dst_stride + dx as usize * 4;
        let mut fr = if dy_start > 0 {
            u64::from(w.ft(dy_start - 1))
        } else {
            0
        };

        for dy in dy_start..dy_end {
            let (tl, tr) = (w.tt(dy), w.tt(dy + 1));
            let fl = s_lcm - fr;
            fr = u64::from(w.ft(dy));

            let (mut r, mut g, mut b, mut a) = (0u64, 0u64, 0u64, 0u64);
            let mut si = (tl - sy_start) as usize * inter_stride + sx as usize * 4;

            if fl != 0 {
                let wt = u64::from(inter[si + 3]) * fl;
                r += u64::from(inter[si]) * wt;
                g += u64::from(inter[si + 1]) * wt;
                b += u64::from(inter[si + 2]) * wt;
                a += wt;
                si += inter_stride;
            }
            for _ in tl + 1..tr {
                let wt = u64::from(inter[si + 3]) * s_lcm;
                r += u64::from(inter[si]) * wt;
                g += u64::from(inter[si + 1]) * wt;
                b += u64::from(inter[si + 2]) * wt;
                a += wt;
                si += inter_stride;
            }
            if fr != 0 {
                let wt = u64::from(inter[si + 3]) * fr;
                r += u64::from(inter[si]) * wt;
                g += u64::from(inter[si + 1]) * wt;
                b += u64::from(inter[si + 2]) * wt;
                a += wt;
            }

            let px = if a == 0 {
                [0, 0, 0, 0]
            } else {
                [
                    ((r + a / 2) / a) as u16,
                    ((g + a / 2) / a) as u16,
                    ((b + a / 2) / a) as u16,
                    ((a + d_lcm / 2) / d_lcm) as u16,
                ]
            };
            // SAFETY: Each worker owns disjoint destination tiles; `di` stays
            // within this tile's column and inside the destination buffer.
            unsafe { dst.write4(di, px) };
            di += dst_stride;
        }
    }
}
