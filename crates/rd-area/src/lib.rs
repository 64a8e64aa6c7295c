//! Exact area-weighted downscaling for RGBA rasters.
//!
//! Each destination pixel is the area-weighted average of the source region
//! it covers. Weights are integers in `lcm(S, D)` units, so every partial
//! overlap is a whole number and the result is independent of evaluation
//! order: resampling is separable (horizontal then vertical), processed in
//! 64x64 destination tiles for L1 locality, and fanned out over a worker
//! pool, with bitwise identical output for any worker count.
//!
//! Alpha policy:
//! - Straight alpha weights color by alpha, so transparent pixels do not
//!   bleed RGB into the average.
//! - Premultiplied alpha is unpremultiplied through a reciprocal table,
//!   averaged in straight space, and re-premultiplied on write.
//! - A destination pixel with zero accumulated alpha is `(0, 0, 0, 0)`.
//!
//! The gamma-correct entry points resample in 16-bit linear light through a
//! [`GammaTable`] pair. Partial entry points recompute only the destination
//! tiles whose support intersects dirty source tiles.
//!
//! Upscaling is refused; equal sizes degenerate to a copy; zero-sized
//! destinations succeed without work.

mod engine;
mod gamma;
mod linear16;
mod pool;
mod premul;
mod straight;
mod tables;
mod weights;

pub use engine::TILE_SIZE;
pub use gamma::{
    resize_nrgba_gamma, resize_nrgba_gamma_partial, resize_nrgba_gamma_partial_with_table,
    resize_nrgba_gamma_with_table, resize_rgba_gamma, resize_rgba_gamma_partial,
    resize_rgba_gamma_partial_with_table, resize_rgba_gamma_with_table,
};
pub use premul::{resize_rgba, resize_rgba_partial};
pub use straight::{resize_nrgba, resize_nrgba_partial};
pub use tables::GammaTable;

use rd_core::{CancelToken, Error};

/// Shared entry validation: `Ok(false)` means a zero-sized destination, a
/// success with no work.
pub(crate) fn precheck(sw: u32, sh: u32, dw: u32, dh: u32) -> Result<bool, Error> {
    if dw == 0 || dh == 0 {
        return Ok(false);
    }
    if sw < dw || sh < dh {
        return Err(Error::UpscaleUnsupported);
    }
    Ok(true)
}

/// A call whose token latched reports the abort after its workers exited.
pub(crate) fn finish(token: &CancelToken) -> Result<(), Error> {
    if token.is_cancelled() {
        Err(Error::Aborted)
    } else {
        Ok(())
    }
}
