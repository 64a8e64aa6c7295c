//! Nearest-neighbor fast path for RGBA downscaling.
//!
//! One point sample per destination pixel, addressed in 16-bit fixed point:
//! the center of each destination pixel maps onto the source grid and the
//! containing source pixel is copied verbatim. Throughput-first; no
//! averaging, no alpha handling, so straight and premultiplied images go
//! through the same code.
//!
//! The full path stripes contiguous row bands across workers; the partial
//! path re-tiles over the dirty destination set. Both poll the cancel token
//! coarsely and return bitwise identical output for any worker count.

mod nearest;

pub use nearest::{
    resize_nrgba_fast, resize_nrgba_fast_partial, resize_rgba_fast, resize_rgba_fast_partial,
};
