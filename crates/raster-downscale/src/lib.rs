//! Umbrella crate for the `raster-downscale` workspace.
//!
//! Re-exports the foundational primitives, the area-weighted resampler, and
//! the nearest-neighbor fast path under one roof.

pub use rd_area::*;
pub use rd_core::*;
pub use rd_nn::*;
