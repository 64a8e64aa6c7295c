//! Foundational primitives for RGBA downscaling.
//!
//! ## Pixel Layout
//! Images are contiguous byte buffers in R,G,B,A channel order, row-major,
//! top-left origin, with row stride exactly `4 * width` bytes. Views borrow
//! caller-owned buffers; construction validates the length. Whether color
//! channels are straight or premultiplied by alpha is decided by the entry
//! point that consumes the view, not stored here.
//!
//! ## Cancellation
//! [`CancelToken`] is a cloneable one-way abort latch. Resample workers poll
//! it at coarse intervals (between tiles, or every few rows); a call whose
//! token latched returns an abort error only after every worker has exited.
//! Destination contents after an aborted call are unspecified.
//!
//! ## Tiles
//! The resamplers distribute work in square destination tiles. [`TileCoord`]
//! names a tile by its top-left destination pixel; [`dst_dirty_tiles`] maps a
//! set of dirty source tiles to the destination tiles whose resampled value
//! may have changed.

mod cancel;
mod error;
mod rgba;
mod sink;
mod tile;

pub use cancel::CancelToken;
pub use error::Error;
pub use rgba::{RgbaView, RgbaViewMut};
pub use sink::TileSink;
pub use tile::{TileCoord, dst_dirty_tiles, tile_grid};
