use std::collections::BTreeSet;

/// Top-left corner of a tile, in pixels of the image it refers to.
///
/// For destination tiles the unit of work distribution is the tile; for
/// dirty-tracking input the coordinate names a source tile corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Enumerates the full `tile_size`-sided destination tile grid in row-major
/// order. The last row and column are clipped by the consumer.
pub fn tile_grid(width: u32, height: u32, tile_size: u32) -> Vec<TileCoord> {
    if width == 0 || height == 0 || tile_size == 0 {
        return Vec::new();
    }

    let tiles_x = width.div_ceil(tile_size) as usize;
    let tiles_y = height.div_ceil(tile_size) as usize;
    let mut tiles = Vec::with_capacity(tiles_x * tiles_y);
    let mut ty = 0;
    while ty < height {
        let mut tx = 0;
        while tx < width {
            tiles.push(TileCoord::new(tx, ty));
            tx += tile_size;
        }
        ty += tile_size;
    }
    tiles
}

/// Maps dirty source tiles to the destination tiles that must be recomputed.
///
/// Each dirty source rectangle is scaled into destination space with one
/// pixel of slack on the upper bounds, clamped to the destination, aligned
/// down to `dst_tile_size` multiples, and every covered tile origin is
/// collected. The slack guarantees that any destination pixel whose
/// area-weighted support intersects a dirty source tile is recomputed,
/// across all axis-specific rounding.
///
/// Input order does not matter; the result is deduplicated and sorted.
pub fn dst_dirty_tiles(
    sw: u32,
    sh: u32,
    dw: u32,
    dh: u32,
    src_tile_size: u32,
    dst_tile_size: u32,
    dirty: &[TileCoord],
) -> Vec<TileCoord> {
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 || src_tile_size == 0 || dst_tile_size == 0 {
        return Vec::new();
    }

    let (swu, shu) = (u64::from(sw), u64::from(sh));
    let (dwu, dhu) = (u64::from(dw), u64::from(dh));
    let src_ts = u64::from(src_tile_size);
    let dst_ts = u64::from(dst_tile_size);

    let mut tiles = BTreeSet::new();
    for t in dirty {
        let sx0 = u64::from(t.x);
        let sy0 = u64::from(t.y);
        let sx1 = sx0 + src_ts;
        let sy1 = sy0 + src_ts;

        let dx0 = (sx0 * dwu / swu).min(dwu);
        let dy0 = (sy0 * dhu / shu).min(dhu);
        let dx1 = ((sx1 * dwu).div_ceil(swu) + 1).min(dwu);
        let dy1 = ((sy1 * dhu).div_ceil(shu) + 1).min(dhu);
        if dx0 >= dx1 || dy0 >= dy1 {
            continue;
        }

        let mut ty = dy0 - dy0 % dst_ts;
        while ty < dy1 {
            let mut tx = dx0 - dx0 % dst_ts;
            while tx < dx1 {
                tiles.insert(TileCoord::new(tx as u32, ty as u32));
                tx += dst_ts;
            }
            ty += dst_ts;
        }
    }

    tiles.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::{TileCoord, dst_dirty_tiles, tile_grid};

    #[test]
    fn grid_clips_last_row_and_column() {
        let tiles = tile_grid(130, 65, 64);
        assert_eq!(tiles.len(), 6);
        assert_eq!(tiles[0], TileCoord::new(0, 0));
        assert_eq!(tiles[2], TileCoord::new(128, 0));
        assert_eq!(tiles[5], TileCoord::new(128, 64));
    }

    #[test]
    fn all_dirty_covers_full_grid() {
        let mut dirty = Vec::new();
        for ty in (0..256).step_by(64) {
            for tx in (0..256).step_by(64) {
                dirty.push(TileCoord::new(tx, ty));
            }
        }

        let tiles = dst_dirty_tiles(256, 256, 128, 128, 64, 64, &dirty);
        let mut grid = tile_grid(128, 128, 64);
        grid.sort();
        assert_eq!(tiles, grid);
    }

    #[test]
    fn single_tile_maps_to_clamped_neighborhood() {
        // 256 -> 128 halves coordinates; the top-left 64x64 source tile lands
        // in destination [0, 32) plus the one-pixel slack, so both 32-sized
        // tiles touching column/row 33 are included.
        let tiles = dst_dirty_tiles(256, 256, 128, 128, 64, 32, &[TileCoord::new(0, 0)]);
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(0, 32),
                TileCoord::new(32, 0),
                TileCoord::new(32, 32),
            ]
        );
    }

    #[test]
    fn input_order_is_irrelevant() {
        let a = dst_dirty_tiles(
            256,
            256,
            100,
            100,
            64,
            16,
            &[TileCoord::new(0, 0), TileCoord::new(192, 192)],
        );
        let b = dst_dirty_tiles(
            256,
            256,
            100,
            100,
            64,
            16,
            &[
                TileCoord::new(192, 192),
                TileCoord::new(0, 0),
                TileCoord::new(0, 0),
            ],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn out_of_range_dirty_tile_is_clamped_away() {
        let tiles = dst_dirty_tiles(256, 256, 128, 128, 64, 64, &[TileCoord::new(512, 512)]);
        assert!(tiles.is_empty());
    }
}
