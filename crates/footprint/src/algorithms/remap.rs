use crate::types::{Outline, TileIndex};

/// Shift an outline from tile-local into mosaic-global pixel space.
pub fn remap(outline: &Outline, tile: TileIndex, tile_size: u32) -> Outline {
    let (dx, dy) = tile.offset(tile_size);
    outline.map_points(|[x, y]| [x + dx, y + dy])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Outline {
        Outline::new(vec![[1.0, 1.0], [5.0, 1.0], [5.0, 5.0], [1.0, 5.0]])
    }

    #[test]
    fn test_origin_tile_is_identity() {
        assert_eq!(remap(&square(), TileIndex::default(), 256), square());
    }

    #[test]
    fn test_offsets_by_column_and_row() {
        let moved = remap(&square(), TileIndex::new(2, 3), 256);
        assert_eq!(moved.points()[0], [513.0, 769.0]);
        assert_eq!(moved.points()[2], [517.0, 773.0]);
    }

    #[test]
    fn test_negated_tile_inverts() {
        let tile = TileIndex::new(4, 1);
        let back = remap(&remap(&square(), tile, 512), TileIndex::new(-4, -1), 512);
        assert_eq!(back, square());
    }

    #[test]
    fn test_empty_stays_empty() {
        assert!(remap(&Outline::empty(), TileIndex::new(1, 1), 256).is_empty());
    }
}
