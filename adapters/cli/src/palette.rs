use std::collections::HashMap;

use compynation_core::{Cell, Color, TileId, TileRanges, BACK_DEFAULT_TILE};

const EMPTY_GLYPH: char = '.';
const DEFAULT_BACKGROUND_GLYPH: char = '#';
const UNKNOWN_GLYPH: char = '?';
const BLOCK_GLYPHS: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S',
    'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
];
const BACKGROUND_GLYPHS: &[char] = &['%', '=', '+', '*', '&', '$', '~', '^', ':', ';', '!'];

/// Registry that maps every known cell to the glyph it is drawn with.
///
/// Built once at startup from the tile ranges so drawing never has to
/// classify codes again.
#[derive(Clone, Debug)]
pub(crate) struct TilePalette {
    glyphs: HashMap<Cell, char>,
}

impl TilePalette {
    /// Assigns glyphs to the empty cell and every code in `ranges`.
    #[must_use]
    pub(crate) fn new(ranges: &TileRanges) -> Self {
        let mut glyphs = HashMap::new();
        let _ = glyphs.insert(Cell::Empty, EMPTY_GLYPH);

        for (code, &glyph) in ranges.movable().clone().zip(BLOCK_GLYPHS.iter().cycle()) {
            let _ = glyphs.insert(Cell::Movable(Color::new(code)), glyph);
        }

        let mut decorations = BACKGROUND_GLYPHS.iter().cycle();
        for code in ranges.background().clone() {
            let glyph = if code == BACK_DEFAULT_TILE {
                DEFAULT_BACKGROUND_GLYPH
            } else {
                decorations.next().copied().unwrap_or(DEFAULT_BACKGROUND_GLYPH)
            };
            let _ = glyphs.insert(Cell::Background(TileId::new(code)), glyph);
        }

        Self { glyphs }
    }

    /// Glyph for `cell`, or a marker for cells outside the registry.
    #[must_use]
    pub(crate) fn glyph(&self, cell: Cell) -> char {
        self.glyphs.get(&cell).copied().unwrap_or(UNKNOWN_GLYPH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colours_map_to_letters() {
        let palette = TilePalette::new(&TileRanges::default());
        assert_eq!(palette.glyph(Cell::Empty), '.');
        assert_eq!(palette.glyph(Cell::Movable(Color::new(1))), 'A');
        assert_eq!(palette.glyph(Cell::Movable(Color::new(15))), 'O');
    }

    #[test]
    fn default_background_is_solid() {
        let palette = TilePalette::new(&TileRanges::default());
        assert_eq!(palette.glyph(Cell::Background(TileId::new(100))), '#');
        assert_eq!(palette.glyph(Cell::Background(TileId::new(101))), '%');
        assert_ne!(palette.glyph(Cell::Background(TileId::new(117))), '?');
    }

    #[test]
    fn cells_outside_the_ranges_are_marked() {
        let palette = TilePalette::new(&TileRanges::new(1..=3, 100..=101));
        assert_eq!(palette.glyph(Cell::Movable(Color::new(4))), '?');
        assert_eq!(palette.glyph(Cell::Background(TileId::new(117))), '?');
    }
}
