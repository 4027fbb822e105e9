//! Cosmetic re-skinning of a level before play begins.

use std::ops::RangeInclusive;

use compynation_core::{
    Cell, Color, TileId, BACK_DEFAULT_TILE, BACK_MAX_TILE, BACK_MIN_TILE,
    DEFAULT_BACKGROUND_PROBABILITY, MOVE_MAX_TILE, MOVE_MIN_TILE,
};
use rand::Rng;

/// Ranges and odds used when re-skinning a level.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomizeParams {
    /// Colour range that movable blocks are permuted within.
    pub movable: RangeInclusive<i32>,
    /// Tile range that background cells are redrawn from.
    pub background: RangeInclusive<i32>,
    /// Tile assigned to most background cells.
    pub default_background: i32,
    /// Probability that a background cell receives `default_background`.
    pub default_probability: f64,
}

impl RandomizeParams {
    /// Creates parameters with the default background probability.
    #[must_use]
    pub fn new(
        movable: RangeInclusive<i32>,
        background: RangeInclusive<i32>,
        default_background: i32,
    ) -> Self {
        Self {
            movable,
            background,
            default_background,
            default_probability: DEFAULT_BACKGROUND_PROBABILITY,
        }
    }
}

impl Default for RandomizeParams {
    fn default() -> Self {
        Self::new(
            MOVE_MIN_TILE..=MOVE_MAX_TILE,
            BACK_MIN_TILE..=BACK_MAX_TILE,
            BACK_DEFAULT_TILE,
        )
    }
}

/// Applies one cyclic colour shift to every block and redraws every background tile.
///
/// Colours inside `params.movable` are permuted bijectively, so blocks that
/// matched before still match and blocks that differed still differ. Returns
/// `false` without touching the cells when a block colour lies outside
/// `params.movable`, since the shift would merge it with an in-range colour.
pub(crate) fn reskin<R: Rng + ?Sized>(
    cells: &mut [Cell],
    params: &RandomizeParams,
    rng: &mut R,
) -> bool {
    let covered = cells
        .iter()
        .filter_map(Cell::color)
        .all(|color| params.movable.contains(&color.get()));
    if !covered {
        return false;
    }

    let shift = if params.movable.is_empty() {
        None
    } else {
        Some(rng.gen_range(params.movable.clone()))
    };
    let probability = params.default_probability.clamp(0.0, 1.0);

    for cell in cells.iter_mut() {
        match *cell {
            Cell::Movable(color) => {
                if let Some(shift) = shift {
                    *cell = Cell::Movable(shift_color(color, shift, &params.movable));
                }
            }
            Cell::Background(_) => {
                let tile = if params.background.is_empty() || rng.gen_bool(probability) {
                    params.default_background
                } else {
                    rng.gen_range(params.background.clone())
                };
                *cell = Cell::Background(TileId::new(tile));
            }
            Cell::Empty => {}
        }
    }
    true
}

fn shift_color(color: Color, shift: i32, range: &RangeInclusive<i32>) -> Color {
    let min = i64::from(*range.start());
    let span = i64::from(*range.end()) - min + 1;
    let shifted = min + (i64::from(color.get()) + i64::from(shift)).rem_euclid(span);
    Color::new(i32::try_from(shifted).unwrap_or(color.get()))
}
