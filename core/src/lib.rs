#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Compynation puzzle engine.
//!
//! This crate defines the vocabulary that connects the level loader, the
//! authoritative grid engine, and presentation adapters. Adapters submit
//! [`Command`] values describing player intent, the engine executes those
//! commands via its `apply` entry point, and then reports [`Event`] values
//! describing what changed. Cell contents are modelled as a tagged [`Cell`];
//! the legacy integer encoding used by level files is only understood by
//! [`TileRanges`] at the boundary.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of grid columns.
pub const DEFAULT_COLUMNS: u32 = 14;
/// Default number of grid rows.
pub const DEFAULT_ROWS: u32 = 10;

/// Lowest legacy code that denotes a movable block.
pub const MOVE_MIN_TILE: i32 = 1;
/// Highest legacy code that denotes a movable block.
pub const MOVE_MAX_TILE: i32 = 15;
/// Lowest legacy code that denotes a background tile.
pub const BACK_MIN_TILE: i32 = 100;
/// Highest legacy code that denotes a background tile.
pub const BACK_MAX_TILE: i32 = 117;
/// Background tile used for most cells when a level is re-skinned.
pub const BACK_DEFAULT_TILE: i32 = 100;
/// Probability that a re-skinned background cell receives the default tile.
pub const DEFAULT_BACKGROUND_PROBABILITY: f64 = 0.7;

/// Legacy code of an empty cell.
pub const EMPTY_CODE: i32 = 0;

/// Colour identity of a movable block. Two blocks match iff their colours are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Color(i32);

impl Color {
    /// Wraps the provided colour code.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric colour code.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

/// Identifier of an immovable background decoration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(i32);

impl TileId {
    /// Wraps the provided tile code.
    #[must_use]
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric tile code.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

/// Occupant of a single grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Nothing occupies the cell.
    #[default]
    Empty,
    /// A player-controllable block that slides, falls and matches.
    Movable(Color),
    /// A decoration that blocks movement but never falls or matches.
    Background(TileId),
}

impl Cell {
    /// Reports whether the cell holds nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Colour of the block, if the cell holds a movable block.
    #[must_use]
    pub const fn color(&self) -> Option<Color> {
        match self {
            Self::Movable(color) => Some(*color),
            _ => None,
        }
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Row zero is the top of the grid; gravity pulls toward increasing rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Neighbouring cell in the provided horizontal direction, if it is representable.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let column = match direction {
            Direction::Left => self.column.checked_sub(1)?,
            Direction::Right => self.column.checked_add(1)?,
        };
        Some(CellCoord::new(column, self.row))
    }
}

/// Horizontal directions a block may slide in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing column indices.
    Left,
    /// Movement toward increasing column indices.
    Right,
}

impl Direction {
    /// Interprets a signed column offset; only `-1` and `+1` are directions.
    #[must_use]
    pub const fn from_offset(offset: i32) -> Option<Self> {
        match offset {
            -1 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }

    /// Signed column offset described by the direction.
    #[must_use]
    pub const fn offset(self) -> i32 {
        match self {
            Self::Left => -1,
            Self::Right => 1,
        }
    }
}

/// Size of a grid measured in whole cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    columns: u32,
    rows: u32,
}

impl Dimensions {
    /// Creates a new size descriptor with explicit dimensions.
    #[must_use]
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Total number of cells covered by the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Reports whether the coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && cell.row() < self.rows
    }

    /// Dense row-major index of the coordinate, if it lies inside the grid.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS, DEFAULT_ROWS)
    }
}

/// Legacy integer ranges that classify level file codes into cells.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRanges {
    movable: RangeInclusive<i32>,
    background: RangeInclusive<i32>,
}

impl TileRanges {
    /// Creates a classifier from explicit movable and background ranges.
    #[must_use]
    pub const fn new(movable: RangeInclusive<i32>, background: RangeInclusive<i32>) -> Self {
        Self {
            movable,
            background,
        }
    }

    /// Codes interpreted as movable block colours.
    #[must_use]
    pub fn movable(&self) -> &RangeInclusive<i32> {
        &self.movable
    }

    /// Codes interpreted as background tiles.
    #[must_use]
    pub fn background(&self) -> &RangeInclusive<i32> {
        &self.background
    }

    /// Converts a legacy code into a cell, or `None` when the code is in no range.
    ///
    /// Movable classification wins if a caller configures overlapping ranges.
    #[must_use]
    pub fn classify(&self, code: i32) -> Option<Cell> {
        if code == EMPTY_CODE {
            Some(Cell::Empty)
        } else if self.movable.contains(&code) {
            Some(Cell::Movable(Color::new(code)))
        } else if self.background.contains(&code) {
            Some(Cell::Background(TileId::new(code)))
        } else {
            None
        }
    }

    /// Converts a cell back into its legacy code.
    #[must_use]
    pub const fn encode(cell: Cell) -> i32 {
        match cell {
            Cell::Empty => EMPTY_CODE,
            Cell::Movable(color) => color.get(),
            Cell::Background(tile) => tile.get(),
        }
    }
}

impl Default for TileRanges {
    fn default() -> Self {
        Self::new(MOVE_MIN_TILE..=MOVE_MAX_TILE, BACK_MIN_TILE..=BACK_MAX_TILE)
    }
}

/// Physics state of the grid engine, named after the work still pending.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// The grid is confirmed at rest; the player may move blocks.
    Stable,
    /// At least one movable block has an empty cell directly below it.
    Falling,
    /// Nothing can fall, but some movable block touches an equal colour.
    Matching,
    /// Nothing can fall or match; the next phase confirms the grid at rest.
    Settling,
}

/// Commands that express all permissible mutations of a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Requests that the block at `cell` slides one column.
    Move {
        /// Cell holding the block to slide.
        cell: CellCoord,
        /// Direction of travel.
        direction: Direction,
    },
    /// Advances the physics state machine by exactly one phase.
    Stabilize,
    /// Adds points to the level score; negative values subtract.
    AddScore {
        /// Points to add.
        points: i64,
    },
}

/// Events reported by the engine after processing commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Confirms that a block slid between two cells.
    BlockMoved {
        /// Cell the block occupied before sliding.
        from: CellCoord,
        /// Cell the block occupies after sliding.
        to: CellCoord,
    },
    /// Reports that a move request was rejected without mutation.
    MoveRejected {
        /// Cell named by the rejected request.
        cell: CellCoord,
        /// Direction named by the rejected request.
        direction: Direction,
        /// Specific reason the move failed.
        reason: MoveError,
    },
    /// Reports that one falling phase moved blocks down by one row.
    BlocksFell {
        /// Number of blocks that moved.
        blocks: usize,
    },
    /// Reports that one matching phase removed blocks.
    BlocksMatched {
        /// Number of blocks removed.
        removed: usize,
        /// Points awarded for the removal batch.
        points: u32,
    },
    /// Announces that the grid came to rest.
    Settled,
    /// Confirms that points were added to the score.
    ScoreAdded {
        /// Points that were added.
        points: i64,
    },
}

/// Reasons a move request may be rejected by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum MoveError {
    /// Physics are still resolving; moves are accepted only while stable.
    #[error("the grid is still settling")]
    Unstable,
    /// The source or target cell lies outside the grid.
    #[error("the cell lies outside the grid")]
    OutOfBounds,
    /// The column offset was neither -1 nor +1.
    #[error("blocks only slide one column left or right")]
    InvalidDirection,
    /// The source cell does not hold a movable block.
    #[error("the cell does not hold a movable block")]
    NotMovable,
    /// The target cell is occupied.
    #[error("the target cell is occupied")]
    Blocked,
}

/// Failure of the scoring rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// A removal batch always has at least two blocks.
    #[error("a removal batch needs at least two blocks, got {count}")]
    InvalidRemovalCount {
        /// Size of the offending batch.
        count: usize,
    },
}

/// Points awarded for removing `count` blocks in a single matching phase.
///
/// Pairs score 20, triples 40, and larger batches 15 points per block.
pub fn score_for_removal(count: usize) -> Result<u32, ScoringError> {
    match count {
        0 | 1 => Err(ScoringError::InvalidRemovalCount { count }),
        2 => Ok(20),
        3 => Ok(40),
        n => Ok(u32::try_from(n).unwrap_or(u32::MAX).saturating_mul(15)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn scoring_table_matches_rules() {
        assert_eq!(score_for_removal(2), Ok(20));
        assert_eq!(score_for_removal(3), Ok(40));
        assert_eq!(score_for_removal(4), Ok(60));
        assert_eq!(score_for_removal(5), Ok(75));
        assert_eq!(
            score_for_removal(1),
            Err(ScoringError::InvalidRemovalCount { count: 1 })
        );
        assert!(score_for_removal(0).is_err());
    }

    #[test]
    fn classify_respects_default_ranges() {
        let ranges = TileRanges::default();
        assert_eq!(ranges.classify(0), Some(Cell::Empty));
        assert_eq!(ranges.classify(1), Some(Cell::Movable(Color::new(1))));
        assert_eq!(ranges.classify(15), Some(Cell::Movable(Color::new(15))));
        assert_eq!(ranges.classify(100), Some(Cell::Background(TileId::new(100))));
        assert_eq!(ranges.classify(117), Some(Cell::Background(TileId::new(117))));
        assert_eq!(ranges.classify(16), None);
        assert_eq!(ranges.classify(-3), None);
        assert_eq!(ranges.classify(118), None);
    }

    #[test]
    fn encode_inverts_classify() {
        let ranges = TileRanges::default();
        for code in [0, 4, 104] {
            let cell = ranges.classify(code).expect("known code");
            assert_eq!(TileRanges::encode(cell), code);
        }
    }

    #[test]
    fn direction_accepts_only_unit_offsets() {
        assert_eq!(Direction::from_offset(-1), Some(Direction::Left));
        assert_eq!(Direction::from_offset(1), Some(Direction::Right));
        assert_eq!(Direction::from_offset(0), None);
        assert_eq!(Direction::from_offset(-2), None);
        assert_eq!(Direction::Left.offset(), -1);
    }

    #[test]
    fn step_stops_at_left_edge() {
        let origin = CellCoord::new(0, 3);
        assert_eq!(origin.step(Direction::Left), None);
        assert_eq!(origin.step(Direction::Right), Some(CellCoord::new(1, 3)));
    }

    #[test]
    fn dimensions_index_is_row_major() {
        let dimensions = Dimensions::default();
        assert_eq!(dimensions.cell_count(), 140);
        assert_eq!(dimensions.index(CellCoord::new(3, 2)), Some(31));
        assert_eq!(dimensions.index(CellCoord::new(14, 0)), None);
        assert_eq!(dimensions.index(CellCoord::new(0, 10)), None);
    }

    #[test]
    fn events_round_trip_through_bincode() {
        assert_round_trip(&Event::BlocksMatched {
            removed: 3,
            points: 40,
        });
        assert_round_trip(&Event::MoveRejected {
            cell: CellCoord::new(2, 4),
            direction: Direction::Left,
            reason: MoveError::Blocked,
        });
    }
}
