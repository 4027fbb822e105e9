#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative grid engine for a single Compynation level attempt.
//!
//! A [`Level`] owns the field of cells, the physics phase, the remaining
//! movable block count and the score. Gravity and match removal are never
//! resolved inside a move; callers drive them one phase at a time through
//! [`Level::stabilize`] so that a presentation layer can redraw between
//! phases.

mod physics;
mod skin;

use compynation_core::{
    score_for_removal, Cell, CellCoord, Command, Dimensions, Direction, Event, MoveError, Phase,
    TileRanges,
};
use rand::Rng;
use thiserror::Error;

pub use skin::RandomizeParams;

/// Decides how construction treats a layout that is not already at rest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SettlePolicy {
    /// The first stabilization call must report a stable grid.
    #[default]
    RequireStable,
    /// Falls and matches are resolved silently and the score is reset afterwards.
    Resolve,
}

/// Configuration required to construct a level.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LevelConfig {
    /// Exact size the level data must have.
    pub dimensions: Dimensions,
    /// Ranges that classify legacy cell codes.
    pub ranges: TileRanges,
    /// Treatment of layouts that are not at rest.
    pub settle: SettlePolicy,
}

/// Fatal failures while constructing a level.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    /// The level data does not have the configured shape.
    #[error(
        "level must be {} columns by {} rows, found {columns} columns by {rows} rows",
        .expected.columns(),
        .expected.rows()
    )]
    InvalidDimensions {
        /// Shape the level data was required to have.
        expected: Dimensions,
        /// Length of the first offending row, or the expected width if every row matched.
        columns: usize,
        /// Number of rows found.
        rows: usize,
    },
    /// A code belongs to neither the empty, movable, nor background range.
    #[error("unknown cell code {code} at column {}, row {}", .cell.column(), .cell.row())]
    InvalidCellCode {
        /// Offending code.
        code: i32,
        /// Location of the offending code.
        cell: CellCoord,
    },
    /// The layout needed physics before play could start.
    #[error("starting layout is not at rest after {phases} stabilization phase(s)")]
    UnstableStartingLayout {
        /// Number of phases that changed the grid before giving up.
        phases: usize,
    },
}

/// Outcome of a single stabilization phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseReport {
    /// The grid was already at rest; nothing changed.
    AlreadyStable,
    /// Blocks moved down one row.
    Fell {
        /// Number of blocks that moved.
        blocks: usize,
    },
    /// Matching blocks were removed and scored.
    Matched {
        /// Number of blocks removed.
        removed: usize,
        /// Points added to the score.
        points: u32,
    },
    /// No fall or match remained; the grid is now at rest.
    Settled,
}

impl PhaseReport {
    /// Reports whether the grid is at rest after this phase.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::AlreadyStable | Self::Settled)
    }
}

/// Grid engine state for one level attempt.
#[derive(Clone, Debug)]
pub struct Level {
    dimensions: Dimensions,
    cells: Vec<Cell>,
    phase: Phase,
    movable_count: usize,
    score: i64,
}

impl Level {
    /// Builds a level from a table of legacy cell codes, one inner slice per row.
    ///
    /// The layout is stabilized according to `config.settle` before the level
    /// is returned, so a successfully constructed level is always stable.
    pub fn from_codes<R: AsRef<[i32]>>(
        rows: &[R],
        config: &LevelConfig,
    ) -> Result<Self, LevelError> {
        let dimensions = config.dimensions;
        let expected_rows = usize::try_from(dimensions.rows()).unwrap_or(usize::MAX);
        let expected_columns = usize::try_from(dimensions.columns()).unwrap_or(usize::MAX);
        let offending_row = rows
            .iter()
            .map(|row| row.as_ref().len())
            .find(|&len| len != expected_columns);
        if rows.len() != expected_rows || offending_row.is_some() {
            return Err(LevelError::InvalidDimensions {
                expected: dimensions,
                columns: offending_row.unwrap_or(expected_columns),
                rows: rows.len(),
            });
        }

        let mut cells = Vec::with_capacity(dimensions.cell_count());
        for (row_index, row) in (0..dimensions.rows()).zip(rows) {
            for (column_index, &code) in (0..dimensions.columns()).zip(row.as_ref()) {
                let cell = config
                    .ranges
                    .classify(code)
                    .ok_or(LevelError::InvalidCellCode {
                        code,
                        cell: CellCoord::new(column_index, row_index),
                    })?;
                cells.push(cell);
            }
        }

        let movable_count = cells
            .iter()
            .filter(|cell| matches!(cell, Cell::Movable(_)))
            .count();
        let mut level = Self {
            dimensions,
            cells,
            phase: Phase::Settling,
            movable_count,
            score: 0,
        };
        level.phase = level.pending_phase();
        level.settle(config.settle)?;
        Ok(level)
    }

    fn settle(&mut self, policy: SettlePolicy) -> Result<(), LevelError> {
        match policy {
            SettlePolicy::RequireStable => {
                if !self.stabilize() {
                    return Err(LevelError::UnstableStartingLayout { phases: 1 });
                }
            }
            SettlePolicy::Resolve => {
                let rows = usize::try_from(self.dimensions.rows()).unwrap_or(usize::MAX);
                let limit = self
                    .dimensions
                    .cell_count()
                    .saturating_mul(rows.saturating_add(1))
                    .saturating_add(1);
                let mut phases = 0;
                while !self.stabilize() {
                    phases += 1;
                    if phases > limit {
                        return Err(LevelError::UnstableStartingLayout { phases });
                    }
                }
                self.score = 0;
            }
        }
        Ok(())
    }

    /// Slides the block at `cell` by a signed column offset.
    ///
    /// Returns `false` without touching the grid if the offset is not `-1`
    /// or `+1`, or if [`Level::try_move`] rejects the move.
    pub fn move_block(&mut self, cell: CellCoord, offset: i32) -> bool {
        match Direction::from_offset(offset) {
            Some(direction) => self.try_move(cell, direction).is_ok(),
            None => false,
        }
    }

    /// Slides the block at `cell` one column in `direction`.
    ///
    /// On success the grid becomes unstable and the destination cell is
    /// returned. Gravity and matching are left to [`Level::stabilize`].
    pub fn try_move(
        &mut self,
        cell: CellCoord,
        direction: Direction,
    ) -> Result<CellCoord, MoveError> {
        if !self.is_stable() {
            return Err(MoveError::Unstable);
        }
        let source = self.dimensions.index(cell).ok_or(MoveError::OutOfBounds)?;
        if !matches!(self.cells[source], Cell::Movable(_)) {
            return Err(MoveError::NotMovable);
        }
        let destination = cell.step(direction).ok_or(MoveError::OutOfBounds)?;
        let target = self
            .dimensions
            .index(destination)
            .ok_or(MoveError::OutOfBounds)?;
        if !self.cells[target].is_empty() {
            return Err(MoveError::Blocked);
        }

        self.cells[target] = self.cells[source];
        self.cells[source] = Cell::Empty;
        self.phase = self.pending_phase();
        Ok(destination)
    }

    /// Advances physics by one phase; returns `true` once the grid is at rest.
    ///
    /// Must be called repeatedly after a move until it returns `true`.
    pub fn stabilize(&mut self) -> bool {
        self.step().is_stable()
    }

    /// Advances physics by one phase and reports what happened.
    ///
    /// A phase either lets every block above an empty cell fall one row, or,
    /// when nothing can fall, removes every block that touches an equal
    /// colour and scores the batch.
    pub fn step(&mut self) -> PhaseReport {
        if self.is_stable() {
            return PhaseReport::AlreadyStable;
        }

        let blocks = physics::fall(&mut self.cells, self.dimensions);
        if blocks > 0 {
            self.phase = self.pending_phase();
            return PhaseReport::Fell { blocks };
        }

        let marked = physics::mark_matches(&self.cells, self.dimensions);
        let removed = physics::remove_marked(&mut self.cells, &marked);
        if removed == 0 {
            self.phase = Phase::Stable;
            return PhaseReport::Settled;
        }

        let points = match score_for_removal(removed) {
            Ok(points) => points,
            Err(error) => unreachable!("matches always come in pairs: {error}"),
        };
        self.movable_count = self.movable_count.saturating_sub(removed);
        self.score += i64::from(points);
        self.phase = self.pending_phase();
        PhaseReport::Matched { removed, points }
    }

    /// Work the next phase will do; never `Stable`, which only a phase that
    /// finds nothing to do may declare.
    fn pending_phase(&self) -> Phase {
        if physics::can_fall(&self.cells, self.dimensions) {
            Phase::Falling
        } else if physics::mark_matches(&self.cells, self.dimensions)
            .into_iter()
            .any(|marked| marked)
        {
            Phase::Matching
        } else {
            Phase::Settling
        }
    }

    /// Re-skins block colours and background tiles without changing mechanics.
    ///
    /// Intended to be called once, while stable, before play begins. Returns
    /// `false` and leaves the level untouched when a block colour lies outside
    /// `params.movable`.
    pub fn randomize<R: Rng + ?Sized>(
        &mut self,
        params: &RandomizeParams,
        rng: &mut R,
    ) -> bool {
        debug_assert!(self.is_stable(), "randomize requires a stable grid");
        skin::reskin(&mut self.cells, params, rng)
    }

    /// Adds `points` to the score; negative values subtract.
    pub fn add_score(&mut self, points: i64) {
        self.score += points;
    }

    /// Read-only view of the current field.
    #[must_use]
    pub fn field(&self) -> Field<'_> {
        Field {
            cells: &self.cells,
            dimensions: self.dimensions,
        }
    }

    /// Reports whether no physics are pending.
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.phase == Phase::Stable
    }

    /// Reports whether every movable block has been removed.
    #[must_use]
    pub const fn is_solved(&self) -> bool {
        self.movable_count == 0
    }

    /// Points accumulated during this level attempt.
    #[must_use]
    pub const fn score(&self) -> i64 {
        self.score
    }

    /// Number of movable blocks still on the field.
    #[must_use]
    pub const fn movable_count(&self) -> usize {
        self.movable_count
    }

    /// Phase the physics state machine is in.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Size of the field.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// Read-only view of a level's cells.
#[derive(Clone, Copy, Debug)]
pub struct Field<'a> {
    cells: &'a [Cell],
    dimensions: Dimensions,
}

impl<'a> Field<'a> {
    /// Cell at the provided coordinate, if it lies inside the grid.
    #[must_use]
    pub fn cell(&self, cell: CellCoord) -> Option<Cell> {
        self.dimensions
            .index(cell)
            .and_then(|index| self.cells.get(index).copied())
    }

    /// All cells in row-major order.
    #[must_use]
    pub fn cells(&self) -> &'a [Cell] {
        self.cells
    }

    /// Iterator over the rows of the field, top row first.
    pub fn rows(&self) -> impl Iterator<Item = &'a [Cell]> {
        let cells: &'a [Cell] = self.cells;
        let width = usize::try_from(self.dimensions.columns()).unwrap_or(usize::MAX);
        cells.chunks(width.max(1))
    }

    /// Size of the field.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Encodes the field back into legacy integer codes, one vector per row.
    #[must_use]
    pub fn to_codes(&self) -> Vec<Vec<i32>> {
        self.rows()
            .map(|row| row.iter().map(|&cell| TileRanges::encode(cell)).collect())
            .collect()
    }
}

/// Applies the provided command to the level, reporting what changed.
pub fn apply(level: &mut Level, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Move { cell, direction } => match level.try_move(cell, direction) {
            Ok(to) => out_events.push(Event::BlockMoved { from: cell, to }),
            Err(reason) => out_events.push(Event::MoveRejected {
                cell,
                direction,
                reason,
            }),
        },
        Command::Stabilize => match level.step() {
            PhaseReport::AlreadyStable => {}
            PhaseReport::Fell { blocks } => out_events.push(Event::BlocksFell { blocks }),
            PhaseReport::Matched { removed, points } => {
                out_events.push(Event::BlocksMatched { removed, points });
            }
            PhaseReport::Settled => out_events.push(Event::Settled),
        },
        Command::AddScore { points } => {
            level.add_score(points);
            out_events.push(Event::ScoreAdded { points });
        }
    }
}

/// Query functions that provide read-only summaries of a level.
pub mod query {
    use compynation_core::{Cell, CellCoord, Phase};

    use super::Level;

    /// Snapshot of the values a presentation layer polls every frame.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LevelStatus {
        /// Current physics phase.
        pub phase: Phase,
        /// Whether moves are currently accepted.
        pub stable: bool,
        /// Whether every movable block has been removed.
        pub solved: bool,
        /// Points accumulated so far.
        pub score: i64,
        /// Movable blocks still on the field.
        pub remaining: usize,
    }

    /// Captures the status values of the level.
    #[must_use]
    pub fn status(level: &Level) -> LevelStatus {
        LevelStatus {
            phase: level.phase(),
            stable: level.is_stable(),
            solved: level.is_solved(),
            score: level.score(),
            remaining: level.movable_count(),
        }
    }

    /// Enumerates the coordinates of every movable block in row-major order.
    #[must_use]
    pub fn movable_cells(level: &Level) -> Vec<CellCoord> {
        let dimensions = level.dimensions();
        (0..dimensions.rows())
            .flat_map(|row| {
                (0..dimensions.columns()).map(move |column| CellCoord::new(column, row))
            })
            .filter(|&cell| matches!(level.field().cell(cell), Some(Cell::Movable(_))))
            .collect()
    }
}
