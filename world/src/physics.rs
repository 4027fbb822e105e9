//! Synchronised gravity and match-removal phases over a dense cell slice.

use compynation_core::{Cell, CellCoord, Dimensions};

/// Moves every movable block with an empty cell directly below it down by one row.
///
/// Rows are scanned bottom to top so a stack falls together within one phase.
/// Returns the number of blocks that moved.
pub(crate) fn fall(cells: &mut [Cell], dimensions: Dimensions) -> usize {
    let mut fallen = 0;
    for row in (0..dimensions.rows().saturating_sub(1)).rev() {
        for column in 0..dimensions.columns() {
            let Some(index) = dimensions.index(CellCoord::new(column, row)) else {
                continue;
            };
            let Some(below) = dimensions.index(CellCoord::new(column, row + 1)) else {
                continue;
            };
            if matches!(cells[index], Cell::Movable(_)) && cells[below].is_empty() {
                cells[below] = cells[index];
                cells[index] = Cell::Empty;
                fallen += 1;
            }
        }
    }
    fallen
}

/// Reports whether any movable block has an empty cell directly below it.
pub(crate) fn can_fall(cells: &[Cell], dimensions: Dimensions) -> bool {
    (0..dimensions.rows().saturating_sub(1)).any(|row| {
        (0..dimensions.columns()).any(|column| {
            let above = dimensions.index(CellCoord::new(column, row));
            let below = dimensions.index(CellCoord::new(column, row + 1));
            match (above, below) {
                (Some(above), Some(below)) => {
                    matches!(cells[above], Cell::Movable(_)) && cells[below].is_empty()
                }
                _ => false,
            }
        })
    })
}

/// Marks every movable block that touches an equal colour orthogonally.
///
/// The scan reads the grid as it was before any removal, so a block keeps
/// matching partners that are themselves marked in the same pass.
pub(crate) fn mark_matches(cells: &[Cell], dimensions: Dimensions) -> Vec<bool> {
    let mut marked = vec![false; cells.len()];
    for row in 0..dimensions.rows() {
        for column in 0..dimensions.columns() {
            let cell = CellCoord::new(column, row);
            let Some(index) = dimensions.index(cell) else {
                continue;
            };
            let Some(color) = cells[index].color() else {
                continue;
            };
            marked[index] = neighbours(cell, dimensions)
                .into_iter()
                .flatten()
                .filter_map(|neighbour| dimensions.index(neighbour))
                .any(|neighbour| cells[neighbour].color() == Some(color));
        }
    }
    marked
}

/// Clears every marked cell and returns how many were removed.
pub(crate) fn remove_marked(cells: &mut [Cell], marked: &[bool]) -> usize {
    let mut removed = 0;
    for (cell, &mark) in cells.iter_mut().zip(marked) {
        if mark {
            *cell = Cell::Empty;
            removed += 1;
        }
    }
    removed
}

fn neighbours(cell: CellCoord, dimensions: Dimensions) -> [Option<CellCoord>; 4] {
    let column = cell.column();
    let row = cell.row();
    let inside = |candidate: CellCoord| dimensions.contains(candidate).then_some(candidate);
    [
        row.checked_sub(1)
            .and_then(|up| inside(CellCoord::new(column, up))),
        row.checked_add(1)
            .and_then(|down| inside(CellCoord::new(column, down))),
        column
            .checked_sub(1)
            .and_then(|left| inside(CellCoord::new(left, row))),
        column
            .checked_add(1)
            .and_then(|right| inside(CellCoord::new(right, row))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use compynation_core::{Color, TileId};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn block(color: i32) -> Cell {
        Cell::Movable(Color::new(color))
    }

    #[test]
    fn stack_falls_one_row_together() {
        let dimensions = Dimensions::new(1, 4);
        let mut cells = vec![block(1), block(2), Cell::Empty, Cell::Empty];

        assert_eq!(fall(&mut cells, dimensions), 2);
        assert_eq!(cells, vec![Cell::Empty, block(1), block(2), Cell::Empty]);
    }

    #[test]
    fn background_neither_falls_nor_lets_blocks_through() {
        let dimensions = Dimensions::new(1, 3);
        let wall = Cell::Background(TileId::new(100));
        let mut cells = vec![block(1), wall, Cell::Empty];

        assert_eq!(fall(&mut cells, dimensions), 0);
        assert_eq!(cells, vec![block(1), wall, Cell::Empty]);
    }

    #[test]
    fn bottom_row_never_falls() {
        let dimensions = Dimensions::new(2, 1);
        let mut cells = vec![block(1), Cell::Empty];
        assert_eq!(fall(&mut cells, dimensions), 0);
    }

    #[test]
    fn detects_pending_falls() {
        let dimensions = Dimensions::new(2, 2);
        assert!(can_fall(&[block(1), Cell::Empty, Cell::Empty, Cell::Empty], dimensions));
        assert!(!can_fall(&[Cell::Empty, Cell::Empty, block(1), Cell::Empty], dimensions));

        let wall = Cell::Background(TileId::new(100));
        assert!(!can_fall(&[wall, Cell::Empty, Cell::Empty, Cell::Empty], dimensions));
    }

    #[test]
    fn marks_only_cells_with_equal_neighbours() {
        let dimensions = Dimensions::new(3, 2);
        let cells = vec![
            block(1),
            block(1),
            block(2),
            block(3),
            block(1),
            block(2),
        ];

        let marked = mark_matches(&cells, dimensions);
        assert_eq!(marked, vec![true, true, true, false, true, true]);
    }

    #[test]
    fn diagonal_contact_is_not_a_match() {
        let dimensions = Dimensions::new(2, 2);
        let cells = vec![block(4), Cell::Empty, Cell::Empty, block(4)];
        assert!(mark_matches(&cells, dimensions).iter().all(|mark| !mark));
    }

    #[test]
    fn remove_marked_clears_cells() {
        let mut cells = vec![block(1), block(1), block(2)];
        let removed = remove_marked(&mut cells, &[true, true, false]);
        assert_eq!(removed, 2);
        assert_eq!(cells, vec![Cell::Empty, Cell::Empty, block(2)]);
    }

    #[test]
    fn marks_agree_with_neighbour_rule_on_random_grids() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let (columns, rows) = (6_i32, 5_i32);
        let dimensions = Dimensions::new(6, 5);
        let at = |column: i32, row: i32| usize::try_from(row * columns + column).expect("index");

        for _ in 0..20 {
            let cells: Vec<Cell> = (0..dimensions.cell_count())
                .map(|_| match rng.gen_range(0..5) {
                    0 => Cell::Empty,
                    4 => Cell::Background(TileId::new(100)),
                    color => block(color),
                })
                .collect();
            let marked = mark_matches(&cells, dimensions);

            for row in 0..rows {
                for column in 0..columns {
                    let expected = cells[at(column, row)].color().is_some_and(|color| {
                        [(0, -1), (0, 1), (-1, 0), (1, 0)].iter().any(|(dc, dr)| {
                            let (c, r) = (column + dc, row + dr);
                            (0..columns).contains(&c)
                                && (0..rows).contains(&r)
                                && cells[at(c, r)].color() == Some(color)
                        })
                    });
                    assert_eq!(marked[at(column, row)], expected, "cell ({column}, {row})");
                }
            }
        }
    }
}
