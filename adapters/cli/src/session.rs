use std::{
    io::{BufRead, Write},
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use compynation_core::{CellCoord, Command, Direction, Event};
use compynation_system_run::{LevelEntry, TimeBudget};
use compynation_world::{apply, query, Level};

use crate::palette::TilePalette;

/// A single line of player input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerInput {
    /// Slide the block at `cell` one column.
    Move {
        cell: CellCoord,
        direction: Direction,
    },
    /// Give up the current attempt.
    Restart,
    /// Leave the game.
    Quit,
}

/// How a level attempt ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AttemptOutcome {
    /// Every block was removed; `score` includes the time bonus.
    Solved { score: i64 },
    /// The time budget ran out before the level was solved.
    TimedOut,
    /// The player abandoned the attempt.
    Restarted,
    /// The player quit or the input closed.
    Quit,
}

/// Parses `x y left|right`, `restart` or `quit`.
pub(crate) fn parse_input(line: &str) -> Result<PlayerInput> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["quit" | "q"] => Ok(PlayerInput::Quit),
        ["restart"] => Ok(PlayerInput::Restart),
        [column, row, direction] => {
            let column = column
                .parse::<u32>()
                .with_context(|| format!("`{column}` is not a column"))?;
            let row = row
                .parse::<u32>()
                .with_context(|| format!("`{row}` is not a row"))?;
            let direction = match *direction {
                "left" | "l" => Direction::Left,
                "right" | "r" => Direction::Right,
                other => bail!("`{other}` is not a direction; use left or right"),
            };
            Ok(PlayerInput::Move {
                cell: CellCoord::new(column, row),
                direction,
            })
        }
        _ => bail!("expected `x y left|right`, `restart` or `quit`"),
    }
}

/// Text-mode play loop bound to an input and an output stream.
pub(crate) struct Session<'a, R, W> {
    palette: &'a TilePalette,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub(crate) fn new(palette: &'a TilePalette, input: R, output: W) -> Self {
        Self {
            palette,
            input,
            output,
        }
    }

    /// Prints the banner shown before each attempt.
    pub(crate) fn announce_level(
        &mut self,
        entry: &LevelEntry,
        lives: u32,
        budget: Option<TimeBudget>,
    ) -> Result<()> {
        writeln!(self.output, "== level {} == lives: {lives}", entry.index)?;
        if let Some(budget) = budget {
            writeln!(
                self.output,
                "solve it within {} seconds",
                budget.limit().as_secs()
            )?;
        }
        Ok(())
    }

    /// Prints the password that unlocks `entry`.
    pub(crate) fn announce_password(&mut self, entry: &LevelEntry) -> Result<()> {
        writeln!(
            self.output,
            "next up: level {}, password: {}",
            entry.index, entry.password
        )?;
        Ok(())
    }

    /// Prints a one-line notice.
    pub(crate) fn notice(&mut self, message: &str) -> Result<()> {
        writeln!(self.output, "{message}")?;
        Ok(())
    }

    /// Plays one attempt at `level` until it is solved, abandoned or out of time.
    pub(crate) fn play(
        &mut self,
        level: &mut Level,
        budget: Option<TimeBudget>,
    ) -> Result<AttemptOutcome> {
        let started = Instant::now();
        let mut events = Vec::new();
        self.draw(level, budget, started.elapsed())?;
        if level.is_solved() {
            return Ok(AttemptOutcome::Solved {
                score: level.score(),
            });
        }

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(AttemptOutcome::Quit);
            }
            if line.trim().is_empty() {
                continue;
            }

            let input = match parse_input(&line) {
                Ok(input) => input,
                Err(error) => {
                    writeln!(self.output, "{error:#}")?;
                    continue;
                }
            };

            let (cell, direction) = match input {
                PlayerInput::Quit => return Ok(AttemptOutcome::Quit),
                PlayerInput::Restart => return Ok(AttemptOutcome::Restarted),
                PlayerInput::Move { cell, direction } => (cell, direction),
            };

            if budget.is_some_and(|budget| budget.is_expired(started.elapsed())) {
                return Ok(AttemptOutcome::TimedOut);
            }

            events.clear();
            apply(level, Command::Move { cell, direction }, &mut events);
            self.report(&events)?;

            while !level.is_stable() {
                events.clear();
                apply(level, Command::Stabilize, &mut events);
                self.report(&events)?;
                let changed = events.iter().any(|event| {
                    matches!(event, Event::BlocksFell { .. } | Event::BlocksMatched { .. })
                });
                if changed {
                    self.draw(level, budget, started.elapsed())?;
                }
            }

            if level.is_solved() {
                if let Some(budget) = budget {
                    events.clear();
                    let points = budget.bonus(started.elapsed());
                    apply(level, Command::AddScore { points }, &mut events);
                    self.report(&events)?;
                }
                return Ok(AttemptOutcome::Solved {
                    score: level.score(),
                });
            }
        }
    }

    /// Prints the final summary of a run.
    pub(crate) fn finish(&mut self, total_score: i64, completed: bool) -> Result<()> {
        if completed {
            writeln!(self.output, "all levels solved!")?;
        } else {
            writeln!(self.output, "game over")?;
        }
        writeln!(self.output, "final score: {total_score}")?;
        Ok(())
    }

    fn draw(&mut self, level: &Level, budget: Option<TimeBudget>, elapsed: Duration) -> Result<()> {
        let status = query::status(level);
        write!(
            self.output,
            "score: {}  blocks left: {}",
            status.score, status.remaining
        )?;
        if let Some(budget) = budget {
            write!(self.output, "  time: {}s", budget.remaining(elapsed).as_secs())?;
        }
        writeln!(self.output)?;

        let header: String = (0..level.dimensions().columns())
            .map(|column| char::from_digit(column % 10, 10).unwrap_or(' '))
            .collect();
        writeln!(self.output, "   {header}")?;
        for (row, cells) in level.field().rows().enumerate() {
            let line: String = cells.iter().map(|&cell| self.palette.glyph(cell)).collect();
            writeln!(self.output, "{row:>2} {line}")?;
        }
        Ok(())
    }

    fn report(&mut self, events: &[Event]) -> Result<()> {
        for event in events {
            match *event {
                Event::MoveRejected {
                    cell,
                    direction,
                    reason,
                } => {
                    let direction = match direction {
                        Direction::Left => "left",
                        Direction::Right => "right",
                    };
                    writeln!(
                        self.output,
                        "cannot move ({}, {}) {direction}: {reason}",
                        cell.column(),
                        cell.row()
                    )?;
                }
                Event::BlocksMatched { removed, points } => {
                    writeln!(self.output, "{removed} blocks cleared, +{points}")?;
                }
                Event::ScoreAdded { points } => {
                    writeln!(self.output, "time bonus +{points}")?;
                }
                Event::BlockMoved { .. } | Event::BlocksFell { .. } | Event::Settled => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use compynation_core::{Dimensions, TileRanges};
    use compynation_world::LevelConfig;

    use super::*;

    fn small_level() -> Level {
        let config = LevelConfig {
            dimensions: Dimensions::new(3, 2),
            ..LevelConfig::default()
        };
        Level::from_codes(&[[1, 0, 0], [100, 0, 1]], &config).expect("level is at rest")
    }

    fn play(
        level: &mut Level,
        script: &str,
        budget: Option<TimeBudget>,
    ) -> (AttemptOutcome, String) {
        let palette = TilePalette::new(&TileRanges::default());
        let mut output = Vec::new();
        let outcome = Session::new(&palette, Cursor::new(script), &mut output)
            .play(level, budget)
            .expect("session runs");
        (outcome, String::from_utf8(output).expect("utf-8 output"))
    }

    #[test]
    fn parses_moves_and_keywords() {
        assert_eq!(
            parse_input("3 4 left").expect("move"),
            PlayerInput::Move {
                cell: CellCoord::new(3, 4),
                direction: Direction::Left,
            }
        );
        assert_eq!(
            parse_input(" 0 9 r\n").expect("short move"),
            PlayerInput::Move {
                cell: CellCoord::new(0, 9),
                direction: Direction::Right,
            }
        );
        assert_eq!(parse_input("quit").expect("quit"), PlayerInput::Quit);
        assert_eq!(parse_input("restart").expect("restart"), PlayerInput::Restart);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_input("3 left").is_err());
        assert!(parse_input("-1 0 left").is_err());
        assert!(parse_input("1 1 up").is_err());
    }

    #[test]
    fn solving_reports_the_level_score() {
        let mut level = small_level();
        let (outcome, output) = play(&mut level, "0 0 right\n", None);

        assert_eq!(outcome, AttemptOutcome::Solved { score: 20 });
        assert!(output.contains("2 blocks cleared, +20"));
        assert!(output.contains(" 1 #.."));
    }

    #[test]
    fn solving_within_the_budget_adds_a_bonus() {
        let mut level = small_level();
        let budget = TimeBudget::new(Duration::from_secs(3600));
        let (outcome, output) = play(&mut level, "0 0 r\n", Some(budget));

        let AttemptOutcome::Solved { score } = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert!(score > 20);
        assert!(output.contains("time bonus +"));
    }

    #[test]
    fn level_without_blocks_is_solved_before_any_input() {
        let config = LevelConfig {
            dimensions: Dimensions::new(2, 2),
            ..LevelConfig::default()
        };
        let mut level = Level::from_codes(&[[0, 0], [100, 100]], &config).expect("valid");
        let budget = TimeBudget::new(Duration::from_secs(60));

        let (outcome, output) = play(&mut level, "", Some(budget));
        assert_eq!(outcome, AttemptOutcome::Solved { score: 0 });
        assert!(!output.contains('>'));
    }

    #[test]
    fn rejected_moves_and_bad_input_keep_playing() {
        let mut level = small_level();
        let (outcome, output) = play(&mut level, "0 0 left\nnonsense\nquit\n", None);

        assert_eq!(outcome, AttemptOutcome::Quit);
        assert!(output.contains("cannot move (0, 0) left"));
        assert!(output.contains("expected `x y left|right`"));
        assert_eq!(level.movable_count(), 2);
    }

    #[test]
    fn restart_and_end_of_input_end_the_attempt() {
        let mut level = small_level();
        assert_eq!(play(&mut level, "restart\n", None).0, AttemptOutcome::Restarted);
        assert_eq!(play(&mut level, "", None).0, AttemptOutcome::Quit);
    }

    #[test]
    fn expired_budget_times_out() {
        let mut level = small_level();
        let budget = TimeBudget::new(Duration::ZERO);
        let (outcome, _) = play(&mut level, "0 0 right\n", Some(budget));
        assert_eq!(outcome, AttemptOutcome::TimedOut);
        assert_eq!(level.movable_count(), 2);
    }
}
