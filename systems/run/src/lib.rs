#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Run tracking system that sequences levels across one playthrough.
//!
//! A run starts either at the first level or at the level unlocked by a
//! password, advances one level at a time, and keeps the cumulative score
//! and the remaining lives. Per-level time budgets are evaluated against
//! elapsed time supplied by the caller; the tracker never reads a clock.

use std::{
    collections::{BTreeMap, HashMap},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lives granted at the start of a run.
pub const STARTING_LIVES: u32 = 3;
/// Points awarded per whole second left on a level's clock.
pub const TIME_BONUS_PER_SECOND: i64 = 10;

/// One level in the run's ordered sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelEntry {
    /// Position of the level in the sequence; the lowest index is played first.
    pub index: u32,
    /// Password that starts a run at this level.
    #[serde(default)]
    pub password: String,
    /// Identifier the level loader resolves, such as a file name.
    pub level: String,
    /// Seconds allowed to solve the level when playing against the clock.
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
}

impl LevelEntry {
    /// Time budget for the level, if it has one.
    #[must_use]
    pub fn time_budget(&self) -> Option<TimeBudget> {
        self.time_limit_secs
            .map(|secs| TimeBudget::new(Duration::from_secs(secs)))
    }
}

/// Misuse of the run tracker.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RunError {
    /// A run needs at least one level.
    #[error("the level list is empty")]
    EmptyLevelList,
    /// Two entries share an index.
    #[error("level index {index} appears more than once")]
    DuplicateIndex {
        /// Repeated index.
        index: u32,
    },
    /// A run can only be started once.
    #[error("the run has already started")]
    AlreadyStarted,
    /// The operation needs a started run.
    #[error("the run has not started yet")]
    NotStarted,
}

/// Result of losing a level attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// Lives remain; the same level should be retried.
    Retry {
        /// Lives left after the failed attempt.
        lives: u32,
    },
    /// No lives remain; the run is over.
    GameOver,
}

/// Wall-clock allowance for a single level attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeBudget {
    limit: Duration,
}

impl TimeBudget {
    /// Creates a budget with the provided limit.
    #[must_use]
    pub const fn new(limit: Duration) -> Self {
        Self { limit }
    }

    /// Total time allowed.
    #[must_use]
    pub const fn limit(&self) -> Duration {
        self.limit
    }

    /// Time left after `elapsed`, never negative.
    #[must_use]
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.limit.saturating_sub(elapsed)
    }

    /// Reports whether the budget has run out.
    #[must_use]
    pub fn is_expired(&self, elapsed: Duration) -> bool {
        elapsed >= self.limit
    }

    /// Bonus points for solving the level with time to spare.
    #[must_use]
    pub fn bonus(&self, elapsed: Duration) -> i64 {
        let seconds = i64::try_from(self.remaining(elapsed).as_secs()).unwrap_or(i64::MAX);
        seconds.saturating_mul(TIME_BONUS_PER_SECOND)
    }
}

/// Sequencer for one playthrough across the level list.
#[derive(Clone, Debug)]
pub struct RunTracker {
    entries: BTreeMap<u32, LevelEntry>,
    by_password: HashMap<String, u32>,
    current: Option<u32>,
    lives: u32,
    total_score: i64,
}

impl RunTracker {
    /// Creates a tracker over the provided entries with [`STARTING_LIVES`] lives.
    pub fn new(entries: Vec<LevelEntry>) -> Result<Self, RunError> {
        Self::with_lives(entries, STARTING_LIVES)
    }

    /// Creates a tracker over the provided entries with a custom number of lives.
    ///
    /// When several entries share a password, the password unlocks the one
    /// with the lowest index.
    pub fn with_lives(entries: Vec<LevelEntry>, lives: u32) -> Result<Self, RunError> {
        if entries.is_empty() {
            return Err(RunError::EmptyLevelList);
        }

        let mut by_index = BTreeMap::new();
        let mut by_password = HashMap::new();
        for entry in entries {
            let index = entry.index;
            let unlocked = by_password.entry(entry.password.clone()).or_insert(index);
            *unlocked = (*unlocked).min(index);
            if by_index.insert(index, entry).is_some() {
                return Err(RunError::DuplicateIndex { index });
            }
        }

        Ok(Self {
            entries: by_index,
            by_password,
            current: None,
            lives,
            total_score: 0,
        })
    }

    /// Starts the run at the first level.
    pub fn first(&mut self) -> Result<&LevelEntry, RunError> {
        if self.current.is_some() {
            return Err(RunError::AlreadyStarted);
        }
        let index = self.first_index()?;
        self.enter(index)
    }

    /// Starts the run at the level unlocked by `password`.
    ///
    /// Unknown passwords start at the first level.
    pub fn by_password(&mut self, password: &str) -> Result<&LevelEntry, RunError> {
        if self.current.is_some() {
            return Err(RunError::AlreadyStarted);
        }
        let index = match self.by_password.get(password) {
            Some(&index) => index,
            None => self.first_index()?,
        };
        self.enter(index)
    }

    /// Advances to the following level, or returns `None` after the last one.
    pub fn next(&mut self) -> Result<Option<&LevelEntry>, RunError> {
        let current = self.current.ok_or(RunError::NotStarted)?;
        let following = self
            .entries
            .range(current.saturating_add(1)..)
            .next()
            .map(|(&index, _)| index);
        match following {
            Some(index) => self.enter(index).map(Some),
            None => Ok(None),
        }
    }

    /// Entry of the level currently being played.
    pub fn current(&self) -> Result<&LevelEntry, RunError> {
        let index = self.current.ok_or(RunError::NotStarted)?;
        self.entries.get(&index).ok_or(RunError::NotStarted)
    }

    /// Password of the level currently being played.
    pub fn password(&self) -> Result<&str, RunError> {
        self.current().map(|entry| entry.password.as_str())
    }

    /// Index of the current level, or `None` before the run starts.
    #[must_use]
    pub const fn index(&self) -> Option<u32> {
        self.current
    }

    /// Highest level index in the sequence.
    #[must_use]
    pub fn last(&self) -> u32 {
        self.entries.keys().next_back().copied().unwrap_or_default()
    }

    /// Adds a solved level's score to the run total.
    pub fn complete_level(&mut self, level_score: i64) {
        self.total_score = self.total_score.saturating_add(level_score);
    }

    /// Spends a life after a failed attempt.
    pub fn fail_level(&mut self) -> RunStatus {
        self.lives = self.lives.saturating_sub(1);
        if self.lives == 0 {
            RunStatus::GameOver
        } else {
            RunStatus::Retry { lives: self.lives }
        }
    }

    /// Lives left in the run.
    #[must_use]
    pub const fn lives(&self) -> u32 {
        self.lives
    }

    /// Score accumulated over every solved level.
    #[must_use]
    pub const fn total_score(&self) -> i64 {
        self.total_score
    }

    fn first_index(&self) -> Result<u32, RunError> {
        self.entries
            .keys()
            .next()
            .copied()
            .ok_or(RunError::EmptyLevelList)
    }

    fn enter(&mut self, index: u32) -> Result<&LevelEntry, RunError> {
        self.current = Some(index);
        self.entries.get(&index).ok_or(RunError::NotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bonus_counts_whole_seconds_left() {
        let budget = TimeBudget::new(Duration::from_secs(60));
        assert_eq!(budget.bonus(Duration::from_millis(15_500)), 440);
        assert_eq!(budget.bonus(Duration::from_secs(90)), 0);
        assert!(!budget.is_expired(Duration::from_secs(59)));
        assert!(budget.is_expired(Duration::from_secs(60)));
        assert_eq!(budget.remaining(Duration::from_secs(75)), Duration::ZERO);
    }

    #[test]
    fn lives_run_out() {
        let entry = LevelEntry {
            index: 1,
            password: String::new(),
            level: "level_01".to_owned(),
            time_limit_secs: None,
        };
        let mut tracker = RunTracker::with_lives(vec![entry], 2).expect("tracker");
        assert_eq!(tracker.fail_level(), RunStatus::Retry { lives: 1 });
        assert_eq!(tracker.fail_level(), RunStatus::GameOver);
        assert_eq!(tracker.lives(), 0);
    }
}
