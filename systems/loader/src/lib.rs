#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level loader that turns plain-text level tables into playable levels.
//!
//! A level file holds one grid row per line with whitespace-separated cell
//! codes. Blank lines and lines starting with `#` are ignored, and codes may
//! be written as integral decimals such as `100.0`.

use std::{fs, io, path::Path};

use compynation_core::Dimensions;
use compynation_world::{Level, LevelConfig, LevelError};
use thiserror::Error;

const COMMENT_PREFIX: char = '#';

/// Failures while reading or validating level data.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The level file could not be read.
    #[error("could not read level file: {0}")]
    Io(#[from] io::Error),
    /// A token is not an integral number.
    #[error("line {line}: `{token}` is not a cell code")]
    InvalidNumber {
        /// One-based line number in the source text.
        line: usize,
        /// Offending token.
        token: String,
    },
    /// A row has a different number of codes than the first row.
    #[error("line {line}: expected {expected} codes, found {found}")]
    RaggedRow {
        /// One-based line number in the source text.
        line: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// The table is rectangular but not the configured size.
    #[error(
        "level must be {} columns by {} rows, found {columns} columns by {rows} rows",
        .expected.columns(),
        .expected.rows()
    )]
    InvalidDimensions {
        /// Configured size.
        expected: Dimensions,
        /// Width of the table.
        columns: usize,
        /// Height of the table.
        rows: usize,
    },
    /// The engine rejected the layout.
    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Parses a whitespace-separated table of cell codes.
pub fn parse_table(text: &str) -> Result<Vec<Vec<i32>>, LoadError> {
    let mut rows: Vec<Vec<i32>> = Vec::new();
    let mut width = None;

    for (index, line) in text.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX) {
            continue;
        }

        let row = trimmed
            .split_whitespace()
            .map(|token| parse_code(token, line_number))
            .collect::<Result<Vec<i32>, LoadError>>()?;

        match width {
            None => width = Some(row.len()),
            Some(expected) if expected != row.len() => {
                return Err(LoadError::RaggedRow {
                    line: line_number,
                    expected,
                    found: row.len(),
                });
            }
            Some(_) => {}
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Parses level text and constructs a level from it.
pub fn load_str(text: &str, config: &LevelConfig) -> Result<Level, LoadError> {
    let rows = parse_table(text)?;
    check_dimensions(&rows, config.dimensions)?;
    Ok(Level::from_codes(&rows, config)?)
}

/// Reads a level file from disk and constructs a level from it.
pub fn load_path(path: impl AsRef<Path>, config: &LevelConfig) -> Result<Level, LoadError> {
    let text = fs::read_to_string(path)?;
    load_str(&text, config)
}

fn check_dimensions(rows: &[Vec<i32>], expected: Dimensions) -> Result<(), LoadError> {
    let columns = rows.first().map_or(0, Vec::len);
    let matches_columns = u32::try_from(columns).map_or(false, |value| value == expected.columns());
    let matches_rows = u32::try_from(rows.len()).map_or(false, |value| value == expected.rows());
    if matches_columns && matches_rows {
        Ok(())
    } else {
        Err(LoadError::InvalidDimensions {
            expected,
            columns,
            rows: rows.len(),
        })
    }
}

fn parse_code(token: &str, line: usize) -> Result<i32, LoadError> {
    let invalid = || LoadError::InvalidNumber {
        line,
        token: token.to_owned(),
    };

    if let Ok(code) = token.parse::<i32>() {
        return Ok(code);
    }

    let value = token.parse::<f64>().map_err(|_| invalid())?;
    if value.fract() != 0.0 || value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return Err(invalid());
    }
    Ok(value as i32)
}
