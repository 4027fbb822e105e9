use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use compynation_system_run::{LevelEntry, STARTING_LIVES};
use serde::Deserialize;

/// Configuration file read when no `--config` flag is given.
pub(crate) const DEFAULT_CONFIG_PATH: &str = "levels/compynation.toml";

/// Run-wide switches from the `[settings]` table.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Settings {
    /// Lives granted at the start of a run.
    #[serde(default = "default_lives")]
    pub(crate) starting_lives: u32,
    /// Whether per-level time limits apply.
    #[serde(default = "enabled")]
    pub(crate) timed: bool,
    /// Whether levels are reskinned before play.
    #[serde(default = "enabled")]
    pub(crate) randomize: bool,
    /// Fixed seed for reskinning; a fresh seed is drawn when absent.
    #[serde(default)]
    pub(crate) seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            starting_lives: STARTING_LIVES,
            timed: true,
            randomize: true,
            seed: None,
        }
    }
}

const fn default_lives() -> u32 {
    STARTING_LIVES
}

const fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    levels: Vec<LevelEntry>,
}

/// Parsed game configuration with level files resolved against its directory.
#[derive(Clone, Debug)]
pub(crate) struct GameConfig {
    pub(crate) settings: Settings,
    pub(crate) levels: Vec<LevelEntry>,
    base: PathBuf,
}

impl GameConfig {
    /// Reads and validates the configuration stored at `path`.
    pub(crate) fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let config_path = path.as_ref();
        let contents = fs::read_to_string(config_path).with_context(|| {
            format!(
                "failed to read game configuration at {}",
                config_path.display()
            )
        })?;
        let base = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&contents, base)
    }

    fn parse(contents: &str, base: PathBuf) -> Result<Self> {
        let manifest: Manifest =
            toml::from_str(contents).context("failed to parse game configuration toml")?;
        if manifest.levels.is_empty() {
            bail!("game configuration lists no levels");
        }
        if manifest.settings.starting_lives == 0 {
            bail!("starting_lives must be at least 1");
        }
        if let Some(entry) = manifest
            .levels
            .iter()
            .find(|entry| entry.time_limit_secs == Some(0))
        {
            bail!("level {} has a zero time limit", entry.index);
        }

        Ok(Self {
            settings: manifest.settings,
            levels: manifest.levels,
            base,
        })
    }

    /// Location of the level file named by `entry`.
    #[must_use]
    pub(crate) fn level_path(&self, entry: &LevelEntry) -> PathBuf {
        self.base.join(&entry.level)
    }
}
