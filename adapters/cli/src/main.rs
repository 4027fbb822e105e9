#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Compynation run in the terminal.

mod config;
mod palette;
mod session;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use compynation_system_loader::load_path;
use compynation_system_run::{LevelEntry, RunStatus, RunTracker};
use compynation_world::{LevelConfig, RandomizeParams};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{
    config::{GameConfig, DEFAULT_CONFIG_PATH},
    palette::TilePalette,
    session::{AttemptOutcome, Session},
};

#[derive(Parser, Debug)]
#[command(name = "compynation")]
#[command(version, about = "Slide coloured blocks together until the field is clear")]
struct Args {
    /// Game configuration listing the settings and levels
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Seed for level reskinning; overrides the configuration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Play levels with the colours and tiles stored in their files
    #[arg(long)]
    no_random: bool,

    /// Start at the level unlocked by this password
    #[arg(short, long)]
    password: Option<String>,
}

/// Entry point for the Compynation command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    let config = GameConfig::from_path(&args.config)?;

    let seed = args
        .seed
        .or(config.settings.seed)
        .unwrap_or_else(rand::random);
    let randomize = config.settings.randomize && !args.no_random;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let level_config = LevelConfig::default();
    let reskin = RandomizeParams::default();
    let palette = TilePalette::new(&level_config.ranges);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut session = Session::new(&palette, stdin.lock(), stdout.lock());

    let mut tracker =
        RunTracker::with_lives(config.levels.clone(), config.settings.starting_lives)?;
    let mut entry: LevelEntry = match args.password.as_deref() {
        Some(password) => tracker.by_password(&password.to_uppercase())?.clone(),
        None => tracker.first()?.clone(),
    };

    loop {
        let path = config.level_path(&entry);
        let mut level = load_path(&path, &level_config).with_context(|| {
            format!("failed to load level {} from {}", entry.index, path.display())
        })?;
        if randomize && !level.randomize(&reskin, &mut rng) {
            session.notice("level colours fall outside the reskin range; playing them as stored")?;
        }

        let budget = if config.settings.timed {
            entry.time_budget()
        } else {
            None
        };
        session.announce_level(&entry, tracker.lives(), budget)?;

        match session.play(&mut level, budget)? {
            AttemptOutcome::Solved { score } => {
                tracker.complete_level(score);
                match tracker.next()? {
                    Some(next) => {
                        entry = next.clone();
                        session.announce_password(&entry)?;
                    }
                    None => return session.finish(tracker.total_score(), true),
                }
            }
            AttemptOutcome::TimedOut | AttemptOutcome::Restarted => {
                match tracker.fail_level() {
                    RunStatus::Retry { lives } => {
                        session.notice(&format!("attempt lost, {lives} lives left"))?;
                    }
                    RunStatus::GameOver => return session.finish(tracker.total_score(), false),
                }
            }
            AttemptOutcome::Quit => return session.finish(tracker.total_score(), false),
        }
    }
}
