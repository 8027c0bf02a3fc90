//! Action Recorder - condenses raw input into high-level actions.
//!
//! Pointer and keyboard events are folded into clicks, drags, key combos,
//! typed phrases and modifier holds, timestamped against a screen recording
//! and aligned to its frame grid.

pub mod action;
pub mod capture;
pub mod clock;
pub mod config;
pub mod engine;
pub mod processing;
pub mod recorder;
pub mod replay;

use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use action::{Action, ActionKind, ActionLog};
pub use config::{EngineConfig, SessionConfig};
pub use engine::{ActionEngine, EngineOutput};
pub use recorder::{RecordingSession, SessionReport};

/// Install the global tracing subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "action_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

const USAGE: &str = "usage: action-recorder <script.jsonl> [out.json] [config.json]";

/// Replay an input script and write the resulting action log
pub fn run() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting Action Recorder v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let script_path = PathBuf::from(args.next().context(USAGE)?);
    let out_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("recording.json"));
    let config = match args.next() {
        Some(path) => SessionConfig::load(Path::new(&path))
            .with_context(|| format!("Failed to load config {}", path))?,
        None => SessionConfig::default(),
    };

    let script = std::fs::read_to_string(&script_path)
        .with_context(|| format!("Failed to read script {}", script_path.display()))?;
    let events = replay::parse_script(&script)?;

    let mut output = replay::replay_script(&events, config.engine());
    output.actions.sort_by_capture_index();
    output
        .actions
        .write_json(&out_path)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    println!("High-level actions:");
    print!("{}", output.actions.summary());
    println!("\nSaved action log → {}", out_path.display());
    Ok(())
}
