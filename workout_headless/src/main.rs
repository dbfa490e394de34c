// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

mod config;
mod synthetic;

use algorithm::ghost_runner::select_target;
use autosaver::AutoSaver;
use blob_store::BlobStore;
use clap::Parser;
use common::ghost::GhostTarget;
use common::goal::GoalSpec;
use common::mode::Mode;
use common::wall_clock::SystemWallClock;
use config::EngineConfig;
use dirs::data_local_dir;
use module_core::{Event, EventBus, EventKind, Module, ModuleCtx, StartParams};
use session_fsm::SessionFsm;
use std::sync::Arc;
use std::time::Duration;
use synthetic::SyntheticSensorModule;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, clap::ValueEnum)]
enum CliMode {
    Run,
    Walk,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Run => Mode::Run,
            CliMode::Walk => Mode::Walk,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Session mode (§2): Run trusts GPS distance, Walk enables the pedometer pipeline.
    #[arg(long, value_enum, default_value = "run")]
    mode: CliMode,
    #[arg(long)]
    lap_distance_m: Option<f64>,
    /// One-shot distance goal, in meters (mutually exclusive with --goal-time-ms).
    #[arg(long)]
    goal_distance_m: Option<u32>,
    /// One-shot time goal, in milliseconds (mutually exclusive with --goal-distance-m).
    #[arg(long)]
    goal_time_ms: Option<u64>,
    /// Directory for history/carry-over blobs. Defaults to the platform's local data dir.
    #[arg(long)]
    storage_root: Option<std::path::PathBuf>,
    /// Speed of the synthetic sensor generator, in meters per second.
    #[arg(long, default_value_t = 2.8)]
    synthetic_speed_mps: f64,
    /// Replays the history entry with this id as a ghost pacer (§4.5). Falls
    /// back to the best distance-matched entry if the id isn't found.
    #[arg(long)]
    ghost_target_id: Option<String>,
    /// Seeds the pedometer's stride estimate, in meters, instead of letting
    /// it adapt from the built-in default (§4.2).
    #[arg(long)]
    initial_stride_m: Option<f32>,
}

const GHOST_LOOKUP_TIMEOUT_MS: u64 = 500;

/// Turns a history record's lap timeline into ghost control points (§4.5:
/// "a session is eligible if its laps timeline yields >= 1 control point").
fn ghost_target_from_record(record: &common::session_record::SessionRecord) -> Option<GhostTarget> {
    if record.laps.is_empty() {
        return None;
    }
    let points = record
        .laps
        .iter()
        .map(|lap| common::ghost::GhostPoint {
            cumulative_distance_m: lap.cumulative_distance_m,
            elapsed_ms: lap.elapsed_ms,
        })
        .collect();
    Some(GhostTarget {
        id: record.id.clone(),
        points,
    })
}

/// Asks `BlobStore` for history and resolves a ghost target: an exact id
/// match if found, otherwise the best distance-matched eligible record
/// (§4.5 Selection).
async fn resolve_ghost_target(ctx: &ModuleCtx, target_id: &str, hint_distance_m: Option<f64>) -> Option<Arc<GhostTarget>> {
    let mut receiver = ctx.receiver();
    if ctx.publish_event(EventKind::LoadHistoryCommand).is_err() {
        return None;
    }
    let records = match tokio::time::timeout(Duration::from_millis(GHOST_LOOKUP_TIMEOUT_MS), async {
        loop {
            match receiver.recv().await {
                Ok(Event {
                    kind: EventKind::LoadHistoryResponseEvent { records },
                }) => return records,
                Ok(_) => continue,
                Err(_) => return Arc::new(Vec::new()),
            }
        }
    })
    .await
    {
        Ok(records) => records,
        Err(_) => {
            warn!(target_id, "timed out waiting for history before resolving ghost target");
            return None;
        }
    };

    if let Some(exact) = records.iter().find(|r| r.id == target_id) {
        return ghost_target_from_record(exact).map(Arc::new);
    }

    let candidates: Vec<GhostTarget> = records.iter().filter_map(ghost_target_from_record).collect();
    select_target(&candidates, hint_distance_m).cloned().map(Arc::new)
}

fn default_storage_root() -> Result<std::path::PathBuf, ()> {
    let mut dir = data_local_dir().ok_or_else(|| error!("could not determine local data directory"))?;
    dir.push("workout_session_engine");
    Ok(dir)
}

fn build_config(cli: &Cli) -> Result<EngineConfig, ()> {
    let goal = match (cli.goal_distance_m, cli.goal_time_ms) {
        (Some(meters), _) => GoalSpec::Distance(meters),
        (None, Some(millis)) => GoalSpec::Time(millis),
        (None, None) => GoalSpec::None,
    };
    let storage_root = match &cli.storage_root {
        Some(root) => root.clone(),
        None => default_storage_root()?,
    };
    Ok(EngineConfig {
        mode: cli.mode.into(),
        goal,
        lap_distance_m: cli.lap_distance_m.unwrap_or(1_000.0),
        storage_root,
        initial_stride_m: cli.initial_stride_m,
        ..EngineConfig::default()
    })
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    let config = build_config(&cli)?;

    info!(mode = ?config.mode, lap_distance_m = config.lap_distance_m, "starting workout session engine");

    let eb = EventBus::default();
    let mut session_fsm = SessionFsm::new(eb.context(), config.initial_stride_m, config.geo_filter_config());
    let mut blob_store = BlobStore::new(&config.storage_root, eb.context(), config.max_history_items);
    let mut auto_saver = AutoSaver::new(eb.context());
    let mut synthetic = SyntheticSensorModule::new(
        eb.context(),
        config.mode,
        cli.synthetic_speed_mps,
        Arc::new(SystemWallClock),
    );

    let session_fsm_handle = tokio::spawn(async move { session_fsm.run().await });
    let blob_store_handle = tokio::spawn(async move { blob_store.run().await });
    let auto_saver_handle = tokio::spawn(async move { auto_saver.run().await });
    let synthetic_handle = tokio::spawn(async move { synthetic.run().await });

    // Let BlobStore publish its startup carry-over response before the
    // session starts, so a Walk-mode Start can resume from it (§4.8).
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let ghost = match &cli.ghost_target_id {
        Some(target_id) => resolve_ghost_target(&eb.context(), target_id, config.goal.distance_hint_m()).await,
        None => None,
    };
    if cli.ghost_target_id.is_some() && ghost.is_none() {
        warn!(target_id = ?cli.ghost_target_id, "no eligible ghost target found, running without one");
    }

    let _ = eb.context().publish_event(EventKind::StartCommand(StartParams {
        mode: config.mode,
        goal: config.goal,
        lap_distance_m: config.lap_distance_m,
        ghost,
    }));

    let (a, b, c, d) = tokio::join!(session_fsm_handle, blob_store_handle, auto_saver_handle, synthetic_handle);
    a.map_err(|_| ())?.and(b.map_err(|_| ())?).and(c.map_err(|_| ())?).and(d.map_err(|_| ())?)
}
