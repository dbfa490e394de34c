// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Filesystem-backed persistence for session history and walk carry-over
//! (§4.8, §4.9).
//!
//! `BlobStore` is the only module that touches disk. It owns two files
//! under its `root_dir`: `history.json` (an array of `SessionRecord`,
//! capped at `max_history_per_mode` per `Mode`, oldest evicted first) and `carryover.json`
//! (at most one `CarryoverSnapshot`). Everything else in the workspace
//! reaches it only through `SaveBlobRequestEvent`/`LoadHistoryCommand`/
//! `DeleteHistoryEntryCommand` on the shared `EventBus`.

use common::mode::Mode;
use common::session_record::SessionRecord;
use common::wall_clock::{SystemWallClock, WallClock};
use common::{carryover::CarryoverSnapshot, date_key::date_key_for_ts_ms};
use module_core::{EventKind, Module, ModuleCtx};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, warn};

const CARRYOVER_COALESCE_MS: u64 = 500;
const SEED_PREFIX: &str = "seed_";

/// A file system–backed implementation of the engine's `history`/`carryover`
/// blobs.
///
/// ## Important
///
/// `BlobStore` does not implement any internal synchronization or locking.
/// Only one instance should point at a given `root_dir` at a time.
pub struct BlobStore {
    history_path: PathBuf,
    carryover_path: PathBuf,
    ctx: ModuleCtx,
    wall_clock: Arc<dyn WallClock>,
    pending_carryover: Option<Arc<String>>,
    max_history_per_mode: usize,
}

impl BlobStore {
    pub fn new(root_dir: &std::path::Path, ctx: ModuleCtx, max_history_per_mode: usize) -> Self {
        Self::with_wall_clock(root_dir, ctx, Arc::new(SystemWallClock), max_history_per_mode)
    }

    pub fn with_wall_clock(
        root_dir: &std::path::Path,
        ctx: ModuleCtx,
        wall_clock: Arc<dyn WallClock>,
        max_history_per_mode: usize,
    ) -> Self {
        if let Err(e) = std::fs::DirBuilder::new().recursive(true).create(root_dir) {
            error!(error = %e, dir = %root_dir.display(), "failed to create blob store root directory");
        }
        info!(dir = %root_dir.display(), "using blob store root directory");
        BlobStore {
            history_path: root_dir.join("history.json"),
            carryover_path: root_dir.join("carryover.json"),
            ctx,
            wall_clock,
            pending_carryover: None,
            max_history_per_mode,
        }
    }

    // --- raw file IO -----------------------------------------------------

    async fn read_file(path: &std::path::Path) -> std::io::Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        Ok(contents)
    }

    async fn write_file(path: &std::path::Path, contents: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    // --- history -----------------------------------------------------

    /// Loads `history.json`, dropping any `"seed_*"`-prefixed legacy entries.
    async fn load_history(&self) -> Vec<SessionRecord> {
        match Self::read_file(&self.history_path).await {
            Ok(json) => match serde_json::from_str::<Vec<SessionRecord>>(&json) {
                Ok(records) => records.into_iter().filter(|r| !r.id.starts_with(SEED_PREFIX)).collect(),
                Err(e) => {
                    error!(error = %e, "failed to parse history.json, treating as empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                error!(error = %e, "failed to read history.json, treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_history(&self, records: &[SessionRecord]) -> Result<(), String> {
        let json = serde_json::to_string(records).map_err(|e| e.to_string())?;
        Self::write_file(&self.history_path, &json).await.map_err(|e| e.to_string())
    }

    /// Upserts `record` by `id` (element-wise max merge, §4.9), then caps the
    /// per-mode count at `self.max_history_per_mode`, evicting the oldest first.
    fn upsert(&self, records: &mut Vec<SessionRecord>, record: SessionRecord) {
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = existing.merge_upsert(&record);
        } else {
            records.insert(0, record);
        }

        evict_oldest_over_cap(records, Mode::Run, self.max_history_per_mode);
        evict_oldest_over_cap(records, Mode::Walk, self.max_history_per_mode);
    }

    async fn handle_save_history(&mut self, json: &str) -> Result<(), String> {
        let record: SessionRecord = serde_json::from_str(json).map_err(|e| e.to_string())?;
        let mut records = self.load_history().await;
        let id = record.id.clone();
        self.upsert(&mut records, record);
        self.write_history(&records).await?;
        info!(id = %id, "history entry saved");
        Ok(())
    }

    async fn handle_load_history(&self) {
        let records = self.load_history().await;
        debug!(count = records.len(), "loaded history");
        self.publish(EventKind::LoadHistoryResponseEvent {
            records: Arc::new(records),
        });
    }

    async fn handle_delete_history_entry(&self, id: &str) {
        let mut records = self.load_history().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            warn!(id = %id, "delete requested for unknown history id");
            return;
        }
        match self.write_history(&records).await {
            Ok(()) => {
                info!(id = %id, "history entry deleted");
                self.publish(EventKind::HistoryChangedEvent);
            }
            Err(e) => error!(error = %e, id = %id, "failed to persist history after delete"),
        }
    }

    // --- carryover -----------------------------------------------------

    async fn load_carryover(&self) -> Option<CarryoverSnapshot> {
        match Self::read_file(&self.carryover_path).await {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    error!(error = %e, "failed to parse carryover.json, discarding");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                error!(error = %e, "failed to read carryover.json, discarding");
                None
            }
        }
    }

    async fn delete_carryover_file(&self) {
        let _ = tokio::fs::remove_file(&self.carryover_path).await;
    }

    /// Runs once before the event loop starts: migrates a stale snapshot
    /// into history if its date has passed, then publishes whatever
    /// carry-over (if any) remains valid for today (§4.8).
    async fn load_and_publish_carryover(&mut self) {
        let Some(snapshot) = self.load_carryover().await else {
            self.publish(EventKind::LoadCarryoverResponseEvent { snapshot: None });
            return;
        };

        let today = date_key_for_ts_ms(self.wall_clock.now_ms());
        if snapshot.date_key != today && snapshot.has_activity() {
            let now_ms = self.wall_clock.now_ms();
            let id = format!("{}_carryover_{}", snapshot.date_key, now_ms);
            let avg_pace_ms_per_km =
                SessionRecord::compute_avg_pace_ms_per_km(snapshot.distance_m, snapshot.elapsed_ms);
            let migrated = SessionRecord {
                id: id.clone(),
                mode: snapshot.mode,
                started_at_ms: 0,
                duration_ms: snapshot.elapsed_ms,
                distance_m: snapshot.distance_m,
                avg_pace_ms_per_km,
                laps: snapshot.laps.clone(),
                route: Vec::new(),
                steps: Some(snapshot.steps),
                calories: None,
                cadence_spm: None,
                stride_m: None,
                elevation_gain_m: None,
                goal: None,
                goal_progress_pct: None,
                ghost_result: None,
                auto_saved: true,
                migrated_from_carryover: true,
            };
            let mut records = self.load_history().await;
            self.upsert(&mut records, migrated);
            match self.write_history(&records).await {
                Ok(()) => {
                    info!(date_key = %snapshot.date_key, id = %id, "migrated stale carry-over into history");
                    self.delete_carryover_file().await;
                    self.publish(EventKind::HistoryChangedEvent);
                    self.publish(EventKind::LoadCarryoverResponseEvent { snapshot: None });
                }
                Err(e) => {
                    error!(error = %e, "failed to migrate carry-over, keeping it on disk");
                    self.publish(EventKind::LoadCarryoverResponseEvent {
                        snapshot: Some(Arc::new(snapshot)),
                    });
                }
            }
            return;
        }

        if snapshot.date_key != today {
            // stale but empty: drop silently rather than resurrect a blank day.
            self.delete_carryover_file().await;
            self.publish(EventKind::LoadCarryoverResponseEvent { snapshot: None });
            return;
        }

        self.publish(EventKind::LoadCarryoverResponseEvent {
            snapshot: Some(Arc::new(snapshot)),
        });
    }

    /// Queues `json` for the next coalesced flush instead of writing
    /// immediately (§4.8: at most one carry-over write per 500 ms).
    fn queue_carryover_write(&mut self, json: Arc<String>) {
        self.pending_carryover = Some(json);
    }

    async fn flush_pending_carryover(&mut self) {
        let Some(json) = self.pending_carryover.take() else {
            return;
        };
        match serde_json::from_str::<CarryoverSnapshot>(&json) {
            Ok(_) => match Self::write_file(&self.carryover_path, &json).await {
                Ok(()) => debug!("carry-over snapshot flushed"),
                Err(e) => error!(error = %e, "failed to write carryover.json"),
            },
            Err(e) => error!(error = %e, "dropped malformed carry-over payload"),
        }
    }

    // --- dispatch -----------------------------------------------------

    fn publish(&self, kind: EventKind) {
        let _ = self.ctx.publish_event(kind);
    }

    async fn handle_save_blob(&mut self, key: String, json: Arc<String>) {
        match key.as_str() {
            "history" => {
                let result = self.handle_save_history(&json).await;
                if let Err(e) = &result {
                    error!(error = %e, "failed to save history entry");
                }
                let ok = result.is_ok();
                self.publish(EventKind::SaveBlobResponseEvent { key, result });
                if ok {
                    self.publish(EventKind::HistoryChangedEvent);
                }
            }
            "carryover" => {
                self.queue_carryover_write(json);
                self.publish(EventKind::SaveBlobResponseEvent { key, result: Ok(()) });
            }
            other => {
                let err = format!("unknown blob key: {other}");
                warn!(key = %other, "save request for unknown blob key");
                self.publish(EventKind::SaveBlobResponseEvent {
                    key,
                    result: Err(err),
                });
            }
        }
    }
}

fn evict_oldest_over_cap(records: &mut Vec<SessionRecord>, mode: Mode, max_history_per_mode: usize) {
    loop {
        let count = records.iter().filter(|r| r.mode == mode).count();
        if count <= max_history_per_mode {
            break;
        }
        let Some(oldest_idx) = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.mode == mode)
            .min_by_key(|(_, r)| r.started_at_ms)
            .map(|(i, _)| i)
        else {
            break;
        };
        let evicted = records.remove(oldest_idx);
        info!(id = %evicted.id, ?mode, "evicted oldest history entry over cap");
    }
}

#[async_trait::async_trait]
impl Module for BlobStore {
    async fn run(&mut self) -> Result<(), ()> {
        self.load_and_publish_carryover().await;

        let mut coalesce_timer = tokio::time::interval(std::time::Duration::from_millis(CARRYOVER_COALESCE_MS));
        loop {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => match event.kind {
                            EventKind::QuitEvent => {
                                self.flush_pending_carryover().await;
                                break;
                            }
                            EventKind::SaveBlobRequestEvent { key, json } => {
                                self.handle_save_blob(key, json).await;
                            }
                            EventKind::LoadHistoryCommand => {
                                self.handle_load_history().await;
                            }
                            EventKind::DeleteHistoryEntryCommand { id } => {
                                self.handle_delete_history_entry(&id).await;
                            }
                            _ => (),
                        },
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            error!(skipped, "blob_store lagged behind the event bus");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = coalesce_timer.tick() => {
                    self.flush_pending_carryover().await;
                }
            }
        }
        Ok(())
    }
}
