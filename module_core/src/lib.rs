// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! The event bus and module seam every other crate in this workspace routes
//! through.
//!
//! `EventKind` carries both the engine's inputs (sensor samples, commands)
//! and its outputs (metric ticks, lap/ghost/goal events, lifecycle events).
//! Routing both directions through one broadcast bus keeps every
//! `Module` implementation — `SessionFsm`, the blob store, the auto-saver —
//! reachable the same way: subscribe, react, publish.

use common::carryover::CarryoverSnapshot;
use common::error::EngineError;
use common::ghost::GhostTarget;
use common::goal::GoalSpec;
use common::lap::Lap;
use common::mode::Mode;
use common::sensor::{AccelSample, LocationFix, StepReading};
use common::session_record::SessionRecord;
use std::sync::{
    Arc,
    atomic::{self, AtomicUsize},
};
use strum_macros::EnumDiscriminants;
use tracing::info;

/// Parameters for the `Start` command (§6).
#[derive(Clone, Debug, PartialEq)]
pub struct StartParams {
    pub mode: Mode,
    pub goal: GoalSpec,
    pub lap_distance_m: f64,
    pub ghost: Option<Arc<GhostTarget>>,
}

/// A finalized session summary, carried by `SessionEnded`.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub record: SessionRecord,
}

/// Enumerates every input and output event the engine and its collaborators
/// exchange over the [`EventBus`].
#[derive(Clone, Debug, EnumDiscriminants)]
#[strum_discriminants(derive(Hash))]
#[strum_discriminants(name(EventKindType))]
pub enum EventKind {
    /// Indicates that a module shall terminate.
    QuitEvent,

    // --- inputs -----------------------------------------------------
    LocationFixEvent(LocationFix),
    StepReadingEvent(StepReading),
    AccelSampleEvent(AccelSample),
    TickEvent { now_ms: i64 },
    StartCommand(StartParams),
    PauseCommand,
    ResumeCommand,
    StopCommand,
    LoadHistoryCommand,
    DeleteHistoryEntryCommand { id: String },
    SetStrideCommand { stride_m: f32 },

    // --- outputs ------------------------------------------------------
    MetricTickEvent {
        distance_m: f64,
        elapsed_ms: i64,
        current_pace_ms_per_km: Option<i64>,
        avg_pace_ms_per_km: Option<i64>,
        steps: Option<u32>,
    },
    LapCompletedEvent {
        lap: Lap,
        avg_pace_ms_per_km: i64,
    },
    GhostDeltaEvent {
        km: u32,
        diff_seconds: i32,
    },
    GoalReachedEvent {
        goal: GoalSpec,
        elapsed_ms: i64,
        distance_m: f64,
        avg_pace_ms_per_km: i64,
    },
    SessionStartedEvent {
        started_at_ms: i64,
        mode: Mode,
    },
    SessionPausedEvent,
    SessionResumedEvent,
    SessionEndedEvent(SessionSummary),
    ErrorObservedEvent(EngineError),
    HistoryChangedEvent,

    // --- persistence request/response (engine <-> BlobStore) ----------
    SaveBlobRequestEvent {
        key: String,
        json: Arc<String>,
    },
    SaveBlobResponseEvent {
        key: String,
        result: Result<(), String>,
    },
    LoadHistoryResponseEvent {
        records: Arc<Vec<SessionRecord>>,
    },
    LoadCarryoverResponseEvent {
        snapshot: Option<Arc<CarryoverSnapshot>>,
    },
}

/// A high-level event wrapping an [`EventKind`], passed through the
/// [`EventBus`] between asynchronous modules.
#[derive(Clone, Debug)]
pub struct Event {
    pub kind: EventKind,
}

impl Event {
    /// Returns the high-level type of this event, useful for filtering by
    /// category without matching on payload data.
    pub fn event_type(&self) -> EventKindType {
        EventKindType::from(&self.kind)
    }
}

/// A simple asynchronous event bus for publishing and subscribing to
/// [`Event`]s.
///
/// Backed by a [`tokio::sync::broadcast::channel`]: every published event is
/// cloned and distributed to all active subscribers. If no subscribers
/// exist at the time of publication, the event is discarded silently.
pub struct EventBus {
    id: usize,
    sender: tokio::sync::broadcast::Sender<Event>,
}

static BUS_ID: AtomicUsize = AtomicUsize::new(0);

impl EventBus {
    /// Creates a new [`EventBus`] with a fixed buffer capacity of 256 messages.
    pub fn new() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(256);
        let id = BUS_ID.fetch_add(1, atomic::Ordering::Relaxed);
        info!("Creating EventBus with id {}", id);
        EventBus { id, sender }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: &Event) {
        let _ = self.sender.send(event.clone());
    }

    /// Creates a [`ModuleCtx`] bound to this [`EventBus`].
    pub fn context(&self) -> ModuleCtx {
        ModuleCtx::new(self)
    }

    pub fn id(&self) -> usize {
        self.id
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Defines the common interface for an asynchronous module that can be
/// executed and communicate via the [`EventBus`].
#[async_trait::async_trait]
pub trait Module {
    async fn run(&mut self) -> Result<(), ()>;
}

/// A module-scoped context for interacting with the [`EventBus`].
#[derive(Debug)]
pub struct ModuleCtx {
    id: usize,
    pub sender: tokio::sync::broadcast::Sender<Event>,
    pub receiver: tokio::sync::broadcast::Receiver<Event>,
}

#[derive(Debug)]
pub enum ModuleCtxError {
    PublishError(String),
}

impl ModuleCtx {
    pub(crate) fn new(event_bus: &EventBus) -> Self {
        ModuleCtx {
            id: event_bus.id(),
            sender: event_bus.sender.clone(),
            receiver: event_bus.subscribe(),
        }
    }

    pub fn publish_event(&self, event: EventKind) -> Result<(), ModuleCtxError> {
        self.sender
            .send(Event { kind: event })
            .map(|_| ())
            .map_err(|e| ModuleCtxError::PublishError(format!("Failed to publish event: {}", e)))
    }

    /// Returns a new broadcast receiver subscribed to this event bus.
    ///
    /// Only receives events published after this call; may yield
    /// `Lagged` if the consumer falls behind.
    pub fn receiver(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.receiver.resubscribe()
    }

    pub fn bus_id(&self) -> usize {
        self.id
    }
}

impl Clone for ModuleCtx {
    fn clone(&self) -> Self {
        ModuleCtx {
            id: self.id,
            sender: self.sender.clone(),
            receiver: self.receiver.resubscribe(),
        }
    }
}

pub mod test_helper;
