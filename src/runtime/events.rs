//! Runtime Notifications
//!
//! Fire-and-forget observer notifications. Observers return
//! `anyhow::Result<()>`; a failing observer is logged and skipped, the
//! remaining observers and the scheduler carry on.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::focus::PointerEventKind;

/// Notification emitted by the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeEvent {
    /// Once per substep.
    Update,
    /// Routed pointer/gaze event (select, pointerstart, ..., exit).
    Pointer(PointerEventKind),
    /// Startup and plugin installation finished. Fired once.
    Ready,
    /// Sensors were zeroed.
    Zero,
}

impl RuntimeEvent {
    /// Event name as hosts know it.
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeEvent::Update => "update",
            RuntimeEvent::Ready => "ready",
            RuntimeEvent::Zero => "zero",
            RuntimeEvent::Pointer(kind) => match kind {
                PointerEventKind::Select => "select",
                PointerEventKind::PointerStart => "pointerstart",
                PointerEventKind::PointerEnd => "pointerend",
                PointerEventKind::PointerMove => "pointermove",
                PointerEventKind::GazeStart => "gazestart",
                PointerEventKind::GazeMove => "gazemove",
                PointerEventKind::GazeComplete => "gazecomplete",
                PointerEventKind::GazeCancel => "gazecancel",
                PointerEventKind::Enter => "enter",
                PointerEventKind::Exit => "exit",
            },
        }
    }
}

/// Observer callback.
pub type Observer = Box<dyn FnMut(&RuntimeEvent) -> anyhow::Result<()> + Send>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Observer registry with per-observer fault isolation.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Observer)>,
    next_id: u64,
    faults: u64,
}

impl EventBus {
    /// Empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for every event.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&RuntimeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    /// Deliver `event` to every observer. Returns how many failed.
    pub fn emit(&mut self, event: RuntimeEvent) -> usize {
        let mut failed = 0;
        for (id, observer) in &mut self.observers {
            if let Err(e) = observer(&event) {
                failed += 1;
                error!("Observer {:?} failed on {}: {:#}", id, event.name(), e);
            }
        }
        self.faults += failed as u64;
        failed
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Whether there are no observers.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Total observer failures so far.
    pub fn fault_count(&self) -> u64 {
        self.faults
    }
}
