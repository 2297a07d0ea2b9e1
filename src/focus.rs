//! Focus Routing
//!
//! Tracks the single interactive target that currently has focus and
//! toggles input-manager enablement around it.
//!
//! ## States
//!
//! ```text
//!   Unfocused ──select(focusable obj)──▶ Focused(obj)
//!   Focused(a) ──select(b ≠ a)─────────▶ Focused(b)   (a blurred first)
//!   Focused(a) ──exit / escape─────────▶ Unfocused
//!   Focused(a) ──a blurs itself────────▶ Unfocused
//! ```
//!
//! The router never swallows events: each routed event is forwarded to the
//! hit object, or to the focused target when nothing was hit.
//!
//! Self-blur notifications are applied before every routed event. Each
//! notifier is stamped with the focus generation it was issued for, so a
//! notification outliving its focus is ignored.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::input::manager::Axis;
use crate::input::registry::ManagerRegistry;

/// Identifier of an interactive object.
pub type TargetId = u64;

/// Shared handle to an externally owned interactive object.
pub type SharedTarget = Arc<Mutex<dyn FocusTarget>>;

/// Interactive object that can receive focus.
pub trait FocusTarget: Send {
    /// Stable identifier.
    fn id(&self) -> TargetId;

    /// Whether selecting this object should focus it.
    fn focusable(&self) -> bool;

    /// Whether keyboard locomotion must stop while this object is focused.
    fn lock_movement(&self) -> bool;

    /// Gain focus.
    fn focus(&mut self);

    /// Lose focus.
    fn blur(&mut self);

    /// Receive the notifier to fire when this object blurs on its own.
    fn subscribe_blur(&mut self, _notifier: BlurNotifier) {}

    /// Receive a routed pointer event.
    fn dispatch(&mut self, event: &PointerEvent);
}

/// Lock a shared target, recovering from poisoning.
pub fn lock_target(target: &SharedTarget) -> MutexGuard<'_, dyn FocusTarget + 'static> {
    target.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Pointer and gaze event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerEventKind {
    /// Object selected (click / trigger).
    Select,
    /// Pointer pressed.
    PointerStart,
    /// Pointer released.
    PointerEnd,
    /// Pointer moved.
    PointerMove,
    /// Gaze rested on an object.
    GazeStart,
    /// Gaze moved.
    GazeMove,
    /// Gaze dwell completed.
    GazeComplete,
    /// Gaze left before completing.
    GazeCancel,
    /// Pointer entered an object.
    Enter,
    /// Pointer exited / interaction cancelled.
    Exit,
}

/// Command attached to an event by the input layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerCommand {
    /// Escape: release focus.
    Escape,
}

/// A pointer event with its hit-test result.
#[derive(Clone)]
pub struct PointerEvent {
    /// Event kind.
    pub kind: PointerEventKind,
    /// Object under the pointer, if any.
    pub hit: Option<SharedTarget>,
    /// Command bound to this event.
    pub command: Option<PointerCommand>,
}

impl PointerEvent {
    /// Event without a hit object.
    pub fn new(kind: PointerEventKind) -> Self {
        Self { kind, hit: None, command: None }
    }

    /// Event over `target`.
    pub fn over(kind: PointerEventKind, target: SharedTarget) -> Self {
        Self { kind, hit: Some(target), command: None }
    }

    /// Escape command event.
    ///
    /// Carries kind `PointerEnd` for targets that dispatch on kind; the
    /// runtime does not publish it as a pointer notification.
    pub fn escape() -> Self {
        Self {
            kind: PointerEventKind::PointerEnd,
            hit: None,
            command: Some(PointerCommand::Escape),
        }
    }

    /// Whether this event cancels the current focus.
    pub fn is_cancel(&self) -> bool {
        self.kind == PointerEventKind::Exit || self.command == Some(PointerCommand::Escape)
    }

    fn hit_id(&self) -> Option<TargetId> {
        self.hit.as_ref().map(|t| lock_target(t).id())
    }
}

impl fmt::Debug for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerEvent")
            .field("kind", &self.kind)
            .field("hit", &self.hit_id())
            .field("command", &self.command)
            .finish()
    }
}

/// Handle a target uses to report that it blurred itself.
#[derive(Clone, Debug)]
pub struct BlurNotifier {
    id: TargetId,
    generation: u64,
    tx: mpsc::UnboundedSender<(TargetId, u64)>,
}

impl BlurNotifier {
    /// Report the blur. Ignored once the router is gone.
    pub fn notify(&self) {
        let _ = self.tx.send((self.id, self.generation));
    }
}

/// Focus state.
#[derive(Clone, Default)]
pub enum FocusState {
    /// Nothing focused.
    #[default]
    Unfocused,
    /// `target` holds focus.
    Focused {
        /// Focused object id.
        id: TargetId,
        /// Focused object.
        target: SharedTarget,
    },
}

impl fmt::Debug for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FocusState::Unfocused => f.write_str("Unfocused"),
            FocusState::Focused { id, .. } => write!(f, "Focused({})", id),
        }
    }
}

/// Focus change caused by one routed event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FocusChange {
    /// Target that lost focus.
    pub blurred: Option<TargetId>,
    /// Target that gained focus.
    pub focused: Option<TargetId>,
}

/// Arbitrates the single focused target.
pub struct FocusRouter {
    state: FocusState,
    /// Bumped on every acquire.
    generation: u64,
    blur_tx: mpsc::UnboundedSender<(TargetId, u64)>,
    blur_rx: mpsc::UnboundedReceiver<(TargetId, u64)>,
}

impl Default for FocusRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl FocusRouter {
    /// Create an unfocused router.
    pub fn new() -> Self {
        let (blur_tx, blur_rx) = mpsc::unbounded_channel();
        Self {
            state: FocusState::Unfocused,
            generation: 0,
            blur_tx,
            blur_rx,
        }
    }

    /// Current state.
    pub fn state(&self) -> &FocusState {
        &self.state
    }

    /// Id of the focused target.
    pub fn focused_id(&self) -> Option<TargetId> {
        match &self.state {
            FocusState::Focused { id, .. } => Some(*id),
            FocusState::Unfocused => None,
        }
    }

    /// Whether the focused target locks movement.
    pub fn lock_movement(&self) -> bool {
        match &self.state {
            FocusState::Focused { target, .. } => lock_target(target).lock_movement(),
            FocusState::Unfocused => false,
        }
    }

    /// Route one event: update focus, then forward it.
    ///
    /// `presenting` is whether a VR display is currently presenting; it
    /// decides how the mouse look axes are gated.
    pub fn route(
        &mut self,
        event: &PointerEvent,
        managers: &mut ManagerRegistry,
        presenting: bool,
    ) -> FocusChange {
        let mut change = FocusChange {
            blurred: self.poll_blurs(managers, presenting),
            focused: None,
        };
        let cancel = event.is_cancel();

        if event.kind == PointerEventKind::Select || cancel {
            let hit_id = event.hit_id();
            if cancel || hit_id != self.focused_id() {
                if let Some(id) = self.release(managers, presenting, true) {
                    change.blurred = Some(id);
                }

                if !cancel {
                    if let Some(target) = &event.hit {
                        change.focused = self.acquire(target, managers, presenting);
                    }
                }
            }
        }

        if let Some(hit) = &event.hit {
            lock_target(hit).dispatch(event);
        } else if let FocusState::Focused { target, .. } = &self.state {
            lock_target(target).dispatch(event);
        }

        change
    }

    /// Apply blur notifications fired by targets since the last poll.
    ///
    /// Returns the id of the target that was released, if any.
    pub fn poll_blurs(&mut self, managers: &mut ManagerRegistry, presenting: bool) -> Option<TargetId> {
        let mut released = None;
        while let Ok((id, generation)) = self.blur_rx.try_recv() {
            if self.focused_id() == Some(id) && generation == self.generation {
                debug!("Target {} blurred itself", id);
                released = self.release(managers, presenting, false);
            }
        }
        released
    }

    /// Drop focus, blurring the current target.
    pub fn clear(&mut self, managers: &mut ManagerRegistry, presenting: bool) -> Option<TargetId> {
        self.release(managers, presenting, true)
    }

    fn acquire(
        &mut self,
        target: &SharedTarget,
        managers: &mut ManagerRegistry,
        presenting: bool,
    ) -> Option<TargetId> {
        let mut guard = lock_target(target);
        if !guard.focusable() {
            return None;
        }

        let id = guard.id();
        self.generation += 1;
        guard.focus();
        guard.subscribe_blur(BlurNotifier {
            id,
            generation: self.generation,
            tx: self.blur_tx.clone(),
        });

        if guard.lock_movement() {
            if let Some(keyboard) = managers.keyboard_mut() {
                keyboard.set_enabled(false);
            }
            gate_mouse_look(managers, presenting);
        }
        drop(guard);

        debug!("Focused target {}", id);
        self.state = FocusState::Focused {
            id,
            target: Arc::clone(target),
        };
        Some(id)
    }

    fn release(
        &mut self,
        managers: &mut ManagerRegistry,
        presenting: bool,
        blur_target: bool,
    ) -> Option<TargetId> {
        let FocusState::Focused { id, target } = std::mem::take(&mut self.state) else {
            return None;
        };

        if let Some(keyboard) = managers.keyboard_mut() {
            keyboard.set_enabled(true);
        }
        gate_mouse_look(managers, !presenting);

        if blur_target {
            lock_target(&target).blur();
        }

        debug!("Released focus from target {}", id);
        Some(id)
    }
}

fn gate_mouse_look(managers: &mut ManagerRegistry, enabled: bool) {
    if let Some(mouse) = managers.mouse_mut() {
        mouse.set_axis_enabled(Axis::Pitch, enabled);
        mouse.set_axis_enabled(Axis::Heading, enabled);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::input::manager::AxisInput;
    use crate::input::registry::{KEYBOARD, MOUSE};

    /// Target that appends every call to a shared log.
    pub(crate) struct Widget {
        pub id: TargetId,
        pub focusable: bool,
        pub lock_movement: bool,
        pub log: Arc<Mutex<Vec<String>>>,
        pub notifier: Option<BlurNotifier>,
    }

    impl Widget {
        pub(crate) fn shared(
            id: TargetId,
            lock_movement: bool,
            log: &Arc<Mutex<Vec<String>>>,
        ) -> Arc<Mutex<Widget>> {
            Arc::new(Mutex::new(Widget {
                id,
                focusable: true,
                lock_movement,
                log: Arc::clone(log),
                notifier: None,
            }))
        }

        fn record(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    impl FocusTarget for Widget {
        fn id(&self) -> TargetId { self.id }
        fn focusable(&self) -> bool { self.focusable }
        fn lock_movement(&self) -> bool { self.lock_movement }
        fn focus(&mut self) { self.record(format!("focus {}", self.id)) }
        fn blur(&mut self) { self.record(format!("blur {}", self.id)) }
        fn subscribe_blur(&mut self, notifier: BlurNotifier) { self.notifier = Some(notifier) }
        fn dispatch(&mut self, event: &PointerEvent) {
            self.record(format!("dispatch {} {:?}", self.id, event.kind))
        }
    }

    fn managers() -> ManagerRegistry {
        let mut registry = ManagerRegistry::new();
        registry.register(Box::new(AxisInput::new(KEYBOARD)));
        registry.register(Box::new(AxisInput::new(MOUSE).with_value(Axis::Heading, 0.5)));
        registry
    }

    fn keyboard_enabled(registry: &ManagerRegistry) -> bool {
        registry.keyboard().unwrap().enabled()
    }

    fn select(target: &Arc<Mutex<Widget>>) -> PointerEvent {
        let shared: SharedTarget = target.clone();
        PointerEvent::over(PointerEventKind::Select, shared)
    }

    #[test]
    fn test_select_focuses_and_locks_keyboard() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        let change = router.route(&select(&a), &mut registry, false);

        assert_eq!(change, FocusChange { blurred: None, focused: Some(1) });
        assert_eq!(router.focused_id(), Some(1));
        assert!(router.lock_movement());
        assert!(!keyboard_enabled(&registry));
        // Desktop: mouse look only while presenting, so gated off.
        assert_eq!(registry.mouse().unwrap().value(Axis::Heading), 0.0);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["focus 1".to_string(), "dispatch 1 Select".to_string()]
        );
    }

    #[test]
    fn test_select_other_blurs_old_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        let b = Widget::shared(2, false, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        let change = router.route(&select(&b), &mut registry, false);

        assert_eq!(change, FocusChange { blurred: Some(1), focused: Some(2) });
        assert!(keyboard_enabled(&registry));
        assert!(!router.lock_movement());

        let log = log.lock().unwrap();
        let blur_a = log.iter().position(|e| e == "blur 1").unwrap();
        let focus_b = log.iter().position(|e| e == "focus 2").unwrap();
        assert!(blur_a < focus_b);
    }

    #[test]
    fn test_reselect_same_target_is_noop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, false, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        let change = router.route(&select(&a), &mut registry, false);

        assert_eq!(change, FocusChange::default());
        assert_eq!(router.focused_id(), Some(1));
    }

    #[test]
    fn test_exit_blurs_without_refocus() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        let exit: SharedTarget = a.clone();
        let change = router.route(&PointerEvent::over(PointerEventKind::Exit, exit), &mut registry, false);

        assert_eq!(change, FocusChange { blurred: Some(1), focused: None });
        assert_eq!(router.focused_id(), None);
        assert!(keyboard_enabled(&registry));
        assert_eq!(registry.mouse().unwrap().value(Axis::Heading), 0.5);
    }

    #[test]
    fn test_escape_command_cancels() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        let change = router.route(&PointerEvent::escape(), &mut registry, false);

        assert_eq!(change.blurred, Some(1));
        assert!(keyboard_enabled(&registry));
    }

    #[test]
    fn test_release_restores_mouse_look_when_not_presenting() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        let mut registry = ManagerRegistry::new();
        registry.register(Box::new(AxisInput::new(KEYBOARD)));
        registry.register(Box::new(AxisInput::new(MOUSE).with_value(Axis::Pitch, 0.2)));
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        assert_eq!(registry.mouse().unwrap().value(Axis::Pitch), 0.0);

        router.clear(&mut registry, false);
        assert_eq!(registry.mouse().unwrap().value(Axis::Pitch), 0.2);
    }

    #[test]
    fn test_unfocusable_hit_is_not_focused() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        a.lock().unwrap().focusable = false;
        let mut registry = managers();
        let mut router = FocusRouter::new();

        let change = router.route(&select(&a), &mut registry, false);

        assert_eq!(change.focused, None);
        assert!(keyboard_enabled(&registry));
        // Still forwarded.
        assert_eq!(*log.lock().unwrap(), vec!["dispatch 1 Select".to_string()]);
    }

    #[test]
    fn test_target_self_blur() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        a.lock().unwrap().notifier.as_ref().unwrap().notify();

        assert_eq!(router.poll_blurs(&mut registry, false), Some(1));
        assert_eq!(router.focused_id(), None);
        assert!(keyboard_enabled(&registry));
        // The target blurred itself; the router does not blur it again.
        assert!(!log.lock().unwrap().iter().any(|e| e == "blur 1"));
    }

    #[test]
    fn test_stale_blur_notification_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, false, &log);
        let b = Widget::shared(2, false, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        router.route(&select(&b), &mut registry, false);
        a.lock().unwrap().notifier.as_ref().unwrap().notify();

        assert_eq!(router.poll_blurs(&mut registry, false), None);
        assert_eq!(router.focused_id(), Some(2));
    }

    #[test]
    fn test_reselect_after_self_blur_refocuses() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, true, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        a.lock().unwrap().notifier.as_ref().unwrap().notify();
        let change = router.route(&select(&a), &mut registry, false);

        assert_eq!(change, FocusChange { blurred: Some(1), focused: Some(1) });
        assert_eq!(router.poll_blurs(&mut registry, false), None);
        assert_eq!(router.focused_id(), Some(1));
        assert!(!keyboard_enabled(&registry));
        assert_eq!(
            log.lock().unwrap().iter().filter(|e| *e == "focus 1").count(),
            2
        );
    }

    #[test]
    fn test_blur_queued_before_escape_does_not_release_refocus() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, false, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        a.lock().unwrap().notifier.as_ref().unwrap().notify();
        router.route(&PointerEvent::escape(), &mut registry, false);
        router.route(&select(&a), &mut registry, false);

        assert_eq!(router.poll_blurs(&mut registry, false), None);
        assert_eq!(router.focused_id(), Some(1));
    }

    #[test]
    fn test_notifier_from_earlier_focus_ignored() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, false, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        let old = a.lock().unwrap().notifier.clone().unwrap();
        router.route(&PointerEvent::escape(), &mut registry, false);
        router.route(&select(&a), &mut registry, false);
        old.notify();

        assert_eq!(router.poll_blurs(&mut registry, false), None);
        assert_eq!(router.focused_id(), Some(1));
    }

    #[test]
    fn test_events_forward_to_focused_when_nothing_hit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Widget::shared(1, false, &log);
        let mut registry = managers();
        let mut router = FocusRouter::new();

        router.route(&select(&a), &mut registry, false);
        router.route(&PointerEvent::new(PointerEventKind::PointerMove), &mut registry, false);

        assert!(log.lock().unwrap().iter().any(|e| e == "dispatch 1 PointerMove"));
    }
}
