//! Input Manager Registry
//!
//! Explicit name → manager map. Registering a manager under a name that is
//! already taken evicts the previous manager.

use std::collections::BTreeMap;
use tracing::debug;

use super::manager::InputManager;

/// Name of the keyboard manager.
pub const KEYBOARD: &str = "Keyboard";

/// Name of the mouse manager.
pub const MOUSE: &str = "Mouse";

/// Name of the first gamepad manager.
pub const GAMEPAD: &str = "Gamepad_0";

/// Name of the touch manager.
pub const TOUCH: &str = "Touch";

/// Boxed manager stored in the registry.
pub type BoxedManager = Box<dyn InputManager>;

/// Collection of input managers keyed by name.
#[derive(Default)]
pub struct ManagerRegistry {
    /// BTreeMap keeps update and fusion order stable across runs.
    managers: BTreeMap<String, BoxedManager>,
}

impl ManagerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manager, returning the one it evicted (if any).
    pub fn register(&mut self, manager: BoxedManager) -> Option<BoxedManager> {
        let name = manager.name().to_string();
        let evicted = self.managers.insert(name.clone(), manager);
        if evicted.is_some() {
            debug!("Input manager {} replaced", name);
        }
        evicted
    }

    /// Remove a manager by name.
    pub fn remove(&mut self, name: &str) -> Option<BoxedManager> {
        self.managers.remove(name)
    }

    /// Look up a manager by name.
    pub fn get(&self, name: &str) -> Option<&dyn InputManager> {
        self.managers.get(name).map(|m| m.as_ref())
    }

    /// Look up a manager by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut BoxedManager> {
        self.managers.get_mut(name)
    }

    /// The keyboard manager, if registered.
    pub fn keyboard(&self) -> Option<&dyn InputManager> {
        self.get(KEYBOARD)
    }

    /// The keyboard manager, mutably.
    pub fn keyboard_mut(&mut self) -> Option<&mut BoxedManager> {
        self.get_mut(KEYBOARD)
    }

    /// The mouse manager, if registered.
    pub fn mouse(&self) -> Option<&dyn InputManager> {
        self.get(MOUSE)
    }

    /// The mouse manager, mutably.
    pub fn mouse_mut(&mut self) -> Option<&mut BoxedManager> {
        self.get_mut(MOUSE)
    }

    /// The first gamepad, if registered.
    pub fn gamepad(&self) -> Option<&dyn InputManager> {
        self.get(GAMEPAD)
    }

    /// Number of registered managers.
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether no managers are registered.
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Registered names, in iteration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.managers.keys().map(String::as_str)
    }

    /// Iterate all managers.
    pub fn iter(&self) -> impl Iterator<Item = &dyn InputManager> {
        self.managers.values().map(|m| m.as_ref())
    }

    /// Iterate all managers mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BoxedManager> {
        self.managers.values_mut()
    }

    /// Mouse is registered, enabled and being operated.
    pub fn has_mouse(&self) -> bool {
        Self::active(self.mouse())
    }

    /// Gamepad is registered, enabled and being operated.
    pub fn has_gamepad(&self) -> bool {
        Self::active(self.gamepad())
    }

    /// Some enabled manager currently reports head orientation.
    pub fn vr_orientation(&self) -> bool {
        self.iter().any(|m| m.enabled() && m.has_orientation())
    }

    /// Update every manager, then let a newly active gamepad take over from
    /// the mouse.
    pub fn update_all(&mut self, dt: f64) {
        let had_gamepad = self.has_gamepad();
        for manager in self.managers.values_mut() {
            manager.update(dt);
        }
        if !had_gamepad && self.has_gamepad() {
            if let Some(mouse) = self.mouse_mut() {
                mouse.set_in_physical_use(false);
            }
        }
    }

    /// Zero every manager.
    pub fn zero_all(&mut self) {
        for manager in self.managers.values_mut() {
            manager.zero();
        }
    }

    fn active(manager: Option<&dyn InputManager>) -> bool {
        manager.map(|m| m.enabled() && m.in_physical_use()).unwrap_or(false)
    }
}
