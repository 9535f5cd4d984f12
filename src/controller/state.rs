//! Controller lifecycle states.

use std::sync::Mutex;

/// Lifecycle phase of the scan controller.
///
/// Activation walks `Idle` through `DeviceSelecting` and
/// `Initializing` to `Previewing`; any teardown path passes through
/// `CleaningUp` back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No session open.
    Idle,
    /// Enumerating devices and choosing one.
    DeviceSelecting,
    /// Opening the device and starting the preview.
    Initializing,
    /// Preview running and the scan loop ticking.
    Previewing,
    /// Tearing the session down.
    CleaningUp,
}

/// Shared cell holding the current controller state.
///
/// Written by the controller thread during activation and by the scan
/// worker during teardown.
#[derive(Debug)]
pub(crate) struct StateCell {
    inner: Mutex<ControllerState>,
}

impl StateCell {
    pub(crate) fn new(initial: ControllerState) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub(crate) fn get(&self) -> ControllerState {
        match self.inner.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn set(&self, next: ControllerState) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *guard != next {
            tracing::debug!(from = ?*guard, to = ?next, "controller state changed");
            *guard = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let cell = StateCell::new(ControllerState::Idle);
        assert_eq!(cell.get(), ControllerState::Idle);

        cell.set(ControllerState::DeviceSelecting);
        cell.set(ControllerState::Initializing);
        cell.set(ControllerState::Previewing);
        assert_eq!(cell.get(), ControllerState::Previewing);

        cell.set(ControllerState::CleaningUp);
        cell.set(ControllerState::Idle);
        assert_eq!(cell.get(), ControllerState::Idle);
    }

    #[test]
    fn test_redundant_set_is_harmless() {
        let cell = StateCell::new(ControllerState::Previewing);
        cell.set(ControllerState::Previewing);
        assert_eq!(cell.get(), ControllerState::Previewing);
    }
}
