//! Mock controller for testing.

use crate::codec::SUNBLIND_FULL_TILT;
use crate::controller::SunblindController;
use crate::error::ControllerError;
use crate::state::SunblindState;
use std::collections::HashMap;
use std::sync::Mutex;

/// A command received by the [`MockController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCommand {
    /// `open` on the given address.
    Open(String),
    /// `close` on the given address.
    Close(String),
    /// `stop` on the given address.
    Stop(String),
    /// `move_to` with the native position.
    MoveTo(String, i32),
    /// `tilt_to` with the native rotation.
    TiltTo(String, i32),
}

#[derive(Debug, Default)]
struct MockSunblind {
    name: String,
    // What the hardware is doing; only visible after a refresh.
    hub: SunblindState,
    reported: SunblindState,
}

#[derive(Debug, Default)]
struct MockState {
    sunblinds: HashMap<String, MockSunblind>,
    refresh_error: Option<String>,
    command_error: Option<String>,
    refresh_count: usize,
    commands: Vec<MockCommand>,
}

/// A mock sunblind controller for testing.
///
/// This allows testing code that depends on [`SunblindController`] without a
/// hub on the network. Commands change the simulated hardware immediately, but
/// [`sunblind_state`](SunblindController::sunblind_state) only reflects them
/// after [`refresh_all`](SunblindController::refresh_all), the same way the
/// real library caches device state between polls.
///
/// # Example
///
/// ```
/// use iqtec_cover::{MockController, SunblindController};
///
/// let mock = MockController::new("hub");
/// mock.add_sunblind("SB1", "kitchen").unwrap();
/// mock.move_to("SB1", 400).unwrap();
/// assert_eq!(mock.sunblind_state("SB1").unwrap().position, 0);
///
/// mock.refresh_all().unwrap();
/// assert_eq!(mock.sunblind_state("SB1").unwrap().position, 400);
/// ```
pub struct MockController {
    name: String,
    full_tilt: i32,
    state: Mutex<MockState>,
}

impl MockController {
    /// Create a new mock controller with no sunblinds.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_full_tilt(name, SUNBLIND_FULL_TILT)
    }

    /// Create a mock controller reporting a custom tilt range.
    pub fn with_full_tilt(name: impl Into<String>, full_tilt: i32) -> Self {
        Self {
            name: name.into(),
            full_tilt,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Make every following refresh fail with an API error carrying `message`.
    pub fn fail_refresh(&self, message: impl Into<String>) {
        self.state.lock().unwrap().refresh_error = Some(message.into());
    }

    /// Make every following command fail with an API error carrying `message`.
    pub fn fail_commands(&self, message: impl Into<String>) {
        self.state.lock().unwrap().command_error = Some(message.into());
    }

    /// Clear all injected failures.
    pub fn recover(&self) {
        let mut state = self.state.lock().unwrap();
        state.refresh_error = None;
        state.command_error = None;
    }

    /// Simulate the hardware moving on its own, e.g. from a wall switch.
    pub fn set_hub_state(&self, address: &str, hub: SunblindState) -> Result<(), ControllerError> {
        let mut state = self.state.lock().unwrap();
        let sunblind = state
            .sunblinds
            .get_mut(address)
            .ok_or_else(|| ControllerError::UnknownDevice(address.to_string()))?;
        sunblind.hub = hub;
        Ok(())
    }

    /// Number of refresh calls received so far, including failed ones.
    pub fn refresh_count(&self) -> usize {
        self.state.lock().unwrap().refresh_count
    }

    /// Commands received so far, oldest first.
    pub fn commands(&self) -> Vec<MockCommand> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Display name a sunblind was registered with.
    pub fn sunblind_name(&self, address: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .sunblinds
            .get(address)
            .map(|s| s.name.clone())
    }

    fn command(
        &self,
        address: &str,
        command: MockCommand,
        apply: impl FnOnce(&mut SunblindState),
    ) -> Result<(), ControllerError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.command_error {
            return Err(ControllerError::Api(message.clone()));
        }
        let sunblind = state
            .sunblinds
            .get_mut(address)
            .ok_or_else(|| ControllerError::UnknownDevice(address.to_string()))?;
        apply(&mut sunblind.hub);
        state.commands.push(command);
        Ok(())
    }
}

impl SunblindController for MockController {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_sunblind(&self, address: &str, name: &str) -> Result<(), ControllerError> {
        let mut state = self.state.lock().unwrap();
        if state.sunblinds.contains_key(address) {
            return Err(ControllerError::DuplicateDevice(address.to_string()));
        }
        state.sunblinds.insert(
            address.to_string(),
            MockSunblind {
                name: name.to_string(),
                ..Default::default()
            },
        );
        Ok(())
    }

    fn refresh_all(&self) -> Result<(), ControllerError> {
        let mut state = self.state.lock().unwrap();
        state.refresh_count += 1;
        if let Some(message) = &state.refresh_error {
            return Err(ControllerError::Api(message.clone()));
        }
        for sunblind in state.sunblinds.values_mut() {
            sunblind.reported = sunblind.hub;
        }
        Ok(())
    }

    fn sunblind_state(&self, address: &str) -> Option<SunblindState> {
        self.state
            .lock()
            .unwrap()
            .sunblinds
            .get(address)
            .map(|s| s.reported)
    }

    fn open(&self, address: &str) -> Result<(), ControllerError> {
        self.command(address, MockCommand::Open(address.to_string()), |hub| {
            *hub = SunblindState::default();
        })
    }

    fn close(&self, address: &str) -> Result<(), ControllerError> {
        let full_tilt = self.full_tilt;
        self.command(address, MockCommand::Close(address.to_string()), |hub| {
            hub.position = 1000;
            hub.rotation = full_tilt;
        })
    }

    fn stop(&self, address: &str) -> Result<(), ControllerError> {
        self.command(address, MockCommand::Stop(address.to_string()), |_| {})
    }

    fn move_to(&self, address: &str, position: i32) -> Result<(), ControllerError> {
        self.command(
            address,
            MockCommand::MoveTo(address.to_string(), position),
            |hub| hub.position = position,
        )
    }

    fn tilt_to(&self, address: &str, rotation: i32) -> Result<(), ControllerError> {
        self.command(
            address,
            MockCommand::TiltTo(address.to_string(), rotation),
            |hub| hub.rotation = rotation,
        )
    }

    fn full_tilt(&self) -> i32 {
        self.full_tilt
    }
}
