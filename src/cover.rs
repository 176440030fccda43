//! Cover entity for one IQtec sunblind.

use crate::codec::{self, encode_position};
use crate::controller::SunblindController;
use crate::error::ControllerError;
use crate::poller::{UpdateCoordinator, UpdateListener};
use crate::state::CoverState;

use bitflags::bitflags;
use log::{debug, warn};
use std::sync::{Arc, Mutex};

bitflags! {
    /// Capabilities a cover advertises to the host.
    ///
    /// Bit values follow the host framework's cover feature flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CoverFeatures: u32 {
        /// Can open.
        const OPEN = 1;
        /// Can close.
        const CLOSE = 1 << 1;
        /// Accepts a target position.
        const SET_POSITION = 1 << 2;
        /// Can stop moving.
        const STOP = 1 << 3;
        /// Can open the slats.
        const OPEN_TILT = 1 << 4;
        /// Can close the slats.
        const CLOSE_TILT = 1 << 5;
        /// Can stop tilting.
        const STOP_TILT = 1 << 6;
        /// Accepts a target tilt.
        const SET_TILT_POSITION = 1 << 7;
    }
}

/// Kind of cover, as reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// Slatted blind with position and tilt.
    Blind,
}

/// A cover backed by a sunblind on an IQtec controller.
///
/// Commands go straight to the shared controller. The cached percentage pair
/// is only replaced when the coordinator reports a successful refresh.
///
/// # Example
///
/// ```
/// use iqtec_cover::{IqtecCover, MockController, UpdateCoordinator};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let mock = Arc::new(MockController::new("hub"));
/// let coordinator = Arc::new(UpdateCoordinator::new(mock, Duration::from_secs(1)));
/// let cover = IqtecCover::new(&coordinator, "SB1", "kitchen")?;
///
/// cover.set_cover_position(25)?;
/// coordinator.tick().unwrap();
/// assert_eq!(cover.current_cover_position(), Some(25));
/// # Ok::<(), iqtec_cover::ControllerError>(())
/// ```
pub struct IqtecCover {
    name: String,
    address: String,
    controller: Arc<dyn SunblindController>,
    coordinator: Arc<UpdateCoordinator>,
    state: Mutex<Option<CoverState>>,
}

impl IqtecCover {
    /// Register the sunblind with the coordinator's controller and subscribe
    /// the new cover to poll results.
    ///
    /// The cover has no state until the first successful tick.
    ///
    /// # Errors
    ///
    /// [`ControllerError::InvalidTiltRange`] if the controller's
    /// [`full_tilt`](SunblindController::full_tilt) is not positive, otherwise
    /// whatever the controller reports from `add_sunblind`.
    pub fn new(
        coordinator: &Arc<UpdateCoordinator>,
        address: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Arc<Self>, ControllerError> {
        let address = address.into();
        let name = name.into();
        let controller = coordinator.controller().clone();

        let full_tilt = controller.full_tilt();
        if full_tilt <= 0 {
            return Err(ControllerError::InvalidTiltRange(full_tilt));
        }
        controller.add_sunblind(&address, &name)?;
        debug!("registered sunblind {} ({}) on {}", address, name, coordinator.name());

        let cover = Arc::new(Self {
            name,
            address,
            controller,
            coordinator: coordinator.clone(),
            state: Mutex::new(None),
        });
        coordinator.add_listener(&cover);
        Ok(cover)
    }

    /// Display name of the cover.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Device address on the controller.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Always [`DeviceClass::Blind`].
    pub fn device_class(&self) -> DeviceClass {
        DeviceClass::Blind
    }

    /// Every capability in [`CoverFeatures`].
    pub fn supported_features(&self) -> CoverFeatures {
        CoverFeatures::all()
    }

    /// Whether the last poll of the controller succeeded.
    pub fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    /// Last decoded percentage pair, if any poll has succeeded yet.
    pub fn state(&self) -> Option<CoverState> {
        *self.state.lock().unwrap()
    }

    /// Position percentage, 100 = fully open.
    pub fn current_cover_position(&self) -> Option<i32> {
        self.state().map(|s| s.position)
    }

    /// Tilt percentage, 100 = fully open.
    pub fn current_cover_tilt_position(&self) -> Option<i32> {
        self.state().map(|s| s.tilt)
    }

    /// Whether the cover is fully closed.
    pub fn is_closed(&self) -> Option<bool> {
        self.current_cover_position().map(|p| p == 0)
    }

    /// Fully open the blind.
    pub fn open_cover(&self) -> Result<(), ControllerError> {
        debug!("{}: open", self.address);
        self.controller.open(&self.address)
    }

    /// Fully close the blind.
    pub fn close_cover(&self) -> Result<(), ControllerError> {
        debug!("{}: close", self.address);
        self.controller.close(&self.address)
    }

    /// Stop moving.
    pub fn stop_cover(&self) -> Result<(), ControllerError> {
        debug!("{}: stop", self.address);
        self.controller.stop(&self.address)
    }

    /// Move to a position percentage (0-100, 100 = open).
    pub fn set_cover_position(&self, position: i32) -> Result<(), ControllerError> {
        let native = encode_position(position);
        debug!("{}: move to {}% ({})", self.address, position, native);
        self.controller.move_to(&self.address, native)
    }

    /// Opening the slats opens the whole blind; the device has no separate
    /// tilt-open command.
    pub fn open_cover_tilt(&self) -> Result<(), ControllerError> {
        debug!("{}: open tilt", self.address);
        self.controller.open(&self.address)
    }

    /// Close the slats completely.
    pub fn close_cover_tilt(&self) -> Result<(), ControllerError> {
        let native = self.controller.full_tilt();
        debug!("{}: close tilt ({})", self.address, native);
        self.controller.tilt_to(&self.address, native)
    }

    /// Tilt to a percentage (0-100, 100 = open).
    pub fn set_cover_tilt_position(&self, tilt: i32) -> Result<(), ControllerError> {
        let native = codec::encode_tilt_with(tilt, self.controller.full_tilt());
        debug!("{}: tilt to {}% ({})", self.address, tilt, native);
        self.controller.tilt_to(&self.address, native)
    }

    /// Stop tilting.
    pub fn stop_cover_tilt(&self) -> Result<(), ControllerError> {
        debug!("{}: stop tilt", self.address);
        self.controller.stop(&self.address)
    }
}

impl UpdateListener for IqtecCover {
    fn handle_coordinator_update(&self) {
        let Some(native) = self.controller.sunblind_state(&self.address) else {
            warn!(
                "{}: sunblind {} missing from controller",
                self.coordinator.name(),
                self.address
            );
            return;
        };

        let decoded = codec::decode_state(&native, self.controller.full_tilt());
        let mut state = self.state.lock().unwrap();
        if *state != Some(decoded) {
            debug!(
                "{}: position {}% tilt {}% (native {}/{})",
                self.address, decoded.position, decoded.tilt, native.position, native.rotation
            );
        }
        *state = Some(decoded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockCommand, MockController};
    use crate::poller::DEFAULT_UPDATE_INTERVAL;
    use crate::state::SunblindState;

    fn cover() -> (Arc<MockController>, Arc<UpdateCoordinator>, Arc<IqtecCover>) {
        let mock = Arc::new(MockController::new("hub"));
        let coordinator = Arc::new(UpdateCoordinator::new(
            mock.clone(),
            DEFAULT_UPDATE_INTERVAL,
        ));
        let cover = IqtecCover::new(&coordinator, "SB1", "kitchen").unwrap();
        (mock, coordinator, cover)
    }

    #[test]
    fn test_new_registers_sunblind() {
        let (mock, coordinator, cover) = cover();
        assert_eq!(mock.sunblind_name("SB1").as_deref(), Some("kitchen"));
        assert_eq!(coordinator.listener_count(), 1);
        assert_eq!(cover.name(), "kitchen");
        assert_eq!(cover.address(), "SB1");
        assert_eq!(cover.state(), None);
    }

    #[test]
    fn test_commands_encode_percentages() {
        let (mock, _coordinator, cover) = cover();

        cover.open_cover().unwrap();
        cover.close_cover().unwrap();
        cover.stop_cover().unwrap();
        cover.set_cover_position(30).unwrap();
        cover.open_cover_tilt().unwrap();
        cover.close_cover_tilt().unwrap();
        cover.set_cover_tilt_position(33).unwrap();
        cover.stop_cover_tilt().unwrap();

        let sb = || "SB1".to_string();
        assert_eq!(
            mock.commands(),
            vec![
                MockCommand::Open(sb()),
                MockCommand::Close(sb()),
                MockCommand::Stop(sb()),
                MockCommand::MoveTo(sb(), 700),
                MockCommand::Open(sb()),
                MockCommand::TiltTo(sb(), 180),
                MockCommand::TiltTo(sb(), 120),
                MockCommand::Stop(sb()),
            ]
        );
    }

    #[test]
    fn test_update_decodes_native_state() {
        let (mock, coordinator, cover) = cover();
        mock.set_hub_state(
            "SB1",
            SunblindState {
                position: 1000,
                rotation: 90,
            },
        )
        .unwrap();

        coordinator.tick().unwrap();
        assert_eq!(cover.current_cover_position(), Some(0));
        assert_eq!(cover.current_cover_tilt_position(), Some(50));
        assert_eq!(cover.is_closed(), Some(true));
    }

    #[test]
    fn test_failed_poll_keeps_state() {
        let (mock, coordinator, cover) = cover();
        coordinator.tick().unwrap();
        let before = cover.state();
        assert_eq!(
            before,
            Some(CoverState {
                position: 100,
                tilt: 100
            })
        );

        mock.close("SB1").unwrap();
        mock.fail_refresh("timeout");
        assert!(coordinator.tick().is_err());
        assert_eq!(cover.state(), before);
        assert!(!cover.available());

        mock.recover();
        coordinator.tick().unwrap();
        assert!(cover.available());
        assert_eq!(cover.is_closed(), Some(true));
    }

    #[test]
    fn test_command_errors_propagate() {
        let (mock, _coordinator, cover) = cover();
        mock.fail_commands("busy");
        let err = cover.set_cover_position(50).unwrap_err();
        assert!(matches!(err, ControllerError::Api(ref m) if m == "busy"));
    }

    #[test]
    fn test_controller_tilt_range() {
        let mock = Arc::new(MockController::with_full_tilt("hub", 90));
        let coordinator = Arc::new(UpdateCoordinator::new(
            mock.clone(),
            DEFAULT_UPDATE_INTERVAL,
        ));
        let cover = IqtecCover::new(&coordinator, "SB1", "kitchen").unwrap();

        cover.set_cover_tilt_position(50).unwrap();
        cover.close_cover_tilt().unwrap();
        assert_eq!(
            mock.commands()[..],
            [
                MockCommand::TiltTo("SB1".to_string(), 45),
                MockCommand::TiltTo("SB1".to_string(), 90),
            ]
        );

        coordinator.tick().unwrap();
        assert_eq!(cover.current_cover_tilt_position(), Some(0));
    }

    #[test]
    fn test_zero_tilt_range_rejected() {
        let mock = Arc::new(MockController::with_full_tilt("hub", 0));
        let coordinator = Arc::new(UpdateCoordinator::new(
            mock.clone(),
            DEFAULT_UPDATE_INTERVAL,
        ));

        let err = IqtecCover::new(&coordinator, "SB1", "kitchen").err().unwrap();
        assert!(matches!(err, ControllerError::InvalidTiltRange(0)));
        assert_eq!(mock.sunblind_name("SB1"), None);
        assert_eq!(coordinator.listener_count(), 0);

        // nothing to decode, so polling stays safe
        coordinator.tick().unwrap();
    }

    #[test]
    fn test_features_and_class() {
        let (_mock, _coordinator, cover) = cover();
        let features = cover.supported_features();
        assert_eq!(features.bits(), 0xff);
        assert!(features.contains(CoverFeatures::SET_TILT_POSITION | CoverFeatures::STOP));
        assert_eq!(cover.device_class(), DeviceClass::Blind);
    }
}
