//! Seam to the external IQtec controller library.

use crate::codec::SUNBLIND_FULL_TILT;
use crate::error::ControllerError;
use crate::state::SunblindState;

/// Trait for IQtec controller implementations.
///
/// The controller owns the session to the hardware hub and the state of every
/// sunblind registered with it. One instance is shared by its coordinator and
/// all of its covers, so implementations serialize their own device commands.
/// Devices are addressed by the address string they were registered with.
pub trait SunblindController: Send + Sync {
    /// Display name of the controller.
    fn name(&self) -> &str;

    /// Register a sunblind with the controller.
    fn add_sunblind(&self, address: &str, name: &str) -> Result<(), ControllerError>;

    /// Refresh the state of every registered sunblind from the hub.
    fn refresh_all(&self) -> Result<(), ControllerError>;

    /// Last known native state of a registered sunblind.
    fn sunblind_state(&self, address: &str) -> Option<SunblindState>;

    /// Fully open the sunblind.
    fn open(&self, address: &str) -> Result<(), ControllerError>;

    /// Fully close the sunblind.
    fn close(&self, address: &str) -> Result<(), ControllerError>;

    /// Stop any movement.
    fn stop(&self, address: &str) -> Result<(), ControllerError>;

    /// Move to a position in device units (0-1000).
    fn move_to(&self, address: &str, position: i32) -> Result<(), ControllerError>;

    /// Tilt to a rotation in device units (0-[`full_tilt`](Self::full_tilt)).
    fn tilt_to(&self, address: &str, rotation: i32) -> Result<(), ControllerError>;

    /// Rotation of a fully closed sunblind in device units.
    fn full_tilt(&self) -> i32 {
        SUNBLIND_FULL_TILT
    }
}
