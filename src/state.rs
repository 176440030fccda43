//! Sunblind state snapshots.

/// Native state of one sunblind as the controller reports it.
///
/// Both axes use device units where 0 means fully open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SunblindState {
    /// Position in device units (0-1000).
    pub position: i32,
    /// Tilt in device units (0-full tilt, see [`SUNBLIND_FULL_TILT`](crate::codec::SUNBLIND_FULL_TILT)).
    pub rotation: i32,
}

/// Host-facing percentage pair of one cover.
///
/// 100 means fully open on both axes. Recomputed after every successful poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverState {
    /// Position percentage (0-100).
    pub position: i32,
    /// Tilt percentage (0-100).
    pub tilt: i32,
}
