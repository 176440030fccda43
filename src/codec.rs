//! Conversion between host percentages and sunblind device units.
//!
//! The host uses 0-100 with 100 meaning fully open. The device uses 0-1000 for
//! position and 0-[`SUNBLIND_FULL_TILT`] for tilt, both with 0 meaning fully
//! open. Every conversion is integer-only and truncates; inputs are not
//! clamped.

use crate::state::{CoverState, SunblindState};

/// Tilt value of a fully closed sunblind.
pub const SUNBLIND_FULL_TILT: i32 = 180;

/// Device units per position percent.
const POSITION_SCALE: i32 = 10;

/// Convert a position percentage (0-100) to device units (0-1000).
pub fn encode_position(percent: i32) -> i32 {
    (100 - percent) * POSITION_SCALE
}

/// Convert device position units (0-1000) to a percentage (0-100).
pub fn decode_position(native: i32) -> i32 {
    100 - native / POSITION_SCALE
}

/// Convert a tilt percentage (0-100) to device units (0-180).
pub fn encode_tilt(percent: i32) -> i32 {
    encode_tilt_with(percent, SUNBLIND_FULL_TILT)
}

/// Convert device tilt units (0-180) to a percentage (0-100).
pub fn decode_tilt(native: i32) -> i32 {
    decode_tilt_with(native, SUNBLIND_FULL_TILT)
}

/// Like [`encode_tilt`], against a tilt range of `full_tilt` units.
pub fn encode_tilt_with(percent: i32, full_tilt: i32) -> i32 {
    (100 - percent) * full_tilt / 100
}

/// Like [`decode_tilt`], against a tilt range of `full_tilt` units.
pub fn decode_tilt_with(native: i32, full_tilt: i32) -> i32 {
    100 - native * 100 / full_tilt
}

/// Decode a full device snapshot into the host percentage pair.
pub fn decode_state(state: &SunblindState, full_tilt: i32) -> CoverState {
    CoverState {
        position: decode_position(state.position),
        tilt: decode_tilt_with(state.rotation, full_tilt),
    }
}
