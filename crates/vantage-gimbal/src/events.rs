//! Notifications surfaced to whatever shell or UI owns the controller.

use crate::gimbal::GimbalPairId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GimbalEvent {
    /// The active-gimbal selection changed (or was first made).
    ActiveGimbalChanged(Option<GimbalPairId>),
    /// A pair finished the discovery handshake and is now listed.
    GimbalDiscovered(GimbalPairId),
    /// Fields of a tracked pair changed.
    GimbalUpdated(GimbalPairId),
    /// Another station holds primary control; the user has to confirm the
    /// takeover before commands go out.
    ShowAcquireGimbalControlPopup,
    /// The joystick message log ring changed.
    GimbalMessageLogChanged,
}
