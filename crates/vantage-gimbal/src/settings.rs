//! Tuning knobs for gimbal control surfaces.

use std::sync::{Arc, RwLock};

use serde::Deserialize;

/// Settings are shared with whatever UI edits them and read on demand, so a
/// change takes effect on the next command or sender tick.
pub type SharedSettings = Arc<RwLock<GimbalControllerSettings>>;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GimbalControllerSettings {
    /// Rate magnitude (deg/s) used by the fixed-direction pitch/yaw buttons.
    pub joystick_button_speed: f32,

    /// Camera fields of view in degrees; scale click-and-point increments.
    pub camera_h_fov: f32,
    pub camera_v_fov: f32,
    /// Degrees; scales click-and-drag increments (x 0.1).
    pub camera_slide_speed: f32,

    /// Gate for the whole joystick gimbal pipeline.
    pub joystick_gimbal_enabled: bool,
    /// Indices into the incoming axis sample vector.
    pub joystick_gimbal_pitch_axis_index: usize,
    pub joystick_gimbal_yaw_axis_index: usize,
    /// Dead zone in [0, 1).
    pub joystick_gimbal_deadband: f32,
    /// Cubic expo weight in [0, 1].
    pub joystick_gimbal_expo: f32,
    /// EMA coefficient in (0, 1]; 1 disables smoothing.
    pub joystick_gimbal_smoothing: f32,
    /// Sender cadence in Hz; non-positive falls back to 50.
    pub joystick_gimbal_send_rate_hz: i32,
    /// Degree bounds for the mapped stick angle.
    pub joystick_gimbal_pitch_limit: f32,
    pub joystick_gimbal_yaw_limit: f32,
}

impl Default for GimbalControllerSettings {
    fn default() -> Self {
        Self {
            joystick_button_speed: 30.0,
            camera_h_fov: 63.0,
            camera_v_fov: 40.0,
            camera_slide_speed: 30.0,
            joystick_gimbal_enabled: false,
            joystick_gimbal_pitch_axis_index: 1,
            joystick_gimbal_yaw_axis_index: 2,
            joystick_gimbal_deadband: 0.1,
            joystick_gimbal_expo: 0.3,
            joystick_gimbal_smoothing: 0.2,
            joystick_gimbal_send_rate_hz: 50,
            joystick_gimbal_pitch_limit: 90.0,
            joystick_gimbal_yaw_limit: 180.0,
        }
    }
}

impl GimbalControllerSettings {
    pub fn shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }

    /// Sender cadence with the non-positive fallback applied.
    pub fn effective_send_rate_hz(&self) -> i32 {
        if self.joystick_gimbal_send_rate_hz <= 0 {
            50
        } else {
            self.joystick_gimbal_send_rate_hz
        }
    }
}
