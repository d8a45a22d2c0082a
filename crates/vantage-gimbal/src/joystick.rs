//! Joystick-to-gimbal pipeline: shaped axis samples become streamed
//! GIMBAL_DEVICE_SET_ATTITUDE setpoints.

use mavlink::common::{GimbalDeviceFlags, MavMessage, GIMBAL_DEVICE_SET_ATTITUDE_DATA};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::controller::GimbalController;
use crate::shaping;

/// Inputs and smoothed outputs below this magnitude count as released.
const ACTIVITY_EPSILON: f32 = 1e-3;

impl GimbalController {
    /// Consume one axis sample on the controller context. Samples overwrite
    /// each other between sender ticks: this is a latest-wins control, not a
    /// queue.
    pub fn handle_joystick_gimbal_input(&mut self, axis_values: &[f32]) {
        let (enabled, pitch_idx, yaw_idx, deadband_cfg, expo_cfg) = {
            let s = self.settings.read().unwrap();
            (
                s.joystick_gimbal_enabled,
                s.joystick_gimbal_pitch_axis_index,
                s.joystick_gimbal_yaw_axis_index,
                s.joystick_gimbal_deadband,
                s.joystick_gimbal_expo,
            )
        };
        if !enabled {
            return;
        }

        let pitch_axis = axis_values.get(pitch_idx).copied().unwrap_or(0.0);
        let yaw_axis = axis_values.get(yaw_idx).copied().unwrap_or(0.0);

        self.joystick_pitch_input = shaping::expo(shaping::deadband(pitch_axis, deadband_cfg), expo_cfg);
        self.joystick_yaw_input = shaping::expo(shaping::deadband(yaw_axis, deadband_cfg), expo_cfg);

        let has_input = self.joystick_pitch_input.abs() > ACTIVITY_EPSILON
            || self.joystick_yaw_input.abs() > ACTIVITY_EPSILON;
        if has_input && !self.joystick_timer_active {
            self.joystick_timer_active = true;
            debug!("joystick gimbal control started");
        }
        // On release the sender keeps running until the smoothed output has
        // decayed, so the gimbal still receives its final easing commands.
    }

    /// One sender tick: smooth the stored inputs, map them to angles and
    /// stream the attitude. Runs at the configured send rate while active.
    pub fn joystick_send_tick(&mut self) {
        if self.active_gimbal.is_none() {
            return;
        }
        if !self.try_get_gimbal_control() {
            return;
        }
        let Some(link) = self.vehicle.primary_link() else {
            debug!("joystick gimbal send: primary link gone");
            return;
        };

        let (alpha, pitch_limit, yaw_limit) = {
            let s = self.settings.read().unwrap();
            (
                s.joystick_gimbal_smoothing,
                s.joystick_gimbal_pitch_limit,
                s.joystick_gimbal_yaw_limit,
            )
        };

        self.joystick_smoothed_pitch =
            shaping::ema(self.joystick_smoothed_pitch, self.joystick_pitch_input, alpha);
        self.joystick_smoothed_yaw =
            shaping::ema(self.joystick_smoothed_yaw, self.joystick_yaw_input, alpha);

        // Stick up means pitch down.
        let pitch_deg = -self.joystick_smoothed_pitch * pitch_limit;
        let yaw_deg = self.joystick_smoothed_yaw * yaw_limit;

        let input_active = self.joystick_pitch_input.abs() > ACTIVITY_EPSILON
            || self.joystick_yaw_input.abs() > ACTIVITY_EPSILON;
        let smoothed_active = self.joystick_smoothed_pitch.abs() > ACTIVITY_EPSILON
            || self.joystick_smoothed_yaw.abs() > ACTIVITY_EPSILON;
        if !input_active && !smoothed_active {
            self.joystick_timer_active = false;
            debug!("joystick gimbal control stopped");
            return;
        }

        let q = shaping::euler_to_quat(0.0, pitch_deg.to_radians(), yaw_deg.to_radians());

        let Some(target_component) = self.active_gimbal().map(|g| g.manager_compid) else {
            return;
        };
        let message = MavMessage::GIMBAL_DEVICE_SET_ATTITUDE(GIMBAL_DEVICE_SET_ATTITUDE_DATA {
            target_system: self.vehicle.vehicle_id(),
            target_component,
            flags: GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_ROLL_LOCK
                | GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_PITCH_LOCK
                | GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_IN_VEHICLE_FRAME,
            q,
            angular_velocity_x: f32::NAN,
            angular_velocity_y: f32::NAN,
            angular_velocity_z: f32::NAN,
        });
        if let Err(e) = self.vehicle.send_message_on_link(link, message) {
            warn!("joystick gimbal send failed: {e:#}");
            return;
        }

        let now = OffsetDateTime::now_utc();
        self.add_message_log(format!(
            "[{:02}:{:02}:{:02}.{:03}] GIMBAL_DEVICE_SET_ATTITUDE: pitch={:.2}° yaw={:.2}° q=[{:.4},{:.4},{:.4},{:.4}]",
            now.hour(),
            now.minute(),
            now.second(),
            now.millisecond(),
            pitch_deg,
            yaw_deg,
            q[0],
            q[1],
            q[2],
            q[3],
        ));

        debug!(pitch = pitch_deg, yaw = yaw_deg, "joystick gimbal command sent");
    }
}
