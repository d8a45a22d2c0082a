//! Outbound gimbal commands and primary-control arbitration.

use mavlink::common::{
    GimbalDeviceFlags, GimbalManagerFlags, MavCmd, MavMessage, GIMBAL_MANAGER_SET_ATTITUDE_DATA,
};
use tracing::{debug, warn};

use crate::controller::{yaw_in_vehicle_frame, GimbalController};
use crate::events::GimbalEvent;

impl GimbalController {
    /// Every command gate: refuse without an active gimbal, defer to the UI
    /// when another station holds primary control, and acquire control
    /// ourselves when nobody does.
    pub(crate) fn try_get_gimbal_control(&mut self) -> bool {
        let Some(gimbal) = self.active_gimbal() else {
            debug!("no active gimbal, dropping command");
            return false;
        };

        if gimbal.others_have_control {
            debug!("another station holds primary control, asking the user to confirm takeover");
            let _ = self.events.send(GimbalEvent::ShowAcquireGimbalControlPopup);
            return false;
        }
        if !gimbal.have_control {
            debug!("nobody holds primary control, acquiring it");
            self.acquire_gimbal_control();
        }

        true
    }

    /// Point the gimbal at an angle target with yaw relative to the vehicle
    /// nose.
    pub fn send_pitch_body_yaw(&mut self, pitch_deg: f32, yaw_deg: f32, show_error: bool) {
        if !self.try_get_gimbal_control() {
            return;
        }
        self.stop_rate_for_angle_target();

        let Some(gimbal) = self.active_gimbal() else {
            return;
        };
        let flags = GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_ROLL_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_PITCH_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_IN_VEHICLE_FRAME;
        self.vehicle.send_command(
            gimbal.manager_compid,
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW,
            show_error,
            [
                pitch_deg,
                yaw_deg,
                f32::NAN,
                f32::NAN,
                flags.bits() as f32,
                0.0,
                gimbal.device_id as f32,
            ],
        );
    }

    /// Point the gimbal at an angle target with yaw relative to north. The
    /// yaw is wrapped into (-180, 180] before it goes on the wire.
    pub fn send_pitch_absolute_yaw(&mut self, pitch_deg: f32, mut yaw_deg: f32, show_error: bool) {
        if !self.try_get_gimbal_control() {
            return;
        }
        self.stop_rate_for_angle_target();

        if yaw_deg > 180.0 {
            yaw_deg -= 360.0;
        }
        if yaw_deg < -180.0 {
            yaw_deg += 360.0;
        }

        let Some(gimbal) = self.active_gimbal() else {
            return;
        };
        let flags = GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_ROLL_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_PITCH_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_IN_EARTH_FRAME;
        self.vehicle.send_command(
            gimbal.manager_compid,
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW,
            show_error,
            [
                pitch_deg,
                yaw_deg,
                f32::NAN,
                f32::NAN,
                flags.bits() as f32,
                0.0,
                gimbal.device_id as f32,
            ],
        );
    }

    /// An angle target must not interleave with the rate keep-alive, so the
    /// timer stops and the stored rates are zeroed before the send.
    fn stop_rate_for_angle_target(&mut self) {
        self.rate_timer_active = false;
        if let Some(pair) = self.active_gimbal {
            if let Some(gimbal) = self.potential_gimbals.get_mut(&pair) {
                gimbal.pitch_rate = 0.0;
                gimbal.yaw_rate = 0.0;
            }
        }
    }

    /// Send the stored pitch/yaw rates and keep the keep-alive running while
    /// either is nonzero.
    pub fn send_rate(&mut self) {
        if !self.try_get_gimbal_control() {
            return;
        }
        let Some(gimbal) = self.active_gimbal() else {
            return;
        };

        let mut flags = GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_ROLL_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_PITCH_LOCK;
        if gimbal.yaw_lock {
            flags |= GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_LOCK;
        }
        let keep_alive = gimbal.pitch_rate != 0.0 || gimbal.yaw_rate != 0.0;
        self.vehicle.send_command(
            gimbal.manager_compid,
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW,
            false,
            [
                f32::NAN,
                f32::NAN,
                gimbal.pitch_rate,
                gimbal.yaw_rate,
                flags.bits() as f32,
                0.0,
                gimbal.device_id as f32,
            ],
        );
        debug!("gimbal rate sent");

        self.rate_timer_active = keep_alive;
    }

    /// Rate control over the GIMBAL_MANAGER_SET_ATTITUDE message instead of
    /// a command, for managers that prefer the streamed form.
    pub fn send_gimbal_rate(&mut self, pitch_rate_deg_s: f32, yaw_rate_deg_s: f32) {
        if !self.try_get_gimbal_control() {
            return;
        }
        self.send_gimbal_attitude_rates(pitch_rate_deg_s, yaw_rate_deg_s);
        self.rate_timer_active = pitch_rate_deg_s != 0.0 || yaw_rate_deg_s != 0.0;
    }

    fn send_gimbal_attitude_rates(&mut self, pitch_rate_deg_s: f32, yaw_rate_deg_s: f32) {
        let Some(link) = self.vehicle.primary_link() else {
            debug!("send gimbal attitude rates: primary link gone");
            return;
        };
        let Some(gimbal) = self.active_gimbal() else {
            return;
        };

        let mut flags = GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_ROLL_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_PITCH_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_IN_VEHICLE_FRAME;
        // Preserve the current yaw-lock state instead of changing it.
        if gimbal.yaw_lock {
            flags |= GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_LOCK;
        }

        let message = MavMessage::GIMBAL_MANAGER_SET_ATTITUDE(GIMBAL_MANAGER_SET_ATTITUDE_DATA {
            target_system: self.vehicle.vehicle_id(),
            target_component: gimbal.manager_compid,
            flags,
            gimbal_device_id: gimbal.device_id,
            q: [f32::NAN; 4],
            angular_velocity_x: f32::NAN,
            angular_velocity_y: pitch_rate_deg_s.to_radians(),
            angular_velocity_z: yaw_rate_deg_s.to_radians(),
        });
        if let Err(e) = self.vehicle.send_message_on_link(link, message) {
            warn!("gimbal manager set attitude send failed: {e:#}");
        }
    }

    pub fn set_gimbal_retract(&mut self, set: bool) {
        if !self.try_get_gimbal_control() {
            return;
        }
        let Some(gimbal) = self.active_gimbal() else {
            return;
        };

        // Roll and pitch stay locked to the horizon; yaw lock is preserved.
        let mut flags = GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_ROLL_LOCK
            | GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_PITCH_LOCK;
        if gimbal.yaw_lock {
            flags |= GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_LOCK;
        }
        if set {
            flags |= GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_RETRACT;
        }
        self.send_pitch_yaw_flags(flags);
    }

    pub fn set_gimbal_yaw_lock(&mut self, set: bool) {
        if !self.try_get_gimbal_control() {
            return;
        }

        let mut flags = GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_ROLL_LOCK
            | GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_PITCH_LOCK;
        if set {
            flags |= GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_LOCK;
        }
        self.send_pitch_yaw_flags(flags);
    }

    /// Re-send the current pose with a new flag set, picking the yaw field
    /// that matches the frame the flags select.
    pub fn send_pitch_yaw_flags(&mut self, flags: GimbalDeviceFlags) {
        let Some(gimbal) = self.active_gimbal() else {
            debug!("send pitch yaw flags: no active gimbal");
            return;
        };

        let vehicle_frame = yaw_in_vehicle_frame(flags);
        let yaw = if vehicle_frame { gimbal.body_yaw } else { gimbal.absolute_yaw };
        self.vehicle.send_command(
            gimbal.manager_compid,
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW,
            true,
            [
                gimbal.absolute_pitch,
                yaw,
                f32::NAN,
                f32::NAN,
                flags.bits() as f32,
                0.0,
                gimbal.device_id as f32,
            ],
        );
    }

    /// Claim primary control for our station.
    pub fn acquire_gimbal_control(&mut self) {
        let Some(gimbal) = self.active_gimbal() else {
            debug!("acquire gimbal control: no active gimbal");
            return;
        };

        self.vehicle.send_command(
            gimbal.manager_compid,
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_CONFIGURE,
            true,
            [
                self.vehicle.our_system_id() as f32,
                self.vehicle.our_component_id() as f32,
                -1.0, // leave secondary control unchanged
                -1.0,
                f32::NAN,
                f32::NAN,
                gimbal.device_id as f32,
            ],
        );
    }

    /// Release primary control if we hold it.
    pub fn release_gimbal_control(&mut self) {
        let Some(gimbal) = self.active_gimbal() else {
            debug!("release gimbal control: no active gimbal");
            return;
        };

        self.vehicle.send_command(
            gimbal.manager_compid,
            MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_CONFIGURE,
            true,
            [
                -3.0, // release primary control if we hold it
                -3.0,
                -1.0, // leave secondary control unchanged
                -1.0,
                f32::NAN,
                f32::NAN,
                gimbal.device_id as f32,
            ],
        );
    }

    pub fn center_gimbal(&mut self) {
        if self.active_gimbal.is_none() {
            debug!("center gimbal: no active gimbal");
            return;
        }
        self.send_pitch_body_yaw(0.0, 0.0, true);
    }

    /// Click-to-point and click-and-drag from an on-screen video surface.
    /// `pan_pct` / `tilt_pct` come in as +-(0-1).
    pub fn gimbal_on_screen_control(
        &mut self,
        pan_pct: f32,
        tilt_pct: f32,
        click_and_point: bool,
        click_and_drag: bool,
    ) {
        let (body_yaw, absolute_pitch, yaw_lock) = match self.active_gimbal() {
            Some(g) => (g.body_yaw, g.absolute_pitch, g.yaw_lock),
            None => {
                debug!("on-screen control: no active gimbal");
                return;
            }
        };

        let (pan_inc, tilt_inc) = if click_and_point {
            let (h_fov, v_fov) = {
                let s = self.settings.read().unwrap();
                (s.camera_h_fov, s.camera_v_fov)
            };
            (pan_pct * h_fov * 0.5, tilt_pct * v_fov * 0.5)
        } else if click_and_drag {
            // Rate commands for drags misbehave on some autopilots (yaw
            // keeps integrating), so drags become small angle targets.
            let slide_speed = self.settings.read().unwrap().camera_slide_speed;
            (pan_pct * slide_speed * 0.1, tilt_pct * slide_speed * 0.1)
        } else {
            return;
        };

        let pan_target = pan_inc + body_yaw;
        let tilt_target = tilt_inc + absolute_pitch;

        if yaw_lock {
            let heading = self.vehicle.heading_deg();
            self.send_pitch_absolute_yaw(tilt_target, pan_target + heading, false);
        } else {
            self.send_pitch_body_yaw(tilt_target, pan_target, false);
        }
    }

    pub fn gimbal_pitch_start(&mut self, direction: i32) {
        let Some(pair) = self.active_gimbal else {
            debug!("gimbal pitch start: no active gimbal");
            return;
        };
        let speed = self.settings.read().unwrap().joystick_button_speed;
        if let Some(gimbal) = self.potential_gimbals.get_mut(&pair) {
            gimbal.pitch_rate = direction as f32 * speed;
        }
        self.send_rate();
    }

    pub fn gimbal_yaw_start(&mut self, direction: i32) {
        let Some(pair) = self.active_gimbal else {
            debug!("gimbal yaw start: no active gimbal");
            return;
        };
        let speed = self.settings.read().unwrap().joystick_button_speed;
        if let Some(gimbal) = self.potential_gimbals.get_mut(&pair) {
            gimbal.yaw_rate = direction as f32 * speed;
        }
        self.send_rate();
    }

    pub fn gimbal_pitch_stop(&mut self) {
        let Some(pair) = self.active_gimbal else {
            debug!("gimbal pitch stop: no active gimbal");
            return;
        };
        if let Some(gimbal) = self.potential_gimbals.get_mut(&pair) {
            gimbal.pitch_rate = 0.0;
        }
        self.send_rate();
    }

    pub fn gimbal_yaw_stop(&mut self) {
        let Some(pair) = self.active_gimbal else {
            debug!("gimbal yaw stop: no active gimbal");
            return;
        };
        if let Some(gimbal) = self.potential_gimbals.get_mut(&pair) {
            gimbal.yaw_rate = 0.0;
        }
        self.send_rate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{discover, manager_status, setup};
    use crate::vehicle::SentCommand;

    fn pitchyaw_body_flags() -> f32 {
        (GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_ROLL_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_PITCH_LOCK
            | GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_IN_VEHICLE_FRAME)
            .bits() as f32
    }

    fn pitchyaw_commands(commands: Vec<SentCommand>) -> Vec<SentCommand> {
        commands
            .into_iter()
            .filter(|c| c.command == MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW)
            .collect()
    }

    #[test]
    fn command_without_active_gimbal_is_a_no_op() {
        let (mut controller, vehicle, _rx) = setup();
        controller.send_pitch_body_yaw(10.0, 20.0, false);
        assert!(vehicle.take_commands().is_empty());
    }

    #[test]
    fn contested_control_defers_to_the_user() {
        let (mut controller, vehicle, mut rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);

        // Another station (9, 200) holds primary control.
        controller.handle_mavlink_message(154, &manager_status(1, 9, 200));
        vehicle.take_commands();
        while rx.try_recv().is_ok() {}

        controller.send_pitch_body_yaw(10.0, 20.0, false);

        assert!(vehicle.take_commands().is_empty());
        let mut popups = 0;
        while let Ok(event) = rx.try_recv() {
            if event == GimbalEvent::ShowAcquireGimbalControlPopup {
                popups += 1;
            }
        }
        assert_eq!(popups, 1);
    }

    #[test]
    fn acquire_then_command_goes_through() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 9, 200));
        vehicle.take_commands();

        controller.acquire_gimbal_control();
        let commands = vehicle.take_commands();
        assert_eq!(commands.len(), 1);
        let configure = &commands[0];
        assert_eq!(configure.command, MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_CONFIGURE);
        assert_eq!(configure.target_compid, 154);
        assert_eq!(configure.params[0], 255.0);
        assert_eq!(configure.params[1], 190.0);
        assert_eq!(configure.params[2], -1.0);
        assert_eq!(configure.params[3], -1.0);
        assert!(configure.params[4].is_nan() && configure.params[5].is_nan());
        assert_eq!(configure.params[6], 1.0);

        // The manager confirms we now hold primary control.
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        controller.send_pitch_body_yaw(10.0, 20.0, false);
        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].params[0], 10.0);
        assert_eq!(commands[0].params[1], 20.0);
        assert!(commands[0].params[2].is_nan() && commands[0].params[3].is_nan());
        assert_eq!(commands[0].params[4], pitchyaw_body_flags());
        assert_eq!(commands[0].params[6], 1.0);
    }

    #[test]
    fn uncontested_command_acquires_control_first() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);

        controller.send_pitch_body_yaw(0.0, 0.0, false);

        let commands = vehicle.take_commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].command, MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_CONFIGURE);
        assert_eq!(commands[1].command, MavCmd::MAV_CMD_DO_GIMBAL_MANAGER_PITCHYAW);
    }

    #[test]
    fn absolute_yaw_is_wrapped_onto_the_wire() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        controller.send_pitch_absolute_yaw(0.0, 270.0, false);
        controller.send_pitch_absolute_yaw(0.0, -270.0, false);

        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].params[1], -90.0);
        assert_eq!(commands[1].params[1], 90.0);
        for c in &commands {
            assert!(c.params[1] > -180.0 && c.params[1] <= 180.0);
        }
    }

    #[test]
    fn rate_start_sends_and_arms_keep_alive() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        controller.gimbal_pitch_start(1);
        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 1);
        assert!(commands[0].params[0].is_nan() && commands[0].params[1].is_nan());
        assert_eq!(commands[0].params[2], 30.0);
        assert_eq!(commands[0].params[3], 0.0);
        assert!(controller.rate_timer_active);

        controller.gimbal_pitch_stop();
        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].params[2], 0.0);
        assert_eq!(commands[0].params[3], 0.0);
        assert!(!controller.rate_timer_active);
    }

    #[test]
    fn angle_target_stops_keep_alive_and_zeroes_rates() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        controller.gimbal_yaw_start(-1);
        assert!(controller.rate_timer_active);

        controller.send_pitch_body_yaw(5.0, 0.0, false);
        assert!(!controller.rate_timer_active);
        let gimbal = controller.active_gimbal().unwrap();
        assert_eq!(gimbal.pitch_rate, 0.0);
        assert_eq!(gimbal.yaw_rate, 0.0);
    }

    #[test]
    fn gimbal_rate_streams_radians_and_preserves_yaw_lock() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();
        vehicle.take_messages();

        controller.send_gimbal_rate(90.0, -45.0);

        let messages = vehicle.take_messages();
        assert_eq!(messages.len(), 1);
        let MavMessage::GIMBAL_MANAGER_SET_ATTITUDE(data) = &messages[0].1 else {
            panic!("expected GIMBAL_MANAGER_SET_ATTITUDE");
        };
        assert_eq!(data.target_component, 154);
        assert_eq!(data.gimbal_device_id, 1);
        assert!(data.q.iter().all(|v| v.is_nan()));
        assert!(data.angular_velocity_x.is_nan());
        assert!((data.angular_velocity_y - 90.0f32.to_radians()).abs() < 1e-6);
        assert!((data.angular_velocity_z + 45.0f32.to_radians()).abs() < 1e-6);
        assert!(!data.flags.contains(GimbalManagerFlags::GIMBAL_MANAGER_FLAGS_YAW_LOCK));
        assert!(controller.rate_timer_active);

        controller.send_gimbal_rate(0.0, 0.0);
        assert!(!controller.rate_timer_active);
    }

    #[test]
    fn yaw_lock_command_resends_pose_in_earth_frame() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        {
            let pair = controller.active_pair().unwrap();
            let gimbal = controller.potential_gimbals.get_mut(&pair).unwrap();
            gimbal.absolute_pitch = -10.0;
            gimbal.body_yaw = 15.0;
            gimbal.absolute_yaw = 105.0;
        }

        controller.set_gimbal_yaw_lock(true);
        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 1);
        // Yaw lock selects the earth-frame yaw field.
        assert_eq!(commands[0].params[0], -10.0);
        assert_eq!(commands[0].params[1], 105.0);

        controller.set_gimbal_yaw_lock(false);
        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands[0].params[1], 15.0);
    }

    #[test]
    fn retract_composes_device_flags() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        controller.set_gimbal_retract(true);
        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 1);
        let flags = commands[0].params[4] as u32;
        assert_ne!(flags & GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_RETRACT.bits() as u32, 0);
        assert_ne!(flags & GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_ROLL_LOCK.bits() as u32, 0);
        assert_ne!(flags & GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_PITCH_LOCK.bits() as u32, 0);
    }

    #[test]
    fn on_screen_click_and_point_scales_by_fov() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        {
            let pair = controller.active_pair().unwrap();
            let gimbal = controller.potential_gimbals.get_mut(&pair).unwrap();
            gimbal.body_yaw = 10.0;
            gimbal.absolute_pitch = -5.0;
        }
        {
            let mut s = controller.settings.write().unwrap();
            s.camera_h_fov = 60.0;
            s.camera_v_fov = 40.0;
        }

        controller.gimbal_on_screen_control(0.5, -0.5, true, false);

        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 1);
        // pan: 0.5 * 60 / 2 + 10, tilt: -0.5 * 40 / 2 - 5, body frame.
        assert!((commands[0].params[1] - 25.0).abs() < 1e-4);
        assert!((commands[0].params[0] + 15.0).abs() < 1e-4);
        assert_eq!(commands[0].params[4], pitchyaw_body_flags());
    }

    #[test]
    fn on_screen_drag_scales_by_slide_speed() {
        let (mut controller, vehicle, _rx) = setup();
        discover(&mut controller, &vehicle, 154, 1);
        controller.handle_mavlink_message(154, &manager_status(1, 255, 190));
        vehicle.take_commands();

        controller.settings.write().unwrap().camera_slide_speed = 30.0;
        controller.gimbal_on_screen_control(1.0, 0.0, false, true);

        let commands = pitchyaw_commands(vehicle.take_commands());
        assert_eq!(commands.len(), 1);
        // pan: 1.0 * 30 * 0.1 on top of a zero body yaw.
        assert!((commands[0].params[1] - 3.0).abs() < 1e-4);
    }
}
