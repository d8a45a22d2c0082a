//! The gimbal controller facade: record table, active-gimbal selection and
//! the discovery state machine driven by inbound MAVLink frames.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use mavlink::common::{
    GimbalDeviceFlags, MavCmd, MavMessage, GIMBAL_DEVICE_ATTITUDE_STATUS_DATA,
    GIMBAL_MANAGER_INFORMATION_DATA, GIMBAL_MANAGER_STATUS_DATA,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::events::GimbalEvent;
use crate::gimbal::{Gimbal, GimbalPairId, PotentialGimbalManager};
use crate::settings::SharedSettings;
use crate::shaping;
use crate::vehicle::VehicleConnection;

pub(crate) const MSG_ID_GIMBAL_MANAGER_INFORMATION: u32 = 280;
pub(crate) const MSG_ID_GIMBAL_MANAGER_STATUS: u32 = 281;
pub(crate) const MSG_ID_GIMBAL_DEVICE_ATTITUDE_STATUS: u32 = 285;

const MAX_LOG_ENTRIES: usize = 100;

/// Minimum spacing between any two GIMBAL_MANAGER_STATUS interval requests,
/// across all pairs, so a vehicle with many gimbals cannot stampede the
/// wire during discovery.
#[derive(Debug)]
struct StatusIntervalThrottle {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl StatusIntervalThrottle {
    fn new(min_interval: Duration) -> Self {
        Self { last_request: None, min_interval }
    }

    fn allow(&mut self) -> bool {
        let now = Instant::now();
        if let Some(t) = self.last_request {
            if now.duration_since(t) < self.min_interval {
                return false;
            }
        }
        self.last_request = Some(now);
        true
    }
}

pub struct GimbalController {
    pub(crate) vehicle: Arc<dyn VehicleConnection>,
    pub(crate) settings: SharedSettings,
    pub(crate) events: UnboundedSender<GimbalEvent>,

    potential_managers: HashMap<u8, PotentialGimbalManager>,
    pub(crate) potential_gimbals: HashMap<GimbalPairId, Gimbal>,
    /// Pairs that finished the handshake, in discovery order. Only these are
    /// visible to consumers.
    complete_gimbals: Vec<GimbalPairId>,
    pub(crate) active_gimbal: Option<GimbalPairId>,

    status_throttle: StatusIntervalThrottle,

    /// Set while the 500 ms rate keep-alive should run; the run loop owns
    /// the actual timer and reconciles it against this flag.
    pub(crate) rate_timer_active: bool,

    /// Same contract as `rate_timer_active`, for the joystick sender.
    pub(crate) joystick_timer_active: bool,
    pub(crate) joystick_pitch_input: f32,
    pub(crate) joystick_yaw_input: f32,
    pub(crate) joystick_smoothed_pitch: f32,
    pub(crate) joystick_smoothed_yaw: f32,

    message_log: VecDeque<String>,
}

impl GimbalController {
    pub fn new(
        vehicle: Arc<dyn VehicleConnection>,
        settings: SharedSettings,
        events: UnboundedSender<GimbalEvent>,
    ) -> Self {
        Self {
            vehicle,
            settings,
            events,
            potential_managers: HashMap::new(),
            potential_gimbals: HashMap::new(),
            complete_gimbals: Vec::new(),
            active_gimbal: None,
            status_throttle: StatusIntervalThrottle::new(Duration::from_millis(1000)),
            rate_timer_active: false,
            joystick_timer_active: false,
            joystick_pitch_input: 0.0,
            joystick_yaw_input: 0.0,
            joystick_smoothed_pitch: 0.0,
            joystick_smoothed_yaw: 0.0,
            message_log: VecDeque::new(),
        }
    }

    /// Fully discovered gimbals, in discovery order.
    pub fn gimbals(&self) -> impl Iterator<Item = &Gimbal> {
        self.complete_gimbals
            .iter()
            .filter_map(|pair| self.potential_gimbals.get(pair))
    }

    /// A fully discovered gimbal by pair id.
    pub fn gimbal(&self, pair: GimbalPairId) -> Option<&Gimbal> {
        if !self.complete_gimbals.contains(&pair) {
            return None;
        }
        self.potential_gimbals.get(&pair)
    }

    pub fn active_pair(&self) -> Option<GimbalPairId> {
        self.active_gimbal
    }

    pub fn active_gimbal(&self) -> Option<&Gimbal> {
        self.active_gimbal
            .and_then(|pair| self.potential_gimbals.get(&pair))
    }

    /// Replace the active-gimbal selection. Only completed pairs qualify;
    /// re-selecting the current one is a no-op.
    pub fn set_active_gimbal(&mut self, pair: GimbalPairId) {
        match self.potential_gimbals.get(&pair) {
            None => {
                debug!(?pair, "set active gimbal: unknown pair, ignoring");
            }
            Some(g) if !g.is_complete => {
                debug!(?pair, "set active gimbal: discovery not complete, ignoring");
            }
            Some(_) => {
                if self.active_gimbal != Some(pair) {
                    debug!(?pair, "set active gimbal");
                    self.active_gimbal = Some(pair);
                    let _ = self.events.send(GimbalEvent::ActiveGimbalChanged(Some(pair)));
                }
            }
        }
    }

    /// Inbound frame entry point, called on the controller's own context.
    pub fn handle_mavlink_message(&mut self, compid: u8, message: &MavMessage) {
        // The handshake is unreliable while the autopilot is still busy with
        // parameter and mission downloads, so drop frames until that settles.
        if !self.vehicle.parameters_ready() {
            return;
        }

        match message {
            MavMessage::HEARTBEAT(_) => self.handle_heartbeat(compid),
            MavMessage::GIMBAL_MANAGER_INFORMATION(info) => {
                self.handle_gimbal_manager_information(compid, info)
            }
            MavMessage::GIMBAL_MANAGER_STATUS(status) => {
                self.handle_gimbal_manager_status(compid, status)
            }
            MavMessage::GIMBAL_DEVICE_ATTITUDE_STATUS(attitude) => {
                self.handle_gimbal_device_attitude_status(compid, attitude)
            }
            _ => {}
        }
    }

    fn handle_heartbeat(&mut self, compid: u8) {
        if !self.potential_managers.contains_key(&compid) {
            debug!(compid, "new potential gimbal manager component");
        }

        let manager = self.potential_managers.entry(compid).or_default();
        if !manager.received_manager_information && manager.request_information_retries > 0 {
            manager.request_information_retries -= 1;
            self.request_gimbal_information(compid);
        }
    }

    fn handle_gimbal_manager_information(
        &mut self,
        compid: u8,
        info: &GIMBAL_MANAGER_INFORMATION_DATA,
    ) {
        if info.gimbal_device_id == 0 {
            warn!(
                compid,
                device_id = info.gimbal_device_id,
                "GIMBAL_MANAGER_INFORMATION for invalid gimbal device"
            );
            return;
        }

        let pair = GimbalPairId { manager_compid: compid, device_id: info.gimbal_device_id };

        let gimbal = self.potential_gimbals.entry(pair).or_default();
        gimbal.manager_compid = compid;
        gimbal.device_id = info.gimbal_device_id;
        gimbal.capability_flags = info.cap_flags.bits();

        if !gimbal.received_manager_information {
            debug!(
                compid,
                device_id = info.gimbal_device_id,
                "gimbal manager is responsible for gimbal device"
            );
        }
        gimbal.received_manager_information = true;

        // Flag the manager entry too so heartbeats stop re-probing it.
        self.potential_managers
            .entry(compid)
            .or_default()
            .received_manager_information = true;

        self.check_complete(pair);
        let _ = self.events.send(GimbalEvent::GimbalUpdated(pair));
    }

    fn handle_gimbal_manager_status(&mut self, compid: u8, status: &GIMBAL_MANAGER_STATUS_DATA) {
        if status.gimbal_device_id == 0 {
            debug!(
                compid,
                device_id = status.gimbal_device_id,
                "GIMBAL_MANAGER_STATUS for invalid gimbal device id"
            );
            return;
        }

        let pair = GimbalPairId { manager_compid: compid, device_id: status.gimbal_device_id };
        let our_sysid = self.vehicle.our_system_id();
        let our_compid = self.vehicle.our_component_id();

        let gimbal = self.potential_gimbals.entry(pair).or_default();

        // Identity fields are first-writer-wins after 0: a disagreeing frame
        // is logged but never overwrites an established identity.
        if gimbal.device_id == 0 {
            gimbal.device_id = status.gimbal_device_id;
        } else if gimbal.device_id != status.gimbal_device_id {
            warn!(
                device_id = status.gimbal_device_id,
                stored = gimbal.device_id,
                "conflicting GIMBAL_MANAGER_STATUS gimbal_device_id"
            );
        }
        if gimbal.manager_compid == 0 {
            gimbal.manager_compid = compid;
        } else if gimbal.manager_compid != compid {
            warn!(compid, stored = gimbal.manager_compid, "conflicting GIMBAL_MANAGER_STATUS compid");
        }

        if !gimbal.received_manager_status {
            debug!(
                compid,
                device_id = status.gimbal_device_id,
                "gimbal manager reported status for gimbal device"
            );
        }
        gimbal.received_manager_status = true;

        let have_control = status.primary_control_sysid == our_sysid
            && status.primary_control_compid == our_compid;
        let others_have_control = !have_control
            && (status.primary_control_sysid != 0 && status.primary_control_compid != 0);

        gimbal.have_control = have_control;
        gimbal.others_have_control = others_have_control;

        self.check_complete(pair);
        let _ = self.events.send(GimbalEvent::GimbalUpdated(pair));
    }

    fn handle_gimbal_device_attitude_status(
        &mut self,
        compid: u8,
        attitude: &GIMBAL_DEVICE_ATTITUDE_STATUS_DATA,
    ) {
        let pair = if attitude.gimbal_device_id == 0 {
            // Legacy senders leave the id field empty: the device id is then
            // the sending component, and the owning manager is found by
            // reverse lookup over the records we already track.
            let device_id = compid;
            let found = self
                .potential_gimbals
                .iter()
                .find(|(_, g)| g.device_id == device_id)
                .map(|(key, _)| key.manager_compid);
            let Some(manager_compid) = found else {
                debug!(device_id, compid, "attitude status for unknown gimbal device");
                return;
            };
            GimbalPairId { manager_compid, device_id }
        } else if attitude.gimbal_device_id <= 6 {
            // A non-zero id 1-6 addresses a device behind the sending manager.
            GimbalPairId { manager_compid: compid, device_id: attitude.gimbal_device_id }
        } else {
            debug!(
                device_id = attitude.gimbal_device_id,
                compid, "attitude status for invalid gimbal device id"
            );
            return;
        };

        let heading = self.vehicle.heading_deg();
        let gimbal = self.potential_gimbals.entry(pair).or_default();

        let flags = attitude.flags;
        gimbal.retracted = flags.contains(GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_RETRACT);
        gimbal.yaw_lock = flags.contains(GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_LOCK);
        gimbal.neutral = flags.contains(GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_NEUTRAL);

        let (roll, pitch, yaw) = shaping::quat_to_euler(attitude.q);
        gimbal.absolute_roll = roll.to_degrees();
        gimbal.absolute_pitch = pitch.to_degrees();

        let yaw_deg = yaw.to_degrees();
        if yaw_in_vehicle_frame(flags) {
            gimbal.body_yaw = yaw_deg;
            let mut absolute_yaw = yaw_deg + heading;
            if absolute_yaw > 180.0 {
                absolute_yaw -= 360.0;
            }
            gimbal.absolute_yaw = absolute_yaw;
        } else {
            gimbal.absolute_yaw = yaw_deg;
            let mut body_yaw = yaw_deg - heading;
            if body_yaw < -180.0 {
                body_yaw += 360.0;
            }
            gimbal.body_yaw = body_yaw;
        }

        gimbal.received_device_attitude_status = true;

        self.check_complete(pair);
        let _ = self.events.send(GimbalEvent::GimbalUpdated(pair));
    }

    fn request_gimbal_information(&self, compid: u8) {
        debug!(compid, "requesting gimbal manager information");
        self.vehicle.send_command(
            compid,
            MavCmd::MAV_CMD_REQUEST_MESSAGE,
            false,
            [MSG_ID_GIMBAL_MANAGER_INFORMATION as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        );
    }

    /// Retry driver: re-probes whatever is still missing for the pair and
    /// promotes it once all three discovery messages arrived.
    fn check_complete(&mut self, pair: GimbalPairId) {
        let vehicle = Arc::clone(&self.vehicle);
        let Some(gimbal) = self.potential_gimbals.get_mut(&pair) else {
            return;
        };
        if gimbal.is_complete {
            return;
        }

        if !gimbal.received_manager_information && gimbal.request_information_retries > 0 {
            debug!(compid = pair.manager_compid, "requesting gimbal manager information");
            vehicle.send_command(
                pair.manager_compid,
                MavCmd::MAV_CMD_REQUEST_MESSAGE,
                false,
                [MSG_ID_GIMBAL_MANAGER_INFORMATION as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            );
            gimbal.request_information_retries -= 1;
        }

        if !gimbal.received_manager_status
            && gimbal.request_status_retries > 0
            && self.status_throttle.allow()
        {
            // Ask for the default rate first; the last two attempts fall
            // back to a fixed 0.2 Hz in case the manager rejects 0.
            let interval_us: u32 = if gimbal.request_status_retries > 2 { 0 } else { 5_000_000 };
            vehicle.send_command(
                pair.manager_compid,
                MavCmd::MAV_CMD_SET_MESSAGE_INTERVAL,
                false,
                [MSG_ID_GIMBAL_MANAGER_STATUS as f32, interval_us as f32, 0.0, 0.0, 0.0, 0.0, 0.0],
            );
            gimbal.request_status_retries -= 1;
            debug!(
                device_id = gimbal.device_id,
                manager_compid = pair.manager_compid,
                rate = if interval_us == 0 { "default" } else { "0.2 Hz" },
                retries_remaining = gimbal.request_status_retries,
                "requested GIMBAL_MANAGER_STATUS interval"
            );
        }

        if !gimbal.received_device_attitude_status
            && gimbal.request_attitude_retries > 0
            && gimbal.received_manager_information
            && pair.device_id != 0
        {
            // The attitude stream comes from the gimbal device component
            // itself, unless its id is 1-6: those live behind the manager.
            // Either way we need the manager information first to know which
            // device the manager is responsible for.
            let target_compid = if pair.device_id <= 6 { pair.manager_compid } else { pair.device_id };
            vehicle.send_command(
                target_compid,
                MavCmd::MAV_CMD_SET_MESSAGE_INTERVAL,
                false,
                [MSG_ID_GIMBAL_DEVICE_ATTITUDE_STATUS as f32, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            );
            gimbal.request_attitude_retries -= 1;
        }

        if !gimbal.received_manager_information
            || !gimbal.received_manager_status
            || !gimbal.received_device_attitude_status
        {
            return;
        }

        gimbal.is_complete = true;
        debug!(?pair, "gimbal discovery complete");

        self.complete_gimbals.push(pair);
        let _ = self.events.send(GimbalEvent::GimbalDiscovered(pair));

        if self.active_gimbal.is_none() {
            debug!(?pair, "set active gimbal");
            self.active_gimbal = Some(pair);
            let _ = self.events.send(GimbalEvent::ActiveGimbalChanged(Some(pair)));
        }
    }

    /// Period of the joystick sender timer, from the configured rate.
    pub(crate) fn joystick_send_interval(&self) -> Duration {
        let hz = self.settings.read().unwrap().effective_send_rate_hz();
        Duration::from_millis((1000 / hz).max(1) as u64)
    }

    /// Newest-first log of joystick attitude sends, bounded to the most
    /// recent 100 entries.
    pub fn message_log(&self) -> impl Iterator<Item = &str> {
        self.message_log.iter().map(String::as_str)
    }

    pub fn clear_message_log(&mut self) {
        self.message_log.clear();
        let _ = self.events.send(GimbalEvent::GimbalMessageLogChanged);
    }

    pub(crate) fn add_message_log(&mut self, line: String) {
        self.message_log.push_front(line);
        self.message_log.truncate(MAX_LOG_ENTRIES);
        let _ = self.events.send(GimbalEvent::GimbalMessageLogChanged);
    }
}

pub(crate) fn yaw_in_vehicle_frame(flags: GimbalDeviceFlags) -> bool {
    if flags.contains(GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_IN_VEHICLE_FRAME) {
        true
    } else if flags.contains(GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_IN_EARTH_FRAME) {
        false
    } else {
        // Devices predating the frame flags: yaw lock defines the frame.
        !flags.contains(GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_LOCK)
    }
}
