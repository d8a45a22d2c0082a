//! Shared fixtures for the unit tests: a recording vehicle, an event drain
//! and builders for the inbound gimbal frames.

use std::sync::Arc;

use mavlink::common::{
    GimbalDeviceFlags, GimbalManagerCapFlags, MavAutopilot, MavMessage, MavModeFlag, MavState,
    MavType, GIMBAL_DEVICE_ATTITUDE_STATUS_DATA, GIMBAL_MANAGER_INFORMATION_DATA,
    GIMBAL_MANAGER_STATUS_DATA, HEARTBEAT_DATA,
};
use tokio::sync::mpsc;

use crate::controller::GimbalController;
use crate::events::GimbalEvent;
use crate::settings::GimbalControllerSettings;
use crate::vehicle::{MockVehicle, VehicleConnection};

pub(crate) fn setup() -> (
    GimbalController,
    Arc<MockVehicle>,
    mpsc::UnboundedReceiver<GimbalEvent>,
) {
    let vehicle = Arc::new(MockVehicle::default());
    let settings = GimbalControllerSettings::default().shared();
    let (tx, rx) = mpsc::unbounded_channel();
    let controller =
        GimbalController::new(vehicle.clone() as Arc<dyn VehicleConnection>, settings, tx);
    (controller, vehicle, rx)
}

pub(crate) fn heartbeat() -> MavMessage {
    MavMessage::HEARTBEAT(HEARTBEAT_DATA {
        custom_mode: 0,
        mavtype: MavType::MAV_TYPE_GENERIC,
        autopilot: MavAutopilot::MAV_AUTOPILOT_INVALID,
        base_mode: MavModeFlag::empty(),
        system_status: MavState::MAV_STATE_ACTIVE,
        mavlink_version: 3,
    })
}

pub(crate) fn manager_information(device_id: u8, cap_flags: u32) -> MavMessage {
    let mut info = GIMBAL_MANAGER_INFORMATION_DATA::default();
    info.cap_flags = GimbalManagerCapFlags::from_bits_truncate(cap_flags);
    info.gimbal_device_id = device_id;
    MavMessage::GIMBAL_MANAGER_INFORMATION(info)
}

pub(crate) fn manager_status(device_id: u8, primary_sysid: u8, primary_compid: u8) -> MavMessage {
    let mut status = GIMBAL_MANAGER_STATUS_DATA::default();
    status.gimbal_device_id = device_id;
    status.primary_control_sysid = primary_sysid;
    status.primary_control_compid = primary_compid;
    MavMessage::GIMBAL_MANAGER_STATUS(status)
}

pub(crate) fn attitude_status(device_id: u8, flags: GimbalDeviceFlags, q: [f32; 4]) -> MavMessage {
    let mut attitude = GIMBAL_DEVICE_ATTITUDE_STATUS_DATA::default();
    attitude.gimbal_device_id = device_id;
    attitude.flags = flags;
    attitude.q = q;
    MavMessage::GIMBAL_DEVICE_ATTITUDE_STATUS(attitude)
}

/// Run the full handshake for one pair, discarding the discovery probes the
/// controller emits along the way.
pub(crate) fn discover(
    controller: &mut GimbalController,
    vehicle: &MockVehicle,
    compid: u8,
    device_id: u8,
) {
    controller.handle_mavlink_message(compid, &manager_information(device_id, 0x7F));
    controller.handle_mavlink_message(compid, &manager_status(device_id, 0, 0));
    controller.handle_mavlink_message(
        compid,
        &attitude_status(
            device_id,
            GimbalDeviceFlags::GIMBAL_DEVICE_FLAGS_YAW_IN_VEHICLE_FRAME,
            [1.0, 0.0, 0.0, 0.0],
        ),
    );
    vehicle.take_commands();
}
