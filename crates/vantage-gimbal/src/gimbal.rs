//! Per-gimbal state assembled by the discovery handshake.

/// How many times each missing discovery message is requested before the
/// pair silently stops probing.
pub const DISCOVERY_RETRIES: u8 = 5;

/// Key identifying one controllable gimbal: the manager component speaking
/// for it and the device id that manager reports. A stored key never has
/// `device_id == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GimbalPairId {
    pub manager_compid: u8,
    pub device_id: u8,
}

/// Bookkeeping for a component that sent a heartbeat and might be a gimbal
/// manager. Tracked per component id, not per pair: the manager is addressed
/// by compid while the device it speaks for may report a different id.
#[derive(Debug)]
pub struct PotentialGimbalManager {
    pub received_manager_information: bool,
    pub request_information_retries: u8,
}

impl Default for PotentialGimbalManager {
    fn default() -> Self {
        Self {
            received_manager_information: false,
            request_information_retries: DISCOVERY_RETRIES,
        }
    }
}

/// State of one (manager, device) pair.
///
/// Identity fields mirror what the wire messages claimed; the map key is
/// authoritative for addressing. Angles are degrees wrapped to (-180, 180].
#[derive(Debug, Clone)]
pub struct Gimbal {
    pub manager_compid: u8,
    pub device_id: u8,
    pub capability_flags: u32,

    pub received_manager_information: bool,
    pub received_manager_status: bool,
    pub received_device_attitude_status: bool,
    /// Set once all three discovery messages arrived; never cleared.
    pub is_complete: bool,

    pub request_information_retries: u8,
    pub request_status_retries: u8,
    pub request_attitude_retries: u8,

    pub absolute_roll: f32,
    pub absolute_pitch: f32,
    pub absolute_yaw: f32,
    pub body_yaw: f32,

    pub retracted: bool,
    pub yaw_lock: bool,
    pub neutral: bool,

    pub have_control: bool,
    pub others_have_control: bool,

    /// Commanded rates in deg/s, re-sent by the keep-alive while nonzero.
    pub pitch_rate: f32,
    pub yaw_rate: f32,
}

impl Default for Gimbal {
    fn default() -> Self {
        Self {
            manager_compid: 0,
            device_id: 0,
            capability_flags: 0,
            received_manager_information: false,
            received_manager_status: false,
            received_device_attitude_status: false,
            is_complete: false,
            request_information_retries: DISCOVERY_RETRIES,
            request_status_retries: DISCOVERY_RETRIES,
            request_attitude_retries: DISCOVERY_RETRIES,
            absolute_roll: 0.0,
            absolute_pitch: 0.0,
            absolute_yaw: 0.0,
            body_yaw: 0.0,
            retracted: false,
            yaw_lock: false,
            neutral: false,
            have_control: false,
            others_have_control: false,
            pitch_rate: 0.0,
            yaw_rate: 0.0,
        }
    }
}
