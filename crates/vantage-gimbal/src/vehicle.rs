//! The slice of the vehicle/link layer the gimbal controller consumes.

use std::sync::Mutex;

use anyhow::Result;
use mavlink::common::{MavCmd, MavMessage};

/// Handle to a live link to the vehicle. May go away at any time, so it is
/// re-fetched before every message send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkHandle {
    /// MAVLink channel the frame should be packed for.
    pub channel: u8,
}

/// Narrow view of the vehicle connection. All sends are non-blocking; NaN
/// command parameters mean "unset".
pub trait VehicleConnection: Send + Sync {
    /// The parameter download has settled; discovery traffic is reliable now.
    fn parameters_ready(&self) -> bool;

    /// Vehicle yaw in degrees.
    fn heading_deg(&self) -> f32;

    /// Our station's MAVLink system id.
    fn our_system_id(&self) -> u8;

    /// Our station's MAVLink component id.
    fn our_component_id(&self) -> u8;

    /// Target system id for outbound frames.
    fn vehicle_id(&self) -> u8;

    /// The primary link, if one is currently up.
    fn primary_link(&self) -> Option<LinkHandle>;

    /// Fire-and-forget COMMAND_LONG to a component on the vehicle.
    fn send_command(
        &self,
        target_compid: u8,
        command: MavCmd,
        show_error: bool,
        params: [f32; 7],
    );

    /// Thread-safe, non-blocking message send on a specific link.
    fn send_message_on_link(&self, link: LinkHandle, message: MavMessage) -> Result<()>;
}

/// One recorded COMMAND_LONG emission.
#[derive(Debug, Clone)]
pub struct SentCommand {
    pub target_compid: u8,
    pub command: MavCmd,
    pub show_error: bool,
    pub params: [f32; 7],
}

/// Recording double used by unit and integration tests: every command and
/// message goes into a vector the test inspects afterwards.
#[derive(Debug)]
pub struct MockVehicle {
    pub state: Mutex<MockVehicleState>,
}

#[derive(Debug)]
pub struct MockVehicleState {
    pub parameters_ready: bool,
    pub heading_deg: f32,
    pub system_id: u8,
    pub component_id: u8,
    pub vehicle_id: u8,
    pub link: Option<LinkHandle>,
    pub commands: Vec<SentCommand>,
    pub messages: Vec<(LinkHandle, MavMessage)>,
}

impl Default for MockVehicle {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockVehicleState {
                parameters_ready: true,
                heading_deg: 0.0,
                system_id: 255,
                component_id: 190,
                vehicle_id: 1,
                link: Some(LinkHandle { channel: 0 }),
                commands: Vec::new(),
                messages: Vec::new(),
            }),
        }
    }
}

impl MockVehicle {
    /// Drain and return everything sent so far via `send_command`.
    pub fn take_commands(&self) -> Vec<SentCommand> {
        std::mem::take(&mut self.state.lock().unwrap().commands)
    }

    /// Drain and return everything sent so far via `send_message_on_link`.
    pub fn take_messages(&self) -> Vec<(LinkHandle, MavMessage)> {
        std::mem::take(&mut self.state.lock().unwrap().messages)
    }
}

impl VehicleConnection for MockVehicle {
    fn parameters_ready(&self) -> bool {
        self.state.lock().unwrap().parameters_ready
    }

    fn heading_deg(&self) -> f32 {
        self.state.lock().unwrap().heading_deg
    }

    fn our_system_id(&self) -> u8 {
        self.state.lock().unwrap().system_id
    }

    fn our_component_id(&self) -> u8 {
        self.state.lock().unwrap().component_id
    }

    fn vehicle_id(&self) -> u8 {
        self.state.lock().unwrap().vehicle_id
    }

    fn primary_link(&self) -> Option<LinkHandle> {
        self.state.lock().unwrap().link
    }

    fn send_command(
        &self,
        target_compid: u8,
        command: MavCmd,
        show_error: bool,
        params: [f32; 7],
    ) {
        self.state.lock().unwrap().commands.push(SentCommand {
            target_compid,
            command,
            show_error,
            params,
        });
    }

    fn send_message_on_link(&self, link: LinkHandle, message: MavMessage) -> Result<()> {
        self.state.lock().unwrap().messages.push((link, message));
        Ok(())
    }
}
