//! The controller's execution context: a single task draining one ordered
//! inbox, plus the two timers the command handlers start and stop.

use std::time::Duration;

use mavlink::common::MavMessage;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{interval, Interval, MissedTickBehavior};

use crate::controller::GimbalController;
use crate::gimbal::GimbalPairId;

/// Cadence of the rate keep-alive, chosen well under the autopilot's
/// rate-command timeout.
const RATE_KEEP_ALIVE_INTERVAL: Duration = Duration::from_millis(500);

/// Everything marshalled onto the controller context, in arrival order.
#[derive(Debug)]
pub enum ControllerInput {
    /// An inbound MAVLink frame, tagged with the sender component id.
    Mavlink { compid: u8, message: MavMessage },
    /// One joystick axis sample from the joystick thread.
    JoystickAxes(Vec<f32>),
    /// A UI-originated request.
    Command(GimbalCommand),
}

/// UI-facing command surface, queued so callers never touch controller
/// state from their own threads.
#[derive(Debug, Clone)]
pub enum GimbalCommand {
    SetActiveGimbal(GimbalPairId),
    PitchBodyYaw { pitch_deg: f32, yaw_deg: f32, show_error: bool },
    PitchAbsoluteYaw { pitch_deg: f32, yaw_deg: f32, show_error: bool },
    SendRate,
    GimbalRate { pitch_rate_deg_s: f32, yaw_rate_deg_s: f32 },
    SetRetract(bool),
    SetYawLock(bool),
    AcquireControl,
    ReleaseControl,
    Center,
    OnScreenControl {
        pan_pct: f32,
        tilt_pct: f32,
        click_and_point: bool,
        click_and_drag: bool,
    },
    PitchStart(i32),
    PitchStop,
    YawStart(i32),
    YawStop,
    ClearMessageLog,
}

/// Cheap, cloneable front door to the controller task. Posting never blocks,
/// so it is safe from the joystick thread and the link receiver thread.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: UnboundedSender<ControllerInput>,
}

impl ControllerHandle {
    /// Deliver an inbound frame from the link receiver thread.
    pub fn handle_mavlink_message(&self, compid: u8, message: MavMessage) {
        let _ = self.tx.send(ControllerInput::Mavlink { compid, message });
    }

    /// Joystick thread entry point. No logic here beyond posting the sample
    /// in order; the consumer applies latest-wins.
    pub fn process_joystick_gimbal_input(&self, axis_values: Vec<f32>) {
        let _ = self.tx.send(ControllerInput::JoystickAxes(axis_values));
    }

    pub fn command(&self, command: GimbalCommand) {
        let _ = self.tx.send(ControllerInput::Command(command));
    }
}

/// The inbox pair: hand the receiver to [`run`], keep the handle.
pub fn controller_channel() -> (ControllerHandle, UnboundedReceiver<ControllerInput>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ControllerHandle { tx }, rx)
}

/// Drive the controller until every handle is dropped. All record mutation
/// and outbound traffic happens here; the timers are reconciled against the
/// controller's flags after every event so a discrete command that stops the
/// keep-alive can never race its own re-send.
pub async fn run(mut controller: GimbalController, mut inputs: UnboundedReceiver<ControllerInput>) {
    let mut rate_timer: Option<Interval> = None;
    let mut joystick_timer: Option<Interval> = None;

    loop {
        tokio::select! {
            input = inputs.recv() => {
                match input {
                    Some(input) => dispatch(&mut controller, input),
                    None => break,
                }
            }
            _ = tick(&mut rate_timer), if rate_timer.is_some() => {
                // Re-send so the autopilot's rate-command timeout never
                // elapses while a rate is held.
                controller.send_rate();
            }
            _ = tick(&mut joystick_timer), if joystick_timer.is_some() => {
                controller.joystick_send_tick();
            }
        }

        if controller.rate_timer_active && rate_timer.is_none() {
            rate_timer = Some(new_interval(RATE_KEEP_ALIVE_INTERVAL));
        } else if !controller.rate_timer_active {
            rate_timer = None;
        }

        if controller.joystick_timer_active && joystick_timer.is_none() {
            joystick_timer = Some(new_interval(controller.joystick_send_interval()));
        } else if !controller.joystick_timer_active {
            joystick_timer = None;
        }
    }
}

fn dispatch(controller: &mut GimbalController, input: ControllerInput) {
    match input {
        ControllerInput::Mavlink { compid, message } => {
            controller.handle_mavlink_message(compid, &message)
        }
        ControllerInput::JoystickAxes(values) => controller.handle_joystick_gimbal_input(&values),
        ControllerInput::Command(command) => match command {
            GimbalCommand::SetActiveGimbal(pair) => controller.set_active_gimbal(pair),
            GimbalCommand::PitchBodyYaw { pitch_deg, yaw_deg, show_error } => {
                controller.send_pitch_body_yaw(pitch_deg, yaw_deg, show_error)
            }
            GimbalCommand::PitchAbsoluteYaw { pitch_deg, yaw_deg, show_error } => {
                controller.send_pitch_absolute_yaw(pitch_deg, yaw_deg, show_error)
            }
            GimbalCommand::SendRate => controller.send_rate(),
            GimbalCommand::GimbalRate { pitch_rate_deg_s, yaw_rate_deg_s } => {
                controller.send_gimbal_rate(pitch_rate_deg_s, yaw_rate_deg_s)
            }
            GimbalCommand::SetRetract(set) => controller.set_gimbal_retract(set),
            GimbalCommand::SetYawLock(set) => controller.set_gimbal_yaw_lock(set),
            GimbalCommand::AcquireControl => controller.acquire_gimbal_control(),
            GimbalCommand::ReleaseControl => controller.release_gimbal_control(),
            GimbalCommand::Center => controller.center_gimbal(),
            GimbalCommand::OnScreenControl { pan_pct, tilt_pct, click_and_point, click_and_drag } => {
                controller.gimbal_on_screen_control(pan_pct, tilt_pct, click_and_point, click_and_drag)
            }
            GimbalCommand::PitchStart(direction) => controller.gimbal_pitch_start(direction),
            GimbalCommand::PitchStop => controller.gimbal_pitch_stop(),
            GimbalCommand::YawStart(direction) => controller.gimbal_yaw_start(direction),
            GimbalCommand::YawStop => controller.gimbal_yaw_stop(),
            GimbalCommand::ClearMessageLog => controller.clear_message_log(),
        },
    }
}

async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn new_interval(period: Duration) -> Interval {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // A fresh tokio interval fires immediately; the command that started the
    // timer already sent, so push the first tick one full period out.
    timer.reset();
    timer
}
