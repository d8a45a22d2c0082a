//! Gimbal Protocol v2 manager client for MAVLink ground stations.
//!
//! Discovers gimbal devices behind the gimbal managers of a vehicle, tracks
//! which station holds primary control, and issues pointing, rate and
//! configuration commands. Joystick axis samples arriving from a foreign
//! thread are shaped (deadband, expo, smoothing) and streamed to the gimbal
//! as attitude setpoints at a configurable rate.
//!
//! The controller is single-threaded: inbound frames, joystick samples and
//! UI commands are all marshalled onto one execution context through
//! [`runtime::ControllerHandle`], and the [`runtime::run`] loop owns the
//! rate keep-alive and joystick sender timers.

pub mod controller;
pub mod events;
pub mod gimbal;
pub mod runtime;
pub mod settings;
pub mod shaping;
pub mod vehicle;

mod commands;
mod joystick;

#[cfg(test)]
pub(crate) mod testutil;
