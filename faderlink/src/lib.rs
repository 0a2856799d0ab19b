//! # faderlink — headless fader surface
//!
//! Drives `faderlink-core` from a frame loop: faders are manipulated with
//! line commands on stdin, their smoothed values stream out as OSC over
//! UDP, and the destination is edited and persisted like the host/port
//! fields of the on-screen version.

pub mod config;
pub mod surface;
