//! # faderlink-core
//!
//! Continuous-value synchronization engine for an OSC fader surface.
//!
//! This crate contains:
//! - **Control**: `ControlValue`, `ValueSmoother` and the per-fader
//!   `InteractionState` machine, wrapped as `Control`
//! - **Endpoint**: host/port validation with `EndpointEditor`
//! - **Connection**: `ConnectionManager`, owner of the one live sender
//! - **Transport**: non-blocking UDP `DatagramSender`s
//! - **Persist**: `EndpointStore` for the last good endpoint
//! - **Codec**: OSC encoding of `ParamUpdate`s via `rosc`
//! - **Dispatch**: `MessageDispatcher`, change-driven transmission
//! - **Error**: `FaderError`, a `thiserror`-based error enum
//!
//! Everything here is synchronous and driven by explicit calls: the host
//! calls [`Control::advance`] once per frame with the elapsed time and
//! then hands the smoothed values to the dispatcher.

pub mod codec;
pub mod connection;
pub mod control;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod persist;
pub mod transport;

#[cfg(test)]
mod test_support;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::ParamUpdate;
pub use connection::{ConnectionManager, ConnectionStatus, SenderHandle};
pub use control::{
    Control, ControlId, ControlSettings, ControlValue, InteractionState, Release, ValueSmoother,
};
pub use dispatch::{DispatchOutcome, MessageDispatcher};
pub use endpoint::{Endpoint, EndpointEditor, FieldStatus, HostPolicy};
pub use error::FaderError;
pub use persist::{EndpointStore, FileEndpointStore, MemoryEndpointStore, StoredEndpoint};
pub use transport::{DatagramSender, SenderFactory, UdpSender, UdpSenderFactory};
