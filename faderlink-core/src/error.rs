//! Domain-specific error types for faderlink.
//!
//! Nothing in the core is fatal: every error degrades to "the control keeps
//! working locally, transmission is paused".

use thiserror::Error;

use crate::control::InteractionState;
use crate::endpoint::Endpoint;

/// The canonical error type for the faderlink core.
#[derive(Debug, Error)]
pub enum FaderError {
    // ── Input Validation ─────────────────────────────────────────
    /// The host text is not a usable network address.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    /// The port text is not an integer in `1..=65535`.
    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    // ── Connection ───────────────────────────────────────────────
    /// A syntactically valid endpoint could not be turned into a sender.
    #[error("connection to {endpoint} failed: {source}")]
    ConnectionFailed {
        endpoint: Endpoint,
        #[source]
        source: std::io::Error,
    },

    // ── Interaction ──────────────────────────────────────────────
    /// The UI issued an interaction event the current state cannot accept.
    #[error("out-of-order interaction event: {event} while {state}")]
    OutOfOrderTransition {
        event: &'static str,
        state: InteractionState,
    },

    // ── Control Settings ─────────────────────────────────────────
    /// Bounds, rest value or release rate are inconsistent.
    #[error("invalid control range: {0}")]
    InvalidRange(&'static str),

    /// An OSC address path failed validation.
    #[error("invalid parameter path: {0:?}")]
    InvalidAddressPath(String),

    // ── Wire / Storage ───────────────────────────────────────────
    /// OSC encoding of an update failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Reading or writing the persisted endpoint failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] std::io::Error),
}

impl FaderError {
    /// `true` for errors caused by text the user typed into a field.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidAddress(_) | Self::InvalidPort(_))
    }
}

impl From<rosc::OscError> for FaderError {
    fn from(e: rosc::OscError) -> Self {
        FaderError::Encoding(format!("{e:?}"))
    }
}
