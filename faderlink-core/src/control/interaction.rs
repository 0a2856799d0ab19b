//! Per-control pointer interaction state machine.
//!
//! Transitions are validated and return `Result` instead of panicking;
//! a rejected transition leaves the state untouched.

use crate::error::FaderError;

/// Where a control is in its interaction cycle.
///
/// ```text
///           start                 end (auto-return)
///  Idle ────────────► Adjusting ────────────────► JustReleased
///   ▲  ◄──────────────    ▲    end (hold)              │
///   │                     └────────── start ───────────┤
///   └───────────────────── settled ────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    /// Not touched; the output holds (or has reached rest).
    #[default]
    Idle,

    /// Pointer is down; the output tracks the raw input.
    Adjusting,

    /// Pointer released on an auto-return control; easing back to rest.
    JustReleased,
}

impl std::fmt::Display for InteractionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Adjusting => write!(f, "Adjusting"),
            Self::JustReleased => write!(f, "JustReleased"),
        }
    }
}

impl InteractionState {
    pub fn is_adjusting(&self) -> bool {
        matches!(self, Self::Adjusting)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Adjusting`.
    ///
    /// Valid from: `Idle`, `JustReleased`.
    pub fn begin_adjust(&mut self) -> Result<(), FaderError> {
        match self {
            Self::Idle | Self::JustReleased => {
                *self = Self::Adjusting;
                Ok(())
            }
            Self::Adjusting => Err(self.rejected("interaction start")),
        }
    }

    /// Leave `Adjusting`, either easing back (`auto_return`) or holding.
    ///
    /// Valid from: `Adjusting`.
    pub fn release(&mut self, auto_return: bool) -> Result<(), FaderError> {
        match self {
            Self::Adjusting => {
                *self = if auto_return {
                    Self::JustReleased
                } else {
                    Self::Idle
                };
                Ok(())
            }
            _ => Err(self.rejected("interaction end")),
        }
    }

    /// The eased value reached rest.
    ///
    /// Valid from: `JustReleased`.
    pub fn settle(&mut self) -> Result<(), FaderError> {
        match self {
            Self::JustReleased => {
                *self = Self::Idle;
                Ok(())
            }
            _ => Err(self.rejected("settle")),
        }
    }

    /// Accept a pointer sample.
    ///
    /// Valid in: `Adjusting`.
    pub fn check_sample(&self) -> Result<(), FaderError> {
        match self {
            Self::Adjusting => Ok(()),
            _ => Err(self.rejected("input sample")),
        }
    }

    fn rejected(&self, event: &'static str) -> FaderError {
        FaderError::OutOfOrderTransition {
            event,
            state: *self,
        }
    }
}
