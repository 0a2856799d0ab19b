//! Frame-stepped smoothing of a [`ControlValue`].
//!
//! The smoother never reads a clock: the caller passes the elapsed time
//! since the previous frame, so synthetic time steps work in tests.

use serde::{Deserialize, Serialize};

use super::interaction::InteractionState;
use super::value::ControlValue;
use crate::error::FaderError;

/// Default first-order release rate, in 1/seconds.
pub const DEFAULT_RELEASE_RATE: f32 = 8.0;

/// Settle tolerance as a fraction of the control's span.
pub const SETTLE_FRACTION: f32 = 1e-3;

/// How a released auto-return control travels back to rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "curve", rename_all = "lowercase")]
pub enum Release {
    /// Constant speed, in value units per second.
    Linear { units_per_second: f32 },

    /// First-order approach: the remaining distance shrinks by
    /// `e^(-rate * dt)` each step.
    Exponential { rate: f32 },
}

impl Default for Release {
    fn default() -> Self {
        Self::Exponential {
            rate: DEFAULT_RELEASE_RATE,
        }
    }
}

impl Release {
    fn validate(&self) -> Result<(), FaderError> {
        let rate = match *self {
            Self::Linear { units_per_second } => units_per_second,
            Self::Exponential { rate } => rate,
        };
        if rate.is_finite() && rate > 0.0 {
            Ok(())
        } else {
            Err(FaderError::InvalidRange("release rate must be finite and > 0"))
        }
    }

    /// Move `from` toward `to` over `dt` seconds without passing it.
    fn step(&self, from: f32, to: f32, dt: f32) -> f32 {
        let distance = to - from;
        let next = match *self {
            Self::Linear { units_per_second } => {
                let max_step = units_per_second * dt;
                if distance.abs() <= max_step {
                    to
                } else {
                    from + max_step.copysign(distance)
                }
            }
            Self::Exponential { rate } => from + distance * (1.0 - (-rate * dt).exp()),
        };
        // Rounding must never carry the value past the target.
        if (to - next).signum() != distance.signum() {
            to
        } else {
            next
        }
    }
}

/// Result of one [`ValueSmoother::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// The smoothed value after this frame.
    pub value: f32,
    /// The release ease reached rest this frame; the interaction state
    /// should move to `Idle`.
    pub settled: bool,
}

/// Advances a [`ControlValue`] one frame at a time.
#[derive(Debug, Clone)]
pub struct ValueSmoother {
    value: ControlValue,
    release: Release,
    epsilon: f32,
}

impl ValueSmoother {
    pub fn new(value: ControlValue, release: Release) -> Result<Self, FaderError> {
        release.validate()?;
        let epsilon = SETTLE_FRACTION * value.span();
        Ok(Self {
            value,
            release,
            epsilon,
        })
    }

    pub fn value(&self) -> &ControlValue {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut ControlValue {
        &mut self.value
    }

    pub fn release(&self) -> Release {
        self.release
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// Advance by `dt` seconds under the given interaction state.
    ///
    /// `dt <= 0` (or a non-finite `dt`) changes nothing.
    pub fn advance(&mut self, dt: f32, state: InteractionState) -> Step {
        let current = self.value.smoothed();
        if !dt.is_finite() || dt <= 0.0 {
            return Step {
                value: current,
                settled: false,
            };
        }

        match state {
            InteractionState::Adjusting => {
                let raw = self.value.raw();
                self.value.set_smoothed(raw);
                Step {
                    value: self.value.smoothed(),
                    settled: false,
                }
            }
            InteractionState::JustReleased => {
                let rest = self.value.rest();
                let next = self.release.step(current, rest, dt);
                if (next - rest).abs() < self.epsilon {
                    self.value.set_smoothed(rest);
                    Step {
                        value: rest,
                        settled: true,
                    }
                } else {
                    self.value.set_smoothed(next);
                    Step {
                        value: self.value.smoothed(),
                        settled: false,
                    }
                }
            }
            InteractionState::Idle => Step {
                value: current,
                settled: false,
            },
        }
    }
}
