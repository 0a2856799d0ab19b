//! Range model for a single fader.

use crate::error::FaderError;

/// Raw input, smoothed output and the static range of one control.
///
/// `min`, `max` and `rest` are fixed at construction. `smoothed` is kept
/// inside `[min, max]` by every mutator.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlValue {
    raw: f32,
    smoothed: f32,
    min: f32,
    max: f32,
    rest: f32,
}

impl ControlValue {
    /// Create a value at rest. Fails if the bounds are not finite, if
    /// `min > max`, or if `rest` lies outside them.
    pub fn new(min: f32, max: f32, rest: f32) -> Result<Self, FaderError> {
        if !min.is_finite() || !max.is_finite() || !rest.is_finite() {
            return Err(FaderError::InvalidRange("bounds must be finite"));
        }
        if min > max {
            return Err(FaderError::InvalidRange("min must not exceed max"));
        }
        if rest < min || rest > max {
            return Err(FaderError::InvalidRange("rest value outside [min, max]"));
        }
        Ok(Self {
            raw: rest,
            smoothed: rest,
            min,
            max,
            rest,
        })
    }

    pub fn raw(&self) -> f32 {
        self.raw
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn rest(&self) -> f32 {
        self.rest
    }

    /// Width of the range, never zero.
    pub fn span(&self) -> f32 {
        (self.max - self.min).max(f32::EPSILON)
    }

    /// Record an input sample. NaN is dropped; infinities are kept and
    /// clamped on the way into `smoothed`.
    pub fn set_raw(&mut self, sample: f32) {
        if sample.is_nan() {
            return;
        }
        self.raw = sample;
    }

    /// Store `value` as the smoothed output, clamped to the range.
    pub fn set_smoothed(&mut self, value: f32) {
        if value.is_nan() {
            return;
        }
        self.smoothed = self.clamp(value);
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}
