//! Faders: range model, smoothing and pointer interaction.
//!
//! A [`Control`] is the unit the UI layer talks to. It owns one
//! [`ValueSmoother`] and one [`InteractionState`] and is advanced once per
//! frame with the elapsed time.

pub mod interaction;
pub mod smoother;
pub mod value;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

pub use interaction::InteractionState;
pub use smoother::{Release, Step, ValueSmoother};
pub use value::ControlValue;

use crate::error::FaderError;

// ── ControlId ────────────────────────────────────────────────────

/// Characters OSC reserves for address patterns.
const RESERVED_PATH_CHARS: &[char] = &['#', '*', ',', '?', '[', ']', '{', '}'];

/// The OSC address path a control transmits on, e.g. `/mod/1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlId(Arc<str>);

impl ControlId {
    pub fn new(path: &str) -> Result<Self, FaderError> {
        let valid = path.len() > 1
            && path.starts_with('/')
            && !path
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || RESERVED_PATH_CHARS.contains(&c));
        if valid {
            Ok(Self(Arc::from(path)))
        } else {
            Err(FaderError::InvalidAddressPath(path.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── ControlSettings ──────────────────────────────────────────────

/// Construction-time description of a fader, as loaded from config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    /// Display name.
    pub name: String,
    /// OSC address path.
    pub address: String,
    #[serde(default = "default_min")]
    pub min: f32,
    #[serde(default = "default_max")]
    pub max: f32,
    /// Value eased toward on release; `min` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<f32>,
    /// Ease back to `rest` on release instead of holding.
    #[serde(default)]
    pub auto_return: bool,
    #[serde(default)]
    pub release: Release,
}

fn default_min() -> f32 {
    0.0
}

fn default_max() -> f32 {
    1.0
}

impl ControlSettings {
    /// Unit-range fader at `address` that holds its position.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            min: default_min(),
            max: default_max(),
            rest: None,
            auto_return: false,
            release: Release::default(),
        }
    }

    /// A mod-wheel style fader that springs back to `rest`.
    pub fn auto_returning(mut self, rest: f32) -> Self {
        self.rest = Some(rest);
        self.auto_return = true;
        self
    }

    pub fn with_range(mut self, min: f32, max: f32) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_release(mut self, release: Release) -> Self {
        self.release = release;
        self
    }

    /// The configured rest value, or `min` when none was given.
    pub fn rest(&self) -> f32 {
        self.rest.unwrap_or(self.min)
    }
}

// ── Control ──────────────────────────────────────────────────────

/// One fader: interaction state plus smoothed value.
///
/// Out-of-order interaction events are rejected, logged and counted; they
/// never change the state or the value.
#[derive(Debug, Clone)]
pub struct Control {
    id: ControlId,
    name: String,
    auto_return: bool,
    state: InteractionState,
    smoother: ValueSmoother,
    rejected: u64,
}

impl Control {
    pub fn new(settings: &ControlSettings) -> Result<Self, FaderError> {
        let id = ControlId::new(&settings.address)?;
        let value = ControlValue::new(settings.min, settings.max, settings.rest())?;
        let smoother = ValueSmoother::new(value, settings.release)?;
        Ok(Self {
            id,
            name: settings.name.clone(),
            auto_return: settings.auto_return,
            state: InteractionState::Idle,
            smoother,
            rejected: 0,
        })
    }

    pub fn id(&self) -> &ControlId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn auto_return(&self) -> bool {
        self.auto_return
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// The smoothed value, for rendering and transmission.
    pub fn value(&self) -> f32 {
        self.smoother.value().smoothed()
    }

    pub fn raw(&self) -> f32 {
        self.smoother.value().raw()
    }

    pub fn range(&self) -> (f32, f32) {
        let v = self.smoother.value();
        (v.min(), v.max())
    }

    /// Not moving: idle, or sitting exactly on its rest value or a bound.
    pub fn is_stopped(&self) -> bool {
        let v = self.smoother.value();
        let value = v.smoothed();
        self.state.is_idle() || value == v.rest() || value == v.min() || value == v.max()
    }

    /// Number of interaction events rejected as out of order.
    pub fn rejected_transitions(&self) -> u64 {
        self.rejected
    }

    /// Pointer down with the first sample.
    pub fn on_interaction_start(&mut self, sample: f32) {
        match self.state.begin_adjust() {
            Ok(()) => {
                self.smoother.value_mut().set_raw(sample);
                debug!(control = %self.id, sample, "interaction started");
            }
            Err(e) => self.reject(e),
        }
    }

    /// Pointer moved while held.
    pub fn on_input_sample(&mut self, sample: f32) {
        match self.state.check_sample() {
            Ok(()) => self.smoother.value_mut().set_raw(sample),
            Err(e) => self.reject(e),
        }
    }

    /// Pointer up.
    pub fn on_interaction_end(&mut self) {
        match self.state.release(self.auto_return) {
            Ok(()) => debug!(control = %self.id, state = %self.state, "interaction ended"),
            Err(e) => self.reject(e),
        }
    }

    /// Set the value from another source (loaded preset, remote) without
    /// touching the interaction state. While idle the value applies at once.
    pub fn on_external_set(&mut self, value: f32) {
        let v = self.smoother.value_mut();
        v.set_raw(value);
        if self.state.is_idle() {
            let raw = v.raw();
            v.set_smoothed(raw);
        }
    }

    /// Advance one frame by `dt` seconds and return the smoothed value.
    pub fn advance(&mut self, dt: f32) -> f32 {
        let step = self.smoother.advance(dt, self.state);
        if step.settled {
            if let Err(e) = self.state.settle() {
                self.reject(e);
            } else {
                debug!(control = %self.id, value = step.value, "returned to rest");
            }
        }
        step.value
    }

    fn reject(&mut self, e: FaderError) {
        self.rejected += 1;
        error!(control = %self.id, error = %e, "rejected interaction event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    fn mod_wheel() -> Control {
        Control::new(&ControlSettings::new("Mod", "/mod/1").auto_returning(0.0)).unwrap()
    }

    #[test]
    fn control_id_validation() {
        assert!(ControlId::new("/mod/1").is_ok());
        assert!(ControlId::new("mod/1").is_err());
        assert!(ControlId::new("/").is_err());
        assert!(ControlId::new("/mod wheel").is_err());
        assert!(ControlId::new("/mod/*").is_err());
        assert!(ControlId::new("/a,b").is_err());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad_range = ControlSettings::new("x", "/x").with_range(1.0, 0.0);
        assert!(matches!(Control::new(&bad_range), Err(FaderError::InvalidRange(_))));

        let bad_path = ControlSettings::new("x", "x");
        assert!(matches!(
            Control::new(&bad_path),
            Err(FaderError::InvalidAddressPath(_))
        ));
    }

    #[test]
    fn release_returns_to_rest_and_idles() {
        let mut c = mod_wheel();
        c.on_interaction_start(0.9);
        for _ in 0..3 {
            c.on_input_sample(0.9);
            assert_eq!(c.advance(FRAME), 0.9);
        }
        c.on_interaction_end();
        assert_eq!(c.state(), InteractionState::JustReleased);

        let mut previous = c.value();
        let mut frames = 0;
        while c.state() != InteractionState::Idle {
            let v = c.advance(FRAME);
            assert!(v <= previous);
            previous = v;
            frames += 1;
            assert!(frames < 10_000);
        }
        assert_eq!(c.value(), 0.0);
        assert_eq!(c.rejected_transitions(), 0);
    }

    #[test]
    fn hold_control_keeps_position_after_release() {
        let mut c = Control::new(&ControlSettings::new("Hold", "/hold")).unwrap();
        c.on_interaction_start(0.6);
        c.advance(FRAME);
        c.on_interaction_end();
        assert!(c.state().is_idle());
        for _ in 0..10 {
            assert_eq!(c.advance(FRAME), 0.6);
        }
    }

    #[test]
    fn end_before_start_does_not_mutate() {
        let mut c = mod_wheel();
        c.on_external_set(0.4);
        let before = c.value();
        c.on_interaction_end();
        assert_eq!(c.value(), before);
        assert!(c.state().is_idle());
        assert_eq!(c.rejected_transitions(), 1);
    }

    #[test]
    fn samples_outside_a_drag_are_ignored() {
        let mut c = mod_wheel();
        c.on_input_sample(0.8);
        assert_eq!(c.raw(), 0.0);
        assert_eq!(c.rejected_transitions(), 1);
    }

    #[test]
    fn double_start_keeps_first_sample() {
        let mut c = mod_wheel();
        c.on_interaction_start(0.3);
        c.on_interaction_start(0.8);
        assert_eq!(c.raw(), 0.3);
        assert!(c.state().is_adjusting());
        assert_eq!(c.rejected_transitions(), 1);
    }

    #[test]
    fn external_set_keeps_interaction_state() {
        let mut c = mod_wheel();
        c.on_external_set(0.5);
        assert!(c.state().is_idle());
        assert_eq!(c.value(), 0.5);

        c.on_interaction_start(0.2);
        c.on_external_set(0.7);
        assert!(c.state().is_adjusting());
        assert_eq!(c.advance(FRAME), 0.7);
    }

    #[test]
    fn external_set_is_clamped() {
        let mut c = mod_wheel();
        c.on_external_set(9.0);
        assert_eq!(c.value(), 1.0);
    }

    #[test]
    fn rest_defaults_to_min() {
        let settings = ControlSettings::new("Offset", "/offset").with_range(0.2, 1.0);
        assert_eq!(settings.rest(), 0.2);
        let c = Control::new(&settings).unwrap();
        assert_eq!(c.value(), 0.2);

        let explicit = settings.auto_returning(0.5);
        assert_eq!(Control::new(&explicit).unwrap().value(), 0.5);
    }

    #[test]
    fn stopped_while_idle_or_on_a_bound() {
        let mut c = mod_wheel();
        assert!(c.is_stopped());
        c.on_interaction_start(0.5);
        c.advance(FRAME);
        assert!(!c.is_stopped());
        c.on_input_sample(1.0);
        c.advance(FRAME);
        assert!(c.is_stopped());
        c.on_interaction_end();
        c.advance(FRAME);
        assert!(!c.is_stopped());
    }

    #[test]
    fn regrab_during_release() {
        let mut c = mod_wheel();
        c.on_interaction_start(1.0);
        c.advance(FRAME);
        c.on_interaction_end();
        c.advance(FRAME);
        c.on_interaction_start(0.95);
        assert!(c.state().is_adjusting());
        assert_eq!(c.advance(FRAME), 0.95);
    }
}
