//! Change-driven transmission of smoothed values.
//!
//! The dispatcher may be polled every frame; it only puts a datagram on
//! the wire when a control's value moved past the threshold since the
//! last successful send. Controls that have stopped moving are sent on
//! any change at all, so the receiver always ends up on the final value.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::codec::ParamUpdate;
use crate::connection::SenderHandle;
use crate::control::{Control, ControlId};

/// What happened to one [`MessageDispatcher::on_value_changed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// One message was handed to the socket.
    Sent,
    /// Within threshold of the last transmitted value.
    Unchanged,
    /// No live sender; nothing to do.
    NoConnection,
    /// Encoding or the socket refused; retried on the next change check.
    SendFailed,
}

#[derive(Debug)]
pub struct MessageDispatcher {
    sender: SenderHandle,
    threshold: f32,
    last_sent: HashMap<ControlId, f32>,
    sent: u64,
}

impl MessageDispatcher {
    /// Dispatcher that sends on any change at all.
    pub fn new(sender: SenderHandle) -> Self {
        Self {
            sender,
            threshold: 0.0,
            last_sent: HashMap::new(),
            sent: 0,
        }
    }

    /// Skip updates whose distance to the last sent value is at most
    /// `threshold`. Negative or non-finite values mean "exact equality".
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = if threshold.is_finite() && threshold > 0.0 {
            threshold
        } else {
            0.0
        };
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Messages sent since construction.
    pub fn sent_count(&self) -> u64 {
        self.sent
    }

    /// The value last transmitted for `id`, if any.
    pub fn last_sent(&self, id: &ControlId) -> Option<f32> {
        self.last_sent.get(id).copied()
    }

    /// Transmit `value` for `id` if it differs from what was last sent.
    pub fn on_value_changed(&mut self, id: &ControlId, value: f32) -> DispatchOutcome {
        self.dispatch(id, value, self.threshold)
    }

    /// Transmit a control's smoothed value. The threshold only applies
    /// while the control is moving; see [`Control::is_stopped`].
    pub fn on_control(&mut self, control: &Control) -> DispatchOutcome {
        let threshold = if control.is_stopped() {
            0.0
        } else {
            self.threshold
        };
        self.dispatch(control.id(), control.value(), threshold)
    }

    fn dispatch(&mut self, id: &ControlId, value: f32, threshold: f32) -> DispatchOutcome {
        if self.sender.take_changed() {
            debug!("destination changed; resending all controls");
            self.last_sent.clear();
        }

        let Some(sender) = self.sender.current() else {
            return DispatchOutcome::NoConnection;
        };

        if let Some(last) = self.last_sent.get(id) {
            if (value - last).abs() <= threshold {
                return DispatchOutcome::Unchanged;
            }
        }

        let datagram = match ParamUpdate::new(id, value).encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                trace!(control = %id, error = %e, "encode failed");
                return DispatchOutcome::SendFailed;
            }
        };

        match sender.send(&datagram) {
            Ok(_) => {
                self.last_sent.insert(id.clone(), value);
                self.sent += 1;
                trace!(control = %id, value, "sent");
                DispatchOutcome::Sent
            }
            Err(e) => {
                trace!(control = %id, error = %e, "send failed");
                DispatchOutcome::SendFailed
            }
        }
    }

    /// Run every control's current value through the change check.
    pub fn dispatch_all<'a>(&mut self, controls: impl IntoIterator<Item = &'a Control>) -> usize {
        controls
            .into_iter()
            .filter(|c| self.on_control(c) == DispatchOutcome::Sent)
            .count()
    }

    /// Drop state for a control that was torn down.
    pub fn forget(&mut self, id: &ControlId) {
        self.last_sent.remove(id);
    }
}
