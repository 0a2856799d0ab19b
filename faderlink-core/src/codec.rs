//! OSC wire encoding for parameter updates.
//!
//! One update is one OSC message: the control's address path and a single
//! float32 argument, carried in one UDP datagram.

use rosc::{OscMessage, OscPacket, OscType};

use crate::control::ControlId;
use crate::error::FaderError;

/// A single `(path, value)` parameter update.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamUpdate {
    pub address: String,
    pub value: f32,
}

impl ParamUpdate {
    pub fn new(id: &ControlId, value: f32) -> Self {
        Self {
            address: id.as_str().to_string(),
            value,
        }
    }

    /// Serialize to an OSC packet.
    pub fn encode(&self) -> Result<Vec<u8>, FaderError> {
        let packet = OscPacket::Message(OscMessage {
            addr: self.address.clone(),
            args: vec![OscType::Float(self.value)],
        });
        Ok(rosc::encoder::encode(&packet)?)
    }

    /// Parse a datagram produced by [`encode`](Self::encode).
    ///
    /// Anything other than a message with exactly one numeric argument is
    /// rejected.
    pub fn decode(datagram: &[u8]) -> Result<Self, FaderError> {
        let (_, packet) = rosc::decoder::decode_udp(datagram)?;
        let OscPacket::Message(msg) = packet else {
            return Err(FaderError::Encoding("expected an OSC message, got a bundle".into()));
        };
        let value = match msg.args.as_slice() {
            [OscType::Float(v)] => *v,
            [OscType::Double(v)] => *v as f32,
            [OscType::Int(v)] => *v as f32,
            other => {
                return Err(FaderError::Encoding(format!(
                    "expected one numeric argument, got {other:?}"
                )));
            }
        };
        Ok(Self {
            address: msg.addr,
            value,
        })
    }
}
