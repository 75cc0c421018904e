//! Host-facing surface
//!
//! One inbound port accepting trigger, string or object payloads, and two
//! outbound ports: received message records (A) and the live session handle (B).

use std::sync::Arc;

use log::debug;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::client::Conference;
use crate::config::{MeetingArgs, PropsUpdate};
use crate::error::MeetingError;
use crate::messages::MessageRecord;

/// The single hot inbound port
pub const INLET_MAIN: usize = 0;
/// Outbound port carrying [`MessageRecord`]s
pub const OUTLET_MESSAGES: usize = 0;
/// Outbound port carrying the live session handle
pub const OUTLET_SESSION: usize = 1;

/// Data delivered on an inbound port
#[derive(Debug, Clone, PartialEq)]
pub enum HostPayload {
    Bang,
    Text(String),
    Object(Value),
}

impl From<Value> for HostPayload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => HostPayload::Bang,
            Value::String(text) => HostPayload::Text(text),
            other => HostPayload::Object(other),
        }
    }
}

impl From<&str> for HostPayload {
    fn from(text: &str) -> Self {
        HostPayload::Text(text.to_string())
    }
}

/// Lifecycle and data events delivered by the host
#[derive(Debug, Clone)]
pub enum HostEvent {
    Init,
    ArgsUpdated(MeetingArgs),
    PropsUpdated(PropsUpdate),
    Inlet { inlet: usize, data: HostPayload },
    Destroy,
}

impl HostEvent {
    pub fn inlet(data: impl Into<HostPayload>) -> Self {
        HostEvent::Inlet {
            inlet: INLET_MAIN,
            data: data.into(),
        }
    }
}

/// Something emitted towards the host
#[derive(Debug, Clone)]
pub enum HostOutput {
    Message(MessageRecord),
    Session(Arc<dyn Conference>),
    Error(String),
}

impl HostOutput {
    /// Port the output is emitted on; errors go to the host console instead
    pub fn outlet(&self) -> Option<usize> {
        match self {
            HostOutput::Message(_) => Some(OUTLET_MESSAGES),
            HostOutput::Session(_) => Some(OUTLET_SESSION),
            HostOutput::Error(_) => None,
        }
    }
}

/// Output side of the host
pub trait HostOutputs: Send + Sync {
    fn emit_message(&self, record: MessageRecord);

    fn emit_session(&self, conference: Arc<dyn Conference>);

    fn report_error(&self, error: &MeetingError);
}

/// Outputs forwarded over an unbounded channel
pub struct ChannelOutputs {
    sender: mpsc::UnboundedSender<HostOutput>,
}

impl ChannelOutputs {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HostOutput>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, output: HostOutput) {
        if self.sender.send(output).is_err() {
            debug!("Host output receiver dropped, discarding output");
        }
    }
}

impl HostOutputs for ChannelOutputs {
    fn emit_message(&self, record: MessageRecord) {
        self.send(HostOutput::Message(record));
    }

    fn emit_session(&self, conference: Arc<dyn Conference>) {
        self.send(HostOutput::Session(conference));
    }

    fn report_error(&self, error: &MeetingError) {
        self.send(HostOutput::Error(error.user_message()));
    }
}
