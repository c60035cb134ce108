//! Messages exchanged between the producer and worker contexts.

use crate::ChannelError;
use ponder_core::{RequestRecord, ResponseRecord};

/// One message on the offload link.
///
/// Payloads are owned copies; sending a message moves its bytes to the
/// other context and nothing on the sending side aliases them afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Compute-unit image, producer → worker. Only the first one counts.
    Init(Vec<u8>),
    /// Search request, producer → worker.
    Request(RequestRecord),
    /// Search result, worker → producer.
    Response(ResponseRecord),
}

/// Discriminant of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// See [`Message::Init`].
    Init,
    /// See [`Message::Request`].
    Request,
    /// See [`Message::Response`].
    Response,
}

impl MessageKind {
    /// Stable lowercase name of the kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            MessageKind::Init => "init",
            MessageKind::Request => "request",
            MessageKind::Response => "response",
        }
    }

    /// Parse a kind from its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "init" => Some(MessageKind::Init),
            "request" => Some(MessageKind::Request),
            "response" => Some(MessageKind::Response),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    /// Kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Init(_) => MessageKind::Init,
            Message::Request(_) => MessageKind::Request,
            Message::Response(_) => MessageKind::Response,
        }
    }

    /// Rebuild a message from a kind and raw payload bytes.
    ///
    /// Used when bridging from a byte-oriented transport. Request and response
    /// payloads must match their fixed sizes exactly.
    pub fn from_parts(kind: MessageKind, payload: &[u8]) -> Result<Self, ChannelError> {
        Ok(match kind {
            MessageKind::Init => Message::Init(payload.to_vec()),
            MessageKind::Request => Message::Request(RequestRecord::from_slice(payload)?),
            MessageKind::Response => Message::Response(ResponseRecord::from_slice(payload)?),
        })
    }

    /// Borrow the payload bytes.
    pub fn payload(&self) -> &[u8] {
        match self {
            Message::Init(image) => image,
            Message::Request(record) => record.as_ref(),
            Message::Response(record) => record.as_ref(),
        }
    }
}
