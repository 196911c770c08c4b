//! Transport-neutral frames exchanged with consumers.

use axum::extract::ws::{CloseFrame, Message};
use bytes::Bytes;

/// One request or response unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 payload.
    Text(String),
    /// Raw bytes.
    Binary(Bytes),
}

impl Frame {
    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(t) => t.len(),
            Self::Binary(b) => b.len(),
        }
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What the reader task observed on the socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A data frame.
    Frame(Frame),
    /// The peer closed, with its close code if it sent one.
    Close(Option<u16>),
}

impl Inbound {
    /// Map a socket message. Control frames yield `None`.
    pub fn from_message(msg: Message) -> Option<Self> {
        match msg {
            Message::Text(t) => Some(Self::Frame(Frame::Text(t.as_str().to_owned()))),
            Message::Binary(b) => Some(Self::Frame(Frame::Binary(b))),
            Message::Close(close) => Some(Self::Close(close.map(|c: CloseFrame| c.code))),
            Message::Ping(_) | Message::Pong(_) => None,
        }
    }
}

impl From<Frame> for Message {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Text(t) => Message::Text(t.into()),
            Frame::Binary(b) => Message::Binary(b),
        }
    }
}
