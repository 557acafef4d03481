//! Enipcrab error types.

use crate::cip::status::GeneralStatus;
use std::io;

/// An enipcrab error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A TCP-level failure: dial, write, read or timeout.
    ///
    /// The session is marked disconnected; the next operation re-dials and re-registers.
    Transport(TransportError),
    /// The peer sent something the encapsulation or CIP layer could not accept.
    Protocol(ProtocolError),
    /// The controller answered with a non-zero CIP general status.
    Cip(CipError),
    /// A malformed tag expression.
    Tag(TagError),
    /// A single tag's read request cannot fit the request size budget.
    RequestTooLarge {
        /// Encoded request size in bytes.
        size: usize,
    },
    /// An error occurred encoding or decoding an item.
    Wire(enipcrab_wire::WireError),
}

impl std::error::Error for Error {}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport: {}", e),
            Error::Protocol(e) => write!(f, "protocol: {}", e),
            Error::Cip(e) => write!(f, "cip: {}", e),
            Error::Tag(e) => write!(f, "tag: {}", e),
            Error::RequestTooLarge { size } => {
                write!(f, "request of {} bytes does not fit one frame", size)
            }
            Error::Wire(e) => write!(f, "wire encode/decode error: {}", e),
        }
    }
}

/// The socket operation that failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IoOp {
    /// Dialling the controller.
    Connect,
    /// Writing a request frame.
    Write,
    /// Reading a reply frame.
    Read,
}

impl core::fmt::Display for IoOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IoOp::Connect => f.write_str("connect"),
            IoOp::Write => f.write_str("write"),
            IoOp::Read => f.write_str("read"),
        }
    }
}

/// A TCP-level failure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Which socket operation failed.
    pub op: IoOp,
    /// The OS error category.
    pub kind: io::ErrorKind,
}

impl TransportError {
    pub(crate) fn new(op: IoOp, error: &io::Error) -> Self {
        Self {
            op,
            kind: error.kind(),
        }
    }

    /// `true` when the failure was a deadline expiry rather than a hard socket error.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
    }
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} failed: {:?}", self.op, self.kind)
    }
}

/// The peer broke the encapsulation or connected-messaging rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A reply frame was shorter than its layout requires.
    TruncatedFrame {
        /// Bytes required by the layout.
        expected: usize,
        /// Bytes actually received.
        received: usize,
    },
    /// The encapsulation header carried a non-zero status word.
    EncapStatus(u32),
    /// The encapsulation length field exceeds the protocol's payload limit.
    FrameTooLong {
        /// Advertised payload length.
        length: usize,
    },
    /// The reply echoed a sequence counter that does not match the request.
    SequenceMismatch {
        /// Counter sent with the request.
        sent: u16,
        /// Counter echoed in the reply.
        received: u16,
    },
    /// A reply value carried a type code the CIP type table does not know.
    UnknownCipType(u8),
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtocolError::TruncatedFrame { expected, received } => {
                write!(f, "truncated frame: need {} bytes, got {}", expected, received)
            }
            ProtocolError::EncapStatus(status) => {
                write!(f, "encapsulation status {:#010x}", status)
            }
            ProtocolError::FrameTooLong { length } => {
                write!(f, "encapsulation length {} exceeds protocol limit", length)
            }
            ProtocolError::SequenceMismatch { sent, received } => {
                write!(
                    f,
                    "sequence counter mismatch: sent {}, received {}",
                    sent, received
                )
            }
            ProtocolError::UnknownCipType(code) => {
                write!(f, "unknown CIP type code {:#04x}", code)
            }
        }
    }
}

/// A non-zero CIP general status returned by the controller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CipError {
    /// The general status code.
    pub status: GeneralStatus,
}

impl CipError {
    pub(crate) fn new(status: GeneralStatus) -> Self {
        Self { status }
    }
}

impl core::fmt::Display for CipError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({:#04x})", self.status, self.status.code())
    }
}

/// A malformed tag expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    /// The expression is empty.
    Empty,
    /// A dot-separated segment is empty, e.g. `A..B`.
    EmptySegment,
    /// An array subscript is missing its closing bracket or is not a list of integers.
    BadSubscript {
        /// The offending segment text.
        segment: String,
    },
    /// The trailing bit selector is not a representable integer.
    BadBitIndex {
        /// The offending segment text.
        segment: String,
    },
}

impl core::fmt::Display for TagError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TagError::Empty => f.write_str("empty tag expression"),
            TagError::EmptySegment => f.write_str("empty path segment"),
            TagError::BadSubscript { segment } => {
                write!(f, "malformed subscript in segment `{}`", segment)
            }
            TagError::BadBitIndex { segment } => {
                write!(f, "bit selector `{}` is out of range", segment)
            }
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<CipError> for Error {
    fn from(e: CipError) -> Self {
        Self::Cip(e)
    }
}

impl From<GeneralStatus> for Error {
    fn from(status: GeneralStatus) -> Self {
        Self::Cip(CipError::new(status))
    }
}

impl From<TagError> for Error {
    fn from(e: TagError) -> Self {
        Self::Tag(e)
    }
}

impl From<enipcrab_wire::WireError> for Error {
    fn from(e: enipcrab_wire::WireError) -> Self {
        Self::Wire(e)
    }
}
