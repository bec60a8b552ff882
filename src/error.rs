//! Error types for the WebSocket message engine.
//!
//! Three families live here:
//!
//! - [`Error`]: codec, protocol and configuration errors (RFC 6455).
//! - [`WriteError`]: why an outbound frame was never fully written.
//! - [`HandlerError`]: what an application callback reports back to the
//!   dispatcher.

use thiserror::Error;

use crate::message::CloseCode;

/// Result type alias for WebSocket operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during WebSocket operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Invalid frame structure or header.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Invalid UTF-8 in text frame or close reason.
    #[error("Invalid UTF-8 in text frame")]
    InvalidUtf8,

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Actual frame size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Payload length cannot be represented on this platform.
    #[error("Payload too large for platform: {size} bytes (max: {max})")]
    PayloadTooLargeForPlatform {
        /// Declared payload length.
        size: u64,
        /// Largest length the platform can address.
        max: u64,
    },

    /// Connection has been closed.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// Invalid close code.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Unmasked client frame (security violation).
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Masked server frame (security violation).
    #[error("Server frame must not be masked")]
    MaskedServerFrame,

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Incomplete frame data.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// Invalid opcode value.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// Configuration rejected by [`Config::validate`](crate::Config::validate).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The application object could not be bound to a callback table.
    #[error("Invalid handler: {0}")]
    InvalidHandler(String),

    /// An outbound write failed.
    #[error("Write failed: {0}")]
    Write(#[from] WriteError),

    /// An application callback failed.
    #[error("Application error: {0}")]
    Handler(#[from] HandlerError),
}

impl Error {
    /// The close status the engine sends when this error ends a connection.
    ///
    /// Invalid UTF-8 maps to 1007, size violations to 1009, I/O trouble to
    /// 1006 (never put on the wire), everything else to 1002.
    #[must_use]
    pub const fn close_code(&self) -> CloseCode {
        match self {
            Error::InvalidUtf8 => CloseCode::InvalidPayload,
            Error::FrameTooLarge { .. }
            | Error::MessageTooLarge { .. }
            | Error::TooManyFragments { .. }
            | Error::PayloadTooLargeForPlatform { .. } => CloseCode::MessageTooBig,
            Error::Io(_) | Error::Write(_) | Error::ConnectionClosed(_) => CloseCode::Abnormal,
            Error::Handler(HandlerError::Close { code, .. }) => *code,
            Error::Handler(HandlerError::Failed(_)) => CloseCode::InternalError,
            _ => CloseCode::ProtocolError,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}

/// Why an outbound frame was not (fully) written.
///
/// Every variant is terminal for the frame it is reported to; the queue never
/// retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WriteError {
    /// The queue stopped admitting frames (a CLOSE was enqueued or the queue
    /// was force-closed).
    #[error("write-closed")]
    Closed,

    /// The queue already failed; `cause` is the failure it recorded.
    #[error("queue-failed: {0}")]
    QueueFailed(Box<WriteError>),

    /// The transport failed to write.
    #[error("write-fault: {0}")]
    Fault(String),

    /// The connection was administratively torn down.
    #[error("forced-disconnect")]
    ForcedDisconnect,

    /// A bounded wait on the frame's completion elapsed. The frame itself
    /// may still be written later.
    #[error("write-timeout")]
    TimedOut,
}

impl WriteError {
    /// The underlying failure, unwrapping [`WriteError::QueueFailed`].
    #[must_use]
    pub fn root_cause(&self) -> &WriteError {
        match self {
            WriteError::QueueFailed(cause) => cause.root_cause(),
            other => other,
        }
    }
}

impl From<std::io::Error> for WriteError {
    fn from(err: std::io::Error) -> Self {
        WriteError::Fault(err.to_string())
    }
}

/// Error returned by an application callback.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// Close the connection with this status and reason.
    #[error("close {}: {reason}", code.as_u16())]
    Close {
        /// Status to send.
        code: CloseCode,
        /// Reason to send (truncated to fit a control frame).
        reason: String,
    },

    /// Any other application failure.
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Ask the engine to close with `code` and `reason`.
    #[must_use]
    pub fn close(code: CloseCode, reason: impl Into<String>) -> Self {
        HandlerError::Close {
            code,
            reason: reason.into(),
        }
    }

    /// Report an unexpected application failure.
    #[must_use]
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        HandlerError::Failed(reason.to_string())
    }
}

/// Result returned by every application callback.
pub type HandlerResult = std::result::Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::FrameTooLarge {
            size: 20_000_000,
            max: 16_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Frame too large: 20000000 bytes (max: 16000000)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let ws_err: Error = io_err.into();
        assert!(matches!(ws_err, Error::Io(_)));
    }

    #[test]
    fn test_close_code_mapping() {
        assert_eq!(Error::InvalidUtf8.close_code(), CloseCode::InvalidPayload);
        assert_eq!(
            Error::MessageTooLarge { size: 2, max: 1 }.close_code(),
            CloseCode::MessageTooBig
        );
        assert_eq!(Error::ReservedOpcode(0x3).close_code(), CloseCode::ProtocolError);
        assert_eq!(Error::UnmaskedClientFrame.close_code(), CloseCode::ProtocolError);
        assert_eq!(Error::Io("reset".into()).close_code(), CloseCode::Abnormal);
    }

    #[test]
    fn test_write_error_labels() {
        assert_eq!(WriteError::Closed.to_string(), "write-closed");
        assert_eq!(WriteError::ForcedDisconnect.to_string(), "forced-disconnect");
        assert_eq!(
            WriteError::Fault("broken pipe".into()).to_string(),
            "write-fault: broken pipe"
        );
        let failed = WriteError::QueueFailed(Box::new(WriteError::ForcedDisconnect));
        assert_eq!(failed.to_string(), "queue-failed: forced-disconnect");
        assert_eq!(failed.root_cause(), &WriteError::ForcedDisconnect);
    }

    #[test]
    fn test_handler_error_display() {
        let err = HandlerError::close(CloseCode::PolicyViolation, "nope");
        assert_eq!(err.to_string(), "close 1008: nope");
        assert_eq!(HandlerError::failed("boom").to_string(), "boom");
    }
}
