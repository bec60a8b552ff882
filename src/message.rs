//! Close status codes and the CLOSE frame payload (RFC 6455 Section 5.5.1).

use crate::error::{Error, Result};
use crate::protocol::frame::MAX_CONTROL_FRAME_PAYLOAD;
use crate::protocol::utf8::Utf8Validator;

/// Longest close reason that fits a control frame next to the status code.
pub const MAX_CLOSE_REASON: usize = MAX_CONTROL_FRAME_PAYLOAD - 2;

/// WebSocket close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000). The connection successfully completed.
    #[default]
    Normal,
    /// Going away (1001). Endpoint is going away (e.g., server shutdown, browser navigating away).
    GoingAway,
    /// Protocol error (1002). Endpoint received a malformed frame or protocol violation.
    ProtocolError,
    /// Unsupported data (1003). Endpoint received data type it cannot handle.
    UnsupportedData,
    /// No status received (1005). Reported locally when a CLOSE carries no payload.
    NoStatus,
    /// Abnormal closure (1006). Reported locally when the transport vanished without a CLOSE.
    Abnormal,
    /// Invalid payload (1007). Endpoint received a message with invalid data (e.g., non-UTF-8 in text).
    InvalidPayload,
    /// Policy violation (1008). Endpoint received a message that violates its policy.
    PolicyViolation,
    /// Message too big (1009). Endpoint received a message too large to process.
    MessageTooBig,
    /// Mandatory extension (1010). Client expected server to negotiate an extension.
    MandatoryExtension,
    /// Internal error (1011). Server encountered an unexpected condition.
    InternalError,
    /// Custom close code (3000-4999 for applications, 1012-1014 for registered codes).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::GoingAway,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1005 => CloseCode::NoStatus,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1010 => CloseCode::MandatoryExtension,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::GoingAway => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::NoStatus => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::MandatoryExtension => 1010,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Check if this close code may appear in a Close frame per RFC 6455 Section 7.4.1.
    ///
    /// Valid: 1000-1003, 1007-1014, 3000-4999.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }

    /// Check if this close code is reserved and MUST NOT be sent in a Close frame.
    ///
    /// Reserved codes: 1004, 1005, 1006, 1015.
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1004..=1006 | 1015)
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Close frame containing status code and optional reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable reason for closing (UTF-8, max 123 bytes on the wire).
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    /// Decode and validate a received CLOSE payload.
    ///
    /// An empty payload means "no status" and decodes to [`CloseCode::NoStatus`].
    ///
    /// # Errors
    ///
    /// - `Error::ProtocolViolation` for a 1-byte payload
    /// - `Error::InvalidCloseCode` for codes that may not be sent
    /// - `Error::InvalidUtf8` if the reason is not valid UTF-8
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        match payload {
            [] => Ok(Self::new(CloseCode::NoStatus, "")),
            [_] => Err(Error::ProtocolViolation(
                "close payload must carry a 2-byte status code".into(),
            )),
            [hi, lo, reason @ ..] => {
                let code = CloseCode::from_u16(u16::from_be_bytes([*hi, *lo]));
                if !code.is_valid() {
                    return Err(Error::InvalidCloseCode(code.as_u16()));
                }

                let mut validator = Utf8Validator::new();
                validator.process(reason)?;
                if !validator.is_complete() {
                    return Err(Error::InvalidUtf8);
                }
                let reason = String::from_utf8(reason.to_vec()).map_err(|_| Error::InvalidUtf8)?;
                Ok(Self::new(code, reason))
            }
        }
    }

    /// Encode as a CLOSE payload.
    ///
    /// A code that may not appear on the wire, [`CloseCode::NoStatus`]
    /// included, encodes to an empty payload. The reason is truncated to
    /// [`MAX_CLOSE_REASON`] bytes.
    #[must_use]
    pub fn to_payload(&self) -> Vec<u8> {
        if !self.code.is_valid() {
            return Vec::new();
        }
        let reason = truncate_reason(&self.reason);
        let mut data = Vec::with_capacity(2 + reason.len());
        data.extend_from_slice(&self.code.as_u16().to_be_bytes());
        data.extend_from_slice(reason.as_bytes());
        data
    }
}

/// Cut `reason` to at most [`MAX_CLOSE_REASON`] bytes on a char boundary.
#[must_use]
pub fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(1000), CloseCode::Normal);
        assert_eq!(CloseCode::from_u16(1001), CloseCode::GoingAway);
        assert_eq!(CloseCode::from_u16(1002), CloseCode::ProtocolError);
        assert_eq!(CloseCode::from_u16(1005), CloseCode::NoStatus);
        assert_eq!(CloseCode::from_u16(1006), CloseCode::Abnormal);
        assert_eq!(CloseCode::from_u16(1011), CloseCode::InternalError);
        assert_eq!(CloseCode::from_u16(4999), CloseCode::Other(4999));
    }

    #[test]
    fn test_close_code_validity() {
        assert!(CloseCode::Normal.is_valid());
        assert!(CloseCode::InternalError.is_valid());
        assert!(CloseCode::Other(1012).is_valid());
        assert!(CloseCode::Other(3000).is_valid());

        assert!(!CloseCode::NoStatus.is_valid());
        assert!(!CloseCode::Abnormal.is_valid());
        assert!(!CloseCode::Other(999).is_valid());
        assert!(!CloseCode::Other(1004).is_valid());
        assert!(!CloseCode::Other(1015).is_valid());
        assert!(!CloseCode::Other(2999).is_valid());
        assert!(!CloseCode::Other(5000).is_valid());
    }

    #[test]
    fn test_close_code_reserved() {
        assert!(CloseCode::NoStatus.is_reserved());
        assert!(CloseCode::Abnormal.is_reserved());
        assert!(CloseCode::Other(1015).is_reserved());
        assert!(!CloseCode::Normal.is_reserved());
    }

    #[test]
    fn test_close_frame_from_payload() {
        let mut payload = 1000u16.to_be_bytes().to_vec();
        payload.extend_from_slice(b"bye");
        let close = CloseFrame::from_payload(&payload).unwrap();
        assert_eq!(close.code, CloseCode::Normal);
        assert_eq!(close.reason, "bye");
    }

    #[test]
    fn test_close_frame_empty_payload_is_no_status() {
        let close = CloseFrame::from_payload(&[]).unwrap();
        assert_eq!(close.code, CloseCode::NoStatus);
        assert!(close.reason.is_empty());
        assert!(close.to_payload().is_empty());
    }

    #[test]
    fn test_close_frame_rejects_bad_payloads() {
        assert!(matches!(
            CloseFrame::from_payload(&[0x03]),
            Err(Error::ProtocolViolation(_))
        ));
        assert!(matches!(
            CloseFrame::from_payload(&1005u16.to_be_bytes()),
            Err(Error::InvalidCloseCode(1005))
        ));
        assert!(matches!(
            CloseFrame::from_payload(&[0x03, 0xe8, 0xc0, 0xaf]),
            Err(Error::InvalidUtf8)
        ));
        // Reason ends inside a multi-byte sequence.
        assert!(matches!(
            CloseFrame::from_payload(&[0x03, 0xe8, 0xe2, 0x82]),
            Err(Error::InvalidUtf8)
        ));
    }

    #[test]
    fn test_truncate_reason_on_char_boundary() {
        let short = "fine";
        assert_eq!(truncate_reason(short), "fine");

        let long = "é".repeat(100); // 200 bytes
        let cut = truncate_reason(&long);
        assert!(cut.len() <= MAX_CLOSE_REASON);
        assert_eq!(cut.len(), 122);
        assert!(cut.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_to_payload_drops_unsendable_codes() {
        for code in [CloseCode::Abnormal, CloseCode::Other(1015), CloseCode::Other(999)] {
            assert!(CloseFrame::new(code, "why").to_payload().is_empty(), "{code}");
        }
        assert_eq!(
            CloseFrame::new(CloseCode::Other(4000), "").to_payload(),
            4000u16.to_be_bytes()
        );
    }

    #[test]
    fn test_to_payload_truncates() {
        let close = CloseFrame::new(CloseCode::InternalError, "x".repeat(500));
        let payload = close.to_payload();
        assert_eq!(payload.len(), MAX_CONTROL_FRAME_PAYLOAD);
        assert_eq!(&payload[..2], &1011u16.to_be_bytes());
    }
}
