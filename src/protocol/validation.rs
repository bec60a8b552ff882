//! Early validation of incoming frame headers (RFC 6455 Section 5.1-5.2).
//!
//! [`FrameValidator::check_header`] looks at the raw header bytes before the
//! payload has arrived, so a peer cannot make the reader buffer an oversized
//! or unmasked frame before it gets rejected.

use crate::config::Limits;
use crate::connection::Role;
use crate::error::{Error, Result};

/// Frame validator for incoming WebSocket frames.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    role: Role,
    limits: Limits,
    accept_unmasked_frames: bool,
}

impl FrameValidator {
    /// Create a validator for the local `role`.
    pub fn new(role: Role, limits: Limits) -> Self {
        Self {
            role,
            limits,
            accept_unmasked_frames: false,
        }
    }

    /// Accept unmasked frames from clients (non-RFC compliant, testing only).
    pub fn with_accept_unmasked(mut self, accept: bool) -> Self {
        self.accept_unmasked_frames = accept;
        self
    }

    /// Validate whatever part of the header is available in `buf`.
    ///
    /// Returns `Ok(())` when the header is acceptable so far, including when
    /// too few bytes are present to decide on the payload length yet.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` / `Error::MaskedServerFrame`
    /// - `Error::ReservedBitsSet`
    /// - `Error::FrameTooLarge`
    pub fn check_header(&self, buf: &[u8]) -> Result<()> {
        let [byte0, byte1, rest @ ..] = buf else {
            return Ok(());
        };

        self.validate_masking(byte1 & 0x80 != 0)?;
        if byte0 & 0x70 != 0 {
            return Err(Error::ReservedBitsSet);
        }

        let payload_len = match byte1 & 0x7F {
            len @ 0..=125 => Some(u64::from(len)),
            126 => rest
                .get(..2)
                .map(|b| u64::from(u16::from_be_bytes([b[0], b[1]]))),
            _ => rest.get(..8).map(|b| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(b);
                u64::from_be_bytes(raw)
            }),
        };

        if let Some(len) = payload_len {
            let size = usize::try_from(len).unwrap_or(usize::MAX);
            self.limits.check_frame_size(size)?;
        }
        Ok(())
    }

    /// Servers reject unmasked frames, clients reject masked ones.
    fn validate_masking(&self, masked: bool) -> Result<()> {
        match self.role {
            Role::Server if !masked && !self.accept_unmasked_frames => {
                Err(Error::UnmaskedClientFrame)
            }
            Role::Client if masked => Err(Error::MaskedServerFrame),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> FrameValidator {
        FrameValidator::new(Role::Server, Limits::default())
    }

    #[test]
    fn test_server_requires_mask() {
        assert!(matches!(
            server().check_header(&[0x81, 0x05]),
            Err(Error::UnmaskedClientFrame)
        ));
        assert!(server().check_header(&[0x81, 0x85]).is_ok());
        assert!(
            server()
                .with_accept_unmasked(true)
                .check_header(&[0x81, 0x05])
                .is_ok()
        );
    }

    #[test]
    fn test_client_rejects_mask() {
        let client = FrameValidator::new(Role::Client, Limits::default());
        assert!(matches!(
            client.check_header(&[0x81, 0x85]),
            Err(Error::MaskedServerFrame)
        ));
        assert!(client.check_header(&[0x81, 0x05]).is_ok());
    }

    #[test]
    fn test_reserved_bits() {
        for byte0 in [0xc1, 0xa1, 0x91] {
            assert!(matches!(
                server().check_header(&[byte0, 0x80]),
                Err(Error::ReservedBitsSet)
            ));
        }
    }

    #[test]
    fn test_frame_size_limit_before_payload() {
        let limits = Limits::default().with_max_frame_size(1024);
        let validator = FrameValidator::new(Role::Server, limits);

        // 16-bit length 2048, no payload bytes yet.
        assert!(matches!(
            validator.check_header(&[0x82, 0xfe, 0x08, 0x00]),
            Err(Error::FrameTooLarge { size: 2048, max: 1024 })
        ));
        // 64-bit length, header still incomplete: no verdict yet.
        assert!(validator.check_header(&[0x82, 0xff, 0x00]).is_ok());
        let mut header = vec![0x82, 0xff];
        header.extend(u64::MAX.to_be_bytes());
        assert!(matches!(
            validator.check_header(&header),
            Err(Error::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_short_buffer_is_undecided() {
        assert!(server().check_header(&[]).is_ok());
        assert!(server().check_header(&[0x81]).is_ok());
    }
}
