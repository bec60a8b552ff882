//! WebSocket frame parsing and serialization (RFC 6455 Section 5.2).
//!
//! Outbound frames are normally turned into wire bytes by the chunked
//! [`Generator`](crate::protocol::Generator); [`Frame::write`] serializes a
//! whole frame in one go and backs the round-trip tests.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::message::CloseFrame;
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask;

/// Maximum payload size for control frames (RFC 6455).
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Largest possible frame header: 2 + 8 (extended length) + 4 (mask key).
pub const MAX_HEADER_SIZE: usize = 14;

#[derive(Debug, Clone)]
struct FrameHeader {
    fin: bool,
    rsv1: bool,
    rsv2: bool,
    rsv3: bool,
    opcode: OpCode,
    mask: Option<[u8; 4]>,
    payload_len: usize,
    header_len: usize,
}

/// Parse a frame header from the front of `buf`.
///
/// # Errors
///
/// - `Error::IncompleteFrame` if not enough data is available
/// - `Error::InvalidOpcode` / `Error::ReservedOpcode` for unknown opcodes
/// - `Error::PayloadTooLargeForPlatform` if the length does not fit `usize`
#[inline]
fn parse_header(buf: &[u8]) -> Result<FrameHeader> {
    let [byte0, byte1, rest @ ..] = buf else {
        return Err(Error::IncompleteFrame {
            needed: 2 - buf.len(),
        });
    };

    let fin = (byte0 & 0x80) != 0;
    let rsv1 = (byte0 & 0x40) != 0;
    let rsv2 = (byte0 & 0x20) != 0;
    let rsv3 = (byte0 & 0x10) != 0;
    let opcode = OpCode::from_u8(byte0 & 0x0F)?;

    let masked = (byte1 & 0x80) != 0;
    let (payload_len, length_size) = match byte1 & 0x7F {
        len @ 0..=125 => (len as usize, 0),
        126 => {
            let [hi, lo, ..] = rest else {
                return Err(Error::IncompleteFrame {
                    needed: 4 - buf.len(),
                });
            };
            (u16::from_be_bytes([*hi, *lo]) as usize, 2)
        }
        _ => {
            let Some(bytes) = rest.get(..8) else {
                return Err(Error::IncompleteFrame {
                    needed: 10 - buf.len(),
                });
            };
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            let len_u64 = u64::from_be_bytes(raw);
            let len = usize::try_from(len_u64).map_err(|_| Error::PayloadTooLargeForPlatform {
                size: len_u64,
                max: usize::MAX as u64,
            })?;
            (len, 8)
        }
    };

    let mask_offset = 2 + length_size;
    let header_len = if masked { mask_offset + 4 } else { mask_offset };
    if buf.len() < header_len {
        return Err(Error::IncompleteFrame {
            needed: header_len - buf.len(),
        });
    }

    let mask = masked.then(|| {
        [
            buf[mask_offset],
            buf[mask_offset + 1],
            buf[mask_offset + 2],
            buf[mask_offset + 3],
        ]
    });

    Ok(FrameHeader {
        fin,
        rsv1,
        rsv2,
        rsv3,
        opcode,
        mask,
        payload_len,
        header_len,
    })
}

/// Size of the header for a payload of `payload_len` bytes.
#[inline]
#[must_use]
pub const fn header_size(payload_len: usize, masked: bool) -> usize {
    let extended = if payload_len <= 125 {
        0
    } else if payload_len <= 65535 {
        2
    } else {
        8
    };
    2 + extended + if masked { 4 } else { 0 }
}

/// A WebSocket frame as defined in RFC 6455.
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |F|R|R|R| opcode |M| Payload len |    Extended payload length    |
/// |I|S|S|S|  (4)   |A|     (7)     |             (16/64)           |
/// |N|V|V|V|       |S|             |   (if payload len==126/127)   |
/// | |1|2|3|       |K|             |                               |
/// +-+-+-+-+-------+-+-------------+-------------------------------+
/// |                         Masking key (if present)              |
/// +---------------------------------------------------------------+
/// |                     Payload data                              |
/// +---------------------------------------------------------------+
/// ```
///
/// The payload is a reference-counted [`Bytes`], so handing a frame to the
/// write queue or cloning it for observers never copies the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// Reserved bit 1. Must be 0 unless extension is negotiated.
    pub rsv1: bool,
    /// Reserved bit 2. Must be 0 unless extension is negotiated.
    pub rsv2: bool,
    /// Reserved bit 3. Must be 0 unless extension is negotiated.
    pub rsv3: bool,
    /// Frame opcode defining the interpretation of payload data.
    pub opcode: OpCode,
    payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            payload: payload.into(),
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Text, data)
    }

    /// Create a final binary frame.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Binary, data)
    }

    /// Create a close frame; the reason is truncated to fit a control frame.
    #[must_use]
    pub fn close(close: &CloseFrame) -> Self {
        Self::new(true, OpCode::Close, close.to_payload())
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Ping, data)
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Pong, data)
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get a shared handle to the payload.
    #[inline]
    #[must_use]
    pub fn payload_bytes(&self) -> Bytes {
        self.payload.clone()
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Parse a frame from a buffer.
    ///
    /// Returns the parsed frame and the number of bytes consumed. Masked
    /// payloads are unmasked.
    ///
    /// ## Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::InvalidOpcode` if the opcode is invalid
    /// - `Error::ReservedOpcode` if a reserved opcode is used
    #[inline]
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let header = parse_header(buf)?;
        let total_size = Self::total_size(&header)?;

        if buf.len() < total_size {
            return Err(Error::IncompleteFrame {
                needed: total_size - buf.len(),
            });
        }

        let mut data = buf[header.header_len..total_size].to_vec();
        if let Some(mask) = header.mask {
            apply_mask(&mut data, mask);
        }

        Ok((Self::from_header(&header, Bytes::from(data)), total_size))
    }

    /// Parse a frame from a `Bytes` buffer, sharing the payload of unmasked frames.
    ///
    /// ## Errors
    ///
    /// Same as [`Frame::parse`].
    #[inline]
    pub fn parse_zero_copy(buf: &Bytes) -> Result<(Self, usize)> {
        let header = parse_header(buf)?;
        let total_size = Self::total_size(&header)?;

        if buf.len() < total_size {
            return Err(Error::IncompleteFrame {
                needed: total_size - buf.len(),
            });
        }

        let payload = match header.mask {
            Some(mask) => {
                let mut data = buf[header.header_len..total_size].to_vec();
                apply_mask(&mut data, mask);
                Bytes::from(data)
            }
            None => buf.slice(header.header_len..total_size),
        };

        Ok((Self::from_header(&header, payload), total_size))
    }

    fn total_size(header: &FrameHeader) -> Result<usize> {
        header
            .header_len
            .checked_add(header.payload_len)
            .ok_or(Error::PayloadTooLargeForPlatform {
                size: header.payload_len as u64,
                max: usize::MAX as u64,
            })
    }

    fn from_header(header: &FrameHeader, payload: Bytes) -> Self {
        Frame {
            fin: header.fin,
            rsv1: header.rsv1,
            rsv2: header.rsv2,
            rsv3: header.rsv3,
            opcode: header.opcode,
            payload,
        }
    }

    /// Validate the frame according to RFC 6455.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedBitsSet` if RSV bits are set without extension
    /// - `Error::FragmentedControlFrame` if control frame has FIN=0
    /// - `Error::ControlFrameTooLarge` if control frame payload > 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.rsv1 || self.rsv2 || self.rsv3 {
            return Err(Error::ReservedBitsSet);
        }

        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }

        Ok(())
    }

    /// Append the frame header to `buf`.
    pub fn write_header(&self, buf: &mut BytesMut, mask: Option<[u8; 4]>) {
        let payload_len = self.payload.len();

        let mut byte0 = self.opcode.as_u8();
        if self.fin {
            byte0 |= 0x80;
        }
        if self.rsv1 {
            byte0 |= 0x40;
        }
        if self.rsv2 {
            byte0 |= 0x20;
        }
        if self.rsv3 {
            byte0 |= 0x10;
        }
        buf.put_u8(byte0);

        let mask_bit = if mask.is_some() { 0x80 } else { 0 };
        if payload_len <= 125 {
            buf.put_u8(mask_bit | payload_len as u8);
        } else if payload_len <= 65535 {
            buf.put_u8(mask_bit | 126);
            buf.put_u16(payload_len as u16);
        } else {
            buf.put_u8(mask_bit | 127);
            buf.put_u64(payload_len as u64);
        }

        if let Some(mask_key) = mask {
            buf.put_slice(&mask_key);
        }
    }

    /// Write the whole frame to a buffer.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFrame` if the buffer is too small.
    pub fn write(&self, buf: &mut [u8], mask: Option<[u8; 4]>) -> Result<usize> {
        let total_size = self.wire_size(mask.is_some());
        if buf.len() < total_size {
            return Err(Error::InvalidFrame(format!(
                "Buffer too small: need {} bytes, have {}",
                total_size,
                buf.len()
            )));
        }

        let mut out = BytesMut::with_capacity(total_size);
        self.write_header(&mut out, mask);
        let payload_start = out.len();
        out.put_slice(&self.payload);
        if let Some(mask_key) = mask {
            apply_mask(&mut out[payload_start..], mask_key);
        }

        buf[..total_size].copy_from_slice(&out);
        Ok(total_size)
    }

    /// Calculate the size needed to write this frame.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        header_size(self.payload.len(), masked) + self.payload.len()
    }
}
