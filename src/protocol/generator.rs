//! Chunked frame generation for the outbound write path.
//!
//! A [`FrameCursor`] remembers how much of a frame has already been turned
//! into wire bytes, so [`Generator::generate`] can be called repeatedly on
//! the same frame and each call yields the next slice of at most
//! `max_chunk` bytes. The header goes out with the first slice.

use bytes::{BufMut, Bytes, BytesMut};

use crate::connection::Role;
use crate::protocol::Frame;
use crate::protocol::frame::header_size;
use crate::protocol::mask::apply_mask_at;

/// Generate a random seed for mask generation.
/// Falls back to system time if getrandom fails.
fn random_mask_seed() -> u32 {
    let mut buf = [0u8; 4];
    if getrandom::getrandom(&mut buf).is_ok() {
        u32::from_le_bytes(buf)
    } else {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u32)
            .unwrap_or(0x1234_5678)
    }
}

/// Progress of one frame through the generator.
#[derive(Debug)]
pub struct FrameCursor {
    frame: Frame,
    /// Mask key, chosen when the header is generated (clients only).
    mask: Option<[u8; 4]>,
    header_written: bool,
    /// Payload bytes already generated.
    offset: usize,
}

impl FrameCursor {
    /// Start generating `frame` from the beginning.
    #[must_use]
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            mask: None,
            header_written: false,
            offset: 0,
        }
    }

    /// The frame being generated.
    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Payload bytes not yet generated.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frame.payload().len() - self.offset
    }

    /// Returns `true` once header and payload have been fully generated.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.header_written && self.remaining() == 0
    }
}

/// Turns frames into wire bytes, masking them when acting as a client.
#[derive(Debug)]
pub struct Generator {
    role: Role,
    mask_counter: u32,
}

impl Generator {
    /// Create a generator for the given side of the connection.
    #[must_use]
    pub fn new(role: Role) -> Self {
        Self {
            role,
            mask_counter: random_mask_seed(),
        }
    }

    /// The role this generator masks for.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Produce the next chunk of `cursor`, at most `max_chunk` bytes long.
    ///
    /// The first call emits the header plus as much payload as fits. Every
    /// call makes progress, even if `max_chunk` is smaller than the header.
    /// Returns an empty buffer once the cursor is done.
    pub fn generate(&mut self, max_chunk: usize, cursor: &mut FrameCursor) -> Bytes {
        if cursor.is_done() {
            return Bytes::new();
        }

        let mut buf = BytesMut::with_capacity(max_chunk);
        if !cursor.header_written {
            if self.role.must_mask() {
                cursor.mask = Some(self.generate_mask());
            }
            cursor.frame.write_header(&mut buf, cursor.mask);
            cursor.header_written = true;
        }

        let budget = max_chunk.saturating_sub(buf.len());
        let take = if buf.is_empty() {
            budget.max(1).min(cursor.remaining())
        } else {
            budget.min(cursor.remaining())
        };

        let start = cursor.offset;
        let payload_start = buf.len();
        buf.put_slice(&cursor.frame.payload()[start..start + take]);
        if let Some(mask) = cursor.mask {
            apply_mask_at(&mut buf[payload_start..], mask, start);
        }
        cursor.offset += take;

        tracing::trace!(
            opcode = %cursor.frame.opcode,
            chunk = buf.len(),
            remaining = cursor.remaining(),
            "generated frame chunk"
        );
        buf.freeze()
    }

    /// Total wire size of `frame` as this generator would emit it.
    #[must_use]
    pub fn wire_size(&self, frame: &Frame) -> usize {
        header_size(frame.payload().len(), self.role.must_mask()) + frame.payload().len()
    }

    fn generate_mask(&mut self) -> [u8; 4] {
        self.mask_counter = self.mask_counter.wrapping_add(0x9E37_79B9);
        let a = self.mask_counter;
        let b = a.wrapping_mul(0x85EB_CA6B);
        let c = b ^ (b >> 13);
        let d = c.wrapping_mul(0xC2B2_AE35);
        d.to_le_bytes()
    }
}
