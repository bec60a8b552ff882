//! Splitting outgoing messages into frames (RFC 6455 Section 5.4).

use bytes::Bytes;

use crate::protocol::{Frame, OpCode};

/// Iterator that produces frames from a message payload.
///
/// The first frame carries the message opcode, the rest are
/// `OpCode::Continuation`. Fragments are slices of the original [`Bytes`],
/// so splitting never copies.
#[derive(Debug)]
pub struct MessageFragmenter {
    payload: Bytes,
    opcode: OpCode,
    fragment_size: usize,
    is_first: bool,
}

impl MessageFragmenter {
    #[inline]
    #[must_use]
    pub fn new(payload: Bytes, opcode: OpCode, fragment_size: usize) -> Self {
        Self {
            payload,
            opcode,
            fragment_size: fragment_size.max(1),
            is_first: true,
        }
    }

    #[inline]
    #[must_use]
    pub fn needs_fragmentation(&self) -> bool {
        self.payload.len() > self.fragment_size
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.payload.len()
    }
}

impl Iterator for MessageFragmenter {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.payload.is_empty() && !self.is_first {
            return None;
        }

        let take = self.payload.len().min(self.fragment_size);
        let chunk = self.payload.split_to(take);
        let opcode = if std::mem::take(&mut self.is_first) {
            self.opcode
        } else {
            OpCode::Continuation
        };

        Some(Frame::new(self.payload.is_empty(), opcode, chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fragmentation_needed() {
        let frag = MessageFragmenter::new(Bytes::from_static(b"Hello"), OpCode::Text, 1024);
        assert!(!frag.needs_fragmentation());

        let frames: Vec<_> = frag.collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert_eq!(frames[0].opcode, OpCode::Text);
        assert_eq!(frames[0].payload(), b"Hello");
    }

    #[test]
    fn test_uneven_fragmentation() {
        let frag = MessageFragmenter::new(Bytes::from(vec![0xCD; 25]), OpCode::Binary, 10);
        assert!(frag.needs_fragmentation());

        let frames: Vec<_> = frag.collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].opcode, OpCode::Binary);
        assert!(!frames[0].fin);
        assert_eq!(frames[1].opcode, OpCode::Continuation);
        assert!(!frames[1].fin);
        assert_eq!(frames[2].opcode, OpCode::Continuation);
        assert!(frames[2].fin);
        assert_eq!(frames[2].payload().len(), 5);
    }

    #[test]
    fn test_exact_multiple() {
        let frames: Vec<_> =
            MessageFragmenter::new(Bytes::from(vec![0xAB; 30]), OpCode::Binary, 10).collect();
        assert_eq!(frames.len(), 3);
        assert!(frames[2].fin);
    }

    #[test]
    fn test_empty_payload() {
        let frames: Vec<_> = MessageFragmenter::new(Bytes::new(), OpCode::Text, 1024).collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fin);
        assert!(frames[0].payload().is_empty());
    }

    #[test]
    fn test_remaining_bytes() {
        let mut frag = MessageFragmenter::new(Bytes::from(vec![0xAB; 30]), OpCode::Binary, 10);
        assert_eq!(frag.remaining(), 30);
        frag.next();
        assert_eq!(frag.remaining(), 20);
        frag.next();
        frag.next();
        assert_eq!(frag.remaining(), 0);
        assert!(frag.next().is_none());
    }
}
