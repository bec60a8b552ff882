//! WebSocket payload masking (RFC 6455 Section 5.3).
//!
//! Masking is a plain XOR with a repeating 4-byte key. Outbound frames may
//! be generated in several chunks, so [`apply_mask_at`] lets the caller
//! resume the key rotation at an arbitrary payload offset.

/// XOR `data` with `mask`, starting at key position 0.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    apply_mask_at(data, mask, 0);
}

/// XOR `data` with `mask`, as if `data` started `offset` bytes into the payload.
#[inline]
pub fn apply_mask_at(data: &mut [u8], mask: [u8; 4], offset: usize) {
    let rotated = rotate_mask(mask, offset);
    let mask_u32 = u32::from_ne_bytes(rotated);

    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(val ^ mask_u32).to_ne_bytes());
    }
    for (byte, key) in chunks.into_remainder().iter_mut().zip(rotated) {
        *byte ^= key;
    }
}

/// The key as seen from payload position `offset`.
#[inline]
fn rotate_mask(mask: [u8; 4], offset: usize) -> [u8; 4] {
    let shift = offset % 4;
    [
        mask[shift],
        mask[(shift + 1) % 4],
        mask[(shift + 2) % 4],
        mask[(shift + 3) % 4],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_mask(data: &mut [u8], mask: [u8; 4], offset: usize) {
        for (i, byte) in data.iter_mut().enumerate() {
            *byte ^= mask[(offset + i) % 4];
        }
    }

    #[test]
    fn test_rfc_example() {
        // RFC 6455 Section 5.7: masked "Hello"
        let mut data = *b"Hello";
        apply_mask(&mut data, [0x37, 0xfa, 0x21, 0x3d]);
        assert_eq!(data, [0x7f, 0x9f, 0x4d, 0x51, 0x58]);
    }

    #[test]
    fn test_mask_is_reversible() {
        let original: Vec<u8> = (0..=255).collect();
        let mask = [0x12, 0x34, 0x56, 0x78];
        let mut data = original.clone();
        apply_mask(&mut data, mask);
        assert_ne!(data, original);
        apply_mask(&mut data, mask);
        assert_eq!(data, original);
    }

    #[test]
    fn test_mask_at_offset_matches_reference() {
        let mask = [0xde, 0xad, 0xbe, 0xef];
        for offset in 0..8 {
            for len in 0..11 {
                let mut fast: Vec<u8> = (0..len as u8).collect();
                let mut slow = fast.clone();
                apply_mask_at(&mut fast, mask, offset);
                reference_mask(&mut slow, mask, offset);
                assert_eq!(fast, slow, "offset {offset} len {len}");
            }
        }
    }

    #[test]
    fn test_chunked_masking_equals_whole() {
        let mask = [0x01, 0x02, 0x03, 0x04];
        let payload: Vec<u8> = (0..37).collect();

        let mut whole = payload.clone();
        apply_mask(&mut whole, mask);

        let mut chunked = payload.clone();
        let (a, rest) = chunked.split_at_mut(5);
        let (b, c) = rest.split_at_mut(13);
        apply_mask_at(a, mask, 0);
        apply_mask_at(b, mask, 5);
        apply_mask_at(c, mask, 18);

        assert_eq!(whole, chunked);
    }
}
