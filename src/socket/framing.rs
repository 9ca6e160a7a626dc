//! Frame codec for the chat wire protocol.
//!
//! ```text
//! [u32 BE length] [payload: length bytes]
//! ```
//!
//! The length prefix is in network byte order. A zero prefix signals the
//! absence of a message, so an empty payload can never be encoded.

use bytes::{BufMut, Bytes, BytesMut};

use super::WireError;
use crate::constants::{FRAME_HEADER_LEN, MAX_FRAME_SIZE};

/// Encode a payload into a complete wire frame.
///
/// # Errors
///
/// Returns [`WireError::Empty`] for an empty payload and
/// [`WireError::TooLarge`] above [`MAX_FRAME_SIZE`].
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, WireError> {
    let length = checked_length(payload.len())?;
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.put_u32(length);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Decode a length prefix read from the wire.
///
/// # Errors
///
/// Returns [`WireError::Empty`] for a zero prefix and
/// [`WireError::TooLarge`] above [`MAX_FRAME_SIZE`].
pub fn decode_header(header: [u8; FRAME_HEADER_LEN]) -> Result<usize, WireError> {
    let length = u32::from_be_bytes(header) as usize;
    if length == 0 {
        return Err(WireError::Empty);
    }
    if length > MAX_FRAME_SIZE {
        return Err(WireError::TooLarge(length));
    }
    Ok(length)
}

fn checked_length(len: usize) -> Result<u32, WireError> {
    if len == 0 {
        return Err(WireError::Empty);
    }
    if len > MAX_FRAME_SIZE {
        return Err(WireError::TooLarge(len));
    }
    u32::try_from(len).map_err(|_| WireError::TooLarge(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::recv_message;

    #[test]
    fn test_header_is_network_byte_order() {
        let frame = encode_frame(b"hello").unwrap();
        assert_eq!(&frame[..4], &[0, 0, 0, 5]);
        assert_eq!(&frame[4..], b"hello");
    }

    #[test]
    fn test_frames_decode_through_receiver() {
        let cancel = std::sync::atomic::AtomicBool::new(false);
        let mut wire = Vec::new();
        for size in [1usize, 3, 4, 5, 255, 256, 70_000] {
            let payload = "x".repeat(size);
            wire.extend_from_slice(&encode_frame(payload.as_bytes()).unwrap());
        }
        wire.extend_from_slice(&encode_frame(b"$").unwrap());

        let mut reader = &wire[..];
        for size in [1usize, 3, 4, 5, 255, 256, 70_000] {
            let message = recv_message(&mut reader, &cancel).unwrap();
            assert_eq!(message.len(), size);
        }
        assert_eq!(recv_message(&mut reader, &cancel).unwrap(), "$");
        assert!(reader.is_empty());
    }

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(encode_frame(b""), Err(WireError::Empty)));
    }

    #[test]
    fn test_zero_length_prefix_rejected() {
        assert!(matches!(decode_header([0; 4]), Err(WireError::Empty)));
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let length = u32::try_from(MAX_FRAME_SIZE + 1).unwrap();
        assert!(matches!(
            decode_header(length.to_be_bytes()),
            Err(WireError::TooLarge(_))
        ));
        assert_eq!(decode_header(7u32.to_be_bytes()).unwrap(), 7);
    }
}
