//! Wire format spoken to the analysis server
//!
//! A connection optionally starts with an 8-byte [`Handshake`], followed by
//! back-to-back frames:
//!
//! ```text
//! +----------------+-------------------+------------------+
//! | length (u32 LE)| timestamp (15 B)  | captured bytes   |
//! +----------------+-------------------+------------------+
//!   length = 15 + captured bytes
//! ```
//!
//! Byte order is fixed per field: the handshake fields are big-endian, the
//! frame length prefix is little-endian.
//!
//! The timestamp is a fixed 15-byte record:
//!
//! ```text
//! version (u8 = 1) | seconds since 0001-01-01 UTC (i64 BE) | nanoseconds (u32 BE) | zone offset minutes (i16 BE, -1 = UTC)
//! ```
//!
//! The encoder always writes the UTC marker `-1` rather than the host's zone
//! offset in minutes. Seconds and nanoseconds are absolute, so the instant
//! decodes the same either way; only a receiver that displays the sender's
//! local zone sees a difference.

use bytes::{BufMut, Bytes, BytesMut};
use sqlpacket_core::{Error, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Size of the length prefix
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Size of the encoded capture timestamp
pub const TIMESTAMP_LEN: usize = 15;

/// Bytes preceding the captured data in every frame
pub const FRAME_HEADER_LEN: usize = LENGTH_PREFIX_LEN + TIMESTAMP_LEN;

/// Size of the connection handshake
pub const HANDSHAKE_LEN: usize = 8;

/// Constant that opens every handshake
pub const HANDSHAKE_MARKER: [u8; 4] = [0x00, 0x00, 0x00, 0x04];

const TIMESTAMP_VERSION: u8 = 1;

/// Seconds from 0001-01-01T00:00:00Z to the Unix epoch
const UNIX_TO_INTERNAL_SECS: i64 = 62_135_596_800;

/// Zone offset value meaning UTC
const UTC_OFFSET: i16 = -1;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Protocol identification sent once per connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handshake {
    /// Protocol family (e.g. SQL)
    pub protocol_class: u16,
    /// Protocol variant within the family (e.g. MySQL)
    pub protocol_type: u16,
}

impl Handshake {
    /// Create a new handshake
    pub const fn new(protocol_class: u16, protocol_type: u16) -> Self {
        Self {
            protocol_class,
            protocol_type,
        }
    }

    /// Encode as marker, class (BE), type (BE)
    pub fn to_bytes(&self) -> [u8; HANDSHAKE_LEN] {
        let mut buf = [0u8; HANDSHAKE_LEN];
        buf[..4].copy_from_slice(&HANDSHAKE_MARKER);
        buf[4..6].copy_from_slice(&self.protocol_class.to_be_bytes());
        buf[6..8].copy_from_slice(&self.protocol_type.to_be_bytes());
        buf
    }

    /// Parse a handshake, rejecting a wrong marker or short input
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < HANDSHAKE_LEN || data[..4] != HANDSHAKE_MARKER {
            return None;
        }

        Some(Self {
            protocol_class: u16::from_be_bytes([data[4], data[5]]),
            protocol_type: u16::from_be_bytes([data[6], data[7]]),
        })
    }
}

/// Encode a capture timestamp into its fixed 15-byte form
pub fn encode_timestamp(timestamp: SystemTime) -> Result<[u8; TIMESTAMP_LEN]> {
    let (unix_secs, nanos) = match timestamp.duration_since(UNIX_EPOCH) {
        Ok(since) => (
            i64::try_from(since.as_secs())
                .map_err(|_| Error::encoding("timestamp seconds overflow"))?,
            since.subsec_nanos(),
        ),
        Err(before) => {
            let before = before.duration();
            let mut secs = -i64::try_from(before.as_secs())
                .map_err(|_| Error::encoding("timestamp seconds overflow"))?;
            let mut nanos = before.subsec_nanos();
            if nanos > 0 {
                secs -= 1;
                nanos = NANOS_PER_SEC - nanos;
            }
            (secs, nanos)
        }
    };

    let secs = unix_secs
        .checked_add(UNIX_TO_INTERNAL_SECS)
        .ok_or_else(|| Error::encoding("timestamp seconds overflow"))?;

    let mut buf = [0u8; TIMESTAMP_LEN];
    buf[0] = TIMESTAMP_VERSION;
    buf[1..9].copy_from_slice(&secs.to_be_bytes());
    buf[9..13].copy_from_slice(&nanos.to_be_bytes());
    buf[13..15].copy_from_slice(&UTC_OFFSET.to_be_bytes());
    Ok(buf)
}

/// Decode a 15-byte capture timestamp
///
/// The zone offset only affects presentation, so it is validated for size
/// and otherwise ignored.
pub fn decode_timestamp(data: &[u8]) -> Result<SystemTime> {
    if data.len() != TIMESTAMP_LEN {
        return Err(Error::encoding(format!(
            "timestamp must be {} bytes, got {}",
            TIMESTAMP_LEN,
            data.len()
        )));
    }
    if data[0] != TIMESTAMP_VERSION {
        return Err(Error::encoding(format!(
            "unsupported timestamp version {}",
            data[0]
        )));
    }

    let mut secs = [0u8; 8];
    secs.copy_from_slice(&data[1..9]);
    let unix_secs = i64::from_be_bytes(secs)
        .checked_sub(UNIX_TO_INTERNAL_SECS)
        .ok_or_else(|| Error::encoding("timestamp seconds out of range"))?;
    let nanos = u32::from_be_bytes([data[9], data[10], data[11], data[12]]);
    if nanos >= NANOS_PER_SEC {
        return Err(Error::encoding("timestamp nanoseconds out of range"));
    }

    let sub = Duration::from_nanos(u64::from(nanos));
    let timestamp = if unix_secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(unix_secs.unsigned_abs()) + sub
    } else {
        UNIX_EPOCH - Duration::from_secs(unix_secs.unsigned_abs()) + sub
    };
    Ok(timestamp)
}

/// Wrap captured bytes into a frame ready for the wire
pub fn encode_frame(payload: &[u8], timestamp: SystemTime) -> Result<Bytes> {
    let length = payload
        .len()
        .checked_add(TIMESTAMP_LEN)
        .and_then(|len| u32::try_from(len).ok())
        .ok_or_else(|| {
            Error::encoding(format!("payload of {} bytes exceeds frame limit", payload.len()))
        })?;

    let timestamp = encode_timestamp(timestamp)?;

    let mut buffer = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buffer.put_u32_le(length);
    buffer.put_slice(&timestamp);
    buffer.put_slice(payload);
    Ok(buffer.freeze())
}

/// A frame read back from a byte stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    /// Capture timestamp
    pub timestamp: SystemTime,
    /// Captured bytes
    pub payload: &'a [u8],
}

/// Decode the frame at the start of `data`
///
/// Returns `Ok(None)` when `data` does not yet hold a complete frame, and
/// otherwise the frame plus the number of bytes it occupied.
pub fn decode_frame(data: &[u8]) -> Result<Option<(DecodedFrame<'_>, usize)>> {
    if data.len() < LENGTH_PREFIX_LEN {
        return Ok(None);
    }

    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if length < TIMESTAMP_LEN {
        return Err(Error::encoding(format!(
            "frame length {} is shorter than the timestamp",
            length
        )));
    }

    let total = length
        .checked_add(LENGTH_PREFIX_LEN)
        .ok_or_else(|| Error::encoding(format!("frame length {} overflows", length)))?;
    if data.len() < total {
        return Ok(None);
    }

    let timestamp = decode_timestamp(&data[LENGTH_PREFIX_LEN..FRAME_HEADER_LEN])?;
    let frame = DecodedFrame {
        timestamp,
        payload: &data[FRAME_HEADER_LEN..total],
    };
    Ok(Some((frame, total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: u64, nanos: u32) -> SystemTime {
        UNIX_EPOCH + Duration::new(secs, nanos)
    }

    #[test]
    fn test_length_prefix_is_little_endian() {
        let payload = vec![0xAB; 300];
        let frame = encode_frame(&payload, ts(1_700_000_000, 0)).unwrap();

        // 15 + 300 = 315 = 0x013B
        assert_eq!(&frame[..4], &[0x3B, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_frame_lengths() {
        for len in [0usize, 1, 60, 1514, 65535] {
            let payload = vec![0x5A; len];
            let frame = encode_frame(&payload, ts(1_600_000_000, 123)).unwrap();

            let prefix = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
            assert_eq!(prefix as usize, TIMESTAMP_LEN + len);
            assert_eq!(frame.len(), 4 + 15 + len);
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let payload: Vec<u8> = (0..=255).collect();
        let captured = ts(1_700_000_123, 456_789_000);
        let frame = encode_frame(&payload, captured).unwrap();

        let (decoded, consumed) = decode_frame(&frame).unwrap().unwrap();
        assert_eq!(consumed, frame.len());
        assert_eq!(decoded.payload, payload.as_slice());
        assert_eq!(decoded.timestamp, captured);
    }

    #[test]
    fn test_timestamp_layout() {
        let encoded = encode_timestamp(ts(0, 1)).unwrap();

        assert_eq!(encoded.len(), TIMESTAMP_LEN);
        assert_eq!(encoded[0], 1);
        assert_eq!(&encoded[1..9], &UNIX_TO_INTERNAL_SECS.to_be_bytes());
        assert_eq!(&encoded[9..13], &[0, 0, 0, 1]);
        assert_eq!(&encoded[13..15], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_timestamp_known_value() {
        // 2009-11-10T23:00:00Z
        let encoded = encode_timestamp(ts(1_257_894_000, 0)).unwrap();
        let expected_secs: i64 = 1_257_894_000 + 62_135_596_800;
        assert_eq!(&encoded[1..9], &expected_secs.to_be_bytes());
    }

    #[test]
    fn test_timestamp_before_epoch() {
        let captured = UNIX_EPOCH - Duration::from_millis(1500);
        let encoded = encode_timestamp(captured).unwrap();

        let secs = i64::from_be_bytes(encoded[1..9].try_into().unwrap());
        let nanos = u32::from_be_bytes(encoded[9..13].try_into().unwrap());
        assert_eq!(secs, UNIX_TO_INTERNAL_SECS - 2);
        assert_eq!(nanos, 500_000_000);
        assert_eq!(decode_timestamp(&encoded).unwrap(), captured);
    }

    #[test]
    fn test_decode_partial_frame() {
        let frame = encode_frame(b"select 1", ts(1_700_000_000, 0)).unwrap();

        assert!(decode_frame(&frame[..3]).unwrap().is_none());
        assert!(decode_frame(&frame[..frame.len() - 1]).unwrap().is_none());
    }

    #[test]
    fn test_decode_back_to_back_frames() {
        let mut stream = Vec::new();
        for i in 0..3u8 {
            let frame = encode_frame(&[i; 10], ts(1_700_000_000 + u64::from(i), 0)).unwrap();
            stream.extend_from_slice(&frame);
        }

        let mut offset = 0;
        let mut payloads = Vec::new();
        while let Some((frame, used)) = decode_frame(&stream[offset..]).unwrap() {
            payloads.push(frame.payload.to_vec());
            offset += used;
        }
        assert_eq!(payloads, vec![vec![0; 10], vec![1; 10], vec![2; 10]]);
        assert_eq!(offset, stream.len());
    }

    #[test]
    fn test_decode_rejects_short_length() {
        let data = [5u8, 0, 0, 0, 1, 2, 3, 4, 5];
        assert!(matches!(decode_frame(&data), Err(Error::Encoding(_))));
    }

    #[test]
    fn test_decode_huge_length_prefix() {
        // Largest length the prefix can carry, with almost no data behind it
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 1, 0, 0];
        assert!(matches!(decode_frame(&data), Ok(None)));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut encoded = encode_timestamp(ts(1, 0)).unwrap();
        encoded[0] = 2;
        assert!(decode_timestamp(&encoded).is_err());
    }

    #[test]
    fn test_handshake_layout() {
        let handshake = Handshake::new(1, 0x0203);
        assert_eq!(
            handshake.to_bytes(),
            [0x00, 0x00, 0x00, 0x04, 0x00, 0x01, 0x02, 0x03]
        );
        assert_eq!(Handshake::from_bytes(&handshake.to_bytes()), Some(handshake));
    }

    #[test]
    fn test_handshake_rejects_bad_marker() {
        assert!(Handshake::from_bytes(&[0, 0, 0, 5, 0, 1, 0, 1]).is_none());
        assert!(Handshake::from_bytes(&[0, 0, 0, 4]).is_none());
    }
}
