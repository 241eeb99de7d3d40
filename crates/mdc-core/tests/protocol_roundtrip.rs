//! Integration tests for the mdc-core frame codec.
//!
//! These tests go through the public API only and cover the properties the
//! device session relies on: every valid frame decodes back to what was
//! encoded, and any corruption of the checksum, header, or addressing is
//! reported with the matching [`ProtocolError`].

use mdc_core::{
    decode_frame, encode_frame,
    protocol::{commands::COMMAND_TABLE, frame_len, HEADER_SIZE, MAX_PAYLOAD_LEN},
    CommandCode, ProtocolError,
};

/// Encodes a frame and decodes it again for the same display.
fn roundtrip(device_id: u8, command: CommandCode, payload: &[u8]) -> (CommandCode, Vec<u8>) {
    let bytes = encode_frame(device_id, command, payload).expect("encode must succeed");
    let frame = decode_frame(&bytes, device_id).expect("decode must succeed");
    (frame.command, frame.payload)
}

#[test]
fn test_roundtrip_every_known_command_with_several_payload_sizes() {
    for (name, command) in COMMAND_TABLE {
        for len in [0usize, 1, 5, 64, MAX_PAYLOAD_LEN] {
            let payload: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(31)).collect();
            let (cmd, data) = roundtrip(1, *command, &payload);
            assert_eq!(cmd, *command, "command {name}");
            assert_eq!(data, payload, "command {name}, length {len}");
        }
    }
}

#[test]
fn test_roundtrip_across_device_ids() {
    for device_id in [0u8, 1, 0x7F, 0xFE, 0xFF] {
        let (cmd, data) = roundtrip(device_id, CommandCode::VIDEO_WALL_MODE, &[1, 2, 2, 1, 2]);
        assert_eq!(cmd, CommandCode::VIDEO_WALL_MODE);
        assert_eq!(data, vec![1, 2, 2, 1, 2]);
    }
}

#[test]
fn test_flipping_any_checksum_bit_is_detected() {
    let bytes = encode_frame(9, CommandCode::SERIAL_NUMBER, b"ABC123").unwrap();
    let checksum_index = bytes.len() - 1;

    for bit in 0..8 {
        let mut corrupted = bytes.clone();
        corrupted[checksum_index] ^= 1 << bit;
        assert!(
            matches!(
                decode_frame(&corrupted, 9),
                Err(ProtocolError::ChecksumMismatch { .. })
            ),
            "bit {bit} flip must be caught"
        );
    }
}

#[test]
fn test_corrupted_payload_byte_is_detected() {
    let mut bytes = encode_frame(1, CommandCode::MODEL_NUMBER, b"LH55").unwrap();
    bytes[HEADER_SIZE + 1] ^= 0x20;
    assert!(matches!(
        decode_frame(&bytes, 1),
        Err(ProtocolError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_frame_for_device_one_is_rejected_by_device_two() {
    let bytes = encode_frame(1, CommandCode::POWER, &[0x01]).unwrap();
    assert_eq!(
        decode_frame(&bytes, 2),
        Err(ProtocolError::DeviceIdMismatch {
            expected: 2,
            actual: 1
        })
    );
}

#[test]
fn test_truncated_frames_are_rejected() {
    let bytes = encode_frame(1, CommandCode::SOFTWARE_VERSION, b"T-HKMLAKUC-1011.5").unwrap();
    for cut in 0..bytes.len() {
        let result = decode_frame(&bytes[..cut], 1);
        if cut < HEADER_SIZE {
            assert_eq!(result, Err(ProtocolError::FrameTooShort { len: cut }));
        } else {
            assert!(matches!(result, Err(ProtocolError::Malformed { .. })), "cut at {cut}");
        }
    }
}

#[test]
fn test_frame_len_matches_encoded_size() {
    for len in [0usize, 3, 200] {
        let bytes = encode_frame(1, CommandCode::OSD_DISPLAY, &vec![0u8; len]).unwrap();
        let header: [u8; HEADER_SIZE] = bytes[..HEADER_SIZE].try_into().unwrap();
        assert_eq!(frame_len(&header), bytes.len());
    }
}
