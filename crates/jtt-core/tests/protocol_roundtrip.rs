//! Integration tests for the jtt-core packet codec.
//!
//! These tests drive complete frames through the public API: header and body
//! encoding, checksum and escaping, segmented encoding with a shared serial
//! counter, reassembly through the segment cache, and body decoding through
//! the registry.

use jtt_core::{
    decode_packet, encode_packet, encode_segmented,
    message::{
        PlatformGeneralResponse, RegisterResponse, RegisterResult, ReplyResult, TerminalAuth,
        TerminalGeneralResponse, TerminalRegister,
    },
    protocol::frame,
    BodyRegistry, MessageBody, MsgHeader, MsgId, ProtocolError, ProtocolVersion, SegmentCache,
    SegmentCacheConfig, SerialNumberCounter, SerialNumberSource,
};

/// Encodes `body` under `header`, decodes the frame and decodes the body
/// through the default registry.
fn roundtrip(header: &MsgHeader, body: &dyn MessageBody) -> (MsgHeader, Box<dyn MessageBody>) {
    let bytes = body.encode().expect("body encode must succeed");
    let frame = encode_packet(header, &bytes).expect("packet encode must succeed");
    let packet = decode_packet(&frame).expect("packet decode must succeed");
    let registry = BodyRegistry::with_defaults();
    let message = registry.decode_packet(&packet).expect("body decode must succeed");
    (message.header, message.body)
}

#[test]
fn test_roundtrip_terminal_general_response() {
    let header = MsgHeader::new(MsgId::TERMINAL_GENERAL_RESPONSE, "13800138000", 17);
    let original = TerminalGeneralResponse {
        reply_serial: 99,
        reply_msg_id: MsgId::SET_PARAMS,
        result: ReplyResult::Success,
    };

    let (decoded_header, body) = roundtrip(&header, &original);

    assert_eq!(decoded_header.serial_number, 17);
    assert_eq!(decoded_header.property.body_length(), 5);
    assert_eq!(body.as_any().downcast_ref::<TerminalGeneralResponse>(), Some(&original));
}

#[test]
fn test_roundtrip_platform_general_response() {
    let header = MsgHeader::new(MsgId::PLATFORM_GENERAL_RESPONSE, "13800138000", 1);
    let original = PlatformGeneralResponse {
        reply_serial: 0x7E7D,
        reply_msg_id: MsgId::LOCATION_REPORT,
        result: ReplyResult::AlarmConfirmed,
    };

    let (_, body) = roundtrip(&header, &original);

    assert_eq!(body.as_any().downcast_ref::<PlatformGeneralResponse>(), Some(&original));
}

#[test]
fn test_roundtrip_register_2019() {
    let header = MsgHeader::new(MsgId::TERMINAL_REGISTER, "13912345678", 3)
        .with_version(ProtocolVersion::V2019, 1);
    let original = TerminalRegister {
        province_id: 44,
        city_id: 100,
        manufacturer_id: "MANUFACT001".to_string(),
        terminal_model: "MODEL-X".to_string(),
        terminal_id: "ID0000000000000000000000000001".to_string(),
        plate_color: 2,
        plate_number: "粤B88888".to_string(),
        version: ProtocolVersion::V2019,
    };

    let (decoded_header, body) = roundtrip(&header, &original);

    assert_eq!(decoded_header.version, ProtocolVersion::V2019);
    assert_eq!(decoded_header.version_number, 1);
    assert_eq!(body.as_any().downcast_ref::<TerminalRegister>(), Some(&original));
}

#[test]
fn test_roundtrip_register_response_and_auth() {
    let response = RegisterResponse {
        reply_serial: 3,
        result: RegisterResult::Success,
        auth_code: "token-abc".to_string(),
    };
    let header = MsgHeader::new(MsgId::TERMINAL_REGISTER_RESPONSE, "13912345678", 1);
    let (_, body) = roundtrip(&header, &response);
    let decoded = body.as_any().downcast_ref::<RegisterResponse>().expect("0x8100 body");
    assert_eq!(decoded.auth_code, "token-abc");

    let auth = TerminalAuth {
        auth_code: decoded.auth_code.clone(),
        ..TerminalAuth::default()
    };
    let header = MsgHeader::new(MsgId::TERMINAL_AUTH, "13912345678", 2);
    let (_, body) = roundtrip(&header, &auth);
    assert_eq!(body.as_any().downcast_ref::<TerminalAuth>(), Some(&auth));
}

#[test]
fn test_reference_location_frame_decodes() {
    // A 2013 location report captured from a terminal, with escaped 0x7E/0x7D
    // bytes rebuilt by hand: header, 28-byte body, checksum.
    let mut content = vec![
        0x02, 0x00, 0x00, 0x1C, 0x01, 0x38, 0x00, 0x13, 0x80, 0x00, 0x00, 0x2A,
    ];
    content.extend_from_slice(&[
        0x00, 0x00, 0x00, 0x00, // alarm
        0x00, 0x00, 0x00, 0x03, // status
        0x01, 0x7E, 0x7D, 0x10, // latitude
        0x06, 0xCA, 0x8E, 0x50, // longitude
        0x00, 0x20, // altitude
        0x00, 0x3C, // speed
        0x00, 0x5A, // direction
        0x24, 0x05, 0x17, 0x08, 0x30, 0x00, // time
    ]);
    content.push(frame::checksum(&content));
    let wire = frame::escape(&content);

    let packet = decode_packet(&wire).expect("frame must decode");

    assert_eq!(packet.header.msg_id, MsgId::LOCATION_REPORT);
    assert_eq!(packet.header.phone_number, "13800138000");
    assert_eq!(packet.header.serial_number, 42);
    assert_eq!(packet.body.len(), 28);
    assert_eq!(&packet.body[8..12], &[0x01, 0x7E, 0x7D, 0x10]);
    assert_eq!(
        BodyRegistry::with_defaults().decode_packet(&packet).unwrap_err(),
        ProtocolError::UnregisteredMessage(MsgId::LOCATION_REPORT)
    );
}

#[test]
fn test_segmented_encode_then_reassemble() {
    // Arrange
    let serials = SerialNumberCounter::new();
    let cache = SegmentCache::new(SegmentCacheConfig::default());
    let header = MsgHeader::new(MsgId::MULTIMEDIA_UPLOAD, "13800138000", 0)
        .with_version(ProtocolVersion::V2019, 1);
    let body: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();

    // Act – deliver the frames in reverse order
    let frames = encode_segmented(&header, &body, 1000, &serials).expect("segmenting must succeed");
    let mut completions = Vec::new();
    for wire in frames.iter().rev() {
        let packet = decode_packet(wire).expect("part must decode");
        if let Some(joined) = cache.cache(&packet.header, &packet.body).unwrap() {
            completions.push(joined);
        }
    }

    // Assert
    assert_eq!(frames.len(), 3);
    assert_eq!(completions, vec![body]);
    assert!(cache.is_empty());
    assert_eq!(serials.next(), 4, "each part consumed one serial number");
}

#[test]
fn test_corrupted_frame_is_rejected_without_affecting_others() {
    let serials = SerialNumberCounter::new();
    let header = MsgHeader::new(MsgId::MULTIMEDIA_UPLOAD, "13800138000", 0);
    let body = vec![0xAB; 40];
    let mut frames = encode_segmented(&header, &body, 20, &serials).unwrap();
    let cache = SegmentCache::default();

    // Flip one bit in the first part's body.
    frames[0][20] ^= 0x01;

    assert!(matches!(
        decode_packet(&frames[0]),
        Err(ProtocolError::ChecksumMismatch { .. })
    ));
    let second = decode_packet(&frames[1]).unwrap();
    assert_eq!(cache.cache(&second.header, &second.body).unwrap(), None);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_escape_sequences_survive_full_pipeline() {
    let header = MsgHeader::new(MsgId::PLATFORM_GENERAL_RESPONSE, "13800138000", 0x7E7D);
    let body = vec![0x7E; 10];

    let wire = encode_packet(&header, &body).unwrap();

    assert_eq!(wire.iter().filter(|b| **b == frame::BOUNDARY_MARK).count(), 2);
    let packet = decode_packet(&wire).unwrap();
    assert_eq!(packet.header.serial_number, 0x7E7D);
    assert_eq!(packet.body, body);
}
