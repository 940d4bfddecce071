//! Integration tests for the frame inspector.
//!
//! Frames are produced with the jtt-core encoder, hex encoded the way a
//! capture file would hold them, and fed through `FrameInspector`.

use jtt_core::message::{MessageBody, TerminalAuth};
use jtt_core::{
    encode_packet, encode_segmented, MsgHeader, MsgId, ProtocolVersion, SegmentCacheConfig,
    SerialNumberCounter,
};
use jtt_inspect::{FrameInspector, FrameStatus, InspectConfig, InspectError, OutputFormat};

fn to_lines(frames: &[Vec<u8>]) -> Vec<String> {
    frames.iter().map(hex::encode).collect()
}

#[test]
fn test_segmented_auth_is_reported_once_reassembled() {
    // Arrange – a 2019 auth body split into 10-byte parts
    let auth = TerminalAuth {
        auth_code: "0123456789ABCDEF".to_string(),
        imei: "860000000000001".to_string(),
        software_version: "FW-2.4.1".to_string(),
        version: ProtocolVersion::V2019,
    };
    let header = MsgHeader::new(MsgId::TERMINAL_AUTH, "13800138000", 0)
        .with_version(ProtocolVersion::V2019, 1);
    let frames = encode_segmented(&header, &auth.encode().unwrap(), 10, &SerialNumberCounter::new())
        .unwrap();
    let inspector = FrameInspector::new(SegmentCacheConfig::default());

    // Act
    let reports: Vec<_> = to_lines(&frames)
        .iter()
        .map(|line| inspector.inspect_line(line).unwrap().unwrap())
        .collect();

    // Assert
    let (last, earlier) = reports.split_last().unwrap();
    assert!(earlier.iter().all(|r| r.status == FrameStatus::Pending));
    assert_eq!(last.reassembled_parts as usize, frames.len());
    match &last.status {
        FrameStatus::Decoded { body } => assert!(body.contains("860000000000001")),
        other => panic!("unexpected status {other:?}"),
    }
    assert_eq!(inspector.pending(), 0);
}

#[test]
fn test_malformed_lines_do_not_disturb_pending_reassembly() {
    // Arrange
    let header = MsgHeader::new(MsgId::MULTIMEDIA_UPLOAD, "13800138000", 0);
    let frames = encode_segmented(&header, &[0x11; 30], 10, &SerialNumberCounter::new()).unwrap();
    let lines = to_lines(&frames);
    let inspector = FrameInspector::new(SegmentCacheConfig::default());

    // Act
    inspector.inspect_line(&lines[0]).unwrap();
    // Frame byte 17 is the first body byte after the 16-byte segmented header.
    let corrupted = format!("{}10{}", &lines[1][..34], &lines[1][36..]);
    let garbage = inspector.inspect_line(&corrupted);
    inspector.inspect_line(&lines[1]).unwrap();
    let last = inspector.inspect_line(&lines[2]).unwrap().unwrap();

    // Assert
    assert!(matches!(garbage, Err(InspectError::Protocol(_))));
    assert_eq!(last.status, FrameStatus::Unregistered);
    assert_eq!(last.reassembled_parts, 3);
}

#[test]
fn test_json_report_for_unsegmented_frame() {
    let header = MsgHeader::new(MsgId::TERMINAL_HEARTBEAT, "13800138000", 9);
    let line = hex::encode(encode_packet(&header, &[]).unwrap());
    let config = InspectConfig::from_toml(r#"output = "json""#).unwrap();
    let inspector = FrameInspector::new(config.segment.clone());

    let report = inspector.inspect_line(&line).unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.render(config.output).unwrap()).unwrap();

    assert_eq!(config.output, OutputFormat::Json);
    assert_eq!(json["status"], "decoded");
    assert_eq!(json["header"]["serial_number"], 9);
    assert_eq!(json["body_hex"], "");
}
