//! Property tests for the message model
//!
//! Text form and identifier packing must survive a round trip for any
//! field values the protocol allows.

use proptest::prelude::*;
use trackbus::codec::{Codec, Cs2Codec, SlcanCodec};
use trackbus::protocol::{pack_id, unpack_id, IdFields};
use trackbus::{CanFrame, Message};

fn arb_message() -> impl Strategy<Value = Message> {
    (
        any::<u8>(),
        any::<bool>(),
        any::<u16>(),
        0u8..=8,
        any::<[u8; 8]>(),
    )
        .prop_map(|(command, response, hash, length, bytes)| {
            let mut data = [0u8; 8];
            data[..length as usize].copy_from_slice(&bytes[..length as usize]);
            Message {
                priority: 0,
                command,
                response,
                hash,
                length,
                data,
            }
        })
}

fn through_codec<C: Codec>(mut codec: C, frame: &CanFrame) -> Vec<CanFrame> {
    let mut bytes = Vec::new();
    codec.encode(frame, &mut bytes);
    let mut decoded = Vec::new();
    codec.decode(&bytes, |f| decoded.push(f));
    decoded
}

proptest! {
    #[test]
    fn test_text_roundtrip(message in arb_message()) {
        let text = message.encode_text();
        prop_assert_eq!(text.len(), 11 + 3 * message.length as usize);
        prop_assert_eq!(text.parse::<Message>().unwrap(), message);
    }

    #[test]
    fn test_text_parse_is_case_insensitive(message in arb_message()) {
        let lower = message.encode_text().to_lowercase();
        // Lowercase 'r' still marks a response
        prop_assert_eq!(lower.parse::<Message>().unwrap(), message);
    }

    #[test]
    fn test_id_packing_recovers_fields(
        priority in 0u8..8,
        command in any::<u8>(),
        response in any::<bool>(),
        hash in any::<u16>(),
    ) {
        let fields = IdFields { priority, command, response, hash };
        let id = pack_id(fields);
        prop_assert!(id <= 0x1FFF_FFFF);
        prop_assert_eq!(unpack_id(id), fields);
    }

    #[test]
    fn test_frame_roundtrip_keeps_priority(message in arb_message(), priority in 0u8..8) {
        let message = Message { priority, ..message };
        prop_assert_eq!(Message::from_frame(&message.to_frame()), message);
    }

    #[test]
    fn test_wire_codecs_roundtrip(message in arb_message()) {
        let frame = message.to_frame();
        prop_assert_eq!(through_codec(Cs2Codec::new(), &frame), vec![frame]);
        prop_assert_eq!(through_codec(SlcanCodec::new(), &frame), vec![frame]);
    }

    #[test]
    fn test_parse_never_panics(text in "\\PC{0,40}") {
        let _ = text.parse::<Message>();
    }
}
