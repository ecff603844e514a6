//! Fuzz target for the message CBOR decoder.
//!
//! `mpool push` decodes signed messages straight from user input, so the
//! decoder must reject anything malformed without panicking.
//!
//! # Running
//!
//! ```bash
//! cargo +nightly fuzz run signed_message
//! ```

#![no_main]

use filsign_chain::{Message, SignedMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(signed) = SignedMessage::from_cbor(data) {
        // anything we accept must survive our own encoder
        let encoded = signed.to_cbor().expect("decoded message re-encodes");
        let decoded = SignedMessage::from_cbor(&encoded).expect("re-encoded message decodes");
        assert_eq!(decoded, signed);
        let _ = signed.cid();
    }

    if let Ok(message) = Message::from_cbor(data) {
        let _ = message.cid();
        let _ = message.signing_bytes();
        let _ = message.max_fee();
    }
});
