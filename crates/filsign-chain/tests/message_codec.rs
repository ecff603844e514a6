//! Codec properties over arbitrary messages.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use filsign_chain::cbor::Encoder;
use filsign_chain::{Address, Message, Signature, SignedMessage, TokenAmount};
use filsign_core::error::CodecError;
use num_bigint::BigUint;
use proptest::prelude::*;

fn arb_address() -> impl Strategy<Value = Address> {
    prop_oneof![
        any::<u64>().prop_map(Address::new_id),
        any::<[u8; 16]>().prop_map(|seed| Address::new_actor(&seed)),
        any::<[u8; 32]>().prop_map(|a| {
            let mut key = [0u8; 48];
            key[..32].copy_from_slice(&a);
            Address::new_bls(key)
        }),
    ]
}

fn arb_amount() -> impl Strategy<Value = TokenAmount> {
    prop::collection::vec(any::<u8>(), 0..20)
        .prop_map(|bytes| TokenAmount::from_atto(BigUint::from_bytes_be(&bytes)))
}

prop_compose! {
    fn arb_message()(
        version in any::<u64>(),
        to in arb_address(),
        from in arb_address(),
        nonce in any::<u64>(),
        value in arb_amount(),
        gas_limit in any::<i64>(),
        gas_fee_cap in arb_amount(),
        gas_premium in arb_amount(),
        method in any::<u64>(),
        params in prop::collection::vec(any::<u8>(), 0..256),
    ) -> Message {
        Message {
            version,
            to,
            from,
            nonce,
            value,
            gas_limit,
            gas_fee_cap,
            gas_premium,
            method,
            params,
        }
    }
}

proptest! {
    #[test]
    fn message_decode_inverts_encode(msg in arb_message()) {
        let bytes = msg.to_cbor().expect("params within cap");
        let decoded = Message::from_cbor(&bytes).expect("canonical bytes decode");
        prop_assert_eq!(&decoded, &msg);
        prop_assert_eq!(decoded.to_cbor().unwrap(), bytes);
    }

    #[test]
    fn signed_message_decode_inverts_encode(msg in arb_message(), sig in any::<[u8; 32]>()) {
        let mut data = sig.to_vec();
        data.resize(65, 1);
        let signed = SignedMessage::new(msg, Signature::new_secp256k1(data));
        let bytes = signed.to_cbor().unwrap();
        prop_assert_eq!(SignedMessage::from_cbor(&bytes).unwrap(), signed);
    }

    #[test]
    fn every_strict_prefix_is_rejected(msg in arb_message()) {
        let bytes = msg.to_cbor().unwrap();
        for end in 0..bytes.len() {
            prop_assert!(Message::from_cbor(&bytes[..end]).is_err());
        }
    }
}

#[test]
fn byte_string_longer_than_input_is_truncated() {
    // params header claims 100 bytes, 2 follow
    let mut enc = Encoder::new();
    enc.write_array_header(10);
    enc.write_u64(0);
    Address::new_id(1).write_cbor(&mut enc);
    Address::new_id(2).write_cbor(&mut enc);
    enc.write_u64(0);
    TokenAmount::zero().write_cbor(&mut enc).unwrap();
    enc.write_i64(0);
    TokenAmount::zero().write_cbor(&mut enc).unwrap();
    TokenAmount::zero().write_cbor(&mut enc).unwrap();
    enc.write_u64(0);
    let mut bytes = enc.into_bytes();
    bytes.extend_from_slice(&[0x58, 100, 0xaa, 0xbb]);

    assert_eq!(Message::from_cbor(&bytes), Err(CodecError::TruncatedInput));
}

#[test]
fn signed_message_with_wrong_arity_is_malformed() {
    let msg = Message::new(
        Address::new_id(1),
        Address::new_id(2),
        0,
        TokenAmount::zero(),
        Vec::new(),
    );
    let mut bytes = SignedMessage::new(msg, Signature::new_bls(vec![0; 96]))
        .to_cbor()
        .unwrap();
    bytes[0] = 0x83;

    assert!(matches!(
        SignedMessage::from_cbor(&bytes),
        Err(CodecError::MalformedEncoding { .. })
    ));
}

#[test]
fn negative_amount_sign_byte_is_rejected() {
    let msg = Message::new(
        Address::new_id(1000),
        Address::new_id(1001),
        0,
        TokenAmount::from(1_u64),
        Vec::new(),
    );
    let mut bytes = msg.to_cbor().unwrap();
    // value is `42 00 01` right after the nonce
    let pos = bytes
        .windows(3)
        .position(|w| w == [0x42, 0x00, 0x01])
        .unwrap();
    bytes[pos + 1] = 0x01;

    assert!(matches!(
        Message::from_cbor(&bytes),
        Err(CodecError::MalformedEncoding { .. })
    ));
}

/// A transfer of `magnitude` (big-endian, no leading zeros) attoFIL.
fn transfer_of(magnitude: &[u8]) -> Message {
    Message::new(
        Address::new_id(1000),
        Address::new_id(1001),
        0,
        TokenAmount::from_atto(BigUint::from_bytes_be(magnitude)),
        Vec::new(),
    )
}

/// Hand-encodes a message whose `to` and `value` fields carry raw bytes.
fn raw_message(to: &[u8], value: &[u8]) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.write_array_header(10);
    enc.write_u64(0);
    enc.write_bytes(to);
    Address::new_id(1001).write_cbor(&mut enc);
    enc.write_u64(0);
    enc.write_bytes(value);
    enc.write_i64(0);
    enc.write_bytes(&[]);
    enc.write_bytes(&[]);
    enc.write_u64(0);
    enc.write_bytes(&[]);
    enc.into_bytes()
}

#[test]
fn widest_amount_encodes_and_decodes() {
    let msg = transfer_of(&[0xff; 128]);

    let bytes = msg.to_cbor().unwrap();

    assert_eq!(Message::from_cbor(&bytes).unwrap(), msg);
}

#[test]
fn amount_past_128_bytes_is_refused_on_encode() {
    for width in [129, 130] {
        let msg = transfer_of(&vec![0xff; width]);

        assert!(
            matches!(msg.to_cbor(), Err(CodecError::MalformedEncoding { .. })),
            "{width}-byte magnitude encoded"
        );
        assert!(matches!(
            SignedMessage::new(msg, Signature::new_bls(vec![0; 96])).to_cbor(),
            Err(CodecError::MalformedEncoding { .. })
        ));
    }
}

#[test]
fn amount_past_128_bytes_is_malformed_on_decode() {
    for width in [129, 130] {
        let mut value = vec![0x00];
        value.resize(width + 1, 0xff);
        let bytes = raw_message(&Address::new_id(1000).to_bytes(), &value);

        assert!(
            matches!(
                Message::from_cbor(&bytes),
                Err(CodecError::MalformedEncoding { .. })
            ),
            "{width}-byte magnitude decoded"
        );
    }
}

#[test]
fn oversize_address_is_malformed() {
    let mut to = Address::new_id(1000).to_bytes();
    to.resize(200, 0x01);
    let bytes = raw_message(&to, &[]);

    assert!(matches!(
        Message::from_cbor(&bytes),
        Err(CodecError::MalformedEncoding { .. })
    ));
}
