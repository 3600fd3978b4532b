// Copyright ⓒ 2024-2025 Peter Morgan <peter.james.morgan@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use bytes::{Bytes, BytesMut};
use common::init_tracing;
use pretty_assertions::assert_eq;
use tansu_wire::{
    Encode as _, Error, Result,
    record::{MessageV0, MessageV1, Partial, read_v0_messages, read_v1_messages},
};

pub mod common;

const MESSAGE_SIZE: usize = 8;

fn v1(offset: i64, value: &'static [u8]) -> Result<MessageV1> {
    MessageV1::new(
        offset,
        0,
        1_707_058_170_165 + offset,
        Some(Bytes::from_static(b"key")),
        Some(Bytes::from_static(value)),
    )
}

#[test]
fn truncated_v1_message_is_dropped() -> Result<()> {
    let _guard = init_tracing()?;

    let first = v1(0, b"hello")?;
    let second = v1(1, b"world")?;

    let mut fetched = BytesMut::new();
    first.encode_into(&mut fetched)?;
    let boundary = fetched.len();
    second.encode_into(&mut fetched)?;
    let fetched = fetched.freeze();

    for end in boundary..fetched.len() {
        assert_eq!(Ok(vec![first.clone()]), read_v1_messages(fetched.slice(..end)));
    }

    assert_eq!(Ok(vec![first, second]), read_v1_messages(fetched));

    Ok(())
}

#[test]
fn v0_crc_mismatch_keeps_prefix() -> Result<()> {
    let _guard = init_tracing()?;

    let first = MessageV0::new(0, 0, None, Some(Bytes::from_static(b"hello")))?;
    let second = MessageV0::new(1, 0, None, Some(Bytes::from_static(b"world")))?;
    let third = MessageV0::new(2, 0, None, None)?;

    let mut fetched = BytesMut::new();
    first.encode_into(&mut fetched)?;
    let boundary = fetched.len();
    second.encode_into(&mut fetched)?;
    third.encode_into(&mut fetched)?;

    // attributes
    fetched[boundary + 17] ^= 0x01;

    let Err(Partial { decoded, error }) = read_v0_messages(fetched.freeze()) else {
        panic!("expected a crc mismatch");
    };

    assert_eq!(vec![first], decoded);
    assert!(matches!(error, Error::EncodedCrcMismatch { encoded, .. } if encoded == second.crc));

    Ok(())
}

#[test]
fn size_longer_than_key_and_value() -> Result<()> {
    let _guard = init_tracing()?;

    let first = v1(0, b"hello")?;
    let second = v1(1, b"world")?;

    let mut fetched = BytesMut::new();
    first.encode_into(&mut fetched)?;
    second.encode_into(&mut fetched)?;

    let lengthened = first.message_size + 2;
    fetched[MESSAGE_SIZE..MESSAGE_SIZE + 4].copy_from_slice(&lengthened.to_be_bytes());

    assert_eq!(
        Err(Error::EncodedLengthMismatch {
            encoded: lengthened,
            read: usize::try_from(first.message_size)?,
        }),
        read_v1_messages(fetched.freeze()).map_err(Error::from)
    );

    Ok(())
}

#[test]
fn size_shorter_than_key_and_value() -> Result<()> {
    let _guard = init_tracing()?;

    let first = v1(0, b"hello")?;
    let second = v1(1, b"world")?;

    let mut fetched = BytesMut::new();
    first.encode_into(&mut fetched)?;
    second.encode_into(&mut fetched)?;

    let shortened = first.message_size - 2;
    fetched[MESSAGE_SIZE..MESSAGE_SIZE + 4].copy_from_slice(&shortened.to_be_bytes());

    assert_eq!(
        Err(Error::EncodedLengthMismatch {
            encoded: shortened,
            read: usize::try_from(first.message_size)?,
        }),
        read_v1_messages(fetched.freeze()).map_err(Error::from)
    );

    Ok(())
}

#[test]
fn negative_value_length_is_a_crc_mismatch() -> Result<()> {
    let _guard = init_tracing()?;

    let first = MessageV0::new(0, 0, None, Some(Bytes::from_static(b"hello")))?;
    let second = MessageV0::new(1, 0, None, Some(Bytes::from_static(b"world")))?;

    let mut fetched = BytesMut::new();
    first.encode_into(&mut fetched)?;
    let boundary = fetched.len();
    second.encode_into(&mut fetched)?;

    // value length
    fetched[boundary + 22..boundary + 26].copy_from_slice(&(-2i32).to_be_bytes());

    let Err(Partial { decoded, error }) = read_v0_messages(fetched.freeze()) else {
        panic!("expected a crc mismatch");
    };

    assert_eq!(vec![first], decoded);
    assert!(matches!(error, Error::EncodedCrcMismatch { encoded, .. } if encoded == second.crc));

    Ok(())
}

#[test]
fn magic_byte_is_recorded() -> Result<()> {
    let _guard = init_tracing()?;

    let message = v1(3, b"abc")?;
    assert_eq!(MessageV1::MAGIC, message.magic);

    let decoded = read_v1_messages(message.encode()?)?;
    assert_eq!(1_707_058_170_168, decoded[0].timestamp);
    assert_eq!(Some(Bytes::from_static(b"key")), decoded[0].key);

    Ok(())
}
