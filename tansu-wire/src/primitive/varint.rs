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

//! Variable length integers
//!
//! Unsigned varints use 7 bits per byte, least significant group first, with
//! the top bit set on every byte but the last. Signed varints and varlongs
//! are zig-zag encoded first.

use crate::{Error, Result};
use bytes::{Buf, BufMut};

const CONTINUATION: u8 = 0b1000_0000;
const MASK: u8 = 0b0111_1111;

fn get_unsigned<B: Buf + ?Sized>(encoded: &mut B, bits: u32) -> Result<u64> {
    let mut shift = 0u32;
    let mut accumulator = 0u64;

    loop {
        let byte = encoded.try_get_u8()?;

        if shift >= bits || (shift + 7 > bits && u32::from(byte & MASK) >> (bits - shift) != 0) {
            return Err(Error::VarIntOverflow);
        }

        accumulator |= u64::from(byte & MASK) << shift;

        if byte & CONTINUATION == CONTINUATION {
            shift += 7;
        } else {
            return Ok(accumulator);
        }
    }
}

fn put_unsigned<B: BufMut + ?Sized>(encoded: &mut B, mut value: u64) {
    while value >= u64::from(CONTINUATION) {
        #[allow(clippy::cast_possible_truncation)]
        encoded.put_u8(value as u8 | CONTINUATION);
        value >>= 7;
    }

    #[allow(clippy::cast_possible_truncation)]
    encoded.put_u8(value as u8);
}

pub fn get_uvarint<B: Buf + ?Sized>(encoded: &mut B) -> Result<u32> {
    get_unsigned(encoded, u32::BITS).and_then(|value| u32::try_from(value).map_err(Into::into))
}

pub fn get_varint<B: Buf + ?Sized>(encoded: &mut B) -> Result<i32> {
    get_uvarint(encoded).map(de_zigzag)
}

pub fn get_varlong<B: Buf + ?Sized>(encoded: &mut B) -> Result<i64> {
    get_unsigned(encoded, u64::BITS).map(de_zigzag_long)
}

pub fn put_uvarint<B: BufMut + ?Sized>(encoded: &mut B, value: u32) {
    put_unsigned(encoded, u64::from(value))
}

pub fn put_varint<B: BufMut + ?Sized>(encoded: &mut B, value: i32) {
    put_uvarint(encoded, en_zigzag(value))
}

pub fn put_varlong<B: BufMut + ?Sized>(encoded: &mut B, value: i64) {
    put_unsigned(encoded, en_zigzag_long(value))
}

/// The number of bytes `value` occupies as a zig-zag varint.
pub fn varint_size(value: i32) -> usize {
    uvarint_size(en_zigzag(value))
}

pub fn uvarint_size(value: u32) -> usize {
    let significant = u32::BITS - value.leading_zeros();
    usize::try_from(significant.div_ceil(7).max(1)).unwrap_or(5)
}

#[allow(clippy::cast_sign_loss)]
fn en_zigzag(decoded: i32) -> u32 {
    ((decoded << 1) ^ (decoded >> 31)) as u32
}

#[allow(clippy::cast_possible_wrap)]
fn de_zigzag(encoded: u32) -> i32 {
    ((encoded >> 1) as i32) ^ -((encoded & 1) as i32)
}

#[allow(clippy::cast_sign_loss)]
fn en_zigzag_long(decoded: i64) -> u64 {
    ((decoded << 1) ^ (decoded >> 63)) as u64
}

#[allow(clippy::cast_possible_wrap)]
fn de_zigzag_long(encoded: u64) -> i64 {
    ((encoded >> 1) as i64) ^ -((encoded & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};

    #[test]
    fn zigzag() {
        assert_eq!(0, en_zigzag(0));
        assert_eq!(1, en_zigzag(-1));
        assert_eq!(2, en_zigzag(1));
        assert_eq!(3, en_zigzag(-2));
        assert_eq!(4_294_967_294, en_zigzag(i32::MAX));
        assert_eq!(4_294_967_295, en_zigzag(i32::MIN));

        assert_eq!(i32::MIN, de_zigzag(en_zigzag(i32::MIN)));
        assert_eq!(i64::MIN, de_zigzag_long(en_zigzag_long(i64::MIN)));
    }

    #[test]
    fn encode_varint() {
        let mut encoded = BytesMut::new();
        put_varint(&mut encoded, 150);
        assert_eq!(&[0xac, 0x02], &encoded[..]);

        let mut encoded = BytesMut::new();
        put_varint(&mut encoded, -1);
        assert_eq!(&[0x01], &encoded[..]);
    }

    #[test]
    fn decode_varlong() -> Result<()> {
        let mut encoded = Bytes::from_static(&[0xd8, 0x9a, 0xdf, 0x9a, 0xa5, 0x66]);
        assert_eq!(1_757_340_755_628, get_varlong(&mut encoded)?);
        assert!(!encoded.has_remaining());
        Ok(())
    }

    #[test]
    fn truncated() {
        let mut encoded = Bytes::from_static(&[0xff, 0xff]);
        assert!(matches!(
            get_uvarint(&mut encoded),
            Err(Error::NotEnoughData { .. })
        ));
    }

    #[test]
    fn overflow() {
        let mut encoded = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff, 0x7f]);
        assert_eq!(Err(Error::VarIntOverflow), get_uvarint(&mut encoded));

        let mut encoded = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(Ok(u32::MAX), get_uvarint(&mut encoded));

        let mut encoded = Bytes::from_static(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert_eq!(Err(Error::VarIntOverflow), get_uvarint(&mut encoded));
    }

    #[test]
    fn size() {
        assert_eq!(1, uvarint_size(0));
        assert_eq!(1, uvarint_size(127));
        assert_eq!(2, uvarint_size(128));
        assert_eq!(5, uvarint_size(u32::MAX));
        assert_eq!(1, varint_size(-64));
        assert_eq!(2, varint_size(64));
    }
}
