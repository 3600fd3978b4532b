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
//
//! Kafka protocol primitives
//!
//! [`BufExt`] reads and [`BufMutExt`] appends the primitive types used by
//! every message: big-endian fixed width integers come straight from
//! [`bytes`], everything else is defined here.
//!
//! Strings and arrays have two encodings. Non-flexible versions prefix them
//! with a fixed width length (`-1` for null). Flexible versions use a
//! "compact" unsigned varint length offset by one (`0` for null).

pub mod tagged;
pub mod varint;

use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes};

/// Reads Kafka protocol primitives, failing with [`Error::NotEnoughData`]
/// rather than panicking when the buffer runs short.
pub trait BufExt: Buf {
    fn try_get_uvarint(&mut self) -> Result<u32> {
        varint::get_uvarint(self)
    }

    fn try_get_varint(&mut self) -> Result<i32> {
        varint::get_varint(self)
    }

    fn try_get_varlong(&mut self) -> Result<i64> {
        varint::get_varlong(self)
    }

    fn try_get_bool(&mut self) -> Result<bool> {
        self.try_get_i8().map(|b| b != 0).map_err(Into::into)
    }

    /// Exactly `length` bytes.
    fn try_get_span(&mut self, length: usize) -> Result<Bytes> {
        let available = self.remaining();

        if available < length {
            Err(Error::NotEnoughData {
                requested: length,
                available,
            })
        } else {
            Ok(self.copy_to_bytes(length))
        }
    }

    fn try_get_string(&mut self) -> Result<String> {
        self.try_get_nullable_string()?
            .ok_or(Error::InvalidLength(-1))
    }

    fn try_get_nullable_string(&mut self) -> Result<Option<String>> {
        let length = self.try_get_i16()?;
        nullable_length(i32::from(length))?
            .map(|length| self.try_get_utf8(length))
            .transpose()
    }

    fn try_get_compact_string(&mut self) -> Result<String> {
        self.try_get_compact_nullable_string()?
            .ok_or(Error::InvalidLength(-1))
    }

    fn try_get_compact_nullable_string(&mut self) -> Result<Option<String>> {
        self.try_get_compact_length()?
            .map(|length| self.try_get_utf8(length))
            .transpose()
    }

    /// A string as it is encoded in a flexible or in a non-flexible version.
    fn try_get_flex_string(&mut self, flexible: bool) -> Result<String> {
        if flexible {
            self.try_get_compact_string()
        } else {
            self.try_get_string()
        }
    }

    fn try_get_flex_nullable_string(&mut self, flexible: bool) -> Result<Option<String>> {
        if flexible {
            self.try_get_compact_nullable_string()
        } else {
            self.try_get_nullable_string()
        }
    }

    /// The number of elements in an array, `None` for a null array.
    fn try_get_array_len(&mut self) -> Result<Option<usize>> {
        self.try_get_i32()
            .map_err(Into::into)
            .and_then(nullable_length)
    }

    fn try_get_compact_array_len(&mut self) -> Result<Option<usize>> {
        self.try_get_compact_length()
    }

    fn try_get_flex_array_len(&mut self, flexible: bool) -> Result<Option<usize>> {
        if flexible {
            self.try_get_compact_array_len()
        } else {
            self.try_get_array_len()
        }
    }

    /// Bytes prefixed with an i32 length, `None` when the length is `-1`.
    fn try_get_nullable_bytes(&mut self) -> Result<Option<Bytes>> {
        self.try_get_i32()
            .map_err(Into::into)
            .and_then(nullable_length)?
            .map(|length| self.try_get_span(length))
            .transpose()
    }

    /// Bytes prefixed with a zig-zag varint length, as used within records.
    fn try_get_varint_bytes(&mut self) -> Result<Option<Bytes>> {
        self.try_get_varint()
            .and_then(nullable_length)?
            .map(|length| self.try_get_span(length))
            .transpose()
    }

    #[doc(hidden)]
    fn try_get_compact_length(&mut self) -> Result<Option<usize>> {
        self.try_get_uvarint().and_then(|length| {
            length
                .checked_sub(1)
                .map(usize::try_from)
                .transpose()
                .map_err(Into::into)
        })
    }

    #[doc(hidden)]
    fn try_get_utf8(&mut self, length: usize) -> Result<String> {
        self.try_get_span(length)
            .and_then(|encoded| String::from_utf8(encoded.to_vec()).map_err(Into::into))
    }
}

impl<T: Buf + ?Sized> BufExt for T {}

fn nullable_length(length: i32) -> Result<Option<usize>> {
    match length {
        -1 => Ok(None),
        length if length < -1 => Err(Error::InvalidLength(length)),
        length => usize::try_from(length).map(Some).map_err(Into::into),
    }
}

/// Appends Kafka protocol primitives.
pub trait BufMutExt: BufMut {
    fn put_uvarint(&mut self, value: u32) {
        varint::put_uvarint(self, value)
    }

    fn put_varint(&mut self, value: i32) {
        varint::put_varint(self, value)
    }

    fn put_varlong(&mut self, value: i64) {
        varint::put_varlong(self, value)
    }

    fn put_bool(&mut self, value: bool) {
        self.put_i8(i8::from(value))
    }

    fn put_string(&mut self, value: &str) -> Result<()> {
        self.put_nullable_string(Some(value))
    }

    fn put_nullable_string(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(value) = value {
            self.put_i16(i16::try_from(value.len())?);
            self.put_slice(value.as_bytes());
        } else {
            self.put_i16(-1);
        }

        Ok(())
    }

    fn put_compact_string(&mut self, value: &str) -> Result<()> {
        self.put_compact_nullable_string(Some(value))
    }

    fn put_compact_nullable_string(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(value) = value {
            self.put_compact_length(value.len())?;
            self.put_slice(value.as_bytes());
        } else {
            self.put_uvarint(0);
        }

        Ok(())
    }

    fn put_flex_string(&mut self, flexible: bool, value: &str) -> Result<()> {
        if flexible {
            self.put_compact_string(value)
        } else {
            self.put_string(value)
        }
    }

    fn put_flex_nullable_string(&mut self, flexible: bool, value: Option<&str>) -> Result<()> {
        if flexible {
            self.put_compact_nullable_string(value)
        } else {
            self.put_nullable_string(value)
        }
    }

    fn put_array_len(&mut self, length: usize) -> Result<()> {
        i32::try_from(length)
            .map(|length| self.put_i32(length))
            .map_err(Into::into)
    }

    fn put_compact_array_len(&mut self, length: usize) -> Result<()> {
        self.put_compact_length(length)
    }

    fn put_flex_array_len(&mut self, flexible: bool, length: usize) -> Result<()> {
        if flexible {
            self.put_compact_array_len(length)
        } else {
            self.put_array_len(length)
        }
    }

    fn put_nullable_bytes(&mut self, value: Option<&[u8]>) -> Result<()> {
        if let Some(value) = value {
            self.put_i32(i32::try_from(value.len())?);
            self.put_slice(value);
        } else {
            self.put_i32(-1);
        }

        Ok(())
    }

    fn put_varint_bytes(&mut self, value: Option<&[u8]>) -> Result<()> {
        if let Some(value) = value {
            self.put_varint(i32::try_from(value.len())?);
            self.put_slice(value);
        } else {
            self.put_varint(-1);
        }

        Ok(())
    }

    #[doc(hidden)]
    fn put_compact_length(&mut self, length: usize) -> Result<()> {
        u32::try_from(length)
            .ok()
            .and_then(|length| length.checked_add(1))
            .map(|length| self.put_uvarint(length))
            .ok_or(Error::InvalidLength(i32::MAX))
    }
}

impl<T: BufMut + ?Sized> BufMutExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn nullable_string() -> Result<()> {
        let mut encoded = BytesMut::new();
        encoded.put_nullable_string(Some("abc"))?;
        encoded.put_nullable_string(None)?;

        assert_eq!(&[0, 3, b'a', b'b', b'c', 255, 255], &encoded[..]);

        let mut encoded = encoded.freeze();
        assert_eq!(Some("abc".into()), encoded.try_get_nullable_string()?);
        assert_eq!(None, encoded.try_get_nullable_string()?);
        assert!(!encoded.has_remaining());

        Ok(())
    }

    #[test]
    fn compact_string() -> Result<()> {
        let mut encoded = BytesMut::new();
        encoded.put_compact_string("abc")?;
        encoded.put_compact_nullable_string(None)?;

        assert_eq!(&[4, b'a', b'b', b'c', 0], &encoded[..]);

        let mut encoded = encoded.freeze();
        assert_eq!("abc", encoded.try_get_compact_string()?);
        assert_eq!(None, encoded.try_get_compact_nullable_string()?);

        Ok(())
    }

    #[test]
    fn null_is_not_a_string() {
        let mut encoded = Bytes::from_static(&[255, 255]);
        assert_eq!(Err(Error::InvalidLength(-1)), encoded.try_get_string());
    }

    #[test]
    fn negative_length_is_invalid() {
        let mut encoded = Bytes::from_static(&[255, 255, 255, 254]);
        assert_eq!(Err(Error::InvalidLength(-2)), encoded.try_get_array_len());
    }

    #[test]
    fn short_span() {
        let mut encoded = Bytes::from_static(&[0, 5, b'a', b'b']);

        assert_eq!(
            Err(Error::NotEnoughData {
                requested: 5,
                available: 2
            }),
            encoded.try_get_string()
        );
    }

    #[test]
    fn varint_bytes() -> Result<()> {
        let mut encoded = BytesMut::new();
        encoded.put_varint_bytes(Some(b"xyz"))?;
        encoded.put_varint_bytes(None)?;

        assert_eq!(&[6, b'x', b'y', b'z', 1], &encoded[..]);

        let mut encoded = encoded.freeze();
        assert_eq!(
            Some(Bytes::from_static(b"xyz")),
            encoded.try_get_varint_bytes()?
        );
        assert_eq!(None, encoded.try_get_varint_bytes()?);

        Ok(())
    }
}
