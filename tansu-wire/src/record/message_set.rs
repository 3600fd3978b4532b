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

//! Legacy message sets (magic 0 and 1)
//!
//! ```text
//! offset        i64  @0
//! message size  i32  @8
//! crc           u32  @12  CRC-32 (IEEE) of @16 to the end of the message
//! magic         i8   @16
//! attributes    i8   @17
//! timestamp     i64  @18  magic 1 only
//! key           bytes
//! value         bytes
//! ```

use super::{Frame, Framed, Partial, read_framed, walked};
use crate::{
    Encode, Result,
    primitive::{BufExt as _, BufMutExt as _},
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use crc::{CRC_32_ISO_HDLC, Crc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

static IEEE: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

const CRC_START: usize = 16;

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MessageV0 {
    pub offset: i64,
    pub message_size: i32,
    pub crc: u32,
    pub magic: i8,
    pub attributes: i8,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MessageV1 {
    pub offset: i64,
    pub message_size: i32,
    pub crc: u32,
    pub magic: i8,
    pub attributes: i8,
    pub timestamp: i64,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
}

/// The size and checksum of a message whose body starts at the magic byte.
fn seal(body: &[u8]) -> Result<(i32, u32)> {
    i32::try_from(size_of::<u32>() + body.len())
        .map(|message_size| (message_size, IEEE.checksum(body)))
        .map_err(Into::into)
}

fn put_key_value(dst: &mut BytesMut, key: Option<&[u8]>, value: Option<&[u8]>) -> Result<()> {
    dst.put_nullable_bytes(key)?;
    dst.put_nullable_bytes(value)
}

/// Verify the size and checksum of the message at the front of `fetched`,
/// whose key and value follow a fixed header of `header` bytes.
fn verify(fetched: &Bytes, span: usize, header: usize, message_size: i32, crc: u32) -> Result<()> {
    let frame = Frame {
        length: message_size,
        crc,
        algorithm: &IEEE,
        crc_start: CRC_START,
        header,
    };

    frame.verify(fetched, span, |key_value| {
        walked(key_value, |encoded| {
            encoded
                .try_get_nullable_bytes()
                .and_then(|_| encoded.try_get_nullable_bytes())
                .map(|_| ())
        })
    })
}

fn read_key_value(encoded: &mut Bytes) -> Result<(Option<Bytes>, Option<Bytes>)> {
    let key = encoded.try_get_nullable_bytes()?;
    let value = encoded.try_get_nullable_bytes()?;
    Ok((key, value))
}

impl MessageV0 {
    pub const MAGIC: i8 = 0;

    /// A message with a consistent size and checksum.
    pub fn new(
        offset: i64,
        attributes: i8,
        key: Option<Bytes>,
        value: Option<Bytes>,
    ) -> Result<Self> {
        let mut body = BytesMut::new();
        body.put_i8(Self::MAGIC);
        body.put_i8(attributes);
        put_key_value(&mut body, key.as_deref(), value.as_deref())?;

        seal(&body).map(|(message_size, crc)| Self {
            offset,
            message_size,
            crc,
            magic: Self::MAGIC,
            attributes,
            key,
            value,
        })
    }
}

impl Encode for MessageV0 {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_i64(self.offset);
        dst.put_i32(self.message_size);
        dst.put_u32(self.crc);
        dst.put_i8(self.magic);
        dst.put_i8(self.attributes);
        put_key_value(dst, self.key.as_deref(), self.value.as_deref())
    }
}

impl Framed for MessageV0 {
    const NAME: &'static str = "MessageV0";

    fn from_fetched(fetched: &Bytes, span: usize) -> Result<Self> {
        let mut encoded = fetched.slice(..span);

        let offset = encoded.try_get_i64()?;
        let message_size = encoded.try_get_i32()?;
        let crc = encoded.try_get_u32()?;
        let magic = encoded.try_get_i8()?;
        let attributes = encoded.try_get_i8()?;

        verify(fetched, span, span - encoded.remaining(), message_size, crc)?;

        read_key_value(&mut encoded).map(|(key, value)| Self {
            offset,
            message_size,
            crc,
            magic,
            attributes,
            key,
            value,
        })
    }
}

impl MessageV1 {
    pub const MAGIC: i8 = 1;

    pub fn new(
        offset: i64,
        attributes: i8,
        timestamp: i64,
        key: Option<Bytes>,
        value: Option<Bytes>,
    ) -> Result<Self> {
        let mut body = BytesMut::new();
        body.put_i8(Self::MAGIC);
        body.put_i8(attributes);
        body.put_i64(timestamp);
        put_key_value(&mut body, key.as_deref(), value.as_deref())?;

        seal(&body).map(|(message_size, crc)| Self {
            offset,
            message_size,
            crc,
            magic: Self::MAGIC,
            attributes,
            timestamp,
            key,
            value,
        })
    }
}

impl Encode for MessageV1 {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_i64(self.offset);
        dst.put_i32(self.message_size);
        dst.put_u32(self.crc);
        dst.put_i8(self.magic);
        dst.put_i8(self.attributes);
        dst.put_i64(self.timestamp);
        put_key_value(dst, self.key.as_deref(), self.value.as_deref())
    }
}

impl Framed for MessageV1 {
    const NAME: &'static str = "MessageV1";

    fn from_fetched(fetched: &Bytes, span: usize) -> Result<Self> {
        let mut encoded = fetched.slice(..span);

        let offset = encoded.try_get_i64()?;
        let message_size = encoded.try_get_i32()?;
        let crc = encoded.try_get_u32()?;
        let magic = encoded.try_get_i8()?;
        let attributes = encoded.try_get_i8()?;
        let timestamp = encoded.try_get_i64()?;

        verify(fetched, span, span - encoded.remaining(), message_size, crc)?;

        read_key_value(&mut encoded).map(|(key, value)| Self {
            offset,
            message_size,
            crc,
            magic,
            attributes,
            timestamp,
            key,
            value,
        })
    }
}

/// Read the complete magic 0 messages of fetched partition data.
#[instrument(skip_all)]
pub fn read_v0_messages(fetched: Bytes) -> Result<Vec<MessageV0>, Partial<MessageV0>> {
    read_framed(fetched)
}

/// Read the complete magic 1 messages of fetched partition data.
#[instrument(skip_all)]
pub fn read_v1_messages(fetched: Bytes) -> Result<Vec<MessageV1>, Partial<MessageV1>> {
    read_framed(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    #[test]
    fn v0_layout() -> Result<()> {
        let message = MessageV0::new(5, 0, None, Some(Bytes::from_static(b"abc")))?;
        assert_eq!(17, message.message_size);

        let encoded = message.encode()?;
        assert_eq!(29, encoded.len());
        assert_eq!(&[0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 17], &encoded[..12]);
        assert_eq!(
            &[0, 0, 255, 255, 255, 255, 0, 0, 0, 3, b'a', b'b', b'c'],
            &encoded[16..]
        );
        assert_eq!(message.crc, IEEE.checksum(&encoded[16..]));

        Ok(())
    }

    #[test]
    fn v1_decode() -> Result<()> {
        let first = MessageV1::new(
            0,
            0,
            1_707_058_170_165,
            Some(Bytes::from_static(b"k")),
            Some(Bytes::from_static(b"v")),
        )?;
        let second = MessageV1::new(1, 0, 1_707_058_170_166, None, None)?;

        let mut fetched = BytesMut::new();
        first.encode_into(&mut fetched)?;
        second.encode_into(&mut fetched)?;

        assert_eq!(Ok(vec![first, second]), read_v1_messages(fetched.freeze()));

        Ok(())
    }

    #[test]
    fn crc_is_checked() -> Result<()> {
        let message = MessageV0::new(0, 0, None, Some(Bytes::from_static(b"abc")))?;
        let mut encoded = BytesMut::from(&message.encode()?[..]);

        let last = encoded.len() - 1;
        encoded[last] ^= 0xff;

        let partial = read_v0_messages(encoded.freeze()).unwrap_err();
        assert!(partial.decoded.is_empty());
        assert!(matches!(
            partial.error,
            Error::EncodedCrcMismatch { encoded, .. } if encoded == message.crc
        ));

        Ok(())
    }

    #[test]
    fn value_length_is_covered_by_the_crc() -> Result<()> {
        let message = MessageV0::new(0, 0, None, Some(Bytes::from_static(b"abc")))?;
        let mut encoded = BytesMut::from(&message.encode()?[..]);

        // value length 3 becomes 7
        encoded[25] = 7;

        assert!(matches!(
            read_v0_messages(encoded.freeze()).map_err(Error::from),
            Err(Error::EncodedCrcMismatch { encoded, .. }) if encoded == message.crc
        ));

        Ok(())
    }

    #[test]
    fn invalid_key_length_is_a_crc_mismatch() -> Result<()> {
        let message = MessageV0::new(0, 0, None, Some(Bytes::from_static(b"abc")))?;
        let mut encoded = BytesMut::from(&message.encode()?[..]);

        encoded[18..22].copy_from_slice(&[0xfe, 0xff, 0xff, 0xfe]);

        assert!(matches!(
            read_v0_messages(encoded.freeze()).map_err(Error::from),
            Err(Error::EncodedCrcMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn message_size_is_checked() -> Result<()> {
        let first = MessageV0::new(0, 0, None, Some(Bytes::from_static(b"abc")))?;
        let second = MessageV0::new(1, 0, None, Some(Bytes::from_static(b"def")))?;

        let mut fetched = BytesMut::new();
        first.encode_into(&mut fetched)?;
        second.encode_into(&mut fetched)?;

        fetched[8..12].copy_from_slice(&19i32.to_be_bytes());

        assert_eq!(
            Err(Error::EncodedLengthMismatch {
                encoded: 19,
                read: 17
            }),
            read_v0_messages(fetched.freeze()).map_err(Error::from)
        );

        Ok(())
    }
}
