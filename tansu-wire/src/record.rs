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
//! Kafka Record
//!
//! Constructing a [`Record`] using a builder:
//!
//! ```
//! use bytes::Bytes;
//! use tansu_wire::record::{Header, Record};
//!
//! let record = Record::builder()
//!     .key(Some(Bytes::from_static(b"message")))
//!     .value(Some(Bytes::from_static(b"hello world!")))
//!     .header(
//!         Header::builder()
//!             .key(Bytes::from_static(b"format"))
//!             .value(Bytes::from_static(b"text")),
//!     )
//!     .build();
//!
//! assert!(record.is_ok());
//! ```
//!
//! Fetched partition data is a sequence of record batches (magic 2), or
//! for older brokers a legacy message set (magic 0 or 1). A broker may
//! truncate the last unit of a fetch response, so the readers return every
//! unit that is complete and stop quietly at a truncated one. A complete
//! unit with an inconsistent length or checksum is corrupt, and is
//! reported as a [`Partial`] with the units decoded before it.

pub mod batch;
pub mod header;
pub mod message_set;

use crate::{
    Decode, Encode, Error, Result,
    primitive::{BufExt as _, BufMutExt as _},
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use crc::Crc;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use tracing::{debug, error, instrument, warn};

pub use batch::{RecordBatch, read_record_batches};
pub use header::Header;
pub use message_set::{MessageV0, MessageV1, read_v0_messages, read_v1_messages};

/// A Kafka API Record.
///
/// Note that is structure uses the same variant encoding as protobuf.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Record {
    pub length: i32,
    pub attributes: u8,
    pub timestamp_delta: i64,
    pub offset_delta: i32,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
    pub headers: Vec<Header>,
}

impl Record {
    #[must_use]
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn key(&self) -> Option<Bytes> {
        self.key.clone()
    }

    pub fn value(&self) -> Option<Bytes> {
        self.value.clone()
    }

    pub fn is_tombstone(&self) -> bool {
        self.key.is_some() && self.value.is_none()
    }

    fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_u8(self.attributes);
        dst.put_varlong(self.timestamp_delta);
        dst.put_varint(self.offset_delta);
        dst.put_varint_bytes(self.key.as_deref())?;
        dst.put_varint_bytes(self.value.as_deref())?;

        dst.put_varint(i32::try_from(self.headers.len())?);
        self.headers
            .iter()
            .try_for_each(|header| header.encode_into(dst))
    }
}

impl Encode for Record {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_varint(self.length);
        self.encode_body(dst)
    }
}

impl Decode for Record {
    fn decode(encoded: &mut Bytes) -> Result<Self> {
        let length = encoded.try_get_varint()?;
        let attributes = encoded.try_get_u8()?;
        let timestamp_delta = encoded.try_get_varlong()?;
        let offset_delta = encoded.try_get_varint()?;
        let key = encoded.try_get_varint_bytes()?;
        let value = encoded.try_get_varint_bytes()?;

        let count = encoded.try_get_varint()?;
        let headers = (0..count)
            .map(|_| Header::decode(encoded))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            length,
            attributes,
            timestamp_delta,
            offset_delta,
            key,
            value,
            headers,
        })
    }
}

impl TryFrom<Builder> for Record {
    type Error = Error;

    fn try_from(builder: Builder) -> Result<Self, Self::Error> {
        let mut record = Self {
            length: 0,
            attributes: builder.attributes,
            timestamp_delta: builder.timestamp_delta,
            offset_delta: builder.offset_delta,
            key: builder.key,
            value: builder.value,
            headers: builder.headers.into_iter().map(Into::into).collect(),
        };

        let mut body = BytesMut::new();
        record.encode_body(&mut body)?;
        record.length = i32::try_from(body.len())?;

        Ok(record)
    }
}

impl From<Record> for Builder {
    fn from(value: Record) -> Self {
        Self {
            attributes: value.attributes,
            timestamp_delta: value.timestamp_delta,
            offset_delta: value.offset_delta,
            key: value.key,
            value: value.value,
            headers: value.headers.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Builder {
    attributes: u8,
    timestamp_delta: i64,
    offset_delta: i32,
    key: Option<Bytes>,
    value: Option<Bytes>,
    headers: Vec<header::Builder>,
}

impl Builder {
    #[must_use]
    pub fn attributes(self, attributes: u8) -> Self {
        Self { attributes, ..self }
    }

    #[must_use]
    pub fn timestamp_delta(self, timestamp_delta: i64) -> Self {
        Self {
            timestamp_delta,
            ..self
        }
    }

    #[must_use]
    pub fn offset_delta(self, offset_delta: i32) -> Self {
        Self {
            offset_delta,
            ..self
        }
    }

    #[must_use]
    pub fn key(self, key: Option<Bytes>) -> Self {
        Self { key, ..self }
    }

    #[must_use]
    pub fn value(self, value: Option<Bytes>) -> Self {
        Self { value, ..self }
    }

    #[must_use]
    pub fn header(mut self, header: header::Builder) -> Self {
        self.headers.push(header);
        self
    }

    pub fn build(self) -> Result<Record> {
        Record::try_from(self)
    }
}

/// Read exactly `n` length prefixed records from the front of `encoded`.
#[instrument(skip(encoded))]
pub fn read_records(n: usize, mut encoded: Bytes) -> Result<Vec<Record>> {
    (0..n)
        .map(|_| {
            let mut prefix = encoded.clone();
            let length = prefix.try_get_varint()?;

            // no amount of data satisfies a negative length
            let length = usize::try_from(length).map_err(|_| {
                debug!(length, "negative record length");

                Error::NotEnoughData {
                    requested: encoded.remaining() + 1,
                    available: encoded.remaining(),
                }
            })?;

            let span = encoded.remaining() - prefix.remaining() + length;
            let mut record = encoded.try_get_span(span)?;

            Record::decode(&mut record).and_then(|decoded| {
                if record.has_remaining() {
                    Err(Error::TrailingBytes(record.remaining()))
                } else {
                    Ok(decoded)
                }
            })
        })
        .collect()
}

/// The units decoded from fetched data before a corrupt unit, together with
/// the error describing the corruption.
#[derive(Clone, Eq, PartialEq)]
pub struct Partial<T> {
    pub decoded: Vec<T>,
    pub error: Error,
}

impl<T> Debug for Partial<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partial")
            .field("decoded", &self.decoded.len())
            .field("error", &self.error)
            .finish()
    }
}

impl<T> Display for Partial<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} decoded", self.error, self.decoded.len())
    }
}

impl<T> std::error::Error for Partial<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<Partial<T>> for Error {
    fn from(value: Partial<T>) -> Self {
        value.error
    }
}

/// A unit of fetched data framed as `[i64][i32 length][length bytes]`.
pub(crate) trait Framed: Sized {
    const NAME: &'static str;

    /// Decode the unit at the front of `fetched`, whose declared length
    /// spans its first `span` bytes.
    ///
    /// A length or checksum mismatch marks the unit as corrupt, any other
    /// error as undecodable.
    fn from_fetched(fetched: &Bytes, span: usize) -> Result<Self>;
}

const LENGTH_OFFSET: usize = 8;
const SPAN_OVERHEAD: usize = 12;

#[instrument(skip_all, fields(unit = T::NAME))]
pub(crate) fn read_framed<T: Framed>(mut fetched: Bytes) -> Result<Vec<T>, Partial<T>> {
    let mut decoded = Vec::new();

    while fetched.len() >= SPAN_OVERHEAD {
        let mut length = fetched.slice(LENGTH_OFFSET..SPAN_OVERHEAD);
        let Ok(span) = length
            .try_get_i32()
            .map_err(Error::from)
            .and_then(|length| usize::try_from(length).map_err(Error::from))
            .map(|length| length + SPAN_OVERHEAD)
        else {
            debug!(decoded = decoded.len(), "invalid length");
            break;
        };

        if fetched.len() < span {
            debug!(decoded = decoded.len(), span, remaining = fetched.len());
            break;
        }

        match T::from_fetched(&fetched, span) {
            Ok(unit) => {
                decoded.push(unit);
                fetched.advance(span);
            }

            Err(error @ (Error::EncodedLengthMismatch { .. } | Error::EncodedCrcMismatch { .. })) => {
                return Err(Partial { decoded, error });
            }

            Err(error) => {
                debug!(decoded = decoded.len(), ?error);
                break;
            }
        }
    }

    Ok(decoded)
}

/// The fixed framing of a unit, decoded from the header of its span.
pub(crate) struct Frame {
    /// The declared length following the 12 byte prefix.
    pub(crate) length: i32,
    pub(crate) crc: u32,
    pub(crate) algorithm: &'static Crc<u32>,
    /// The offset where the checksum starts.
    pub(crate) crc_start: usize,
    /// The offset of the variable part following the fixed header.
    pub(crate) header: usize,
}

impl Frame {
    /// Verify the unit at the front of `fetched` against its declared
    /// length and checksum.
    ///
    /// `walk` measures the variable part of the unit in the data it is
    /// given. A unit that is intact over the extent it walks, but not over
    /// its declared span, has the wrong length. Otherwise the checksum must
    /// match over the span, and the walk must end exactly at its end.
    pub(crate) fn verify(
        &self,
        fetched: &Bytes,
        span: usize,
        walk: impl Fn(Bytes) -> (usize, Result<()>),
    ) -> Result<()> {
        if let (walked, Ok(())) = walk(fetched.slice(self.header..)) {
            let end = self.header + walked;

            if end != span && self.algorithm.checksum(&fetched[self.crc_start..end]) == self.crc {
                return Err(self.length_mismatch(end - SPAN_OVERHEAD));
            }
        }

        let computed = self.algorithm.checksum(&fetched[self.crc_start..span]);

        if computed != self.crc {
            error!(crc = self.crc, computed);

            return Err(Error::EncodedCrcMismatch {
                encoded: self.crc,
                computed,
            });
        }

        match walk(fetched.slice(self.header..span)) {
            (walked, Ok(())) if self.header + walked == span => Ok(()),

            (
                _,
                Err(Error::NotEnoughData {
                    requested,
                    available,
                }),
            ) => Err(self.length_mismatch(span - SPAN_OVERHEAD - available + requested)),

            (walked, outcome) => {
                debug!(?outcome);
                Err(self.length_mismatch(self.header + walked - SPAN_OVERHEAD))
            }
        }
    }

    fn length_mismatch(&self, read: usize) -> Error {
        warn!(length = self.length, read);

        Error::EncodedLengthMismatch {
            encoded: self.length,
            read,
        }
    }
}

/// The bytes `walk` consumed from `encoded`, with its outcome.
pub(crate) fn walked(
    mut encoded: Bytes,
    walk: impl FnOnce(&mut Bytes) -> Result<()>,
) -> (usize, Result<()>) {
    let available = encoded.remaining();
    let outcome = walk(&mut encoded);
    (available - encoded.remaining(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_size() -> Result<()> {
        let record = Record::builder()
            .value(Some(Bytes::from_static(&[100, 101, 102])))
            .build()?;

        assert_eq!(9, record.length);

        let encoded = record.encode()?;
        assert_eq!(&[18, 0, 0, 0, 1, 6, 100, 101, 102, 0], &encoded[..]);

        Ok(())
    }

    #[test]
    fn read_two() -> Result<()> {
        let mut encoded = BytesMut::new();

        Record::builder()
            .key(Some(Bytes::from_static(b"k")))
            .build()?
            .encode_into(&mut encoded)?;

        Record::builder()
            .offset_delta(1)
            .value(Some(Bytes::from_static(b"v")))
            .header(
                Header::builder()
                    .key(Bytes::from_static(b"h"))
                    .value(Bytes::from_static(b"x")),
            )
            .build()?
            .encode_into(&mut encoded)?;

        encoded.put_u8(0xff);

        let records = read_records(2, encoded.freeze())?;
        assert_eq!(2, records.len());
        assert!(records[0].is_tombstone());
        assert_eq!(1, records[1].offset_delta);
        assert_eq!(1, records[1].headers.len());

        Ok(())
    }

    #[test]
    fn negative_length() {
        assert_eq!(
            Err(Error::NotEnoughData {
                requested: 4,
                available: 3
            }),
            read_records(1, Bytes::from_static(&[1, 0, 0]))
        );
    }

    #[test]
    fn short() {
        assert!(matches!(
            read_records(1, Bytes::from_static(&[20, 0, 0])),
            Err(Error::NotEnoughData { .. })
        ));
    }

    #[test]
    fn trailing() {
        assert_eq!(
            Err(Error::TrailingBytes(1)),
            read_records(1, Bytes::from_static(&[14, 0, 0, 0, 1, 1, 0, 0xaa]))
        );
    }
}
