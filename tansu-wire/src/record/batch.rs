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

//! Record batches (magic 2)
//!
//! ```text
//! base offset          i64  @0
//! batch length         i32  @8
//! partition leader ep. i32  @12
//! magic                i8   @16
//! crc                  u32  @17  CRC-32C of @21 to the end of the batch
//! attributes           i16  @21
//! last offset delta    i32  @23
//! base timestamp       i64  @27
//! max timestamp        i64  @35
//! producer id          i64  @43
//! producer epoch       i16  @51
//! base sequence        i32  @53
//! record count         i32  @57
//! records                   @61
//! ```

use super::{Frame, Framed, Partial, Record, read_framed, read_records, walked};
use crate::{Encode, Error, Result, primitive::BufExt as _};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use crc::{CRC_32_ISCSI, Crc};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;

static CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

const CRC_OFFSET: usize = 21;
const RECORDS_OFFSET: usize = 61;

/// The bytes between the end of the batch length and the first record.
const HEADER_AFTER_LENGTH: usize = RECORDS_OFFSET - 12;

const COMPRESSION_MASK: i16 = 0b111;
const TRANSACTIONAL: i16 = 0b1_0000;
const CONTROL: i16 = 0b10_0000;

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RecordBatch {
    pub base_offset: i64,
    pub batch_length: i32,
    pub partition_leader_epoch: i32,
    pub magic: i8,
    pub crc: u32,
    pub attributes: i16,
    pub last_offset_delta: i32,
    pub base_timestamp: i64,
    pub max_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub record_count: i32,
    pub record_data: Bytes,
}

impl RecordBatch {
    #[must_use]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The compression codec of the record data, `0` when uncompressed.
    pub fn compression(&self) -> i16 {
        self.attributes & COMPRESSION_MASK
    }

    pub fn is_transactional(&self) -> bool {
        self.attributes & TRANSACTIONAL == TRANSACTIONAL
    }

    pub fn is_control(&self) -> bool {
        self.attributes & CONTROL == CONTROL
    }

    pub fn max_offset(&self) -> i64 {
        self.base_offset + i64::from(self.last_offset_delta)
    }

    /// The records of an uncompressed batch.
    pub fn records(&self) -> Result<Vec<Record>> {
        if self.compression() != 0 {
            return Err(Error::UnsupportedCompression(self.compression()));
        }

        usize::try_from(self.record_count)
            .map_err(Into::into)
            .and_then(|record_count| read_records(record_count, self.record_data.clone()))
    }
}

impl Encode for RecordBatch {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_i64(self.base_offset);
        dst.put_i32(self.batch_length);
        dst.put_i32(self.partition_leader_epoch);
        dst.put_i8(self.magic);
        dst.put_u32(self.crc);
        dst.put_i16(self.attributes);
        dst.put_i32(self.last_offset_delta);
        dst.put_i64(self.base_timestamp);
        dst.put_i64(self.max_timestamp);
        dst.put_i64(self.producer_id);
        dst.put_i16(self.producer_epoch);
        dst.put_i32(self.base_sequence);
        dst.put_i32(self.record_count);
        dst.extend_from_slice(&self.record_data);
        Ok(())
    }
}

/// Skip over `record_count` records, each prefixed by its varint length.
fn walk_records(record_count: i32, encoded: &mut Bytes) -> Result<()> {
    for _ in 0..record_count {
        let length = encoded.try_get_varint()?;
        let length = usize::try_from(length).map_err(|_| Error::InvalidLength(length))?;
        _ = encoded.try_get_span(length)?;
    }

    Ok(())
}

impl Framed for RecordBatch {
    const NAME: &'static str = "RecordBatch";

    fn from_fetched(fetched: &Bytes, span: usize) -> Result<Self> {
        let mut encoded = fetched.slice(..span);

        let mut batch = Self {
            base_offset: encoded.try_get_i64()?,
            batch_length: encoded.try_get_i32()?,
            partition_leader_epoch: encoded.try_get_i32()?,
            magic: encoded.try_get_i8()?,
            crc: encoded.try_get_u32()?,
            attributes: encoded.try_get_i16()?,
            last_offset_delta: encoded.try_get_i32()?,
            base_timestamp: encoded.try_get_i64()?,
            max_timestamp: encoded.try_get_i64()?,
            producer_id: encoded.try_get_i64()?,
            producer_epoch: encoded.try_get_i16()?,
            base_sequence: encoded.try_get_i32()?,
            record_count: encoded.try_get_i32()?,
            record_data: Bytes::new(),
        };

        let frame = Frame {
            length: batch.batch_length,
            crc: batch.crc,
            algorithm: &CASTAGNOLI,
            crc_start: CRC_OFFSET,
            header: RECORDS_OFFSET,
        };

        if batch.compression() == 0 {
            let record_count = batch.record_count;

            frame.verify(fetched, span, |records| {
                walked(records, |encoded| walk_records(record_count, encoded))
            })?;
        } else {
            // compressed record data is opaque, taken to be as long as declared
            let opaque = span - RECORDS_OFFSET;
            frame.verify(fetched, span, |records| (records.len().min(opaque), Ok(())))?;
        }

        batch.record_data = encoded;
        Ok(batch)
    }
}

/// Read the complete record batches of fetched partition data.
///
/// A truncated final batch is dropped without error.
#[instrument(skip_all)]
pub fn read_record_batches(fetched: Bytes) -> Result<Vec<RecordBatch>, Partial<RecordBatch>> {
    read_framed(fetched)
}

fn to_timestamp(system_time: &SystemTime) -> Result<i64> {
    system_time
        .duration_since(UNIX_EPOCH)
        .map_err(|error| Error::Message(error.to_string()))
        .map(|since_epoch| since_epoch.as_millis())
        .and_then(|since_epoch| i64::try_from(since_epoch).map_err(Into::into))
}

/// Builds a batch whose length, crc, record count and last offset delta
/// are consistent with its records.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Builder {
    base_offset: i64,
    partition_leader_epoch: i32,
    attributes: i16,
    base_timestamp: i64,
    max_timestamp: i64,
    producer_id: i64,
    producer_epoch: i16,
    base_sequence: i32,
    records: Vec<super::Builder>,
}

impl Default for Builder {
    fn default() -> Self {
        let base_timestamp = to_timestamp(&SystemTime::now()).unwrap_or_default();

        Self {
            base_offset: 0,
            partition_leader_epoch: -1,
            attributes: 0,
            base_timestamp,
            max_timestamp: base_timestamp,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            records: Vec::new(),
        }
    }
}

impl Builder {
    #[must_use]
    pub fn base_offset(self, base_offset: i64) -> Self {
        Self {
            base_offset,
            ..self
        }
    }

    #[must_use]
    pub fn partition_leader_epoch(self, partition_leader_epoch: i32) -> Self {
        Self {
            partition_leader_epoch,
            ..self
        }
    }

    /// Attributes, where a non-zero compression codec marks the record
    /// data as already compressed.
    #[must_use]
    pub fn attributes(self, attributes: i16) -> Self {
        Self { attributes, ..self }
    }

    #[must_use]
    pub fn base_timestamp(self, base_timestamp: i64) -> Self {
        Self {
            base_timestamp,
            ..self
        }
    }

    #[must_use]
    pub fn max_timestamp(self, max_timestamp: i64) -> Self {
        Self {
            max_timestamp,
            ..self
        }
    }

    #[must_use]
    pub fn producer_id(self, producer_id: i64) -> Self {
        Self {
            producer_id,
            ..self
        }
    }

    #[must_use]
    pub fn producer_epoch(self, producer_epoch: i16) -> Self {
        Self {
            producer_epoch,
            ..self
        }
    }

    #[must_use]
    pub fn base_sequence(self, base_sequence: i32) -> Self {
        Self {
            base_sequence,
            ..self
        }
    }

    #[must_use]
    pub fn record(mut self, record: super::Builder) -> Self {
        self.records.push(record);
        self
    }

    pub fn build(self) -> Result<RecordBatch> {
        let records = self
            .records
            .into_iter()
            .map(Record::try_from)
            .collect::<Result<Vec<_>>>()?;

        let mut record_data = BytesMut::new();
        for record in &records {
            record.encode_into(&mut record_data)?;
        }

        let mut batch = RecordBatch {
            base_offset: self.base_offset,
            batch_length: i32::try_from(HEADER_AFTER_LENGTH + record_data.len())?,
            partition_leader_epoch: self.partition_leader_epoch,
            magic: 2,
            crc: 0,
            attributes: self.attributes,
            last_offset_delta: records
                .iter()
                .map(|record| record.offset_delta)
                .max()
                .unwrap_or_default(),
            base_timestamp: self.base_timestamp,
            max_timestamp: self.max_timestamp,
            producer_id: self.producer_id,
            producer_epoch: self.producer_epoch,
            base_sequence: self.base_sequence,
            record_count: i32::try_from(records.len())?,
            record_data: record_data.freeze(),
        };

        let encoded = batch.encode()?;
        batch.crc = CASTAGNOLI.checksum(&encoded[CRC_OFFSET..]);

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn batch() -> Result<RecordBatch> {
        RecordBatch::builder()
            .partition_leader_epoch(-1)
            .base_timestamp(1_707_058_170_165)
            .max_timestamp(1_707_058_170_165)
            .producer_id(1)
            .producer_epoch(0)
            .base_sequence(1)
            .record(Record::builder().value(Some(Bytes::from(vec![100, 101, 102]))))
            .build()
    }

    #[test]
    fn build() -> Result<()> {
        let batch = batch()?;

        assert_eq!(59, batch.batch_length);
        assert_eq!(1_126_819_645, batch.crc);
        assert_eq!(1, batch.record_count);
        assert_eq!(0, batch.last_offset_delta);

        Ok(())
    }

    #[test]
    fn encode() -> Result<()> {
        assert_eq!(
            vec![
                0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 59, 255, 255, 255, 255, 2, 67, 41, 231, 61, 0, 0,
                0, 0, 0, 0, 0, 0, 1, 141, 116, 152, 137, 53, 0, 0, 1, 141, 116, 152, 137, 53, 0, 0,
                0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 1, 18, 0, 0, 0, 1, 6, 100, 101, 102,
                0,
            ],
            batch()?.encode()?.to_vec()
        );

        Ok(())
    }

    #[test]
    fn decode() -> Result<()> {
        let batch = batch()?;
        let decoded = read_record_batches(batch.encode()?)?;

        assert_eq!(vec![batch], decoded);
        assert_eq!(
            Some(Bytes::from_static(&[100, 101, 102])),
            decoded[0].records()?[0].value()
        );

        Ok(())
    }

    #[test]
    fn compressed_records_are_opaque() -> Result<()> {
        let batch = RecordBatch::builder()
            .attributes(4)
            .record(Record::builder().value(Some(Bytes::from_static(b"zstd?"))))
            .build()?;

        assert_eq!(4, batch.compression());
        assert_eq!(Err(Error::UnsupportedCompression(4)), batch.records());

        let decoded = read_record_batches(batch.encode()?)?;
        assert_eq!(vec![batch], decoded);

        Ok(())
    }

    #[test]
    fn attributes() -> Result<()> {
        let batch = RecordBatch::builder().attributes(0b11_0000).build()?;
        assert!(batch.is_transactional());
        assert!(batch.is_control());
        assert_eq!(0, batch.compression());
        Ok(())
    }

    #[test]
    fn header_must_fit() {
        let mut encoded = BytesMut::new();
        encoded.put_i64(0);
        encoded.put_i32(10);
        encoded.put_bytes(0, 10);

        assert_eq!(Ok(vec![]), read_record_batches(encoded.freeze()));
    }
}
