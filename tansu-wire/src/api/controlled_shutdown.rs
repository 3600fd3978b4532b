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

//! Controlled shutdown
//!
//! Version 0 of the request predates the client id in the request header,
//! see [`RequestFormatter`](crate::RequestFormatter).

use super::Body;
use crate::{
    AdminRequest, Result,
    primitive::{
        BufExt as _, BufMutExt as _,
        tagged::{put_empty_tags, skip_tags},
    },
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ControlledShutdownRequest {
    version: i16,
    pub broker_id: i32,
    pub broker_epoch: i64,
}

impl Default for ControlledShutdownRequest {
    fn default() -> Self {
        Self {
            version: 0,
            broker_id: 0,
            broker_epoch: Self::NO_BROKER_EPOCH,
        }
    }
}

impl ControlledShutdownRequest {
    /// The broker epoch of a broker that predates epochs (KIP-380).
    pub const NO_BROKER_EPOCH: i64 = -1;

    pub fn broker_id(self, broker_id: i32) -> Self {
        Self { broker_id, ..self }
    }

    pub fn broker_epoch(self, broker_epoch: i64) -> Self {
        Self {
            broker_epoch,
            ..self
        }
    }
}

impl Body for ControlledShutdownRequest {
    fn put_body(&self, dst: &mut BytesMut, version: i16, flexible: bool) -> Result<()> {
        dst.put_i32(self.broker_id);

        if version >= 2 {
            dst.put_i64(self.broker_epoch);
        }

        if flexible {
            put_empty_tags(dst);
        }

        Ok(())
    }

    fn get_body(&mut self, src: &mut Bytes, version: i16, flexible: bool) -> Result<()> {
        self.broker_id = src.try_get_i32()?;

        if version >= 2 {
            self.broker_epoch = src.try_get_i64()?;
        }

        if flexible {
            skip_tags(src)?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct RemainingPartition {
    pub topic_name: String,
    pub partition_index: i32,
}

impl RemainingPartition {
    pub fn topic_name(self, topic_name: impl Into<String>) -> Self {
        Self {
            topic_name: topic_name.into(),
            ..self
        }
    }

    pub fn partition_index(self, partition_index: i32) -> Self {
        Self {
            partition_index,
            ..self
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ControlledShutdownResponse {
    version: i16,
    pub error_code: i16,
    pub remaining_partitions: Vec<RemainingPartition>,
}

impl ControlledShutdownResponse {
    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn remaining_partitions(
        self,
        remaining_partitions: impl IntoIterator<Item = RemainingPartition>,
    ) -> Self {
        Self {
            remaining_partitions: remaining_partitions.into_iter().collect(),
            ..self
        }
    }
}

impl Body for ControlledShutdownResponse {
    fn put_body(&self, dst: &mut BytesMut, _version: i16, flexible: bool) -> Result<()> {
        dst.put_i16(self.error_code);

        dst.put_flex_array_len(flexible, self.remaining_partitions.len())?;
        for partition in &self.remaining_partitions {
            dst.put_flex_string(flexible, &partition.topic_name)?;
            dst.put_i32(partition.partition_index);

            if flexible {
                put_empty_tags(dst);
            }
        }

        if flexible {
            put_empty_tags(dst);
        }

        Ok(())
    }

    fn get_body(&mut self, src: &mut Bytes, _version: i16, flexible: bool) -> Result<()> {
        self.error_code = src.try_get_i16()?;

        let length = src.try_get_flex_array_len(flexible)?.unwrap_or_default();
        self.remaining_partitions = (0..length)
            .map(|_| {
                let partition = RemainingPartition {
                    topic_name: src.try_get_flex_string(flexible)?,
                    partition_index: src.try_get_i32()?,
                };

                if flexible {
                    skip_tags(src)?;
                }

                Ok(partition)
            })
            .collect::<Result<Vec<_>>>()?;

        if flexible {
            skip_tags(src)?;
        }

        Ok(())
    }
}

super::message!(ControlledShutdownRequest, key: 7, name: "ControlledShutdown", max: 3, flexible: Some(3));
super::message!(ControlledShutdownResponse, key: 7, name: "ControlledShutdown", max: 3, flexible: Some(3));
super::pair!(ControlledShutdownRequest, ControlledShutdownResponse);

impl AdminRequest for ControlledShutdownRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Message as _;
    use pretty_assertions::assert_eq;

    #[test]
    fn v2_request() -> Result<()> {
        let mut request = ControlledShutdownRequest::default()
            .broker_id(1001)
            .broker_epoch(5);
        request.set_version(2);

        let mut encoded = BytesMut::new();
        request.append_to(&mut encoded)?;
        assert_eq!(
            &[0, 0, 3, 233, 0, 0, 0, 0, 0, 0, 0, 5],
            &encoded[..]
        );

        Ok(())
    }

    #[test]
    fn v2_request_without_epoch() -> Result<()> {
        let mut request = ControlledShutdownRequest::default().broker_id(1001);
        request.set_version(2);

        let mut encoded = BytesMut::new();
        request.append_to(&mut encoded)?;
        assert_eq!(&[255; 8], &encoded[4..]);

        let mut decoded = ControlledShutdownRequest::default();
        decoded.set_version(2);
        decoded.read_from(encoded.freeze())?;
        assert_eq!(request, decoded);
        assert_eq!(ControlledShutdownRequest::NO_BROKER_EPOCH, decoded.broker_epoch);

        Ok(())
    }

    #[test]
    fn v3_response() -> Result<()> {
        let mut response = ControlledShutdownResponse::default().remaining_partitions([
            RemainingPartition::default()
                .topic_name("abc")
                .partition_index(2),
        ]);
        response.set_version(3);

        let mut encoded = BytesMut::new();
        response.append_to(&mut encoded)?;
        assert_eq!(
            &[0, 0, 2, 4, b'a', b'b', b'c', 0, 0, 0, 2, 0, 0],
            &encoded[..]
        );

        let mut decoded = ControlledShutdownResponse::default();
        decoded.set_version(3);
        decoded.read_from(encoded.freeze())?;
        assert_eq!(response, decoded);

        Ok(())
    }
}
