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

//! Sticky assignor user data
//!
//! The newer layout appends the generation to the assignments, so the
//! presence of trailing bytes is the only version marker:
//!
//! ```text
//! [assignments: [topic: string][partitions: [i32]]] [generation: i32]?
//! ```

use crate::{
    Decode, Encode, Error, Result,
    primitive::{BufExt as _, BufMutExt as _},
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Default, Deserialize, Eq, Hash, Debug, Ord, PartialEq, PartialOrd, Serialize)]
pub struct StickyAssignment {
    pub topic: String,
    pub partitions: Vec<i32>,
}

impl StickyAssignment {
    pub fn topic(self, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..self
        }
    }

    pub fn partitions(self, partitions: impl IntoIterator<Item = i32>) -> Self {
        Self {
            partitions: partitions.into_iter().collect(),
            ..self
        }
    }
}

#[derive(Clone, Deserialize, Eq, Hash, Debug, Ord, PartialEq, PartialOrd, Serialize)]
pub struct StickyMemberMetadata {
    pub current_assignment: Vec<StickyAssignment>,
    pub generation: i32,
}

impl Default for StickyMemberMetadata {
    fn default() -> Self {
        Self {
            current_assignment: Vec::new(),
            generation: Self::NO_GENERATION,
        }
    }
}

impl StickyMemberMetadata {
    /// The generation of metadata written before generations were tracked.
    pub const NO_GENERATION: i32 = -1;

    pub fn current_assignment(
        self,
        current_assignment: impl IntoIterator<Item = StickyAssignment>,
    ) -> Self {
        Self {
            current_assignment: current_assignment.into_iter().collect(),
            ..self
        }
    }

    pub fn generation(self, generation: i32) -> Self {
        Self { generation, ..self }
    }

    pub fn has_generation(&self) -> bool {
        self.generation != Self::NO_GENERATION
    }
}

impl Encode for StickyAssignment {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_string(&self.topic)?;
        dst.put_array_len(self.partitions.len())?;

        for partition in &self.partitions {
            dst.put_i32(*partition);
        }

        Ok(())
    }
}

impl Decode for StickyAssignment {
    fn decode(encoded: &mut Bytes) -> Result<Self> {
        let topic = encoded.try_get_string()?;

        let length = encoded.try_get_array_len()?.unwrap_or_default();
        let partitions = (0..length)
            .map(|_| encoded.try_get_i32().map_err(Into::into))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { topic, partitions })
    }
}

impl Encode for StickyMemberMetadata {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_array_len(self.current_assignment.len())?;

        self.current_assignment
            .iter()
            .try_for_each(|assignment| assignment.encode_into(dst))?;

        if self.has_generation() {
            dst.put_i32(self.generation);
        }

        Ok(())
    }
}

impl Decode for StickyMemberMetadata {
    fn decode(encoded: &mut Bytes) -> Result<Self> {
        let length = encoded.try_get_array_len()?.unwrap_or_default();
        let current_assignment = (0..length)
            .map(|_| StickyAssignment::decode(encoded))
            .collect::<Result<Vec<_>>>()?;

        let generation = if encoded.has_remaining() {
            encoded.try_get_i32()?
        } else {
            debug!(assignments = current_assignment.len(), "no generation");
            Self::NO_GENERATION
        };

        Ok(Self {
            current_assignment,
            generation,
        })
    }
}

impl TryFrom<Bytes> for StickyMemberMetadata {
    type Error = Error;

    fn try_from(mut value: Bytes) -> Result<Self, Self::Error> {
        Self::decode(&mut value).and_then(|metadata| {
            if value.has_remaining() {
                Err(Error::TrailingBytes(value.remaining()))
            } else {
                Ok(metadata)
            }
        })
    }
}

impl TryFrom<&StickyMemberMetadata> for Bytes {
    type Error = Error;

    fn try_from(value: &StickyMemberMetadata) -> Result<Self, Self::Error> {
        value.encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn assignment() -> StickyAssignment {
        StickyAssignment::default()
            .topic("abc")
            .partitions([0, 2])
    }

    #[test]
    fn without_generation() -> Result<()> {
        let metadata = StickyMemberMetadata::default().current_assignment([assignment()]);

        let encoded = Bytes::try_from(&metadata)?;
        assert_eq!(
            &[
                0, 0, 0, 1, 0, 3, b'a', b'b', b'c', 0, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 2
            ],
            &encoded[..]
        );

        let decoded = StickyMemberMetadata::try_from(encoded)?;
        assert_eq!(StickyMemberMetadata::NO_GENERATION, decoded.generation);
        assert_eq!(metadata, decoded);

        Ok(())
    }

    #[test]
    fn with_generation() -> Result<()> {
        let metadata = StickyMemberMetadata::default()
            .current_assignment([assignment()])
            .generation(5);

        let encoded = Bytes::try_from(&metadata)?;
        assert_eq!(&[0, 0, 0, 5], &encoded[encoded.len() - 4..]);
        assert_eq!(metadata, StickyMemberMetadata::try_from(encoded)?);

        Ok(())
    }

    #[test]
    fn trailing_bytes() {
        assert_eq!(
            Err(Error::TrailingBytes(2)),
            StickyMemberMetadata::try_from(Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0, 7, 1, 2]))
        );
    }

    #[test]
    fn partial_generation() {
        assert!(matches!(
            StickyMemberMetadata::try_from(Bytes::from_static(&[0, 0, 0, 0, 0, 7])),
            Err(Error::NotEnoughData { .. })
        ));
    }
}
