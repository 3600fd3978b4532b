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

use crate::{
    Decode, Encode, Error, Result,
    primitive::{BufExt as _, BufMutExt as _},
};
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

/// A record header: a non-null key with an optional value.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Header {
    pub key: Bytes,
    pub value: Option<Bytes>,
}

impl Header {
    pub fn builder() -> Builder {
        Builder::default()
    }
}

impl Encode for Header {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()> {
        dst.put_varint_bytes(Some(&self.key[..]))?;
        dst.put_varint_bytes(self.value.as_deref())
    }
}

impl Decode for Header {
    fn decode(encoded: &mut Bytes) -> Result<Self> {
        let key = encoded
            .try_get_varint_bytes()?
            .ok_or(Error::InvalidLength(-1))?;
        let value = encoded.try_get_varint_bytes()?;

        Ok(Self { key, value })
    }
}

impl From<Builder> for Header {
    fn from(value: Builder) -> Self {
        value.build()
    }
}

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Builder {
    key: Bytes,
    value: Option<Bytes>,
}

impl Builder {
    #[must_use]
    pub fn key(self, key: Bytes) -> Self {
        Self { key, ..self }
    }

    #[must_use]
    pub fn value(self, value: Bytes) -> Self {
        Self {
            value: Some(value),
            ..self
        }
    }

    #[must_use]
    pub fn build(self) -> Header {
        Header {
            key: self.key,
            value: self.value,
        }
    }
}

impl From<Header> for Builder {
    fn from(value: Header) -> Self {
        Self {
            key: value.key,
            value: value.value,
        }
    }
}
