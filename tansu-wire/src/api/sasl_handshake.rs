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

use super::Body;
use crate::{
    Result,
    primitive::{BufExt as _, BufMutExt as _},
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SaslHandshakeRequest {
    version: i16,
    pub mechanism: String,
}

impl SaslHandshakeRequest {
    pub fn mechanism(self, mechanism: impl Into<String>) -> Self {
        Self {
            mechanism: mechanism.into(),
            ..self
        }
    }
}

impl Body for SaslHandshakeRequest {
    fn put_body(&self, dst: &mut BytesMut, _version: i16, _flexible: bool) -> Result<()> {
        dst.put_string(&self.mechanism)
    }

    fn get_body(&mut self, src: &mut Bytes, _version: i16, _flexible: bool) -> Result<()> {
        src.try_get_string().map(|mechanism| {
            self.mechanism = mechanism;
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SaslHandshakeResponse {
    version: i16,
    pub error_code: i16,
    pub mechanisms: Vec<String>,
}

impl SaslHandshakeResponse {
    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn mechanisms(self, mechanisms: impl IntoIterator<Item = String>) -> Self {
        Self {
            mechanisms: mechanisms.into_iter().collect(),
            ..self
        }
    }
}

impl Body for SaslHandshakeResponse {
    fn put_body(&self, dst: &mut BytesMut, _version: i16, _flexible: bool) -> Result<()> {
        dst.put_i16(self.error_code);
        dst.put_array_len(self.mechanisms.len())?;

        self.mechanisms
            .iter()
            .try_for_each(|mechanism| dst.put_string(mechanism))
    }

    fn get_body(&mut self, src: &mut Bytes, _version: i16, _flexible: bool) -> Result<()> {
        self.error_code = src.try_get_i16()?;

        let length = src.try_get_array_len()?.unwrap_or_default();
        self.mechanisms = (0..length)
            .map(|_| src.try_get_string())
            .collect::<Result<Vec<_>>>()?;

        Ok(())
    }
}

super::message!(SaslHandshakeRequest, key: 17, name: "SaslHandshake", max: 1, flexible: None);
super::message!(SaslHandshakeResponse, key: 17, name: "SaslHandshake", max: 1, flexible: None);
super::pair!(SaslHandshakeRequest, SaslHandshakeResponse);
