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
    primitive::{
        BufExt as _, BufMutExt as _,
        tagged::{put_empty_tags, skip_tags},
    },
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ApiVersionsRequest {
    version: i16,
    pub client_software_name: String,
    pub client_software_version: String,
}

impl ApiVersionsRequest {
    pub fn client_software_name(self, client_software_name: impl Into<String>) -> Self {
        Self {
            client_software_name: client_software_name.into(),
            ..self
        }
    }

    pub fn client_software_version(self, client_software_version: impl Into<String>) -> Self {
        Self {
            client_software_version: client_software_version.into(),
            ..self
        }
    }
}

impl Body for ApiVersionsRequest {
    fn put_body(&self, dst: &mut BytesMut, version: i16, flexible: bool) -> Result<()> {
        if version >= 3 {
            dst.put_compact_string(&self.client_software_name)?;
            dst.put_compact_string(&self.client_software_version)?;
        }

        if flexible {
            put_empty_tags(dst);
        }

        Ok(())
    }

    fn get_body(&mut self, src: &mut Bytes, version: i16, flexible: bool) -> Result<()> {
        if version >= 3 {
            self.client_software_name = src.try_get_compact_string()?;
            self.client_software_version = src.try_get_compact_string()?;
        }

        if flexible {
            skip_tags(src)?;
        }

        Ok(())
    }
}

/// A supported version range of one API key.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ApiVersion {
    pub api_key: i16,
    pub min_version: i16,
    pub max_version: i16,
}

impl ApiVersion {
    pub fn api_key(self, api_key: i16) -> Self {
        Self { api_key, ..self }
    }

    pub fn min_version(self, min_version: i16) -> Self {
        Self {
            min_version,
            ..self
        }
    }

    pub fn max_version(self, max_version: i16) -> Self {
        Self {
            max_version,
            ..self
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct ApiVersionsResponse {
    version: i16,
    pub error_code: i16,
    pub api_keys: Vec<ApiVersion>,
    pub throttle_time_ms: i32,
}

impl ApiVersionsResponse {
    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }

    pub fn api_keys(self, api_keys: impl IntoIterator<Item = ApiVersion>) -> Self {
        Self {
            api_keys: api_keys.into_iter().collect(),
            ..self
        }
    }

    pub fn throttle_time_ms(self, throttle_time_ms: i32) -> Self {
        Self {
            throttle_time_ms,
            ..self
        }
    }
}

impl Body for ApiVersionsResponse {
    fn put_body(&self, dst: &mut BytesMut, version: i16, flexible: bool) -> Result<()> {
        dst.put_i16(self.error_code);

        dst.put_flex_array_len(flexible, self.api_keys.len())?;
        for api_key in &self.api_keys {
            dst.put_i16(api_key.api_key);
            dst.put_i16(api_key.min_version);
            dst.put_i16(api_key.max_version);

            if flexible {
                put_empty_tags(dst);
            }
        }

        if version >= 1 {
            dst.put_i32(self.throttle_time_ms);
        }

        if flexible {
            put_empty_tags(dst);
        }

        Ok(())
    }

    fn get_body(&mut self, src: &mut Bytes, version: i16, flexible: bool) -> Result<()> {
        self.error_code = src.try_get_i16()?;

        let length = src.try_get_flex_array_len(flexible)?.unwrap_or_default();
        self.api_keys = (0..length)
            .map(|_| {
                let api_version = ApiVersion {
                    api_key: src.try_get_i16()?,
                    min_version: src.try_get_i16()?,
                    max_version: src.try_get_i16()?,
                };

                if flexible {
                    skip_tags(src)?;
                }

                Ok(api_version)
            })
            .collect::<Result<Vec<_>>>()?;

        if version >= 1 {
            self.throttle_time_ms = src.try_get_i32()?;
        }

        if flexible {
            skip_tags(src)?;
        }

        Ok(())
    }
}

super::message!(ApiVersionsRequest, key: 18, name: "ApiVersions", max: 3, flexible: Some(3));
super::message!(ApiVersionsResponse, key: 18, name: "ApiVersions", max: 3, flexible: Some(3));
super::pair!(ApiVersionsRequest, ApiVersionsResponse);
