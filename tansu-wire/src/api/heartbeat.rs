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
    GroupCoordinatorRequest, Result,
    primitive::{
        BufExt as _, BufMutExt as _,
        tagged::{put_empty_tags, skip_tags},
    },
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HeartbeatRequest {
    version: i16,
    pub group_id: String,
    pub generation_id: i32,
    pub member_id: String,
    pub group_instance_id: Option<String>,
}

impl HeartbeatRequest {
    pub fn group_id(self, group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            ..self
        }
    }

    pub fn generation_id(self, generation_id: i32) -> Self {
        Self {
            generation_id,
            ..self
        }
    }

    pub fn member_id(self, member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            ..self
        }
    }

    pub fn group_instance_id(self, group_instance_id: Option<String>) -> Self {
        Self {
            group_instance_id,
            ..self
        }
    }
}

impl Body for HeartbeatRequest {
    fn put_body(&self, dst: &mut BytesMut, version: i16, flexible: bool) -> Result<()> {
        dst.put_flex_string(flexible, &self.group_id)?;
        dst.put_i32(self.generation_id);
        dst.put_flex_string(flexible, &self.member_id)?;

        if version >= 3 {
            dst.put_flex_nullable_string(flexible, self.group_instance_id.as_deref())?;
        }

        if flexible {
            put_empty_tags(dst);
        }

        Ok(())
    }

    fn get_body(&mut self, src: &mut Bytes, version: i16, flexible: bool) -> Result<()> {
        self.group_id = src.try_get_flex_string(flexible)?;
        self.generation_id = src.try_get_i32()?;
        self.member_id = src.try_get_flex_string(flexible)?;

        if version >= 3 {
            self.group_instance_id = src.try_get_flex_nullable_string(flexible)?;
        }

        if flexible {
            skip_tags(src)?;
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HeartbeatResponse {
    version: i16,
    pub throttle_time_ms: i32,
    pub error_code: i16,
}

impl HeartbeatResponse {
    pub fn throttle_time_ms(self, throttle_time_ms: i32) -> Self {
        Self {
            throttle_time_ms,
            ..self
        }
    }

    pub fn error_code(self, error_code: i16) -> Self {
        Self { error_code, ..self }
    }
}

impl Body for HeartbeatResponse {
    fn put_body(&self, dst: &mut BytesMut, version: i16, flexible: bool) -> Result<()> {
        if version >= 1 {
            dst.put_i32(self.throttle_time_ms);
        }

        dst.put_i16(self.error_code);

        if flexible {
            put_empty_tags(dst);
        }

        Ok(())
    }

    fn get_body(&mut self, src: &mut Bytes, version: i16, flexible: bool) -> Result<()> {
        if version >= 1 {
            self.throttle_time_ms = src.try_get_i32()?;
        }

        self.error_code = src.try_get_i16()?;

        if flexible {
            skip_tags(src)?;
        }

        Ok(())
    }
}

super::message!(HeartbeatRequest, key: 12, name: "Heartbeat", max: 4, flexible: Some(4));
super::message!(HeartbeatResponse, key: 12, name: "Heartbeat", max: 4, flexible: Some(4));
super::pair!(HeartbeatRequest, HeartbeatResponse);

impl GroupCoordinatorRequest for HeartbeatRequest {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Message as _, Request as _};

    #[test]
    fn v4_request() -> Result<()> {
        let mut request = HeartbeatRequest::default()
            .group_id("abc")
            .generation_id(1)
            .member_id("m");
        request.set_version(4);

        let mut encoded = BytesMut::new();
        request.append_to(&mut encoded)?;
        assert_eq!(
            &[4, b'a', b'b', b'c', 0, 0, 0, 1, 2, b'm', 0, 0],
            &encoded[..]
        );

        let mut decoded = HeartbeatRequest::default();
        decoded.set_version(4);
        decoded.read_from(encoded.freeze())?;
        assert_eq!(request, decoded);

        Ok(())
    }

    #[test]
    fn v0_request() -> Result<()> {
        let request = HeartbeatRequest::default()
            .group_id("abc")
            .generation_id(1)
            .member_id("m")
            .group_instance_id(Some("not in v0".into()));

        let mut encoded = BytesMut::new();
        request.append_to(&mut encoded)?;
        assert_eq!(
            &[0, 3, b'a', b'b', b'c', 0, 0, 0, 1, 0, 1, b'm'],
            &encoded[..]
        );

        Ok(())
    }

    #[test]
    fn response_kind_has_the_same_version() {
        let mut request = HeartbeatRequest::default();
        request.set_version(2);
        assert_eq!(2, request.response_kind().version());
    }

    #[test]
    fn v1_response() -> Result<()> {
        let mut response = HeartbeatResponse::default();
        response.set_version(1);
        response.read_from(Bytes::from_static(&[0, 0, 0, 100, 0, 27]))?;

        assert_eq!(100, response.throttle_time_ms);
        assert_eq!(27, response.error_code);

        Ok(())
    }
}
