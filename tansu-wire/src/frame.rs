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

//! Request and response envelopes
//!
//! A request is framed as:
//!
//! ```text
//! [i32 length][i16 api key][i16 api version][i32 correlation id]
//!     [nullable string client id]{flexible: header tags}[body]
//! ```
//!
//! The client id is never compact, even in a flexible version. Controlled
//! shutdown version 0 has neither client id nor header tags.
//!
//! A response is framed as `[i32 length][i32 correlation id]{flexible:
//! header tags}[body]`. ApiVersions responses always use the non-flexible
//! header, as a client may not yet know which versions the broker supports.

use crate::{
    ApiKey as _, ApiVersionsRequest, ControlledShutdownRequest, Error, Message, RequestKind,
    Response, Result,
    primitive::{
        BufExt as _, BufMutExt as _,
        tagged::{put_empty_tags, skip_tags},
    },
};
use bytes::{Buf as _, BufMut as _, Bytes, BytesMut};
use std::time::SystemTime;
use tracing::{debug, instrument, warn};

const API_VERSIONS: i16 = ApiVersionsRequest::KEY;
const CONTROLLED_SHUTDOWN: i16 = ControlledShutdownRequest::KEY;

const INITIAL_PRINCIPAL_NAME: u32 = 0;
const INITIAL_CLIENT_ID: u32 = 1;

fn elapsed_millis(start: SystemTime) -> u64 {
    start
        .elapsed()
        .map_or(0, |duration| duration.as_millis() as u64)
}

fn has_legacy_header(api_key: i16, api_version: i16) -> bool {
    api_key == CONTROLLED_SHUTDOWN && api_version == 0
}

fn has_flexible_response_header(response: &(impl Message + ?Sized)) -> bool {
    response.is_flexible() && response.key() != API_VERSIONS
}

/// Frames requests with a fixed client id and, optionally, the principal
/// and client id of a request that has been redirected by a broker
/// (KIP-590).
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestFormatter {
    client_id: Option<String>,
    initial: Option<(String, String)>,
}

impl RequestFormatter {
    #[must_use]
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn initial_id(&self) -> Option<(&str, &str)> {
        self.initial
            .as_ref()
            .map(|(principal_name, client_id)| (principal_name.as_str(), client_id.as_str()))
    }

    /// Append a request frame to `dst`, which may already contain earlier
    /// frames.
    #[instrument(skip_all)]
    pub fn append_request(
        &self,
        dst: &mut BytesMut,
        request: &(impl Message + ?Sized),
        correlation_id: i32,
    ) -> Result<()> {
        let start = SystemTime::now();
        let position = dst.len();

        self.put_request(dst, request, correlation_id)
            .and_then(|()| patch_length(dst, position))
            .inspect(|length| {
                debug!(
                    api_key = request.key(),
                    api_version = request.version(),
                    correlation_id,
                    length,
                    elapsed_millis = elapsed_millis(start)
                )
            })
            .inspect_err(|err| warn!(?err, api_key = request.key(), correlation_id))
            .map(|_| ())
            .map_err(|err| {
                dst.truncate(position);
                err
            })
    }

    /// A request frame in a buffer of its own.
    pub fn request(&self, request: &(impl Message + ?Sized), correlation_id: i32) -> Result<Bytes> {
        let mut encoded = BytesMut::new();
        self.append_request(&mut encoded, request, correlation_id)
            .map(|()| encoded.freeze())
    }

    fn put_request(
        &self,
        dst: &mut BytesMut,
        request: &(impl Message + ?Sized),
        correlation_id: i32,
    ) -> Result<()> {
        dst.put_i32(0);
        dst.put_i16(request.key());
        dst.put_i16(request.version());
        dst.put_i32(correlation_id);

        if !has_legacy_header(request.key(), request.version()) {
            dst.put_nullable_string(self.client_id.as_deref())?;

            if request.is_flexible() {
                self.put_header_tags(dst)?;
            }
        }

        request.append_to(dst)
    }

    fn put_header_tags(&self, dst: &mut BytesMut) -> Result<()> {
        let Some((principal_name, client_id)) = &self.initial else {
            put_empty_tags(dst);
            return Ok(());
        };

        dst.put_uvarint(2);
        dst.put_uvarint(INITIAL_PRINCIPAL_NAME);
        dst.put_compact_string(principal_name)?;
        dst.put_uvarint(INITIAL_CLIENT_ID);
        dst.put_compact_string(client_id)
    }
}

#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Builder {
    client_id: Option<String>,
    initial: Option<(String, String)>,
}

impl Builder {
    #[must_use]
    pub fn client_id(self, client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..self
        }
    }

    /// The principal name and client id of the request being redirected.
    #[must_use]
    pub fn initial_id(
        self,
        principal_name: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            initial: Some((principal_name.into(), client_id.into())),
            ..self
        }
    }

    pub fn build(self) -> RequestFormatter {
        RequestFormatter {
            client_id: self.client_id,
            initial: self.initial,
        }
    }
}

fn patch_length(dst: &mut BytesMut, position: usize) -> Result<i32> {
    let length = i32::try_from(dst.len() - position - 4)?;
    dst[position..position + 4].copy_from_slice(&length.to_be_bytes());
    Ok(length)
}

fn frame_contents(mut frame: Bytes) -> Result<Bytes> {
    let encoded = frame.try_get_i32()?;

    if usize::try_from(encoded).is_ok_and(|length| length == frame.remaining()) {
        Ok(frame)
    } else {
        warn!(encoded, read = frame.remaining());

        Err(Error::EncodedLengthMismatch {
            encoded,
            read: frame.remaining(),
        })
    }
}

/// The request header as read by a broker.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RequestHeader {
    pub api_key: i16,
    pub api_version: i16,
    pub correlation_id: i32,
    pub client_id: Option<String>,
    pub initial_principal_name: Option<String>,
    pub initial_client_id: Option<String>,
}

/// The redirect pair is written as `[tag][compact string]`, any other
/// header tag as `[tag][size][data]`.
fn get_header_tags(encoded: &mut Bytes, header: &mut RequestHeader) -> Result<()> {
    let count = encoded.try_get_uvarint()?;

    for _ in 0..count {
        match encoded.try_get_uvarint()? {
            INITIAL_PRINCIPAL_NAME => {
                header.initial_principal_name = encoded.try_get_compact_string().map(Some)?
            }

            INITIAL_CLIENT_ID => {
                header.initial_client_id = encoded.try_get_compact_string().map(Some)?
            }

            tag => {
                let size = encoded.try_get_uvarint().map(usize::try_from)??;
                debug!(tag, size);

                _ = encoded.try_get_span(size)?;
            }
        }
    }

    Ok(())
}

/// Read a request frame produced by [`RequestFormatter::append_request`].
#[instrument(skip_all)]
pub fn read_request(frame: Bytes) -> Result<(RequestHeader, RequestKind)> {
    let start = SystemTime::now();
    let mut encoded = frame_contents(frame)?;

    let mut header = RequestHeader {
        api_key: encoded.try_get_i16()?,
        api_version: encoded.try_get_i16()?,
        correlation_id: encoded.try_get_i32()?,
        ..Default::default()
    };

    let mut request = RequestKind::for_key(header.api_key)?;
    request.set_version(header.api_version);

    if !has_legacy_header(header.api_key, header.api_version) {
        header.client_id = encoded.try_get_nullable_string()?;

        if request.is_flexible() {
            get_header_tags(&mut encoded, &mut header)?;
        }
    }

    request.read_from(encoded).map(|()| {
        debug!(?header, elapsed_millis = elapsed_millis(start));
        (header, request)
    })
}

/// Append a response frame to `dst`.
#[instrument(skip_all)]
pub fn append_response(
    dst: &mut BytesMut,
    response: &(impl Message + ?Sized),
    correlation_id: i32,
) -> Result<()> {
    let start = SystemTime::now();
    let position = dst.len();

    dst.put_i32(0);
    dst.put_i32(correlation_id);

    if has_flexible_response_header(response) {
        put_empty_tags(dst);
    }

    response
        .append_to(dst)
        .and_then(|()| patch_length(dst, position))
        .inspect(|length| debug!(length, elapsed_millis = elapsed_millis(start)))
        .map(|_| ())
        .map_err(|err| {
            dst.truncate(position);
            err
        })
}

/// A response frame in a buffer of its own.
pub fn response(response: &(impl Message + ?Sized), correlation_id: i32) -> Result<Bytes> {
    let mut encoded = BytesMut::new();
    append_response(&mut encoded, response, correlation_id).map(|()| encoded.freeze())
}

/// Read a response frame, returning its correlation id and body.
#[instrument(skip_all)]
pub fn read_response<R: Response>(frame: Bytes, api_version: i16) -> Result<(i32, R)> {
    let mut encoded = frame_contents(frame)?;
    let correlation_id = encoded.try_get_i32()?;

    let mut response = R::default();
    response.set_version(api_version);

    if has_flexible_response_header(&response) {
        skip_tags(&mut encoded)?;
    }

    response
        .read_from(encoded)
        .map(|()| (correlation_id, response))
}
