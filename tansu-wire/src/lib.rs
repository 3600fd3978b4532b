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
//! The Kafka wire protocol engine, performing no I/O (it operates only on bytes)
//!
//! ## Design
//!
//! Every Kafka API message is versioned. From the version a message is sent
//! with follows whether it is "flexible" ([KIP-482]): flexible versions use
//! compact strings and arrays, and end each structure with a tagged field
//! section that older readers skip.
//!
//! Some useful starting points:
//!
//! - **Message contract** - [`Message`], [`Request`], [`Response`], [`RequestKind`] and [`ResponseKind`].
//! - **Framing** - [`RequestFormatter`], [`read_request`], [`append_response`] and [`read_response`].
//! - **Fetched data** - [`record::read_record_batches`], [`record::read_v1_messages`] and [`record::read_v0_messages`].
//! - **Group assignment state** - [`consumer::StickyMemberMetadata`].
//! - **Response error codes** - [`ErrorCode`] and [`is_retriable`].
//!
//! ## Examples
//!
//! Framing a [`HeartbeatRequest`]:
//!
//! ```
//! # use tansu_wire::Error;
//! # fn main() -> Result<(), Error> {
//! use tansu_wire::{HeartbeatRequest, Message as _, RequestFormatter};
//!
//! let formatter = RequestFormatter::builder().client_id("console-consumer").build();
//!
//! let mut heartbeat = HeartbeatRequest::default()
//!     .group_id("test-consumer-group")
//!     .generation_id(3)
//!     .member_id("console-consumer-1");
//! heartbeat.set_version(4);
//!
//! let encoded = formatter.request(&heartbeat, 12321)?;
//!
//! assert_eq!(&encoded[..4], &(encoded.len() as i32 - 4).to_be_bytes());
//! # Ok(())
//! # }
//! ```
//!
//! Reading the record batches of a fetched partition:
//!
//! ```
//! # use tansu_wire::Error;
//! # fn main() -> Result<(), Error> {
//! use bytes::{Bytes, BytesMut};
//! use tansu_wire::{
//!     Encode as _,
//!     record::{Record, RecordBatch, read_record_batches},
//! };
//!
//! let batch = RecordBatch::builder()
//!     .base_offset(6)
//!     .record(Record::builder().value(Some(Bytes::from_static(b"hello world!"))))
//!     .build()?;
//!
//! let fetched = batch.encode()?;
//!
//! let batches = read_record_batches(fetched)?;
//! assert_eq!(1, batches.len());
//! assert_eq!(6, batches[0].base_offset);
//! # Ok(())
//! # }
//! ```
//!
//! [KIP-482]: https://cwiki.apache.org/confluence/display/KAFKA/KIP-482%3A+The+Kafka+Protocol+should+Support+Optional+Tagged+Fields

pub mod api;
pub mod consumer;
mod error_code;
pub mod frame;
pub mod primitive;
pub mod record;

use bytes::{Bytes, BytesMut, TryGetError};
use std::{
    fmt::{self, Debug, Display, Formatter},
    num, result, string,
};

pub use api::{
    ApiVersionsRequest, ApiVersionsResponse, ControlledShutdownRequest,
    ControlledShutdownResponse, HeartbeatRequest, HeartbeatResponse, RequestKind, ResponseKind,
    SaslHandshakeRequest, SaslHandshakeResponse,
};
pub use error_code::{ErrorCode, is_retriable};
pub use frame::{
    RequestFormatter, RequestHeader, append_response, read_request, read_response, response,
};

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    Api(ErrorCode),
    EncodedCrcMismatch { encoded: u32, computed: u32 },
    EncodedLengthMismatch { encoded: i32, read: usize },
    FromUtf8(#[from] string::FromUtf8Error),
    InvalidLength(i32),
    Message(String),
    NotEnoughData { requested: usize, available: usize },
    TrailingBytes(usize),
    TryFromInt(#[from] num::TryFromIntError),
    UnknownApiErrorCode(i16),
    UnknownApiKey(i16),
    UnsupportedCompression(i16),
    VarIntOverflow,
}

pub type Result<T, E = Error> = result::Result<T, E>;

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message(e) => f.write_str(e),
            Error::Api(error_code) => write!(f, "{}: {error_code}", error_code.name()),
            e => write!(f, "{e:?}"),
        }
    }
}

impl From<TryGetError> for Error {
    fn from(value: TryGetError) -> Self {
        Self::NotEnoughData {
            requested: value.requested,
            available: value.available,
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(value: ErrorCode) -> Self {
        Self::Api(value)
    }
}

pub trait ApiKey {
    const KEY: i16;
}

pub trait ApiName {
    const NAME: &'static str;
}

/// The capabilities shared by every Kafka API request and response.
///
/// The version must be set before a message is appended or read, and must
/// not exceed [`Message::max_version`].
pub trait Message: Debug + Send + Sync {
    /// The protocol key of this message kind.
    fn key(&self) -> i16;

    /// The maximum protocol version supported by this message kind.
    fn max_version(&self) -> i16;

    /// The version currently selected for this message.
    fn version(&self) -> i16;

    fn set_version(&mut self, version: i16);

    /// Whether the selected version is flexible as per KIP-482.
    fn is_flexible(&self) -> bool;

    /// Append this message body in wire form to `dst`.
    fn append_to(&self, dst: &mut BytesMut) -> Result<()>;

    /// Read a message body of the selected version from `src`.
    fn read_from(&mut self, src: Bytes) -> Result<()>;
}

/// All Kafka API requests implement this trait
pub trait Request: Message + Default {
    type Response: Response<Request = Self>;

    /// An empty response of the same version as this request.
    fn response_kind(&self) -> Self::Response {
        let mut response = Self::Response::default();
        response.set_version(self.version());
        response
    }
}

/// A request that must be sent to the controller.
pub trait AdminRequest: Request {}

/// A request that must be sent to the coordinator of its group.
pub trait GroupCoordinatorRequest: Request {}

/// All Kafka API responses implement this trait
pub trait Response: Message + Default {
    type Request: Request<Response = Self>;

    /// An empty request of the same version as this response.
    fn request_kind(&self) -> Self::Request {
        let mut request = Self::Request::default();
        request.set_version(self.version());
        request
    }
}

pub trait Encode {
    fn encode_into(&self, dst: &mut BytesMut) -> Result<()>;

    fn encode(&self) -> Result<Bytes> {
        let mut encoded = BytesMut::new();
        self.encode_into(&mut encoded).map(|()| encoded.freeze())
    }
}

pub trait Decode: Sized {
    fn decode(encoded: &mut Bytes) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Buf as _;

    #[test]
    fn try_get_error_is_not_enough_data() {
        let mut encoded = Bytes::from_static(&[0, 1]);

        assert_eq!(
            Err(Error::NotEnoughData {
                requested: 4,
                available: 2
            }),
            encoded.try_get_i32().map_err(Error::from)
        );
    }

    #[test]
    fn display() {
        assert_eq!("oops", Error::Message("oops".into()).to_string());
        assert_eq!(
            "REQUEST_TIMED_OUT: The request timed out.",
            Error::Api(ErrorCode::RequestTimedOut).to_string()
        );
    }
}
