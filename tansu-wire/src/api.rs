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

//! Kafka API message kinds
//!
//! Each kind is a plain struct implementing [`Message`] together with its
//! paired counterpart. [`RequestKind`] and [`ResponseKind`] close over the
//! kinds supported by this crate.

mod api_versions;
mod controlled_shutdown;
mod heartbeat;
mod sasl_handshake;

use crate::{ApiKey, Error, Message, Request, Response, Result};
use bytes::{Buf as _, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use api_versions::{ApiVersion, ApiVersionsRequest, ApiVersionsResponse};
pub use controlled_shutdown::{
    ControlledShutdownRequest, ControlledShutdownResponse, RemainingPartition,
};
pub use heartbeat::{HeartbeatRequest, HeartbeatResponse};
pub use sasl_handshake::{SaslHandshakeRequest, SaslHandshakeResponse};

/// The wire layout of a message body at a given version.
pub(crate) trait Body {
    fn put_body(&self, dst: &mut BytesMut, version: i16, flexible: bool) -> Result<()>;

    fn get_body(&mut self, src: &mut Bytes, version: i16, flexible: bool) -> Result<()>;
}

/// Implement [`Message`], [`ApiKey`] and [`ApiName`](crate::ApiName) for a
/// kind with a `version` field and a [`Body`].
macro_rules! message {
    ($kind:ident, key: $key:literal, name: $name:literal, max: $max:literal, flexible: $flexible:expr) => {
        impl $crate::ApiKey for $kind {
            const KEY: i16 = $key;
        }

        impl $crate::ApiName for $kind {
            const NAME: &'static str = $name;
        }

        impl $crate::Message for $kind {
            fn key(&self) -> i16 {
                <Self as $crate::ApiKey>::KEY
            }

            fn max_version(&self) -> i16 {
                $max
            }

            fn version(&self) -> i16 {
                self.version
            }

            fn set_version(&mut self, version: i16) {
                self.version = version;
            }

            fn is_flexible(&self) -> bool {
                let flexible: Option<i16> = $flexible;
                flexible.is_some_and(|flexible| self.version >= flexible)
            }

            fn append_to(&self, dst: &mut ::bytes::BytesMut) -> $crate::Result<()> {
                $crate::api::Body::put_body(self, dst, self.version, self.is_flexible())
            }

            fn read_from(&mut self, src: ::bytes::Bytes) -> $crate::Result<()> {
                let (version, flexible) = (self.version, self.is_flexible());
                $crate::api::read_body(self, src, version, flexible)
            }
        }
    };
}

/// Pair a request kind with its response kind.
macro_rules! pair {
    ($request:ident, $response:ident) => {
        impl $crate::Request for $request {
            type Response = $response;
        }

        impl $crate::Response for $response {
            type Request = $request;
        }
    };
}

pub(crate) use message;
pub(crate) use pair;

pub(crate) fn read_body(
    body: &mut impl Body,
    mut src: Bytes,
    version: i16,
    flexible: bool,
) -> Result<()> {
    body.get_body(&mut src, version, flexible)?;

    if src.has_remaining() {
        debug!(version, flexible, remaining = src.remaining());
        Err(Error::TrailingBytes(src.remaining()))
    } else {
        Ok(())
    }
}

macro_rules! kinds {
    ($($variant:ident($request:ident, $response:ident)),+ $(,)?) => {
        /// The request kinds supported by this crate.
        #[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
        pub enum RequestKind {
            $($variant($request),)+
        }

        /// The response kinds supported by this crate.
        #[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
        pub enum ResponseKind {
            $($variant($response),)+
        }

        impl RequestKind {
            /// A default request of the kind identified by `api_key`.
            pub fn for_key(api_key: i16) -> Result<Self> {
                match api_key {
                    $(<$request as ApiKey>::KEY => Ok(Self::$variant($request::default())),)+
                    otherwise => Err(Error::UnknownApiKey(otherwise)),
                }
            }

            /// An empty response paired with this request, of the same version.
            pub fn response_kind(&self) -> ResponseKind {
                match self {
                    $(Self::$variant(inner) => ResponseKind::$variant(inner.response_kind()),)+
                }
            }

            fn inner(&self) -> &dyn Message {
                match self {
                    $(Self::$variant(inner) => inner,)+
                }
            }

            fn inner_mut(&mut self) -> &mut dyn Message {
                match self {
                    $(Self::$variant(inner) => inner,)+
                }
            }
        }

        impl ResponseKind {
            /// A default response of the kind identified by `api_key`.
            pub fn for_key(api_key: i16) -> Result<Self> {
                match api_key {
                    $(<$response as ApiKey>::KEY => Ok(Self::$variant($response::default())),)+
                    otherwise => Err(Error::UnknownApiKey(otherwise)),
                }
            }

            /// An empty request paired with this response, of the same version.
            pub fn request_kind(&self) -> RequestKind {
                match self {
                    $(Self::$variant(inner) => RequestKind::$variant(inner.request_kind()),)+
                }
            }

            fn inner(&self) -> &dyn Message {
                match self {
                    $(Self::$variant(inner) => inner,)+
                }
            }

            fn inner_mut(&mut self) -> &mut dyn Message {
                match self {
                    $(Self::$variant(inner) => inner,)+
                }
            }
        }

        $(
            impl From<$request> for RequestKind {
                fn from(value: $request) -> Self {
                    Self::$variant(value)
                }
            }

            impl From<$response> for ResponseKind {
                fn from(value: $response) -> Self {
                    Self::$variant(value)
                }
            }
        )+
    };
}

kinds! {
    ApiVersions(ApiVersionsRequest, ApiVersionsResponse),
    ControlledShutdown(ControlledShutdownRequest, ControlledShutdownResponse),
    Heartbeat(HeartbeatRequest, HeartbeatResponse),
    SaslHandshake(SaslHandshakeRequest, SaslHandshakeResponse),
}

macro_rules! delegate {
    ($kind:ident) => {
        impl Message for $kind {
            fn key(&self) -> i16 {
                self.inner().key()
            }

            fn max_version(&self) -> i16 {
                self.inner().max_version()
            }

            fn version(&self) -> i16 {
                self.inner().version()
            }

            fn set_version(&mut self, version: i16) {
                self.inner_mut().set_version(version)
            }

            fn is_flexible(&self) -> bool {
                self.inner().is_flexible()
            }

            fn append_to(&self, dst: &mut BytesMut) -> Result<()> {
                self.inner().append_to(dst)
            }

            fn read_from(&mut self, src: Bytes) -> Result<()> {
                self.inner_mut().read_from(src)
            }
        }
    };
}

delegate!(RequestKind);
delegate!(ResponseKind);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiName;

    #[test]
    fn for_key() -> Result<()> {
        let request = RequestKind::for_key(12)?;
        assert_eq!(RequestKind::Heartbeat(HeartbeatRequest::default()), request);
        assert_eq!(HeartbeatRequest::NAME, "Heartbeat");

        assert_eq!(Err(Error::UnknownApiKey(0)), RequestKind::for_key(0));
        assert_eq!(Err(Error::UnknownApiKey(-3)), ResponseKind::for_key(-3));

        Ok(())
    }

    #[test]
    fn delegation() -> Result<()> {
        let mut request = RequestKind::for_key(18)?;
        request.set_version(3);

        assert_eq!(18, request.key());
        assert_eq!(3, request.max_version());
        assert_eq!(3, request.version());
        assert!(request.is_flexible());

        let response = request.response_kind();
        assert_eq!(18, response.key());
        assert_eq!(3, response.version());

        let request = response.request_kind();
        assert_eq!(3, request.version());

        Ok(())
    }

    #[test]
    fn flexibility() -> Result<()> {
        let mut sasl = RequestKind::for_key(17)?;
        for version in 0..=sasl.max_version() {
            sasl.set_version(version);
            assert!(!sasl.is_flexible());
        }

        let mut heartbeat = RequestKind::for_key(12)?;
        heartbeat.set_version(3);
        assert!(!heartbeat.is_flexible());
        heartbeat.set_version(4);
        assert!(heartbeat.is_flexible());

        Ok(())
    }
}
