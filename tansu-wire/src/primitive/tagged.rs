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

//! Tagged fields
//!
//! A flexible structure ends with a tag section: an unsigned varint count,
//! then for each field an unsigned varint tag, an unsigned varint size and
//! exactly that many bytes.

use super::{BufExt as _, BufMutExt as _};
use crate::Result;
use bytes::{Buf, BufMut};
use tracing::debug;

/// Skip over a tag section, leaving `encoded` positioned just after it.
pub fn skip_tags(encoded: &mut impl Buf) -> Result<()> {
    let count = encoded.try_get_uvarint()?;

    for _ in 0..count {
        let tag = encoded.try_get_uvarint()?;
        let size = encoded.try_get_uvarint().map(usize::try_from)??;
        debug!(tag, size);

        _ = encoded.try_get_span(size)?;
    }

    Ok(())
}

/// An empty tag section.
pub fn put_empty_tags(dst: &mut impl BufMut) {
    dst.put_uvarint(0)
}
