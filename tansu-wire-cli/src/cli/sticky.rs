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

use crate::Result;
use bytes::Bytes;
use clap::Args;
use std::{fs, io::Write, path::PathBuf};
use tansu_wire::consumer::StickyMemberMetadata;

#[derive(Args, Clone, Debug)]
pub(super) struct Arg {
    /// File containing the user data of a sticky assignor member
    #[arg(long)]
    file: PathBuf,
}

impl Arg {
    pub(super) fn main(self, out: &mut impl Write) -> Result<()> {
        let encoded = fs::read(&self.file).map(Bytes::from)?;
        let metadata = StickyMemberMetadata::try_from(encoded)?;

        serde_json::to_writer_pretty(&mut *out, &metadata)?;
        writeln!(out).map_err(Into::into)
    }
}
