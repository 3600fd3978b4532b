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
use clap::Args;
use std::{fs, io::Write, path::PathBuf};
use tansu_wire::{ApiVersionsRequest, Message as _, RequestFormatter};
use tracing::debug;

#[derive(Args, Clone, Debug)]
pub(super) struct Arg {
    #[arg(long, env = "CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, default_value = "3")]
    api_version: i16,

    #[arg(long, default_value = "0")]
    correlation_id: i32,

    #[arg(long, default_value = env!("CARGO_PKG_NAME"))]
    client_software_name: String,

    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    client_software_version: String,

    /// Write the frame to this file rather than as JSON to stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Arg {
    pub(super) fn main(self, out: &mut impl Write) -> Result<()> {
        let formatter = self
            .client_id
            .map_or_else(RequestFormatter::default, |client_id| {
                RequestFormatter::builder().client_id(client_id).build()
            });

        let mut request = ApiVersionsRequest::default()
            .client_software_name(self.client_software_name)
            .client_software_version(self.client_software_version);
        request.set_version(self.api_version);

        let frame = formatter.request(&request, self.correlation_id)?;
        debug!(len = frame.len(), ?self.output);

        if let Some(output) = self.output {
            fs::write(output, &frame).map_err(Into::into)
        } else {
            serde_json::to_writer(&mut *out, &frame)?;
            writeln!(out).map_err(Into::into)
        }
    }
}
