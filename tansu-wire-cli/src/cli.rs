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
use clap::{Parser, Subcommand};
use std::{
    io::{self, Write},
    process,
};
use tracing::debug;

mod api_versions;
mod error_code;
mod fetch;
mod sticky;

#[derive(Clone, Debug, Parser)]
#[command(name = "tansu-wire", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, Subcommand)]
enum Command {
    /// Read the record batches of fetched partition data
    Batches(fetch::Arg),

    /// Read a legacy message set of fetched partition data
    Messages {
        #[command(flatten)]
        fetched: fetch::Arg,

        /// Message format, 0 or 1
        #[arg(long, default_value = "1")]
        magic: i8,
    },

    /// Decode sticky assignor member metadata
    Sticky(sticky::Arg),

    /// Classify a response error code
    ErrorCode(error_code::Arg),

    /// Frame an ApiVersions request
    ApiVersions(api_versions::Arg),
}

impl Cli {
    pub fn main() -> Result<()> {
        debug!(pid = process::id());

        Cli::parse().run(&mut io::stdout().lock())
    }

    /// Run the command, writing its output to `out`.
    pub fn run(self, out: &mut impl Write) -> Result<()> {
        match self.command {
            Command::Batches(arg) => arg.batches(out),
            Command::Messages { fetched, magic } => fetched.messages(magic, out),
            Command::Sticky(arg) => arg.main(out),
            Command::ErrorCode(arg) => arg.main(out),
            Command::ApiVersions(arg) => arg.main(out),
        }
        .inspect_err(|err| debug!(?err))
    }
}
