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

//! Inspect Kafka wire protocol data: fetched partition data, sticky
//! assignor metadata, error codes and request frames.

use std::{fmt, io, result};

mod cli;

pub use cli::Cli;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    Io(#[from] io::Error),
    Json(#[from] serde_json::Error),
    UnsupportedMagic(i8),
    Wire(#[from] tansu_wire::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wire(error) => write!(f, "{error}"),
            error => write!(f, "{error:?}"),
        }
    }
}

pub type Result<T, E = Error> = result::Result<T, E>;
