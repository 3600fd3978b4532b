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
use serde_json::json;
use std::io::Write;
use tansu_wire::ErrorCode;

#[derive(Args, Clone, Debug)]
pub(super) struct Arg {
    /// The error code of a response
    #[arg(allow_negative_numbers = true)]
    code: i16,
}

impl Arg {
    pub(super) fn main(self, out: &mut impl Write) -> Result<()> {
        let classified = ErrorCode::classify(self.code).map_or_else(
            || json!({"code": 0, "name": "NONE", "retriable": false}),
            |error_code| {
                json!({
                    "code": error_code.code(),
                    "name": error_code.name(),
                    "retriable": error_code.is_retriable(),
                    "description": error_code.description(),
                })
            },
        );

        serde_json::to_writer(&mut *out, &classified)?;
        writeln!(out).map_err(Into::into)
    }
}
