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

use crate::{Error, Result};
use bytes::Bytes;
use clap::Args;
use serde::Serialize;
use std::{fs, io::Write, path::PathBuf};
use tansu_wire::record::{Partial, read_record_batches, read_v0_messages, read_v1_messages};
use tracing::{debug, warn};

#[derive(Args, Clone, Debug)]
pub(super) struct Arg {
    /// File containing the partition data of a fetch response
    #[arg(long)]
    file: PathBuf,
}

impl Arg {
    fn fetched(&self) -> Result<Bytes> {
        fs::read(&self.file).map(Bytes::from).map_err(Into::into)
    }

    pub(super) fn batches(self, out: &mut impl Write) -> Result<()> {
        let (batches, error) = split(read_record_batches(self.fetched()?));

        for batch in &batches {
            write_line(out, batch)?;

            if batch.compression() == 0 {
                for record in batch.records()? {
                    write_line(out, &record)?;
                }
            } else {
                debug!(base_offset = batch.base_offset, compression = batch.compression());
            }
        }

        error.map_or(Ok(()), |error| Err(error.into()))
    }

    pub(super) fn messages(self, magic: i8, out: &mut impl Write) -> Result<()> {
        match magic {
            0 => emit(read_v0_messages(self.fetched()?), out),
            1 => emit(read_v1_messages(self.fetched()?), out),
            otherwise => Err(Error::UnsupportedMagic(otherwise)),
        }
    }
}

fn split<T>(read: Result<Vec<T>, Partial<T>>) -> (Vec<T>, Option<tansu_wire::Error>) {
    match read {
        Ok(decoded) => (decoded, None),

        Err(Partial { decoded, error }) => {
            warn!(decoded = decoded.len(), %error);
            (decoded, Some(error))
        }
    }
}

fn emit<T: Serialize>(read: Result<Vec<T>, Partial<T>>, out: &mut impl Write) -> Result<()> {
    let (decoded, error) = split(read);

    decoded
        .iter()
        .try_for_each(|unit| write_line(out, unit))
        .and(error.map_or(Ok(()), |error| Err(error.into())))
}

fn write_line(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out).map_err(Into::into)
}
