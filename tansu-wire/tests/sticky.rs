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

use bytes::Bytes;
use common::init_tracing;
use pretty_assertions::assert_eq;
use tansu_wire::{
    Result,
    consumer::{StickyAssignment, StickyMemberMetadata},
};

pub mod common;

fn metadata() -> StickyMemberMetadata {
    StickyMemberMetadata::default().current_assignment([
        StickyAssignment::default().topic("test").partitions([0, 1, 2]),
        StickyAssignment::default().topic("benchmark").partitions([]),
    ])
}

#[test]
fn no_generation_has_no_trailing_field() -> Result<()> {
    let _guard = init_tracing()?;

    let without = Bytes::try_from(&metadata())?;
    let with = Bytes::try_from(&metadata().generation(5))?;

    assert_eq!(without.len() + 4, with.len());
    assert_eq!(&without[..], &with[..without.len()]);

    let decoded = StickyMemberMetadata::try_from(without)?;
    assert_eq!(StickyMemberMetadata::NO_GENERATION, decoded.generation);
    assert!(!decoded.has_generation());

    let decoded = StickyMemberMetadata::try_from(with)?;
    assert_eq!(5, decoded.generation);
    assert_eq!(metadata().current_assignment, decoded.current_assignment);

    Ok(())
}

#[test]
fn decode_with_generation() -> Result<()> {
    let _guard = init_tracing()?;

    let encoded = Bytes::from_static(
        b"\0\0\0\x01\0\x04test\0\0\0\x02\0\0\0\0\0\0\0\x03\0\0\0\x09",
    );

    let decoded = StickyMemberMetadata::try_from(encoded.clone())?;

    assert_eq!(
        vec![StickyAssignment::default().topic("test").partitions([0, 3])],
        decoded.current_assignment
    );
    assert_eq!(9, decoded.generation);
    assert_eq!(encoded, Bytes::try_from(&decoded)?);

    Ok(())
}

#[test]
fn empty_assignment() -> Result<()> {
    let _guard = init_tracing()?;

    let decoded = StickyMemberMetadata::try_from(Bytes::from_static(&[0, 0, 0, 0]))?;
    assert_eq!(StickyMemberMetadata::default(), decoded);

    Ok(())
}
