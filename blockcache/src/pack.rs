//  Copyright 2024 Foyer Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

use crate::key::{PackDescription, PackKey};

/// A fixed-size, aligned window of pack-file bytes: the unit of caching.
///
/// `Block` is an external collaborator; the cache only needs to know its eviction
/// weight and whether it still belongs to a given pack generation.
pub trait Block: std::fmt::Debug + Send + Sync + 'static {
    /// Eviction weight in bytes.
    fn size(&self) -> i32;

    /// Reports whether this block was produced for `pack_key` and covers `position`.
    ///
    /// A `false` result means the block is stale (typically because the pack it was
    /// read from has since been replaced) and the cache should reload it.
    fn contains(&self, pack_key: &PackKey, position: i64) -> bool;
}

/// The handle object that performs actual block I/O. One instance is kept alive per
/// live [`PackDescription`]; the on-disk format and the read path itself are outside
/// this crate's scope, this trait only names the surface the cache calls.
pub trait PackFile: Send + Sync + 'static {
    type Description: PackDescription;
    type Reader;
    type BlockType: Block;

    /// Reads the block covering `position` (already aligned via [`PackFile::align_to_block`]).
    fn read_one_block(&self, position: i64, reader: &mut Self::Reader) -> anyhow::Result<Self::BlockType>;

    /// Rounds `position` down to the start of the block that contains it.
    fn align_to_block(&self, position: i64) -> i64;

    /// This pack's current identity token.
    fn key(&self) -> &PackKey;

    /// This pack's stable external name.
    fn description(&self) -> &Self::Description;

    /// `true` once this handle has been superseded and must no longer be used.
    fn invalid(&self) -> bool;

    /// Releases whatever OS-level resources this handle holds (file descriptors,
    /// mappings). Called at most meaningfully once; implementations should tolerate
    /// repeated calls.
    fn close(&self);
}

/// Constructs fresh [`PackFile`] handles for a description. Supplied by the host
/// application; the registry calls this exactly when it needs to open (or reopen) a
/// pack that is not currently live.
pub trait PackFileFactory: Send + Sync + 'static {
    type File: PackFile;

    fn open(
        &self,
        description: <Self::File as PackFile>::Description,
        key: PackKey,
    ) -> anyhow::Result<Self::File>;
}
