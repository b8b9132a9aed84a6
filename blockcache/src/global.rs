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

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use tracing::info;

use crate::cache::BlockCache;
use crate::pack::PackFileFactory;

/// A process-wide slot holding the currently active [`BlockCache`] (spec §4.5,
/// component C8).
///
/// Reads go through [`arc_swap::ArcSwap::load`], which never blocks. [`Global::replace`]
/// atomically installs a new cache and tears the old one down by calling
/// [`BlockCache::clean_up`] on it, so in-flight readers that already hold a
/// [`Guard`] from before the swap keep using the old cache until they drop it.
pub struct Global<F: PackFileFactory> {
    current: ArcSwap<BlockCache<F>>,
}

impl<F: PackFileFactory> Global<F> {
    pub fn new(initial: BlockCache<F>) -> Self {
        Self { current: ArcSwap::from_pointee(initial) }
    }

    /// A lock-free snapshot of the currently active cache.
    pub fn current(&self) -> Guard<Arc<BlockCache<F>>> {
        self.current.load()
    }

    /// Atomically installs `new` as the active cache, then tears down the cache it
    /// replaced.
    pub fn replace(&self, new: BlockCache<F>) {
        let old = self.current.swap(Arc::new(new));
        info!(packs = old.pack_count(), "replacing global block cache");
        old.clean_up();
    }
}
