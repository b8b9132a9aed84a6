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

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use blockcache_memory::listener::{EvictionCause, EvictionListener};
use tracing::error;

use crate::key::BlockKey;
use crate::listener::EventListener;
use crate::pack::PackFileFactory;
use crate::refs::AnyRef;
use crate::registry::PackRegistry;

/// The eviction hook that couples the block cache's lifetime to the pack registry's.
///
/// Wired into the underlying [`blockcache_memory::cache::WeightedCache`] as its
/// [`EvictionListener`]; this is the "hard part" of the core algorithm (spec §4.3):
/// evicting an index artifact (negative position) unconditionally drops the owning
/// pack, while evicting a block debits the pack's `cached_bytes` counter and drops the
/// pack only once that counter reaches zero.
pub struct LifetimeListener<F: PackFileFactory> {
    registry: Arc<PackRegistry<F>>,
    user: Arc<dyn EventListener>,
}

impl<F: PackFileFactory> LifetimeListener<F> {
    pub fn new(registry: Arc<PackRegistry<F>>, user: Arc<dyn EventListener>) -> Self {
        Self { registry, user }
    }
}

impl<F: PackFileFactory> EvictionListener for LifetimeListener<F> {
    type Key = BlockKey;
    type Value = AnyRef;

    fn on_evict(&self, key: BlockKey, value: Arc<AnyRef>, _cause: EvictionCause) {
        if let Err(payload) =
            catch_unwind(AssertUnwindSafe(|| self.user.on_evict(&key.pack_key, key.position, value.size())))
        {
            error!(?payload, "event listener panicked in on_evict");
        }

        if key.is_index_artifact() {
            self.registry.drop_by_key(&key.pack_key);
            self.notify_close(&key);
            return;
        }

        let remaining = key.pack_key.sub_cached_bytes(value.size() as i64);
        if remaining <= 0 {
            self.registry.drop_by_key(&key.pack_key);
            self.notify_close(&key);
        }
    }
}

impl<F: PackFileFactory> LifetimeListener<F> {
    fn notify_close(&self, key: &BlockKey) {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.user.on_pack_close(&key.pack_key))) {
            error!(?payload, "event listener panicked in on_pack_close");
        }
    }
}
