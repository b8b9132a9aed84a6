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

use std::any::Any;
use std::sync::Arc;

use blockcache_common::error::CacheError;
use blockcache_common::metrics::{Metrics, MetricsSnapshot};
use blockcache_memory::cache::{WeightedCache, WeightedCacheBuilder};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::key::{BlockKey, PackKey};
use crate::lifetime::LifetimeListener;
use crate::listener::EventListener;
use crate::pack::{Block, PackFile, PackFileFactory};
use crate::refs::{AnyRef, Ref};
use crate::registry::PackRegistry;

/// Extra attempts allowed past the first when [`BlockCache::get_or_load`] keeps
/// observing a stale cached block. Bounds the retry loop described in spec §4.4: at
/// most this many reloads before the call gives up with [`CacheError::RetryBudgetExhausted`].
const MAX_STALE_RETRIES: usize = 2;

/// The public facade (spec §4.4, component C6): a weighted block cache sitting in
/// front of a pack-file object store, coupled one-to-one with a [`PackRegistry`].
///
/// `F` is the host application's [`PackFileFactory`]; it supplies the concrete
/// `PackFile`/`Block`/`Reader`/`Description` types this cache is instantiated over.
pub struct BlockCache<F: PackFileFactory> {
    config: Config,
    store: WeightedCache<BlockKey, AnyRef>,
    registry: Arc<PackRegistry<F>>,
    metrics: Arc<Metrics>,
}

impl<F: PackFileFactory> BlockCache<F> {
    pub(crate) fn new(config: Config, factory: Arc<F>, shards: usize, user_listener: Arc<dyn EventListener>) -> Self {
        let metrics = Arc::new(Metrics::default());
        let registry = Arc::new(PackRegistry::new(factory, metrics.clone()));
        let listener = Arc::new(LifetimeListener::new(registry.clone(), user_listener));
        let store = WeightedCacheBuilder::default()
            .with_max_weight(config.max_bytes as usize)
            .with_shards(shards)
            .with_listener(listener)
            .with_metrics(metrics.clone())
            .build();
        Self { config, store, registry, metrics }
    }

    /// The configured block size; always a power of two of at least 512 bytes.
    pub fn block_size(&self) -> u32 {
        self.config.block_size
    }

    /// Whether a read of `length` bytes should bypass cache admission and stream
    /// directly instead (spec §8 scenario 5: reads at or below the configured
    /// threshold stream through rather than paying for admission).
    pub fn should_stream_through(&self, length: u64) -> bool {
        length <= self.config.stream_threshold()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn pack_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the live `PackFile` for `description`, opening (or reopening, if the
    /// existing handle has become invalid) one via the configured factory.
    #[instrument(level = "debug", skip(self))]
    pub fn get_or_create_pack(
        &self,
        description: <F::File as PackFile>::Description,
        key_hint: Option<PackKey>,
    ) -> anyhow::Result<Arc<F::File>> {
        self.registry.get_or_create(description, key_hint)
    }

    /// Loads the block covering `pos`, consulting the cache first.
    ///
    /// Implements the spec §4.4 algorithm: align `pos` to the pack's native block
    /// boundary, look the aligned position up in (or load it into) the weighted
    /// cache, and — if the cached entry turns out to belong to a superseded pack
    /// generation — invalidate it and retry, bounded by [`MAX_STALE_RETRIES`].
    #[instrument(level = "trace", skip(self, pack, reader))]
    pub async fn get_or_load(
        &self,
        pack: &Arc<F::File>,
        pos: i64,
        reader: &mut <F::File as PackFile>::Reader,
    ) -> Result<Ref<<F::File as PackFile>::BlockType>, CacheError> {
        let requested = pos;
        let mut attempt = 0usize;

        loop {
            let aligned = pack.align_to_block(requested);
            let block_key = BlockKey::new(pack.key().clone(), aligned);

            let loader_pack = pack.clone();
            let loader_key = pack.key().clone();
            let reader_ref: &mut <F::File as PackFile>::Reader = &mut *reader;
            let any = self
                .store
                .get_or_compute(block_key.clone(), move || async move {
                    let block = loader_pack.read_one_block(aligned, reader_ref)?;
                    let size = block.size();
                    loader_key.add_cached_bytes(size as i64);
                    Ok(AnyRef::new(loader_key, aligned, size, block))
                })
                .await
                .map_err(CacheError::IoFailure)?;

            let typed = any
                .downcast::<<F::File as PackFile>::BlockType>()
                .expect("AnyRef stored under this key was always constructed from BlockType");

            if typed.value().contains(pack.key(), aligned) {
                return Ok(typed);
            }

            if attempt >= MAX_STALE_RETRIES {
                warn!(?block_key, attempt, "stale block retry budget exhausted");
                return Err(CacheError::RetryBudgetExhausted { budget: MAX_STALE_RETRIES });
            }

            debug!(?block_key, attempt, "stale block, invalidating and retrying");
            self.metrics.record_stale_retry();
            self.store.invalidate(&block_key);
            attempt += 1;
        }
    }

    /// Inserts `value` under `(pack_key, position)` with an explicit eviction weight,
    /// for payloads the cache did not itself load (most commonly index artifacts,
    /// which are stored at `position < 0` and excluded from a pack's `cached_bytes`
    /// accounting).
    pub fn put<T: Any + Send + Sync>(&self, pack_key: PackKey, position: i64, size: i32, value: T) -> Ref<T> {
        let any = AnyRef::new(pack_key.clone(), position, size, value);
        if position >= 0 {
            pack_key.add_cached_bytes(size as i64);
        }
        let stored = self.store.insert(BlockKey::new(pack_key, position), any);
        stored.downcast::<T>().expect("just inserted with the type we downcast to")
    }

    /// Returns the cached payload at `(pack_key, position)`, if present and of type `T`.
    pub fn get<T: Any + Send + Sync>(&self, pack_key: &PackKey, position: i64) -> Option<Ref<T>> {
        let block_key = BlockKey::new(pack_key.clone(), position);
        self.store.get_if_present(&block_key).and_then(|any| any.downcast::<T>())
    }

    pub fn contains(&self, pack_key: &PackKey, position: i64) -> bool {
        self.store.contains(&BlockKey::new(pack_key.clone(), position))
    }

    /// Drops `pack`'s registry entry and zeroes its cached-bytes counter. Idempotent:
    /// a second call (or a lingering eviction hook racing this one) finds nothing and
    /// is a no-op. Orphaned `Ref`s belonging to `pack` are not proactively evicted;
    /// they are reclaimed the ordinary way as cache pressure touches them (spec §9).
    pub fn remove(&self, pack: &Arc<F::File>) {
        self.registry.drop_by_key(pack.key());
    }

    /// Clears every cached block/index artifact and every registered pack.
    pub fn clean_up(&self) {
        self.store.invalidate_all();
        self.registry.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use super::*;
    use crate::builder::BlockCacheBuilder;

    #[derive(Debug)]
    struct FakeBlock {
        size: i32,
        tagged_generation: u64,
        current: Arc<AtomicU64>,
    }
    impl Block for FakeBlock {
        fn size(&self) -> i32 {
            self.size
        }
        fn contains(&self, _pack_key: &PackKey, _position: i64) -> bool {
            self.tagged_generation == self.current.load(Ordering::SeqCst)
        }
    }

    struct FakePack {
        key: PackKey,
        description: u32,
        reads: AtomicUsize,
        current: Arc<AtomicU64>,
    }
    impl PackFile for FakePack {
        type Description = u32;
        type Reader = ();
        type BlockType = FakeBlock;

        fn read_one_block(&self, position: i64, _reader: &mut ()) -> anyhow::Result<FakeBlock> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let _ = position;
            Ok(FakeBlock {
                size: 512,
                tagged_generation: self.current.load(Ordering::SeqCst),
                current: self.current.clone(),
            })
        }
        fn align_to_block(&self, position: i64) -> i64 {
            position - position.rem_euclid(512)
        }
        fn key(&self) -> &PackKey {
            &self.key
        }
        fn description(&self) -> &u32 {
            &self.description
        }
        fn invalid(&self) -> bool {
            false
        }
        fn close(&self) {}
    }

    struct FakeFactory {
        current: Arc<AtomicU64>,
    }
    impl PackFileFactory for FakeFactory {
        type File = FakePack;
        fn open(&self, description: u32, key: PackKey) -> anyhow::Result<FakePack> {
            Ok(FakePack { key, description, reads: AtomicUsize::new(0), current: self.current.clone() })
        }
    }

    fn cache() -> BlockCache<FakeFactory> {
        BlockCacheBuilder::new(FakeFactory { current: Arc::new(AtomicU64::new(0)) })
            .with_block_size(512)
            .with_max_bytes(4096)
            .with_stream_ratio(0.5)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn miss_then_hit_loads_once() {
        let cache = cache();
        let pack = cache.get_or_create_pack(1, None).unwrap();

        let r1 = cache.get_or_load(&pack, 100, &mut ()).await.unwrap();
        assert_eq!(pack.reads.load(Ordering::SeqCst), 1);

        let r2 = cache.get_or_load(&pack, 300, &mut ()).await.unwrap();
        assert_eq!(pack.reads.load(Ordering::SeqCst), 1, "second call in the same block must not reload");
        assert!(Arc::ptr_eq(&r1.into_inner(), &r2.into_inner()));
    }

    #[tokio::test]
    async fn stale_block_is_reloaded_exactly_once() {
        let cache = cache();
        let pack = cache.get_or_create_pack(1, None).unwrap();

        // Plant a block tagged with a generation that no longer matches "current".
        cache.put(
            pack.key().clone(),
            0,
            512,
            FakeBlock { size: 512, tagged_generation: 999, current: pack.current.clone() },
        );
        pack.current.store(1, Ordering::SeqCst);

        let r = cache.get_or_load(&pack, 0, &mut ()).await.unwrap();
        assert!(r.value().contains(pack.key(), 0));
        assert_eq!(pack.reads.load(Ordering::SeqCst), 1, "exactly one read after invalidating the stale entry");
    }

    #[tokio::test]
    async fn streaming_gate_matches_configured_threshold() {
        let cache = cache();
        assert!(cache.should_stream_through(2047));
        assert!(!cache.should_stream_through(2049));
    }

    #[tokio::test]
    async fn index_eviction_drops_pack_and_reopen_yields_new_key() {
        let cache = cache();
        let pack = cache.get_or_create_pack(7, None).unwrap();
        let old_key = pack.key().clone();

        cache.put(old_key.clone(), -1, 200, "index".to_string());
        assert!(cache.contains(&old_key, -1));

        cache.clean_up();
        assert!(!cache.contains(&old_key, -1));
        assert_eq!(cache.pack_count(), 0);

        let reopened = cache.get_or_create_pack(7, None).unwrap();
        assert_ne!(&old_key, reopened.key());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let cache = cache();
        let pack = cache.get_or_create_pack(3, None).unwrap();
        cache.remove(&pack);
        cache.remove(&pack);
        assert_eq!(cache.pack_count(), 0);
    }

    #[tokio::test]
    async fn eviction_keeps_cached_bytes_consistent_with_present_blocks() {
        let cache = BlockCacheBuilder::new(FakeFactory { current: Arc::new(AtomicU64::new(0)) })
            .with_block_size(512)
            .with_max_bytes(4096)
            .with_stream_ratio(0.5)
            .with_shards(1)
            .build()
            .unwrap();
        let pack = cache.get_or_create_pack(1, None).unwrap();

        let positions: Vec<i64> = (0..8).map(|i| i * 512).chain(std::iter::once(4096)).collect();
        for &pos in &positions {
            cache.get_or_load(&pack, pos, &mut ()).await.unwrap();
        }

        let present_total: i64 = positions
            .iter()
            .filter(|&&pos| cache.contains(pack.key(), pos))
            .map(|_| 512)
            .sum();
        assert!(present_total < positions.len() as i64 * 512, "capacity pressure must have evicted something");
        assert_eq!(pack.key().cached_bytes(), present_total, "invariant 1: cached_bytes tracks only present blocks");
    }
}
