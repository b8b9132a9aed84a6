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

use std::future::Future;
use std::hash::{BuildHasher, Hash, Hasher};
use std::sync::Arc;

use ahash::RandomState;
use blockcache_common::code::{Key, Value};
use blockcache_common::metrics::Metrics;
use hashbrown::hash_map::{Entry as HashMapEntry, HashMap};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::trace;

use crate::listener::{EvictionCause, EvictionListener, NoopListener};
use crate::lru_list::LruList;
use crate::weighted::Weighted;

/// Per-entry bookkeeping overhead folded into every weight, covering the key and the
/// slot/list-node storage the cache keeps alongside the payload.
const FIXED_OVERHEAD: usize = 64;

const DEFAULT_SHARDS: usize = 16;

type Waiter<V> = oneshot::Sender<Result<Arc<V>, Arc<anyhow::Error>>>;

struct Slot<V> {
    value: Arc<V>,
    weight: usize,
    token: crate::lru_list::Token,
}

struct Shard<K, V> {
    entries: HashMap<K, Slot<V>>,
    order: LruList<K>,
    usage: usize,
    waiters: HashMap<K, Vec<Waiter<V>>>,
}

impl<K, V> Default for Shard<K, V>
where
    K: Key,
{
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: LruList::new(),
            usage: 0,
            waiters: HashMap::new(),
        }
    }
}

/// A bounded, weighted, concurrent map with a singleton-per-key loader and an eviction
/// hook invoked exactly once per physical removal.
///
/// Entries are distributed across shards by hash; each shard owns an independent
/// recency list and capacity budget (`max_weight / shard_count`), so unrelated keys
/// never contend on the same lock.
pub struct WeightedCache<K, V, S = RandomState>
where
    K: Key,
    V: Weighted + Value,
{
    shards: Vec<Mutex<Shard<K, V>>>,
    shard_mask: u64,
    capacity_per_shard: usize,
    hash_builder: S,
    listener: Arc<dyn EvictionListener<Key = K, Value = V>>,
    metrics: Arc<Metrics>,
}

impl<K, V> WeightedCache<K, V, RandomState>
where
    K: Key,
    V: Weighted + Value,
{
    pub fn new(max_weight: usize) -> Self {
        WeightedCacheBuilder::default().with_max_weight(max_weight).build()
    }
}

impl<K, V, S> WeightedCache<K, V, S>
where
    K: Key,
    V: Weighted + Value,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    fn shard_of(&self, key: &K) -> usize {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        (hasher.finish() & self.shard_mask) as usize
    }

    /// Returns the cloned value for `key` if present, bumping its recency.
    pub fn get_if_present(&self, key: &K) -> Option<Arc<V>> {
        let idx = self.shard_of(key);
        let mut shard = self.shards[idx].lock();
        if let Some(slot) = shard.entries.get(key) {
            shard.order.move_to_front(slot.token);
            let value = slot.value.clone();
            drop(shard);
            self.metrics.record_hit();
            Some(value)
        } else {
            drop(shard);
            self.metrics.record_miss();
            None
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        let idx = self.shard_of(key);
        self.shards[idx].lock().entries.contains_key(key)
    }

    /// Inserts `value` under `key`, evicting as needed to respect the weight budget.
    /// Returns the stored, ref-counted value.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let idx = self.shard_of(&key);
        let value = Arc::new(value);
        let evicted = {
            let mut shard = self.shards[idx].lock();
            self.insert_locked(&mut shard, key, value.clone())
        };
        self.metrics.record_insertion();
        self.fire_evictions(evicted);
        value
    }

    /// Removes `key`, returning the value that was present, if any.
    pub fn invalidate(&self, key: &K) -> Option<Arc<V>> {
        let idx = self.shard_of(key);
        let removed = {
            let mut shard = self.shards[idx].lock();
            shard.entries.remove(key).map(|slot| {
                shard.order.remove(slot.token);
                shard.usage -= slot.weight;
                slot.value
            })
        };
        if let Some(value) = &removed {
            self.metrics.record_eviction();
            self.listener.on_evict(key.clone(), value.clone(), EvictionCause::Explicit);
        }
        removed
    }

    /// Drops every entry in the cache, invoking the eviction hook for each.
    pub fn invalidate_all(&self) {
        for shard in &self.shards {
            let drained: Vec<(K, Arc<V>)> = {
                let mut guard = shard.lock();
                guard.order = LruList::new();
                guard.usage = 0;
                std::mem::take(&mut guard.entries)
                    .into_iter()
                    .map(|(k, slot)| (k, slot.value))
                    .collect()
            };
            let evicted = drained
                .into_iter()
                .map(|(k, v)| (k, v, EvictionCause::Explicit))
                .collect();
            self.fire_evictions(evicted);
        }
    }

    /// Returns the cached value for `key`, computing it with `loader` if absent.
    ///
    /// At most one concurrent call to this method per missing key actually invokes
    /// `loader`; concurrent callers for the same key await its result instead.
    pub async fn get_or_compute<F, Fut>(&self, key: K, loader: F) -> Result<Arc<V>, Arc<anyhow::Error>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, anyhow::Error>>,
    {
        let idx = self.shard_of(&key);

        let rx = {
            let mut shard = self.shards[idx].lock();
            if let Some(slot) = shard.entries.get(&key) {
                shard.order.move_to_front(slot.token);
                let value = slot.value.clone();
                drop(shard);
                self.metrics.record_hit();
                return Ok(value);
            }
            match shard.waiters.entry(key.clone()) {
                HashMapEntry::Occupied(mut o) => {
                    let (tx, rx) = oneshot::channel();
                    o.get_mut().push(tx);
                    Some(rx)
                }
                HashMapEntry::Vacant(v) => {
                    v.insert(Vec::new());
                    None
                }
            }
        };

        self.metrics.record_miss();

        if let Some(rx) = rx {
            trace!(?key, "joining in-flight load");
            return rx
                .await
                .unwrap_or_else(|_| Err(Arc::new(anyhow::anyhow!("loader task dropped its result"))));
        }

        let result = loader().await;

        match result {
            Ok(value) => {
                let value = Arc::new(value);
                // Draining `waiters` and admitting the value into `entries` must happen
                // under the same lock acquisition: otherwise there is a window where the
                // key is absent from both maps, and a concurrent caller arriving in that
                // window would see a vacant waiter slot and elect itself leader too.
                let (evicted, waiters) = {
                    let mut shard = self.shards[idx].lock();
                    let waiters = shard.waiters.remove(&key).unwrap_or_default();
                    let evicted = self.insert_locked(&mut shard, key, value.clone());
                    (evicted, waiters)
                };
                self.metrics.record_insertion();
                self.fire_evictions(evicted);
                for tx in waiters {
                    let _ = tx.send(Ok(value.clone()));
                }
                Ok(value)
            }
            Err(e) => {
                let waiters = {
                    let mut shard = self.shards[idx].lock();
                    shard.waiters.remove(&key).unwrap_or_default()
                };
                let err = Arc::new(e);
                for tx in waiters {
                    let _ = tx.send(Err(err.clone()));
                }
                Err(err)
            }
        }
    }

    fn insert_locked(
        &self,
        shard: &mut Shard<K, V>,
        key: K,
        value: Arc<V>,
    ) -> Vec<(K, Arc<V>, EvictionCause)> {
        let weight = FIXED_OVERHEAD + value.weight();
        let mut evicted = Vec::new();

        if let Some(old) = shard.entries.remove(&key) {
            shard.order.remove(old.token);
            shard.usage -= old.weight;
            evicted.push((key.clone(), old.value, EvictionCause::Replaced));
        }

        while shard.usage + weight > self.capacity_per_shard && !shard.entries.is_empty() {
            match shard.order.pop_back() {
                Some((_, lru_key)) => {
                    if let Some(slot) = shard.entries.remove(&lru_key) {
                        shard.usage -= slot.weight;
                        evicted.push((lru_key, slot.value, EvictionCause::Evicted));
                    }
                }
                None => break,
            }
        }

        let token = shard.order.push_front(key.clone());
        shard.usage += weight;
        shard.entries.insert(key, Slot { value, weight, token });

        evicted
    }

    fn fire_evictions(&self, evicted: Vec<(K, Arc<V>, EvictionCause)>) {
        for (k, v, cause) in evicted {
            if cause != EvictionCause::Replaced {
                self.metrics.record_eviction();
            }
            self.listener.on_evict(k, v, cause);
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

/// Builder for [`WeightedCache`], mirroring the `with_*` shape used throughout this
/// workspace's other cache builders.
pub struct WeightedCacheBuilder<K, V, S = RandomState> {
    max_weight: usize,
    shards: usize,
    hash_builder: S,
    listener: Option<Arc<dyn EvictionListener<Key = K, Value = V>>>,
    metrics: Option<Arc<Metrics>>,
}

impl<K, V> Default for WeightedCacheBuilder<K, V, RandomState>
where
    K: Key,
    V: Weighted + Value,
{
    fn default() -> Self {
        Self {
            max_weight: 0,
            shards: DEFAULT_SHARDS,
            hash_builder: RandomState::default(),
            listener: None,
            metrics: None,
        }
    }
}

impl<K, V, S> WeightedCacheBuilder<K, V, S>
where
    K: Key,
    V: Weighted + Value,
    S: BuildHasher + Clone + Send + Sync + 'static,
{
    pub fn with_max_weight(mut self, max_weight: usize) -> Self {
        self.max_weight = max_weight;
        self
    }

    pub fn with_shards(mut self, shards: usize) -> Self {
        assert!(shards.is_power_of_two(), "shard count must be a power of two");
        self.shards = shards;
        self
    }

    pub fn with_hasher<S2>(self, hash_builder: S2) -> WeightedCacheBuilder<K, V, S2>
    where
        S2: BuildHasher + Clone + Send + Sync + 'static,
    {
        WeightedCacheBuilder {
            max_weight: self.max_weight,
            shards: self.shards,
            hash_builder,
            listener: self.listener,
            metrics: self.metrics,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EvictionListener<Key = K, Value = V>>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Shares an existing [`Metrics`] instance rather than letting the cache allocate
    /// its own, so a caller that already owns one can read the same
    /// hit/miss/insertion/eviction counters the store records.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> WeightedCache<K, V, S> {
        let shards = self.shards.max(1);
        let capacity_per_shard = (self.max_weight / shards).max(1);
        WeightedCache {
            shards: (0..shards).map(|_| Mutex::new(Shard::default())).collect(),
            shard_mask: shards as u64 - 1,
            capacity_per_shard,
            hash_builder: self.hash_builder,
            listener: self
                .listener
                .unwrap_or_else(|| Arc::new(NoopListener::<K, V>::default())),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(Metrics::default())),
        }
    }
}
