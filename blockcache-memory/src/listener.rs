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

use blockcache_common::code::{Key, Value};

/// Why an entry left the cache. Passed to [`EvictionListener::on_evict`] exactly once
/// per physical removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionCause {
    /// Removed to make room for another admission.
    Evicted,
    /// Removed by an explicit `invalidate`/`invalidate_all` call.
    Explicit,
    /// Removed because a new value was inserted under the same key.
    Replaced,
}

/// Trait for the customized eviction listener.
///
/// Called synchronously while the owning shard's lock is held by default implementors
/// of [`Shard`](crate::cache::Shard) should keep this cheap; anything that can block or
/// re-enter the cache should hand off to a background task.
pub trait EvictionListener: Send + Sync + 'static {
    /// Associated key type.
    type Key;
    /// Associated value type.
    type Value;

    /// Called once for every entry physically removed from the cache.
    #[allow(unused_variables)]
    fn on_evict(&self, key: Self::Key, value: Arc<Self::Value>, cause: EvictionCause)
    where
        Self::Key: Key,
        Self::Value: Value,
    {
    }
}

/// A no-op listener, the default for caches that do not need eviction notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener<K, V>(std::marker::PhantomData<fn(K, V)>);

impl<K, V> EvictionListener for NoopListener<K, V>
where
    K: Key,
    V: Value,
{
    type Key = K;
    type Value = V;
}
