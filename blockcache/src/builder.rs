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

use blockcache_common::error::ConfigError;

use crate::cache::BlockCache;
use crate::config::Config;
use crate::listener::{EventListener, NoopEventListener};
use crate::pack::PackFileFactory;

const DEFAULT_SHARDS: usize = 16;

/// Builds a [`BlockCache`], validating its [`Config`] the same way [`Config::new`]
/// does and wiring an optional [`EventListener`] alongside the cache's internal
/// lifetime-coupling hook (spec §4.6).
pub struct BlockCacheBuilder<F: PackFileFactory> {
    factory: F,
    block_size: u32,
    max_bytes: u64,
    stream_ratio: f64,
    shards: usize,
    listener: Option<Arc<dyn EventListener>>,
}

impl<F: PackFileFactory> BlockCacheBuilder<F> {
    pub fn new(factory: F) -> Self {
        let defaults = Config::default();
        Self {
            factory,
            block_size: defaults.block_size,
            max_bytes: defaults.max_bytes,
            stream_ratio: defaults.stream_ratio,
            shards: DEFAULT_SHARDS,
            listener: None,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.block_size = config.block_size;
        self.max_bytes = config.max_bytes;
        self.stream_ratio = config.stream_ratio;
        self
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_stream_ratio(mut self, stream_ratio: f64) -> Self {
        self.stream_ratio = stream_ratio;
        self
    }

    /// Number of shards the underlying weighted cache partitions its keyspace over.
    /// Must be a power of two; defaults to 16, mirroring `blockcache_memory`'s default.
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_event_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn build(self) -> Result<BlockCache<F>, ConfigError> {
        let config = Config::new(self.block_size, self.max_bytes, self.stream_ratio)?;
        let listener = self.listener.unwrap_or_else(|| Arc::new(NoopEventListener));
        Ok(BlockCache::new(config, Arc::new(self.factory), self.shards, listener))
    }
}
