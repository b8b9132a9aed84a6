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

use blockcache_common::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Validated cache parameters.
///
/// `Config` is always constructed through [`Config::new`] (or [`crate::BlockCacheBuilder`],
/// which validates the same way at `build()` time); there is no way to observe an
/// out-of-range `Config` value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Block size in bytes; must be a power of two, at least 512.
    pub block_size: u32,
    /// Total weight budget for the cache, in bytes; must be greater than zero.
    pub max_bytes: u64,
    /// Fraction of `max_bytes` above which a read should stream through the cache
    /// instead of being admitted; must fall within `[0.0, 1.0]`.
    pub stream_ratio: f64,
}

impl Config {
    pub fn new(block_size: u32, max_bytes: u64, stream_ratio: f64) -> Result<Self, ConfigError> {
        if block_size < 512 || !block_size.is_power_of_two() {
            return Err(ConfigError::InvalidBlockSize(block_size));
        }
        if max_bytes == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if !(0.0..=1.0).contains(&stream_ratio) {
            return Err(ConfigError::InvalidStreamRatio(stream_ratio));
        }
        Ok(Self { block_size, max_bytes, stream_ratio })
    }

    /// Byte length at or below which [`crate::BlockCache::should_stream_through`] returns
    /// `true`: reads this small are served by streaming the bytes directly rather than
    /// paying for cache admission.
    pub fn stream_threshold(&self) -> u64 {
        (self.max_bytes as f64 * self.stream_ratio) as u64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: 32 * 1024,
            max_bytes: 64 * 1024 * 1024,
            stream_ratio: 0.25,
        }
    }
}
