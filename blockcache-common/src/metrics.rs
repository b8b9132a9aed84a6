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

use std::sync::atomic::{AtomicU64, Ordering};

/// Free-running counters for the block cache.
///
/// Every field is mirrored through the `metrics` crate's recorder-agnostic macros so a
/// host process can wire an exporter of its choosing; the atomics themselves exist so
/// tests (and anything embedding the cache) can read an exact snapshot without standing
/// up a recorder.
#[derive(Debug, Default)]
pub struct Metrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub insertions: AtomicU64,
    pub evictions: AtomicU64,
    pub pack_creates: AtomicU64,
    pub pack_closes: AtomicU64,
    pub stale_retries: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub pack_creates: u64,
    pub pack_closes: u64,
    pub stale_retries: u64,
}

impl Metrics {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("blockcache_hits_total").increment(1);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("blockcache_misses_total").increment(1);
    }

    pub fn record_insertion(&self) {
        self.insertions.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("blockcache_insertions_total").increment(1);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("blockcache_evictions_total").increment(1);
    }

    pub fn record_pack_create(&self) {
        self.pack_creates.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("blockcache_pack_creates_total").increment(1);
    }

    pub fn record_pack_close(&self) {
        self.pack_closes.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("blockcache_pack_closes_total").increment(1);
    }

    pub fn record_stale_retry(&self) {
        self.stale_retries.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("blockcache_stale_retries_total").increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            pack_creates: self.pack_creates.load(Ordering::Relaxed),
            pack_closes: self.pack_closes.load(Ordering::Relaxed),
            stale_retries: self.stale_retries.load(Ordering::Relaxed),
        }
    }
}
