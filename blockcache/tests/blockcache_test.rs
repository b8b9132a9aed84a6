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

//! End-to-end exercise of the literal scenarios a `BlockCache` must satisfy:
//! `block_size = 512`, `max_bytes = 4096`, `stream_ratio = 0.5`, against a fake
//! pack-file collaborator that only tracks read counts and a swappable "generation".

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use blockcache::prelude::*;

const BLOCK_SIZE: u32 = 512;
const MAX_BYTES: u64 = 4096;
const STREAM_RATIO: f64 = 0.5;

#[derive(Debug)]
struct FakeBlock {
    size: i32,
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Block for FakeBlock {
    fn size(&self) -> i32 {
        self.size
    }

    fn contains(&self, _pack_key: &PackKey, _position: i64) -> bool {
        self.generation == self.current.load(Ordering::SeqCst)
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

    fn read_one_block(&self, _position: i64, _reader: &mut ()) -> anyhow::Result<FakeBlock> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(FakeBlock {
            size: BLOCK_SIZE as i32,
            generation: self.current.load(Ordering::SeqCst),
            current: self.current.clone(),
        })
    }

    fn align_to_block(&self, position: i64) -> i64 {
        position - position.rem_euclid(BLOCK_SIZE as i64)
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
        .with_block_size(BLOCK_SIZE)
        .with_max_bytes(MAX_BYTES)
        .with_stream_ratio(STREAM_RATIO)
        .with_shards(1)
        .build()
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn scenario_1_simple_miss_then_hit() {
    let cache = cache();
    let pack = cache.get_or_create_pack(1, None).unwrap();

    cache.get_or_load(&pack, 100, &mut ()).await.unwrap();
    assert_eq!(pack.reads.load(Ordering::SeqCst), 1);

    cache.get_or_load(&pack, 300, &mut ()).await.unwrap();
    assert_eq!(pack.reads.load(Ordering::SeqCst), 1, "300 falls in the same 512-byte block as 100");
}

#[test_log::test(tokio::test)]
async fn scenario_2_eviction_debits_counter() {
    let cache = cache();
    let pack = cache.get_or_create_pack(1, None).unwrap();

    let positions: Vec<i64> = (0..8).map(|i| i * BLOCK_SIZE as i64).chain(std::iter::once(4096)).collect();
    for &pos in &positions {
        cache.get_or_load(&pack, pos, &mut ()).await.unwrap();
    }

    let present: i64 = positions.iter().filter(|&&pos| cache.contains(pack.key(), pos)).count() as i64 * 512;
    assert!(present < positions.len() as i64 * 512, "ninth insert must have evicted at least one earlier block");
    assert_eq!(pack.key().cached_bytes(), present, "invariant 1 holds at quiescence");
}

#[test_log::test(tokio::test)]
async fn scenario_3_index_eviction_drops_pack() {
    let cache = cache();
    let pack = cache.get_or_create_pack(7, None).unwrap();
    let key = pack.key().clone();

    cache.get_or_load(&pack, 0, &mut ()).await.unwrap();
    cache.put(key.clone(), -1, 200, "index".to_string());
    assert!(cache.contains(&key, -1));

    // The facade has no single-key invalidate; `clean_up` is the externally visible
    // way to force the index artifact's eviction hook to run.
    cache.clean_up();

    assert!(!cache.contains(&key, -1), "index slot is gone");
    assert_eq!(cache.pack_count(), 0, "evicting the index dropped the whole pack");

    let reopened = cache.get_or_create_pack(7, None).unwrap();
    assert_ne!(reopened.key(), &key, "reopening yields a fresh PackKey");
}

#[test_log::test(tokio::test)]
async fn scenario_4_stale_block_retried_exactly_once() {
    let cache = cache();
    let pack = cache.get_or_create_pack(1, None).unwrap();

    // Plant a block stamped with a generation that no longer matches "current": this
    // simulates a block left over from before the pack was reopened.
    cache.put(
        pack.key().clone(),
        0,
        512,
        FakeBlock { size: 512, generation: 999, current: pack.current.clone() },
    );
    pack.current.store(1, Ordering::SeqCst);

    let r = cache.get_or_load(&pack, 0, &mut ()).await.unwrap();
    assert!(r.value().contains(pack.key(), 0));
    assert_eq!(pack.reads.load(Ordering::SeqCst), 1, "exactly one read after the stale entry was invalidated");
}

#[test_log::test(tokio::test)]
async fn scenario_5_streaming_gate() {
    let cache = cache();
    assert!(cache.should_stream_through(2047));
    assert!(!cache.should_stream_through(2049));
}

#[test_log::test(tokio::test)]
async fn scenario_6_cleanup_resets_everything() {
    let cache = cache();
    let mut keys = Vec::new();
    for i in 0..4u32 {
        let pack = cache.get_or_create_pack(i, None).unwrap();
        cache.get_or_load(&pack, 0, &mut ()).await.unwrap();
        cache.put(pack.key().clone(), -1, 64, format!("index-{i}"));
        keys.push(pack.key().clone());
    }

    cache.clean_up();

    assert_eq!(cache.pack_count(), 0, "both registry maps are empty");
    for key in &keys {
        assert!(!cache.contains(key, 0), "no block slot survives clean_up");
        assert!(!cache.contains(key, -1), "no index slot survives clean_up");
        assert_eq!(key.cached_bytes(), 0, "cached_bytes is zeroed for every pack that was reachable");
    }
}

#[test_log::test(tokio::test)]
async fn concurrent_loads_for_a_missing_block_read_exactly_once() {
    let cache = Arc::new(cache());
    let pack = cache.get_or_create_pack(1, None).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let pack = pack.clone();
        handles.push(tokio::spawn(async move { cache.get_or_load(&pack, 0, &mut ()).await.unwrap() }));
    }
    for h in handles {
        h.await.unwrap();
    }

    assert_eq!(pack.reads.load(Ordering::SeqCst), 1, "singleton loader: only the first caller reads");
}
