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

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Opaque, externally defined name for a pack. The cache never constructs one; it only
/// stores it as a map key, so the bound is exactly what a `HashMap` key needs.
pub trait PackDescription: Hash + Eq + Clone + std::fmt::Debug + Send + Sync + 'static {}
impl<T> PackDescription for T where T: Hash + Eq + Clone + std::fmt::Debug + Send + Sync + 'static {}

#[derive(Debug)]
struct PackKeyInner {
    /// Sum of the sizes of every still-cached block `Ref` belonging to this pack.
    /// Debited by the eviction hook, credited on load; reaching zero or below is the
    /// signal that this pack's registry entry (and its `PackFile`) should be dropped.
    cached_bytes: AtomicI64,
}

/// Internal identity token for a live pack.
///
/// Two `PackKey`s are equal only if they are the same allocation: reopening a pack
/// (even for the same [`PackDescription`]) always produces a new, distinct key, which
/// is what lets the cache tell freshly loaded blocks apart from ones belonging to a
/// pack that has since been replaced.
#[derive(Debug, Clone)]
pub struct PackKey(Arc<PackKeyInner>);

impl PackKey {
    pub fn new() -> Self {
        Self(Arc::new(PackKeyInner { cached_bytes: AtomicI64::new(0) }))
    }

    /// Current sum of cached block sizes attributed to this pack.
    pub fn cached_bytes(&self) -> i64 {
        self.0.cached_bytes.load(Ordering::Acquire)
    }

    pub(crate) fn add_cached_bytes(&self, delta: i64) -> i64 {
        self.0.cached_bytes.fetch_add(delta, Ordering::AcqRel) + delta
    }

    pub(crate) fn sub_cached_bytes(&self, delta: i64) -> i64 {
        self.0.cached_bytes.fetch_sub(delta, Ordering::AcqRel) - delta
    }

    pub(crate) fn reset_cached_bytes(&self) {
        self.0.cached_bytes.store(0, Ordering::Release);
    }
}

impl Default for PackKey {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for PackKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for PackKey {}

impl Hash for PackKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// Composite identity of a cache slot: a pack and a byte position within it.
///
/// `position >= 0` addresses pack data (a block); `position < 0` addresses an index
/// artifact slot associated with the pack (the sign bit is the discriminant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockKey {
    pub pack_key: PackKey,
    pub position: i64,
}

impl BlockKey {
    pub fn new(pack_key: PackKey, position: i64) -> Self {
        Self { pack_key, position }
    }

    /// `true` when this slot holds pack data rather than an index artifact.
    pub fn is_block(&self) -> bool {
        self.position >= 0
    }

    pub fn is_index_artifact(&self) -> bool {
        self.position < 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_keys_compare_by_identity_not_value() {
        let a = PackKey::new();
        let b = PackKey::new();
        assert_ne!(a, b, "two freshly allocated keys must never be considered equal");
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn cached_bytes_accounting() {
        let k = PackKey::new();
        assert_eq!(k.add_cached_bytes(512), 512);
        assert_eq!(k.add_cached_bytes(512), 1024);
        assert_eq!(k.sub_cached_bytes(1024), 0);
        k.reset_cached_bytes();
        assert_eq!(k.cached_bytes(), 0);
    }

    #[test]
    fn block_key_sign_discriminates_kind() {
        let k = PackKey::new();
        assert!(BlockKey::new(k.clone(), 0).is_block());
        assert!(!BlockKey::new(k.clone(), 0).is_index_artifact());
        assert!(BlockKey::new(k, -1).is_index_artifact());
    }
}
