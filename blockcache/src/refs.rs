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
use std::ops::Deref;
use std::sync::Arc;

use blockcache_memory::weighted::Weighted;

use crate::key::PackKey;

/// Type-erased cache entry.
///
/// This is the `V` actually stored in the underlying [`blockcache_memory::cache::WeightedCache`]:
/// blocks and index artifacts are unrelated concrete types but share one cache, so the
/// payload is kept behind `Arc<dyn Any + Send + Sync>` and recovered through
/// [`AnyRef::downcast`] into a typed [`Ref<T>`].
#[derive(Clone)]
pub struct AnyRef {
    pack_key: PackKey,
    position: i64,
    size: i32,
    value: Arc<dyn Any + Send + Sync>,
}

impl AnyRef {
    pub fn new<T: Any + Send + Sync>(pack_key: PackKey, position: i64, size: i32, value: T) -> Self {
        Self { pack_key, position, size, value: Arc::new(value) }
    }

    pub fn pack_key(&self) -> &PackKey {
        &self.pack_key
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    /// Recovers a typed view of this entry, or `None` if `T` does not match the
    /// concrete type it was constructed with.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Ref<T>> {
        let value = self.value.clone().downcast::<T>().ok()?;
        Some(Ref {
            pack_key: self.pack_key.clone(),
            position: self.position,
            size: self.size,
            value,
        })
    }
}

impl Weighted for AnyRef {
    fn weight(&self) -> usize {
        self.size.max(0) as usize
    }
}

/// An immutable, typed view of a cached entry: identity, eviction weight, and payload.
#[derive(Clone)]
pub struct Ref<T> {
    pack_key: PackKey,
    position: i64,
    size: i32,
    value: Arc<T>,
}

impl<T> Ref<T> {
    pub fn pack_key(&self) -> &PackKey {
        &self.pack_key
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> Arc<T> {
        self.value
    }
}

impl<T> Deref for Ref<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
