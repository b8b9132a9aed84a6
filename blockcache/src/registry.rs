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

use blockcache_common::metrics::Metrics;
use hashbrown::HashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::key::PackKey;
use crate::pack::{PackFile, PackFileFactory};

type Description<F> = <<F as PackFileFactory>::File as PackFile>::Description;

struct Inner<F: PackFileFactory> {
    by_description: HashMap<Description<F>, Arc<F::File>>,
    by_key: HashMap<PackKey, Description<F>>,
}

impl<F: PackFileFactory> Default for Inner<F> {
    fn default() -> Self {
        Self { by_description: HashMap::new(), by_key: HashMap::new() }
    }
}

/// Two coupled maps enforcing "at most one live [`PackFile`] per description".
///
/// `by_description` and `by_key` are always mutated together under the same critical
/// section, so a lookup through either map is always consistent with the other.
pub struct PackRegistry<F: PackFileFactory> {
    factory: Arc<F>,
    inner: Mutex<Inner<F>>,
    metrics: Arc<Metrics>,
}

impl<F: PackFileFactory> PackRegistry<F> {
    pub fn new(factory: Arc<F>, metrics: Arc<Metrics>) -> Self {
        Self { factory, inner: Mutex::new(Inner::default()), metrics }
    }

    /// Returns the live, non-invalid `PackFile` for `description`, opening one via the
    /// factory if none exists (or the existing one has become invalid).
    pub fn get_or_create(
        &self,
        description: Description<F>,
        key_hint: Option<PackKey>,
    ) -> anyhow::Result<Arc<F::File>> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.by_description.get(&description) {
            if !existing.invalid() {
                return Ok(existing.clone());
            }
            let stale_key = existing.key().clone();
            inner.by_description.remove(&description);
            inner.by_key.remove(&stale_key);
        }

        let key = key_hint.unwrap_or_default();
        let file = Arc::new(self.factory.open(description.clone(), key.clone())?);
        inner.by_key.insert(key, description.clone());
        inner.by_description.insert(description, file.clone());
        drop(inner);

        self.metrics.record_pack_create();
        Ok(file)
    }

    /// Removes the pack identified by `key`, closing its `PackFile` if still present.
    /// Idempotent: calling this for a key that is already gone (or was never
    /// registered) only resets the key's cached-bytes counter.
    pub fn drop_by_key(&self, key: &PackKey) {
        let file = {
            let mut inner = self.inner.lock();
            inner.by_key.remove(key).and_then(|description| inner.by_description.remove(&description))
        };
        key.reset_cached_bytes();
        if let Some(file) = file {
            debug!("closing pack");
            file.close();
            self.metrics.record_pack_close();
        }
    }

    pub fn drop_by_description(&self, description: &Description<F>) {
        let file = {
            let mut inner = self.inner.lock();
            let file = inner.by_description.remove(description);
            if let Some(file) = &file {
                inner.by_key.remove(file.key());
            }
            file
        };
        if let Some(file) = file {
            file.key().reset_cached_bytes();
            file.close();
            self.metrics.record_pack_close();
        }
    }

    /// Drops every registered pack.
    pub fn clear(&self) {
        let files: Vec<Arc<F::File>> = {
            let mut inner = self.inner.lock();
            inner.by_key.clear();
            inner.by_description.drain().map(|(_, file)| file).collect()
        };
        for file in files {
            file.key().reset_cached_bytes();
            file.close();
            self.metrics.record_pack_close();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_description.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
