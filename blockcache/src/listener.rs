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

use crate::key::PackKey;

/// User-facing observability hook, fired alongside (never instead of) the cache's
/// internal lifetime-coupling logic.
///
/// Unlike [`blockcache_memory::listener::EvictionListener`], which the facade wires up
/// internally to drive pack teardown, this trait exists purely so a host application
/// can observe cache churn; a panicking implementation is caught at the call site and
/// logged rather than allowed to unwind through the cache.
pub trait EventListener: Send + Sync + 'static {
    /// An entry belonging to `pack_key` at `position` left the cache.
    #[allow(unused_variables)]
    fn on_evict(&self, pack_key: &PackKey, position: i64, size: i32) {}

    /// The `PackFile` for `pack_key` was closed and its registry entry dropped.
    #[allow(unused_variables)]
    fn on_pack_close(&self, pack_key: &PackKey) {}
}

/// The default listener: observes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventListener;

impl EventListener for NoopEventListener {}
