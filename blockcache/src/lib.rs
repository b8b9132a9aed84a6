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

//! A content-addressed block cache sitting in front of a pack-file object store.
//!
//! This crate is the pack-aware layer built on top of the generic [`blockcache_memory`]
//! weighted cache: it owns the [`PackKey`]/[`BlockKey`] identity model, the
//! [`PackRegistry`] that enforces one live [`PackFile`] per description, and the
//! [`BlockCache`] facade that couples the two together so that evicting a pack's last
//! cached block or index artifact also closes its `PackFile`.

pub mod builder;
pub mod cache;
pub mod config;
pub mod global;
pub mod key;
pub mod lifetime;
pub mod listener;
pub mod pack;
pub mod refs;
pub mod registry;

pub mod prelude {
    pub use crate::builder::BlockCacheBuilder;
    pub use crate::cache::BlockCache;
    pub use crate::config::Config;
    pub use crate::global::Global;
    pub use crate::key::{BlockKey, PackDescription, PackKey};
    pub use crate::listener::{EventListener, NoopEventListener};
    pub use crate::pack::{Block, PackFile, PackFileFactory};
    pub use crate::refs::Ref;
    pub use crate::registry::PackRegistry;
}

pub use prelude::*;
