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

//! A generic, weighted, concurrent cache with a singleton-per-key loader.
//!
//! This crate knows nothing about pack files or blocks; it is the same kind of
//! general-purpose building block `foyer-memory` is to `foyer`. The pack-aware layer
//! lives in the `blockcache` crate.

pub mod cache;
pub mod listener;
pub mod lru_list;
pub mod weighted;

pub mod prelude {
    pub use crate::cache::{WeightedCache, WeightedCacheBuilder};
    pub use crate::listener::{EvictionCause, EvictionListener, NoopListener};
    pub use crate::weighted::Weighted;
}
