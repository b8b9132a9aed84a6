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

use thiserror::Error;

/// Raised when a [`Config`](crate::config) fails validation at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("block_size must be a power of two of at least 512 bytes, got {0}")]
    InvalidBlockSize(u32),
    #[error("max_bytes must be greater than zero")]
    ZeroCapacity,
    #[error("stream_ratio must fall within [0.0, 1.0], got {0}")]
    InvalidStreamRatio(f64),
}

/// Errors surfaced by the cache to its callers.
///
/// Reader I/O errors are carried as [`anyhow::Error`] (the same convention the rest of
/// this workspace uses at its async boundaries) rather than a generic type parameter,
/// since a single cache instance may multiplex loaders from unrelated readers whose
/// error types have nothing in common.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to read block from pack: {0}")]
    IoFailure(Arc<anyhow::Error>),
    #[error("exceeded retry budget of {budget} attempt(s) while chasing a stale block")]
    RetryBudgetExhausted { budget: usize },
}
