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

/// A value that reports its own eviction weight in bytes.
///
/// The cache adds a small fixed overhead on top of this to account for the key and
/// bookkeeping it keeps per entry; callers only need to report the payload's own size.
pub trait Weighted {
    fn weight(&self) -> usize;
}
