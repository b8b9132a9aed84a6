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

//! A doubly linked recency list, indexed by slot handle rather than raw pointer.
//!
//! This backs the approximate-LRU eviction order of the weighted cache. It is
//! intentionally index-based (a [`Vec`] slab plus a free list) instead of an
//! intrusive pointer chain: there is no `unsafe` anywhere in this module.

pub type Token = usize;

struct Node<K> {
    key: K,
    prev: Option<Token>,
    next: Option<Token>,
}

/// An LRU order over keys of type `K`. The caller is responsible for keeping its own
/// key -> [`Token`] index; this structure only tracks ordering.
pub struct LruList<K> {
    slots: Vec<Option<Node<K>>>,
    free: Vec<Token>,
    head: Option<Token>, // most recently used
    tail: Option<Token>, // least recently used
}

impl<K> Default for LruList<K> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }
}

impl<K> LruList<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts `key` as the most-recently-used entry and returns its token.
    pub fn push_front(&mut self, key: K) -> Token {
        let node = Node {
            key,
            prev: None,
            next: self.head,
        };
        let token = match self.free.pop() {
            Some(t) => {
                self.slots[t] = Some(node);
                t
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        if let Some(head) = self.head {
            self.slots[head].as_mut().expect("head slot vacant").prev = Some(token);
        }
        self.head = Some(token);
        if self.tail.is_none() {
            self.tail = Some(token);
        }
        token
    }

    /// Moves an already-tracked token to the front (most-recently-used position).
    pub fn move_to_front(&mut self, token: Token) {
        if self.head == Some(token) {
            return;
        }
        self.unlink(token);
        let head = self.head;
        {
            let node = self.slots[token].as_mut().expect("token not tracked");
            node.prev = None;
            node.next = head;
        }
        if let Some(head) = head {
            self.slots[head].as_mut().expect("head slot vacant").prev = Some(token);
        }
        self.head = Some(token);
        if self.tail.is_none() {
            self.tail = Some(token);
        }
    }

    /// Removes `token` from the list, returning its key.
    pub fn remove(&mut self, token: Token) -> K {
        self.unlink(token);
        let node = self.slots[token].take().expect("token not tracked");
        self.free.push(token);
        node.key
    }

    /// Removes and returns the least-recently-used key, if any.
    pub fn pop_back(&mut self) -> Option<(Token, K)> {
        let tail = self.tail?;
        let key = self.remove(tail);
        Some((tail, key))
    }

    fn unlink(&mut self, token: Token) {
        let (prev, next) = {
            let node = self.slots[token].as_ref().expect("token not tracked");
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().expect("prev slot vacant").next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().expect("next slot vacant").prev = prev,
            None => self.tail = prev,
        }
    }
}
