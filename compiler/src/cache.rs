// This file is part of dryad.
// Copyright (C) 2026 Dryad Developers
// SPDX-License-Identifier: Apache-2.0
// Licensed under the Apache License, Version 2.0 (the "License");
// You may not use this file except in compliance with the License.
// You may obtain a copy of the License at
// http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The formula cache: a chained hash table from `(vtree node, component
//! key)` to a computed value, either a weighted count or an NNF node.
//!
//! Entries live in a slab with a free list and are threaded through two
//! lists at once: their hash bucket's collision list, doubly linked so any
//! entry unlinks in O(1), and their owning vtree node's entry list, which
//! lets [`drop_subtree`](FormulaCache::drop_subtree) purge a whole subtree
//! when a learned clause invalidates it. The bucket count is fixed for the
//! run; there is no eviction and no rehashing.
//!
//! Caching happens at Shannon nodes only: decomposition results are already
//! cached at their children, and a node whose Shannon variable is pinned
//! could conflate distinct residuals that share a key.

use nnf::NnfId;
use sat::SatState;
use vtree::{Vtree, VtreeIdx};

use crate::key::construct_key;

/// The default bucket count, a prime.
pub const DEFAULT_CACHE_CAPACITY: usize = 2_015_179;

/// A cached computation result. A run caches counts or nodes, never both.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CacheValue {
    /// A weighted model count.
    Count(f64),
    /// A compiled NNF node.
    Node(NnfId),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct EntryId(u32);

/// What precedes an entry in its collision list: the bucket head or another
/// entry. Unlinking rewrites exactly one of the two.
#[derive(Clone, Copy, Debug)]
enum PrevLink {
    Bucket(usize),
    Entry(EntryId),
}

struct CacheEntry {
    vtree: VtreeIdx,
    key: Box<[u8]>,
    value: CacheValue,
    next: Option<EntryId>,
    prev: PrevLink,
    node_next: Option<EntryId>,
}

enum Slot {
    Occupied(CacheEntry),
    Free(Option<EntryId>),
}

/// Statistics recomputed by walking the whole table; see
/// [`FormulaCache::audit`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheAudit {
    /// Live entries found.
    pub entries: usize,
    /// Bytes of entry storage found.
    pub memory: usize,
    /// Longest collision list.
    pub max_chain: usize,
    /// Mean collision list length over non-empty buckets.
    pub avg_chain: f64,
    /// Mean key size in bytes over live entries.
    pub avg_key: f64,
}

/// The formula cache.
pub struct FormulaCache {
    buckets: Vec<Option<EntryId>>,
    slots: Vec<Slot>,
    free_head: Option<EntryId>,
    /// Head of the per-node entry list, indexed by vtree arena index.
    node_heads: Vec<Option<EntryId>>,
    count: usize,
    memory: usize,
    hits: u64,
    misses: u64,
}

impl FormulaCache {
    /// Creates a cache with `capacity` buckets for the given vtree.
    pub fn new(capacity: usize, vtree: &Vtree) -> FormulaCache {
        assert!(capacity > 0);
        FormulaCache {
            buckets: vec![None; capacity],
            slots: Vec::new(),
            free_head: None,
            node_heads: vec![None; vtree.len()],
            count: 0,
            memory: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Live entries.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Bytes used by entries: header plus owned key, per entry.
    pub fn memory(&self) -> usize {
        self.memory
    }

    /// Lookup hits so far.
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Lookup misses so far.
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Which nodes participate in caching: eligible nodes are Shannon nodes
    /// with `live_cache` set whose Shannon variable is not currently pinned.
    fn should_cache(&self, vtree: &Vtree, sat: &SatState, v: VtreeIdx) -> bool {
        vtree.node(v).live_cache
            && vtree.is_shannon(v)
            && !sat.is_instantiated(vtree.shannon_var(v))
    }

    /// Looks up the residual at `v`, constructing its key as a side effect.
    /// The key and hash stay current on the node, and
    /// [`insert`](FormulaCache::insert) relies on that: the SAT state must
    /// not change in between.
    pub fn lookup(&mut self, v: VtreeIdx, vtree: &mut Vtree, sat: &SatState) -> Option<CacheValue> {
        if !self.should_cache(vtree, sat, v) {
            return None;
        }
        construct_key(vtree, v, sat);
        let node = vtree.node(v);
        let bucket = (node.key_hashcode % self.buckets.len() as u64) as usize;
        let mut cursor = self.buckets[bucket];
        while let Some(id) = cursor {
            let entry = self.entry(id);
            if entry.vtree == v && entry.key[..] == node.key[..] {
                let value = entry.value;
                self.hits += 1;
                return Some(value);
            }
            cursor = entry.next;
        }
        self.misses += 1;
        None
    }

    /// Inserts the value computed for the residual whose key a just-missed
    /// [`lookup`](FormulaCache::lookup) left on `v`.
    pub fn insert(&mut self, v: VtreeIdx, vtree: &Vtree, sat: &SatState, value: CacheValue) {
        if !self.should_cache(vtree, sat, v) {
            return;
        }
        let node = vtree.node(v);
        debug_assert!(node.cached_size > 0);
        let bucket = (node.key_hashcode % self.buckets.len() as u64) as usize;
        let entry = CacheEntry {
            vtree: v,
            key: node.key.clone().into_boxed_slice(),
            value,
            next: self.buckets[bucket],
            prev: PrevLink::Bucket(bucket),
            node_next: self.node_heads[v.get()],
        };
        let key_size = entry.key.len();
        let id = self.alloc(entry);
        if let Some(head) = self.buckets[bucket] {
            self.entry_mut(head).prev = PrevLink::Entry(id);
        }
        self.buckets[bucket] = Some(id);
        self.node_heads[v.get()] = Some(id);
        self.count += 1;
        self.memory += size_of::<CacheEntry>() + key_size;
    }

    /// Purges every entry owned by a node in `v`'s subtree. Called when a
    /// learned clause invalidates the residuals cached below a decision.
    pub fn drop_subtree(&mut self, v: VtreeIdx, vtree: &Vtree) {
        let mut stack = vec![v];
        while let Some(v) = stack.pop() {
            let node = vtree.node(v);
            let (Some(left), Some(right)) = (node.left, node.right) else {
                continue; // leaves own no entries
            };
            let mut cursor = self.node_heads[v.get()];
            while let Some(id) = cursor {
                cursor = self.entry(id).node_next;
                self.unlink(id);
                self.release(id);
            }
            self.node_heads[v.get()] = None;
            stack.push(left);
            stack.push(right);
        }
    }

    /// Entries owned by nodes in `v`'s subtree; tests use this to verify
    /// purge completeness.
    pub fn subtree_entry_count(&self, v: VtreeIdx, vtree: &Vtree) -> usize {
        let mut total = 0;
        let mut stack = vec![v];
        while let Some(v) = stack.pop() {
            let mut cursor = self.node_heads[v.get()];
            while let Some(id) = cursor {
                total += 1;
                cursor = self.entry(id).node_next;
            }
            if let (Some(left), Some(right)) = (vtree.node(v).left, vtree.node(v).right) {
                stack.push(left);
                stack.push(right);
            }
        }
        total
    }

    /// Recomputes the statistics by walking every bucket. The walked entry
    /// and memory totals must match the running counters.
    pub fn audit(&self) -> CacheAudit {
        let mut audit = CacheAudit::default();
        let mut occupied_buckets = 0usize;
        let mut total_keys = 0usize;
        for &head in &self.buckets {
            let mut chain = 0usize;
            let mut cursor = head;
            while let Some(id) = cursor {
                let entry = self.entry(id);
                chain += 1;
                total_keys += entry.key.len();
                audit.memory += size_of::<CacheEntry>() + entry.key.len();
                cursor = entry.next;
            }
            if chain > 0 {
                occupied_buckets += 1;
                audit.entries += chain;
                audit.max_chain = audit.max_chain.max(chain);
            }
        }
        if occupied_buckets > 0 {
            audit.avg_chain = audit.entries as f64 / occupied_buckets as f64;
        }
        if audit.entries > 0 {
            audit.avg_key = total_keys as f64 / audit.entries as f64;
        }
        audit
    }

    fn entry(&self, id: EntryId) -> &CacheEntry {
        match &self.slots[id.0 as usize] {
            Slot::Occupied(entry) => entry,
            Slot::Free(_) => unreachable!("entry id points at a free slot"),
        }
    }

    fn entry_mut(&mut self, id: EntryId) -> &mut CacheEntry {
        match &mut self.slots[id.0 as usize] {
            Slot::Occupied(entry) => entry,
            Slot::Free(_) => unreachable!("entry id points at a free slot"),
        }
    }

    fn alloc(&mut self, entry: CacheEntry) -> EntryId {
        match self.free_head {
            Some(id) => {
                let Slot::Free(next_free) = self.slots[id.0 as usize] else {
                    unreachable!("free head points at an occupied slot");
                };
                self.free_head = next_free;
                self.slots[id.0 as usize] = Slot::Occupied(entry);
                id
            }
            None => {
                let id = EntryId(self.slots.len() as u32);
                self.slots.push(Slot::Occupied(entry));
                id
            }
        }
    }

    /// Detaches an entry from its collision list and updates the counters.
    fn unlink(&mut self, id: EntryId) {
        let (next, prev, key_size) = {
            let entry = self.entry(id);
            (entry.next, entry.prev, entry.key.len())
        };
        match prev {
            PrevLink::Bucket(b) => self.buckets[b] = next,
            PrevLink::Entry(p) => self.entry_mut(p).next = next,
        }
        if let Some(n) = next {
            self.entry_mut(n).prev = prev;
        }
        self.count -= 1;
        self.memory -= size_of::<CacheEntry>() + key_size;
    }

    fn release(&mut self, id: EntryId) {
        self.slots[id.0 as usize] = Slot::Free(self.free_head);
        self.free_head = Some(id);
    }
}
