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

#![deny(unreachable_pub)]
//! A hash-consed store of NNF nodes, shaped for Decision-DNNF.
//!
//! The store deduplicates nodes structurally, so [`NnfId`] handles compare by
//! identity: two equal handles denote the same function. Conjunctions are
//! binary with canonicalized argument order; disjunctions are decision nodes
//! `(x ∧ f) ∨ (¬x ∧ g)` recording their decision variable. The constants
//! [`NnfManager::ZERO`] and [`NnfManager::ONE`] sit at fixed ids in every
//! manager.
//!
//! [`query`] hosts the model counters and the structural checks, [`io`] the
//! `.nnf` text format.

pub mod io;
pub mod query;

use std::collections::HashMap;

use sat::{Lit, Var};

/// A handle to a stored NNF node. Equal handles denote equal functions.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NnfId(u32);

impl NnfId {
    /// The raw store index.
    pub fn get(self) -> usize {
        self.0 as usize
    }
}

/// A stored NNF node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum NnfNode {
    /// The false function.
    False,
    /// The true function.
    True,
    /// A literal.
    Literal(Lit),
    /// A decomposable conjunction.
    And(NnfId, NnfId),
    /// A decision `(var ∧ pos) ∨ (¬var ∧ neg)`; `pos` and `neg` already
    /// carry the variable's literals.
    Decision {
        /// The decision variable.
        var: Var,
        /// The branch under the positive literal.
        pos: NnfId,
        /// The branch under the negative literal.
        neg: NnfId,
    },
}

/// The hash-consed NNF store.
pub struct NnfManager {
    nodes: Vec<NnfNode>,
    dedup: HashMap<NnfNode, NnfId>,
    var_count: u32,
    root: Option<NnfId>,
}

impl NnfManager {
    /// The false constant.
    pub const ZERO: NnfId = NnfId(0);
    /// The true constant.
    pub const ONE: NnfId = NnfId(1);

    /// Creates a store over `var_count` variables.
    pub fn new(var_count: u32) -> NnfManager {
        NnfManager {
            nodes: vec![NnfNode::False, NnfNode::True],
            dedup: HashMap::new(),
            var_count,
            root: None,
        }
    }

    /// The number of variables the store ranges over.
    pub fn var_count(&self) -> u32 {
        self.var_count
    }

    /// The total number of stored nodes, constants included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store is empty; it never is.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node behind a handle.
    pub fn node(&self, id: NnfId) -> NnfNode {
        self.nodes[id.get()]
    }

    fn intern(&mut self, node: NnfNode) -> NnfId {
        if let Some(&id) = self.dedup.get(&node) {
            return id;
        }
        let id = NnfId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.dedup.insert(node, id);
        id
    }

    /// The node for a literal.
    pub fn literal_to_node(&mut self, lit: Lit) -> NnfId {
        debug_assert!(lit.var().get() <= self.var_count);
        self.intern(NnfNode::Literal(lit))
    }

    /// Conjoins two nodes. `ZERO` absorbs, `ONE` is neutral, and conjoining
    /// a node with itself returns it; argument order does not matter.
    pub fn conjoin(&mut self, a: NnfId, b: NnfId) -> NnfId {
        if a == Self::ZERO || b == Self::ZERO {
            return Self::ZERO;
        }
        if a == Self::ONE {
            return b;
        }
        if b == Self::ONE || a == b {
            return a;
        }
        let (a, b) = if a.0 <= b.0 { (a, b) } else { (b, a) };
        self.intern(NnfNode::And(a, b))
    }

    /// Disjoins the two branches of a decision on `var`. `ONE` absorbs and
    /// `ZERO` is neutral; otherwise `a` must entail the positive literal of
    /// `var` and `b` its negation, which the compiler guarantees by
    /// conjoining the literals in before calling.
    pub fn disjoin(&mut self, var: Var, a: NnfId, b: NnfId) -> NnfId {
        if a == Self::ONE || b == Self::ONE {
            return Self::ONE;
        }
        if a == Self::ZERO {
            return b;
        }
        if b == Self::ZERO {
            return a;
        }
        self.intern(NnfNode::Decision { var, pos: a, neg: b })
    }

    /// Designates the root of the compiled NNF.
    pub fn set_root(&mut self, id: NnfId) {
        self.root = Some(id);
    }

    /// The designated root, if set.
    pub fn root(&self) -> Option<NnfId> {
        self.root
    }

    /// Node and edge counts of the NNF rooted at `from`.
    pub fn size(&self, from: NnfId) -> (usize, usize) {
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![from];
        let (mut nodes, mut edges) = (0usize, 0usize);
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.get()], true) {
                continue;
            }
            nodes += 1;
            match self.nodes[id.get()] {
                NnfNode::And(a, b) | NnfNode::Decision { pos: a, neg: b, .. } => {
                    edges += 2;
                    stack.push(a);
                    stack.push(b);
                }
                _ => {}
            }
        }
        (nodes, edges)
    }

    /// Rough memory footprint of the store, in bytes.
    pub fn memory(&self) -> usize {
        self.nodes.len() * size_of::<NnfNode>()
            + self.dedup.capacity() * size_of::<(NnfNode, NnfId)>()
    }

    /// The reachable nodes under `from`, children before parents.
    pub(crate) fn topological(&self, from: NnfId) -> Vec<NnfId> {
        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut stack = vec![(from, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            if std::mem::replace(&mut visited[id.get()], true) {
                continue;
            }
            stack.push((id, true));
            if let NnfNode::And(a, b) | NnfNode::Decision { pos: a, neg: b, .. } =
                self.nodes[id.get()]
            {
                stack.push((a, false));
                stack.push((b, false));
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_fixed() {
        let m = NnfManager::new(3);
        assert_eq!(m.node(NnfManager::ZERO), NnfNode::False);
        assert_eq!(m.node(NnfManager::ONE), NnfNode::True);
    }

    #[test]
    fn literals_are_hash_consed() {
        let mut m = NnfManager::new(2);
        let a = m.literal_to_node(Lit::new(1));
        let b = m.literal_to_node(Lit::new(1));
        let c = m.literal_to_node(Lit::new(-1));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn conjoin_identities() {
        let mut m = NnfManager::new(2);
        let x = m.literal_to_node(Lit::new(1));
        assert_eq!(m.conjoin(NnfManager::ZERO, x), NnfManager::ZERO);
        assert_eq!(m.conjoin(x, NnfManager::ONE), x);
        assert_eq!(m.conjoin(x, x), x);
        let y = m.literal_to_node(Lit::new(2));
        assert_eq!(m.conjoin(x, y), m.conjoin(y, x));
    }

    #[test]
    fn disjoin_identities() {
        let mut m = NnfManager::new(2);
        let x = m.literal_to_node(Lit::new(1));
        assert_eq!(m.disjoin(Var::new(1), NnfManager::ONE, x), NnfManager::ONE);
        assert_eq!(m.disjoin(Var::new(1), NnfManager::ZERO, x), x);
        assert_eq!(m.disjoin(Var::new(1), x, NnfManager::ZERO), x);
    }

    #[test]
    fn size_counts_shared_nodes_once() {
        let mut m = NnfManager::new(3);
        let x = m.literal_to_node(Lit::new(1));
        let y = m.literal_to_node(Lit::new(2));
        let xy = m.conjoin(x, y);
        let nx = m.literal_to_node(Lit::new(-1));
        let nxy = m.conjoin(nx, y);
        let d = m.disjoin(Var::new(1), xy, nxy);
        let (nodes, edges) = m.size(d);
        // d, xy, nxy, x, -x, y: the shared y is counted once.
        assert_eq!(nodes, 6);
        assert_eq!(edges, 6);
    }
}
