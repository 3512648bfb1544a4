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

//! Compilation into Decision-DNNF by recursion over the vtree.
//!
//! Three cases drive the recursion. A leaf contributes its variable's pinned
//! literal, or `ONE` when free. A decomposition node conjoins its children's
//! results; the subtrees share no variables, so the conjunction is
//! decomposable by construction. A Shannon node cases on its variable: each
//! branch decides a literal, compiles the remainder, and undoes the decision;
//! the branches disagree on the literal, so the disjunction is deterministic.
//!
//! Every recursive call returns `Result<node, LearnedClause>`. A learned
//! clause aborts the branch that produced it; the Shannon case asserts the
//! clause once the unwind reaches its assertion level and re-enters itself,
//! while decomposition nodes purge the cache under the aborted subtree and
//! pass the clause on.

use nnf::{NnfId, NnfManager};
use sat::{LearnedClause, Lit, SatState, Var};
use vtree::{Vtree, VtreeIdx};

use crate::cache::{CacheValue, FormulaCache};

/// Compiles the formula into a Decision-DNNF rooted in `nnf`, returning the
/// root node. An inconsistent formula compiles to [`NnfManager::ZERO`]. The
/// SAT state is restored before returning.
pub fn compile(
    vtree: &mut Vtree,
    cache: &mut FormulaCache,
    nnf: &mut NnfManager,
    sat: &mut SatState,
) -> NnfId {
    let root = vtree.root();
    let node = if sat.assert_unit_clauses() {
        let mut compilation = Compilation {
            vtree: &mut *vtree,
            cache: &mut *cache,
            nnf: &mut *nnf,
            sat: &mut *sat,
        };
        // A clause bubbling out of the root means the formula is
        // inconsistent.
        compilation.dispatch(root).unwrap_or(NnfManager::ZERO)
    } else {
        NnfManager::ZERO
    };
    sat.undo_assert_unit_clauses();
    nnf.set_root(node);
    tracing::debug!(
        nodes = nnf.len(),
        hits = cache.hits(),
        misses = cache.misses(),
        entries = cache.count(),
        learned = sat.learned_clause_count(),
        "compiled cnf"
    );
    node
}

/// One branch attempt of the Shannon case.
enum Branch {
    /// The branch compiled without learning; case analysis continues.
    Computed(NnfId),
    /// A learned clause was asserted and the re-entered case analysis
    /// finished with this result.
    Finished(NnfId),
}

struct Compilation<'a> {
    vtree: &'a mut Vtree,
    cache: &'a mut FormulaCache,
    nnf: &'a mut NnfManager,
    sat: &'a mut SatState,
}

impl Compilation<'_> {
    fn dispatch(&mut self, v: VtreeIdx) -> Result<NnfId, LearnedClause> {
        if let Some(value) = self.cache.lookup(v, self.vtree, self.sat) {
            let CacheValue::Node(node) = value else {
                unreachable!("count entry in a compilation run");
            };
            return Ok(node);
        }
        let node = if self.vtree.node(v).is_leaf() {
            self.leaf(v)
        } else if self.vtree.is_shannon(v) {
            self.shannon(v)?
        } else {
            self.decomposed(v)?
        };
        // The lookup left v's key current, and the cases restore the SAT
        // state, so the key still describes this residual.
        self.cache
            .insert(v, self.vtree, self.sat, CacheValue::Node(node));
        Ok(node)
    }

    /// The pinned literal of `var`, or `ONE` when free.
    fn literal_or_one(&mut self, var: Var) -> NnfId {
        let pos = Lit::positive(var);
        let neg = Lit::negative(var);
        if self.sat.is_implied(pos) {
            self.nnf.literal_to_node(pos)
        } else if self.sat.is_implied(neg) {
            self.nnf.literal_to_node(neg)
        } else {
            NnfManager::ONE
        }
    }

    fn leaf(&mut self, v: VtreeIdx) -> NnfId {
        let var = self.vtree.node(v).var.expect("leaf node");
        self.literal_or_one(var)
    }

    fn decomposed(&mut self, v: VtreeIdx) -> Result<NnfId, LearnedClause> {
        let node = self.vtree.node(v);
        let (left, right) = (
            node.left.expect("internal node"),
            node.right.expect("internal node"),
        );
        let l = match self.dispatch(left) {
            Ok(l) => l,
            Err(clause) => {
                self.cache.drop_subtree(left, self.vtree);
                return Err(clause);
            }
        };
        let r = match self.dispatch(right) {
            Ok(r) => r,
            Err(clause) => {
                self.cache.drop_subtree(v, self.vtree);
                return Err(clause);
            }
        };
        Ok(self.nnf.conjoin(l, r))
    }

    fn shannon(&mut self, v: VtreeIdx) -> Result<NnfId, LearnedClause> {
        let var = self.vtree.shannon_var(v);
        let right = self.vtree.node(v).right.expect("internal node");

        if self.sat.is_instantiated(var) || self.sat.is_irrelevant(var) {
            let sub = self.dispatch(right)?;
            let leaf = self.literal_or_one(var);
            return Ok(self.nnf.conjoin(sub, leaf));
        }

        let pos = match self.try_literal(v, Lit::positive(var))? {
            Branch::Computed(node) => node,
            Branch::Finished(node) => return Ok(node),
        };
        debug_assert!(!self.sat.is_instantiated(var));
        let neg = match self.try_literal(v, Lit::negative(var))? {
            Branch::Computed(node) => node,
            Branch::Finished(node) => return Ok(node),
        };
        debug_assert!(!self.sat.is_instantiated(var));

        if pos == neg {
            // Both branches compiled to the same function; no decision node
            // is needed.
            return Ok(pos);
        }
        let pl = self.nnf.literal_to_node(Lit::positive(var));
        let nl = self.nnf.literal_to_node(Lit::negative(var));
        let pc = self.nnf.conjoin(pl, pos);
        let nc = self.nnf.conjoin(nl, neg);
        Ok(self.nnf.disjoin(var, pc, nc))
    }

    /// Decides `lit`, compiles the remainder, and undoes the decision. On a
    /// learned clause at this very level, asserts it and re-enters the case
    /// analysis; a clause for a lower level propagates to the caller.
    fn try_literal(&mut self, v: VtreeIdx, lit: Lit) -> Result<Branch, LearnedClause> {
        let right = self.vtree.node(v).right.expect("internal node");
        let mut learned = self.sat.decide_literal(lit);
        let mut node = None;
        if learned.is_none() {
            match self.dispatch(right) {
                Ok(n) => node = Some(n),
                Err(clause) => learned = Some(clause),
            }
        }
        self.sat.undo_decide_literal();
        let Some(clause) = learned else {
            return Ok(Branch::Computed(node.expect("branch compiled")));
        };
        if self.sat.at_assertion_level(&clause) {
            match self.sat.assert_clause(clause) {
                // The branch knowledge is now part of the formula; the case
                // analysis on v starts over against the strengthened state.
                None => self.shannon(v).map(Branch::Finished),
                // The assertion learned again, for some lower level.
                Some(next) => Err(next),
            }
        } else {
            Err(clause)
        }
    }
}
