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

//! Weighted model counting by the same recursion that drives compilation.
//!
//! The traversal is isomorphic to [`compile`](crate::compile::compile):
//! leaves contribute literal weights, decomposition nodes multiply their
//! children's counts, and Shannon nodes sum the two weighted branches.
//! Counting adds one shortcut compilation has no use for: a zero left count
//! at a decomposition node zeroes the product, so the right sub-solve is
//! skipped.

use sat::{LearnedClause, Lit, SatState, Var};
use vtree::{Vtree, VtreeIdx};

use crate::cache::{CacheValue, FormulaCache};

/// Counts the weighted models of the formula. An inconsistent formula counts
/// to 0. The SAT state is restored before returning.
pub fn count(vtree: &mut Vtree, cache: &mut FormulaCache, sat: &mut SatState) -> f64 {
    let root = vtree.root();
    let total = if sat.assert_unit_clauses() {
        let mut counting = Counting {
            vtree: &mut *vtree,
            cache: &mut *cache,
            sat: &mut *sat,
        };
        // A clause bubbling out of the root means the formula is
        // inconsistent.
        counting.dispatch(root).unwrap_or(0.0)
    } else {
        0.0
    };
    sat.undo_assert_unit_clauses();
    tracing::debug!(
        count = total,
        hits = cache.hits(),
        misses = cache.misses(),
        entries = cache.count(),
        learned = sat.learned_clause_count(),
        "counted cnf"
    );
    total
}

/// One branch attempt of the Shannon case.
enum Branch {
    /// The branch counted without learning; case analysis continues.
    Computed(f64),
    /// A learned clause was asserted and the re-entered case analysis
    /// finished with this count.
    Finished(f64),
}

struct Counting<'a> {
    vtree: &'a mut Vtree,
    cache: &'a mut FormulaCache,
    sat: &'a mut SatState,
}

impl Counting<'_> {
    fn dispatch(&mut self, v: VtreeIdx) -> Result<f64, LearnedClause> {
        if let Some(value) = self.cache.lookup(v, self.vtree, self.sat) {
            let CacheValue::Count(count) = value else {
                unreachable!("nnf entry in a counting run");
            };
            return Ok(count);
        }
        let count = if self.vtree.node(v).is_leaf() {
            let var = self.vtree.node(v).var.expect("leaf node");
            self.weight_of(var)
        } else if self.vtree.is_shannon(v) {
            self.shannon(v)?
        } else {
            self.decomposed(v)?
        };
        self.cache
            .insert(v, self.vtree, self.sat, CacheValue::Count(count));
        Ok(count)
    }

    /// The weight a variable contributes on its own: its pinned literal's
    /// weight, or the sum of both literals' weights when free.
    fn weight_of(&self, var: Var) -> f64 {
        let pos = Lit::positive(var);
        let neg = Lit::negative(var);
        if self.sat.is_implied(pos) {
            self.sat.literal_weight(pos)
        } else if self.sat.is_implied(neg) {
            self.sat.literal_weight(neg)
        } else {
            self.sat.literal_weight(pos) + self.sat.literal_weight(neg)
        }
    }

    fn decomposed(&mut self, v: VtreeIdx) -> Result<f64, LearnedClause> {
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
        if l == 0.0 {
            // The product is zero whatever the right side counts.
            return Ok(0.0);
        }
        let r = match self.dispatch(right) {
            Ok(r) => r,
            Err(clause) => {
                self.cache.drop_subtree(v, self.vtree);
                return Err(clause);
            }
        };
        Ok(l * r)
    }

    fn shannon(&mut self, v: VtreeIdx) -> Result<f64, LearnedClause> {
        let var = self.vtree.shannon_var(v);
        let right = self.vtree.node(v).right.expect("internal node");

        if self.sat.is_instantiated(var) || self.sat.is_irrelevant(var) {
            let sub = self.dispatch(right)?;
            return Ok(sub * self.weight_of(var));
        }

        let pos = match self.try_literal(v, Lit::positive(var))? {
            Branch::Computed(count) => count,
            Branch::Finished(count) => return Ok(count),
        };
        debug_assert!(!self.sat.is_instantiated(var));
        let neg = match self.try_literal(v, Lit::negative(var))? {
            Branch::Computed(count) => count,
            Branch::Finished(count) => return Ok(count),
        };
        debug_assert!(!self.sat.is_instantiated(var));

        Ok(pos * self.sat.literal_weight(Lit::positive(var))
            + neg * self.sat.literal_weight(Lit::negative(var)))
    }

    /// Decides `lit`, counts the remainder, and undoes the decision; learned
    /// clauses are handled exactly as in compilation.
    fn try_literal(&mut self, v: VtreeIdx, lit: Lit) -> Result<Branch, LearnedClause> {
        let right = self.vtree.node(v).right.expect("internal node");
        let mut learned = self.sat.decide_literal(lit);
        let mut count = None;
        if learned.is_none() {
            match self.dispatch(right) {
                Ok(c) => count = Some(c),
                Err(clause) => learned = Some(clause),
            }
        }
        self.sat.undo_decide_literal();
        let Some(clause) = learned else {
            return Ok(Branch::Computed(count.expect("branch counted")));
        };
        if self.sat.at_assertion_level(&clause) {
            match self.sat.assert_clause(clause) {
                None => self.shannon(v).map(Branch::Finished),
                Some(next) => Err(next),
            }
        } else {
            Err(clause)
        }
    }
}
