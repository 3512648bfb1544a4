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

//! Queries over the rooted NNF: model counts, structural checks,
//! conditioning, and clausal entailment.
//!
//! Counting works bottom-up over per-node variable sets. A node's count
//! ranges over the variables appearing under it; decision nodes and the root
//! fill the gap for variables free in one branch but not the other (each gap
//! variable doubles the unweighted count, or contributes `w(+v) + w(−v)` to
//! the weighted one).

use bitvec::prelude::*;
use num_bigint::BigUint;

use sat::{ClauseIdx, Lit, SatState};

use crate::{NnfId, NnfManager, NnfNode};

type VarSet = BitVec<u64, Lsb0>;

fn intersects(a: &VarSet, b: &VarSet) -> bool {
    a.as_raw_slice()
        .iter()
        .zip(b.as_raw_slice())
        .any(|(x, y)| x & y != 0)
}

fn union_into(dst: &mut VarSet, src: &VarSet) {
    for (d, s) in dst.as_raw_mut_slice().iter_mut().zip(src.as_raw_slice()) {
        *d |= s;
    }
}

/// Reachable nodes in child-first order, with each node's variable set and
/// its position by id.
struct Analysis {
    order: Vec<NnfId>,
    index_of: Vec<usize>,
    varsets: Vec<VarSet>,
}

impl NnfManager {
    fn analyze(&self, from: NnfId) -> Analysis {
        let order = self.topological(from);
        let mut index_of = vec![usize::MAX; self.len()];
        for (i, id) in order.iter().enumerate() {
            index_of[id.get()] = i;
        }
        let bits = self.var_count() as usize + 1;
        let mut varsets: Vec<VarSet> = Vec::with_capacity(order.len());
        for &id in &order {
            let mut set = bitvec![u64, Lsb0; 0; bits];
            match self.node(id) {
                NnfNode::False | NnfNode::True => {}
                NnfNode::Literal(lit) => set.set(lit.var().get() as usize, true),
                NnfNode::And(a, b) => {
                    union_into(&mut set, &varsets[index_of[a.get()]]);
                    union_into(&mut set, &varsets[index_of[b.get()]]);
                }
                NnfNode::Decision { var, pos, neg } => {
                    union_into(&mut set, &varsets[index_of[pos.get()]]);
                    union_into(&mut set, &varsets[index_of[neg.get()]]);
                    set.set(var.get() as usize, true);
                }
            }
            varsets.push(set);
        }
        Analysis {
            order,
            index_of,
            varsets,
        }
    }

    /// The exact model count of the rooted NNF over the manager's variables.
    ///
    /// Assumes the root has been designated with
    /// [`set_root`](NnfManager::set_root).
    pub fn model_count(&self) -> BigUint {
        let root = self.root().expect("root designated");
        let analysis = self.analyze(root);
        let mut counts: Vec<BigUint> = Vec::with_capacity(analysis.order.len());
        for (i, &id) in analysis.order.iter().enumerate() {
            let count = match self.node(id) {
                NnfNode::False => BigUint::ZERO,
                NnfNode::True | NnfNode::Literal(_) => BigUint::from(1u32),
                NnfNode::And(a, b) => {
                    &counts[analysis.index_of[a.get()]] * &counts[analysis.index_of[b.get()]]
                }
                NnfNode::Decision { pos, neg, .. } => {
                    let vars = analysis.varsets[i].count_ones();
                    let (p, n) = (analysis.index_of[pos.get()], analysis.index_of[neg.get()]);
                    (&counts[p] << (vars - analysis.varsets[p].count_ones()))
                        + (&counts[n] << (vars - analysis.varsets[n].count_ones()))
                }
            };
            counts.push(count);
        }
        let root_index = analysis.index_of[root.get()];
        let gap = self.var_count() as usize - analysis.varsets[root_index].count_ones();
        counts.swap_remove(root_index) << gap
    }

    /// The weighted model count of the rooted NNF under the state's literal
    /// weights. Variables free in a branch contribute `w(+v) + w(−v)`.
    pub fn weighted_model_count(&self, sat: &SatState) -> f64 {
        let both = |v: usize| {
            let var = sat::Var::new(v as u32);
            sat.literal_weight(Lit::positive(var)) + sat.literal_weight(Lit::negative(var))
        };
        let root = self.root().expect("root designated");
        let analysis = self.analyze(root);
        let mut weights: Vec<f64> = Vec::with_capacity(analysis.order.len());
        for (i, &id) in analysis.order.iter().enumerate() {
            let weight = match self.node(id) {
                NnfNode::False => 0.0,
                NnfNode::True => 1.0,
                NnfNode::Literal(lit) => sat.literal_weight(lit),
                NnfNode::And(a, b) => {
                    weights[analysis.index_of[a.get()]] * weights[analysis.index_of[b.get()]]
                }
                NnfNode::Decision { pos, neg, .. } => {
                    let vars = &analysis.varsets[i];
                    let mut total = 0.0;
                    for branch in [pos, neg] {
                        let b = analysis.index_of[branch.get()];
                        let mut w = weights[b];
                        for v in vars.iter_ones() {
                            if !analysis.varsets[b][v] {
                                w *= both(v);
                            }
                        }
                        total += w;
                    }
                    total
                }
            };
            weights.push(weight);
        }
        let root_index = analysis.index_of[root.get()];
        let mut total = weights[root_index];
        for v in 1..=self.var_count() as usize {
            if !analysis.varsets[root_index][v] {
                total *= both(v);
            }
        }
        total
    }

    /// Whether every conjunction under the root is over disjoint variables.
    pub fn decomposable(&self) -> bool {
        let root = self.root().expect("root designated");
        let analysis = self.analyze(root);
        analysis.order.iter().all(|&id| match self.node(id) {
            NnfNode::And(a, b) => !intersects(
                &analysis.varsets[analysis.index_of[a.get()]],
                &analysis.varsets[analysis.index_of[b.get()]],
            ),
            _ => true,
        })
    }

    /// Whether every decision node's branches force opposite values of its
    /// variable.
    pub fn deterministic(&self) -> bool {
        let root = self.root().expect("root designated");
        let n = self.var_count() as usize;
        self.topological(root).iter().all(|&id| match self.node(id) {
            NnfNode::Decision { var, pos, neg } => {
                let mut against = vec![None; n + 1];
                against[var.get() as usize] = Some(false);
                let pos_ok = !self.satisfiable_under_from(pos, &against);
                against[var.get() as usize] = Some(true);
                pos_ok && !self.satisfiable_under_from(neg, &against)
            }
            _ => true,
        })
    }

    /// Whether the rooted NNF is satisfiable once the given variables are
    /// pinned. `assignment` is indexed by variable, entry 0 unused.
    pub fn satisfiable_under(&self, assignment: &[Option<bool>]) -> bool {
        let root = self.root().expect("root designated");
        self.satisfiable_under_from(root, assignment)
    }

    fn satisfiable_under_from(&self, from: NnfId, assignment: &[Option<bool>]) -> bool {
        let order = self.topological(from);
        let mut index_of = vec![usize::MAX; self.len()];
        let mut value = Vec::with_capacity(order.len());
        for (i, &id) in order.iter().enumerate() {
            index_of[id.get()] = i;
            let v = match self.node(id) {
                NnfNode::False => false,
                NnfNode::True => true,
                NnfNode::Literal(lit) => {
                    assignment[lit.var().get() as usize] != Some(!lit.is_positive())
                }
                NnfNode::And(a, b) => value[index_of[a.get()]] && value[index_of[b.get()]],
                NnfNode::Decision { pos, neg, .. } => {
                    value[index_of[pos.get()]] || value[index_of[neg.get()]]
                }
            };
            value.push(v);
        }
        value[index_of[from.get()]]
    }

    /// Whether the rooted NNF entails every input clause of the state.
    ///
    /// Sound for the Decision-DNNFs this store holds: a clause is entailed
    /// iff the NNF conditioned on the clause's negation is unsatisfiable.
    pub fn entails_cnf(&self, sat: &SatState) -> bool {
        let n = sat.var_count() as usize;
        'clauses: for c in 1..=sat.clause_count() as u32 {
            let mut against = vec![None; n + 1];
            for &lit in sat.clause_literals(ClauseIdx::new(c)) {
                let v = lit.var().get() as usize;
                if against[v] == Some(lit.is_positive()) {
                    continue 'clauses; // tautological clause
                }
                against[v] = Some(!lit.is_positive());
            }
            if self.satisfiable_under(&against) {
                return false;
            }
        }
        true
    }
}
