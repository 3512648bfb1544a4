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

//! The SAT state: an assignment trail with decision levels, unit resolution,
//! and first-UIP clause learning.
//!
//! Unit resolution is counter-based: each clause tracks how many of its
//! literals are currently true and false, and the counters are updated as the
//! trail grows and shrinks. The same counters answer the subsumption and
//! relevance queries the compiler needs at every vtree node, which is why
//! this scheme is used instead of watched literals.
//!
//! Invariant: every literal on the trail has had its counter effects applied
//! by the time any public operation returns. Undo operations pop the trail
//! and reverse exactly those effects.

use crate::cnf::{ClauseIdx, Cnf, Lit, Var, slot};

/// A clause derived from a conflict, not (yet) part of the formula.
///
/// The first literal is the asserting literal: at the clause's assertion
/// level all other literals are false, so asserting the clause immediately
/// implies it. A contradiction at decision level 0 yields the empty clause,
/// which can never be asserted and escapes to the root of the compilation.
#[derive(Clone, Debug, PartialEq)]
pub struct LearnedClause {
    lits: Vec<Lit>,
    assertion_level: u32,
}

impl LearnedClause {
    /// The literals of the clause, asserting literal first.
    pub fn literals(&self) -> &[Lit] {
        &self.lits
    }

    /// The decision level at which this clause becomes unit.
    pub fn assertion_level(&self) -> u32 {
        self.assertion_level
    }

    /// Whether this is the empty clause (contradiction at level 0).
    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Reason {
    Decision,
    Clause(usize),
}

struct ClauseData {
    lits: Vec<Lit>,
    /// Literals currently assigned true, counting only trail entries whose
    /// counter effects have been applied.
    true_count: u32,
    false_count: u32,
}

/// The live SAT state over a CNF formula.
pub struct SatState {
    var_count: u32,
    input_clause_count: usize,
    clauses: Vec<ClauseData>,
    weights: Vec<f64>,
    /// Per variable (1-based): current value, if any.
    values: Vec<Option<bool>>,
    levels: Vec<u32>,
    reasons: Vec<Reason>,
    trail: Vec<Lit>,
    /// Trail length at the time of each decision; the decision level is the
    /// length of this stack.
    trail_lim: Vec<usize>,
    /// Per literal slot: clause slots (input and learned) containing it.
    occurs: Vec<Vec<usize>>,
    /// Per variable: input clauses mentioning it, in ascending index order.
    var_clauses: Vec<Vec<ClauseIdx>>,
    /// Per variable: literal occurrences in non-subsumed input clauses.
    /// Zero means every clause mentioning the variable is subsumed.
    free_mentions: Vec<u32>,
    units_asserted: bool,
    /// Conflict-analysis scratch, indexed by variable.
    seen: Vec<bool>,
}

impl SatState {
    /// Builds the state for a formula. No propagation happens yet; call
    /// [`assert_unit_clauses`](SatState::assert_unit_clauses) to start a run.
    pub fn new(cnf: Cnf) -> SatState {
        let (var_count, clause_lits, weights) = cnf.into_parts();
        let n = var_count as usize;
        let mut occurs = vec![Vec::new(); 2 * n + 2];
        let mut var_clauses = vec![Vec::new(); n + 1];
        let mut free_mentions = vec![0u32; n + 1];
        let mut clauses = Vec::with_capacity(clause_lits.len());
        for (i, lits) in clause_lits.into_iter().enumerate() {
            for &lit in &lits {
                occurs[slot(lit)].push(i);
                free_mentions[lit.var().get() as usize] += 1;
                let mentions = &mut var_clauses[lit.var().get() as usize];
                if mentions.last() != Some(&ClauseIdx::new(i as u32 + 1)) {
                    mentions.push(ClauseIdx::new(i as u32 + 1));
                }
            }
            clauses.push(ClauseData {
                lits,
                true_count: 0,
                false_count: 0,
            });
        }
        SatState {
            var_count,
            input_clause_count: clauses.len(),
            clauses,
            weights,
            values: vec![None; n + 1],
            levels: vec![0; n + 1],
            reasons: vec![Reason::Decision; n + 1],
            trail: Vec::new(),
            trail_lim: Vec::new(),
            occurs,
            var_clauses,
            free_mentions,
            units_asserted: false,
            seen: vec![false; n + 1],
        }
    }

    /// The number of variables in the formula.
    pub fn var_count(&self) -> u32 {
        self.var_count
    }

    /// The number of input clauses.
    pub fn clause_count(&self) -> usize {
        self.input_clause_count
    }

    /// The number of clauses learned and asserted so far.
    pub fn learned_clause_count(&self) -> usize {
        self.clauses.len() - self.input_clause_count
    }

    /// The weight of a literal (1.0 unless set in the input).
    pub fn literal_weight(&self, lit: Lit) -> f64 {
        self.weights[slot(lit)]
    }

    /// The literals of an input clause.
    pub fn clause_literals(&self, idx: ClauseIdx) -> &[Lit] {
        &self.clauses[idx.get() as usize - 1].lits
    }

    /// The input clauses mentioning `var`, in ascending index order.
    pub fn clauses_of(&self, var: Var) -> &[ClauseIdx] {
        &self.var_clauses[var.get() as usize]
    }

    /// Whether `var` is pinned, by decision or by unit resolution.
    pub fn is_instantiated(&self, var: Var) -> bool {
        self.values[var.get() as usize].is_some()
    }

    /// Whether every input clause mentioning `var` is subsumed.
    pub fn is_irrelevant(&self, var: Var) -> bool {
        self.free_mentions[var.get() as usize] == 0
    }

    /// Whether `lit` is currently assigned true.
    pub fn is_implied(&self, lit: Lit) -> bool {
        self.values[lit.var().get() as usize] == Some(lit.is_positive())
    }

    /// Whether the input clause currently contains a true literal.
    pub fn is_subsumed(&self, idx: ClauseIdx) -> bool {
        self.clauses[idx.get() as usize - 1].true_count > 0
    }

    /// The current decision level; 0 before any decision.
    pub fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    /// Whether the state's decision level equals the clause's assertion
    /// level. The empty clause is never at assertion level.
    pub fn at_assertion_level(&self, clause: &LearnedClause) -> bool {
        !clause.is_empty() && self.decision_level() == clause.assertion_level
    }

    /// One-shot unit resolution over the clauses of the formula, at decision
    /// level 0. Returns false on contradiction. Must be undone with
    /// [`undo_assert_unit_clauses`](SatState::undo_assert_unit_clauses).
    pub fn assert_unit_clauses(&mut self) -> bool {
        debug_assert!(!self.units_asserted);
        debug_assert!(self.trail.is_empty() && self.trail_lim.is_empty());
        self.units_asserted = true;

        let mut contradiction = false;
        for i in 0..self.clauses.len() {
            if self.clauses[i].lits.len() != 1 {
                continue;
            }
            let lit = self.clauses[i].lits[0];
            match self.values[lit.var().get() as usize] {
                None => self.assign(lit, Reason::Clause(i)),
                Some(value) if value == lit.is_positive() => {}
                Some(_) => contradiction = true,
            }
        }
        self.propagate(0).is_none() && !contradiction
    }

    /// Undoes [`assert_unit_clauses`](SatState::assert_unit_clauses) and every
    /// level-0 implication made since, emptying the trail.
    pub fn undo_assert_unit_clauses(&mut self) {
        debug_assert!(self.units_asserted);
        debug_assert_eq!(self.decision_level(), 0);
        self.backtrack_to(0);
        self.units_asserted = false;
    }

    /// Increments the decision level, pins `lit` true, and runs unit
    /// resolution. On contradiction returns the clause learned by first-UIP
    /// conflict analysis. Must be undone with
    /// [`undo_decide_literal`](SatState::undo_decide_literal) either way.
    pub fn decide_literal(&mut self, lit: Lit) -> Option<LearnedClause> {
        debug_assert!(!self.is_instantiated(lit.var()));
        self.trail_lim.push(self.trail.len());
        let qhead = self.trail.len();
        self.assign(lit, Reason::Decision);
        let conflict = self.propagate(qhead)?;
        Some(self.analyze(conflict))
    }

    /// Reverses the last [`decide_literal`](SatState::decide_literal),
    /// regardless of its outcome.
    pub fn undo_decide_literal(&mut self) {
        let mark = self.trail_lim.pop().expect("no decision to undo");
        self.backtrack_to(mark);
    }

    /// Adds a learned clause to the formula and runs unit resolution.
    /// Requires the state to be at the clause's assertion level. Returns a
    /// further learned clause if propagation finds a contradiction; its
    /// assertion level is strictly lower than the current decision level.
    pub fn assert_clause(&mut self, clause: LearnedClause) -> Option<LearnedClause> {
        debug_assert!(self.at_assertion_level(&clause));
        let s = self.clauses.len();
        let mut true_count = 0;
        let mut false_count = 0;
        for &lit in &clause.lits {
            self.occurs[slot(lit)].push(s);
            match self.values[lit.var().get() as usize] {
                Some(value) if value == lit.is_positive() => true_count += 1,
                Some(_) => false_count += 1,
                None => {}
            }
        }
        let len = clause.lits.len() as u32;
        self.clauses.push(ClauseData {
            lits: clause.lits,
            true_count,
            false_count,
        });

        if true_count > 0 {
            return None;
        }
        if false_count == len {
            let learned = self.analyze(s);
            debug_assert!(
                learned.is_empty() || learned.assertion_level < self.decision_level()
            );
            return Some(learned);
        }
        debug_assert_eq!(false_count, len - 1);
        let unit = self
            .clauses[s]
            .lits
            .iter()
            .copied()
            .find(|l| self.values[l.var().get() as usize].is_none())
            .expect("asserted clause has an unassigned literal");
        let qhead = self.trail.len();
        self.assign(unit, Reason::Clause(s));
        let conflict = self.propagate(qhead)?;
        let learned = self.analyze(conflict);
        debug_assert!(learned.is_empty() || learned.assertion_level < self.decision_level());
        Some(learned)
    }

    /// Records an assignment on the trail. Counter effects are applied when
    /// the entry is processed by `propagate`.
    fn assign(&mut self, lit: Lit, reason: Reason) {
        let v = lit.var().get() as usize;
        debug_assert!(self.values[v].is_none());
        self.values[v] = Some(lit.is_positive());
        self.levels[v] = self.decision_level();
        self.reasons[v] = reason;
        self.trail.push(lit);
    }

    /// Processes trail entries from `qhead` on: applies counter effects and
    /// derives implications. On conflict, returns the conflicting clause slot
    /// after finishing the counter updates for the whole trail, so that undo
    /// stays uniform.
    fn propagate(&mut self, mut qhead: usize) -> Option<usize> {
        let mut conflict = None;
        while qhead < self.trail.len() {
            let lit = self.trail[qhead];
            qhead += 1;

            for i in 0..self.occurs[slot(lit)].len() {
                let s = self.occurs[slot(lit)][i];
                self.clauses[s].true_count += 1;
                if self.clauses[s].true_count == 1 && s < self.input_clause_count {
                    for j in 0..self.clauses[s].lits.len() {
                        let v = self.clauses[s].lits[j].var().get() as usize;
                        self.free_mentions[v] -= 1;
                    }
                }
            }

            for i in 0..self.occurs[slot(-lit)].len() {
                let s = self.occurs[slot(-lit)][i];
                self.clauses[s].false_count += 1;
                if conflict.is_some() || self.clauses[s].true_count > 0 {
                    continue;
                }
                let len = self.clauses[s].lits.len() as u32;
                if self.clauses[s].false_count == len {
                    conflict = Some(s);
                } else if self.clauses[s].false_count == len - 1 {
                    // The remaining literal may already sit on the trail
                    // unprocessed; a pending contradiction is then caught
                    // when its negation is processed.
                    let unit = self
                        .clauses[s]
                        .lits
                        .iter()
                        .copied()
                        .find(|l| self.values[l.var().get() as usize].is_none());
                    if let Some(unit) = unit {
                        self.assign(unit, Reason::Clause(s));
                    }
                }
            }
        }
        conflict
    }

    /// Pops the trail down to length `mark`, reversing counter effects and
    /// clearing assignments.
    fn backtrack_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let lit = self.trail.pop().expect("trail underflow");
            for i in 0..self.occurs[slot(lit)].len() {
                let s = self.occurs[slot(lit)][i];
                self.clauses[s].true_count -= 1;
                if self.clauses[s].true_count == 0 && s < self.input_clause_count {
                    for j in 0..self.clauses[s].lits.len() {
                        let v = self.clauses[s].lits[j].var().get() as usize;
                        self.free_mentions[v] += 1;
                    }
                }
            }
            for i in 0..self.occurs[slot(-lit)].len() {
                let s = self.occurs[slot(-lit)][i];
                self.clauses[s].false_count -= 1;
            }
            self.values[lit.var().get() as usize] = None;
        }
    }

    /// First-UIP conflict analysis. The learned clause carries the negated
    /// UIP first and its assertion level is the highest decision level among
    /// the remaining literals.
    fn analyze(&mut self, conflict: usize) -> LearnedClause {
        let current = self.decision_level();
        if current == 0 {
            return LearnedClause {
                lits: Vec::new(),
                assertion_level: 0,
            };
        }

        let mut lower: Vec<Lit> = Vec::new();
        let mut pending = 0usize;
        let mut index = self.trail.len();
        let mut clause = conflict;
        let mut resolved: Option<Var> = None;
        let asserting;

        loop {
            for i in 0..self.clauses[clause].lits.len() {
                let q = self.clauses[clause].lits[i];
                let v = q.var().get() as usize;
                if Some(q.var()) == resolved || self.seen[v] || self.levels[v] == 0 {
                    continue;
                }
                self.seen[v] = true;
                if self.levels[v] == current {
                    pending += 1;
                } else {
                    lower.push(q);
                }
            }
            loop {
                index -= 1;
                if self.seen[self.trail[index].var().get() as usize] {
                    break;
                }
            }
            let p = self.trail[index];
            self.seen[p.var().get() as usize] = false;
            pending -= 1;
            if pending == 0 {
                asserting = p;
                break;
            }
            clause = match self.reasons[p.var().get() as usize] {
                Reason::Clause(s) => s,
                // The decision is the first current-level trail entry, so it
                // can only be reached once every other current-level literal
                // has been resolved away.
                Reason::Decision => unreachable!("resolving past the decision"),
            };
            resolved = Some(p.var());
        }

        let mut assertion_level = 0;
        for &q in &lower {
            self.seen[q.var().get() as usize] = false;
            assertion_level = assertion_level.max(self.levels[q.var().get() as usize]);
        }
        let mut lits = Vec::with_capacity(lower.len() + 1);
        lits.push(-asserting);
        lits.extend(lower);
        LearnedClause {
            lits,
            assertion_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(n: u32, clauses: &[&[i32]]) -> SatState {
        let clauses = clauses
            .iter()
            .map(|c| c.iter().map(|&l| Lit::new(l)).collect())
            .collect();
        SatState::new(Cnf::new(n, clauses))
    }

    #[test]
    fn unit_clauses_propagate() {
        let mut s = state(3, &[&[1], &[-1, 2], &[-2, 3]]);
        assert!(s.assert_unit_clauses());
        assert!(s.is_implied(Lit::new(1)));
        assert!(s.is_implied(Lit::new(2)));
        assert!(s.is_implied(Lit::new(3)));
        s.undo_assert_unit_clauses();
        assert!(!s.is_instantiated(Var::new(1)));
    }

    #[test]
    fn contradictory_units_fail() {
        let mut s = state(1, &[&[1], &[-1]]);
        assert!(!s.assert_unit_clauses());
        s.undo_assert_unit_clauses();
    }

    #[test]
    fn decide_and_undo_restores_everything() {
        let mut s = state(3, &[&[1, 2], &[-1, 3]]);
        assert!(s.assert_unit_clauses());
        let before_subsumed = s.is_subsumed(ClauseIdx::new(1));
        assert!(s.decide_literal(Lit::new(1)).is_none());
        assert!(s.is_subsumed(ClauseIdx::new(1)));
        assert!(s.is_implied(Lit::new(3)));
        assert_eq!(s.decision_level(), 1);
        s.undo_decide_literal();
        assert_eq!(s.decision_level(), 0);
        assert_eq!(s.is_subsumed(ClauseIdx::new(1)), before_subsumed);
        assert!(!s.is_instantiated(Var::new(3)));
    }

    #[test]
    fn subsumption_and_irrelevance_track_assignments() {
        let mut s = state(3, &[&[1, 2], &[2, 3]]);
        assert!(s.assert_unit_clauses());
        assert!(!s.is_irrelevant(Var::new(1)));
        assert!(s.decide_literal(Lit::new(2)).is_none());
        assert!(s.is_subsumed(ClauseIdx::new(1)));
        assert!(s.is_subsumed(ClauseIdx::new(2)));
        assert!(s.is_irrelevant(Var::new(1)));
        assert!(s.is_irrelevant(Var::new(3)));
        s.undo_decide_literal();
        assert!(!s.is_irrelevant(Var::new(1)));
    }

    #[test]
    fn conflict_learns_asserting_clause() {
        // Deciding -1 then -2 forces 3 through (1 2 3) and falsifies
        // (1 2 -3); resolving the two on 3 learns (2 1), asserting 2.
        let mut s = state(3, &[&[1, 2, 3], &[1, 2, -3]]);
        assert!(s.assert_unit_clauses());
        assert!(s.decide_literal(Lit::new(-1)).is_none());
        let learned = s.decide_literal(Lit::new(-2)).expect("conflict expected");
        s.undo_decide_literal();
        assert_eq!(learned.literals()[0], Lit::new(2));
        assert_eq!(learned.assertion_level(), 1);
        assert!(s.at_assertion_level(&learned));
        assert!(s.assert_clause(learned).is_none());
        assert!(s.is_implied(Lit::new(2)));
        s.undo_decide_literal();
        s.undo_assert_unit_clauses();
        assert_eq!(s.learned_clause_count(), 1);
    }

    #[test]
    fn level_zero_conflict_learns_empty_clause() {
        let mut s = state(2, &[&[1, 2], &[-1, 2], &[1, -2], &[-1, -2]]);
        assert!(s.assert_unit_clauses());
        let learned = s.decide_literal(Lit::new(1)).expect("conflict");
        s.undo_decide_literal();
        assert!(s.at_assertion_level(&learned));
        let next = s.assert_clause(learned).expect("conflict at level 0");
        assert!(next.is_empty());
        assert!(!s.at_assertion_level(&next));
        s.undo_assert_unit_clauses();
    }

    #[test]
    fn trail_is_exact_after_mixed_operations() {
        let mut s = state(4, &[&[1, 2], &[-2, 3], &[3, 4]]);
        assert!(s.assert_unit_clauses());
        assert!(s.decide_literal(Lit::new(2)).is_none());
        assert!(s.decide_literal(Lit::new(-4)).is_none());
        s.undo_decide_literal();
        s.undo_decide_literal();
        s.undo_assert_unit_clauses();
        for v in 1..=4 {
            assert!(!s.is_instantiated(Var::new(v)));
        }
        for c in 1..=3 {
            assert!(!s.is_subsumed(ClauseIdx::new(c)));
        }
        assert!(!s.is_irrelevant(Var::new(1)));
    }
}
