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

//! Shared plumbing for the driver test suites.
#![allow(dead_code)]

use compiler::{FormulaCache, compile, count};
use nnf::{NnfId, NnfManager};
use sat::{ClauseIdx, Cnf, Lit, SatState, Var};
use vtree::{Vtree, VtreeMethod};

pub fn cnf(n: u32, clauses: &[&[i32]]) -> Cnf {
    let clauses = clauses
        .iter()
        .map(|c| c.iter().map(|&l| Lit::new(l)).collect())
        .collect();
    Cnf::new(n, clauses)
}

/// Everything one counting run produces, kept around for assertions.
pub struct Counted {
    pub count: f64,
    pub sat: SatState,
    pub vtree: Vtree,
    pub cache: FormulaCache,
}

pub fn run_count(cnf: Cnf, method: VtreeMethod) -> Counted {
    let mut sat = SatState::new(cnf);
    let mut vtree = Vtree::construct(method, &sat);
    let mut cache = FormulaCache::new(9973, &vtree);
    let count = count(&mut vtree, &mut cache, &mut sat);
    Counted {
        count,
        sat,
        vtree,
        cache,
    }
}

/// Everything one compilation run produces.
pub struct Compiled {
    pub root: NnfId,
    pub nnf: NnfManager,
    pub sat: SatState,
    pub vtree: Vtree,
    pub cache: FormulaCache,
}

pub fn run_compile(cnf: Cnf, method: VtreeMethod) -> Compiled {
    let mut sat = SatState::new(cnf);
    let mut vtree = Vtree::construct(method, &sat);
    let mut cache = FormulaCache::new(9973, &vtree);
    let mut nnf = NnfManager::new(sat.var_count());
    let root = compile(&mut vtree, &mut cache, &mut nnf, &mut sat);
    Compiled {
        root,
        nnf,
        sat,
        vtree,
        cache,
    }
}

/// Exhaustive weighted model count; ground truth for everything else.
pub fn brute_force(cnf: &Cnf) -> f64 {
    let n = cnf.var_count();
    assert!(n <= 20, "brute force enumerates 2^n assignments");
    let mut total = 0.0;
    for assignment in 0u64..1 << n {
        let satisfied = (1..=cnf.clause_count() as u32).all(|c| {
            cnf.clause(ClauseIdx::new(c)).iter().any(|l| {
                let bit = assignment >> (l.var().get() - 1) & 1 == 1;
                bit == l.is_positive()
            })
        });
        if satisfied {
            let mut weight = 1.0;
            for v in 1..=n {
                let bit = assignment >> (v - 1) & 1 == 1;
                let lit = if bit {
                    Lit::positive(Var::new(v))
                } else {
                    Lit::negative(Var::new(v))
                };
                weight *= cnf.weight(lit);
            }
            total += weight;
        }
    }
    total
}

/// The SAT state must come back exactly as built: no decisions, no
/// assignments, nothing subsumed.
pub fn assert_state_restored(sat: &SatState) {
    assert_eq!(sat.decision_level(), 0);
    for v in 1..=sat.var_count() {
        assert!(!sat.is_instantiated(Var::new(v)));
    }
    for c in 1..=sat.clause_count() as u32 {
        assert!(!sat.is_subsumed(ClauseIdx::new(c)));
    }
}

/// The cache's running counters must agree with a full walk of the table.
pub fn assert_cache_consistent(cache: &FormulaCache) {
    let audit = cache.audit();
    assert_eq!(audit.entries, cache.count());
    assert_eq!(audit.memory, cache.memory());
}
