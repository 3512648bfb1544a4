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

//! Randomized cross-checks of both drivers against exhaustive enumeration,
//! and the component-key encoding against an independent reference.

mod common;

use common::*;
use compiler::key::construct_key;
use num_bigint::BigUint;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sat::{Cnf, Lit, SatState, Var};
use vtree::{Vtree, VtreeMethod};

fn random_cnf(rng: &mut StdRng) -> Cnf {
    let n = rng.gen_range(2..=5u32);
    let m = rng.gen_range(1..=8usize);
    let clauses = (0..m)
        .map(|_| {
            let len = rng.gen_range(1..=3usize);
            (0..len)
                .map(|_| {
                    let var = rng.gen_range(1..=n) as i32;
                    if rng.r#gen() { Lit::new(var) } else { Lit::new(-var) }
                })
                .collect()
        })
        .collect();
    Cnf::new(n, clauses)
}

#[test]
fn counting_matches_exhaustive_enumeration() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0001);
    for round in 0..300 {
        let formula = random_cnf(&mut rng);
        let expected = brute_force(&formula);
        for method in [VtreeMethod::Balanced, VtreeMethod::RightLinear] {
            let counted = run_count(formula.clone(), method);
            assert_eq!(
                counted.count, expected,
                "round {round}, {method:?}: counts diverge"
            );
            assert_state_restored(&counted.sat);
            assert_cache_consistent(&counted.cache);
        }
    }
}

#[test]
fn compilation_matches_exhaustive_enumeration() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0002);
    for round in 0..300 {
        let formula = random_cnf(&mut rng);
        let expected = brute_force(&formula) as u64;
        for method in [VtreeMethod::Balanced, VtreeMethod::RightLinear] {
            let compiled = run_compile(formula.clone(), method);
            assert_eq!(
                compiled.nnf.model_count(),
                BigUint::from(expected),
                "round {round}, {method:?}: model counts diverge"
            );
            assert!(compiled.nnf.decomposable(), "round {round}: not decomposable");
            assert!(compiled.nnf.deterministic(), "round {round}: not deterministic");
            if expected > 0 {
                assert!(compiled.nnf.entails_cnf(&compiled.sat));
            }
            assert_state_restored(&compiled.sat);
            assert_cache_consistent(&compiled.cache);
        }
    }
}

#[test]
fn counting_agrees_with_evaluating_the_compilation() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0003);
    for _ in 0..150 {
        let mut formula = random_cnf(&mut rng);
        for v in 1..=formula.var_count() {
            // Small exact decimals keep the two evaluation orders close.
            let w = f64::from(rng.gen_range(1..=4u32)) / 4.0;
            formula.set_weight(Lit::positive(Var::new(v)), w);
            formula.set_weight(Lit::negative(Var::new(v)), 1.0 - w);
        }
        let expected = brute_force(&formula);
        let counted = run_count(formula.clone(), VtreeMethod::Balanced);
        assert!((counted.count - expected).abs() < 1e-9);

        let compiled = run_compile(formula, VtreeMethod::Balanced);
        let evaluated = compiled.nnf.weighted_model_count(&compiled.sat);
        assert!((evaluated - counted.count).abs() < 1e-9);
    }
}

/// The reference encoding: collect the context bits in order, then pack
/// MSB-first, leaving trailing bits of the last byte zero.
fn reference_key(vtree: &Vtree, v: vtree::VtreeIdx, sat: &SatState) -> Vec<u8> {
    let node = vtree.node(v);
    let mut bits = Vec::new();
    for &clause in &node.context_clauses {
        bits.push(sat.is_subsumed(clause));
    }
    for &var in &node.context_in_vars {
        bits.push(sat.is_implied(Lit::positive(var)));
        bits.push(sat.is_implied(Lit::negative(var)));
    }
    let mut bytes = vec![0u8; node.key_size()];
    for (cell, chunk) in bits.chunks(8).enumerate() {
        bytes[cell] = chunk.iter().fold(0, |b, &bit| b << 1 | u8::from(bit));
    }
    bytes
}

proptest! {
    #[test]
    fn component_keys_match_the_reference_encoding(seed in any::<u64>()) {
        let mut rng = StdRng::seed_from_u64(seed);
        let formula = random_cnf(&mut rng);
        let mut sat = SatState::new(formula);
        for method in [VtreeMethod::Balanced, VtreeMethod::RightLinear] {
            let mut vt = Vtree::construct(method, &sat);
            prop_assume!(sat.assert_unit_clauses());

            let mut decided = 0;
            loop {
                for v in vt.indices().collect::<Vec<_>>() {
                    if vt.node(v).cached_size == 0 {
                        continue;
                    }
                    construct_key(&mut vt, v, &sat);
                    prop_assert_eq!(&vt.node(v).key, &reference_key(&vt, v, &sat));
                }
                let free: Vec<Var> = (1..=sat.var_count())
                    .map(Var::new)
                    .filter(|&v| !sat.is_instantiated(v))
                    .collect();
                if free.is_empty() || decided == 3 {
                    break;
                }
                let var = free[rng.gen_range(0..free.len())];
                let lit = if rng.r#gen() {
                    Lit::positive(var)
                } else {
                    Lit::negative(var)
                };
                let learned = sat.decide_literal(lit);
                decided += 1;
                if learned.is_some() {
                    break;
                }
            }
            for _ in 0..decided {
                sat.undo_decide_literal();
            }
            sat.undo_assert_unit_clauses();
        }
    }
}
