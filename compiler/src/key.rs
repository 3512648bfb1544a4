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

//! Component keys: compact bit vectors identifying the residual CNF at a
//! vtree node under the current SAT state.
//!
//! The key appends one bit per context clause (subsumed or not) and two bits
//! per context-in variable (positive implied, negative implied; `00` free,
//! `10` true, `01` false), in the node's fixed enumeration order. Bits are
//! packed MSB-first within each byte by shifting left and or-ing; trailing
//! bits of the final byte stay zero. Producer and consumer must agree on this
//! order exactly, or equal residuals stop matching in the cache.
//!
//! The key and its hash are stored on the node's scratch fields and stay
//! current until the SAT state next changes.

use sat::{Lit, SatState};
use vtree::{Vtree, VtreeIdx};

struct BitWriter<'a> {
    key: &'a mut [u8],
    cell: usize,
    filled: u8,
}

impl<'a> BitWriter<'a> {
    fn new(key: &'a mut [u8]) -> BitWriter<'a> {
        key[0] = 0;
        BitWriter {
            key,
            cell: 0,
            filled: 0,
        }
    }

    fn push(&mut self, bit: bool) {
        if self.filled == 8 {
            self.cell += 1;
            self.key[self.cell] = 0;
            self.filled = 0;
        }
        self.key[self.cell] <<= 1;
        if bit {
            self.key[self.cell] |= 1;
        }
        self.filled += 1;
    }
}

/// Captures the residual CNF at `v` into the node's key scratch and stores
/// its hash. Valid only for nodes with a non-empty context, and only until
/// the SAT state changes.
pub fn construct_key(vtree: &mut Vtree, v: VtreeIdx, sat: &SatState) {
    let node = vtree.node_mut(v);
    debug_assert!(node.cached_size > 0);

    let mut writer = BitWriter::new(&mut node.key);
    for &clause in &node.context_clauses {
        writer.push(sat.is_subsumed(clause));
    }
    for &var in &node.context_in_vars {
        // 11 cannot arise in a consistent state and is not checked.
        writer.push(sat.is_implied(Lit::positive(var)));
        writer.push(sat.is_implied(Lit::negative(var)));
    }

    let mut hash = u64::from(node.position);
    for &byte in &node.key {
        hash = hash.wrapping_mul(31).wrapping_add(u64::from(byte));
    }
    node.key_hashcode = hash;
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat::Cnf;
    use vtree::VtreeMethod;

    fn sat_state(n: u32, clauses: &[&[i32]]) -> SatState {
        let clauses = clauses
            .iter()
            .map(|c| c.iter().map(|&l| Lit::new(l)).collect())
            .collect();
        SatState::new(Cnf::new(n, clauses))
    }

    #[test]
    fn bits_pack_msb_first() {
        let mut key = vec![0u8; 2];
        let mut w = BitWriter::new(&mut key);
        for bit in [true, false, true, true, false, false, false, true, true] {
            w.push(bit);
        }
        // First byte full: 1011_0001. Second byte holds the single trailing
        // bit in its lowest position.
        assert_eq!(key, vec![0b1011_0001, 0b1]);
    }

    #[test]
    fn key_changes_with_the_sat_state() {
        // c1 = (1 2), c2 = (2 3): the inner balanced node has context
        // clause c2 and inside variable 2, so 3 key bits.
        let mut sat = sat_state(3, &[&[1, 2], &[2, 3]]);
        let mut vt = Vtree::construct(VtreeMethod::Balanced, &sat);
        let inner = vt.node(vt.root()).left.unwrap();

        assert!(sat.assert_unit_clauses());
        construct_key(&mut vt, inner, &sat);
        let free = (vt.node(inner).key.clone(), vt.node(inner).key_hashcode);
        assert_eq!(free.0, vec![0b000]);

        assert!(sat.decide_literal(Lit::new(2)).is_none());
        construct_key(&mut vt, inner, &sat);
        // c2 subsumed, variable 2 pinned true: bits 1,1,0.
        assert_eq!(vt.node(inner).key, vec![0b110]);
        assert_ne!(vt.node(inner).key_hashcode, free.1);

        sat.undo_decide_literal();
        construct_key(&mut vt, inner, &sat);
        assert_eq!((vt.node(inner).key.clone(), vt.node(inner).key_hashcode), free);
        sat.undo_assert_unit_clauses();
    }

    #[test]
    fn hash_is_seeded_with_the_position() {
        let mut sat = sat_state(3, &[&[1, 2], &[2, 3]]);
        let mut vt = Vtree::construct(VtreeMethod::Balanced, &sat);
        let inner = vt.node(vt.root()).left.unwrap();
        assert!(sat.assert_unit_clauses());
        construct_key(&mut vt, inner, &sat);
        let node = vt.node(inner);
        let mut expected = u64::from(node.position);
        for &b in &node.key {
            expected = expected.wrapping_mul(31).wrapping_add(u64::from(b));
        }
        assert_eq!(node.key_hashcode, expected);
        sat.undo_assert_unit_clauses();
    }
}
