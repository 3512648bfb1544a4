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

//! The `.vtree` text format and `.dot` rendering.
//!
//! The text format is the established one: node lines appear bottom-up
//! (children before parents, the root last), leaves as `L id var` and
//! internal nodes as `I id left-id right-id`, preceded by a
//! `vtree node-count` header. Saved files use inorder positions as ids;
//! loaded files may use any ids.

use std::collections::HashMap;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use sat::{SatState, Var};

use crate::{Vtree, VtreeIdx, VtreeNode};

/// Errors arising while reading a `.vtree` file.
#[derive(Debug)]
pub enum VtreeIoError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// A malformed line or header.
    Parse(String),
    /// The leaves do not match the formula's variables exactly.
    VarMismatch {
        /// Variables in the formula.
        expected: u32,
        /// Leaves found in the file.
        found: u32,
    },
}

impl From<io::Error> for VtreeIoError {
    fn from(err: io::Error) -> VtreeIoError {
        VtreeIoError::Io(err)
    }
}

impl Display for VtreeIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            VtreeIoError::Io(err) => err.fmt(f),
            VtreeIoError::Parse(msg) => write!(f, "malformed vtree file: {msg}"),
            VtreeIoError::VarMismatch { expected, found } => {
                write!(f, "vtree has {found} leaves but the cnf has {expected} variables")
            }
        }
    }
}

impl Error for VtreeIoError {}

/// Writes the vtree in `.vtree` text form.
pub fn save(vtree: &Vtree, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "c ids of vtree nodes start at 0")?;
    writeln!(w, "c ids of variables start at 1")?;
    writeln!(w, "c vtree nodes appear bottom-up, children before parents")?;
    writeln!(w, "vtree {}", vtree.len())?;
    for v in vtree.post_order() {
        let node = vtree.node(v);
        match node.var {
            Some(var) => writeln!(w, "L {} {}", node.position, var.get())?,
            None => writeln!(
                w,
                "I {} {} {}",
                node.position,
                vtree.node(node.left.expect("internal node")).position,
                vtree.node(node.right.expect("internal node")).position,
            )?,
        }
    }
    Ok(())
}

/// Writes the vtree to a file in `.vtree` text form.
pub fn save_to_file(vtree: &Vtree, path: impl AsRef<Path>) -> io::Result<()> {
    save(vtree, BufWriter::new(File::create(path)?))
}

/// Renders the vtree as a graphviz digraph.
pub fn save_dot(vtree: &Vtree, mut w: impl Write) -> io::Result<()> {
    writeln!(w, "digraph vtree {{")?;
    writeln!(w, "  node [shape=plaintext];")?;
    for i in 0..vtree.len() {
        let node = vtree.node(VtreeIdx(i as u32));
        match node.var {
            Some(var) => writeln!(w, "  n{} [label=\"{}\"];", node.position, var.get())?,
            None => writeln!(w, "  n{} [label=\"{}\"];", node.position, node.position)?,
        }
    }
    for i in 0..vtree.len() {
        let node = vtree.node(VtreeIdx(i as u32));
        if let (Some(l), Some(r)) = (node.left, node.right) {
            writeln!(
                w,
                "  n{} -> n{}; n{} -> n{};",
                node.position,
                vtree.node(l).position,
                node.position,
                vtree.node(r).position,
            )?;
        }
    }
    writeln!(w, "}}")?;
    Ok(())
}

/// Renders the vtree to a `.dot` file.
pub fn save_dot_to_file(vtree: &Vtree, path: impl AsRef<Path>) -> io::Result<()> {
    save_dot(vtree, BufWriter::new(File::create(path)?))
}

/// Reads a vtree in `.vtree` text form and computes its context sets from
/// the state's clauses.
pub fn load(reader: impl BufRead, sat: &SatState) -> Result<Vtree, VtreeIoError> {
    let mut declared: Option<usize> = None;
    let mut by_file_id: HashMap<u64, VtreeIdx> = HashMap::new();
    let mut nodes: Vec<VtreeNode> = Vec::new();
    let mut last: Option<VtreeIdx> = None;
    let mut var_seen = vec![false; sat.var_count() as usize + 1];
    let mut leaves = 0u32;

    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_ascii_whitespace();
        let field = |t: Option<&str>| -> Result<u64, VtreeIoError> {
            t.and_then(|t| t.parse().ok())
                .ok_or_else(|| VtreeIoError::Parse(line.clone()))
        };
        match tokens.next() {
            None | Some("c") => continue,
            Some("vtree") => declared = Some(field(tokens.next())? as usize),
            Some("L") => {
                let id = field(tokens.next())?;
                let var = field(tokens.next())? as u32;
                if var == 0 || var > sat.var_count() || var_seen[var as usize] {
                    return Err(VtreeIoError::Parse(format!("bad leaf variable {var}")));
                }
                var_seen[var as usize] = true;
                leaves += 1;
                let idx = VtreeIdx(nodes.len() as u32);
                nodes.push(VtreeNode::new_leaf(Var::new(var)));
                if by_file_id.insert(id, idx).is_some() {
                    return Err(VtreeIoError::Parse(format!("duplicate node id {id}")));
                }
                last = Some(idx);
            }
            Some("I") => {
                let id = field(tokens.next())?;
                let left = field(tokens.next())?;
                let right = field(tokens.next())?;
                let resolve = |id: u64| {
                    by_file_id
                        .get(&id)
                        .copied()
                        .ok_or_else(|| VtreeIoError::Parse(format!("unknown child id {id}")))
                };
                let idx = VtreeIdx(nodes.len() as u32);
                nodes.push(VtreeNode::new_internal(resolve(left)?, resolve(right)?));
                if by_file_id.insert(id, idx).is_some() {
                    return Err(VtreeIoError::Parse(format!("duplicate node id {id}")));
                }
                last = Some(idx);
            }
            Some(other) => {
                return Err(VtreeIoError::Parse(format!("unexpected token {other:?}")));
            }
        }
    }

    let root = last.ok_or_else(|| VtreeIoError::Parse("empty vtree file".into()))?;
    if let Some(declared) = declared
        && declared != nodes.len()
    {
        return Err(VtreeIoError::Parse(format!(
            "header declares {declared} nodes, file has {}",
            nodes.len()
        )));
    }
    if leaves != sat.var_count() {
        return Err(VtreeIoError::VarMismatch {
            expected: sat.var_count(),
            found: leaves,
        });
    }
    Ok(Vtree::from_shape(nodes, root, sat))
}

/// Reads a vtree from a `.vtree` file.
pub fn load_from_file(path: impl AsRef<Path>, sat: &SatState) -> Result<Vtree, VtreeIoError> {
    load(BufReader::new(File::open(path)?), sat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VtreeMethod;
    use sat::{Cnf, Lit};

    fn sat_state(n: u32, clauses: &[&[i32]]) -> SatState {
        let clauses = clauses
            .iter()
            .map(|c| c.iter().map(|&l| Lit::new(l)).collect())
            .collect();
        SatState::new(Cnf::new(n, clauses))
    }

    #[test]
    fn save_load_round_trip_preserves_shape() {
        let sat = sat_state(4, &[&[1, 2], &[2, 3], &[3, 4]]);
        let vt = Vtree::construct(VtreeMethod::Balanced, &sat);
        let mut text = Vec::new();
        save(&vt, &mut text).unwrap();
        let reloaded = load(&text[..], &sat).unwrap();
        assert_eq!(reloaded.len(), vt.len());
        for i in 0..vt.len() {
            let (a, b) = (vt.node(VtreeIdx(i as u32)), reloaded.node(vt_by_position(&reloaded, vt.node(VtreeIdx(i as u32)).position)));
            assert_eq!(a.var, b.var);
            assert_eq!(a.context_clauses, b.context_clauses);
            assert_eq!(a.context_in_vars, b.context_in_vars);
            assert_eq!(a.cached_size, b.cached_size);
        }
    }

    fn vt_by_position(vt: &Vtree, position: u32) -> VtreeIdx {
        (0..vt.len())
            .map(|i| VtreeIdx(i as u32))
            .find(|&v| vt.node(v).position == position)
            .expect("position present")
    }

    #[test]
    fn load_rejects_missing_variable() {
        let sat = sat_state(2, &[&[1, 2]]);
        let text = "vtree 1\nL 0 1\n";
        assert!(matches!(
            load(text.as_bytes(), &sat),
            Err(VtreeIoError::VarMismatch { .. })
        ));
    }

    #[test]
    fn load_rejects_duplicate_variable() {
        let sat = sat_state(2, &[&[1, 2]]);
        let text = "vtree 3\nL 0 1\nL 2 1\nI 1 0 2\n";
        assert!(matches!(load(text.as_bytes(), &sat), Err(VtreeIoError::Parse(_))));
    }

    #[test]
    fn dot_output_mentions_every_leaf() {
        let sat = sat_state(3, &[&[1, 2, 3]]);
        let vt = Vtree::construct(VtreeMethod::RightLinear, &sat);
        let mut text = Vec::new();
        save_dot(&vt, &mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        for var in 1..=3 {
            assert!(text.contains(&format!("[label=\"{var}\"]")));
        }
    }
}
