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

//! The `.nnf` text format.
//!
//! The established line format: a `nnf node-count edge-count var-count`
//! header, then one node per line in child-first order, referenced by line
//! number. `L l` is a literal, `A c i...` a conjunction, `O j 2 i1 i2` a
//! decision on variable `j`; `A 0` is true and `O 0 0` false. The last line
//! is the root.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use sat::{Lit, Var};

use crate::{NnfId, NnfManager, NnfNode};

/// Errors arising while reading a `.nnf` file.
#[derive(Debug)]
pub enum NnfIoError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// A malformed header or node line.
    Parse(String),
}

impl From<io::Error> for NnfIoError {
    fn from(err: io::Error) -> NnfIoError {
        NnfIoError::Io(err)
    }
}

impl Display for NnfIoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NnfIoError::Io(err) => err.fmt(f),
            NnfIoError::Parse(msg) => write!(f, "malformed nnf file: {msg}"),
        }
    }
}

impl Error for NnfIoError {}

/// Writes the rooted NNF. Returns its node and edge counts.
pub fn save(manager: &NnfManager, mut w: impl Write) -> io::Result<(usize, usize)> {
    let root = manager.root().expect("root designated");
    let order = manager.topological(root);
    let (nodes, edges) = manager.size(root);
    debug_assert_eq!(nodes, order.len());
    writeln!(w, "nnf {} {} {}", nodes, edges, manager.var_count())?;

    let mut line_of = vec![usize::MAX; manager.len()];
    for (line, &id) in order.iter().enumerate() {
        line_of[id.get()] = line;
        match manager.node(id) {
            NnfNode::False => writeln!(w, "O 0 0")?,
            NnfNode::True => writeln!(w, "A 0")?,
            NnfNode::Literal(lit) => writeln!(w, "L {}", lit.get())?,
            NnfNode::And(a, b) => {
                writeln!(w, "A 2 {} {}", line_of[a.get()], line_of[b.get()])?
            }
            NnfNode::Decision { var, pos, neg } => writeln!(
                w,
                "O {} 2 {} {}",
                var.get(),
                line_of[pos.get()],
                line_of[neg.get()],
            )?,
        }
    }
    Ok((nodes, edges))
}

/// Writes the rooted NNF to a file. Returns its node and edge counts.
pub fn save_to_file(manager: &NnfManager, path: impl AsRef<Path>) -> io::Result<(usize, usize)> {
    save(manager, BufWriter::new(File::create(path)?))
}

/// Reads a `.nnf` file into a fresh manager, with the last node as root.
///
/// Conjunctions of more than two children are rebuilt as nested binary
/// conjunctions; the store's identities may collapse trivial nodes, so the
/// loaded NNF is equal as a function, not necessarily line for line.
pub fn load(reader: impl BufRead) -> Result<NnfManager, NnfIoError> {
    let mut lines = reader.lines();
    let header = loop {
        match lines.next() {
            None => return Err(NnfIoError::Parse("missing header".into())),
            Some(line) => {
                let line = line?;
                if line.starts_with('c') || line.trim().is_empty() {
                    continue;
                }
                break line;
            }
        }
    };
    let mut tokens = header.split_ascii_whitespace();
    let (node_count, var_count) = match (
        tokens.next(),
        tokens.next().and_then(|t| t.parse::<usize>().ok()),
        tokens.next().and_then(|t| t.parse::<usize>().ok()),
        tokens.next().and_then(|t| t.parse::<u32>().ok()),
    ) {
        (Some("nnf"), Some(nodes), Some(_edges), Some(vars)) => (nodes, vars),
        _ => return Err(NnfIoError::Parse(header)),
    };

    let mut manager = NnfManager::new(var_count as u32);
    let mut ids: Vec<NnfId> = Vec::with_capacity(node_count);
    for line in lines {
        let line = line?;
        if line.starts_with('c') || line.trim().is_empty() {
            continue;
        }
        let mut tokens = line.split_ascii_whitespace();
        let kind = tokens.next().unwrap_or_default().to_owned();
        let nums: Option<Vec<i64>> = tokens.map(|t| t.parse().ok()).collect();
        let Some(nums) = nums else {
            return Err(NnfIoError::Parse(line));
        };
        let child = |i: i64| -> Option<NnfId> {
            usize::try_from(i).ok().and_then(|i| ids.get(i).copied())
        };
        let id = match (kind.as_str(), nums.as_slice()) {
            ("L", &[lit]) if lit != 0 && lit.unsigned_abs() <= var_count as u64 => {
                manager.literal_to_node(Lit::new(lit as i32))
            }
            ("A", &[0]) => NnfManager::ONE,
            ("A", [count, children @ ..])
                if *count > 0 && children.len() == *count as usize =>
            {
                let mut resolved = Vec::with_capacity(children.len());
                for &c in children {
                    resolved.push(child(c).ok_or_else(|| NnfIoError::Parse(line.clone()))?);
                }
                let mut node = resolved[0];
                for &other in &resolved[1..] {
                    node = manager.conjoin(node, other);
                }
                node
            }
            ("O", &[0, 0]) => NnfManager::ZERO,
            ("O", &[var, 2, a, b]) if var > 0 && var <= var_count as i64 => {
                match (child(a), child(b)) {
                    (Some(pos), Some(neg)) => {
                        manager.disjoin(Var::new(var as u32), pos, neg)
                    }
                    _ => return Err(NnfIoError::Parse(line)),
                }
            }
            _ => return Err(NnfIoError::Parse(line)),
        };
        ids.push(id);
    }

    if ids.len() != node_count {
        return Err(NnfIoError::Parse(format!(
            "header declares {node_count} nodes, file has {}",
            ids.len()
        )));
    }
    let root = *ids.last().ok_or_else(|| NnfIoError::Parse("no nodes".into()))?;
    manager.set_root(root);
    Ok(manager)
}

/// Reads a `.nnf` file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<NnfManager, NnfIoError> {
    load(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    #[test]
    fn round_trip_preserves_model_count() {
        let mut m = NnfManager::new(2);
        let x = m.literal_to_node(Lit::new(1));
        let nx = m.literal_to_node(Lit::new(-1));
        let y = m.literal_to_node(Lit::new(2));
        let neg = m.conjoin(nx, y);
        let d = m.disjoin(Var::new(1), x, neg);
        m.set_root(d);

        let mut text = Vec::new();
        let (nodes, edges) = save(&m, &mut text).unwrap();
        assert_eq!((nodes, edges), m.size(d));

        let reloaded = load(&text[..]).unwrap();
        assert_eq!(reloaded.var_count(), 2);
        assert_eq!(reloaded.model_count(), BigUint::from(3u32));
        assert!(reloaded.decomposable());
    }

    #[test]
    fn saves_constant_roots() {
        let mut m = NnfManager::new(1);
        m.set_root(NnfManager::ZERO);
        let mut text = Vec::new();
        save(&m, &mut text).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "nnf 1 0 1\nO 0 0\n");

        let reloaded = load("nnf 1 0 1\nO 0 0\n".as_bytes()).unwrap();
        assert_eq!(reloaded.model_count(), BigUint::ZERO);
    }

    #[test]
    fn rejects_forward_references() {
        let text = "nnf 2 2 1\nA 2 0 1\nL 1\n";
        assert!(matches!(load(text.as_bytes()), Err(NnfIoError::Parse(_))));
    }
}
