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

//! CNF formulas: variables, literals, clauses, and the DIMACS parser.
//!
//! Variables are indexed `1..=n` and literals are signed variable indices, as
//! in DIMACS. Literal weights default to `1.0` and can be overridden with a
//! comment line of the form
//!
//! ```text
//! c weights PW_1 NW_1 ... PW_n NW_n
//! ```
//!
//! where `PW_i` and `NW_i` are the non-negative weights of literals `i` and
//! `-i` respectively.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::Neg;
use std::path::Path;

/// A CNF variable, indexed `1..=n`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(u32);

impl Var {
    /// Creates the variable with the given 1-based index.
    pub fn new(index: u32) -> Var {
        debug_assert!(index > 0);
        Var(index)
    }

    /// The 1-based index of this variable.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A literal: a variable or its negation, as a signed non-zero index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit(i32);

impl Lit {
    /// Creates a literal from its DIMACS encoding.
    pub fn new(dimacs: i32) -> Lit {
        debug_assert!(dimacs != 0);
        Lit(dimacs)
    }

    /// The positive literal of `var`.
    pub fn positive(var: Var) -> Lit {
        Lit(var.get() as i32)
    }

    /// The negative literal of `var`.
    pub fn negative(var: Var) -> Lit {
        Lit(-(var.get() as i32))
    }

    /// The literal's variable.
    pub fn var(self) -> Var {
        Var(self.0.unsigned_abs())
    }

    /// Whether this is the positive literal of its variable.
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// The DIMACS encoding of this literal.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl Neg for Lit {
    type Output = Lit;

    fn neg(self) -> Lit {
        Lit(-self.0)
    }
}

impl fmt::Debug for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 1-based index of an input clause. Learned clauses are not indexed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClauseIdx(u32);

impl ClauseIdx {
    /// Creates the clause index with the given 1-based value.
    pub fn new(index: u32) -> ClauseIdx {
        debug_assert!(index > 0);
        ClauseIdx(index)
    }

    /// The 1-based value of this index.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ClauseIdx {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Errors arising while reading a DIMACS CNF file.
#[derive(Debug)]
pub enum CnfError {
    /// Underlying I/O failure.
    Io(io::Error),
    /// No `p cnf` header line before the first clause.
    MissingHeader,
    /// A malformed `p cnf` header line.
    BadHeader(String),
    /// A token that is neither a literal nor a clause terminator.
    BadLiteral(String),
    /// A literal mentioning a variable beyond the declared count.
    LiteralOutOfRange { lit: i32, var_count: u32 },
    /// A clause not terminated by `0` before end of input.
    UnterminatedClause,
    /// A malformed or misplaced `c weights` line.
    BadWeights(String),
}

impl From<io::Error> for CnfError {
    fn from(err: io::Error) -> CnfError {
        CnfError::Io(err)
    }
}

impl Display for CnfError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use CnfError::*;
        match self {
            Io(err) => err.fmt(f),
            MissingHeader => write!(f, "missing 'p cnf' header"),
            BadHeader(line) => write!(f, "malformed header line: {line:?}"),
            BadLiteral(tok) => write!(f, "malformed literal: {tok:?}"),
            LiteralOutOfRange { lit, var_count } => {
                write!(f, "literal {lit} out of range for {var_count} variables")
            }
            UnterminatedClause => write!(f, "last clause not terminated by 0"),
            BadWeights(msg) => write!(f, "malformed weights line: {msg}"),
        }
    }
}

impl Error for CnfError {}

/// A parsed CNF formula with per-literal weights.
#[derive(Clone, Debug)]
pub struct Cnf {
    var_count: u32,
    clauses: Vec<Vec<Lit>>,
    /// Indexed by literal slot, see [`Cnf::weight`].
    weights: Vec<f64>,
}

/// The position of a literal in slot-indexed arrays: positive and negative
/// literals of variable `i` land at `2i` and `2i + 1`.
pub(crate) fn slot(lit: Lit) -> usize {
    2 * lit.var().get() as usize + usize::from(!lit.is_positive())
}

impl Cnf {
    /// Builds a CNF directly from clause literal lists, with unit weights.
    ///
    /// Duplicate literals within a clause are removed.
    pub fn new(var_count: u32, clauses: Vec<Vec<Lit>>) -> Cnf {
        let mut clauses = clauses;
        for clause in &mut clauses {
            clause.sort_by_key(|l| (l.var(), !l.is_positive()));
            clause.dedup();
        }
        Cnf {
            var_count,
            clauses,
            weights: vec![1.0; 2 * var_count as usize + 2],
        }
    }

    /// Reads a DIMACS CNF file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Cnf, CnfError> {
        Cnf::parse(BufReader::new(File::open(path)?))
    }

    /// Parses DIMACS CNF text.
    pub fn parse(reader: impl BufRead) -> Result<Cnf, CnfError> {
        let mut header: Option<(u32, usize)> = None;
        let mut clauses: Vec<Vec<Lit>> = Vec::new();
        let mut weights: Option<Vec<f64>> = None;
        let mut current: Vec<Lit> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let mut tokens = line.split_ascii_whitespace().peekable();
            match tokens.peek() {
                None => continue,
                Some(&"c") => {
                    tokens.next();
                    if tokens.peek() == Some(&"weights") {
                        tokens.next();
                        let (n, _) = header.ok_or_else(|| {
                            CnfError::BadWeights("weights line before header".into())
                        })?;
                        let mut w = vec![1.0; 2 * n as usize + 2];
                        for i in 0..2 * n as usize {
                            let tok = tokens.next().ok_or_else(|| {
                                CnfError::BadWeights(format!("expected {} weights", 2 * n))
                            })?;
                            let value: f64 = tok
                                .parse()
                                .map_err(|_| CnfError::BadWeights(format!("bad weight {tok:?}")))?;
                            if !(value >= 0.0) {
                                return Err(CnfError::BadWeights(format!(
                                    "negative weight {value}"
                                )));
                            }
                            w[2 + i] = value;
                        }
                        weights = Some(w);
                    }
                    continue;
                }
                Some(&"p") => {
                    let ok = tokens.next() == Some("p") && tokens.next() == Some("cnf");
                    let n = tokens.next().and_then(|t| t.parse::<u32>().ok());
                    let m = tokens.next().and_then(|t| t.parse::<usize>().ok());
                    match (ok, n, m) {
                        (true, Some(n), Some(m)) => header = Some((n, m)),
                        _ => return Err(CnfError::BadHeader(line.clone())),
                    }
                    continue;
                }
                Some(&"%") => break, // SATLIB trailer
                _ => {}
            }

            let (var_count, _) = header.ok_or(CnfError::MissingHeader)?;
            for tok in tokens {
                let value: i32 = tok
                    .parse()
                    .map_err(|_| CnfError::BadLiteral(tok.to_owned()))?;
                if value == 0 {
                    current.sort_by_key(|l| (l.var(), !l.is_positive()));
                    current.dedup();
                    clauses.push(std::mem::take(&mut current));
                } else {
                    if value.unsigned_abs() > var_count {
                        return Err(CnfError::LiteralOutOfRange {
                            lit: value,
                            var_count,
                        });
                    }
                    current.push(Lit::new(value));
                }
            }
        }

        if !current.is_empty() {
            return Err(CnfError::UnterminatedClause);
        }
        let (var_count, _) = header.ok_or(CnfError::MissingHeader)?;
        let weights = weights.unwrap_or_else(|| vec![1.0; 2 * var_count as usize + 2]);
        Ok(Cnf {
            var_count,
            clauses,
            weights,
        })
    }

    /// The number of variables.
    pub fn var_count(&self) -> u32 {
        self.var_count
    }

    /// The number of clauses.
    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    /// The literals of the clause with the given 1-based index.
    pub fn clause(&self, idx: ClauseIdx) -> &[Lit] {
        &self.clauses[idx.get() as usize - 1]
    }

    /// The weight of a literal.
    pub fn weight(&self, lit: Lit) -> f64 {
        self.weights[slot(lit)]
    }

    /// Overrides the weight of a literal.
    pub fn set_weight(&mut self, lit: Lit, weight: f64) {
        assert!(weight >= 0.0);
        self.weights[slot(lit)] = weight;
    }

    pub(crate) fn into_parts(self) -> (u32, Vec<Vec<Lit>>, Vec<f64>) {
        (self.var_count, self.clauses, self.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(cnf: &Cnf, i: u32) -> Vec<i32> {
        cnf.clause(ClauseIdx::new(i)).iter().map(|l| l.get()).collect()
    }

    #[test]
    fn parses_plain_dimacs() {
        let text = "c a comment\np cnf 3 2\n1 -2 0\n2 3 0\n";
        let cnf = Cnf::parse(text.as_bytes()).unwrap();
        assert_eq!(cnf.var_count(), 3);
        assert_eq!(cnf.clause_count(), 2);
        assert_eq!(lits(&cnf, 1), vec![1, -2]);
        assert_eq!(lits(&cnf, 2), vec![2, 3]);
        assert_eq!(cnf.weight(Lit::new(-3)), 1.0);
    }

    #[test]
    fn parses_clause_spanning_lines() {
        let text = "p cnf 4 1\n1 2\n3 4 0\n";
        let cnf = Cnf::parse(text.as_bytes()).unwrap();
        assert_eq!(lits(&cnf, 1), vec![1, 2, 3, 4]);
    }

    #[test]
    fn parses_weights_line() {
        let text = "p cnf 2 1\nc weights 0.5 0.5 0.3 0.7\n1 2 0\n";
        let cnf = Cnf::parse(text.as_bytes()).unwrap();
        assert_eq!(cnf.weight(Lit::new(1)), 0.5);
        assert_eq!(cnf.weight(Lit::new(-1)), 0.5);
        assert_eq!(cnf.weight(Lit::new(2)), 0.3);
        assert_eq!(cnf.weight(Lit::new(-2)), 0.7);
    }

    #[test]
    fn rejects_out_of_range_literal() {
        let text = "p cnf 2 1\n1 3 0\n";
        assert!(matches!(
            Cnf::parse(text.as_bytes()),
            Err(CnfError::LiteralOutOfRange { lit: 3, .. })
        ));
    }

    #[test]
    fn rejects_unterminated_clause() {
        let text = "p cnf 2 1\n1 2\n";
        assert!(matches!(
            Cnf::parse(text.as_bytes()),
            Err(CnfError::UnterminatedClause)
        ));
    }

    #[test]
    fn dedups_repeated_literals() {
        let text = "p cnf 2 1\n1 1 2 0\n";
        let cnf = Cnf::parse(text.as_bytes()).unwrap();
        assert_eq!(lits(&cnf, 1), vec![1, 2]);
    }
}
