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

#![deny(unreachable_pub)]
//! CNF formulas and the SAT state that drives dryad's compilation.
//!
//! A [`Cnf`](cnf::Cnf) is parsed from DIMACS (with an optional `c weights`
//! line for weighted model counting) and turned into a [`SatState`](state::SatState):
//! an assignment trail with decision levels, counter-based unit resolution,
//! clause subsumption and variable relevance tracking, and first-UIP clause
//! learning with assertion levels.
//!
//! The state is a scoped resource: every [`decide_literal`](state::SatState::decide_literal)
//! is paired with an [`undo_decide_literal`](state::SatState::undo_decide_literal),
//! and [`assert_unit_clauses`](state::SatState::assert_unit_clauses) with its
//! undo, restoring the trail exactly.

pub mod cnf;
pub mod state;

pub use cnf::{ClauseIdx, Cnf, CnfError, Lit, Var};
pub use state::{LearnedClause, SatState};
