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
//! The dryad core: vtree-driven compilation of CNF into Decision-DNNF, and
//! weighted model counting by the isomorphic traversal.
//!
//! The pieces fit together like this: [`key`] turns the residual CNF at a
//! vtree node into a compact bit vector, [`cache`] maps `(node, key)` to
//! previously computed results, and [`compile`]/[`count`] run the three-case
//! recursion (leaf, decomposition, Shannon) over the vtree, consulting the
//! cache at every node and purging subtrees when clause learning invalidates
//! them. Cache hit rate dominates the runtime on anything non-trivial.
//!
//! Both drivers own the SAT state for the duration of a run and restore it
//! exactly on every path, including learned-clause unwinds.

pub mod cache;
pub mod compile;
pub mod count;
pub mod key;

pub use cache::{CacheAudit, CacheValue, DEFAULT_CACHE_CAPACITY, FormulaCache};
pub use compile::compile;
pub use count::count;
