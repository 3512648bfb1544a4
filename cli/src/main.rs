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

//! The `dryad` binary: compile a DIMACS CNF into Decision-DNNF, or count its
//! weighted models directly.
#![deny(unreachable_pub)]

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;

use compiler::FormulaCache;
use nnf::NnfManager;
use sat::{Cnf, SatState};
use vtree::{Vtree, VtreeMethod};

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Cli {
    /// The input CNF, in DIMACS format (weights via a 'c weights' line)
    cnf: PathBuf,
    /// Read the vtree from a .vtree file instead of constructing one
    #[arg(long)]
    vtree: Option<PathBuf>,
    /// Vtree construction method when no file is given
    #[arg(long, value_enum, default_value_t = Method::Balanced)]
    vtree_method: Method,
    /// Write the vtree that was used to a .vtree file
    #[arg(long)]
    vtree_out: Option<PathBuf>,
    /// Write the vtree that was used as a graphviz dot file
    #[arg(long)]
    vtree_dot: Option<PathBuf>,
    /// Bucket count of the formula cache; a large prime
    #[arg(long, default_value_t = compiler::DEFAULT_CACHE_CAPACITY)]
    cache_capacity: usize,
    /// Count weighted models only, skipping compilation
    #[arg(short = 'W', long)]
    model_counter: bool,
    /// Count the models of the compiled NNF
    #[arg(short = 'c', long)]
    count_models: bool,
    /// Verify decomposability and clausal entailment of the compiled NNF
    #[arg(long)]
    check: bool,
    /// Where to write the compiled NNF; defaults to the CNF path with .nnf
    #[arg(long)]
    nnf_out: Option<PathBuf>,
    /// Keep the compiled NNF in memory only
    #[arg(long)]
    in_memory: bool,
    /// Whether to output debugging information
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Method {
    /// Balanced over the variable order
    Balanced,
    /// Right-linear over the variable order
    Linear,
}

impl From<Method> for VtreeMethod {
    fn from(method: Method) -> VtreeMethod {
        match method {
            Method::Balanced => VtreeMethod::Balanced,
            Method::Linear => VtreeMethod::RightLinear,
        }
    }
}

fn pretty_bytes(bytes: usize) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

fn report_cache(cache: &FormulaCache) {
    let audit = cache.audit();
    let lookups = cache.hits() + cache.misses();
    let hit_rate = if lookups > 0 {
        100.0 * cache.hits() as f64 / lookups as f64
    } else {
        0.0
    };
    println!("Cache stats:");
    println!("  hit rate   \t{hit_rate:.1}%");
    println!("  lookups    \t{lookups}");
    println!("  entries    \t{}", cache.count());
    println!("  memory     \t{}", pretty_bytes(cache.memory()));
    println!(
        "  chains     \t{:.1} avg, {} max",
        audit.avg_chain, audit.max_chain
    );
    println!("  keys       \t{:.1} B avg", audit.avg_key);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(false)
        .init();

    let total_start = Instant::now();
    let start = Instant::now();
    let formula = Cnf::from_file(&cli.cnf)
        .with_context(|| format!("reading {}", cli.cnf.display()))?;
    info!(
        vars = formula.var_count(),
        clauses = formula.clause_count(),
        elapsed = ?start.elapsed(),
        "constructed cnf"
    );
    let mut sat = SatState::new(formula);

    let start = Instant::now();
    let mut vtree = match &cli.vtree {
        Some(path) => vtree::io::load_from_file(path, &sat)
            .with_context(|| format!("reading {}", path.display()))?,
        None => Vtree::construct(cli.vtree_method.into(), &sat),
    };
    let widths = vtree.widths();
    info!(
        nodes = widths.node_count,
        max_context_clauses = widths.max_context_clauses,
        max_context_vars = widths.max_context_vars,
        cache_eligible = widths.cache_eligible,
        elapsed = ?start.elapsed(),
        "constructed vtree"
    );
    if let Some(path) = &cli.vtree_out {
        vtree::io::save_to_file(&vtree, path)
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "saved vtree");
    }
    if let Some(path) = &cli.vtree_dot {
        vtree::io::save_dot_to_file(&vtree, path)
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "saved vtree dot");
    }

    let mut cache = FormulaCache::new(cli.cache_capacity, &vtree);

    if cli.model_counter {
        let start = Instant::now();
        let count = compiler::count(&mut vtree, &mut cache, &mut sat);
        info!(elapsed = ?start.elapsed(), "counted");
        println!("Learned clauses \t{}", sat.learned_clause_count());
        report_cache(&cache);
        println!("Count           \t{count:.3}");
        println!("Total time: {:?}", total_start.elapsed());
        return Ok(());
    }

    let start = Instant::now();
    let mut nnf = NnfManager::new(sat.var_count());
    let root = compiler::compile(&mut vtree, &mut cache, &mut nnf, &mut sat);
    info!(elapsed = ?start.elapsed(), "compiled");
    let (nodes, edges) = nnf.size(root);
    println!("Learned clauses \t{}", sat.learned_clause_count());
    report_cache(&cache);
    println!("NNF stats:");
    println!("  nodes      \t{nodes}");
    println!("  edges      \t{edges}");
    println!("  memory     \t{}", pretty_bytes(nnf.memory()));

    if !cli.in_memory {
        let path = cli
            .nnf_out
            .clone()
            .unwrap_or_else(|| cli.cnf.with_extension("nnf"));
        let start = Instant::now();
        nnf::io::save_to_file(&nnf, &path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), elapsed = ?start.elapsed(), "saved nnf");
    }

    if cli.count_models {
        let start = Instant::now();
        let count = nnf.model_count();
        info!(elapsed = ?start.elapsed(), "counted nnf models");
        println!("Models          \t{count}");
    }

    if cli.check {
        let start = Instant::now();
        let decomposable = nnf.decomposable();
        println!(
            "Decomposability \t{}",
            if decomposable { "OK" } else { "FAILED" }
        );
        let entails = nnf.entails_cnf(&sat);
        println!(
            "Entailment      \t{}",
            match (decomposable, entails) {
                (_, true) => "OK",
                (true, false) => "FAILED",
                (false, false) => "undecided",
            }
        );
        info!(elapsed = ?start.elapsed(), "checked nnf");
    }

    println!("Total time: {:?}", total_start.elapsed());
    Ok(())
}
