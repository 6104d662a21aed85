//! Seeded data generators shared by the integration tests.

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tiersort::{Key, MemRelation, MergeStrategy, SortConfig, Tuple};

/// `n` records with keys drawn from `0..key_range`; the payload records the
/// source position so lost or duplicated tuples are detectable.
pub fn random_relation(seed: u64, n: usize, key_range: Key) -> MemRelation {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| (rng.gen_range(0..key_range), format!("p{i}").into_bytes()))
        .collect()
}

/// Left and right relations where roughly `overlap_pct` percent of the
/// right keys fall inside the left key range.
pub fn overlapping_pair(
    seed: u64,
    n_left: usize,
    n_right: usize,
    overlap_pct: u32,
) -> (MemRelation, MemRelation) {
    let mut rng = StdRng::seed_from_u64(seed);
    let span = (n_left as Key).max(1);
    let left: MemRelation = (0..n_left)
        .map(|i| (rng.gen_range(0..span), format!("l{i}").into_bytes()))
        .collect();
    let right: MemRelation = (0..n_right)
        .map(|i| {
            let key = if rng.gen_range(0..100) < overlap_pct {
                rng.gen_range(0..span)
            } else {
                span + rng.gen_range(0..span)
            };
            (key, format!("r{i}").into_bytes())
        })
        .collect();
    (left, right)
}

pub fn config(n: usize, c: usize, m: usize, threads: usize) -> SortConfig {
    SortConfig {
        register_block_size: n,
        cache_run_size: c,
        merge_fan_in: Some(m),
        thread_count: threads,
        merge_strategy: MergeStrategy::Auto,
        memory_budget_bytes: None,
    }
}

/// Reference order: stable sort by key, so equal keys keep source order.
pub fn reference_order(rel: &MemRelation) -> Vec<(Key, u64)> {
    let mut v: Vec<(Key, u64)> = rel
        .records()
        .iter()
        .enumerate()
        .map(|(i, (k, _))| (*k, i as u64))
        .collect();
    v.sort();
    v
}

pub fn key_id_pairs(tuples: &[Tuple]) -> Vec<(Key, u64)> {
    tuples.iter().map(|t| (t.key, t.id.get())).collect()
}
