//! End-to-end sort tests: L1 → L2 → L3 through the pipeline.

mod common;

use common::{config, key_id_pairs, random_relation, reference_order};
use tiersort::{
    is_sorted, MemRelation, MergeStrategy, Pipeline, ResolvedStrategy, Stage, Tuple, TupleId,
};

fn payload_positions(tuples: &[Tuple]) -> Vec<String> {
    let mut v: Vec<String> = tuples
        .iter()
        .map(|t| String::from_utf8_lossy(&t.payload).into_owned())
        .collect();
    v.sort();
    v
}

#[test]
fn test_output_is_sorted_permutation() {
    let pipeline = Pipeline::new(config(16, 256, 4, 4)).unwrap();
    let rel = random_relation(1, 10_000, 500);

    let out = pipeline.sort(&rel).unwrap();

    assert_eq!(out.len(), 10_000);
    assert!(is_sorted(&out.tuples));
    // every source position appears exactly once
    let mut expected: Vec<String> = (0..10_000).map(|i| format!("p{i}")).collect();
    expected.sort();
    assert_eq!(payload_positions(&out.tuples), expected);
    // equal keys come out in source order
    assert_eq!(key_id_pairs(&out.tuples), reference_order(&rel));
}

#[test]
fn test_boundary_length_21_with_block_8() {
    // 21 = 2 full blocks + 5, and not a power of two at any L2 level
    let pipeline = Pipeline::new(config(8, 32, 2, 3)).unwrap();
    let rel = random_relation(21, 21, 10);

    let out = pipeline.sort(&rel).unwrap();

    assert_eq!(out.len(), 21);
    assert_eq!(key_id_pairs(&out.tuples), reference_order(&rel));
    assert!(out.tuples.iter().all(|t| !t.is_sentinel()));
    assert_eq!(out.report.plan.l1_blocks, 3);
    assert_eq!(out.report.plan.l2_rounds, 2);
    assert_eq!(out.report.plan.runs, 1);
}

#[test]
fn test_ragged_tail_through_several_l2_levels() {
    for n in [1, 2, 3, 7, 9, 63, 65, 100, 127, 129, 1000, 1025] {
        let pipeline = Pipeline::new(config(4, 64, 3, 2)).unwrap();
        let rel = random_relation(n as u64, n, 50);
        let out = pipeline.sort(&rel).unwrap();
        assert_eq!(key_id_pairs(&out.tuples), reference_order(&rel), "n = {n}");
    }
}

#[test]
fn test_fan_in_plus_one_runs_take_two_passes() {
    // C = 16 and 9 full runs; M = 8 so R = M + 1
    let pipeline = Pipeline::new(config(4, 16, 8, 4)).unwrap();
    let rel = random_relation(9, 9 * 16, 40);

    let out = pipeline.sort(&rel).unwrap();

    assert_eq!(out.report.plan.runs, 9);
    assert_eq!(out.report.plan.strategy, ResolvedStrategy::MPass);
    assert_eq!(out.report.plan.passes, 2);

    // same output as a single 9-way merge
    let wide = Pipeline::new(config(4, 16, 9, 4)).unwrap();
    let single = wide.sort(&rel).unwrap();
    assert_eq!(single.report.plan.strategy, ResolvedStrategy::MWay);
    assert_eq!(single.report.plan.passes, 1);
    assert_eq!(out.tuples, single.tuples);
}

#[test]
fn test_strategies_produce_identical_output() {
    let rel = random_relation(77, 5_000, 100);
    let base = config(8, 64, 200, 4);

    let auto = Pipeline::new(base.clone()).unwrap().sort(&rel).unwrap();
    let mpass = Pipeline::new(base.clone().with_strategy(MergeStrategy::MPass).with_fan_in(3))
        .unwrap()
        .sort(&rel)
        .unwrap();
    let mway = Pipeline::new(base.with_strategy(MergeStrategy::MWay))
        .unwrap()
        .sort(&rel)
        .unwrap();

    assert_eq!(auto.report.plan.strategy, ResolvedStrategy::MWay);
    assert_eq!(mway.report.plan.strategy, ResolvedStrategy::MWay);
    assert_eq!(mpass.report.plan.strategy, ResolvedStrategy::MPass);
    assert!(mpass.report.plan.passes > 1);
    assert_eq!(auto.tuples, mpass.tuples);
    assert_eq!(auto.tuples, mway.tuples);
}

#[test]
fn test_forced_mpass_with_few_runs_is_one_pass() {
    let pipeline =
        Pipeline::new(config(4, 16, 8, 2).with_strategy(MergeStrategy::MPass)).unwrap();
    let rel = random_relation(3, 40, 7);
    let out = pipeline.sort(&rel).unwrap();
    assert_eq!(out.report.plan.runs, 3);
    assert_eq!(out.report.plan.strategy, ResolvedStrategy::MPass);
    assert_eq!(out.report.plan.passes, 1);
    assert_eq!(key_id_pairs(&out.tuples), reference_order(&rel));
}

#[test]
fn test_sorting_sorted_input_is_identity() {
    let pipeline = Pipeline::new(config(16, 128, 4, 4)).unwrap();
    let rel = random_relation(5, 3_000, 1_000);

    let first = pipeline.sort(&rel).unwrap();
    let again = pipeline.sort_tuples(first.tuples.clone()).unwrap();

    // re-sorting keeps every tuple in place; ids are restamped to the same
    // positions because the input order is already the sort order
    let keys = |ts: &[Tuple]| ts.iter().map(|t| t.key).collect::<Vec<_>>();
    assert_eq!(keys(&again.tuples), keys(&first.tuples));
    let payloads = |ts: &[Tuple]| ts.iter().map(|t| t.payload.clone()).collect::<Vec<_>>();
    assert_eq!(payloads(&again.tuples), payloads(&first.tuples));
}

#[test]
fn test_output_is_reproducible() {
    let rel = random_relation(99, 20_000, 64);

    let a = Pipeline::new(config(32, 512, 4, 8)).unwrap().sort(&rel).unwrap();
    let b = Pipeline::new(config(32, 512, 4, 8)).unwrap().sort(&rel).unwrap();

    assert_ne!(a.report.id, b.report.id);
    assert!(a.report.reproduces(&b.report));
    assert_eq!(a.tuples, b.tuples);
}

#[test]
fn test_thread_count_does_not_change_output() {
    let rel = random_relation(123, 8_000, 30);
    let single = Pipeline::new(config(8, 256, 4, 1)).unwrap().sort(&rel).unwrap();
    let many = Pipeline::new(config(8, 256, 4, 8)).unwrap().sort(&rel).unwrap();
    assert_eq!(single.report.output_digest, many.report.output_digest);
}

#[test]
fn test_extreme_keys_sort_ahead_of_padding() {
    let pipeline = Pipeline::new(config(8, 32, 2, 2)).unwrap();
    let rel = MemRelation::from_keys([i64::MAX, i64::MIN, 0, i64::MAX, -1, i64::MAX, 1]);

    let out = pipeline.sort(&rel).unwrap();

    let keys: Vec<i64> = out.tuples.iter().map(|t| t.key).collect();
    assert_eq!(keys, vec![i64::MIN, -1, 0, 1, i64::MAX, i64::MAX, i64::MAX]);
    let max_ids: Vec<TupleId> = out.tuples[4..].iter().map(|t| t.id).collect();
    assert_eq!(max_ids, vec![TupleId::new(0), TupleId::new(3), TupleId::new(5)]);
}

#[test]
fn test_report_records_every_stage() {
    let pipeline = Pipeline::new(config(4, 16, 2, 2)).unwrap();
    let rel = random_relation(8, 100, 20);
    let out = pipeline.sort(&rel).unwrap();

    let report = &out.report;
    assert_eq!(
        report.stage_order(),
        vec![Stage::Ingest, Stage::RegisterSort, Stage::BitonicMerge, Stage::ExternalMerge]
    );
    assert_eq!(report.stage(Stage::RegisterSort).map(|t| t.runs_out), Some(25));
    assert_eq!(report.stage(Stage::BitonicMerge).map(|t| t.runs_out), Some(7));
    assert_eq!(report.stage(Stage::ExternalMerge).map(|t| t.runs_out), Some(1));
    assert_eq!(report.output_digest, tiersort::digest_tuples(&out.tuples));

    let json = report.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["plan"]["strategy"], "m-pass");
}
