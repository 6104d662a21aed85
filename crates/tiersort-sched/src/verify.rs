//! Debug-time verification helpers for run layouts.
//!
//! Intended for tests and debug builds; they panic on violation. Production
//! paths call them behind `cfg!(debug_assertions)` only.

use tiersort_core::run::RunMeta;
use tiersort_core::tuple::{is_sorted, Tuple};

/// Runs are consecutive, non-overlapping, and cover exactly `total` tuples.
pub fn assert_runs_tile(runs: &[RunMeta], total: usize) {
    let mut expected_start = 0;
    for r in runs {
        assert_eq!(
            r.start, expected_start,
            "run at {} overlaps or leaves a gap (expected start {expected_start})",
            r.start
        );
        assert!(r.len > 0, "empty run at {}", r.start);
        expected_start = r.end();
    }
    assert_eq!(expected_start, total, "runs cover {expected_start} of {total} tuples");
}

/// Every run is internally sorted.
pub fn assert_runs_sorted(buf: &[Tuple], runs: &[RunMeta]) {
    for r in runs {
        assert!(
            is_sorted(&buf[r.range()]),
            "run {}..{} (level {}) is not sorted",
            r.start,
            r.end(),
            r.level
        );
    }
}

/// No padding tuple survived past the stage that needed it.
pub fn assert_no_sentinels(buf: &[Tuple]) {
    if let Some(pos) = buf.iter().position(Tuple::is_sentinel) {
        panic!("sentinel tuple leaked at position {pos}");
    }
}
