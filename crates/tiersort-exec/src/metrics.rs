//! Stage timing and tracing hooks.
//!
//! With the `tracing` feature every stage runs inside an `info` span named
//! after it and closes with a `debug` event carrying its counters. Without
//! the feature only the wall-clock timing is kept.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tiersort_core::stage::Stage;

use crate::report::StageTiming;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(feature = "tracing")]
pub fn emit(stage: Stage, key_values: &[(&str, String)]) {
    for (k, v) in key_values {
        tracing::debug!(stage = %stage, %k, %v, "metric");
    }
}

#[cfg(not(feature = "tracing"))]
pub fn emit(_stage: Stage, _key_values: &[(&str, String)]) { /* no-op */
}

/// Measures one stage from `start` to `finish`.
pub struct StageTimer {
    stage: Stage,
    tuples: usize,
    started: Instant,
    #[cfg(feature = "tracing")]
    _span: tracing::span::EnteredSpan,
}

impl StageTimer {
    pub fn start(stage: Stage, tuples: usize) -> Self {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("stage", name = %stage, tuples).entered();

        Self {
            stage,
            tuples,
            started: Instant::now(),
            #[cfg(feature = "tracing")]
            _span,
        }
    }

    pub fn finish(self, runs_out: usize) -> StageTiming {
        let elapsed_micros = self.started.elapsed().as_micros() as u64;
        emit(
            self.stage,
            &[
                ("tuples", self.tuples.to_string()),
                ("runs_out", runs_out.to_string()),
                ("elapsed_us", elapsed_micros.to_string()),
            ],
        );
        StageTiming {
            stage: self.stage,
            elapsed_micros,
            tuples: self.tuples,
            runs_out,
        }
    }
}
