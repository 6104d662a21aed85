//! Fixed worker pool with a barrier between stages.
//!
//! One pool is created per pipeline and reused by every stage. Within a stage
//! tasks are independent and handed out by rayon's work-stealing scheduler;
//! each task owns its output region outright (the task value carries the
//! `&mut` slices), so no two workers can write the same memory.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use tiersort_core::error::{Error, Result};
use tiersort_core::id::TaskId;
use tiersort_core::stage::Stage;

pub struct WorkerPool {
    pool: ThreadPool,
    threads: usize,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(Error::config("worker pool needs at least one thread"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tiersort-worker-{i}"))
            .build()
            .map_err(|e| Error::config(format!("cannot start worker pool: {e}")))?;
        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run every task of `stage` and return once all of them have finished.
    ///
    /// The first failure (an `Err` or a panic) is recorded and reported; tasks
    /// that have not started yet are skipped. Partial stage output is never
    /// returned to the caller, who must treat the whole buffer as invalid.
    ///
    /// Returns the number of tasks executed.
    pub fn run_stage<T, F>(&self, stage: Stage, tasks: Vec<T>, f: F) -> Result<usize>
    where
        T: Send,
        F: Fn(T) -> Result<()> + Sync + Send,
    {
        let total = tasks.len();
        let abort = AtomicBool::new(false);
        let first_failure: Mutex<Option<Error>> = Mutex::new(None);

        self.pool.install(|| {
            tasks
                .into_par_iter()
                .enumerate()
                .for_each(|(idx, task)| {
                    if abort.load(Ordering::Acquire) {
                        return;
                    }
                    let outcome = match catch_unwind(AssertUnwindSafe(|| f(task))) {
                        Ok(res) => res,
                        Err(panic) => Err(Error::task(
                            stage,
                            format!(
                                "{} panicked: {}",
                                TaskId::new(idx as u64),
                                panic_message(panic.as_ref())
                            ),
                        )),
                    };
                    if let Err(e) = outcome {
                        abort.store(true, Ordering::Release);
                        if let Ok(mut slot) = first_failure.lock() {
                            slot.get_or_insert(e);
                        }
                    }
                });
        });

        let failure = first_failure
            .into_inner()
            .map_err(|_| Error::Invariant("failure slot poisoned".into()))?;
        match failure {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tiersort_core::ErrorKind;

    #[test]
    fn zero_threads_rejected() {
        assert_eq!(WorkerPool::new(0).err().map(|e| e.kind()), Some(ErrorKind::Configuration));
    }

    #[test]
    fn tasks_write_disjoint_regions() {
        let pool = WorkerPool::new(4).unwrap();
        let mut data = vec![0usize; 1000];
        let tasks: Vec<(usize, &mut [usize])> = data.chunks_mut(64).enumerate().collect();
        let ran = pool
            .run_stage(Stage::RegisterSort, tasks, |(i, chunk)| {
                chunk.iter_mut().for_each(|v| *v = i);
                Ok(())
            })
            .unwrap();
        assert_eq!(ran, 16);
        assert!(data.iter().enumerate().all(|(pos, v)| *v == pos / 64));
    }

    #[test]
    fn failure_is_reported_with_stage() {
        let pool = WorkerPool::new(2).unwrap();
        let err = pool
            .run_stage(Stage::BitonicMerge, (0..32).collect(), |i: i32| {
                if i == 7 {
                    Err(Error::task(Stage::BitonicMerge, "scratch exhausted"))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TaskFailure);
        assert!(err.to_string().contains("scratch exhausted"));
    }

    #[test]
    fn panic_becomes_task_failure() {
        let pool = WorkerPool::new(2).unwrap();
        let err = pool
            .run_stage(Stage::ExternalMerge, vec![1, 2, 3], |i: i32| {
                if i == 2 {
                    panic!("cursor out of range");
                }
                Ok(())
            })
            .unwrap_err();
        match err {
            Error::Task { stage, reason } => {
                assert_eq!(stage, Stage::ExternalMerge);
                assert!(reason.contains("cursor out of range"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn single_thread_pool_runs_everything() {
        let pool = WorkerPool::new(1).unwrap();
        let hits = AtomicUsize::new(0);
        pool.run_stage(Stage::MergeJoin, vec![(); 10], |_| {
            hits.fetch_add(1, Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 10);
    }
}
