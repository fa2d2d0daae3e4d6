//! Aggregate run statistics and the bordered completion report (section 7:
//! "the coordinator prints a bordered statistics block on completion").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::allocator::TaskAllocator;
use crate::registry::WorkerRegistry;

pub struct Stats {
    pub results_found: AtomicU64,
    best_score: Mutex<f64>,
    pub started_at: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            results_found: AtomicU64::new(0),
            best_score: Mutex::new(f64::MIN),
            started_at: Instant::now(),
        }
    }

    pub fn record_result(&self, score: f64) {
        self.results_found.fetch_add(1, Ordering::Relaxed);
        let mut best = self.best_score.lock().unwrap();
        if score > *best {
            *best = score;
        }
    }

    pub fn best_score(&self) -> Option<f64> {
        let best = *self.best_score.lock().unwrap();
        if best == f64::MIN {
            None
        } else {
            Some(best)
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints the final bordered statistics block, plus a verification line
/// when `expected_solutions` is known (as for the `numeric_match`
/// predicate's single-needle search, section 8 scenario 1).
pub fn print_final_report(
    allocator: &TaskAllocator,
    registry: &WorkerRegistry,
    stats: &Stats,
    expected_solutions: Option<u64>,
) {
    let total_tasks = allocator.total_tasks();
    let distributed = allocator.distributed();
    let workers = registry.snapshot();
    let completed: u64 = workers
        .iter()
        .map(|w| w.tasks_completed.load(Ordering::Relaxed))
        .sum();
    let found = stats.results_found.load(Ordering::Relaxed);
    let elapsed = stats.started_at.elapsed();
    let elapsed_secs = elapsed.as_secs_f64().max(1e-9);
    let throughput = completed as f64 / elapsed_secs;

    let border = "=".repeat(60);
    println!("{border}");
    println!(" Brute-Force Swarm Engine — run complete");
    println!("{}", "-".repeat(60));
    println!(" total tasks       : {total_tasks}");
    println!(" tasks distributed : {distributed}");
    println!(" tasks completed   : {completed}");
    println!(" solutions found   : {found}");
    match stats.best_score() {
        Some(score) => println!(" best score        : {score:.6}"),
        None => println!(" best score        : n/a"),
    }
    println!(" elapsed           : {:.3}s", elapsed.as_secs_f64());
    println!(" throughput        : {throughput:.1} tasks/sec");
    if let Some(expected) = expected_solutions {
        let verdict = if found == expected { "SUCCESS" } else { "FAILURE" };
        println!(" verification       : {verdict} (expected {expected}, found {found})");
    }
    println!("{border}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_score_tracks_the_maximum() {
        let stats = Stats::new();
        assert_eq!(stats.best_score(), None);
        stats.record_result(0.5);
        stats.record_result(0.9);
        stats.record_result(0.1);
        assert_eq!(stats.best_score(), Some(0.9));
    }
}
