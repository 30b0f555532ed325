use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};


/// Снимок состояния пула
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    pub num_threads: usize,
    pub active_tasks: usize,
    pub idle_workers: usize,
    pub queued_tasks: usize,
    pub total_spawned: usize,
    pub completed_tasks: usize,
    pub failed_tasks: usize,
}

impl PoolMetrics {
    pub fn utilization(&self) -> f64 {
        if self.active_tasks + self.idle_workers == 0 {
            return 0.0;
        }
        self.active_tasks as f64 / (self.active_tasks + self.idle_workers) as f64
    }

    pub fn queue_pressure(&self) -> f64 {
        self.queued_tasks as f64 / self.num_threads.max(1) as f64
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed_tasks + self.failed_tasks;
        if total == 0 {
            return 1.0;
        }
        self.completed_tasks as f64 / total as f64
    }
}


/// Счетчики, которые обновляют все воркеры; разнесены по кэш-линиям
#[derive(Debug, Default)]
pub(crate) struct TaskCounters {
    total_spawned: CachePadded<AtomicUsize>,
    completed: CachePadded<AtomicUsize>,
    failed: CachePadded<AtomicUsize>,
}

impl TaskCounters {
    #[inline]
    pub(crate) fn spawned(&self) {
        self.total_spawned.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn finished(&self, ok: bool) {
        if ok {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn total_spawned(&self) -> usize {
        self.total_spawned.load(Ordering::Relaxed)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub(crate) fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }
}
