// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Worker pool that runs purchase tasks and hands results back to the caller.
//!
//! The pool starts with `size` workers and adds one more whenever submitted
//! but unfinished tasks outnumber live workers, up to `2 × size`. Added
//! workers stay until shutdown. The queue is unbounded, so submission never
//! waits for capacity; [`TransactionScheduler::execute`] then blocks the
//! caller on a reply channel dedicated to that one task.

use crate::StationError;
use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug)]
struct Shared {
    receiver: Receiver<Job>,
    core: usize,
    max: usize,
    live: AtomicUsize,
    /// Submitted tasks that have not finished yet.
    in_flight: AtomicUsize,
    spawned: AtomicUsize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

/// Bounded-growth thread pool for purchase tasks.
#[derive(Debug)]
pub struct TransactionScheduler {
    sender: Option<Sender<Job>>,
    shared: Arc<Shared>,
}

impl TransactionScheduler {
    /// Starts `size` workers, allowing growth to `2 × size`.
    ///
    /// # Errors
    ///
    /// - [`StationError::InvalidWorkerCount`] - `size` is zero.
    /// - [`StationError::WorkerSpawn`] - a worker thread could not be started.
    pub fn new(size: usize) -> Result<Self, StationError> {
        if size == 0 {
            return Err(StationError::InvalidWorkerCount);
        }
        let (sender, receiver) = channel::unbounded();
        let scheduler = Self {
            sender: Some(sender),
            shared: Arc::new(Shared {
                receiver,
                core: size,
                max: size.saturating_mul(2),
                live: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                spawned: AtomicUsize::new(0),
                handles: Mutex::new(Vec::with_capacity(size)),
            }),
        };

        for _ in 0..size {
            scheduler.shared.live.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = spawn_worker(&scheduler.shared) {
                scheduler.shared.live.fetch_sub(1, Ordering::SeqCst);
                return Err(e);
            }
        }
        info!(
            "Transaction scheduler started with {} workers (max {})",
            scheduler.shared.core, scheduler.shared.max
        );
        Ok(scheduler)
    }

    /// Runs `task` on a worker and waits for its result.
    ///
    /// # Errors
    ///
    /// - [`StationError::TaskPanicked`] - the task panicked; the worker survives.
    /// - [`StationError::SchedulerClosed`] - the pool is shutting down.
    pub fn execute<T, F>(&self, task: F) -> Result<T, StationError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(StationError::SchedulerClosed)?;
        let (reply_tx, reply_rx) = channel::bounded(1);

        let shared = Arc::clone(&self.shared);
        let job: Job = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(task));
            shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            // Nobody to deliver to if the caller is gone.
            let _ = reply_tx.send(outcome);
        });

        let demand = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.grow(demand);

        if sender.send(job).is_err() {
            self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(StationError::SchedulerClosed);
        }

        match reply_rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => {
                let message = panic_message(&*payload);
                warn!("Transaction task panicked: {}", message);
                Err(StationError::TaskPanicked(message))
            }
            Err(_) => Err(StationError::SchedulerClosed),
        }
    }

    /// Workers currently running.
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::SeqCst)
    }

    pub fn core_workers(&self) -> usize {
        self.shared.core
    }

    pub fn max_workers(&self) -> usize {
        self.shared.max
    }

    /// Tasks submitted but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    /// Adds one worker if demand exceeds the live workers and room remains.
    fn grow(&self, demand: usize) {
        let mut live = self.shared.live.load(Ordering::SeqCst);
        while live < demand && live < self.shared.max {
            match self.shared.live.compare_exchange(
                live,
                live + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    match spawn_worker(&self.shared) {
                        Ok(()) => debug!("Scheduler grew to {} workers", live + 1),
                        Err(e) => {
                            self.shared.live.fetch_sub(1, Ordering::SeqCst);
                            warn!("Could not grow scheduler: {}", e);
                        }
                    }
                    return;
                }
                Err(actual) => live = actual,
            }
        }
    }
}

impl Drop for TransactionScheduler {
    fn drop(&mut self) {
        // Closing the queue lets every worker drain and exit.
        drop(self.sender.take());
        let handles = std::mem::take(&mut *self.shared.handles.lock());
        let count = handles.len();
        for handle in handles {
            let _ = handle.join();
        }
        debug!("Transaction scheduler stopped {} workers", count);
    }
}

fn spawn_worker(shared: &Arc<Shared>) -> Result<(), StationError> {
    let index = shared.spawned.fetch_add(1, Ordering::SeqCst);
    let worker = Arc::clone(shared);
    let handle = thread::Builder::new()
        .name(format!("station-worker-{index}"))
        .spawn(move || run_worker(worker))
        .map_err(|e| StationError::WorkerSpawn(e.to_string()))?;

    let mut handles = shared.handles.lock();
    handles.retain(|handle| !handle.is_finished());
    handles.push(handle);
    Ok(())
}

fn run_worker(shared: Arc<Shared>) {
    while let Ok(job) = shared.receiver.recv() {
        job();
    }
    shared.live.fetch_sub(1, Ordering::SeqCst);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::time::Duration;

    #[test]
    fn zero_workers_rejected() {
        let result = TransactionScheduler::new(0);
        assert_eq!(result.unwrap_err(), StationError::InvalidWorkerCount);
    }

    #[test]
    fn starts_core_workers() {
        let scheduler = TransactionScheduler::new(3).unwrap();
        assert_eq!(scheduler.live_workers(), 3);
        assert_eq!(scheduler.core_workers(), 3);
        assert_eq!(scheduler.max_workers(), 6);
    }

    #[test]
    fn execute_returns_task_result() {
        let scheduler = TransactionScheduler::new(1).unwrap();
        assert_eq!(scheduler.execute(|| 21 * 2), Ok(42));
        assert_eq!(scheduler.in_flight(), 0);
    }

    #[test]
    fn task_runs_on_worker_thread() {
        let scheduler = TransactionScheduler::new(1).unwrap();
        let name = scheduler
            .execute(|| thread::current().name().map(str::to_string))
            .unwrap();
        assert_eq!(name.as_deref(), Some("station-worker-0"));
    }

    #[test]
    fn panic_surfaces_to_caller_and_worker_survives() {
        let scheduler = TransactionScheduler::new(1).unwrap();

        let result: Result<(), _> = scheduler.execute(|| panic!("pump on fire"));
        assert_eq!(
            result,
            Err(StationError::TaskPanicked("pump on fire".to_string()))
        );

        assert_eq!(scheduler.execute(|| "still serving"), Ok("still serving"));
        assert_eq!(scheduler.live_workers(), 1);
    }

    #[test]
    fn formatted_panic_message_is_kept() {
        let scheduler = TransactionScheduler::new(1).unwrap();
        let pump = 7;
        let result: Result<(), _> = scheduler.execute(move || panic!("pump {pump} jammed"));
        assert_eq!(
            result,
            Err(StationError::TaskPanicked("pump 7 jammed".to_string()))
        );
    }

    #[test]
    fn grows_to_twice_core_size_under_load() {
        let scheduler = Arc::new(TransactionScheduler::new(2).unwrap());
        // Every task waits for all four, so all four must run at once.
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let scheduler = Arc::clone(&scheduler);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    scheduler.execute(move || {
                        barrier.wait();
                        i
                    })
                })
            })
            .collect();

        let mut results: Vec<usize> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().unwrap())
            .collect();
        results.sort();

        assert_eq!(results, vec![0, 1, 2, 3]);
        assert_eq!(scheduler.live_workers(), 4);
    }

    #[test]
    fn never_exceeds_twice_core_size() {
        let scheduler = Arc::new(TransactionScheduler::new(2).unwrap());
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let scheduler = Arc::clone(&scheduler);
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    scheduler
                        .execute(move || {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            running.fetch_sub(1, Ordering::SeqCst);
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert!(scheduler.live_workers() <= 4);
        assert!(scheduler.live_workers() >= 2);
    }

    #[test]
    fn drop_joins_workers() {
        let scheduler = TransactionScheduler::new(4).unwrap();
        let shared = Arc::clone(&scheduler.shared);
        drop(scheduler);

        assert_eq!(shared.live.load(Ordering::SeqCst), 0);
        assert!(shared.handles.lock().is_empty());
    }
}
