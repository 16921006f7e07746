//! Generation-tagged dispatch of subdivision runs
//!
//! Every dispatch supersedes the previous one. Runs still in flight are
//! cancelled and kept until their thread reports back; whatever they send is
//! discarded, so a slow deep run can never overwrite the result of a newer,
//! shallower one.

use std::fmt;
use std::time::{Duration, Instant};

use log::debug;
use tetrafractal_core::{Depth, MeshBuffers, Result};

use crate::config::WorkerConfig;
use crate::handle::{spawn_subdivision, RunHandle};

/// Monotonically increasing tag of a dispatched run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The raw counter value
    pub fn get(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of the most recently dispatched run
#[derive(Debug)]
pub struct Completion {
    pub generation: Generation,
    pub depth: Depth,
    pub outcome: Result<MeshBuffers>,
    /// Time from dispatch to delivery
    pub elapsed: Duration,
}

/// Starts subdivision runs and filters their results down to the latest one
#[derive(Debug)]
pub struct SubdivisionDispatcher {
    config: WorkerConfig,
    counter: Generation,
    latest: Option<Generation>,
    runs: Vec<(Generation, RunHandle)>,
}

impl SubdivisionDispatcher {
    /// Create a dispatcher with no runs
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            counter: Generation(0),
            latest: None,
            runs: Vec::new(),
        }
    }

    /// Start a run at `depth`, superseding any run still in flight.
    ///
    /// A rejected dispatch, whether for an invalid depth or a worker thread
    /// that failed to start, leaves the current generation and its run intact.
    pub fn dispatch(&mut self, depth: u32) -> Result<Generation> {
        let handle = spawn_subdivision(depth, &self.config)?;

        for (generation, run) in &self.runs {
            if !run.is_cancelled() {
                debug!("Cancelling superseded run {} at depth {}", generation, run.depth());
                run.cancel();
            }
        }

        let generation = self.counter.next();
        self.counter = generation;
        self.latest = Some(generation);
        self.runs.push((generation, handle));
        Ok(generation)
    }

    /// Latest dispatched generation, if any
    pub fn latest(&self) -> Option<Generation> {
        self.latest
    }

    /// Whether the latest run has not been delivered yet
    pub fn is_busy(&self) -> bool {
        self.runs.iter().any(|(g, _)| Some(*g) == self.latest)
    }

    /// Number of runs whose thread has not reported back, stale ones included
    pub fn in_flight(&self) -> usize {
        self.runs.len()
    }

    /// Cancel every run; nothing more will be delivered
    pub fn cancel_all(&mut self) {
        for (_, run) in &self.runs {
            run.cancel();
        }
        self.latest = None;
    }

    /// Collect finished runs without blocking.
    ///
    /// Returns the completion of the latest generation once; finished stale
    /// runs are dropped.
    pub fn poll(&mut self) -> Option<Completion> {
        let mut delivered = None;
        let mut index = 0;
        while index < self.runs.len() {
            let (generation, run) = &mut self.runs[index];
            match run.try_result() {
                Some(outcome) => {
                    let generation = *generation;
                    let (_, run) = self.runs.swap_remove(index);
                    if let Some(completion) = self.accept(generation, &run, outcome) {
                        delivered = Some(completion);
                    }
                }
                None => index += 1,
            }
        }
        delivered
    }

    /// Block for at most `timeout` until the latest generation completes
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Completion> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(completion) = self.poll() {
                return Some(completion);
            }

            let latest = self.latest?;
            let index = self.runs.iter().position(|(g, _)| *g == latest)?;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }

            if let Some(outcome) = self.runs[index].1.wait_timeout(remaining) {
                let (generation, run) = self.runs.swap_remove(index);
                // Reap stale runs that finished meanwhile
                let _ = self.poll();
                return self.accept(generation, &run, outcome);
            }
        }
    }

    fn accept(
        &self,
        generation: Generation,
        run: &RunHandle,
        outcome: Result<MeshBuffers>,
    ) -> Option<Completion> {
        if Some(generation) != self.latest {
            debug!(
                "Discarding stale result of run {} at depth {} ({})",
                generation,
                run.depth(),
                match &outcome {
                    Ok(buffers) => format!("{} faces", buffers.face_count()),
                    Err(e) => e.to_string(),
                }
            );
            return None;
        }

        Some(Completion {
            generation,
            depth: run.depth(),
            outcome,
            elapsed: run.elapsed(),
        })
    }
}

impl Default for SubdivisionDispatcher {
    fn default() -> Self {
        Self::new(WorkerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tetrafractal_core::Error;

    #[test]
    fn test_generations_increase() {
        let mut dispatcher = SubdivisionDispatcher::default();
        let first = dispatcher.dispatch(0).unwrap();
        let second = dispatcher.dispatch(1).unwrap();
        assert!(second > first);
        assert_eq!(dispatcher.latest(), Some(second));
        assert_eq!(second.to_string(), format!("#{}", second.get()));
    }

    #[test]
    fn test_invalid_depth_keeps_generation() {
        let mut dispatcher = SubdivisionDispatcher::default();
        let generation = dispatcher.dispatch(2).unwrap();
        assert!(dispatcher.dispatch(42).is_err());
        assert_eq!(dispatcher.latest(), Some(generation));

        let completion = dispatcher.wait_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(completion.generation, generation);
    }

    #[test]
    fn test_failed_spawn_keeps_current_run() {
        let mut dispatcher = SubdivisionDispatcher::default();
        let generation = dispatcher.dispatch(1).unwrap();

        // A stack this large cannot be reserved, so the thread never starts
        dispatcher.config = WorkerConfig::default().with_stack_size(usize::MAX / 2);
        assert!(matches!(dispatcher.dispatch(2), Err(Error::Worker(_))));
        assert_eq!(dispatcher.latest(), Some(generation));
        assert_eq!(dispatcher.in_flight(), 1);

        let completion = dispatcher.wait_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(completion.generation, generation);
        assert_eq!(completion.depth.get(), 1);
        assert!(completion.outcome.is_ok());

        dispatcher.config = WorkerConfig::default();
        let next = dispatcher.dispatch(0).unwrap();
        assert_eq!(next.get(), generation.get() + 1);
    }

    #[test]
    fn test_cancel_all_delivers_nothing() {
        let mut dispatcher = SubdivisionDispatcher::default();
        dispatcher.dispatch(3).unwrap();
        dispatcher.cancel_all();

        assert!(!dispatcher.is_busy());
        assert!(dispatcher.wait_timeout(Duration::from_millis(200)).is_none());
    }
}
