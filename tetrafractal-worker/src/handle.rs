//! One subdivision run on its own thread
//!
//! The worker owns a fresh [`GeometryBuilder`](tetrafractal_core::GeometryBuilder)
//! for the duration of the run and sends back exactly one message: the
//! flattened buffers or the error that stopped it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, TryRecvError};
use log::{debug, info, warn};
use tetrafractal_core::{generate_with_cancel, Depth, Error, MeshBuffers, Result};

use crate::config::WorkerConfig;

/// Caller side of a single background subdivision run
#[derive(Debug)]
pub struct RunHandle {
    depth: Depth,
    receiver: Receiver<Result<MeshBuffers>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    started: Instant,
    finished: bool,
}

/// Validate `depth` and start subdividing it on a new worker thread.
///
/// An invalid depth is rejected before any thread is created.
pub fn spawn_subdivision(depth: u32, config: &WorkerConfig) -> Result<RunHandle> {
    let depth = Depth::new(depth)?;
    spawn_job(depth, config, generate_with_cancel)
}

pub(crate) fn spawn_job<F>(depth: Depth, config: &WorkerConfig, job: F) -> Result<RunHandle>
where
    F: FnOnce(Depth, &AtomicBool) -> Result<MeshBuffers> + Send + 'static,
{
    let (sender, receiver) = flume::bounded(1);
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let mut builder = thread::Builder::new().name(config.thread_name(depth.get()));
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }

    info!("Generating subdivision: depth = {}", depth);
    let started = Instant::now();

    let thread = builder
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(depth, &flag)))
                .unwrap_or_else(|payload| Err(Error::Worker(panic_message(payload.as_ref()))));

            match &outcome {
                Ok(buffers) => info!(
                    "Worker finished in {:.2?}. Vertices: {}, Faces: {}",
                    started.elapsed(),
                    buffers.vertex_count,
                    buffers.face_count()
                ),
                Err(Error::Cancelled) => debug!("Subdivision at depth {} cancelled", depth),
                Err(e) => warn!("Subdivision at depth {} failed: {}", depth, e),
            }

            // The caller may have dropped its handle; nobody is left to tell.
            let _ = sender.send(outcome);
        })
        .map_err(|e| Error::Worker(format!("Failed to spawn worker thread: {}", e)))?;

    Ok(RunHandle {
        depth,
        receiver,
        cancel,
        thread: Some(thread),
        started,
        finished: false,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("worker panicked: {}", detail)
}

impl RunHandle {
    /// Depth this run was started with
    pub fn depth(&self) -> Depth {
        self.depth
    }

    /// Time since the run was started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the result has already been taken from this handle
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Ask the worker to stop at its next node. The run then reports
    /// [`Error::Cancelled`] unless it had already completed.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Whether [`cancel`](Self::cancel) has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Take the result if the worker is done, without blocking.
    ///
    /// Returns `Some` exactly once per run.
    pub fn try_result(&mut self) -> Option<Result<MeshBuffers>> {
        if self.finished {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(outcome) => Some(self.complete(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(self.complete(Err(lost_worker()))),
        }
    }

    /// Block until the worker is done, for at most `timeout`
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Result<MeshBuffers>> {
        if self.finished {
            return None;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(self.complete(outcome)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(self.complete(Err(lost_worker()))),
        }
    }

    /// Block until the worker is done
    pub fn wait(mut self) -> Result<MeshBuffers> {
        if self.finished {
            return Err(already_taken());
        }
        let outcome = self.receiver.recv().unwrap_or_else(|_| Err(lost_worker()));
        self.complete(outcome)
    }

    /// Await the worker's result
    pub async fn result(mut self) -> Result<MeshBuffers> {
        if self.finished {
            return Err(already_taken());
        }
        let outcome = self
            .receiver
            .recv_async()
            .await
            .unwrap_or_else(|_| Err(lost_worker()));
        self.complete(outcome)
    }

    fn complete(&mut self, outcome: Result<MeshBuffers>) -> Result<MeshBuffers> {
        self.finished = true;
        // The worker has sent its only message and is exiting.
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        outcome
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel();
        }
    }
}

fn lost_worker() -> Error {
    Error::Worker("worker exited without sending a result".to_string())
}

fn already_taken() -> Error {
    Error::Worker("result already taken from this run".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(d: u32) -> Depth {
        Depth::new(d).unwrap()
    }

    #[test]
    fn test_invalid_depth_is_rejected_before_spawn() {
        let result = spawn_subdivision(9, &WorkerConfig::default());
        assert!(matches!(result, Err(Error::InvalidDepth { max: 8, .. })));
    }

    #[test]
    fn test_panic_becomes_single_failure() {
        let mut handle = spawn_job(depth(1), &WorkerConfig::default(), |_, _| {
            panic!("builder exploded")
        })
        .unwrap();

        let outcome = handle.wait_timeout(Duration::from_secs(5)).unwrap();
        match outcome {
            Err(Error::Worker(message)) => assert!(message.contains("builder exploded")),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(handle.is_finished());
        assert!(handle.try_result().is_none());
    }

    #[test]
    fn test_job_sees_cancel_flag() {
        let (release_tx, release_rx) = flume::bounded::<()>(0);
        let handle = spawn_job(depth(2), &WorkerConfig::default(), move |_, cancel| {
            let _ = release_rx.recv();
            if cancel.load(Ordering::Relaxed) {
                Err(Error::Cancelled)
            } else {
                Err(Error::Worker("flag not observed".into()))
            }
        })
        .unwrap();

        handle.cancel();
        assert!(handle.is_cancelled());
        release_tx.send(()).unwrap();
        assert!(matches!(handle.wait(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_thread_is_named_after_depth() {
        let config = WorkerConfig::default().with_thread_name_prefix("named");
        let handle = spawn_job(depth(3), &config, |d, _| {
            let name = thread::current().name().map(str::to_string);
            Err(Error::Worker(format!("{:?} at {}", name, d)))
        })
        .unwrap();

        match handle.wait() {
            Err(Error::Worker(message)) => assert_eq!(message, "Some(\"named-d3\") at 3"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
