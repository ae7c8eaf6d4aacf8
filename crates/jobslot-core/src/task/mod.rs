//! Cancellable work on a dedicated thread.
//!
//! [`start`] runs a job body on its own OS thread and hands back a [`TaskHandle`].
//! The body's outcome is delivered exactly once through the completion callback, whether it finished naturally, failed, panicked or observed a cancel.
//! [`TaskHandle::cancel`] is best-effort: it fires the [`Interrupt`] and unparks the thread, and does nothing once the body has returned.

use std::{
    any::Any,
    backtrace::BacktraceStatus,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, Thread},
    time::{Duration, Instant},
};

use jobslot_model::JobData;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::runner::RunError;

const TARGET: &str = "jobslot.task";

/// Outcome posted when a task ends.
pub type TaskOutcome = Result<JobData, TaskError>;

/// Classified task failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The body observed cooperative interruption.
    #[error("execution was cancelled")]
    Cancelled,
    #[error("{message}")]
    Failed {
        message: String,
        kind: String,
        trace: Vec<String>,
    },
}

impl TaskError {
    /// `interrupted` is whether cancel had fired when the body returned.
    fn from_run_error(err: RunError, depth: usize, interrupted: bool) -> Self {
        match err {
            RunError::Interrupted => TaskError::Cancelled,
            RunError::Failed { error, .. } if interrupted || wraps_interrupt(&error) => {
                TaskError::Cancelled
            }
            RunError::Failed { kind, error } => {
                let mut trace: Vec<String> = error
                    .chain()
                    .skip(1)
                    .map(|cause| format!("caused by: {cause}"))
                    .collect();

                let backtrace = error.backtrace();
                if backtrace.status() == BacktraceStatus::Captured {
                    trace.extend(
                        backtrace
                            .to_string()
                            .lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty())
                            .map(str::to_string),
                    );
                }
                trace.truncate(depth);

                TaskError::Failed {
                    message: error.to_string(),
                    kind: kind.to_string(),
                    trace,
                }
            }
        }
    }

    fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "job panicked".to_string()
        };
        TaskError::Failed {
            message,
            kind: "panic".to_string(),
            trace: Vec::new(),
        }
    }
}

/// An interrupt observed deep in the body and wrapped with context on the way out.
fn wraps_interrupt(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<RunError>(), Some(RunError::Interrupted)))
}

/// Cooperative interruption signal seen by a running body.
#[derive(Debug, Clone)]
pub struct Interrupt {
    token: CancellationToken,
}

impl Interrupt {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `Err(RunError::Interrupted)` once the task has been cancelled.
    #[inline]
    pub fn check(&self) -> Result<(), RunError> {
        if self.is_interrupted() {
            Err(RunError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Block the current thread for `dur`, waking early on cancel.
    pub fn sleep(&self, dur: Duration) -> Result<(), RunError> {
        let deadline = Instant::now() + dur;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::park_timeout(deadline - now);
        }
    }

    /// Token for bodies that drive async work (e.g. `select!` on `cancelled()`).
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    fn fire(&self) {
        self.token.cancel();
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner-side handle of a started task.
#[derive(Debug)]
pub struct TaskHandle {
    interrupt: Interrupt,
    thread: Thread,
    finished: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Request cooperative cancellation. Idempotent; a no-op after the body returned.
    pub fn cancel(&self) {
        if self.is_finished() || self.interrupt.is_interrupted() {
            return;
        }
        debug!(target: TARGET, thread = ?self.thread.name(), "interrupting task");
        self.interrupt.fire();
        self.thread.unpark();
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.interrupt.is_interrupted()
    }
}

/// Run `work` on a new thread named `name`.
///
/// `on_done` is called exactly once on that thread with the classified outcome.
/// Failure traces are truncated to `trace_depth` lines.
pub fn start<W, D>(name: String, trace_depth: usize, work: W, on_done: D) -> io::Result<TaskHandle>
where
    W: FnOnce(&Interrupt) -> Result<JobData, RunError> + Send + 'static,
    D: FnOnce(TaskOutcome) + Send + 'static,
{
    start_with(Interrupt::new(), name, trace_depth, work, on_done)
}

fn start_with<W, D>(
    interrupt: Interrupt,
    name: String,
    trace_depth: usize,
    work: W,
    on_done: D,
) -> io::Result<TaskHandle>
where
    W: FnOnce(&Interrupt) -> Result<JobData, RunError> + Send + 'static,
    D: FnOnce(TaskOutcome) + Send + 'static,
{
    let finished = Arc::new(AtomicBool::new(false));

    let body_interrupt = interrupt.clone();
    let body_finished = Arc::clone(&finished);

    let join = thread::Builder::new().name(name).spawn(move || {
        // cancelled between launch and this thread getting scheduled
        let outcome = if body_interrupt.is_interrupted() {
            debug!(target: TARGET, "cancelled before the body started");
            Err(TaskError::Cancelled)
        } else {
            trace!(target: TARGET, "task body starting");
            match panic::catch_unwind(AssertUnwindSafe(|| work(&body_interrupt))) {
                Ok(Ok(data)) => Ok(data),
                Ok(Err(err)) => Err(TaskError::from_run_error(
                    err,
                    trace_depth,
                    body_interrupt.is_interrupted(),
                )),
                Err(payload) => Err(TaskError::from_panic(payload)),
            }
        };
        body_finished.store(true, Ordering::Release);
        trace!(target: TARGET, ok = outcome.is_ok(), "task body finished");
        on_done(outcome);
    })?;

    Ok(TaskHandle {
        interrupt,
        thread: join.thread().clone(),
        finished,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn data(key: &str, value: i64) -> JobData {
        let mut d = JobData::new();
        d.insert(key.to_string(), value.into());
        d
    }

    #[test]
    fn delivers_success_once() {
        let (tx, rx) = mpsc::channel();
        let handle = start("t-ok".into(), 10, |_| Ok(data("x", 1)), move |out| {
            tx.send(out).unwrap();
        })
        .unwrap();

        let out = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(out, Ok(data("x", 1)));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        while !handle.is_finished() {
            thread::yield_now();
        }
        handle.cancel();
        assert!(!handle.is_cancelled(), "cancel after completion must be a no-op");
    }

    #[test]
    fn cancel_wakes_sleeping_body() {
        let (tx, rx) = mpsc::channel();
        let handle = start(
            "t-sleep".into(),
            10,
            |interrupt| {
                interrupt.sleep(Duration::from_secs(30))?;
                Ok(JobData::new())
            },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        handle.cancel();
        handle.cancel();

        let out = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(out, Err(TaskError::Cancelled));
        assert_eq!(
            TaskError::Cancelled.to_string(),
            "execution was cancelled"
        );
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn cancel_before_body_starts_skips_it() {
        let (tx, rx) = mpsc::channel();
        let ran = Arc::new(AtomicBool::new(false));
        let body_ran = Arc::clone(&ran);

        let interrupt = Interrupt::new();
        interrupt.fire();
        start_with(
            interrupt,
            "t-early".into(),
            10,
            move |_| {
                body_ran.store(true, Ordering::SeqCst);
                Ok(JobData::new())
            },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Err(TaskError::Cancelled)
        );
        assert!(!ran.load(Ordering::SeqCst));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn interrupt_wrapped_in_context_is_still_cancel() {
        use anyhow::Context;

        let (tx, rx) = mpsc::channel();
        let handle = start(
            "t-ctx".into(),
            10,
            |interrupt| {
                interrupt
                    .sleep(Duration::from_secs(30))
                    .context("waiting for epoch")?;
                Ok(JobData::new())
            },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        handle.cancel();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Err(TaskError::Cancelled)
        );
    }

    #[test]
    fn error_after_cancel_is_cancel() {
        let (tx, rx) = mpsc::channel();
        let handle = start(
            "t-late-err".into(),
            10,
            |interrupt| {
                while !interrupt.is_interrupted() {
                    thread::park_timeout(Duration::from_millis(10));
                }
                Err(RunError::msg("connection reset"))
            },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        handle.cancel();
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            Err(TaskError::Cancelled)
        );
    }

    #[test]
    fn failure_keeps_cause_chain_truncated() {
        let (tx, rx) = mpsc::channel();
        start(
            "t-fail".into(),
            1,
            |_| {
                let err = anyhow::anyhow!("root cause")
                    .context("middle")
                    .context("loading dataset");
                Err(RunError::from(err))
            },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            Err(TaskError::Failed {
                message,
                kind,
                trace,
            }) => {
                assert_eq!(message, "loading dataset");
                assert_eq!(kind, "anyhow::Error");
                assert_eq!(trace, vec!["caused by: middle".to_string()]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn panic_is_reported_as_failure() {
        let (tx, rx) = mpsc::channel();
        start(
            "t-panic".into(),
            10,
            |_| -> Result<JobData, RunError> { panic!("bad tensor shape") },
            move |out| tx.send(out).unwrap(),
        )
        .unwrap();

        match rx.recv_timeout(Duration::from_secs(5)).unwrap() {
            Err(TaskError::Failed { message, kind, .. }) => {
                assert_eq!(message, "bad tensor shape");
                assert_eq!(kind, "panic");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
