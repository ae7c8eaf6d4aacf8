//! Single-slot worker controller.
//!
//! The worker is a loop over one ordered inbox. Requests from callers and completions from the downloader and the job thread all arrive as [`Message`]s, and every state change happens in [`Worker::step`]:
//!
//! | State | Message | Next |
//! |---|---|---|
//! | Idle | run | Downloading |
//! | Idle | shutdown / complete-and-shutdown / force-shutdown | Terminated |
//! | Downloading | artifact-ready | Running (Draining if drain recorded) |
//! | Downloading | download-failed / cancel | Idle |
//! | Downloading | force-shutdown | Terminated |
//! | Downloading | complete-and-shutdown | Downloading (drain recorded) |
//! | Running | job-completed | Idle |
//! | Running | cancel | Running (slot cleared by job-completed) |
//! | Running | complete-and-shutdown | Draining |
//! | Running, Draining | force-shutdown | Terminated |
//! | Draining | cancel | Draining |
//! | Draining | job-completed | Terminated |
//!
//! A run request while the slot is occupied is answered with `WorkerIsBusy` and changes nothing.

mod caller;
mod handle;
mod state;


pub use caller::Caller;
pub use handle::WorkerHandle;

use std::sync::Arc;

use jobslot_model::{Artifact, Failure, JobRequest, WorkerReply, WorkerState};
use jobslot_observe::{LogRoot, SinkFactory};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    config::WorkerConfig,
    download::Downloader,
    engine::ExecutionContext,
    error::CoreError,
    router::RunnerSelector,
    runner::RunContext,
    task::{self, TaskError, TaskHandle, TaskOutcome},
};
use handle::Message;
use state::{Slot, State};

const TARGET: &str = "jobslot.worker";

pub(crate) const CANCELLED_BEFORE_START: &str = "job was cancelled before starting";
pub(crate) const WORKER_STOPPED: &str = "worker stopped";

/// Why the worker loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Shutdown requested while idle, or every handle was dropped.
    Shutdown,
    /// Forced stop; any in-flight job was abandoned.
    ForceShutdown,
    /// The job running when a graceful shutdown was requested has concluded.
    Drained,
}

/// Collaborators the worker drives.
#[derive(Clone)]
pub struct WorkerDeps {
    pub downloader: Arc<dyn Downloader>,
    pub runners: Arc<dyn RunnerSelector>,
    pub engine: Arc<dyn ExecutionContext>,
    pub sinks: Arc<dyn SinkFactory>,
    pub log_root: Arc<dyn LogRoot>,
}

pub struct Worker {
    deps: WorkerDeps,
    config: WorkerConfig,
    inbox: mpsc::UnboundedReceiver<Message>,
    /// Weak so that dropping every [`WorkerHandle`] closes an idle worker.
    outbox: mpsc::WeakUnboundedSender<Message>,
    state_tx: watch::Sender<WorkerState>,
    next_ticket: u64,
}

impl Worker {
    pub fn new(deps: WorkerDeps, config: WorkerConfig) -> (Self, WorkerHandle) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);

        let worker = Self {
            deps,
            config,
            inbox,
            outbox: tx.downgrade(),
            state_tx,
            next_ticket: 0,
        };
        let handle = WorkerHandle {
            tx,
            state: state_rx,
        };
        (worker, handle)
    }

    /// Process messages until the worker terminates.
    pub async fn run(mut self) -> Exit {
        info!(target: TARGET, "worker ready");
        let mut state = State::Idle;

        let exit = loop {
            let Some(msg) = self.inbox.recv().await else {
                debug!(target: TARGET, "all handles dropped");
                self.abandon(state, Exit::Shutdown);
                break Exit::Shutdown;
            };

            let from = state.view();
            let event = msg.name();
            state = self.step(state, msg);

            let to = state.view();
            if from != to {
                debug!(target: TARGET, event, %from, %to, "transition");
                self.state_tx.send_replace(to);
            }
            if let State::Terminated(exit) = state {
                break exit;
            }
        };

        self.deps.downloader.stop();
        self.state_tx.send_replace(WorkerState::Terminated);
        info!(target: TARGET, ?exit, "worker terminated");
        exit
    }

    fn step(&mut self, state: State, msg: Message) -> State {
        match (state, msg) {
            // idle
            (State::Idle, Message::Run { request, caller }) => self.accept(request, caller),
            (State::Idle, Message::Shutdown | Message::CompleteAndShutdown) => {
                State::Terminated(Exit::Shutdown)
            }
            (State::Idle, Message::ForceShutdown) => State::Terminated(Exit::ForceShutdown),

            // occupied slot never queues
            (state, Message::Run { request, caller }) => {
                warn!(target: TARGET, job_id = %request.id, active = ?state.job_id().map(|id| id.as_str()), "worker busy; request rejected");
                caller.send(WorkerReply::WorkerIsBusy { id: request.id });
                state
            }

            // downloading
            (
                State::Downloading { slot, drain, .. },
                Message::ArtifactReady { ticket, artifact },
            ) if ticket == slot.ticket => self.launch(slot, artifact, drain),
            (State::Downloading { mut slot, .. }, Message::DownloadFailed { ticket, error })
                if ticket == slot.ticket =>
            {
                warn!(target: TARGET, job_id = %slot.id(), %error, "artifact download failed");
                self.detach_sink(&mut slot);
                self.fail(&slot, Failure::new(error.to_string()));
                State::Idle
            }
            (State::Downloading { mut slot, download, .. }, Message::Cancel { id, .. })
                if id == *slot.id() =>
            {
                info!(target: TARGET, job_id = %id, "job cancelled before starting");
                download.abort();
                self.detach_sink(&mut slot);
                slot.caller.send(WorkerReply::JobIsCancelled { id });
                self.fail(&slot, Failure::new(CANCELLED_BEFORE_START));
                State::Idle
            }
            (State::Downloading { mut slot, download, .. }, Message::ForceShutdown) => {
                download.abort();
                self.fail(&slot, Failure::new(WORKER_STOPPED));
                self.detach_sink(&mut slot);
                State::Terminated(Exit::ForceShutdown)
            }
            (State::Downloading { slot, download, .. }, Message::CompleteAndShutdown) => {
                info!(target: TARGET, job_id = %slot.id(), "drain recorded while downloading");
                State::Downloading {
                    slot,
                    download,
                    drain: true,
                }
            }

            // running
            (State::Running { slot, .. }, Message::JobCompleted { ticket, outcome })
                if ticket == slot.ticket =>
            {
                self.conclude(slot, outcome);
                State::Idle
            }
            (State::Running { mut slot, task }, Message::Cancel { id, requester })
                if id == *slot.id() =>
            {
                self.interrupt(&mut slot, &task, &requester);
                State::Running { slot, task }
            }
            (State::Running { slot, task }, Message::CompleteAndShutdown) => {
                info!(target: TARGET, job_id = %slot.id(), "draining; worker stops after this job");
                State::Draining { slot, task }
            }

            // draining
            (State::Draining { slot, .. }, Message::JobCompleted { ticket, outcome })
                if ticket == slot.ticket =>
            {
                self.conclude(slot, outcome);
                State::Terminated(Exit::Drained)
            }
            (State::Draining { mut slot, task }, Message::Cancel { id, requester })
                if id == *slot.id() =>
            {
                self.interrupt(&mut slot, &task, &requester);
                State::Draining { slot, task }
            }

            (
                state @ (State::Running { .. } | State::Draining { .. }),
                Message::ForceShutdown,
            ) => self.abandon(state, Exit::ForceShutdown),

            (state, msg) => {
                self.ignore(&state, &msg);
                state
            }
        }
    }

    /// Idle + run: occupy the slot and start the download.
    fn accept(&mut self, request: JobRequest, caller: Caller) -> State {
        if let Err(e) = request.validate().map_err(CoreError::from) {
            warn!(target: TARGET, job_id = %request.id, error = %e, "invalid request rejected");
            caller.send(WorkerReply::JobFailure {
                id: request.id,
                failure: Failure::new(e.to_string()),
            });
            return State::Idle;
        }

        self.next_ticket += 1;
        let mut slot = Slot {
            request,
            caller,
            ticket: self.next_ticket,
            sink: None,
            artifact: None,
            tagged: false,
        };

        if let Some(sink) = self.deps.sinks.for_job(slot.id()) {
            self.deps.log_root.attach(slot.id(), Arc::clone(&sink));
            slot.sink = Some(sink);
        }

        let Some(outbox) = self.outbox.upgrade() else {
            self.detach_sink(&mut slot);
            self.fail(&slot, Failure::new(WORKER_STOPPED));
            return State::Idle;
        };

        info!(target: TARGET, job_id = %slot.id(), artifact = %slot.request.params.artifact, "job accepted; downloading artifact");
        slot.caller.send(WorkerReply::JobFileDownloading {
            id: slot.id().clone(),
        });

        let downloader = Arc::clone(&self.deps.downloader);
        let reference = slot.request.params.artifact.clone();
        let ticket = slot.ticket;
        let download = tokio::spawn(async move {
            let msg = match downloader.download(&reference).await {
                Ok(artifact) => Message::ArtifactReady { ticket, artifact },
                Err(error) => Message::DownloadFailed { ticket, error },
            };
            let _ = outbox.send(msg);
        });

        State::Downloading {
            slot,
            download,
            drain: false,
        }
    }

    /// Downloading + artifact: pick a runner, tag the engine and start the job thread.
    fn launch(&mut self, mut slot: Slot, artifact: Artifact, drain: bool) -> State {
        let after_failure = if drain {
            State::Terminated(Exit::Drained)
        } else {
            State::Idle
        };

        slot.artifact = Some(artifact.clone());

        let Some(runner) = self.deps.runners.select(&artifact) else {
            let kind = artifact.kind.kind();
            warn!(target: TARGET, job_id = %slot.id(), kind, "no runner for artifact");
            self.release(&mut slot);
            self.fail(&slot, Failure::new(CoreError::NoRunner(kind.to_string()).to_string()));
            return after_failure;
        };
        let Some(outbox) = self.outbox.upgrade() else {
            self.release(&mut slot);
            self.fail(&slot, Failure::new(WORKER_STOPPED));
            return after_failure;
        };

        self.deps.engine.set_job_group(slot.id());
        slot.tagged = true;

        let engine = Arc::clone(&self.deps.engine);
        let request = slot.request.clone();
        let ticket = slot.ticket;
        let runner_name = runner.name();
        let started = task::start(
            format!("{}-{}", self.config.thread_prefix, slot.id()),
            self.config.trace_depth,
            move |interrupt| {
                let ctx = RunContext {
                    artifact: &artifact,
                    interrupt,
                    engine: &*engine,
                };
                runner.run(&request, &ctx)
            },
            move |outcome| {
                let _ = outbox.send(Message::JobCompleted { ticket, outcome });
            },
        );

        let task = match started {
            Ok(task) => task,
            Err(e) => {
                warn!(target: TARGET, job_id = %slot.id(), error = %e, "job thread failed to start");
                self.release(&mut slot);
                self.fail(&slot, Failure::new(format!("failed to start job thread: {e}")));
                return after_failure;
            }
        };

        info!(target: TARGET, job_id = %slot.id(), runner = runner_name, "job started");
        slot.caller.send(WorkerReply::JobStarted {
            id: slot.id().clone(),
        });

        if drain {
            State::Draining { slot, task }
        } else {
            State::Running { slot, task }
        }
    }

    /// Best-effort cancel of a running job. The slot stays occupied until its completion arrives.
    fn interrupt(&self, slot: &mut Slot, task: &TaskHandle, requester: &Caller) {
        info!(target: TARGET, job_id = %slot.id(), "cancelling running job");
        self.detach_sink(slot);
        self.deps.engine.cancel_job_group(slot.id());
        if let Some(stream) = self.deps.engine.active_stream() {
            debug!(target: TARGET, job_id = %slot.id(), stream = stream.name(), "stopping streaming engine");
            stream.stop(true);
        }
        task.cancel();
        requester.send(WorkerReply::JobIsCancelled {
            id: slot.id().clone(),
        });
    }

    /// Report the job's own completion and free the slot.
    fn conclude(&self, mut slot: Slot, outcome: TaskOutcome) {
        self.release(&mut slot);
        let id = slot.id().clone();
        match outcome {
            Ok(data) => {
                info!(target: TARGET, job_id = %id, "job succeeded");
                slot.caller.send(WorkerReply::JobSuccess { id, data });
            }
            Err(TaskError::Cancelled) => {
                info!(target: TARGET, job_id = %id, "job stopped after cancel");
                self.fail(&slot, Failure::new(TaskError::Cancelled.to_string()));
            }
            Err(TaskError::Failed {
                message,
                kind,
                trace,
            }) => {
                warn!(target: TARGET, job_id = %id, %kind, error = %message, "job failed");
                let failure = Failure::new(message)
                    .with_kind(kind)
                    .with_trace(trace)
                    .with_params(slot.request.params.clone());
                self.fail(&slot, failure);
            }
        }
    }

    /// Tear down whatever occupies the slot without reporting.
    fn abandon(&self, state: State, exit: Exit) -> State {
        match state {
            State::Running { mut slot, task } | State::Draining { mut slot, task } => {
                warn!(target: TARGET, job_id = %slot.id(), "abandoning running job");
                self.detach_sink(&mut slot);
                if slot.tagged {
                    self.deps.engine.cancel_job_group(slot.id());
                }
                task.cancel();
                self.release(&mut slot);
            }
            State::Downloading {
                mut slot, download, ..
            } => {
                download.abort();
                self.detach_sink(&mut slot);
            }
            State::Idle | State::Terminated(_) => {}
        }
        State::Terminated(exit)
    }

    fn ignore(&self, state: &State, msg: &Message) {
        match msg {
            Message::ArtifactReady { ticket, artifact } => {
                warn!(target: TARGET, ticket, event = msg.name(), state = %state.view(), "stale event dropped");
                self.deps.downloader.release(artifact);
            }
            Message::DownloadFailed { ticket, .. }
            | Message::JobCompleted { ticket, .. } => {
                warn!(target: TARGET, ticket, event = msg.name(), state = %state.view(), "stale event dropped");
            }
            Message::Cancel { id, .. } => {
                warn!(target: TARGET, job_id = %id, active = ?state.job_id().map(|id| id.as_str()), "cancel for inactive job ignored");
            }
            _ => {
                warn!(target: TARGET, event = msg.name(), state = %state.view(), "message ignored in current state");
            }
        }
    }

    fn fail(&self, slot: &Slot, failure: Failure) {
        slot.caller.send(WorkerReply::JobFailure {
            id: slot.id().clone(),
            failure,
        });
    }

    /// Detach the job's sink, at most once per job.
    fn detach_sink(&self, slot: &mut Slot) {
        if slot.sink.take().is_some() {
            self.deps.log_root.detach(slot.id());
        }
    }

    /// Detach the sink, drop the engine tag and hand the artifact back; each at most once.
    fn release(&self, slot: &mut Slot) {
        self.detach_sink(slot);
        if std::mem::take(&mut slot.tagged) {
            self.deps.engine.clear_job_group(slot.id());
        }
        if let Some(artifact) = slot.artifact.take() {
            self.deps.downloader.release(&artifact);
        }
    }
}
