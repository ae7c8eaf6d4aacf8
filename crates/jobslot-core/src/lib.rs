//! Single-slot job worker.
//!
//! The [`Worker`] owns one job slot and drives three asynchronous activities through a single ordered inbox:
//! the artifact download, the job body running on its own thread, and externally triggered cancel/shutdown signals.
//! Collaborators ([`Downloader`], [`RunnerSelector`], [`ExecutionContext`], log sinks) are injected through [`WorkerDeps`].

mod config;
pub use config::WorkerConfig;

mod download;
pub use download::{DownloadError, Downloader};

mod engine;
pub use engine::{ExecutionContext, StreamEngine};

pub mod error;
pub use error::CoreError;

pub mod router;
pub use router::{RunnerRouter, RunnerSelector};

pub mod runner;
pub use runner::{RunContext, RunError, Runner};

pub mod task;
pub use task::{Interrupt, TaskError, TaskHandle, TaskOutcome};

pub mod worker;
pub use worker::{Caller, Exit, Worker, WorkerDeps, WorkerHandle};
