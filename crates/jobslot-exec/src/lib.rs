//! Local collaborators for the jobslot worker: filesystem downloader, function and process runners, in-process engine.

mod error;
pub use error::{ExecError, ExecResult};

mod util;

pub mod download;
pub use download::LocalDownloader;

pub mod engine;
pub use engine::{LocalEngine, LocalStream};

pub mod r#fn;
pub use r#fn::{FnRunner, JobFn};

#[cfg(feature = "proc")]
pub mod proc;
#[cfg(feature = "proc")]
pub use proc::{ProcConfig, ProcRunner};

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{FnRunner, LocalDownloader, LocalEngine};
    #[cfg(feature = "proc")]
    pub use crate::{ProcConfig, ProcRunner};
}
