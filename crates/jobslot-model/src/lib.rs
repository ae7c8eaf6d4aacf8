//! Domain types shared by the jobslot worker crates.
//!
//! Everything here is plain data: requests coming in, replies going out, and the artifact description passed between the downloader and runners.

mod domain;
pub use domain::*;

mod error;
pub use error::ModelError;
