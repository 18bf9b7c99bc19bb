//! Pipeline module - orchestration of a resumable batch run.

mod batch;

pub use batch::*;
