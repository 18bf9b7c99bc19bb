//! Core data models for ctlbreak.
//!
//! - `Record` / `ResultEntry`: what flows through the engine
//! - `Config`: the three locations a run needs
//! - `CtlBreakError`: the error taxonomy shared by every layer

mod config;
mod error;
mod record;

pub use config::*;
pub use error::*;
pub use record::*;
