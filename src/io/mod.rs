//! Delimited-file collaborators: where records come from and totals go.

mod sink;
mod source;

pub use sink::*;
pub use source::*;
