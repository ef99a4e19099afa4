//! Error types

mod fetch;
mod operation;
mod plugin;
mod sync;

pub use fetch::*;
pub use operation::*;
pub use plugin::*;
pub use sync::*;
