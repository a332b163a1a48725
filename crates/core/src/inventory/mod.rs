//! Inventory records on both sides of a reconciliation.

mod naming;
mod source;
mod target;

pub use naming::*;
pub use source::*;
pub use target::*;
