//! Target-platform wire format: numeric-keyed records and their schemas.

mod schemas;
mod translator;

pub use schemas::*;
pub use translator::*;
