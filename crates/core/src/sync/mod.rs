//! Reconciliation engine: templates, per-app reconciliation, run control and jobs.

mod clients;
mod context;
mod driver;
mod events;
mod jobs;
mod reconcile;
mod stats;
mod templates;

pub use clients::*;
pub use context::*;
pub use driver::*;
pub use events::*;
pub use jobs::*;
pub use reconcile::*;
pub use stats::*;
pub use templates::*;
