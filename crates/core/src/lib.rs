//! Ad inventory reconciliation core.
//!
//! Keeps the apps and ad units of a managed ad-serving platform (the target)
//! in line with what an authoritative catalog (the source) declares. The
//! engine only ever touches entities whose names carry its managed prefix.
//!
//! - [`wire`]: numeric-keyed wire records and the translator framework
//! - [`inventory`]: typed records of both systems and the naming convention
//! - [`sync`]: templates, per-app reconciliation, the run driver and jobs
//! - [`config`]: run tunables, overridable from the environment

pub mod config;
pub mod errors;
pub mod inventory;
pub mod sync;
pub mod wire;

pub use config::SyncConfig;
pub use errors::{ClientError, ClientErrorKind, Error, Result};
