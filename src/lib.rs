//! Session-scoped tabular data workbench.
//!
//! Ingested CSV tables are cached process-wide under opaque keys; each session
//! layers its own sparse cell edits over them, pages through the result and
//! exports a merged copy.

pub mod constants;
pub mod data;
pub mod perf;
pub mod server;
pub mod settings;
pub mod types;
pub mod workbench;

pub use settings::Settings;
pub use workbench::{Export, Workbench};
