//! Domain core for the thesis render admin console.
//!
//! Everything here is pure: job and user models, display formatting,
//! the job cache and filter engine, the stats change tracker and the
//! per-resource sync state machine.  Network I/O lives in
//! `thesis-client`.

pub mod error;
pub mod filter;
pub mod format;
pub mod job;
pub mod output_path;
pub mod roles;
pub mod state;
pub mod stats;
pub mod sync;
pub mod types;
pub mod user;
