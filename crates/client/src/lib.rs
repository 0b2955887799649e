//! Backend client and reconciliation runtime for the thesis admin console.
//!
//! - [`api`]: typed REST client over `reqwest`.
//! - [`backend`]: the [`ConsoleBackend`](backend::ConsoleBackend) seam.
//! - [`session`]: login / logout / whoami.
//! - [`reconciler`]: the poll loop owning a view's state.
//! - [`dispatcher`]: moderation commands with refresh-on-success.
//! - [`view`]: rendering of state into display rows.
//! - [`clipboard`]: uid copy with graceful failure.

pub mod api;
pub mod backend;
pub mod clipboard;
pub mod dispatcher;
pub mod reconciler;
pub mod session;
pub mod view;
