//! Local HTTP control of a remote playback account.
//!
//! The crate is split along the two process boundaries it ships:
//!
//! - the control service (`playd` binary): axum handlers in [`server`],
//!   backed by the credential lifecycle in [`auth`] and the forwarded
//!   playback calls in [`remote`];
//! - the watchdog (`playd-watch` binary): the [`supervisor`] state machine
//!   that keeps the control service process alive and replaces it when the
//!   health endpoint stops answering.
//!
//! The two processes share nothing but the health endpoint and the process
//! lifecycle itself.

pub mod auth;
pub mod config;
pub mod remote;
pub mod server;
pub mod supervisor;
