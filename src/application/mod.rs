//! Application layer: orchestrates the domain against the ports.
//!
//! `RequestLifecycle` is the entry point for service requests. Every event runs as
//! load, pure decision, conditional write, then notification dispatch. The
//! `NotificationDispatcher` owns the only background task.

pub mod dashboard;
pub mod dispatcher;
pub mod intake;
pub mod lifecycle;
pub mod references;
