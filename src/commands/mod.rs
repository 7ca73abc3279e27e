//! IPC command handlers for the desktop front-end.
//!
//! Each handler is a thin wrapper over [`crate::dashboard::Dashboard`];
//! errors are flattened to strings, which the front-end shows as a blocking
//! notification.

pub mod invoices;
pub mod orders;
pub mod settings;
