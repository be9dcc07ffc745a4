//! Framed Unix-domain-socket IPC transport (spec.md §4.1, §6).

pub mod client;
pub mod envelope;
pub mod frame;
pub mod server;
