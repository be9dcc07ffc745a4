pub mod adapters;
pub mod ipc;
pub mod ipc_adapters;
pub mod observability;
pub mod persistence;
