//! NFS read probe service library.
//!
//! Exposes the configuration and HTTP layers so integration tests can
//! drive the router directly.

pub mod config;
pub mod server;
