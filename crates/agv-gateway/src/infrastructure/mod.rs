//! Infrastructure layer for the gateway.
//!
//! Contains the OS-facing adapters: the TCP acceptor and connection, and the
//! TOML config file.
//!
//! **Dependency rule**: this layer may depend on `application` and `agv_core`,
//! but MUST NOT be imported by the `application` layer.

pub mod config;
pub mod network;
