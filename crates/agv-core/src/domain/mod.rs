//! Domain types for the AGV vision gateway.
//!
//! Pure values with no I/O: the addressed vehicle ([`command::TargetId`]),
//! the requested state ([`command::AgvState`]) and the pair used to key
//! scheduled commands ([`command::CommandKey`]).

pub mod command;
