//! Core types, config, errors, and the line-protocol session model for Rusty Logo.

pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
