//! Shared pieces of Trellis: catalog, wire types, logging, errors and config.

pub mod catalog;
pub mod colour;
pub mod config;
pub mod errors;
pub mod ipc;
pub mod log;
pub mod status;
pub mod time;
pub mod toggle;
