//! TabHost: process lifecycle and state persistence for a multi-window
//! browser host.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod config;
pub mod host;
pub mod logging;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod testing;
pub mod types;
