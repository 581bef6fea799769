// ABOUTME: Library root for hostssh - per-host SSH sessions and their ambient pieces.
// ABOUTME: The CLI binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod event_log;
pub mod output;
pub mod probe;
pub mod ssh;
pub mod wait;
