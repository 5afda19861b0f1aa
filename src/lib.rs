//! Agent Sandbox library - keeps a sandboxed agent container in sync with
//! host-side configuration: files, environment, a network allowlist and
//! post-sync hooks.

pub mod cli;
pub mod config;
pub mod containers;
pub mod firewall;
pub mod fingerprint;
pub mod hooks;
pub mod layout;
pub mod manifest;
pub mod sync;
