//! bumpscout - upgrade resolution for package.json dependencies
//!
//! This library finds newer versions of declared npm dependencies:
//! - Registry backends for npm (HTTP registry) and yarn (CLI)
//! - Version selection under patch / minor / major / latest / tag policies
//! - Peer-range resolution across the whole dependency set
//! - Concurrent, cancellable orchestration of all of the above

pub mod cancel;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod registry;
pub mod update;
