// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod api;
pub mod classify;
pub mod db;
pub mod error;
pub mod gallery;
pub mod listing;
pub mod metrics;
pub mod repository;
pub mod scheduler;
pub mod seed;
pub mod services;
pub mod store;
pub mod sync;

// Startup plumbing used by the binary.
pub mod cli;
pub mod config;
pub mod logging;
