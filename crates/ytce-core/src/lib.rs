pub mod adapters;
pub mod batching;
pub mod checkpoint;
pub mod config;
pub mod executor;
pub mod merge;
pub mod models;
pub mod orchestration;
pub mod prompt;
pub mod registry;
pub mod retry;
pub mod sqlite;
