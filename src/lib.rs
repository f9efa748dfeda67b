// offline-vault - Offline-first caching proxy with bucketed storage
// Author: kelexine (https://github.com/kelexine)

pub mod cli;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod lifecycle;
pub mod metrics;
pub mod router;
pub mod server;
pub mod storage;
pub mod strategy;
pub mod utils;
