//! snaplink - a small URL shortener service
//!
//! # Architecture
//! - `services`: shorten / resolve / stats / list and the unique code allocator
//! - `storage`: sea-orm data access (SQLite, PostgreSQL)
//! - `cache`: read-through object cache (redis, moka, none)
//! - `analytics`: bounded click queue with batched, transactional flushes
//! - `api`: actix-web routes and middleware
//! - `config`: static configuration (TOML file + environment)
//! - `runtime`: startup, server mode and graceful shutdown
//! - `system`: logging setup

pub mod analytics;
pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
