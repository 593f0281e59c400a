#![forbid(unsafe_code)]

//! Core library for `compose-pilot`: launches, supervises, and tears down
//! published docker-compose compositions through a serialized command queue.

pub mod activity;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod fetch;
pub mod models;
pub mod reconcile;
pub mod session;
pub mod status;
pub mod supervisor;

pub use config::Config;
pub use errors::{AppError, Result};
pub use supervisor::Supervisor;
