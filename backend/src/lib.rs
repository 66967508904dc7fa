//! Helix Backend Library
//!
//! This library exposes the backend modules for use in tests and other crates.

pub mod ai;
pub mod auth;
pub mod chat_hub;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
