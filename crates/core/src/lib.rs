//! # ac-core
//!
//! Resumable authentication processing chains.
//!
//! This crate provides:
//! - Configuration loading from the `.authchain/` directory
//! - Pipeline steps and the processing chain that runs them
//! - State stores that carry suspended chains across requests
//! - Event sinks for authentication statistics
//! - Request handlers producing views for an external renderer
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`steps`]: Step trait and step implementations
//! - [`engine`]: Processing chain execution and error taxonomy
//! - [`state`]: State stores and chain lifecycle
//! - [`sink`]: Event sinks
//! - [`controller`]: Rendering boundary handlers
//! - [`app`]: Wiring from configuration
//! - [`init`]: `.authchain/` project generation

pub mod app;
pub mod config;
pub mod controller;
pub mod engine;
pub mod init;
pub mod sink;
pub mod state;
pub mod steps;
pub mod urls;
