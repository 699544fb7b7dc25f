//! # ac-protocol
//!
//! Core data models shared by every authchain crate.
//!
//! This crate defines the structures used for:
//! - The authentication context carried through a processing chain
//! - Chain definitions loaded from `.authchain/chains/*.yaml`
//! - Global configuration from `.authchain/config.toml`
//! - Observability events and the views handed to an external renderer
//!
//! ## Modules
//!
//! - [`context_models`]: Identifiers, `AuthContext` and its lifecycle status
//! - [`chain_models`]: Chain definitions, step specs and outcome payloads
//! - [`config_models`]: Global configuration
//! - [`event_models`]: Events recorded by an event sink
//! - [`view_models`]: Template views and continuations
//!
//! ## Design Principles
//!
//! - Minimal dependencies: serde, ts-rs, uuid and chrono
//! - TypeScript generation: all types derive `TS` so renderers share the shapes
//! - Independent compilation: no dependencies on other authchain crates

pub mod chain_models;
pub mod config_models;
pub mod context_models;
pub mod event_models;
pub mod view_models;

// Re-export all public types for convenience
pub use chain_models::*;
pub use config_models::*;
pub use context_models::*;
pub use event_models::*;
pub use view_models::*;
