//! # World Model
//!
//! Value types shared by the simulation kernel and its orchestrator: characters,
//! events, proposed actions, declarative state changes and the world snapshot
//! that rules are evaluated against.
//!
//! This crate holds no engine logic. Every type here is a plain value; the only
//! behaviour is structural validation.

pub mod action;
pub mod entities;
pub mod error;
pub mod world_state;

pub use action::*;
pub use entities::*;
pub use error::*;
pub use world_state::*;

/// Discrete unit of simulation time.
pub type Tick = u64;

/// Seed value carried by world snapshots and rule contexts.
pub type Seed = u64;

/// Free-form key/value bag used for character state, event scopes and metadata.
pub type Properties = std::collections::BTreeMap<String, serde_json::Value>;
