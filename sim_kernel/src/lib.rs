//! # Simulation Kernel
//!
//! Deterministic, replayable core of the narrator simulation. The kernel never
//! owns the world: it receives a frozen [`WorldState`] snapshot per call and
//! answers with declarative results that the orchestrator applies between ticks.
//!
//! ## Core Components
//!
//! - **clock**: Monotonic tick counter
//! - **seed**: Per-subsystem seeds and RNG streams forked from one global seed
//! - **rule_engine**: Ordered rule settlement with a full audit trail
//! - **interrupt**: Aggregates signals that preempt long-running actions
//! - **config**: Orchestrator knobs parsed from TOML
//!
//! ## Design Philosophy
//!
//! - **Pure**: `settle` and `check` are functions of their inputs; rules only see `&WorldState`
//! - **Reproducible**: All randomness is forked from an explicit seed and label
//! - **All or nothing**: A failing rule aborts the call; no partial results escape
//!
//! [`WorldState`]: world_model::WorldState

pub mod clock;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod rule_engine;
pub mod seed;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use interrupt::*;
pub use rule_engine::*;
pub use seed::*;

pub use world_model;
