//! areabook-core - Conflict engine for AreaBook sync
//!
//! This crate holds the synced record models and everything that reconciles
//! divergent copies of them: conflict detection, per-type merging, the
//! resolution service with its auto-sweep, entity leases, collaborative
//! session presence and conflict history/analytics. Persistence goes through
//! the [`store::DocumentStore`] trait, with in-memory and libSQL backends.

pub mod clock;
pub mod config;
pub mod db;
pub mod detector;
pub mod error;
pub mod history;
pub mod keyed;
pub mod locks;
pub mod merge;
pub mod models;
pub mod notify;
pub mod service;
pub mod sessions;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{Conflict, ConflictId, EntityRecord, EntityType, ResolutionStrategy};
pub use service::{ConflictService, Resolution, ResolvedRecord, SweepReport};
