//! Core domain types for Pacer.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer: the executor, the config loader,
//! and the HTTP client all speak in these types.

mod ids;
mod policy;
mod settings;

pub use ids::TaskSeq;
pub use policy::{DelayPolicy, UnknownPolicyError};
pub use settings::{AuthHeader, DEFAULT_DELAY, ExecutorSettings, HttpSettings, SettingsError};
