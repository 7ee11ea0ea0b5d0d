//! Core domain types for HeroProxy.
//!
//! This crate holds everything the other crates communicate with:
//! - [`hero`] - the cached hero model as delivered by the upstream provider
//! - [`events`] - change events emitted when cached data is created, updated
//!   or deleted
//! - [`error`] - the shared error taxonomy surfaced to callers

pub mod error;
pub mod events;
pub mod hero;

pub use error::{CoreError, ErrorCategory, Result};
pub use events::{ChangeEvent, ChangeKind};
pub use hero::{Biography, Hero, Image, PowerStats};
