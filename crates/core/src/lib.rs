//! `wrenchbook-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Document, Entity};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, UserId};
