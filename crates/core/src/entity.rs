//! Entity trait: identity + continuity across state changes.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::id::AggregateId;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity persisted as a whole JSON document in a named collection.
///
/// Documents are written with last-write-wins semantics; there is no version
/// check between a read and the following write.
pub trait Document: Entity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection (table / namespace) holding documents of this type.
    const COLLECTION: &'static str;

    /// Untyped key of the document inside its collection.
    fn key(&self) -> AggregateId;
}
