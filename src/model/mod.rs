//! # Kinship Graph Model
//!
//! Plain DTOs shared by the resolver, the storage layer and the maintainer.
//! This module is pure data: no I/O, no state, no async.

pub mod gender;
pub mod person;
pub mod relationship;

pub use gender::Gender;
pub use person::{NewPerson, Person, PersonId};
pub use relationship::{
    Direction, EdgeOrigin, MirrorLink, NewRelationship, OneWayReason, RelId, Relationship,
};
