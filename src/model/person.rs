//! Person node in the relationship graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Gender;

/// Opaque person identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

impl std::fmt::Display for PersonId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person known to the graph. The host owns everything else about them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub created_at: DateTime<Utc>,
}

/// Write payload for creating a person; the backend assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPerson {
    pub name: Option<String>,
    pub gender: Option<Gender>,
}

impl NewPerson {
    pub fn new(name: Option<&str>, gender: Option<Gender>) -> Self {
        Self {
            name: name.map(str::to_string),
            gender,
        }
    }
}
