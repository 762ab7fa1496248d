//! Relationship (edge) in the kinship graph.
//!
//! An edge `src -> dst` with type `T` reads "dst is src's T": the edge
//! `(A -> B, "son")` records that B is A's son. Its mirror `(B -> A,
//! "father")` records that A is B's father.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Gender, PersonId};

/// Opaque relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Traversal direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Why an asserted edge has no mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneWayReason {
    /// The type is known but has no reciprocal for the holder's gender
    /// (e.g. "husband" asserted by a man).
    NoReciprocalForGender,
    /// The type is not in the reciprocity table and unknown types are
    /// configured to stay one-way.
    UnknownType,
    /// The holder's gender is absent and the resolver declines to guess.
    GenderAbsent,
}

/// Link from an asserted edge to its mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorLink {
    Linked(RelId),
    OneWay(OneWayReason),
}

/// How an edge came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EdgeOrigin {
    /// Asserted by the caller.
    Asserted {
        /// Gender of `src` at the time the reciprocal was resolved.
        holder_gender: Option<Gender>,
        mirror: MirrorLink,
    },
    /// Maintained as the reverse of an asserted edge.
    Mirror { of: RelId },
}

/// A relationship (directed edge) between two persons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub src: PersonId,
    pub dst: PersonId,
    pub rel_type: String,
    pub origin: EdgeOrigin,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relationship {
    pub fn new(id: RelId, src: PersonId, dst: PersonId, rel_type: impl Into<String>, origin: EdgeOrigin) -> Self {
        let now = Utc::now();
        Self {
            id,
            src,
            dst,
            rel_type: rel_type.into(),
            origin,
            created_at: now,
            updated_at: now,
        }
    }

    /// The "other" end of the relationship from the given person.
    pub fn other_person(&self, from: PersonId) -> Option<PersonId> {
        if from == self.src { Some(self.dst) }
        else if from == self.dst { Some(self.src) }
        else { None }
    }

    pub fn is_mirror(&self) -> bool {
        matches!(self.origin, EdgeOrigin::Mirror { .. })
    }

    /// The paired edge, if any: the mirror of an asserted edge or the
    /// asserted edge behind a mirror.
    pub fn counterpart(&self) -> Option<RelId> {
        match self.origin {
            EdgeOrigin::Asserted { mirror: MirrorLink::Linked(id), .. } => Some(id),
            EdgeOrigin::Asserted { mirror: MirrorLink::OneWay(_), .. } => None,
            EdgeOrigin::Mirror { of } => Some(of),
        }
    }

    pub fn one_way_reason(&self) -> Option<OneWayReason> {
        match self.origin {
            EdgeOrigin::Asserted { mirror: MirrorLink::OneWay(reason), .. } => Some(reason),
            _ => None,
        }
    }
}

/// Write payload for creating a relationship; the backend assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
    pub src: PersonId,
    pub dst: PersonId,
    pub rel_type: String,
    pub origin: EdgeOrigin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart() {
        let asserted = Relationship::new(
            RelId(1), PersonId(1), PersonId(2), "son",
            EdgeOrigin::Asserted { holder_gender: Some(Gender::Male), mirror: MirrorLink::Linked(RelId(2)) },
        );
        let mirror = Relationship::new(RelId(2), PersonId(2), PersonId(1), "father", EdgeOrigin::Mirror { of: RelId(1) });
        let one_way = Relationship::new(
            RelId(3), PersonId(1), PersonId(3), "husband",
            EdgeOrigin::Asserted { holder_gender: Some(Gender::Male), mirror: MirrorLink::OneWay(OneWayReason::NoReciprocalForGender) },
        );

        assert_eq!(asserted.counterpart(), Some(RelId(2)));
        assert_eq!(mirror.counterpart(), Some(RelId(1)));
        assert!(mirror.is_mirror());
        assert_eq!(one_way.counterpart(), None);
        assert_eq!(one_way.one_way_reason(), Some(OneWayReason::NoReciprocalForGender));
        assert_eq!(asserted.other_person(PersonId(2)), Some(PersonId(1)));
        assert_eq!(asserted.other_person(PersonId(9)), None);
    }

    #[test]
    fn test_origin_serde_shape() {
        let origin = EdgeOrigin::Mirror { of: RelId(7) };
        let json = serde_json::to_value(origin).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "mirror", "of": 7 }));
    }
}
