//! Values the maintainer hands back to its caller.

use serde::{Deserialize, Serialize};

use crate::model::{Gender, OneWayReason, PersonId, RelId};

/// What should mirror an asserted edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorPlan {
    /// A reverse edge with this label.
    Mirror(String),
    /// No reverse edge.
    OneWay(OneWayReason),
}

impl MirrorPlan {
    pub fn label(&self) -> Option<&str> {
        match self {
            MirrorPlan::Mirror(label) => Some(label.as_str()),
            MirrorPlan::OneWay(_) => None,
        }
    }
}

/// Result of [`assert_relationship`](super::GraphMaintainer::assert_relationship).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub forward: RelId,
    pub mirror: Option<RelId>,
    pub plan: MirrorPlan,
    /// False when the graph already held exactly this assertion.
    pub changed: bool,
}

/// An asserted edge whose reciprocal would be resolved differently with
/// the holder's current gender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleReciprocal {
    pub relationship: RelId,
    pub mirror: Option<RelId>,
    /// The person the reciprocal label describes (`src` of the asserted edge).
    pub holder: PersonId,
    pub relative: PersonId,
    pub rel_type: String,
    /// Gender recorded when the reciprocal was last resolved.
    pub recorded_gender: Option<Gender>,
    pub current_gender: Option<Gender>,
    /// What the graph holds now.
    pub recorded: MirrorPlan,
    /// What resolving today would produce.
    pub expected: MirrorPlan,
}

/// Result of [`change_gender`](super::GraphMaintainer::change_gender).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderChange {
    pub person: PersonId,
    pub previous: Option<Gender>,
    pub current: Option<Gender>,
    /// Edges left untouched whose reciprocals need manual review.
    pub stale: Vec<StaleReciprocal>,
}

/// A violation of the bidirectional graph invariants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "issue")]
pub enum ConsistencyIssue {
    SelfRelationship { edge: RelId },
    DuplicatePair { src: PersonId, dst: PersonId, edges: Vec<RelId> },
    /// Asserted edge links to a mirror that does not exist.
    MissingMirror { edge: RelId, mirror: RelId },
    /// Asserted edge and its mirror disagree on endpoints or back-link.
    BrokenLink { edge: RelId, mirror: RelId },
    /// Mirror label differs from what was planned for the recorded gender.
    MislabeledMirror { edge: RelId, mirror: RelId, expected: MirrorPlan, found: String },
    /// Mirror edge with no asserted edge pointing back at it.
    OrphanedMirror { edge: RelId },
}
