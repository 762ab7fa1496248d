//! # Reciprocity
//!
//! Given "B is A's *son*", produce the label A holds from B's side
//! ("father" or "mother"), picked by A's gender.
//!
//! ```rust
//! use kinship_rs::{resolve_reciprocal, Gender};
//!
//! assert_eq!(resolve_reciprocal("son", Some(Gender::Female)), "mother");
//! assert_eq!(resolve_reciprocal("husband", Some(Gender::Male)), "");
//! assert_eq!(resolve_reciprocal("mentor", None), "mentor");
//! ```
//!
//! Two layers:
//!
//! | Layer | Type | Side effects |
//! |-------|------|--------------|
//! | Pure lookup | [`ReciprocityTable::resolve`] | none |
//! | Policy + telemetry | [`Resolver`] | `tracing` events, counters |

pub mod table;
pub mod resolver;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::Gender;

pub use table::{ReciprocityEntry, ReciprocityTable};
pub use resolver::{AbsentGenderPolicy, Resolver, ResolverConfig, ResolverStats, ResolverStatsSnapshot};

/// Outcome of resolving a reciprocal label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "label")]
pub enum Resolution<'a> {
    /// Table hit with a label for the holder's gender.
    Reciprocal(&'a str),
    /// Known type with no label for the holder's gender.
    NoReciprocal,
    /// Type missing from the table; the input comes back unchanged.
    Unknown(&'a str),
    /// Holder's gender is absent and the resolver is configured not to guess.
    GenderAbsent,
}

impl<'a> Resolution<'a> {
    /// The label as a plain string: `""` when there is no reciprocal.
    pub fn label(&self) -> &'a str {
        match *self {
            Resolution::Reciprocal(label) | Resolution::Unknown(label) => label,
            Resolution::NoReciprocal | Resolution::GenderAbsent => "",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Resolution::Unknown(_))
    }
}

/// Resolve against the built-in table. Absent gender reads the male column.
pub fn resolve_reciprocal(relationship_type: &str, target_gender: Option<Gender>) -> String {
    ReciprocityTable::builtin()
        .resolve(relationship_type, target_gender)
        .label()
        .to_string()
}

/// Labels of the built-in table, for UI population and validation.
pub fn list_known_relationship_types() -> BTreeSet<String> {
    ReciprocityTable::builtin().known_relationship_types()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_reciprocal_strings() {
        assert_eq!(resolve_reciprocal("daughter", Some(Gender::Male)), "father");
        assert_eq!(resolve_reciprocal("wife", Some(Gender::Female)), "");
        assert_eq!(resolve_reciprocal("wife", None), "husband");
        assert_eq!(resolve_reciprocal("", None), "");
    }

    #[test]
    fn test_known_types_sorted() {
        let known = list_known_relationship_types();
        assert!(known.contains("grandmother"));
        assert!(!known.contains("mentor"));
        let first = known.iter().next().unwrap();
        assert_eq!(first, "aunt");
    }

    #[test]
    fn test_resolution_serde() {
        let json = serde_json::to_value(Resolution::Reciprocal("father")).unwrap();
        assert_eq!(json, serde_json::json!({ "outcome": "reciprocal", "label": "father" }));
        let json = serde_json::to_value(Resolution::NoReciprocal).unwrap();
        assert_eq!(json, serde_json::json!({ "outcome": "no_reciprocal" }));
    }
}
