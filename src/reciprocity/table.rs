//! The reciprocity table: relationship label → gender pair of reciprocals.
//!
//! The table is data. Adding a kinship term means adding an entry (in code
//! or in a JSON file); the resolver never changes.
//!
//! ## JSON format
//!
//! ```json
//! {
//!   "son":     { "male": "father", "female": "mother", "implies": "male" },
//!   "husband": { "male": "",       "female": "wife",   "implies": "male" }
//! }
//! ```
//!
//! An empty string and a missing field both mean "no reciprocal".

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use hashbrown::HashMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::Gender;
use crate::{Error, Result};
use super::Resolution;

// ============================================================================
// Entry
// ============================================================================

/// Reciprocal labels for one relationship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReciprocityEntry {
    /// Reciprocal when the holder is male.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub male: Option<String>,
    /// Reciprocal when the holder is female.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub female: Option<String>,
    /// Gender the label itself implies for the person it names
    /// ("son" implies male). `None` for neutral labels such as "cousin".
    #[serde(default)]
    pub implies: Option<Gender>,
}

impl ReciprocityEntry {
    pub fn new(male: &str, female: &str, implies: Option<Gender>) -> Self {
        let slot = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            male: slot(male),
            female: slot(female),
            implies,
        }
    }

    pub fn for_gender(&self, gender: Gender) -> Option<&str> {
        match gender {
            Gender::Male => self.male.as_deref(),
            Gender::Female => self.female.as_deref(),
        }
    }
}

fn empty_as_none<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

// ============================================================================
// Built-in vocabulary
// ============================================================================

const M: Option<Gender> = Some(Gender::Male);
const F: Option<Gender> = Some(Gender::Female);

/// (label, male reciprocal, female reciprocal, implied gender)
const BUILTIN_ENTRIES: &[(&str, &str, &str, Option<Gender>)] = &[
    // child / parent
    ("son", "father", "mother", M),
    ("daughter", "father", "mother", F),
    ("father", "son", "daughter", M),
    ("mother", "son", "daughter", F),
    // grandchild / grandparent
    ("grandson", "grandfather", "grandmother", M),
    ("granddaughter", "grandfather", "grandmother", F),
    ("grandfather", "grandson", "granddaughter", M),
    ("grandmother", "grandson", "granddaughter", F),
    // siblings
    ("brother", "brother", "sister", M),
    ("sister", "brother", "sister", F),
    // aunt-or-uncle / niece-or-nephew
    ("uncle", "nephew", "niece", M),
    ("aunt", "nephew", "niece", F),
    ("nephew", "uncle", "aunt", M),
    ("niece", "uncle", "aunt", F),
    // child-in-law / parent-in-law
    ("groom", "father-in-law", "mother-in-law", M),
    ("bride", "father-in-law", "mother-in-law", F),
    ("father-in-law", "groom", "bride", M),
    ("mother-in-law", "groom", "bride", F),
    // spouses: only the opposite gender has a term
    ("husband", "", "wife", M),
    ("wife", "husband", "", F),
    // siblings-in-law
    ("brother-in-law", "brother-in-law", "sister-in-law", M),
    ("sister-in-law", "brother-in-law", "sister-in-law", F),
    // gender-neutral
    ("cousin", "cousin", "cousin", None),
];

static BUILTIN: LazyLock<ReciprocityTable> = LazyLock::new(|| ReciprocityTable {
    entries: BUILTIN_ENTRIES
        .iter()
        .map(|&(label, male, female, implies)| {
            (label.to_string(), ReciprocityEntry::new(male, female, implies))
        })
        .collect(),
});

// ============================================================================
// Table
// ============================================================================

/// Immutable lookup from relationship label to its reciprocal entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReciprocityTable {
    entries: HashMap<String, ReciprocityEntry>,
}

impl ReciprocityTable {
    /// The built-in kinship vocabulary, loaded once per process.
    pub fn builtin() -> &'static ReciprocityTable {
        &BUILTIN
    }

    /// Build and validate a table from `(label, entry)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, ReciprocityEntry)>,
        S: Into<String>,
    {
        let table = Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Parse and validate a table from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Read, parse and validate a table from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn get(&self, rel_type: &str) -> Option<&ReciprocityEntry> {
        self.entries.get(rel_type)
    }

    pub fn contains(&self, rel_type: &str) -> bool {
        self.entries.contains_key(rel_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ReciprocityEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every label the table knows, sorted.
    pub fn known_relationship_types(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    /// Resolve the reciprocal of `rel_type` for a holder of `gender`.
    ///
    /// Absent gender reads the male column. Unknown labels come back
    /// unchanged as [`Resolution::Unknown`]. Never fails.
    pub fn resolve<'a>(&'a self, rel_type: &'a str, gender: Option<Gender>) -> Resolution<'a> {
        match self.entries.get(rel_type) {
            None => Resolution::Unknown(rel_type),
            Some(entry) => match entry.for_gender(gender.unwrap_or(Gender::Male)) {
                Some(label) => Resolution::Reciprocal(label),
                None => Resolution::NoReciprocal,
            },
        }
    }

    /// Check that every reciprocal is itself a known label and that
    /// resolving it back from the other side returns the original label.
    pub fn validate(&self) -> Result<()> {
        for (label, entry) in &self.entries {
            if label.trim().is_empty() {
                return Err(Error::TableError("empty relationship label".into()));
            }
            for holder in Gender::ALL {
                let Some(reciprocal) = entry.for_gender(holder) else { continue };
                let Some(back) = self.entries.get(reciprocal) else {
                    return Err(Error::TableError(format!(
                        "'{label}' ({holder}) resolves to '{reciprocal}', which has no entry"
                    )));
                };
                let round_trips = match entry.implies {
                    Some(implied) => back.for_gender(implied) == Some(label.as_str()),
                    None => Gender::ALL.iter().any(|g| back.for_gender(*g) == Some(label.as_str())),
                };
                if !round_trips {
                    return Err(Error::TableError(format!(
                        "'{label}' -> '{reciprocal}' does not resolve back to '{label}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_validates() {
        ReciprocityTable::builtin().validate().unwrap();
        assert_eq!(ReciprocityTable::builtin().len(), BUILTIN_ENTRIES.len());
    }

    #[test]
    fn test_builtin_has_required_classes() {
        let table = ReciprocityTable::builtin();
        for label in [
            "son", "daughter", "father", "mother",
            "grandson", "grandfather", "brother", "sister",
            "uncle", "nephew", "groom", "father-in-law",
            "husband", "wife", "brother-in-law", "sister-in-law",
        ] {
            assert!(table.contains(label), "missing {label}");
        }
    }

    #[test]
    fn test_resolve_slots() {
        let table = ReciprocityTable::builtin();
        assert_eq!(table.resolve("son", Some(Gender::Male)), Resolution::Reciprocal("father"));
        assert_eq!(table.resolve("son", Some(Gender::Female)), Resolution::Reciprocal("mother"));
        assert_eq!(table.resolve("husband", Some(Gender::Male)), Resolution::NoReciprocal);
        assert_eq!(table.resolve("husband", Some(Gender::Female)), Resolution::Reciprocal("wife"));
        assert_eq!(table.resolve("mentor", None), Resolution::Unknown("mentor"));
    }

    #[test]
    fn test_json_empty_string_is_no_reciprocal() {
        let table = ReciprocityTable::from_json_str(
            r#"{
                "husband": { "male": "", "female": "wife", "implies": "male" },
                "wife": { "male": "husband", "implies": "female" }
            }"#,
        )
        .unwrap();
        assert_eq!(table.get("husband").unwrap().male, None);
        assert_eq!(table.get("wife").unwrap().female, None);
    }

    #[test]
    fn test_validate_rejects_missing_reciprocal_entry() {
        let err = ReciprocityTable::from_entries([
            ("mentor", ReciprocityEntry::new("mentee", "mentee", None)),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::TableError(_)));
    }

    #[test]
    fn test_validate_rejects_non_involutive_pair() {
        // "son" maps to "father", but "father" maps a male holder to "nephew".
        let err = ReciprocityTable::from_entries([
            ("son", ReciprocityEntry::new("father", "", Some(Gender::Male))),
            ("father", ReciprocityEntry::new("nephew", "", Some(Gender::Male))),
            ("nephew", ReciprocityEntry::new("father", "", Some(Gender::Male))),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("does not resolve back"));
    }

    #[test]
    fn test_extend_builtin() {
        let mut entries: Vec<(String, ReciprocityEntry)> = ReciprocityTable::builtin()
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        entries.push(("mentor".into(), ReciprocityEntry::new("mentee", "mentee", None)));
        entries.push(("mentee".into(), ReciprocityEntry::new("mentor", "mentor", None)));

        let table = ReciprocityTable::from_entries(entries).unwrap();
        assert_eq!(table.resolve("mentor", Some(Gender::Female)), Resolution::Reciprocal("mentee"));
        assert_eq!(table.resolve("son", Some(Gender::Male)), Resolution::Reciprocal("father"));
    }
}
