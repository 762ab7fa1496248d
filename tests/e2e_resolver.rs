//! Reciprocity laws over the built-in table.
//!
//! Each test exercises the public resolution surface only:
//! `resolve_reciprocal`, `list_known_relationship_types`, `ReciprocityTable`
//! and `Resolver`.

use kinship_rs::{
    list_known_relationship_types, resolve_reciprocal, AbsentGenderPolicy, Gender,
    ReciprocityTable, Resolution, Resolver, ResolverConfig,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const GENDERS: [Option<Gender>; 3] = [Some(Gender::Male), Some(Gender::Female), None];

// ============================================================================
// 1. Round-trip law
// ============================================================================

#[test]
fn test_son_father_round_trip() {
    assert_eq!(resolve_reciprocal("son", Some(Gender::Male)), "father");
    assert_eq!(resolve_reciprocal("father", Some(Gender::Male)), "son");
    assert_eq!(resolve_reciprocal("daughter", Some(Gender::Female)), "mother");
    assert_eq!(resolve_reciprocal("mother", Some(Gender::Female)), "daughter");
}

#[test]
fn test_round_trip_every_table_hit() {
    let table = ReciprocityTable::builtin();
    for (label, entry) in table.iter() {
        for gender in Gender::ALL {
            let Some(reciprocal) = entry.for_gender(gender) else { continue };
            match entry.implies {
                Some(implied) => assert_eq!(
                    resolve_reciprocal(reciprocal, Some(implied)),
                    label,
                    "{label} -({gender})-> {reciprocal} should come back with {implied}"
                ),
                None => {
                    let back: Vec<String> =
                        Gender::ALL.iter().map(|g| resolve_reciprocal(reciprocal, Some(*g))).collect();
                    assert!(back.iter().any(|b| b == label), "{label} not among {back:?}");
                }
            }
        }
    }
}

#[test]
fn test_every_reciprocal_is_known() {
    let known = list_known_relationship_types();
    for (label, entry) in ReciprocityTable::builtin().iter() {
        for reciprocal in [&entry.male, &entry.female].into_iter().flatten() {
            assert!(known.contains(reciprocal), "{label} -> {reciprocal} has no entry");
        }
    }
    ReciprocityTable::builtin().validate().unwrap();
}

// ============================================================================
// 2. Identity fallback
// ============================================================================

#[test]
fn test_unknown_label_resolves_to_itself() {
    for gender in GENDERS {
        assert_eq!(resolve_reciprocal("unknown-label", gender), "unknown-label");
        assert_eq!(resolve_reciprocal("mentor", gender), "mentor");
    }
}

#[test]
fn test_unknown_is_observable() {
    let resolver = Resolver::builtin();
    let resolution = resolver.resolve("mentor", Some(Gender::Female));
    assert_eq!(resolution, Resolution::Unknown("mentor"));
    assert_eq!(resolution.label(), "mentor");

    let stats = resolver.stats();
    assert_eq!(stats.unknown, 1);
    assert_eq!(stats.total(), 1);
}

proptest! {
    #[test]
    fn prop_identity_fallback(label in "[a-z][a-z -]{0,24}", pick in 0usize..3) {
        prop_assume!(!ReciprocityTable::builtin().contains(&label));
        prop_assert_eq!(resolve_reciprocal(&label, GENDERS[pick]), label);
    }

    #[test]
    fn prop_absent_gender_reads_male_column(idx in 0usize..64) {
        let known: Vec<String> = list_known_relationship_types().into_iter().collect();
        let label = &known[idx % known.len()];
        prop_assert_eq!(
            resolve_reciprocal(label, None),
            resolve_reciprocal(label, Some(Gender::Male))
        );
    }
}

// ============================================================================
// 3. Default-gender policy
// ============================================================================

#[test]
fn test_absent_gender_matches_male_for_every_type() {
    for label in list_known_relationship_types() {
        assert_eq!(
            resolve_reciprocal(&label, None),
            resolve_reciprocal(&label, Some(Gender::Male)),
            "{label}"
        );
    }
}

#[test]
fn test_no_reciprocal_policy_suppresses_guess() {
    let resolver = Resolver::new(
        std::sync::Arc::new(ReciprocityTable::builtin().clone()),
        ResolverConfig { absent_gender: AbsentGenderPolicy::NoReciprocal },
    );
    assert_eq!(resolver.resolve("son", None), Resolution::GenderAbsent);
    assert_eq!(resolver.resolve("son", Some(Gender::Male)), Resolution::Reciprocal("father"));
    // Unknown types still pass through.
    assert_eq!(resolver.resolve("mentor", None), Resolution::Unknown("mentor"));
    assert_eq!(resolver.stats().gender_absent, 1);
}

// ============================================================================
// 4. Asymmetric and self-reciprocal terms
// ============================================================================

#[test]
fn test_husband_wife_asymmetry() {
    assert_eq!(resolve_reciprocal("husband", Some(Gender::Male)), "");
    assert_eq!(resolve_reciprocal("husband", Some(Gender::Female)), "wife");
    assert_eq!(resolve_reciprocal("wife", Some(Gender::Male)), "husband");
    assert_eq!(resolve_reciprocal("wife", Some(Gender::Female)), "");
    assert_eq!(
        ReciprocityTable::builtin().resolve("husband", Some(Gender::Male)),
        Resolution::NoReciprocal
    );
}

#[test]
fn test_self_reciprocal_terms_stable() {
    assert_eq!(resolve_reciprocal("brother-in-law", Some(Gender::Male)), "brother-in-law");
    assert_eq!(resolve_reciprocal("sister-in-law", Some(Gender::Female)), "sister-in-law");
    assert_eq!(resolve_reciprocal("brother", Some(Gender::Male)), "brother");
    assert_eq!(resolve_reciprocal("sister", Some(Gender::Female)), "sister");
    for gender in GENDERS {
        assert_eq!(resolve_reciprocal("cousin", gender), "cousin");
    }
}

#[test]
fn test_gender_parsing() {
    assert_eq!("Male".parse::<Gender>().unwrap(), Gender::Male);
    assert_eq!("f".parse::<Gender>().unwrap(), Gender::Female);
    assert!(matches!("other".parse::<Gender>(), Err(kinship_rs::Error::InvalidGender(_))));
}
