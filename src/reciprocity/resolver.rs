//! Policy-aware, observable resolver over a [`ReciprocityTable`].

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::Gender;
use super::{ReciprocityTable, Resolution};

// ============================================================================
// Configuration
// ============================================================================

/// What to do when the holder's gender is unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsentGenderPolicy {
    /// Read the male column.
    #[default]
    AssumeMale,
    /// Report [`Resolution::GenderAbsent`] so no mirror is created.
    NoReciprocal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub absent_gender: AbsentGenderPolicy,
}

// ============================================================================
// Stats
// ============================================================================

/// Counters for resolution outcomes. Shared by clones of a [`Resolver`].
#[derive(Debug, Default)]
pub struct ResolverStats {
    reciprocal: AtomicU64,
    no_reciprocal: AtomicU64,
    unknown: AtomicU64,
    gender_absent: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverStatsSnapshot {
    pub reciprocal: u64,
    pub no_reciprocal: u64,
    pub unknown: u64,
    pub gender_absent: u64,
}

impl ResolverStatsSnapshot {
    pub fn total(&self) -> u64 {
        self.reciprocal + self.no_reciprocal + self.unknown + self.gender_absent
    }
}

impl ResolverStats {
    fn record(&self, resolution: &Resolution<'_>) {
        let counter = match resolution {
            Resolution::Reciprocal(_) => &self.reciprocal,
            Resolution::NoReciprocal => &self.no_reciprocal,
            Resolution::Unknown(_) => &self.unknown,
            Resolution::GenderAbsent => &self.gender_absent,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ResolverStatsSnapshot {
        ResolverStatsSnapshot {
            reciprocal: self.reciprocal.load(Ordering::Relaxed),
            no_reciprocal: self.no_reciprocal.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            gender_absent: self.gender_absent.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Resolves reciprocals through a shared table, applying the configured
/// absent-gender policy and recording every outcome.
///
/// Cheap to clone; clones share the table and the counters.
#[derive(Debug, Clone)]
pub struct Resolver {
    table: Arc<ReciprocityTable>,
    config: ResolverConfig,
    stats: Arc<ResolverStats>,
}

impl Resolver {
    pub fn new(table: Arc<ReciprocityTable>, config: ResolverConfig) -> Self {
        Self {
            table,
            config,
            stats: Arc::new(ResolverStats::default()),
        }
    }

    /// Resolver over a copy of the built-in table with default policy.
    pub fn builtin() -> Self {
        Self::new(Arc::new(ReciprocityTable::builtin().clone()), ResolverConfig::default())
    }

    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// Labels of this resolver's table, which may differ from the built-in one.
    pub fn known_relationship_types(&self) -> BTreeSet<String> {
        self.table.known_relationship_types()
    }

    pub fn resolve<'a>(&'a self, rel_type: &'a str, gender: Option<Gender>) -> Resolution<'a> {
        let resolution = self.peek(rel_type, gender);
        self.stats.record(&resolution);
        match resolution {
            Resolution::Unknown(_) => tracing::warn!(
                rel_type,
                "unknown relationship type, falling back to identity"
            ),
            Resolution::GenderAbsent => tracing::debug!(
                rel_type,
                "holder gender absent, reciprocal suppressed"
            ),
            _ => tracing::trace!(
                rel_type,
                gender = crate::model::gender::display_opt(gender),
                reciprocal = resolution.label(),
                "resolved reciprocal"
            ),
        }
        resolution
    }

    /// Same as [`resolve`](Self::resolve) without logging or counting.
    pub(crate) fn peek<'a>(&'a self, rel_type: &'a str, gender: Option<Gender>) -> Resolution<'a> {
        match gender {
            None if self.config.absent_gender == AbsentGenderPolicy::NoReciprocal
                && self.table.contains(rel_type) =>
            {
                Resolution::GenderAbsent
            }
            _ => self.table.resolve(rel_type, gender),
        }
    }

    pub fn stats(&self) -> ResolverStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::builtin()
    }
}
