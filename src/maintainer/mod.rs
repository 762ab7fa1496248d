//! # Relationship Graph Maintainer
//!
//! Keeps the kinship graph bidirectionally consistent. Every asserted edge
//! `src -> dst` ("dst is src's T") gets a mirror `dst -> src` labelled with
//! the reciprocal of T for src's gender, written in the same transaction.
//!
//! ```text
//! assert(A, B, "son")  ──resolve("son", gender(A))──▶  "father"
//!     A ──son──▶ B          B ──father──▶ A   (one commit)
//! ```
//!
//! ## Guarantees
//!
//! - Forward edge and mirror are created, retyped and removed together.
//!   A failed write rolls back the whole operation and surfaces
//!   [`Error::InconsistentGraphWrite`].
//! - Removal follows the counterpart recorded at creation time, never a
//!   fresh resolution, so gender changes cannot make it miss the mirror.
//! - Gender changes never retype edges; they report what looks stale.
//! - Operations touching the same person are serialized.

mod locks;
pub mod report;

use chrono::Utc;
use hashbrown::HashMap;

use crate::config::{KinshipConfig, UnknownTypePolicy};
use crate::model::*;
use crate::reciprocity::{Resolution, Resolver};
use crate::storage::{MemoryBackend, StorageBackend};
use crate::tx::TxMode;
use crate::{Error, Result};
use locks::PersonLocks;

pub use report::{Assertion, ConsistencyIssue, GenderChange, MirrorPlan, StaleReciprocal};

/// Both directions of a person pair as read inside a transaction.
struct PairState {
    holder: Person,
    forward: Option<Relationship>,
    reverse: Option<Relationship>,
}

/// Maintains mirror edges over a [`StorageBackend`].
pub struct GraphMaintainer<B: StorageBackend> {
    backend: B,
    resolver: Resolver,
    config: KinshipConfig,
    locks: PersonLocks,
}

impl GraphMaintainer<MemoryBackend> {
    /// In-memory maintainer with the built-in table and default policies.
    pub fn open_memory() -> Self {
        Self::new(MemoryBackend::new())
    }
}

impl<B: StorageBackend> GraphMaintainer<B> {
    /// Maintainer with the built-in table and default policies.
    pub fn new(backend: B) -> Self {
        Self::with_resolver(backend, Resolver::builtin(), KinshipConfig::default())
    }

    /// Maintainer configured from `config`, loading its table if one is named.
    pub fn with_config(backend: B, config: KinshipConfig) -> Result<Self> {
        let resolver = config.build_resolver()?;
        Ok(Self::with_resolver(backend, resolver, config))
    }

    pub fn with_resolver(backend: B, resolver: Resolver, config: KinshipConfig) -> Self {
        Self {
            backend,
            resolver,
            config,
            locks: PersonLocks::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn config(&self) -> &KinshipConfig {
        &self.config
    }

    // ========================================================================
    // Persons
    // ========================================================================

    pub async fn add_person(&self, name: Option<&str>, gender: Option<Gender>) -> Result<PersonId> {
        let mut tx = self.backend.begin_tx(TxMode::ReadWrite).await?;
        let id = match self.backend.create_person(&mut tx, NewPerson::new(name, gender)).await {
            Ok(id) => id,
            Err(e) => {
                self.discard(tx).await;
                return Err(e);
            }
        };
        self.backend.commit_tx(tx).await?;
        tracing::debug!(person = %id, gender = crate::model::gender::display_opt(gender), "person added");
        Ok(id)
    }

    pub async fn person(&self, id: PersonId) -> Result<Option<Person>> {
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let person = self.backend.get_person(&tx, id).await;
        self.discard(tx).await;
        person
    }

    /// Remove a person together with every edge touching them, mirrors
    /// included. Returns false if the person did not exist.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn remove_person(&self, id: PersonId) -> Result<bool> {
        // New edges to `id` need its lock, so the neighbor set read here
        // cannot grow before the guard is taken.
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let touching = self.backend.get_relationships(&tx, id, Direction::Both, None).await;
        self.discard(tx).await;
        let mut persons: Vec<PersonId> = touching?.iter().filter_map(|r| r.other_person(id)).collect();
        persons.push(id);

        let _guard = self.locks.lock(&persons).await;
        let mut tx = self.backend.begin_tx(TxMode::ReadWrite).await?;
        let removed = self.backend.detach_delete_person(&mut tx, id).await;
        self.finish(tx, "remove_person", removed).await
    }

    /// Outgoing edges of a person (asserted and mirror), ordered by id.
    pub async fn relationships_of(&self, id: PersonId) -> Result<Vec<Relationship>> {
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let rels = self.backend.get_relationships(&tx, id, Direction::Outgoing, None).await;
        self.discard(tx).await;
        let mut rels = rels?;
        rels.sort_by_key(|r| r.id);
        Ok(rels)
    }

    // ========================================================================
    // Assert / remove
    // ========================================================================

    /// Record that `dst` is `src`'s `rel_type`, and mirror it.
    ///
    /// The reciprocal is resolved with `src`'s current gender. An existing
    /// `src -> dst` edge is retyped in place; an existing `dst -> src` edge
    /// becomes the mirror (or is deleted if it was the old mirror and the
    /// new type has none).
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn assert_relationship(&self, src: PersonId, dst: PersonId, rel_type: &str) -> Result<Assertion> {
        if rel_type.trim().is_empty() {
            return Err(Error::InvalidRelationship("relationship type is empty".into()));
        }
        if src == dst {
            return Err(Error::InvalidRelationship(format!("person {src} cannot be related to themselves")));
        }

        let _guard = self.locks.lock(&[src, dst]).await;
        let mut tx = self.backend.begin_tx(TxMode::ReadWrite).await?;

        let pair = match self.read_pair(&tx, src, dst).await {
            Ok(pair) => pair,
            Err(e) => {
                self.discard(tx).await;
                return Err(e);
            }
        };

        let plan = self.plan(self.resolver.resolve(rel_type, pair.holder.gender));
        if let Some(unchanged) = Self::already_current(&pair, rel_type, &plan) {
            self.discard(tx).await;
            tracing::debug!(forward = %unchanged.forward, "relationship already current");
            return Ok(unchanged);
        }

        let written = self.write_pair(&mut tx, src, dst, rel_type, pair, plan).await;
        let assertion = self.finish(tx, "assert_relationship", written).await?;
        match &assertion.plan {
            MirrorPlan::Mirror(label) => tracing::info!(
                %src, %dst, rel_type, reciprocal = label.as_str(), "relationship asserted"
            ),
            MirrorPlan::OneWay(reason) => tracing::info!(
                %src, %dst, rel_type, ?reason, "one-way relationship asserted"
            ),
        }
        Ok(assertion)
    }

    /// Remove the `src -> dst` edge and the counterpart recorded when it was
    /// created. Works from either side of a mirrored pair. Returns the ids
    /// removed; empty if there was no such edge.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn remove_relationship(&self, src: PersonId, dst: PersonId) -> Result<Vec<RelId>> {
        let _guard = self.locks.lock(&[src, dst]).await;
        let mut tx = self.backend.begin_tx(TxMode::ReadWrite).await?;

        let lookup = self.backend.relationship_between(&tx, src, dst).await;
        let edge = match lookup {
            Ok(Some(edge)) => edge,
            Ok(None) => {
                self.discard(tx).await;
                return Ok(Vec::new());
            }
            Err(e) => {
                self.discard(tx).await;
                return Err(e);
            }
        };

        let removed = self.delete_pair(&mut tx, edge).await;
        let removed = self.finish(tx, "remove_relationship", removed).await?;
        tracing::info!(%src, %dst, removed = removed.len(), "relationship removed");
        Ok(removed)
    }

    // ========================================================================
    // Gender
    // ========================================================================

    /// Change a person's gender without touching any edge. The returned
    /// report lists reciprocals that would now resolve differently.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn change_gender(&self, person: PersonId, gender: Option<Gender>) -> Result<GenderChange> {
        let _guard = self.locks.lock(&[person]).await;
        let mut tx = self.backend.begin_tx(TxMode::ReadWrite).await?;

        let previous = match self.require_person(&tx, person).await {
            Ok(p) => p.gender,
            Err(e) => {
                self.discard(tx).await;
                return Err(e);
            }
        };

        let staged = async {
            if previous != gender {
                self.backend.set_gender(&mut tx, person, gender).await?;
            }
            self.stale_in_tx(&tx, person, gender).await
        }
        .await;
        let stale = self.finish(tx, "change_gender", staged).await?;

        for entry in &stale {
            tracing::warn!(
                %person,
                relationship = %entry.relationship,
                rel_type = entry.rel_type.as_str(),
                recorded = ?entry.recorded,
                expected = ?entry.expected,
                "reciprocal may be stale after gender change"
            );
        }
        Ok(GenderChange { person, previous, current: gender, stale })
    }

    /// Reciprocals held by `person` that no longer match their current gender.
    pub async fn stale_reciprocals(&self, person: PersonId) -> Result<Vec<StaleReciprocal>> {
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let report = async {
            let gender = self.require_person(&tx, person).await?.gender;
            self.stale_in_tx(&tx, person, gender).await
        }
        .await;
        self.discard(tx).await;
        report
    }

    // ========================================================================
    // Audit
    // ========================================================================

    /// Check every edge against the mirror invariants.
    pub async fn check_consistency(&self) -> Result<Vec<ConsistencyIssue>> {
        let tx = self.backend.begin_tx(TxMode::ReadOnly).await?;
        let rels = self.backend.all_relationships(&tx).await;
        self.discard(tx).await;
        let mut rels = rels?;
        rels.sort_by_key(|r| r.id);

        let by_id: HashMap<RelId, &Relationship> = rels.iter().map(|r| (r.id, r)).collect();
        let mut by_pair: HashMap<(PersonId, PersonId), Vec<RelId>> = HashMap::new();
        let mut issues = Vec::new();

        for rel in &rels {
            by_pair.entry((rel.src, rel.dst)).or_default().push(rel.id);
            if rel.src == rel.dst {
                issues.push(ConsistencyIssue::SelfRelationship { edge: rel.id });
            }

            match rel.origin {
                EdgeOrigin::Asserted { mirror: MirrorLink::OneWay(_), .. } => {}
                EdgeOrigin::Asserted { holder_gender, mirror: MirrorLink::Linked(mirror_id) } => {
                    let Some(mirror) = by_id.get(&mirror_id) else {
                        issues.push(ConsistencyIssue::MissingMirror { edge: rel.id, mirror: mirror_id });
                        continue;
                    };
                    if mirror.src != rel.dst
                        || mirror.dst != rel.src
                        || mirror.origin != (EdgeOrigin::Mirror { of: rel.id })
                    {
                        issues.push(ConsistencyIssue::BrokenLink { edge: rel.id, mirror: mirror_id });
                        continue;
                    }
                    let expected = self.plan(self.resolver.peek(&rel.rel_type, holder_gender));
                    if expected.label() != Some(mirror.rel_type.as_str()) {
                        issues.push(ConsistencyIssue::MislabeledMirror {
                            edge: rel.id,
                            mirror: mirror_id,
                            expected,
                            found: mirror.rel_type.clone(),
                        });
                    }
                }
                EdgeOrigin::Mirror { of } => {
                    let backed = by_id.get(&of).is_some_and(|owner| {
                        !owner.is_mirror() && owner.counterpart() == Some(rel.id)
                    });
                    if !backed {
                        issues.push(ConsistencyIssue::OrphanedMirror { edge: rel.id });
                    }
                }
            }
        }

        let mut duplicates: Vec<_> = by_pair.into_iter().filter(|(_, edges)| edges.len() > 1).collect();
        duplicates.sort_unstable_by_key(|(pair, _)| *pair);
        issues.extend(
            duplicates
                .into_iter()
                .map(|((src, dst), edges)| ConsistencyIssue::DuplicatePair { src, dst, edges }),
        );

        if !issues.is_empty() {
            tracing::warn!(issues = issues.len(), "relationship graph is inconsistent");
        }
        Ok(issues)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn plan(&self, resolution: Resolution<'_>) -> MirrorPlan {
        match resolution {
            Resolution::Reciprocal(label) => MirrorPlan::Mirror(label.to_string()),
            Resolution::NoReciprocal => MirrorPlan::OneWay(OneWayReason::NoReciprocalForGender),
            Resolution::GenderAbsent => MirrorPlan::OneWay(OneWayReason::GenderAbsent),
            Resolution::Unknown(label) => match self.config.unknown_types {
                UnknownTypePolicy::MirrorIdentity => MirrorPlan::Mirror(label.to_string()),
                UnknownTypePolicy::OneWay => MirrorPlan::OneWay(OneWayReason::UnknownType),
            },
        }
    }

    async fn require_person(&self, tx: &B::Tx, id: PersonId) -> Result<Person> {
        self.backend
            .get_person(tx, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Person {id}")))
    }

    async fn read_pair(&self, tx: &B::Tx, src: PersonId, dst: PersonId) -> Result<PairState> {
        let holder = self.require_person(tx, src).await?;
        self.require_person(tx, dst).await?;
        Ok(PairState {
            holder,
            forward: self.backend.relationship_between(tx, src, dst).await?,
            reverse: self.backend.relationship_between(tx, dst, src).await?,
        })
    }

    /// `Some` if the pair already reflects this assertion exactly.
    fn already_current(pair: &PairState, rel_type: &str, plan: &MirrorPlan) -> Option<Assertion> {
        let forward = pair.forward.as_ref()?;
        let EdgeOrigin::Asserted { holder_gender, mirror } = forward.origin else {
            return None;
        };
        if forward.rel_type != rel_type || holder_gender != pair.holder.gender {
            return None;
        }
        let mirror = match (mirror, plan) {
            (MirrorLink::Linked(id), MirrorPlan::Mirror(label)) => {
                let reverse = pair.reverse.as_ref()?;
                let intact = reverse.id == id
                    && reverse.rel_type == *label
                    && reverse.origin == (EdgeOrigin::Mirror { of: forward.id });
                if !intact {
                    return None;
                }
                Some(id)
            }
            (MirrorLink::OneWay(recorded), MirrorPlan::OneWay(planned)) if recorded == *planned => None,
            _ => return None,
        };
        Some(Assertion { forward: forward.id, mirror, plan: plan.clone(), changed: false })
    }

    async fn write_pair(
        &self,
        tx: &mut B::Tx,
        src: PersonId,
        dst: PersonId,
        rel_type: &str,
        pair: PairState,
        plan: MirrorPlan,
    ) -> Result<Assertion> {
        let holder_gender = pair.holder.gender;
        let previous_forward = pair.forward.as_ref().map(|f| f.id);
        let now = Utc::now();

        // For a mirrored plan the link is rewritten once the mirror id exists.
        let origin = EdgeOrigin::Asserted {
            holder_gender,
            mirror: match &plan {
                MirrorPlan::OneWay(reason) => MirrorLink::OneWay(*reason),
                MirrorPlan::Mirror(_) => MirrorLink::OneWay(OneWayReason::UnknownType),
            },
        };
        let forward_id = match pair.forward {
            Some(mut rel) => {
                rel.rel_type = rel_type.to_string();
                rel.origin = origin;
                rel.updated_at = now;
                let id = rel.id;
                self.backend.update_relationship(tx, rel).await?;
                id
            }
            None => {
                self.backend
                    .create_relationship(tx, NewRelationship {
                        src,
                        dst,
                        rel_type: rel_type.to_string(),
                        origin,
                    })
                    .await?
            }
        };

        let paired_with_forward =
            |rel: &Relationship| previous_forward.is_some() && rel.counterpart() == previous_forward;

        let mirror_id = match &plan {
            MirrorPlan::Mirror(label) => {
                let mirror_origin = EdgeOrigin::Mirror { of: forward_id };
                let mirror_id = match pair.reverse {
                    Some(mut rel) => {
                        if !rel.is_mirror() && !paired_with_forward(&rel) {
                            tracing::info!(edge = %rel.id, "independent reverse edge becomes mirror");
                        }
                        rel.rel_type = label.clone();
                        rel.origin = mirror_origin;
                        rel.updated_at = now;
                        let id = rel.id;
                        self.backend.update_relationship(tx, rel).await?;
                        id
                    }
                    None => {
                        self.backend
                            .create_relationship(tx, NewRelationship {
                                src: dst,
                                dst: src,
                                rel_type: label.clone(),
                                origin: mirror_origin,
                            })
                            .await?
                    }
                };

                let mut forward = self
                    .backend
                    .get_relationship(tx, forward_id)
                    .await?
                    .ok_or_else(|| Error::StorageError(format!("relationship {forward_id} vanished mid-transaction")))?;
                forward.origin = EdgeOrigin::Asserted { holder_gender, mirror: MirrorLink::Linked(mirror_id) };
                self.backend.update_relationship(tx, forward).await?;
                Some(mirror_id)
            }
            MirrorPlan::OneWay(_) => {
                if let Some(stale) = pair.reverse.filter(|rel| paired_with_forward(rel)) {
                    self.backend.delete_relationship(tx, stale.id).await?;
                }
                None
            }
        };

        Ok(Assertion { forward: forward_id, mirror: mirror_id, plan, changed: true })
    }

    async fn delete_pair(&self, tx: &mut B::Tx, edge: Relationship) -> Result<Vec<RelId>> {
        let mut removed = vec![edge.id];
        self.backend.delete_relationship(tx, edge.id).await?;

        if let Some(counterpart) = edge.counterpart() {
            match self.backend.get_relationship(tx, counterpart).await? {
                Some(other) if other.counterpart() == Some(edge.id) => {
                    self.backend.delete_relationship(tx, counterpart).await?;
                    removed.push(counterpart);
                }
                _ => tracing::warn!(
                    edge = %edge.id,
                    %counterpart,
                    "recorded counterpart missing or relinked, nothing else removed"
                ),
            }
        }
        Ok(removed)
    }

    async fn stale_in_tx(&self, tx: &B::Tx, person: PersonId, gender: Option<Gender>) -> Result<Vec<StaleReciprocal>> {
        let mut rels = self.backend.get_relationships(tx, person, Direction::Outgoing, None).await?;
        rels.sort_by_key(|r| r.id);

        let mut stale = Vec::new();
        for rel in rels {
            let EdgeOrigin::Asserted { holder_gender, mirror } = rel.origin else { continue };
            let (recorded, mirror_id) = match mirror {
                MirrorLink::OneWay(reason) => (MirrorPlan::OneWay(reason), None),
                MirrorLink::Linked(id) => match self.backend.get_relationship(tx, id).await? {
                    Some(m) => (MirrorPlan::Mirror(m.rel_type), Some(id)),
                    None => continue,
                },
            };
            let expected = self.plan(self.resolver.peek(&rel.rel_type, gender));
            if recorded != expected {
                stale.push(StaleReciprocal {
                    relationship: rel.id,
                    mirror: mirror_id,
                    holder: rel.src,
                    relative: rel.dst,
                    rel_type: rel.rel_type,
                    recorded_gender: holder_gender,
                    current_gender: gender,
                    recorded,
                    expected,
                });
            }
        }
        Ok(stale)
    }

    /// Commit on success, roll back on failure. Failures of a write
    /// transaction, including the commit itself, become
    /// [`Error::InconsistentGraphWrite`] with the storage error as source.
    async fn finish<T>(&self, tx: B::Tx, operation: &'static str, staged: Result<T>) -> Result<T> {
        match staged {
            Ok(value) => {
                self.backend.commit_tx(tx).await.map_err(|source| {
                    tracing::error!(operation, error = %source, "commit failed");
                    Error::InconsistentGraphWrite { operation, source: Box::new(source) }
                })?;
                Ok(value)
            }
            Err(source) => {
                tracing::error!(operation, error = %source, "write failed, rolling back");
                self.discard(tx).await;
                Err(Error::InconsistentGraphWrite { operation, source: Box::new(source) })
            }
        }
    }

    /// Roll back a transaction whose outcome no longer matters.
    async fn discard(&self, tx: B::Tx) {
        if let Err(e) = self.backend.rollback_tx(tx).await {
            tracing::error!(error = %e, "rollback failed");
        }
    }
}
