//! # Storage Backend Trait
//!
//! The contract between the graph maintainer and whatever persists persons
//! and relationship edges. The maintainer never touches storage any other
//! way.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory, snapshot transactions |
//!
//! A backend must give read-write transactions all-or-nothing commit:
//! the maintainer relies on it to keep forward and mirror edges together.

pub mod memory;

use async_trait::async_trait;
use crate::model::*;
use crate::tx::{Transaction, TxMode};
use crate::Result;

pub use memory::{MemoryBackend, MemoryTx};

/// The persistence contract for the kinship graph.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// The transaction type for this backend.
    type Tx: Transaction;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Shut down the backend, flushing any pending writes.
    async fn shutdown(&self) -> Result<()>;

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a new transaction.
    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    /// Commit a transaction. Either every write in it becomes visible or
    /// none does.
    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    /// Roll back a transaction, discarding its writes.
    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Person CRUD
    // ========================================================================

    async fn create_person(&self, tx: &mut Self::Tx, person: NewPerson) -> Result<PersonId>;

    /// Get a person by ID. Returns None if not found.
    async fn get_person(&self, tx: &Self::Tx, id: PersonId) -> Result<Option<Person>>;

    /// Overwrite a person's gender.
    async fn set_gender(&self, tx: &mut Self::Tx, id: PersonId, gender: Option<Gender>) -> Result<()>;

    /// Delete a person. Returns true if they existed.
    /// Fails if the person still has relationships.
    async fn delete_person(&self, tx: &mut Self::Tx, id: PersonId) -> Result<bool>;

    /// Delete a person and every relationship touching them.
    ///
    /// Default: get all relationships, delete each, then delete the person.
    async fn detach_delete_person(&self, tx: &mut Self::Tx, id: PersonId) -> Result<bool> {
        let rels = self.get_relationships(tx, id, Direction::Both, None).await?;
        for rel in &rels {
            self.delete_relationship(tx, rel.id).await?;
        }
        self.delete_person(tx, id).await
    }

    async fn all_persons(&self, tx: &Self::Tx) -> Result<Vec<Person>>;

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    /// Create a relationship between two existing persons.
    async fn create_relationship(&self, tx: &mut Self::Tx, rel: NewRelationship) -> Result<RelId>;

    /// Get a relationship by ID.
    async fn get_relationship(&self, tx: &Self::Tx, id: RelId) -> Result<Option<Relationship>>;

    /// Replace a stored relationship (matched by `rel.id`). Endpoints must
    /// not change.
    async fn update_relationship(&self, tx: &mut Self::Tx, rel: Relationship) -> Result<()>;

    /// Delete a relationship. Returns true if it existed.
    async fn delete_relationship(&self, tx: &mut Self::Tx, id: RelId) -> Result<bool>;

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Get all relationships of a person, optionally filtered by direction and type.
    async fn get_relationships(
        &self,
        tx: &Self::Tx,
        person: PersonId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>>;

    /// The edge `src -> dst`, if any.
    ///
    /// Default: scans `src`'s outgoing edges.
    async fn relationship_between(
        &self,
        tx: &Self::Tx,
        src: PersonId,
        dst: PersonId,
    ) -> Result<Option<Relationship>> {
        let rels = self.get_relationships(tx, src, Direction::Outgoing, None).await?;
        Ok(rels.into_iter().find(|r| r.dst == dst))
    }

    /// Every relationship in the graph.
    ///
    /// Default: scans all persons and collects outgoing relationships.
    async fn all_relationships(&self, tx: &Self::Tx) -> Result<Vec<Relationship>> {
        let mut result = Vec::new();
        for person in self.all_persons(tx).await? {
            result.extend(self.get_relationships(tx, person.id, Direction::Outgoing, None).await?);
        }
        Ok(result)
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn person_count(&self, tx: &Self::Tx) -> Result<u64>;

    async fn relationship_count(&self, tx: &Self::Tx) -> Result<u64>;

    /// All distinct relationship types in the graph, sorted.
    async fn relationship_types(&self, tx: &Self::Tx) -> Result<Vec<String>> {
        let mut types: Vec<String> = self
            .all_relationships(tx)
            .await?
            .into_iter()
            .map(|r| r.rel_type)
            .collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}
