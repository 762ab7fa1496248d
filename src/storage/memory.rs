//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//!
//! ## Transactions
//!
//! The committed graph lives behind a single `RwLock<Arc<GraphState>>`.
//! A transaction starts from the current `Arc` (no copy) and clones the
//! state on its first write, so it reads its own writes and nobody else's.
//! Every write is also appended to a log. On commit:
//!
//! - if nothing was committed since the transaction began, its state is
//!   swapped in as is;
//! - otherwise the log is replayed onto a copy of the live state, and the
//!   copy is swapped in only if every entry applies.
//!
//! Rollback drops the transaction. Either way a commit is all-or-nothing.
//!
//! ## Limitations
//!
//! - **Copy on write**: the first write of a transaction clones the whole
//!   graph. Fine for tests and embedding, not for large graphs.
//! - **No conflict detection beyond replay**: two transactions that retype
//!   the same edge both succeed, last commit wins. The maintainer's
//!   per-person locks are what prevent that.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use hashbrown::HashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::model::*;
use crate::tx::{Transaction, TxId, TxMode};
use crate::{Error, Result};
use super::StorageBackend;

// ============================================================================
// Graph state
// ============================================================================

#[derive(Debug, Clone, Default)]
struct GraphState {
    persons: HashMap<PersonId, Person>,
    relationships: HashMap<RelId, Relationship>,
    /// person_id → relationship IDs touching that person
    adjacency: HashMap<PersonId, SmallVec<[RelId; 4]>>,
}

/// One logged write, replayable against any state.
#[derive(Debug, Clone)]
enum WriteOp {
    CreatePerson(Person),
    SetGender(PersonId, Option<Gender>),
    DeletePerson(PersonId),
    CreateRelationship(Relationship),
    UpdateRelationship(Relationship),
    DeleteRelationship(RelId),
}

impl GraphState {
    fn apply(&mut self, op: WriteOp) -> Result<()> {
        match op {
            WriteOp::CreatePerson(person) => {
                self.adjacency.entry(person.id).or_default();
                self.persons.insert(person.id, person);
            }
            WriteOp::SetGender(id, gender) => {
                let person = self.persons.get_mut(&id)
                    .ok_or_else(|| Error::NotFound(format!("Person {id}")))?;
                person.gender = gender;
            }
            WriteOp::DeletePerson(id) => {
                if let Some(rels) = self.adjacency.get(&id) {
                    if !rels.is_empty() {
                        return Err(Error::ConstraintViolation(format!(
                            "Cannot delete person {id} with {} relationships. Delete relationships first.",
                            rels.len()
                        )));
                    }
                }
                self.persons.remove(&id);
                self.adjacency.remove(&id);
            }
            WriteOp::CreateRelationship(rel) => {
                if !self.persons.contains_key(&rel.src) {
                    return Err(Error::NotFound(format!("Source person {}", rel.src)));
                }
                if !self.persons.contains_key(&rel.dst) {
                    return Err(Error::NotFound(format!("Target person {}", rel.dst)));
                }
                self.adjacency.entry(rel.src).or_default().push(rel.id);
                if rel.src != rel.dst {
                    self.adjacency.entry(rel.dst).or_default().push(rel.id);
                }
                self.relationships.insert(rel.id, rel);
            }
            WriteOp::UpdateRelationship(rel) => {
                let existing = self.relationships.get_mut(&rel.id)
                    .ok_or_else(|| Error::NotFound(format!("Relationship {}", rel.id)))?;
                if existing.src != rel.src || existing.dst != rel.dst {
                    return Err(Error::ConstraintViolation(format!(
                        "Relationship {} endpoints cannot change", rel.id
                    )));
                }
                *existing = rel;
            }
            WriteOp::DeleteRelationship(id) => {
                if let Some(rel) = self.relationships.remove(&id) {
                    if let Some(rels) = self.adjacency.get_mut(&rel.src) {
                        rels.retain(|rid| *rid != id);
                    }
                    if rel.src != rel.dst {
                        if let Some(rels) = self.adjacency.get_mut(&rel.dst) {
                            rels.retain(|rid| *rid != id);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn relationships_of(&self, person: PersonId) -> impl Iterator<Item = &Relationship> {
        self.adjacency
            .get(&person)
            .into_iter()
            .flatten()
            .filter_map(|rid| self.relationships.get(rid))
    }
}

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory kinship graph storage.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    state: RwLock<Arc<GraphState>>,
    next_person_id: AtomicU64,
    next_rel_id: AtomicU64,
    next_tx_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                state: RwLock::new(Arc::new(GraphState::default())),
                next_person_id: AtomicU64::new(1),
                next_rel_id: AtomicU64::new(1),
                next_tx_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// MemoryTx
// ============================================================================

/// Snapshot transaction with a replayable write log.
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
    /// Committed state this transaction started from.
    base: Arc<GraphState>,
    /// `base` plus this transaction's writes.
    view: Arc<GraphState>,
    log: Vec<WriteOp>,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

impl MemoryTx {
    fn write(&mut self, op: WriteOp) -> Result<()> {
        if !self.is_writable() {
            return Err(Error::TxError(format!("{} is read-only", self.id)));
        }
        Arc::make_mut(&mut self.view).apply(op.clone())?;
        self.log.push(op);
        Ok(())
    }

    /// Number of writes recorded so far.
    pub fn pending_writes(&self) -> usize {
        self.log.len()
    }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for MemoryBackend {
    type Tx = MemoryTx;

    async fn shutdown(&self) -> Result<()> { Ok(()) }

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        let base = Arc::clone(&*self.inner.state.read());
        Ok(MemoryTx { id, mode, view: Arc::clone(&base), base, log: Vec::new() })
    }

    async fn commit_tx(&self, tx: MemoryTx) -> Result<()> {
        if tx.log.is_empty() {
            return Ok(());
        }
        let mut live = self.inner.state.write();
        if Arc::ptr_eq(&*live, &tx.base) {
            *live = tx.view;
            return Ok(());
        }
        let mut next = GraphState::clone(&live);
        let writes = tx.log.len();
        for op in tx.log {
            next.apply(op).map_err(|e| {
                Error::TxError(format!("commit of {} ({writes} writes) failed: {e}", tx.id))
            })?;
        }
        *live = Arc::new(next);
        Ok(())
    }

    async fn rollback_tx(&self, tx: MemoryTx) -> Result<()> {
        tracing::debug!(tx = %tx.id, discarded = tx.log.len(), "rolled back");
        Ok(())
    }

    // ========================================================================
    // Person CRUD
    // ========================================================================

    async fn create_person(&self, tx: &mut MemoryTx, person: NewPerson) -> Result<PersonId> {
        let id = PersonId(self.inner.next_person_id.fetch_add(1, Ordering::Relaxed));
        tx.write(WriteOp::CreatePerson(Person {
            id,
            name: person.name,
            gender: person.gender,
            created_at: Utc::now(),
        }))?;
        Ok(id)
    }

    async fn get_person(&self, tx: &MemoryTx, id: PersonId) -> Result<Option<Person>> {
        Ok(tx.view.persons.get(&id).cloned())
    }

    async fn set_gender(&self, tx: &mut MemoryTx, id: PersonId, gender: Option<Gender>) -> Result<()> {
        tx.write(WriteOp::SetGender(id, gender))
    }

    async fn delete_person(&self, tx: &mut MemoryTx, id: PersonId) -> Result<bool> {
        let existed = tx.view.persons.contains_key(&id);
        tx.write(WriteOp::DeletePerson(id))?;
        Ok(existed)
    }

    async fn all_persons(&self, tx: &MemoryTx) -> Result<Vec<Person>> {
        Ok(tx.view.persons.values().cloned().collect())
    }

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    async fn create_relationship(&self, tx: &mut MemoryTx, rel: NewRelationship) -> Result<RelId> {
        let id = RelId(self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed));
        tx.write(WriteOp::CreateRelationship(Relationship::new(
            id, rel.src, rel.dst, rel.rel_type, rel.origin,
        )))?;
        Ok(id)
    }

    async fn get_relationship(&self, tx: &MemoryTx, id: RelId) -> Result<Option<Relationship>> {
        Ok(tx.view.relationships.get(&id).cloned())
    }

    async fn update_relationship(&self, tx: &mut MemoryTx, rel: Relationship) -> Result<()> {
        tx.write(WriteOp::UpdateRelationship(rel))
    }

    async fn delete_relationship(&self, tx: &mut MemoryTx, id: RelId) -> Result<bool> {
        let existed = tx.view.relationships.contains_key(&id);
        tx.write(WriteOp::DeleteRelationship(id))?;
        Ok(existed)
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    async fn get_relationships(
        &self,
        tx: &MemoryTx,
        person: PersonId,
        dir: Direction,
        rel_type: Option<&str>,
    ) -> Result<Vec<Relationship>> {
        Ok(tx.view
            .relationships_of(person)
            .filter(|rel| match dir {
                Direction::Outgoing => rel.src == person,
                Direction::Incoming => rel.dst == person,
                Direction::Both => true,
            })
            .filter(|rel| rel_type.is_none_or(|t| rel.rel_type == t))
            .cloned()
            .collect())
    }

    async fn all_relationships(&self, tx: &MemoryTx) -> Result<Vec<Relationship>> {
        Ok(tx.view.relationships.values().cloned().collect())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn person_count(&self, tx: &MemoryTx) -> Result<u64> {
        Ok(tx.view.persons.len() as u64)
    }

    async fn relationship_count(&self, tx: &MemoryTx) -> Result<u64> {
        Ok(tx.view.relationships.len() as u64)
    }
}

// ============================================================================
// Tests
// ============================================================================
