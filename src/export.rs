//! JSON snapshot export.
//!
//! Writes every person and relationship, mirrors included, as one JSON
//! document. Entries are ordered by id so two exports of the same graph are
//! byte-identical.
//!
//! ```text
//! { "persons": [ {id, name, gender, created_at}, ... ],
//!   "relationships": [ {id, src, dst, rel_type, origin, ...}, ... ] }
//! ```

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::storage::StorageBackend;
use crate::tx::TxMode;
use crate::Result;

/// A whole graph in id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub persons: Vec<Person>,
    pub relationships: Vec<Relationship>,
}

/// Read a consistent snapshot in one read-only transaction.
pub async fn snapshot<B: StorageBackend>(backend: &B) -> Result<GraphSnapshot> {
    let tx = backend.begin_tx(TxMode::ReadOnly).await?;
    let persons = backend.all_persons(&tx).await;
    let relationships = backend.all_relationships(&tx).await;
    backend.rollback_tx(tx).await?;

    let mut persons = persons?;
    let mut relationships = relationships?;
    persons.sort_by_key(|p| p.id);
    relationships.sort_by_key(|r| r.id);
    Ok(GraphSnapshot { persons, relationships })
}

/// Export a graph as pretty-printed JSON.
pub async fn export_json<B: StorageBackend>(backend: &B, writer: &mut dyn Write) -> Result<()> {
    let snapshot = snapshot(backend).await?;
    serde_json::to_writer_pretty(&mut *writer, &snapshot)?;
    writeln!(writer)?;
    tracing::debug!(
        persons = snapshot.persons.len(),
        relationships = snapshot.relationships.len(),
        "graph exported"
    );
    Ok(())
}
