//! # kinship-rs: Reciprocal Family Relationships
//!
//! Resolves the reciprocal of a family relationship ("if B is A's son, A is
//! B's father") and keeps a relationship graph bidirectionally consistent.
//!
//! ## Design Principles
//!
//! 1. **Table-driven**: one flat reciprocity table, validated at load time
//! 2. **Trait-first**: `StorageBackend` is the contract between maintainer and storage
//! 3. **Clean DTOs**: `Person`, `Relationship`, `Gender` cross all boundaries
//! 4. **Atomic pairs**: an edge and its mirror are written in one transaction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kinship_rs::{Gender, GraphMaintainer};
//!
//! # async fn example() -> kinship_rs::Result<()> {
//! let graph = GraphMaintainer::open_memory();
//!
//! let ada = graph.add_person(Some("Ada"), Some(Gender::Male)).await?;
//! let bob = graph.add_person(Some("Bob"), Some(Gender::Male)).await?;
//!
//! // Bob is Ada's son, so Ada is Bob's father.
//! let assertion = graph.assert_relationship(ada, bob, "son").await?;
//! assert_eq!(assertion.plan.label(), Some("father"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `reciprocity` | Table, resolver and the free `resolve_reciprocal` function |
//! | `maintainer` | Mirror-keeping graph operations and reports |
//! | `storage` | Backend trait and the in-memory backend |
//! | `config` | JSON configuration for policies and custom tables |
//! | `export` | JSON snapshot of a graph |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod reciprocity;
pub mod storage;
pub mod tx;
pub mod config;
pub mod maintainer;
pub mod export;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Gender, Person, PersonId, NewPerson,
    Relationship, NewRelationship, RelId, Direction, EdgeOrigin, MirrorLink, OneWayReason,
};

// ============================================================================
// Re-exports: Reciprocity
// ============================================================================

pub use reciprocity::{
    resolve_reciprocal, list_known_relationship_types,
    Resolution, Resolver, ResolverConfig, AbsentGenderPolicy,
    ReciprocityTable, ReciprocityEntry, ResolverStatsSnapshot,
};

// ============================================================================
// Re-exports: Maintainer
// ============================================================================

pub use maintainer::{
    GraphMaintainer, Assertion, MirrorPlan,
    GenderChange, StaleReciprocal, ConsistencyIssue,
};
pub use config::{KinshipConfig, UnknownTypePolicy};

// ============================================================================
// Re-exports: Storage & Transactions
// ============================================================================

pub use storage::{StorageBackend, MemoryBackend};
pub use tx::{Transaction, TxMode, TxId};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid gender: {0}")]
    InvalidGender(String),

    #[error("Invalid relationship: {0}")]
    InvalidRelationship(String),

    #[error("Reciprocity table error: {0}")]
    TableError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A compound write failed part-way and was rolled back.
    #[error("Inconsistent graph write in {operation}, rolled back: {source}")]
    InconsistentGraphWrite {
        operation: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transaction error: {0}")]
    TxError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
