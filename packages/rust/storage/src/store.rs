//! Canonical store abstraction.
//!
//! The orchestrator only needs three operations from the persistent
//! institution collection; [`CanonicalStore`] names them so the pipeline can
//! run against libSQL ([`Storage`](crate::Storage)) or memory
//! ([`MemoryStore`](crate::MemoryStore)).

use async_trait::async_trait;
use collegecms_shared::{CanonicalInstitution, InstitutionId, NaturalKey, Result};

/// Persistent collection of canonical institutions keyed by surrogate id,
/// with a unique natural-key index.
#[async_trait]
pub trait CanonicalStore: Send + Sync {
    /// Exact, case-sensitive lookup by `(name, location)`.
    async fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<CanonicalInstitution>>;

    /// Lookup by surrogate id.
    async fn find_by_id(&self, id: InstitutionId) -> Result<Option<CanonicalInstitution>>;

    /// Full-document upsert keyed by natural key.
    ///
    /// When a record with the same natural key exists, its document is
    /// replaced and its surrogate id is kept. Returns the stored id.
    async fn upsert(&self, institution: &CanonicalInstitution) -> Result<InstitutionId>;

    /// Number of canonical records.
    async fn count(&self) -> Result<usize>;
}
