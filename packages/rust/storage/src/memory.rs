//! In-memory [`CanonicalStore`], used for dry runs and tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use collegecms_shared::{CanonicalInstitution, InstitutionId, NaturalKey, Result};
use tokio::sync::RwLock;

use crate::store::CanonicalStore;

#[derive(Default)]
struct Inner {
    records: BTreeMap<InstitutionId, CanonicalInstitution>,
    by_key: HashMap<NaturalKey, InstitutionId>,
}

/// Canonical collection held in memory with the same natural-key semantics
/// as the libSQL store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, ordered by id.
    pub async fn all(&self) -> Vec<CanonicalInstitution> {
        self.inner.read().await.records.values().cloned().collect()
    }
}

#[async_trait]
impl CanonicalStore for MemoryStore {
    async fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<CanonicalInstitution>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_key
            .get(key)
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: InstitutionId) -> Result<Option<CanonicalInstitution>> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn upsert(&self, institution: &CanonicalInstitution) -> Result<InstitutionId> {
        let mut inner = self.inner.write().await;
        let key = institution.natural_key();
        let id = *inner.by_key.entry(key).or_insert(institution.id);

        let mut stored = institution.clone();
        stored.id = id;
        inner.records.insert(id, stored);
        Ok(id)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().await.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(id: i64, name: &str) -> CanonicalInstitution {
        CanonicalInstitution {
            id: InstitutionId(id),
            name: name.into(),
            location: "Pune".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn same_key_keeps_first_id() {
        let store = MemoryStore::new();
        assert_eq!(store.upsert(&inst(1, "A")).await.unwrap(), InstitutionId(1));

        let mut again = inst(99, "A");
        again.description = "updated".into();
        assert_eq!(store.upsert(&again).await.unwrap(), InstitutionId(1));

        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.find_by_id(InstitutionId(1)).await.unwrap().unwrap();
        assert_eq!(stored.description, "updated");
        assert_eq!(stored.id, InstitutionId(1));
    }

    #[tokio::test]
    async fn natural_key_lookup() {
        let store = MemoryStore::new();
        store.upsert(&inst(5, "B")).await.unwrap();
        let key = NaturalKey::new("B", "Pune");
        assert!(store.find_by_natural_key(&key).await.unwrap().is_some());
        let key = NaturalKey::new("b", "Pune");
        assert!(store.find_by_natural_key(&key).await.unwrap().is_none());
        assert_eq!(store.all().await.len(), 1);
    }
}
