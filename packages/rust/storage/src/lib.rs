//! libSQL storage layer for the canonical collection and the staging area.
//!
//! The [`Storage`] struct wraps a local libSQL database holding two tables:
//! `institutions` (canonical records, full JSON document per row, unique on
//! the natural key) and `scraped_records` (the staging collection).
//!
//! **Access rules:**
//! - migration runs: read-write via [`Storage::open`]
//! - inspection (`show`, `staged list`): read-only via [`Storage::open_readonly`]

mod memory;
mod migrations;
mod staging;
mod store;

pub use memory::MemoryStore;
pub use staging::{StagedRecord, StagedStatus, set_path};
pub use store::CanonicalStore;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use collegecms_shared::{
    CanonicalInstitution, CollegeCmsError, InstitutionId, NaturalKey, RawScrapedRecord, Result,
};
use libsql::{Connection, Database, params};
use serde_json::Value;
use uuid::Uuid;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// One line of the canonical collection listing.
#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionSummary {
    pub id: InstitutionId,
    pub name: String,
    pub location: String,
    pub updated_at: String,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CollegeCmsError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(CollegeCmsError::storage)?;

        let conn = db.connect().map_err(CollegeCmsError::storage)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CollegeCmsError::not_found(format!(
                "database {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(CollegeCmsError::storage)?;

        let conn = db.connect().map_err(CollegeCmsError::storage)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CollegeCmsError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    pub async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CollegeCmsError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Canonical collection
    // -----------------------------------------------------------------------

    /// List canonical institutions ordered by name, then location.
    pub async fn list_institutions(&self) -> Result<Vec<InstitutionSummary>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, location, updated_at FROM institutions ORDER BY name, location",
                params![],
            )
            .await
            .map_err(CollegeCmsError::storage)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(CollegeCmsError::storage)? {
            results.push(InstitutionSummary {
                id: InstitutionId(row.get::<i64>(0).map_err(CollegeCmsError::storage)?),
                name: row.get::<String>(1).map_err(CollegeCmsError::storage)?,
                location: row.get::<String>(2).map_err(CollegeCmsError::storage)?,
                updated_at: row.get::<String>(3).map_err(CollegeCmsError::storage)?,
            });
        }
        Ok(results)
    }

    async fn query_one_institution(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Option<CanonicalInstitution>> {
        let mut rows = self
            .conn
            .query(sql, params)
            .await
            .map_err(CollegeCmsError::storage)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_institution(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(CollegeCmsError::storage(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Staging collection
    // -----------------------------------------------------------------------

    /// Insert a scraped document as a `draft`. Returns its generated key.
    pub async fn stage_record(&self, document: &Value, source_url: Option<&str>) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let json = serde_json::to_string(document).map_err(CollegeCmsError::storage)?;
        self.conn
            .execute(
                "INSERT INTO scraped_records (id, source_url, status, document, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    source_url,
                    StagedStatus::Draft.as_str(),
                    json,
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(CollegeCmsError::storage)?;
        Ok(id)
    }

    /// Get one staged document by key.
    pub async fn get_staged(&self, id: &str) -> Result<Option<StagedRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, source_url, status, document, created_at, updated_at
                 FROM scraped_records WHERE id = ?1",
                params![id],
            )
            .await
            .map_err(CollegeCmsError::storage)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_staged(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(CollegeCmsError::storage(e)),
        }
    }

    /// List staged documents in insertion order, optionally filtered by status.
    pub async fn list_staged(&self, status: Option<StagedStatus>) -> Result<Vec<StagedRecord>> {
        let mut rows = match status {
            Some(status) => {
                self.conn
                    .query(
                        "SELECT id, source_url, status, document, created_at, updated_at
                         FROM scraped_records WHERE status = ?1 ORDER BY id",
                        params![status.as_str()],
                    )
                    .await
            }
            None => {
                self.conn
                    .query(
                        "SELECT id, source_url, status, document, created_at, updated_at
                         FROM scraped_records ORDER BY id",
                        params![],
                    )
                    .await
            }
        }
        .map_err(CollegeCmsError::storage)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(CollegeCmsError::storage)? {
            results.push(row_to_staged(&row)?);
        }
        Ok(results)
    }

    /// Set one field of a staged document, addressed by a dotted path.
    pub async fn update_staged_field(&self, id: &str, path: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        let mut record = self
            .get_staged(id)
            .await?
            .ok_or_else(|| CollegeCmsError::not_found(format!("staged record {id}")))?;

        set_path(&mut record.document.0, path, value)?;

        let json = serde_json::to_string(record.document.as_value())
            .map_err(CollegeCmsError::storage)?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE scraped_records SET document = ?1, updated_at = ?2 WHERE id = ?3",
                params![json, now.as_str(), id],
            )
            .await
            .map_err(CollegeCmsError::storage)?;
        Ok(())
    }

    /// Record the migration outcome of a staged document.
    pub async fn mark_staged(&self, id: &str, status: StagedStatus) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE scraped_records SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now.as_str(), id],
            )
            .await
            .map_err(CollegeCmsError::storage)?;
        if changed == 0 {
            return Err(CollegeCmsError::not_found(format!("staged record {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CanonicalStore for Storage {
    async fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<CanonicalInstitution>> {
        self.query_one_institution(
            "SELECT id, document FROM institutions WHERE name = ?1 AND location = ?2",
            params![key.name.as_str(), key.location.as_str()],
        )
        .await
    }

    async fn find_by_id(&self, id: InstitutionId) -> Result<Option<CanonicalInstitution>> {
        self.query_one_institution(
            "SELECT id, document FROM institutions WHERE id = ?1",
            params![id.0],
        )
        .await
    }

    async fn upsert(&self, institution: &CanonicalInstitution) -> Result<InstitutionId> {
        self.check_writable()?;
        let json = serde_json::to_string(institution).map_err(CollegeCmsError::storage)?;
        let now = Utc::now().to_rfc3339();

        let mut rows = self
            .conn
            .query(
                "INSERT INTO institutions (id, name, location, document, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(name, location) DO UPDATE SET
                   document = excluded.document,
                   updated_at = excluded.updated_at
                 RETURNING id",
                params![
                    institution.id.0,
                    institution.name.as_str(),
                    institution.location.as_str(),
                    json,
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(CollegeCmsError::storage)?;

        match rows.next().await.map_err(CollegeCmsError::storage)? {
            Some(row) => Ok(InstitutionId(
                row.get::<i64>(0).map_err(CollegeCmsError::storage)?,
            )),
            None => Err(CollegeCmsError::Storage(format!(
                "upsert of {} returned no row",
                institution.natural_key()
            ))),
        }
    }

    async fn count(&self) -> Result<usize> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM institutions", params![])
            .await
            .map_err(CollegeCmsError::storage)?;

        match rows.next().await.map_err(CollegeCmsError::storage)? {
            Some(row) => Ok(row.get::<i64>(0).map_err(CollegeCmsError::storage)? as usize),
            None => Ok(0),
        }
    }
}

/// Convert an `(id, document)` row to a [`CanonicalInstitution`].
///
/// The row id wins over whatever id the stored document carries.
fn row_to_institution(row: &libsql::Row) -> Result<CanonicalInstitution> {
    let id: i64 = row.get(0).map_err(CollegeCmsError::storage)?;
    let document: String = row.get(1).map_err(CollegeCmsError::storage)?;
    let mut institution: CanonicalInstitution = serde_json::from_str(&document)
        .map_err(|e| CollegeCmsError::Storage(format!("corrupt document for id {id}: {e}")))?;
    institution.id = InstitutionId(id);
    Ok(institution)
}

/// Convert a `scraped_records` row to a [`StagedRecord`].
fn row_to_staged(row: &libsql::Row) -> Result<StagedRecord> {
    let status: String = row.get(2).map_err(CollegeCmsError::storage)?;
    let document: String = row.get(3).map_err(CollegeCmsError::storage)?;

    Ok(StagedRecord {
        id: row.get::<String>(0).map_err(CollegeCmsError::storage)?,
        source_url: row.get::<String>(1).ok(),
        status: status.parse()?,
        // A document that no longer decodes is still handed over as a JSON
        // string so the normalizers can degrade it instead of failing here.
        document: RawScrapedRecord::new(
            serde_json::from_str(&document).unwrap_or(Value::String(document)),
        ),
        created_at: parse_timestamp(row, 4)?,
        updated_at: parse_timestamp(row, 5)?,
    })
}

fn parse_timestamp(row: &libsql::Row, index: i32) -> Result<DateTime<Utc>> {
    let s: String = row.get(index).map_err(CollegeCmsError::storage)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CollegeCmsError::Storage(format!("invalid date: {e}")))
}
