//! Migration orchestrator: scraped documents → canonical institutions.
//!
//! Each record moves `fetched → normalized → upserted`, or ends `failed`.
//! A failed record is logged, reported, and skipped; it never aborts the
//! batch. Records are processed by a bounded worker pool; two records with
//! the same natural key are serialized and applied in feed order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use collegecms_content::{merge_course_content, merge_institution_content};
use collegecms_normalize::derive_institution;
use collegecms_shared::{
    CanonicalInstitution, CollegeCmsError, ContentTree, InstitutionId, MigrationConfig,
    NaturalKey, RawScrapedRecord, Result,
};
use collegecms_storage::{CanonicalStore, StagedStatus, Storage};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OwnedMutexGuard, Semaphore};
use tracing::{info, instrument, warn};

use crate::ids::{IdAllocator, assign_missing_course_ids};
use crate::source::{SourceFeed, SourceRecord, StagingFeed};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative stop signal shared between the caller and the dispatcher.
///
/// Once cancelled, records already handed to a worker finish; no new record
/// is started.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    stop_requested: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Outcomes and report
// ---------------------------------------------------------------------------

/// How an upsert changed the canonical collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// No record with this natural key existed.
    Created,
    /// An existing record was replaced with different scraped input.
    Updated,
    /// An existing record was rewritten from identical scraped input.
    Unchanged,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
        }
    }
}

/// Terminal state of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Upserted {
        id: InstitutionId,
        key: NaturalKey,
        change: ChangeKind,
    },
    Failed {
        identity: NaturalKey,
        error: String,
    },
}

impl RecordOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// A record that reached the `failed` state, kept for operator follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedRecord {
    pub source_key: String,
    pub identity: NaturalKey,
    pub error: String,
}

/// Summary of one batch run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
    /// Records supplied by the feed.
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: Vec<FailedRecord>,
    /// Records never started because the run was cancelled.
    pub skipped: usize,
    /// Source keys of every upserted record, in completion-collection order.
    pub upserted_keys: Vec<String>,
    pub elapsed: Duration,
}

impl MigrationReport {
    fn record(&mut self, source_key: String, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Upserted { change, .. } => {
                match change {
                    ChangeKind::Created => self.created += 1,
                    ChangeKind::Updated => self.updated += 1,
                    ChangeKind::Unchanged => self.unchanged += 1,
                }
                self.upserted_keys.push(source_key);
            }
            RecordOutcome::Failed { identity, error } => self.failed.push(FailedRecord {
                source_key,
                identity,
                error,
            }),
        }
    }

    /// Records that reached `upserted`.
    pub fn upserted(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting migration status.
pub trait ProgressReporter: Send + Sync {
    /// Called once, before the first record is dispatched.
    fn started(&self, total: usize);
    /// Called when a record reaches a terminal state.
    fn record_done(&self, source_key: &str, outcome: &RecordOutcome);
    /// Called when every dispatched record is terminal.
    fn done(&self, report: &MigrationReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _total: usize) {}
    fn record_done(&self, _source_key: &str, _outcome: &RecordOutcome) {}
    fn done(&self, _report: &MigrationReport) {}
}

// ---------------------------------------------------------------------------
// Per-record steps
// ---------------------------------------------------------------------------

/// Fold a freshly derived institution onto the existing record for its
/// natural key, if any.
///
/// The existing surrogate id is kept; otherwise a new one is allocated.
/// Courses are matched to existing courses by exact name (each existing
/// course at most once) and inherit that course's id and content tree. The
/// scraped content of the institution and of every course is then merged
/// into the inherited trees, preserving manual blocks.
pub fn reconcile(
    mut fresh: CanonicalInstitution,
    existing: Option<&CanonicalInstitution>,
    ids: &IdAllocator,
) -> CanonicalInstitution {
    fresh.id = existing.map_or_else(|| ids.next_institution_id(), |e| e.id);

    let old_courses = existing.map(|e| e.courses.as_slice()).unwrap_or_default();
    let mut claimed = vec![false; old_courses.len()];
    for course in &mut fresh.courses {
        let matched =
            (0..old_courses.len()).find(|&i| !claimed[i] && old_courses[i].name == course.name);
        let base = match matched {
            Some(i) => {
                claimed[i] = true;
                course.id = old_courses[i].id;
                old_courses[i].content.clone()
            }
            None => ContentTree::new(),
        };
        let content = merge_course_content(&base, course);
        course.content = content;
    }
    assign_missing_course_ids(&mut fresh.courses, ids);

    let empty = ContentTree::new();
    let base = existing.map_or(&empty, |e| &e.content);
    fresh.content = merge_institution_content(base, &fresh.description, &fresh.highlights);
    fresh
}

fn raw_digest(raw: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

async fn upsert_institution(
    fresh: CanonicalInstitution,
    store: &dyn CanonicalStore,
    ids: &IdAllocator,
) -> Result<(InstitutionId, ChangeKind)> {
    let existing = store.find_by_natural_key(&fresh.natural_key()).await?;
    let change = match &existing {
        None => ChangeKind::Created,
        Some(old) if raw_digest(&old.raw_scraped) == raw_digest(&fresh.raw_scraped) => {
            ChangeKind::Unchanged
        }
        Some(_) => ChangeKind::Updated,
    };

    let canonical = reconcile(fresh, existing.as_ref(), ids);
    let id = store.upsert(&canonical).await?;
    Ok((id, change))
}

/// Run the store half of the state machine for an already normalized record.
async fn persist(
    fresh: CanonicalInstitution,
    store: &dyn CanonicalStore,
    ids: &IdAllocator,
) -> RecordOutcome {
    let key = fresh.natural_key();
    if key.name.is_empty() {
        warn!(location = %key.location, "record has no usable name, writing it anyway");
    }

    match upsert_institution(fresh, store, ids).await {
        Ok((id, change)) => {
            info!(
                name = %key.name,
                location = %key.location,
                %id,
                created = change == ChangeKind::Created,
                change = change.as_str(),
                "migrated"
            );
            RecordOutcome::Upserted { id, key, change }
        }
        Err(e) => {
            warn!(name = %key.name, location = %key.location, error = %e, "record failed");
            RecordOutcome::Failed {
                identity: key,
                error: e.to_string(),
            }
        }
    }
}

/// Normalize and upsert one scraped document.
///
/// Never returns an error: store failures become [`RecordOutcome::Failed`].
pub async fn migrate_record(
    raw: &RawScrapedRecord,
    store: &dyn CanonicalStore,
    ids: &IdAllocator,
    config: &MigrationConfig,
) -> RecordOutcome {
    let fresh = derive_institution(raw, &config.strip_keys);
    persist(fresh, store, ids).await
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// One async lock per natural key seen in the batch.
#[derive(Default)]
struct KeyLocks {
    locks: Mutex<HashMap<NaturalKey, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    async fn acquire(&self, key: &NaturalKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

/// Migrate a batch of records into `store`.
///
/// At most `config.workers` records are in flight. The dispatcher normalizes
/// each record, then takes its natural-key lock before handing it to a
/// worker; tokio mutexes are FIFO, so same-key records are applied in feed
/// order. Returns after every dispatched record is terminal.
#[instrument(skip_all, fields(records = records.len(), workers = config.workers))]
pub async fn run_migration(
    records: Vec<SourceRecord>,
    store: Arc<dyn CanonicalStore>,
    config: &MigrationConfig,
    cancel: &CancelToken,
    progress: Arc<dyn ProgressReporter>,
) -> MigrationReport {
    let start = Instant::now();
    let total = records.len();
    progress.started(total);
    info!(total, workers = config.workers, "starting migration");

    let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
    let locks = KeyLocks::default();
    let ids = Arc::new(IdAllocator::new());
    let mut handles = Vec::with_capacity(total);
    let mut skipped = 0;

    let mut pending = records.into_iter();
    while let Some(SourceRecord { source_key, record }) = pending.next() {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        if cancel.is_cancelled() {
            skipped = 1 + pending.len();
            info!(skipped, "cancellation requested, not starting remaining records");
            break;
        }

        let fresh = derive_institution(&record, &config.strip_keys);
        let key = fresh.natural_key();
        let guard = locks.acquire(&key).await;

        let store = Arc::clone(&store);
        let ids = Arc::clone(&ids);
        let progress = Arc::clone(&progress);
        let task_key = source_key.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            let _guard = guard;
            let outcome = persist(fresh, store.as_ref(), &ids).await;
            progress.record_done(&task_key, &outcome);
            outcome
        });
        handles.push((source_key, key, handle));
    }

    let mut report = MigrationReport {
        total,
        skipped,
        ..Default::default()
    };
    for (source_key, key, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(%source_key, error = %e, "worker task failed");
                let outcome = RecordOutcome::Failed {
                    identity: key,
                    error: format!("worker task failed: {e}"),
                };
                progress.record_done(&source_key, &outcome);
                outcome
            }
        };
        report.record(source_key, outcome);
    }
    report.elapsed = start.elapsed();

    info!(
        total = report.total,
        created = report.created,
        updated = report.updated,
        unchanged = report.unchanged,
        failed = report.failed.len(),
        skipped = report.skipped,
        elapsed_ms = report.elapsed.as_millis(),
        "migration finished"
    );
    progress.done(&report);
    report
}

/// Read every record from `feed` and migrate the batch.
#[instrument(skip_all, fields(feed = %feed.describe()))]
pub async fn migrate_feed(
    feed: &dyn SourceFeed,
    store: Arc<dyn CanonicalStore>,
    config: &MigrationConfig,
    cancel: &CancelToken,
    progress: Arc<dyn ProgressReporter>,
) -> Result<MigrationReport> {
    let records = feed.records().await?;
    Ok(run_migration(records, store, config, cancel, progress).await)
}

/// Migrate the staging collection into the canonical collection of the same
/// database, then record each staged document's outcome.
pub async fn migrate_staged(
    storage: Arc<Storage>,
    include_migrated: bool,
    config: &MigrationConfig,
    cancel: &CancelToken,
    progress: Arc<dyn ProgressReporter>,
) -> Result<MigrationReport> {
    let feed = StagingFeed::new(Arc::clone(&storage), include_migrated);
    let store: Arc<dyn CanonicalStore> = storage.clone();
    let report = migrate_feed(&feed, store, config, cancel, progress).await?;

    let marks = report
        .upserted_keys
        .iter()
        .map(|key| (key, StagedStatus::Migrated))
        .chain(report.failed.iter().map(|f| (&f.source_key, StagedStatus::Failed)));
    for (key, status) in marks {
        if let Err(e) = storage.mark_staged(key, status).await {
            warn!(staged_id = %key, %status, error = %e, "could not record staged status");
        }
    }
    Ok(report)
}

/// Migrate a single staged document and record its outcome.
#[instrument(skip_all, fields(staged_id = %staged_id))]
pub async fn migrate_one(
    storage: &Storage,
    staged_id: &str,
    config: &MigrationConfig,
) -> Result<RecordOutcome> {
    let staged = storage
        .get_staged(staged_id)
        .await?
        .ok_or_else(|| CollegeCmsError::not_found(format!("staged record {staged_id}")))?;

    let ids = IdAllocator::new();
    let outcome = migrate_record(&staged.document, storage, &ids, config).await;
    let status = if outcome.is_failed() {
        StagedStatus::Failed
    } else {
        StagedStatus::Migrated
    };
    storage.mark_staged(staged_id, status).await?;
    Ok(outcome)
}
