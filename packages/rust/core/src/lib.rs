//! Migration orchestration for collegecms.
//!
//! This crate ties the normalizers, the content merge engine, and the
//! stores together: source feeds in, canonical institutions out.

pub mod edit;
pub mod ids;
pub mod pipeline;
pub mod source;

pub use edit::{EditTarget, apply_section_edit};
pub use ids::{IdAllocator, assign_missing_course_ids};
pub use pipeline::{
    CancelToken, ChangeKind, FailedRecord, MigrationReport, ProgressReporter, RecordOutcome,
    SilentProgress, migrate_feed, migrate_one, migrate_record, migrate_staged, reconcile,
    run_migration,
};
pub use source::{JsonFileFeed, SourceFeed, SourceRecord, StagingFeed, parse_documents};
