//! Shared types, error model, and configuration for collegecms.
//!
//! This crate is the foundation depended on by all other collegecms crates.
//! It provides:
//! - [`CollegeCmsError`] — the unified error type
//! - Domain types ([`CanonicalInstitution`], [`CanonicalCourse`], [`ContentTree`],
//!   [`RawScrapedRecord`], [`NaturalKey`])
//! - Configuration ([`AppConfig`], [`MigrationConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, MigrationConfig, MigrationDefaults, StorageConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{CollegeCmsError, Result};
pub use types::{
    AdmissionStep, BlockSource, BlockType, CanonicalCourse, CanonicalInstitution, ContentBlock,
    ContentTree, CourseId, InstitutionId, NaturalKey, RawScrapedRecord, Section, StructureYear,
};
