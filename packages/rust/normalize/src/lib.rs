//! Scrape-to-canonical field normalization.
//!
//! Every function here is total: malformed input degrades to `None`, zero,
//! or an empty collection, never an error. The heuristics live behind
//! narrow functions so they can be tuned without touching orchestration.
//!
//! - [`text`] — name cleanup, fee parsing, image URL gate, scalar parsers
//! - [`media`] — gallery and hero image lists
//! - [`course`] — raw course → [`CanonicalCourse`](collegecms_shared::CanonicalCourse)
//! - [`probe`] — typed, borrowed view over an untyped scraped document
//! - [`record`] — assembles the canonical scalar/array fields of one record

pub mod course;
pub mod media;
pub mod probe;
pub mod record;
pub mod text;

pub use course::{normalize_course, normalize_courses};
pub use media::{normalize_gallery, normalize_hero_images};
pub use probe::{PartialRecord, RawCourse};
pub use record::derive_institution;
pub use text::{
    clean_name, is_valid_image_url, parse_fee, parse_fee_text, parse_rating, parse_review_count,
    parse_year,
};
