//! Block-based CMS content: merging scraped content into a content tree
//! without touching manually authored blocks.
//!
//! All functions are pure: they take the current tree and return a new one.

pub mod edit;
pub mod merge;
pub mod sections;

pub use edit::{normalize_edited_section, validate_content_tree, validate_section_name};
pub use merge::{
    admission_table_block, list_block, merge_course_content, merge_institution_content,
    merge_section, text_block,
};
pub use sections::{ContentScope, COURSE_SECTIONS, INSTITUTION_SECTIONS};
