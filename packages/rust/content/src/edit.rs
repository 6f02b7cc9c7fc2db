//! Normalization of sections saved by the editing tool.

use collegecms_shared::{CollegeCmsError, ContentTree, Result, Section};

use crate::sections::ContentScope;

/// Reject section names outside the known set for `scope`.
pub fn validate_section_name(scope: ContentScope, name: &str) -> Result<()> {
    if scope.is_known(name) {
        return Ok(());
    }
    Err(CollegeCmsError::validation(format!(
        "unknown {} content section '{name}' (expected one of: {})",
        match scope {
            ContentScope::Institution => "institution",
            ContentScope::Course => "course",
        },
        scope.sections().join(", ")
    )))
}

/// Reject a whole tree if any of its section names is unknown for `scope`.
pub fn validate_content_tree(scope: ContentScope, tree: &ContentTree) -> Result<()> {
    tree.iter()
        .try_for_each(|(name, _)| validate_section_name(scope, name))
}

/// Re-stamp `order` with each block's position.
///
/// Blocks saved without a `source` already deserialize as manual, so an
/// edited section is owned by its editor unless it says otherwise.
pub fn normalize_edited_section(mut section: Section) -> Section {
    for (index, block) in section.blocks.iter_mut().enumerate() {
        block.order = index as u32;
    }
    section
}
