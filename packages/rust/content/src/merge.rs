//! Scraped-content merge.
//!
//! Within a section, manual blocks keep their content and their relative
//! order; scraped blocks are discarded and regenerated from the latest
//! scrape, appended after the manual ones. Every block's `order` is its
//! position in the merged section. Re-running a merge with the same scraped
//! input yields an identical tree.
//!
//! The course admission section is the one exception: it has no editing
//! surface, so the pipeline replaces the whole section rather than merging
//! block by block.

use collegecms_shared::{
    AdmissionStep, BlockSource, BlockType, CanonicalCourse, ContentBlock, ContentTree, Section,
};
use serde_json::{Value, json};

use crate::sections::{
    COURSE_ABOUT_SECTION, COURSE_ABOUT_TITLE, COURSE_ADMISSION_SECTION, COURSE_ADMISSION_TITLE,
    INSTITUTION_SCRAPED_SECTION, INSTITUTION_SCRAPED_TITLE,
};

/// Column headers of the admission step table.
const ADMISSION_COLUMNS: [&str; 3] = ["Step", "Title", "Description"];

// ---------------------------------------------------------------------------
// Block derivation
// ---------------------------------------------------------------------------

fn scraped(block_type: BlockType, data: Value) -> ContentBlock {
    ContentBlock {
        block_type,
        data,
        source: BlockSource::Scraped,
        order: 0,
    }
}

/// `{ text }` block, or `None` for blank text.
pub fn text_block(text: &str) -> Option<ContentBlock> {
    if text.trim().is_empty() {
        return None;
    }
    Some(scraped(BlockType::Text, json!({ "text": text })))
}

/// `{ items }` block, or `None` for an empty list.
pub fn list_block(items: &[String]) -> Option<ContentBlock> {
    if items.is_empty() {
        return None;
    }
    Some(scraped(BlockType::List, json!({ "items": items })))
}

/// Step table with fixed columns, one row per step, or `None` with no steps.
pub fn admission_table_block(steps: &[AdmissionStep]) -> Option<ContentBlock> {
    if steps.is_empty() {
        return None;
    }
    let rows: Vec<Value> = steps
        .iter()
        .map(|s| json!([s.step, s.title, s.description]))
        .collect();

    Some(scraped(
        BlockType::Table,
        json!({ "columns": ADMISSION_COLUMNS, "rows": rows }),
    ))
}

// ---------------------------------------------------------------------------
// Section merge
// ---------------------------------------------------------------------------

/// Merge freshly derived scraped blocks into a section.
///
/// A missing section is created with `default_title`. Manual blocks of the
/// old section are kept in their relative order; its scraped blocks are
/// dropped. The new blocks are tagged scraped, and every block is renumbered
/// by its final position.
pub fn merge_section(
    old: Option<&Section>,
    default_title: &str,
    fresh: impl IntoIterator<Item = ContentBlock>,
) -> Section {
    let mut section = match old {
        Some(old) => Section {
            title: old.title.clone(),
            blocks: old.blocks.iter().filter(|b| b.is_manual()).cloned().collect(),
        },
        None => Section::new(default_title),
    };

    section.blocks.extend(fresh.into_iter().map(|mut block| {
        block.source = BlockSource::Scraped;
        block
    }));
    for (position, block) in section.blocks.iter_mut().enumerate() {
        block.order = position as u32;
    }

    section
}

/// Fold an institution's scraped description and highlights into its tree.
pub fn merge_institution_content(
    tree: &ContentTree,
    description: &str,
    highlights: &[String],
) -> ContentTree {
    let fresh = text_block(description).into_iter().chain(list_block(highlights));

    let mut merged = tree.clone();
    merged.insert(
        INSTITUTION_SCRAPED_SECTION,
        merge_section(
            tree.get(INSTITUTION_SCRAPED_SECTION),
            INSTITUTION_SCRAPED_TITLE,
            fresh,
        ),
    );
    merged
}

/// Fold a course's scraped `about` text and admission steps into its tree.
///
/// With no admission steps the existing admission section is left as is.
pub fn merge_course_content(tree: &ContentTree, course: &CanonicalCourse) -> ContentTree {
    let mut merged = tree.clone();
    merged.insert(
        COURSE_ABOUT_SECTION,
        merge_section(
            tree.get(COURSE_ABOUT_SECTION),
            COURSE_ABOUT_TITLE,
            text_block(&course.about),
        ),
    );

    if let Some(table) = admission_table_block(&course.admission_process) {
        if tree
            .get(COURSE_ADMISSION_SECTION)
            .is_some_and(|s| s.blocks.iter().any(ContentBlock::is_manual))
        {
            tracing::debug!(
                course = %course.name,
                "replacing admission section that held manual blocks"
            );
        }
        merged.insert(
            COURSE_ADMISSION_SECTION,
            merge_section(None, COURSE_ADMISSION_TITLE, [table]),
        );
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_text(text: &str, order: u32) -> ContentBlock {
        ContentBlock {
            block_type: BlockType::Text,
            data: json!({ "text": text }),
            source: BlockSource::Manual,
            order,
        }
    }

    #[test]
    fn new_section_gets_default_title() {
        let section = merge_section(None, "Admission", text_block("Hello"));
        assert_eq!(section.title, "Admission");
        assert_eq!(section.blocks.len(), 1);
        assert_eq!(section.blocks[0].source, BlockSource::Scraped);
        assert_eq!(section.blocks[0].order, 0);
        assert_eq!(section.blocks[0].data, json!({ "text": "Hello" }));
    }

    #[test]
    fn manual_blocks_survive_and_stale_scraped_blocks_go() {
        let old = Section {
            title: "Admission".into(),
            blocks: vec![
                manual_text("Written by an editor", 0),
                list_block(&["stale".to_string()]).unwrap(),
            ],
        };
        let merged = merge_section(Some(&old), "ignored", text_block("Fresh description"));

        assert_eq!(merged.blocks.len(), 2);
        assert_eq!(merged.blocks[0], manual_text("Written by an editor", 0));
        assert_eq!(merged.blocks[1].source, BlockSource::Scraped);
        assert_eq!(merged.blocks[1].block_type, BlockType::Text);
        assert_eq!(merged.blocks[1].order, 1);
        assert!(merged.blocks.iter().all(|b| b.block_type != BlockType::List));
    }

    #[test]
    fn manual_order_preserved_when_interleaved() {
        let old = Section {
            title: "Custom title".into(),
            blocks: vec![
                text_block("old scraped").unwrap(),
                manual_text("first", 4),
                text_block("old scraped 2").unwrap(),
                manual_text("second", 9),
            ],
        };
        let merged = merge_section(Some(&old), "Admission", None::<ContentBlock>);
        assert_eq!(merged.title, "Custom title");
        assert_eq!(
            merged.blocks,
            vec![manual_text("first", 0), manual_text("second", 1)]
        );
    }

    #[test]
    fn appended_manual_block_stays_ahead_of_regenerated_blocks() {
        let mut section = merge_section(
            None,
            "Admission",
            text_block("Scraped intro").into_iter().chain(list_block(&["NAAC A".to_string()])),
        );
        section.blocks.push(manual_text("Editor addendum", 2));

        let merged = merge_section(
            Some(&section),
            "Admission",
            text_block("New intro").into_iter().chain(list_block(&["NAAC A+".to_string()])),
        );

        assert_eq!(merged.blocks.len(), 3);
        assert_eq!(merged.blocks[0].data, json!({ "text": "Editor addendum" }));
        assert!(merged.blocks[0].is_manual());
        assert!(merged.blocks[1..].iter().all(|b| b.source == BlockSource::Scraped));
        for (position, block) in merged.blocks.iter().enumerate() {
            assert_eq!(block.order, position as u32);
        }
    }

    #[test]
    fn fully_manual_section_untouched_without_fresh_content() {
        let old = Section {
            title: "Admission".into(),
            blocks: vec![manual_text("a", 0), manual_text("b", 1)],
        };
        assert_eq!(merge_section(Some(&old), "Admission", None::<ContentBlock>), old);
    }

    #[test]
    fn institution_merge_is_idempotent() {
        let mut tree = ContentTree::new();
        tree.insert(
            "admission",
            Section {
                title: "Admission".into(),
                blocks: vec![manual_text("Editor note", 0)],
            },
        );
        let highlights = vec!["NAAC A+".to_string(), "NIRF 45".to_string()];

        let once = merge_institution_content(&tree, "Founded in 1998.", &highlights);
        let twice = merge_institution_content(&once, "Founded in 1998.", &highlights);

        assert_eq!(once, twice);
        assert_eq!(
            serde_json::to_string(&once).unwrap(),
            serde_json::to_string(&twice).unwrap()
        );
        let section = once.get("admission").unwrap();
        assert_eq!(section.blocks.len(), 3);
        assert_eq!(section.blocks[2].data, json!({ "items": highlights }));
    }

    #[test]
    fn institution_merge_leaves_other_sections_alone() {
        let mut tree = ContentTree::new();
        let faq = Section {
            title: "FAQ".into(),
            blocks: vec![text_block("scraped-looking but in faq").unwrap()],
        };
        tree.insert("faq", faq.clone());
        let merged = merge_institution_content(&tree, "", &[]);
        assert_eq!(merged.get("faq"), Some(&faq));
        assert!(merged.get("admission").unwrap().blocks.is_empty());
    }

    #[test]
    fn course_admission_section_is_replaced_wholesale() {
        let mut tree = ContentTree::new();
        tree.insert(
            "admission",
            Section {
                title: "Old".into(),
                blocks: vec![manual_text("will be replaced", 0)],
            },
        );
        let course = CanonicalCourse {
            name: "MBA".into(),
            about: "Two-year management program.".into(),
            admission_process: vec![
                AdmissionStep {
                    step: Some(1),
                    title: "Apply".into(),
                    description: "Online form".into(),
                },
                AdmissionStep {
                    step: Some(2),
                    title: "Interview".into(),
                    description: String::new(),
                },
            ],
            ..Default::default()
        };

        let merged = merge_course_content(&tree, &course);
        let admission = merged.get("admission").unwrap();
        assert_eq!(admission.title, "Admission Process");
        assert_eq!(admission.blocks.len(), 1);
        assert_eq!(
            admission.blocks[0].data,
            json!({
                "columns": ["Step", "Title", "Description"],
                "rows": [[1, "Apply", "Online form"], [2, "Interview", ""]],
            })
        );
        let about = merged.get("about").unwrap();
        assert_eq!(about.title, "About Course");
        assert_eq!(about.blocks[0].data, json!({ "text": "Two-year management program." }));
    }

    #[test]
    fn course_without_steps_keeps_admission_section() {
        let mut tree = ContentTree::new();
        let admission = Section {
            title: "Admission Process".into(),
            blocks: vec![admission_table_block(&[AdmissionStep::default()]).unwrap()],
        };
        tree.insert("admission", admission.clone());
        let merged = merge_course_content(&tree, &CanonicalCourse::default());
        assert_eq!(merged.get("admission"), Some(&admission));
    }
}
