//! Manual content edits saved by the editing tool.

use collegecms_content::{
    ContentScope, normalize_edited_section, validate_content_tree, validate_section_name,
};
use collegecms_shared::{CanonicalInstitution, CollegeCmsError, CourseId, InstitutionId, Result, Section};
use collegecms_storage::CanonicalStore;
use tracing::{info, instrument};

use crate::ids::{IdAllocator, assign_missing_course_ids};

/// Which content tree of an institution an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Institution,
    Course(CourseId),
}

impl EditTarget {
    fn scope(self) -> ContentScope {
        match self {
            Self::Institution => ContentScope::Institution,
            Self::Course(_) => ContentScope::Course,
        }
    }
}

/// Replace one content section of a stored institution (or of one of its
/// courses) with an editor-supplied section.
///
/// The section name must be known for the target scope, and so must every
/// other section of the tree being written back. Blocks are renumbered by
/// position and default to `manual`. Courses lacking an id get one before
/// the record is written back.
#[instrument(skip_all, fields(%id, section = %section_name))]
pub async fn apply_section_edit(
    store: &dyn CanonicalStore,
    id: InstitutionId,
    target: EditTarget,
    section_name: &str,
    section: Section,
) -> Result<CanonicalInstitution> {
    validate_section_name(target.scope(), section_name)?;
    let section = normalize_edited_section(section);

    let mut institution = store
        .find_by_id(id)
        .await?
        .ok_or_else(|| CollegeCmsError::not_found(format!("institution {id}")))?;

    let ids = IdAllocator::new();
    assign_missing_course_ids(&mut institution.courses, &ids);

    let blocks = section.blocks.len();
    let scope = target.scope();
    match target {
        EditTarget::Institution => {
            institution.content.insert(section_name, section);
            validate_content_tree(scope, &institution.content)?;
        }
        EditTarget::Course(course_id) => {
            let course = institution
                .courses
                .iter_mut()
                .find(|c| c.id == course_id)
                .ok_or_else(|| {
                    CollegeCmsError::not_found(format!("course {course_id} of institution {id}"))
                })?;
            course.content.insert(section_name, section);
            validate_content_tree(scope, &course.content)?;
        }
    }

    store.upsert(&institution).await?;
    info!(blocks, "section saved");
    Ok(institution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use collegecms_shared::{BlockSource, CanonicalCourse, ContentTree};
    use collegecms_storage::MemoryStore;
    use serde_json::json;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert(&CanonicalInstitution {
                id: InstitutionId(10),
                name: "XYZ College".into(),
                location: "Pune".into(),
                courses: vec![
                    CanonicalCourse {
                        id: CourseId(77),
                        name: "MBA".into(),
                        ..Default::default()
                    },
                    CanonicalCourse {
                        name: "Legacy".into(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            })
            .await
            .unwrap();
        store
    }

    fn section() -> Section {
        serde_json::from_value(json!({
            "title": "Placements",
            "blocks": [
                {"type": "text", "data": {"text": "Top recruiters"}, "order": 5},
                {"type": "table", "data": {"columns": ["Year", "Median"], "rows": []}},
            ],
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn institution_section_saved_as_manual() {
        let store = seeded().await;
        let saved = apply_section_edit(
            &store,
            InstitutionId(10),
            EditTarget::Institution,
            "placement",
            section(),
        )
        .await
        .unwrap();

        let stored = store.find_by_id(InstitutionId(10)).await.unwrap().unwrap();
        assert_eq!(stored, saved);
        let blocks = &stored.content.get("placement").unwrap().blocks;
        assert_eq!(blocks[0].order, 0);
        assert_eq!(blocks[1].order, 1);
        assert!(blocks.iter().all(|b| b.source == BlockSource::Manual));
        assert_ne!(stored.courses[1].id, CourseId(0));
    }

    #[tokio::test]
    async fn course_section_saved() {
        let store = seeded().await;
        apply_section_edit(
            &store,
            InstitutionId(10),
            EditTarget::Course(CourseId(77)),
            "curriculum",
            section(),
        )
        .await
        .unwrap();
        let stored = store.find_by_id(InstitutionId(10)).await.unwrap().unwrap();
        assert!(stored.courses[0].content.get("curriculum").is_some());
    }

    #[tokio::test]
    async fn tree_with_unknown_section_not_written_back() {
        let store = MemoryStore::new();
        let mut content = ContentTree::new();
        content.insert("hostel", Section::new("Hostel"));
        let original = CanonicalInstitution {
            id: InstitutionId(20),
            name: "ABC Institute".into(),
            location: "Nagpur".into(),
            content,
            ..Default::default()
        };
        store.upsert(&original).await.unwrap();

        let err = apply_section_edit(
            &store,
            InstitutionId(20),
            EditTarget::Institution,
            "faq",
            section(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CollegeCmsError::Validation { .. }));
        assert!(err.to_string().contains("'hostel'"));

        let stored = store.find_by_id(InstitutionId(20)).await.unwrap().unwrap();
        assert_eq!(stored, original);
    }

    #[tokio::test]
    async fn bad_targets_rejected() {
        let store = seeded().await;
        let err = apply_section_edit(
            &store,
            InstitutionId(10),
            EditTarget::Course(CourseId(77)),
            "placement",
            section(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CollegeCmsError::Validation { .. }));

        let err = apply_section_edit(
            &store,
            InstitutionId(11),
            EditTarget::Institution,
            "faq",
            section(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CollegeCmsError::NotFound(_)));

        let err = apply_section_edit(
            &store,
            InstitutionId(10),
            EditTarget::Course(CourseId(5)),
            "faq",
            section(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("course 5"));
    }
}
