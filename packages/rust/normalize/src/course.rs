//! Raw course → canonical course.

use collegecms_shared::{AdmissionStep, CanonicalCourse, ContentTree, CourseId, StructureYear};
use serde_json::Value;

use crate::probe::{RawCourse, strings, text};
use crate::text::parse_fee;

/// Normalize one scraped course.
///
/// Recognised fields are copied as-is; `fees` is replaced by [`parse_fee`].
/// Missing fields default to empty, so a course is never dropped. The
/// returned course has no surrogate id (`0`) and an empty content tree;
/// both are assigned by the orchestrator.
pub fn normalize_course(raw: &Value) -> CanonicalCourse {
    let course = RawCourse::probe(raw);

    CanonicalCourse {
        id: CourseId::default(),
        name: owned(course.name),
        duration: owned(course.duration),
        level: owned(course.level),
        fees: parse_fee(course.fees),
        eligibility: owned(course.eligibility),
        about: owned(course.about),
        program_type: owned(course.mode),
        intake: scalar_text(course.intake),
        admission_process: course
            .admission_process
            .iter()
            .filter_map(admission_step)
            .collect(),
        highlights: strings(course.highlights),
        skills: strings(course.skills),
        structure: course.structure.iter().filter_map(structure_year).collect(),
        statistics: course.statistics.cloned().unwrap_or_default(),
        content: ContentTree::new(),
    }
}

/// Normalize every entry of a scraped `courses` array, in order.
pub fn normalize_courses(items: &[Value]) -> Vec<CanonicalCourse> {
    items.iter().map(normalize_course).collect()
}

fn owned(s: Option<&str>) -> String {
    s.map(str::to_string).unwrap_or_default()
}

/// A string or number field as text; numbers keep their JSON spelling.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn admission_step(value: &Value) -> Option<AdmissionStep> {
    let obj = value.as_object()?;
    let step = obj.get("step").and_then(|v| match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    });

    Some(AdmissionStep {
        step,
        title: owned(text(obj, "title")),
        description: owned(text(obj, "description")),
    })
}

fn structure_year(value: &Value) -> Option<StructureYear> {
    let obj = value.as_object()?;
    Some(StructureYear {
        year: owned(text(obj, "year")),
        topics: obj
            .get("topics")
            .and_then(Value::as_array)
            .map(|items| strings(items))
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn course_fields_copied_and_fee_parsed() {
        let raw = json!({
            "name": "B.Tech",
            "duration": "4 Years",
            "level": "UG",
            "fees": "3-5 Lakh",
            "eligibility": "10+2 with 75%",
            "about": "Engineering undergraduate program.",
            "mode": "Full Time",
            "intake": "120",
            "highlights": ["AICTE approved"],
            "skills": ["Programming", 5],
            "statistics": {"placementRate": "92%"},
        });
        let course = normalize_course(&raw);
        assert_eq!(course.name, "B.Tech");
        assert_eq!(course.duration, "4 Years");
        assert_eq!(course.fees, Some(300000.0));
        assert_eq!(course.program_type, "Full Time");
        assert_eq!(course.intake, "120");
        assert_eq!(course.highlights, vec!["AICTE approved"]);
        assert_eq!(course.skills, vec!["Programming"]);
        assert_eq!(course.statistics["placementRate"], "92%");
        assert_eq!(course.id, CourseId(0));
        assert!(course.content.is_empty());
    }

    #[test]
    fn numeric_intake_kept_as_text() {
        let course = normalize_course(&json!({"name": "MBA", "intake": 120}));
        assert_eq!(course.intake, "120");

        let course = normalize_course(&json!({"name": "MBA", "intake": ["120"]}));
        assert_eq!(course.intake, "");
    }

    #[test]
    fn course_without_name_still_normalizes() {
        let course = normalize_course(&json!({"fees": "Contact college"}));
        assert_eq!(course.name, "");
        assert_eq!(course.fees, None);

        let course = normalize_course(&json!(null));
        assert_eq!(course, CanonicalCourse::default());
    }

    #[test]
    fn admission_steps_and_structure() {
        let raw = json!({
            "name": "MBA",
            "admissionProcess": [
                {"step": 1, "title": "Apply", "description": "Fill the form"},
                {"step": "2", "title": "GD/PI"},
                "garbage",
            ],
            "structure": [{"year": "Year 1", "topics": ["Finance", "Marketing"]}, 3],
        });
        let course = normalize_course(&raw);
        assert_eq!(course.admission_process.len(), 2);
        assert_eq!(course.admission_process[0].step, Some(1));
        assert_eq!(course.admission_process[1].step, Some(2));
        assert_eq!(course.admission_process[1].description, "");
        assert_eq!(course.structure.len(), 1);
        assert_eq!(course.structure[0].topics, vec!["Finance", "Marketing"]);
    }

    #[test]
    fn courses_keep_order_and_count() {
        let items = vec![json!({"name": "A"}), json!(17), json!({"name": "C"})];
        let names: Vec<String> = normalize_courses(&items)
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["A", "", "C"]);
    }
}
