//! Typed, borrowed views over untyped scraped documents.
//!
//! A scraped document may be missing any key, or carry it with the wrong
//! JSON type. [`PartialRecord`] and [`RawCourse`] probe for the keys the
//! pipeline understands and expose each one as an optional, borrowed field.
//! A key with an unexpected type reads as absent.

use collegecms_shared::RawScrapedRecord;
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Institution-level fields recognised in a scraped document.
#[derive(Debug, Clone, Copy)]
pub struct PartialRecord<'a> {
    pub full_name: Option<&'a str>,
    pub college_name: Option<&'a str>,
    pub location: Option<&'a str>,
    pub college_type: Option<&'a str>,
    pub estd_year: &'a Value,
    pub rating: &'a Value,
    pub review_count: &'a Value,
    pub about_text: Option<&'a str>,
    pub about_list: &'a [Value],
    pub gallery: &'a Value,
    pub courses: &'a [Value],
    pub hero_images: &'a Value,
    pub hero_generated: bool,
}

impl<'a> PartialRecord<'a> {
    /// Probe a scraped document. A non-object document yields an all-empty view.
    pub fn probe(raw: &'a RawScrapedRecord) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::empty();
        };

        Self {
            full_name: text(obj, "full_name"),
            college_name: text(obj, "college_name"),
            location: text(obj, "location"),
            college_type: text(obj, "college_type"),
            estd_year: present(obj, "estd_year"),
            rating: present(obj, "rating"),
            review_count: present(obj, "review_count"),
            about_text: text(obj, "about_text"),
            about_list: array(obj, "about_list"),
            gallery: obj.get("gallery").unwrap_or(&NULL),
            courses: array(obj, "courses"),
            hero_images: obj.get("heroImages").unwrap_or(&NULL),
            hero_generated: obj.get("hero_generated").is_some_and(truthy),
        }
    }

    fn empty() -> Self {
        Self {
            full_name: None,
            college_name: None,
            location: None,
            college_type: None,
            estd_year: &NULL,
            rating: &NULL,
            review_count: &NULL,
            about_text: None,
            about_list: &[],
            gallery: &NULL,
            courses: &[],
            hero_images: &NULL,
            hero_generated: false,
        }
    }

    /// The source-side display name: `full_name`, falling back to `college_name`.
    pub fn source_name(&self) -> Option<&'a str> {
        self.full_name.or(self.college_name)
    }
}

/// Course-level fields recognised in one entry of a document's `courses` array.
#[derive(Debug, Clone, Copy)]
pub struct RawCourse<'a> {
    pub name: Option<&'a str>,
    pub duration: Option<&'a str>,
    pub level: Option<&'a str>,
    pub fees: &'a Value,
    pub eligibility: Option<&'a str>,
    pub about: Option<&'a str>,
    pub mode: Option<&'a str>,
    pub intake: &'a Value,
    pub admission_process: &'a [Value],
    pub highlights: &'a [Value],
    pub skills: &'a [Value],
    pub structure: &'a [Value],
    pub statistics: Option<&'a Map<String, Value>>,
}

impl<'a> RawCourse<'a> {
    pub fn probe(value: &'a Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self {
                name: None,
                duration: None,
                level: None,
                fees: &NULL,
                eligibility: None,
                about: None,
                mode: None,
                intake: &NULL,
                admission_process: &[],
                highlights: &[],
                skills: &[],
                structure: &[],
                statistics: None,
            };
        };

        Self {
            name: text(obj, "name"),
            duration: text(obj, "duration"),
            level: text(obj, "level"),
            fees: present(obj, "fees"),
            eligibility: text(obj, "eligibility"),
            about: text(obj, "about"),
            mode: text(obj, "mode"),
            intake: present(obj, "intake"),
            admission_process: array(obj, "admissionProcess"),
            highlights: array(obj, "highlights"),
            skills: array(obj, "skills"),
            structure: array(obj, "structure"),
            statistics: obj.get("statistics").and_then(Value::as_object),
        }
    }
}

// ---------------------------------------------------------------------------
// Probing helpers
// ---------------------------------------------------------------------------

/// A non-blank string field.
pub(crate) fn text<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn present<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a Value {
    obj.get(key).unwrap_or(&NULL)
}

fn array<'a>(obj: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// String items of a probed array, skipping blanks and non-strings.
pub(crate) fn strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Loose truthiness for flags written by scripts: `true`, non-zero numbers,
/// non-empty strings, and containers all count.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
