//! Core domain types for the canonical institution model.
//!
//! Persisted layout (camelCase JSON):
//! `{ id, name, fullName, location, established, type, rating, reviewCount,
//!    description, highlights[], gallery[], courses[], heroImages[],
//!    heroDownloaded, content: {section: {title, blocks[]}}, rawScraped }`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Surrogate numeric identifier of a canonical institution. Assigned once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstitutionId(pub i64);

impl std::fmt::Display for InstitutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for InstitutionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Surrogate numeric identifier of a course within an institution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub i64);

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplication key of an institution: cleaned name plus location,
/// compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub name: String,
    pub location: String,
}

impl NaturalKey {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({:?})", self.name, self.location)
    }
}

// ---------------------------------------------------------------------------
// Raw scraped input
// ---------------------------------------------------------------------------

/// One scraped document, exactly as the ingestion source delivered it.
///
/// Treated as opaque; the normalizers probe it for the handful of keys they
/// understand. The only transformation ever applied is [`stripped`](Self::stripped).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawScrapedRecord(pub Value);

impl RawScrapedRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Borrow the top-level object, or `None` when the document is not an object.
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Copy of the document with every occurrence of `keys` removed, at any depth.
    pub fn stripped(&self, keys: &[String]) -> Value {
        let mut copy = self.0.clone();
        strip_keys_in_place(&mut copy, keys);
        copy
    }
}

fn strip_keys_in_place(value: &mut Value, keys: &[String]) {
    match value {
        Value::Object(map) => {
            for key in keys {
                map.remove(key);
            }
            for child in map.values_mut() {
                strip_keys_in_place(child, keys);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_keys_in_place(item, keys);
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Content tree
// ---------------------------------------------------------------------------

/// Kind of a content block. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Text,
    List,
    Table,
    KeyValue,
    Custom,
}

/// Who authored a block. Scraped blocks belong to the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockSource {
    Scraped,
    #[default]
    Manual,
}

/// One unit of rendered content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub data: Value,
    #[serde(default)]
    pub source: BlockSource,
    #[serde(default)]
    pub order: u32,
}

impl ContentBlock {
    pub fn is_manual(&self) -> bool {
        self.source == BlockSource::Manual
    }
}

/// A titled, ordered sequence of blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }
}

/// Named sections of an institution or course page.
///
/// Backed by a `BTreeMap` so serialization order is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentTree(BTreeMap<String, Section>);

impl ContentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Section> {
        self.0.get(name)
    }

    /// Insert or replace a section, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, section: Section) -> Option<Section> {
        self.0.insert(name.into(), section)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Section)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Section)> for ContentTree {
    fn from_iter<I: IntoIterator<Item = (String, Section)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------
// Canonical course
// ---------------------------------------------------------------------------

/// One step of a course's admission process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdmissionStep {
    #[serde(default)]
    pub step: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Topics taught in one year of a course.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureYear {
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// One offered program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanonicalCourse {
    pub id: CourseId,
    pub name: String,
    pub duration: String,
    pub level: String,
    /// Lower-bound fee in rupees; `None` means unknown, never zero.
    pub fees: Option<f64>,
    pub eligibility: String,
    pub about: String,
    pub program_type: String,
    pub intake: String,
    pub admission_process: Vec<AdmissionStep>,
    pub highlights: Vec<String>,
    pub skills: Vec<String>,
    pub structure: Vec<StructureYear>,
    pub statistics: Map<String, Value>,
    pub content: ContentTree,
}

// ---------------------------------------------------------------------------
// Canonical institution
// ---------------------------------------------------------------------------

/// The durable, portal-facing representation of one institution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanonicalInstitution {
    pub id: InstitutionId,
    pub name: String,
    pub full_name: String,
    pub location: String,
    pub established: Option<i64>,
    #[serde(rename = "type")]
    pub institution_type: String,
    pub rating: Option<f64>,
    pub review_count: u64,
    pub description: String,
    pub highlights: Vec<String>,
    pub gallery: Vec<String>,
    pub courses: Vec<CanonicalCourse>,
    pub hero_images: Vec<String>,
    pub hero_downloaded: bool,
    pub content: ContentTree,
    pub raw_scraped: Value,
}

impl CanonicalInstitution {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(self.name.clone(), self.location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn institution_id_roundtrip() {
        let id = InstitutionId(1_733_000_000_123_000);
        let parsed: InstitutionId = id.to_string().parse().expect("parse id");
        assert_eq!(id, parsed);
    }

    #[test]
    fn stripped_removes_keys_at_every_depth() {
        let raw = RawScrapedRecord::new(json!({
            "_id": "abc",
            "__v": 0,
            "college_name": "XYZ",
            "courses": [{"_id": "c1", "name": "B.Tech", "sub": {"_id": "s"}}],
        }));
        let keys = vec!["_id".to_string(), "__v".to_string()];
        let stripped = raw.stripped(&keys);
        assert_eq!(
            stripped,
            json!({
                "college_name": "XYZ",
                "courses": [{"name": "B.Tech", "sub": {}}],
            })
        );
        // Source document untouched.
        assert_eq!(raw.as_value()["_id"], "abc");
    }

    #[test]
    fn block_defaults_to_manual_source() {
        let block: ContentBlock =
            serde_json::from_value(json!({"type": "text", "data": {"text": "hi"}}))
                .expect("deserialize block");
        assert_eq!(block.source, BlockSource::Manual);
        assert_eq!(block.order, 0);
        assert!(block.is_manual());
    }

    #[test]
    fn block_type_wire_names() {
        let json = serde_json::to_value(BlockType::KeyValue).unwrap();
        assert_eq!(json, "key_value");
        let parsed: BlockType = serde_json::from_value(json!("table")).unwrap();
        assert_eq!(parsed, BlockType::Table);
    }

    #[test]
    fn institution_serializes_camel_case() {
        let inst = CanonicalInstitution {
            id: InstitutionId(7),
            name: "XYZ College".into(),
            location: "Pune".into(),
            review_count: 12,
            hero_downloaded: true,
            institution_type: "Private".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&inst).expect("serialize");
        assert_eq!(json["reviewCount"], 12);
        assert_eq!(json["heroDownloaded"], true);
        assert_eq!(json["type"], "Private");
        assert!(json.get("rawScraped").is_some());

        let back: CanonicalInstitution = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, inst);
        assert_eq!(back.natural_key(), NaturalKey::new("XYZ College", "Pune"));
    }

    #[test]
    fn content_tree_serializes_in_name_order() {
        let mut tree = ContentTree::new();
        tree.insert("faq", Section::new("FAQ"));
        tree.insert("about", Section::new("About"));
        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.find("about").unwrap() < json.find("faq").unwrap());
    }
}
