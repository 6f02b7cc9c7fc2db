//! Assemble the canonical fields of one scraped document.

use collegecms_shared::{CanonicalInstitution, ContentTree, InstitutionId, RawScrapedRecord};

use crate::course::normalize_courses;
use crate::media::{normalize_gallery, normalize_hero_images};
use crate::probe::{PartialRecord, strings};
use crate::text::{clean_name, parse_rating, parse_review_count, parse_year};

/// Derive every canonical scalar and array field from a scraped document.
///
/// Identity (`id`, course ids) and the content tree are left empty: they
/// depend on the existing canonical record and are filled in by the
/// orchestrator. `strip_keys` are removed recursively from the embedded
/// `rawScraped` backup.
pub fn derive_institution(raw: &RawScrapedRecord, strip_keys: &[String]) -> CanonicalInstitution {
    let rec = PartialRecord::probe(raw);
    let source_name = rec.source_name().unwrap_or_default();

    CanonicalInstitution {
        id: InstitutionId::default(),
        name: clean_name(source_name),
        full_name: source_name.to_string(),
        location: rec.location.map(|s| s.trim().to_string()).unwrap_or_default(),
        established: parse_year(rec.estd_year),
        institution_type: rec.college_type.map(str::to_string).unwrap_or_default(),
        rating: parse_rating(rec.rating),
        review_count: parse_review_count(rec.review_count),
        description: rec.about_text.map(str::to_string).unwrap_or_default(),
        highlights: strings(rec.about_list),
        gallery: normalize_gallery(rec.gallery),
        courses: normalize_courses(rec.courses),
        hero_images: normalize_hero_images(rec.hero_images),
        hero_downloaded: rec.hero_generated,
        content: ContentTree::new(),
        raw_scraped: raw.stripped(strip_keys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strip_keys() -> Vec<String> {
        vec!["_id".into(), "__v".into()]
    }

    #[test]
    fn end_to_end_fields() {
        let raw = RawScrapedRecord::new(json!({
            "_id": "65f0c0ffee",
            "college_name": "XYZ College: Fees 2025",
            "location": "Pune",
            "courses": [{"name": "B.Tech", "fees": "3-5 Lakh"}],
        }));
        let inst = derive_institution(&raw, &strip_keys());
        assert_eq!(inst.name, "XYZ College");
        assert_eq!(inst.full_name, "XYZ College: Fees 2025");
        assert_eq!(inst.location, "Pune");
        assert_eq!(inst.courses.len(), 1);
        assert_eq!(inst.courses[0].fees, Some(300000.0));
        assert!(inst.raw_scraped.get("_id").is_none());
        assert_eq!(inst.raw_scraped["college_name"], "XYZ College: Fees 2025");
    }

    #[test]
    fn scalar_failures_default_individually() {
        let raw = RawScrapedRecord::new(json!({
            "college_name": "ABC Institute",
            "estd_year": "sometime",
            "rating": "4.5",
            "review_count": "lots",
            "hero_generated": true,
            "heroImages": ["ok.png", "bad.txt"],
            "gallery": [{"image": "g.jpg"}],
            "about_text": "A fine place.",
            "about_list": ["Hostel", "Library"],
        }));
        let inst = derive_institution(&raw, &strip_keys());
        assert_eq!(inst.established, None);
        assert_eq!(inst.rating, Some(4.5));
        assert_eq!(inst.review_count, 0);
        assert!(inst.hero_downloaded);
        assert_eq!(inst.hero_images, vec!["ok.png"]);
        assert_eq!(inst.gallery, vec!["g.jpg"]);
        assert_eq!(inst.description, "A fine place.");
        assert_eq!(inst.highlights, vec!["Hostel", "Library"]);
    }

    #[test]
    fn corrupt_document_degrades_to_empty_name() {
        let raw = RawScrapedRecord::new(json!("not an object"));
        let inst = derive_institution(&raw, &strip_keys());
        assert_eq!(inst.name, "");
        assert_eq!(inst.location, "");
        assert!(inst.courses.is_empty());
        assert_eq!(inst.raw_scraped, json!("not an object"));
    }
}
