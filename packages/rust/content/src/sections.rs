//! Known section names and the titles given to pipeline-created sections.

/// Section names an institution page may carry.
pub const INSTITUTION_SECTIONS: &[&str] = &[
    "about",
    "admission",
    "placement",
    "courses_fees",
    "ranking",
    "campus",
    "scholarship",
    "faq",
    "reviews",
    "news",
];

/// Section names a course page may carry.
pub const COURSE_SECTIONS: &[&str] = &[
    "about",
    "eligibility",
    "admission",
    "fees",
    "curriculum",
    "career",
    "faq",
];

/// Institution section that receives the scraped description and highlights.
pub const INSTITUTION_SCRAPED_SECTION: &str = "admission";
pub const INSTITUTION_SCRAPED_TITLE: &str = "Admission";

/// Course section that receives the scraped `about` text.
pub const COURSE_ABOUT_SECTION: &str = "about";
pub const COURSE_ABOUT_TITLE: &str = "About Course";

/// Course section owned wholesale by the pipeline (admission step table).
pub const COURSE_ADMISSION_SECTION: &str = "admission";
pub const COURSE_ADMISSION_TITLE: &str = "Admission Process";

/// Which kind of page a content tree belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentScope {
    Institution,
    Course,
}

impl ContentScope {
    pub fn sections(self) -> &'static [&'static str] {
        match self {
            Self::Institution => INSTITUTION_SECTIONS,
            Self::Course => COURSE_SECTIONS,
        }
    }

    pub fn is_known(self, name: &str) -> bool {
        self.sections().contains(&name)
    }
}
