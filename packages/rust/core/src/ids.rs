//! Surrogate id allocation.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use collegecms_shared::{CanonicalCourse, CourseId, InstitutionId};

/// Hands out time-ordered numeric ids: wall-clock milliseconds × 1000, bumped
/// past the previous id whenever two requests land in the same millisecond.
///
/// Ids never repeat within one allocator. Across processes uniqueness is
/// left to the store's primary key.
#[derive(Debug, Default)]
pub struct IdAllocator {
    last: AtomicI64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_raw(&self) -> i64 {
        let now = Utc::now().timestamp_millis() * 1000;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn next_institution_id(&self) -> InstitutionId {
        InstitutionId(self.next_raw())
    }

    pub fn next_course_id(&self) -> CourseId {
        CourseId(self.next_raw())
    }
}

/// Give every course still carrying the placeholder id `0` a fresh one.
///
/// Returns how many ids were assigned.
pub fn assign_missing_course_ids(courses: &mut [CanonicalCourse], ids: &IdAllocator) -> usize {
    let mut assigned = 0;
    for course in courses.iter_mut().filter(|c| c.id == CourseId::default()) {
        course.id = ids.next_course_id();
        assigned += 1;
    }
    assigned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_strictly_increase() {
        let ids = IdAllocator::new();
        let a = ids.next_institution_id();
        let b = ids.next_course_id();
        let c = ids.next_institution_id();
        assert!(a.0 < b.0 && b.0 < c.0);
        assert!(a.0 > 1_600_000_000_000_000, "time based: {a}");
    }

    #[test]
    fn ids_unique_across_threads() {
        let ids = Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || {
                    (0..500).map(|_| ids.next_raw()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    #[test]
    fn only_placeholder_ids_replaced() {
        let ids = IdAllocator::new();
        let mut courses = vec![
            CanonicalCourse {
                id: CourseId(42),
                name: "Kept".into(),
                ..Default::default()
            },
            CanonicalCourse {
                name: "New".into(),
                ..Default::default()
            },
        ];
        assert_eq!(assign_missing_course_ids(&mut courses, &ids), 1);
        assert_eq!(courses[0].id, CourseId(42));
        assert_ne!(courses[1].id, CourseId(0));
    }
}
