//! Catalog loading, cleaning, and lookup.
//!
//! Cleaning rules, applied once at load time:
//! 1. rows that fail to parse are skipped, not fatal
//! 2. rows with an empty course name are dropped
//! 3. missing `utme_subjects` / `schools_offering` become fixed sentinels
//! 4. duplicate course names collapse to the first occurrence
//!
//! The catalog is immutable after load and safe to share across threads.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use coursebot_core::error::{CoursebotError, Result};

use crate::record::{CourseRecord, RawRow, NO_SCHOOLS_SENTINEL, NO_UTME_SENTINEL};

/// Read-only course lookup table, keyed by exact course name.
#[derive(Debug, Clone)]
pub struct CourseCatalog {
    records: Vec<CourseRecord>,
    by_course: HashMap<String, usize>,
}

impl CourseCatalog {
    /// Load and clean the catalog from a CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            CoursebotError::Catalog(format!("cannot open {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            courses = catalog.len(),
            "Course catalog loaded"
        );
        Ok(catalog)
    }

    /// Load and clean the catalog from any CSV reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        let mut by_course: HashMap<String, usize> = HashMap::new();
        let mut skipped = 0usize;

        for row in csv_reader.deserialize::<RawRow>() {
            let raw = match row {
                Ok(r) => r,
                Err(e) => {
                    // Mirror of on_bad_lines='skip': malformed rows never
                    // fail the load.
                    warn!(error = %e, "Skipping malformed catalog row");
                    skipped += 1;
                    continue;
                }
            };

            let course = match raw.course {
                Some(c) if !c.trim().is_empty() => c.trim().to_string(),
                _ => continue,
            };

            // First occurrence wins.
            if by_course.contains_key(&course) {
                continue;
            }

            let record = CourseRecord {
                course: course.clone(),
                utme_subjects: non_empty_or(raw.utme_subjects, NO_UTME_SENTINEL),
                schools_offering: non_empty_or(raw.schools_offering, NO_SCHOOLS_SENTINEL),
            };

            by_course.insert(course, records.len());
            records.push(record);
        }

        if skipped > 0 {
            warn!(skipped, "Catalog rows skipped during load");
        }

        Ok(Self { records, by_course })
    }

    /// Look up a course by exact name.
    ///
    /// The classifier only ever returns labels drawn from this catalog, so
    /// a miss indicates a caller bug; it is still validated rather than
    /// assumed.
    pub fn lookup(&self, course: &str) -> Result<&CourseRecord> {
        self.by_course
            .get(course)
            .map(|&idx| &self.records[idx])
            .ok_or_else(|| CoursebotError::NotFound {
                course: course.to_string(),
            })
    }

    /// All course names in load order. This is the candidate label set
    /// handed to the classifier on every Start-stage turn.
    pub fn course_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.course.clone()).collect()
    }

    /// All cleaned records in load order.
    pub fn records(&self) -> &[CourseRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn non_empty_or(value: Option<String>, sentinel: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => sentinel.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
course,utme_subjects,schools_offering
Medicine,\"English, Biology, Chemistry, Physics\",\"UNILAG, UI\"
Law,\"English, Literature, Government\",UNILAG
Computer Science,\"English, Mathematics, Physics\",\"UNILAG, OAU, FUTA\"
";

    fn load(csv: &str) -> CourseCatalog {
        CourseCatalog::from_reader(Cursor::new(csv)).unwrap()
    }

    // ---- Basic loading ----

    #[test]
    fn test_load_all_rows() {
        let catalog = load(SAMPLE);
        assert_eq!(catalog.len(), 3);
        assert!(!catalog.is_empty());
    }

    #[test]
    fn test_course_names_in_load_order() {
        let catalog = load(SAMPLE);
        assert_eq!(
            catalog.course_names(),
            vec!["Medicine", "Law", "Computer Science"]
        );
    }

    #[test]
    fn test_lookup_hit() {
        let catalog = load(SAMPLE);
        let rec = catalog.lookup("Law").unwrap();
        assert_eq!(rec.schools_offering, "UNILAG");
    }

    #[test]
    fn test_lookup_miss_is_not_found() {
        let catalog = load(SAMPLE);
        let err = catalog.lookup("Astrology").unwrap_err();
        assert!(matches!(err, CoursebotError::NotFound { .. }));
        assert!(err.to_string().contains("Astrology"));
    }

    // ---- Cleaning rules ----

    #[test]
    fn test_empty_course_name_dropped() {
        let csv = "course,utme_subjects,schools_offering\n,ignored,ignored\nLaw,a,b\n";
        let catalog = load(csv);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.course_names(), vec!["Law"]);
    }

    #[test]
    fn test_whitespace_course_name_dropped() {
        let csv = "course,utme_subjects,schools_offering\n   ,ignored,ignored\n";
        let catalog = load(csv);
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_missing_fields_become_sentinels() {
        let csv = "course,utme_subjects,schools_offering\nLaw,,\n";
        let catalog = load(csv);
        let rec = catalog.lookup("Law").unwrap();
        assert_eq!(rec.utme_subjects, NO_UTME_SENTINEL);
        assert_eq!(rec.schools_offering, NO_SCHOOLS_SENTINEL);
    }

    #[test]
    fn test_short_row_becomes_sentinels() {
        // Ragged row with only a course name.
        let csv = "course,utme_subjects,schools_offering\nLaw\n";
        let catalog = load(csv);
        let rec = catalog.lookup("Law").unwrap();
        assert_eq!(rec.utme_subjects, NO_UTME_SENTINEL);
        assert_eq!(rec.schools_offering, NO_SCHOOLS_SENTINEL);
    }

    #[test]
    fn test_duplicate_courses_first_wins() {
        let csv = "course,utme_subjects,schools_offering\n\
                   Law,first subjects,first schools\n\
                   Law,second subjects,second schools\n";
        let catalog = load(csv);
        assert_eq!(catalog.len(), 1);
        let rec = catalog.lookup("Law").unwrap();
        assert_eq!(rec.utme_subjects, "first subjects");
    }

    #[test]
    fn test_load_is_deterministic() {
        let a = load(SAMPLE);
        let b = load(SAMPLE);
        assert_eq!(a.records(), b.records());
    }

    // ---- File loading ----

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let catalog = CourseCatalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_load_missing_file_is_catalog_error() {
        let err = CourseCatalog::load(Path::new("/nonexistent/courses.csv")).unwrap_err();
        assert!(matches!(err, CoursebotError::Catalog(_)));
    }

    #[test]
    fn test_empty_csv_loads_empty() {
        let catalog = load("course,utme_subjects,schools_offering\n");
        assert!(catalog.is_empty());
        assert!(catalog.course_names().is_empty());
    }
}
