//! Course record type and the sentinels used for missing fields.

use serde::{Deserialize, Serialize};

/// Placeholder when a course has no UTME subject data.
pub const NO_UTME_SENTINEL: &str = "Not available";

/// Placeholder when a course has no offering-school data.
pub const NO_SCHOOLS_SENTINEL: &str = "No schools_offering listed";

/// One cleaned row of the course dataset.
///
/// `course` is the primary key: unique and non-empty after cleaning.
/// `schools_offering` is a comma-separated list kept in its raw string
/// form; splitting happens at presentation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course: String,
    pub utme_subjects: String,
    pub schools_offering: String,
}

impl CourseRecord {
    /// Split the offering-school list on commas, trimming each entry and
    /// dropping empties.
    pub fn schools(&self) -> Vec<&str> {
        self.schools_offering
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Raw CSV row before cleaning. All fields optional so that sparse rows
/// deserialize instead of erroring.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRow {
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub utme_subjects: Option<String>,
    #[serde(default)]
    pub schools_offering: Option<String>,
}
