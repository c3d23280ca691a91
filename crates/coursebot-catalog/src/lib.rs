//! Course catalog crate - the CSV-backed course lookup table.
//!
//! Loads a course dataset (course name, UTME subject requirements,
//! offering institutions) from CSV, applies the cleaning rules once at
//! startup, and serves read-only lookups for the lifetime of the process.

pub mod catalog;
pub mod record;

pub use catalog::CourseCatalog;
pub use record::{CourseRecord, NO_SCHOOLS_SENTINEL, NO_UTME_SENTINEL};
