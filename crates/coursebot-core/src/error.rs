use thiserror::Error;

/// Top-level error type for the coursebot system.
///
/// Crates that own a richer error type (e.g. the chat crate) define their
/// own enum and bridge from this one so the `?` operator works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoursebotError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Course not found in catalog: {course}")]
    NotFound { course: String },

    #[error("Catalog contains no courses")]
    EmptyCatalog,

    #[error("Model error: {0}")]
    Model(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for CoursebotError {
    fn from(err: toml::de::Error) -> Self {
        CoursebotError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CoursebotError {
    fn from(err: toml::ser::Error) -> Self {
        CoursebotError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CoursebotError {
    fn from(err: serde_json::Error) -> Self {
        CoursebotError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for coursebot operations.
pub type Result<T> = std::result::Result<T, CoursebotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoursebotError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_not_found_names_course() {
        let err = CoursebotError::NotFound {
            course: "Medicine".to_string(),
        };
        assert_eq!(err.to_string(), "Course not found in catalog: Medicine");
    }

    #[test]
    fn test_empty_catalog_display() {
        assert_eq!(
            CoursebotError::EmptyCatalog.to_string(),
            "Catalog contains no courses"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CoursebotError = io_err.into();
        assert!(matches!(err, CoursebotError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_model_error_display() {
        let err = CoursebotError::Model("onnx inference failed".to_string());
        assert_eq!(err.to_string(), "Model error: onnx inference failed");
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: CoursebotError = bad.unwrap_err().into();
        assert!(matches!(err, CoursebotError::Serialization(_)));
    }
}
