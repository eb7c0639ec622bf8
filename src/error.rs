//! Error types for the plate_scan library

use thiserror::Error;

/// Result type alias for plate_scan operations
pub type Result<T> = std::result::Result<T, DetectionError>;

/// Error taxonomy for plate detection
///
/// A pass that finds nothing is not an error: an empty candidate list means
/// "plate not found".
#[derive(Error, Debug)]
pub enum DetectionError {
    /// Source image missing or zero-sized
    #[error("Invalid input image: {reason}")]
    InvalidInput { reason: String },

    /// Cascade model file missing or unparseable
    #[error("Resource unavailable: {resource} ({reason})")]
    ResourceUnavailable { resource: String, reason: String },

    /// Quad too degenerate for a perspective transform
    #[error("Degenerate geometry: {reason}")]
    DegenerateGeometry { reason: String },

    /// Parameter outside its valid range
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Parameter file could not be read or written
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// OpenCV operation failed
    #[error("OpenCV error: {operation}")]
    OpenCvError {
        operation: String,
        #[source]
        source: Option<opencv::Error>,
    },

    /// Filesystem error while writing debug output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectionError {
    /// Create an invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create a degenerate geometry error
    pub fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an OpenCV error with context
    pub fn opencv(operation: impl Into<String>, source: opencv::Error) -> Self {
        Self::OpenCvError {
            operation: operation.into(),
            source: Some(source),
        }
    }

    /// Check if this error is absorbed locally instead of failing a pass
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DetectionError::ResourceUnavailable { .. } | DetectionError::DegenerateGeometry { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            DetectionError::InvalidInput { .. } => {
                "The image is empty. Please provide a decoded vehicle photograph.".to_string()
            }
            DetectionError::ImageLoadError { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            DetectionError::ResourceUnavailable { resource, .. } => {
                format!(
                    "Cascade model '{}' is unavailable. Only geometric detection will run.",
                    resource
                )
            }
            DetectionError::InvalidParameter { parameter, value } => {
                format!("Parameter '{}' has an invalid value ({}).", parameter, value)
            }
            DetectionError::ConfigError { .. } => {
                "Could not read the parameter file. Defaults can be regenerated with generate_config."
                    .to_string()
            }
            _ => "Plate detection failed. Please try with a different image.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(DetectionError::degenerate("3 points").is_recoverable());
        assert!(DetectionError::ResourceUnavailable {
            resource: "plates.xml".into(),
            reason: "missing".into(),
        }
        .is_recoverable());
        assert!(!DetectionError::invalid_input("empty").is_recoverable());
        assert!(!DetectionError::invalid_parameter("blur_kernel", -1).is_recoverable());
    }

    #[test]
    fn test_display_messages() {
        let err = DetectionError::invalid_parameter("haar_scale_factor", 0.9);
        assert_eq!(err.to_string(), "Invalid parameter: haar_scale_factor = 0.9");

        let err = DetectionError::invalid_input("zero-sized image");
        assert!(err.user_message().contains("empty"));
    }
}
