use crate::domain::constants::ANALYSIS_FAILED_FALLBACK;
use crate::services::geometry::DegenerateBoxError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Front,
    Side,
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSlot::Front => f.write_str("front"),
            ImageSlot::Side => f.write_str("side"),
        }
    }
}

/// Problems detected locally, before any request is made.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("please select both a front and side image ({0} image missing)")]
    MissingImage(ImageSlot),
    #[error("{0} image is empty")]
    EmptyImage(ImageSlot),
    #[error(transparent)]
    DegenerateBox(#[from] DegenerateBoxError),
    #[error("point ({x}, {y}) lies outside the image; click inside the front image")]
    PointOutOfBounds { x: f64, y: f64 },
}

/// Failure of one request/response exchange with the analysis service.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("analysis service unreachable: {0}")]
    Transport(String),
    #[error("{}", service_message(.body))]
    Service { status: u16, body: String },
    #[error("malformed response from analysis service: {0}")]
    MalformedResponse(String),
}

fn service_message(body: &str) -> &str {
    if body.trim().is_empty() {
        ANALYSIS_FAILED_FALLBACK
    } else {
        body
    }
}

/// Reasons a session action is refused without changing state.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("an analysis request is already in progress")]
    InProgress,
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("manual trichion placement is only offered when the hairline was not detected")]
    OverrideUnavailable,
    #[error("no failed request to retry")]
    NothingToRetry,
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_error_shows_body_verbatim() {
        let err = AnalysisError::Service {
            status: 422,
            body: "{\"detail\":\"No face detected in front image\"}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "{\"detail\":\"No face detected in front image\"}"
        );
    }

    #[test]
    fn service_error_falls_back_on_empty_body() {
        let err = AnalysisError::Service {
            status: 500,
            body: "  ".to_string(),
        };
        assert_eq!(err.to_string(), "Analysis failed");
    }
}
