//! Shared test utilities for the workspace
//!
//! Provides a unified error type for tests that prefer `?` over panics,
//! assertion macros built on it, and small HTTP helpers for driving
//! axum routers with `tower::ServiceExt::oneshot`.

// =============================================================================
// UNIFIED TEST ERROR HANDLING
// =============================================================================

/// Unified error type for all test failures
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Assertion failed: {message}")]
    AssertionFailure { message: String },

    #[error("Serialization error: {source}")]
    SerializationError { #[from] source: serde_json::Error },

    #[error("HTTP error: {source}")]
    HttpError { #[from] source: http::Error },

    #[error("Body error: {source}")]
    BodyError { #[from] source: axum::Error },

    #[error("Generic test error: {message}")]
    Generic { message: String },
}

impl TestError {
    /// Create an assertion failure error
    pub fn assertion_failure(message: impl Into<String>) -> Self {
        Self::AssertionFailure { message: message.into() }
    }

    /// Create a generic error
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic { message: message.into() }
    }
}

/// Alias for the standard test result type
pub type TestResult<T = ()> = Result<T, TestError>;

/// Helper macro for test assertions that return TestError instead of panicking
#[macro_export]
macro_rules! test_assert {
    ($condition:expr) => {
        if !($condition) {
            return Err($crate::test_helpers::TestError::assertion_failure(
                format!("assertion failed: {}", stringify!($condition))
            ));
        }
    };
    ($condition:expr, $message:expr $(, $arg:expr)*) => {
        if !($condition) {
            return Err($crate::test_helpers::TestError::assertion_failure(
                format!($message $(, $arg)*)
            ));
        }
    };
}

/// Helper macro for test assertions with equality
#[macro_export]
macro_rules! test_assert_eq {
    ($left:expr, $right:expr) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    return Err($crate::test_helpers::TestError::assertion_failure(
                        format!("assertion failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}`",
                                left_val, right_val)
                    ));
                }
            }
        }
    };
}

/// Utility functions for common test operations
pub mod test_utils {
    use super::*;
    use axum::body::Body;

    /// Request builder for JSON bodies
    pub fn build_json_request(method: &str, uri: &str, body: Option<String>) -> TestResult<http::Request<Body>> {
        let mut builder = http::Request::builder()
            .uri(uri)
            .method(method);

        if body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }

        let request = builder
            .body(Body::from(body.unwrap_or_default()))
            .map_err(TestError::from)?;

        Ok(request)
    }

    /// Request builder for urlencoded form bodies
    pub fn build_form_request(uri: &str, fields: &[(&str, &str)]) -> TestResult<http::Request<Body>> {
        let body = serde_urlencoded::to_string(fields)
            .map_err(|e| TestError::generic(format!("Failed to encode form: {}", e)))?;

        let request = http::Request::builder()
            .uri(uri)
            .method("POST")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .map_err(TestError::from)?;

        Ok(request)
    }

    /// Safe response status check
    pub fn check_status_code(actual: http::StatusCode, expected: http::StatusCode) -> TestResult<()> {
        if actual != expected {
            return Err(TestError::assertion_failure(
                format!("Status code mismatch: expected {}, got {}", expected, actual)
            ));
        }
        Ok(())
    }

    /// Reads the whole response body as UTF-8
    pub async fn response_body_string(response: axum::response::Response) -> TestResult<String> {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        String::from_utf8(body_bytes.to_vec())
            .map_err(|e| TestError::generic(format!("Response body is not valid UTF-8: {}", e)))
    }
}
