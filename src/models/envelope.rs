use serde::{Deserialize, Serialize};

use super::ErrorCode;

/// Success envelope returned by every API route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Error envelope returned by every API route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
}

impl ApiErrorBody {
    pub fn new(error: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: Some(code),
        }
    }

    /// Error without a code, for failures outside the fixed code set
    pub fn uncoded(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: None,
        }
    }
}
