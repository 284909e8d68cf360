//! Errors surfaced by the dashboard.
//!
//! Each layer keeps its own error type; this one only wraps them so the
//! presentation layer can report `{ code, message }` uniformly.

use crate::config::ConfigValidationError;
use delivery_learning::LearningError;
use delivery_processing::ProcessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Invalid dashboard configuration: {0}")]
    Config(#[from] ConfigValidationError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Learning(#[from] LearningError),
}

impl DashboardError {
    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "INVALID_CONFIG",
            Self::Processing(e) => e.error_code(),
            Self::Learning(e) => e.error_code(),
        }
    }
}

impl Serialize for DashboardError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("DashboardError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
