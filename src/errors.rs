//! Typed error hierarchy for the Futureproof client.
//!
//! Four top-level enums cover the four subsystems:
//! - `ApiError`: HTTP request client failures
//! - `WorkflowError`: dashboard workflow failures
//! - `ChannelError`: real-time channel transport failures
//! - `ContactError`: contact form validation failures

use thiserror::Error;

use crate::workflow::Stage;

/// Errors from the typed request client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: stored token cleared, log in again at {login_location}")]
    Unauthorized { login_location: String },

    #[error("Backend returned {status} for {method} {path}: {body}")]
    Status {
        method: String,
        path: String,
        status: u16,
        body: String,
    },

    #[error("Request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid backend URL '{0}'")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status code carried by the error, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors from the dashboard workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Repository URL must not be empty")]
    EmptyRepoUrl,

    #[error("Cannot {operation} while the workflow is {stage}")]
    InvalidStage { operation: &'static str, stage: Stage },

    #[error("No project has been created yet")]
    NoProject,

    #[error("Analysis did not complete after {attempts} polls")]
    PollExhausted { attempts: u32 },

    #[error("Workflow cancelled")]
    Cancelled,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors from the real-time channel transport.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Errors from contact form validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContactError {
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
}
