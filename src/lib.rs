pub mod api;
pub mod auth;
pub mod channel;
pub mod config;
pub mod contact;
pub mod errors;
pub mod logging;
pub mod models;
pub mod retry;
pub mod ui;
pub mod workflow;

pub use api::ApiClient;
pub use config::Config;
pub use errors::{ApiError, ChannelError, ContactError, WorkflowError};
pub use workflow::{Stage, Workflow};
