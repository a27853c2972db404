//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled                        |
//! |-----------------|-----------------------------------------|
//! | `run`           | `Run`                                   |
//! | `projects`      | `Projects`                              |
//! | `analysis`      | `Analysis`                              |
//! | `transform`     | `Transform`                             |
//! | `dashboard`     | `Dashboard`                             |
//! | `watch`         | `Watch`                                 |
//! | `auth`          | `Login`, `Logout`                       |
//! | `config`        | `Config`                                |
//! | `contact`       | `Contact`                               |

pub mod analysis;
pub mod auth;
pub mod config;
pub mod contact;
pub mod dashboard;
pub mod projects;
pub mod run;
pub mod transform;
pub mod watch;

pub use analysis::cmd_analysis;
pub use auth::{cmd_login, cmd_logout};
pub use config::{cmd_config, cmd_config_init};
pub use contact::{ContactArgs, cmd_contact};
pub use dashboard::cmd_dashboard;
pub use projects::cmd_projects;
pub use run::cmd_run;
pub use transform::cmd_transform;
pub use watch::cmd_watch;

use anyhow::{Context, Result};
use std::sync::Arc;

use futureproof::ApiClient;
use futureproof::auth::{FileTokenStore, MemoryTokenStore, TokenStore};
use futureproof::config::Config;

/// Token store for this invocation: `FUTUREPROOF_TOKEN` if set, otherwise the token file.
pub fn token_store(config: &Config) -> Arc<dyn TokenStore> {
    match &config.env_token {
        Some(token) => Arc::new(MemoryTokenStore::new(Some(token.clone()))),
        None => Arc::new(FileTokenStore::new(config.token_path.clone())),
    }
}

/// API client wired to the configured token store and login location.
pub fn api_client(config: &Config) -> Result<ApiClient> {
    let client = ApiClient::new(&config.api_url, token_store(config))
        .with_context(|| format!("Invalid API URL: {}", config.api_url))?
        .with_login_location(config.login_location.clone())
        .with_redirect(Arc::new(|location| {
            eprintln!(
                "{} Session expired. Log in again at {} and run `futureproof login <token>`.",
                console::style("⚠").yellow(),
                location
            );
        }));
    Ok(client)
}

/// Pretty-print an arbitrary JSON response.
pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to format response")?
    );
    Ok(())
}
