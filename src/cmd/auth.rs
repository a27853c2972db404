//! Token management: `futureproof login` and `futureproof logout`.

use anyhow::{Context, Result};

use futureproof::auth::{FileTokenStore, TokenStore};
use futureproof::config::{Config, ENV_TOKEN};

pub fn cmd_login(config: &Config, token: Option<&str>) -> Result<()> {
    let token = match token {
        Some(t) => t.to_string(),
        None => {
            use dialoguer::Password;
            Password::new()
                .with_prompt("API token")
                .interact()
                .context("Failed to read token")?
        }
    };
    if token.trim().is_empty() {
        anyhow::bail!("Token must not be empty");
    }

    let store = FileTokenStore::new(config.token_path.clone());
    store.set(&token)?;
    println!("Token saved to {}", store.path().display());
    if config.env_token.is_some() {
        println!(
            "Note: {} is set and takes precedence over the saved token.",
            ENV_TOKEN
        );
    }
    Ok(())
}

pub fn cmd_logout(config: &Config) -> Result<()> {
    let store = FileTokenStore::new(config.token_path.clone());
    let had_token = store.get().is_some();
    store.clear()?;
    if had_token {
        println!("Logged out. Removed {}", store.path().display());
    } else {
        println!("No stored token at {}", store.path().display());
    }
    Ok(())
}
