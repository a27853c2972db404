//! Configuration view and validation commands: `futureproof config`.

use anyhow::Result;

use futureproof::config::{CliOverrides, Config, FutureproofToml, default_config_dir};
use futureproof::retry::RetryPolicy;

use super::super::ConfigCommands;

pub fn cmd_config(config: &Config, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Futureproof Configuration");
            println!("=========================");
            println!();

            if config.config_path.exists() {
                println!("Config file: {}", config.config_path.display());
            } else {
                println!("No config file at {}", config.config_path.display());
                println!("Using defaults. Run 'futureproof config init' to create one.");
            }
            println!();

            let toml = config.file_config();
            println!("[api]");
            println!("  base_url = \"{}\"", toml.api.base_url);
            println!("  ws_url = \"{}\"", toml.api.ws_url);
            println!("  site_url = \"{}\"", toml.api.site_url);
            println!("  login_path = \"{}\"", toml.api.login_path);
            println!();
            print_policy("polling", &toml.polling);
            print_policy("reconnect", &toml.reconnect);
            println!("[transform]");
            println!("  mode = \"{}\"", toml.transform.mode);
            println!("  target_year = {}", toml.transform.target_year);
            println!("  apply_changes = {}", toml.transform.apply_changes);
            println!();
            if let Some(number) = &toml.contact.whatsapp_number {
                println!("[contact]");
                println!("  whatsapp_number = \"{}\"", number);
                println!();
            }

            // Effective values (including env/CLI overrides)
            println!("Effective values (with env/CLI overrides):");
            println!("  api_url = \"{}\"", config.api_url);
            println!("  ws_url = \"{}\"", config.ws_url);
            println!("  login = \"{}\"", config.login_location);
            println!("  token_file = \"{}\"", config.token_path.display());
            println!(
                "  token = {}",
                if config.env_token.is_some() {
                    "from environment"
                } else if config.token_path.exists() {
                    "stored"
                } else {
                    "none"
                }
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config.config_path.exists() {
                println!("No config.toml found. Using defaults (valid).");
                return Ok(());
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            let overrides = CliOverrides {
                config_path: Some(config.config_path.clone()),
                ..CliOverrides::default()
            };
            cmd_config_init(&overrides, force)?;
        }
    }

    Ok(())
}

/// Write a default `config.toml`. Runs before the existing file is parsed.
pub fn cmd_config_init(overrides: &CliOverrides, force: bool) -> Result<()> {
    let config_path = overrides
        .config_path
        .clone()
        .unwrap_or_else(|| default_config_dir().join("config.toml"));

    if config_path.exists() && !force {
        println!("config.toml already exists at {}", config_path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    FutureproofToml::default().save(&config_path)?;

    println!("Created config.toml at {}", config_path.display());
    println!();
    println!("You can now customize:");
    println!("  - [api] base_url, ws_url, site_url, login_path");
    println!("  - [polling] and [reconnect] strategy, interval_ms, max_attempts");
    println!("  - [transform] mode, target_year, apply_changes");
    println!("  - [contact] whatsapp_number");
    println!();
    Ok(())
}

fn print_policy(section: &str, policy: &RetryPolicy) {
    println!("[{}]", section);
    println!("  strategy = \"{}\"", policy.strategy);
    println!("  interval_ms = {}", policy.interval_ms);
    println!("  max_interval_ms = {}", policy.max_interval_ms);
    println!("  multiplier = {}", policy.multiplier);
    println!("  jitter = {}", policy.jitter);
    println!(
        "  max_attempts = {}{}",
        policy.max_attempts,
        if policy.max_attempts == 0 {
            " (unlimited)"
        } else {
            ""
        }
    );
    println!();
}
