//! Contact form: `futureproof contact`.

use anyhow::{Context, Result};

use futureproof::config::Config;
use futureproof::contact::ContactMessage;

pub struct ContactArgs {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
    pub number: Option<String>,
    pub open: bool,
}

pub fn cmd_contact(config: &Config, args: ContactArgs) -> Result<()> {
    let number = args
        .number
        .or_else(|| config.whatsapp_number.clone())
        .context("No WhatsApp number configured. Pass --number or set [contact] whatsapp_number.")?;

    let contact = ContactMessage::new(
        field_or_prompt(args.name, "Name")?,
        field_or_prompt(args.email, "Email")?,
        field_or_prompt(args.message, "Message")?,
    );
    let link = contact.whatsapp_link(&number)?;

    println!("{}", link);
    if args.open {
        open::that(&link).context("Failed to open browser")?;
    }
    Ok(())
}

fn field_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => {
            use dialoguer::Input;
            Input::new()
                .with_prompt(prompt)
                .interact_text()
                .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))
        }
    }
}
