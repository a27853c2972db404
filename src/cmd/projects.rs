//! Project listing and management: `futureproof projects`.

use anyhow::{Context, Result};

use futureproof::config::Config;
use futureproof::ui::render::{render_project, render_project_table};

use super::super::ProjectsCommands;

pub async fn cmd_projects(config: &Config, command: Option<ProjectsCommands>) -> Result<()> {
    let client = super::api_client(config)?;

    match command {
        None | Some(ProjectsCommands::List) => {
            let projects = client
                .projects()
                .list()
                .await
                .context("Failed to list projects")?;
            print!("{}", render_project_table(&projects));
        }
        Some(ProjectsCommands::Show { id }) => {
            let project = client
                .projects()
                .get(id)
                .await
                .with_context(|| format!("Failed to fetch project {}", id))?;
            print!("{}", render_project(&project));
        }
        Some(ProjectsCommands::Delete { id, force }) => {
            if !force {
                use dialoguer::Confirm;
                let confirm = Confirm::new()
                    .with_prompt(format!("Delete project {}?", id))
                    .default(false)
                    .interact()
                    .unwrap_or(false);

                if !confirm {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
            }

            client
                .projects()
                .delete(id)
                .await
                .with_context(|| format!("Failed to delete project {}", id))?;
            println!("Deleted project {}", id);
        }
    }

    Ok(())
}
