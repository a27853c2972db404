//! Analysis commands: `futureproof analysis`.

use anyhow::{Context, Result};

use futureproof::config::Config;
use futureproof::ui::render::render_review;

use super::super::AnalysisCommands;

pub async fn cmd_analysis(config: &Config, command: AnalysisCommands) -> Result<()> {
    let client = super::api_client(config)?;

    match command {
        AnalysisCommands::Trigger { project_id } => {
            let ticket = client
                .analysis()
                .trigger(project_id)
                .await
                .with_context(|| format!("Failed to start analysis for project {}", project_id))?;
            println!(
                "{}",
                ticket
                    .message
                    .as_deref()
                    .unwrap_or("Analysis started")
            );
            if let Some(id) = ticket.analysis_id {
                println!("Analysis ID: {}", id);
            }
            println!("Check progress with: futureproof analysis show {}", project_id);
        }
        AnalysisCommands::Show {
            project_id,
            analysis_id,
        } => {
            let status = match analysis_id {
                Some(id) => client.analysis().get(id).await,
                None => client.analysis().for_project(project_id).await,
            }
            .with_context(|| format!("Failed to fetch analysis for project {}", project_id))?;

            if status.is_completed() {
                print!("{}", render_review(&status.into_result(project_id)));
            } else {
                println!("Analysis status: {}", status.status);
            }
        }
    }

    Ok(())
}
