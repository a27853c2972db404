//! Transformation commands: `futureproof transform`.

use anyhow::{Context, Result};
use std::path::PathBuf;

use futureproof::config::Config;
use futureproof::models::{MlTransformRequest, TransformMode, TransformationResult};
use futureproof::ui::render::{render_completed, render_preview};

use super::super::TransformCommands;

pub async fn cmd_transform(config: &Config, command: TransformCommands) -> Result<()> {
    let client = super::api_client(config)?;
    let transform = client.transform();

    match command {
        TransformCommands::Preview { project_id } => {
            let preview = transform
                .preview(project_id)
                .await
                .with_context(|| format!("Failed to preview project {}", project_id))?;
            print!("{}", render_preview(&preview));
        }
        TransformCommands::Standard { project_id } => {
            let ticket = transform
                .standard(project_id)
                .await
                .with_context(|| format!("Failed to start transformation of {}", project_id))?;
            println!("Transformation {}", ticket.status);
            if let Some(message) = ticket.message {
                println!("{}", message);
            }
        }
        TransformCommands::Maximum {
            project_id,
            mode,
            target_year,
            dry_run,
        } => {
            let mut request = config.transform.clone();
            if let Some(mode) = mode {
                request.transformation_mode = mode.parse::<TransformMode>()?;
            }
            if let Some(year) = target_year {
                request.target_year = year;
            }
            if dry_run {
                request.apply_changes = false;
            }

            let response = transform
                .maximum(project_id, &request)
                .await
                .with_context(|| format!("Maximum transformation of {} failed", project_id))?;
            let result = TransformationResult::from_response(
                project_id,
                response,
                transform.download_url(project_id),
            );
            print!("{}", render_completed(&result));
        }
        TransformCommands::Ml {
            project_id,
            target,
            quantization,
            no_mlflow,
        } => {
            let request = MlTransformRequest {
                ml_framework_target: target.parse()?,
                enable_quantization: quantization,
                add_mlflow_tracking: !no_mlflow,
                ..MlTransformRequest::default()
            };
            let response = transform
                .ml(project_id, &request)
                .await
                .with_context(|| format!("ML transformation of {} failed", project_id))?;
            super::print_json(&response)?;
        }
        TransformCommands::React {
            project_id,
            options,
        } => {
            let options: serde_json::Value =
                serde_json::from_str(&options).context("--options must be a JSON object")?;
            if !options.is_object() {
                anyhow::bail!("--options must be a JSON object");
            }
            let response = transform
                .react_optimize(project_id, &options)
                .await
                .with_context(|| format!("Front-end optimization of {} failed", project_id))?;
            super::print_json(&response)?;
        }
        TransformCommands::Capabilities => {
            let capabilities = transform
                .capabilities()
                .await
                .context("Failed to fetch capabilities")?;
            super::print_json(&capabilities)?;
        }
        TransformCommands::Download { project_id, output } => {
            let output = output.unwrap_or_else(|| default_archive_name(project_id));
            let bytes = transform
                .download(project_id)
                .await
                .with_context(|| format!("Failed to download project {}", project_id))?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved {} bytes to {}", bytes.len(), output.display());
        }
    }

    Ok(())
}

fn default_archive_name(project_id: i64) -> PathBuf {
    PathBuf::from(format!("project-{}-transformed.zip", project_id))
}
