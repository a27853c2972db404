//! End-to-end dashboard session: `futureproof run <repo_url>`.

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;

use futureproof::config::Config;
use futureproof::ui::WorkflowUI;
use futureproof::ui::render::{render_completed, render_review, render_steps};
use futureproof::workflow::{Workflow, WorkflowOptions};

pub async fn cmd_run(config: &Config, repo_url: &str, yes: bool, open: bool) -> Result<()> {
    let client = super::api_client(config)?;
    let workflow = Workflow::new(
        client,
        WorkflowOptions {
            poll: config.polling.clone(),
            transform: config.transform.clone(),
        },
    );

    // Ctrl-C cancels the poll loop and any in-flight request.
    let cancel = workflow.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let ui = WorkflowUI::default();
    let stop = CancellationToken::new();
    let follower = ui.follow(workflow.subscribe(), stop.clone());

    let analysis = match workflow.start(repo_url).await {
        Ok(analysis) => analysis,
        Err(e) => {
            stop.cancel();
            let _ = follower.await;
            ui.fail(e.to_string());
            return Err(e.into());
        }
    };

    let mode = config.transform.transformation_mode;
    let proceed = ui.suspend(|| {
        println!();
        print!("{}", render_steps(workflow.stage()));
        println!();
        print!("{}", render_review(&analysis));
        println!();

        if yes {
            return true;
        }
        use dialoguer::Confirm;
        Confirm::new()
            .with_prompt(format!(
                "Start {} transformation (target year {})?",
                mode, config.transform.target_year
            ))
            .default(true)
            .interact()
            .unwrap_or(false)
    });

    if !proceed {
        stop.cancel();
        let _ = follower.await;
        ui.finish("Stopped after review");
        println!("Transformation skipped. Run it later with:");
        if let Some(project) = workflow.snapshot().project {
            println!("  futureproof transform maximum {}", project.id);
        }
        return Ok(());
    }

    let result = workflow.transform().await;
    stop.cancel();
    let _ = follower.await;

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            ui.fail(e.to_string());
            return Err(e.into());
        }
    };
    ui.finish("Done");

    println!();
    print!("{}", render_steps(workflow.stage()));
    println!();
    print!("{}", render_completed(&result));

    if open
        && let Some(url) = &result.download_url
        && let Err(e) = open::that(url)
    {
        eprintln!("{} Could not open browser: {}", style("⚠").yellow(), e);
    }
    Ok(())
}
