//! Dashboard overview: `futureproof dashboard`.

use anyhow::{Context, Result};

use futureproof::config::Config;
use futureproof::ui::render::{render_activity, render_stats};

use super::super::DashboardCommands;

pub async fn cmd_dashboard(config: &Config, command: Option<DashboardCommands>) -> Result<()> {
    let client = super::api_client(config)?;

    match command {
        None | Some(DashboardCommands::Stats) => {
            let stats = client
                .dashboard()
                .stats()
                .await
                .context("Failed to fetch dashboard stats")?;
            print!("{}", render_stats(&stats));
        }
        Some(DashboardCommands::Activity) => {
            let recent = client
                .dashboard()
                .recent()
                .await
                .context("Failed to fetch recent activity")?;
            print!("{}", render_activity(&recent.activities));
        }
    }

    Ok(())
}
