//! Text renderings of the dashboard views.
//!
//! Every function returns a `String` so views can be printed, logged or
//! compared in tests. Colour comes from `console` and is dropped automatically
//! when stdout is not a terminal.

use console::{StyledObject, style};

use crate::models::{
    ActivityItem, AnalysisResult, DashboardStats, Project, TransformationPreview,
    TransformationResult,
};
use crate::ui::icons::{ACTIVE, CHART, CHECK, PACKAGE, PENDING, SPARKLE};
use crate::workflow::{LogEntry, Stage, StepState};

/// Visible steps of the flow, in order. `Idle` is not a step.
const STEPS: [(Stage, &str); 5] = [
    (Stage::Creating, "Connect repository"),
    (Stage::Analyzing, "AI code analysis"),
    (Stage::Review, "Review results"),
    (Stage::Transforming, "Transform"),
    (Stage::Completed, "Download"),
];

/// Colour a 0–100 score: green from 80, yellow from 60, red below.
pub fn score_style(score: u8) -> StyledObject<u8> {
    if score >= 80 {
        style(score).green()
    } else if score >= 60 {
        style(score).yellow()
    } else {
        style(score).red()
    }
}

/// `load_time` → `load time`.
pub fn humanize_key(key: &str) -> String {
    key.replace('_', " ")
}

pub fn render_steps(current: Stage) -> String {
    let mut out = String::new();
    for (step, label) in STEPS {
        let line = match current.step_state(step) {
            StepState::Done => format!("{}{}", CHECK, style(label).green()),
            StepState::Active => format!("{}{}", ACTIVE, style(label).cyan().bold()),
            StepState::Pending => format!("{}{}", PENDING, style(label).dim()),
        };
        out.push_str(&line);
        out.push('\n');
    }
    out
}

pub fn render_review(result: &AnalysisResult) -> String {
    let metrics = &result.metrics;
    let stack = &result.detected_stack;
    let mut out = String::new();

    out.push_str(&format!("{}{}\n", CHART, style("Analysis results").bold()));
    out.push_str(&format!(
        "  Overall score:      {}\n",
        score_style(metrics.overall_score)
    ));
    out.push_str(&format!(
        "  Security:           {}\n",
        score_style(metrics.security_score)
    ));
    out.push_str(&format!(
        "  Performance:        {}\n",
        score_style(metrics.performance_score)
    ));
    out.push_str(&format!(
        "  Code quality:       {}\n",
        score_style(metrics.code_quality_score)
    ));
    out.push('\n');

    out.push_str(&format!("{}\n", style("Detected stack").bold()));
    out.push_str(&format!("  Language:   {}\n", or_unknown(&stack.language)));
    out.push_str(&format!("  Framework:  {}\n", or_unknown(&stack.framework)));
    if !stack.libraries.is_empty() {
        out.push_str(&format!("  Libraries:  {}\n", stack.libraries.join(", ")));
    }
    if !stack.ml_frameworks.is_empty() {
        out.push_str(&format!(
            "  ML:         {}\n",
            stack.ml_frameworks.join(", ")
        ));
    }
    out.push_str(&format!(
        "  Files:      {} ({} lines)\n",
        result.total_files, result.total_lines
    ));

    if let Some(details) = &result.details
        && !details.issues_by_severity.is_empty()
    {
        out.push('\n');
        out.push_str(&format!("{}\n", style("Issues by severity").bold()));
        for (severity, count) in &details.issues_by_severity {
            out.push_str(&format!("  {:<10} {}\n", severity, count));
        }
    }

    if !result.recommendations.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n", style("Recommendations").bold()));
        for rec in &result.recommendations {
            out.push_str(&format!("  - {}\n", rec));
        }
    }
    out
}

pub fn render_completed(result: &TransformationResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}{}\n",
        SPARKLE,
        style("Transformation complete").green().bold()
    ));
    out.push_str(&format!(
        "  Files transformed: {}\n",
        style(result.files_transformed).cyan()
    ));

    if !result.improvements.is_empty() {
        out.push('\n');
        out.push_str(&format!("{}\n", style("Improvements").bold()));
        for (metric, value) in &result.improvements {
            out.push_str(&format!(
                "  {} → {}\n",
                humanize_key(metric),
                style(value).green()
            ));
        }
    }

    if let Some(url) = &result.download_url {
        out.push('\n');
        out.push_str(&format!("{}Download: {}\n", PACKAGE, style(url).underlined()));
    }
    out
}

pub fn render_log(entries: &[LogEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}\n", style(entry).dim()))
        .collect()
}

pub fn render_project_table(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects yet.\n".to_string();
    }
    let mut out = format!(
        "{:>6}  {:<24} {:<13} {}\n",
        style("ID").bold(),
        style("NAME").bold(),
        style("STATUS").bold(),
        style("REPOSITORY").bold()
    );
    for p in projects {
        out.push_str(&format!(
            "{:>6}  {:<24} {:<13} {}\n",
            p.id,
            truncate(&p.name, 24),
            p.status.to_string(),
            p.repo_url
        ));
    }
    out
}

pub fn render_project(project: &Project) -> String {
    let mut out = format!(
        "{} {}\n",
        style(&project.name).bold(),
        style(format!("#{}", project.id)).dim()
    );
    out.push_str(&format!("  Repository: {}\n", project.repo_url));
    out.push_str(&format!("  Status:     {}\n", project.status));
    out.push_str(&format!(
        "  Created:    {}\n",
        project.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    if let Some(language) = &project.language {
        out.push_str(&format!("  Language:   {}\n", language));
    }
    if let Some(framework) = &project.framework {
        out.push_str(&format!("  Framework:  {}\n", framework));
    }
    if let Some(description) = &project.description {
        out.push_str(&format!("  {}\n", description));
    }
    out
}

pub fn render_preview(preview: &TransformationPreview) -> String {
    let mut out = format!(
        "{}Transformation preview for {}\n",
        CHART,
        style(preview.project_name.as_deref().unwrap_or("project")).bold()
    );
    for (name, score) in &preview.current_scores {
        let shown = score
            .map(|s| score_style(s.round().clamp(0.0, 100.0) as u8).to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("  {:<20} {}\n", humanize_key(name), shown));
    }
    if let Some(files) = preview.files_to_transform {
        out.push_str(&format!("  Files to transform: {}\n", files));
    }
    out
}

pub fn render_stats(stats: &DashboardStats) -> String {
    let mut out = format!("{}{}\n", CHART, style("Dashboard").bold());
    out.push_str(&format!("  Projects:          {}\n", stats.total_projects));
    out.push_str(&format!("    active           {}\n", stats.active_projects));
    out.push_str(&format!("    completed        {}\n", stats.completed_projects));
    out.push_str(&format!("    failed           {}\n", stats.failed_projects));
    out.push_str(&format!("  Analyses:          {}\n", stats.total_analyses));
    out.push_str(&format!(
        "  Transformations:   {}\n",
        stats.total_transformations
    ));
    out.push_str(&format!(
        "  Avg code quality:  {:.1}\n",
        stats.avg_code_quality
    ));
    out
}

pub fn render_activity(items: &[ActivityItem]) -> String {
    if items.is_empty() {
        return "No recent activity.\n".to_string();
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{} {:<14} {} {}\n",
                style(item.timestamp.format("%Y-%m-%d %H:%M")).dim(),
                item.kind,
                style(&item.project_name).bold(),
                item.message
            )
        })
        .collect()
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() { "unknown" } else { value }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
