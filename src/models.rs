//! Value records mirrored from backend responses and request bodies sent to it.
//!
//! Nothing here is persisted; the client holds these only for the session.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ── Projects ─────────────────────────────────────────────────────────

/// Backend lifecycle status of a project. Advanced only by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    Analyzing,
    Analyzed,
    Transforming,
    Transformed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::Analyzing => "analyzing",
            ProjectStatus::Analyzed => "analyzed",
            ProjectStatus::Transforming => "transforming",
            ProjectStatus::Transformed => "transformed",
            ProjectStatus::Failed => "failed",
            ProjectStatus::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A unit of work representing one ingested source repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub repo_url: String,
    pub status: ProjectStatus,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for `POST /projects/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    pub repo_url: String,
}

/// Fallback project name when the locator has no usable final segment.
pub const PLACEHOLDER_PROJECT_NAME: &str = "Repo";

impl CreateProject {
    /// Build a create request whose name is the locator's final path segment.
    pub fn from_repo_url(repo_url: &str) -> Self {
        Self {
            name: default_project_name(repo_url),
            repo_url: repo_url.to_string(),
        }
    }
}

/// Derive a project name from the final `/`-separated segment of a locator.
///
/// `https://github.com/acme/widgets` → `widgets`. An empty final segment
/// (e.g. a trailing slash) yields [`PLACEHOLDER_PROJECT_NAME`].
pub fn default_project_name(repo_url: &str) -> String {
    match repo_url.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment.to_string(),
        _ => PLACEHOLDER_PROJECT_NAME.to_string(),
    }
}

/// `GET /projects` answers either a bare array or a paginated envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProjectListing {
    Page {
        projects: Vec<Project>,
        total: u64,
    },
    Bare(Vec<Project>),
}

impl ProjectListing {
    pub fn into_projects(self) -> Vec<Project> {
        match self {
            ProjectListing::Page { projects, .. } => projects,
            ProjectListing::Bare(projects) => projects,
        }
    }
}

// ── Analysis ─────────────────────────────────────────────────────────

/// Status string the backend reports once an analysis is done.
pub const ANALYSIS_COMPLETED: &str = "completed";

/// Response of `POST /analysis/{id}/analyze`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnalysisTicket {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub analysis_id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Flat analysis record as returned by `GET /analysis/project/{id}`.
///
/// Only `status` is guaranteed; the rest is filled in once the status is
/// [`ANALYSIS_COMPLETED`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalysisStatus {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub project_id: Option<i64>,
    pub status: String,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub security_score: Option<f64>,
    #[serde(default)]
    pub performance_score: Option<f64>,
    #[serde(default)]
    pub code_quality_score: Option<f64>,
    #[serde(default)]
    pub detected_language: Option<String>,
    #[serde(default)]
    pub detected_framework: Option<String>,
    #[serde(default)]
    pub detected_libraries: Option<Vec<String>>,
    #[serde(default)]
    pub total_files_analyzed: Option<u64>,
    #[serde(default)]
    pub total_lines_analyzed: Option<u64>,
    #[serde(default)]
    pub recommendations: Option<serde_json::Value>,
    #[serde(default)]
    pub analysis_details: Option<RawAnalysisDetails>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAnalysisDetails {
    #[serde(default)]
    pub ml_frameworks: Option<Vec<String>>,
    #[serde(default)]
    pub files_by_type: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub issues_by_severity: Option<BTreeMap<String, u64>>,
}

impl AnalysisStatus {
    pub fn is_completed(&self) -> bool {
        self.status == ANALYSIS_COMPLETED
    }

    /// Convert the flat backend record into the immutable result the
    /// dashboard renders. Missing lists become empty, missing scores 0.
    pub fn into_result(self, project_id: i64) -> AnalysisResult {
        let details = self.analysis_details.unwrap_or_default();
        let recommendations = match self.recommendations {
            Some(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    serde_json::Value::Null => None,
                    other => Some(other.to_string()),
                })
                .collect(),
            _ => Vec::new(),
        };
        let breakdown = if details.files_by_type.is_some() || details.issues_by_severity.is_some() {
            Some(AnalysisDetails {
                files_by_type: details.files_by_type.unwrap_or_default(),
                issues_by_severity: details.issues_by_severity.unwrap_or_default(),
            })
        } else {
            None
        };

        AnalysisResult {
            project_id,
            status: self.status,
            metrics: AnalysisMetrics {
                overall_score: to_score(self.overall_score),
                security_score: to_score(self.security_score),
                performance_score: to_score(self.performance_score),
                code_quality_score: to_score(self.code_quality_score),
            },
            detected_stack: DetectedStack {
                language: self.detected_language.unwrap_or_default(),
                framework: self.detected_framework.unwrap_or_default(),
                libraries: self.detected_libraries.unwrap_or_default(),
                ml_frameworks: details.ml_frameworks.unwrap_or_default(),
            },
            total_files: self.total_files_analyzed.unwrap_or(0),
            total_lines: self.total_lines_analyzed.unwrap_or(0),
            recommendations,
            details: breakdown,
        }
    }
}

fn to_score(raw: Option<f64>) -> u8 {
    match raw {
        Some(v) if v.is_finite() => v.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

/// The four 0–100 health scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub overall_score: u8,
    pub security_score: u8,
    pub performance_score: u8,
    pub code_quality_score: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedStack {
    pub language: String,
    pub framework: String,
    pub libraries: Vec<String>,
    #[serde(default)]
    pub ml_frameworks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub files_by_type: BTreeMap<String, u64>,
    pub issues_by_severity: BTreeMap<String, u64>,
}

/// Completed analysis as presented in the review stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub project_id: i64,
    pub status: String,
    pub metrics: AnalysisMetrics,
    pub detected_stack: DetectedStack,
    pub total_files: u64,
    pub total_lines: u64,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub details: Option<AnalysisDetails>,
}

// ── Transformation ───────────────────────────────────────────────────

/// Recognized transformation modes of the maximum endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    #[default]
    Maximum,
    Quick,
    Conservative,
}

impl std::fmt::Display for TransformMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformMode::Maximum => write!(f, "maximum"),
            TransformMode::Quick => write!(f, "quick"),
            TransformMode::Conservative => write!(f, "conservative"),
        }
    }
}

impl std::str::FromStr for TransformMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "maximum" => Ok(TransformMode::Maximum),
            "quick" => Ok(TransformMode::Quick),
            "conservative" => Ok(TransformMode::Conservative),
            _ => anyhow::bail!(
                "Invalid transformation mode '{}'. Valid values: maximum, quick, conservative",
                s
            ),
        }
    }
}

/// Target year the dashboard modernizes toward.
pub const DEFAULT_TARGET_YEAR: u16 = 2028;

/// Body for `POST /transform/{id}/maximum`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaximumTransformRequest {
    pub transformation_mode: TransformMode,
    pub target_year: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_targets: Option<BTreeMap<String, String>>,
    pub apply_changes: bool,
}

impl Default for MaximumTransformRequest {
    fn default() -> Self {
        Self {
            transformation_mode: TransformMode::Maximum,
            target_year: DEFAULT_TARGET_YEAR,
            specific_targets: None,
            apply_changes: true,
        }
    }
}

/// Response of `POST /transform/{id}/maximum`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MaximumTransformResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub transformation_summary: Option<serde_json::Value>,
    #[serde(default)]
    pub estimated_improvements: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub files_transformed: u64,
    #[serde(default)]
    pub preview_available: Option<bool>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// ML framework the ML transform migrates toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MlFrameworkTarget {
    #[default]
    Pytorch,
    Tensorflow,
    ScikitLearn,
}

impl std::str::FromStr for MlFrameworkTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pytorch" => Ok(MlFrameworkTarget::Pytorch),
            "tensorflow" => Ok(MlFrameworkTarget::Tensorflow),
            "scikit-learn" | "sklearn" => Ok(MlFrameworkTarget::ScikitLearn),
            _ => anyhow::bail!(
                "Invalid ML framework '{}'. Valid values: pytorch, tensorflow, scikit-learn",
                s
            ),
        }
    }
}

/// Body for `POST /transform/{id}/ml-transform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MlTransformRequest {
    pub ml_framework_target: MlFrameworkTarget,
    pub enable_optimizations: bool,
    pub enable_quantization: bool,
    pub add_mlflow_tracking: bool,
}

impl Default for MlTransformRequest {
    fn default() -> Self {
        Self {
            ml_framework_target: MlFrameworkTarget::Pytorch,
            enable_optimizations: true,
            enable_quantization: false,
            add_mlflow_tracking: true,
        }
    }
}

/// Response of `GET /transform/{id}/transformation-preview`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransformationPreview {
    pub project_id: i64,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub current_scores: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub detected_tech: Option<serde_json::Value>,
    #[serde(default)]
    pub files_to_transform: Option<u64>,
    #[serde(default)]
    pub estimated_improvements: Option<serde_json::Value>,
}

/// Response of `POST /transform/{id}/transform`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TransformTicket {
    pub project_id: i64,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Outcome of a transformation as presented in the completed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationResult {
    pub project_id: i64,
    pub status: String,
    pub download_url: Option<String>,
    pub files_transformed: u64,
    pub improvements: BTreeMap<String, String>,
}

impl TransformationResult {
    /// Build the completed-view record from a maximum-transform response.
    pub fn from_response(
        project_id: i64,
        response: MaximumTransformResponse,
        download_url: String,
    ) -> Self {
        let improvements = response
            .estimated_improvements
            .into_iter()
            .map(|(key, value)| {
                let display = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, display)
            })
            .collect();
        Self {
            project_id,
            status: "success".to_string(),
            download_url: Some(download_url),
            files_transformed: response.files_transformed,
            improvements,
        }
    }
}

// ── Dashboard ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_projects: u64,
    #[serde(default)]
    pub active_projects: u64,
    #[serde(default)]
    pub completed_projects: u64,
    #[serde(default)]
    pub failed_projects: u64,
    #[serde(default)]
    pub total_analyses: u64,
    #[serde(default)]
    pub total_transformations: u64,
    #[serde(default)]
    pub avg_code_quality: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ActivityItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub project_id: i64,
    pub project_name: String,
    pub message: String,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RecentActivity {
    #[serde(default)]
    pub activities: Vec<ActivityItem>,
    #[serde(default)]
    pub total: u64,
}

// ── Timestamps ───────────────────────────────────────────────────────

/// Parse RFC 3339 timestamps, treating offset-less ones as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

fn lenient_timestamp_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_project_name_from_github_url() {
        assert_eq!(default_project_name("https://github.com/acme/widgets"), "widgets");
    }

    #[test]
    fn test_default_project_name_trailing_slash_uses_placeholder() {
        assert_eq!(default_project_name("https://github.com/acme/"), "Repo");
    }

    #[test]
    fn test_default_project_name_without_slash() {
        assert_eq!(default_project_name("widgets"), "widgets");
    }

    #[test]
    fn test_create_project_body_shape() {
        let body = serde_json::to_value(CreateProject::from_repo_url(
            "https://github.com/acme/widgets",
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({"name": "widgets", "repo_url": "https://github.com/acme/widgets"})
        );
    }

    #[test]
    fn test_project_parses_naive_timestamp_and_unknown_status() {
        let project: Project = serde_json::from_value(json!({
            "id": 3,
            "name": "widgets",
            "repo_url": "https://github.com/acme/widgets",
            "status": "in_progress",
            "created_at": "2025-01-02T03:04:05.123456",
            "updated_at": null
        }))
        .unwrap();
        assert_eq!(project.status, ProjectStatus::Unknown);
        assert_eq!(project.created_at.to_rfc3339(), "2025-01-02T03:04:05.123456+00:00");
        assert!(project.updated_at.is_none());
    }

    #[test]
    fn test_project_listing_accepts_both_shapes() {
        let item = json!({
            "id": 1, "name": "a", "repo_url": "https://x/a",
            "status": "pending", "created_at": "2025-01-01T00:00:00Z"
        });
        let bare: ProjectListing = serde_json::from_value(json!([item.clone()])).unwrap();
        assert_eq!(bare.into_projects().len(), 1);
        let page: ProjectListing =
            serde_json::from_value(json!({"projects": [item], "total": 1, "page": 1})).unwrap();
        assert_eq!(page.into_projects()[0].name, "a");
    }

    #[test]
    fn test_analysis_status_into_result() {
        let raw: AnalysisStatus = serde_json::from_value(json!({
            "status": "completed",
            "overall_score": 72.6,
            "security_score": 80,
            "performance_score": 55.0,
            "code_quality_score": 140.0,
            "detected_language": "Python",
            "detected_framework": "FastAPI",
            "detected_libraries": ["pydantic"],
            "total_files_analyzed": 12,
            "total_lines_analyzed": 3400,
            "recommendations": ["Use async", null, 5],
            "analysis_details": {"ml_frameworks": ["tensorflow"]}
        }))
        .unwrap();
        assert!(raw.is_completed());
        let result = raw.into_result(9);
        assert_eq!(result.project_id, 9);
        assert_eq!(result.metrics.overall_score, 73);
        assert_eq!(result.metrics.security_score, 80);
        assert_eq!(result.metrics.code_quality_score, 100);
        assert_eq!(result.detected_stack.ml_frameworks, vec!["tensorflow"]);
        assert_eq!(result.recommendations, vec!["Use async", "5"]);
        assert_eq!(result.total_lines, 3400);
        assert!(result.details.is_none());
    }

    #[test]
    fn test_analysis_status_missing_fields_default() {
        let raw: AnalysisStatus =
            serde_json::from_value(json!({"status": "completed", "recommendations": "n/a"}))
                .unwrap();
        let result = raw.into_result(1);
        assert!(result.recommendations.is_empty());
        assert!(result.detected_stack.libraries.is_empty());
        assert_eq!(result.metrics, AnalysisMetrics::default());
    }

    #[test]
    fn test_pending_status_not_completed() {
        let raw: AnalysisStatus = serde_json::from_value(json!({"status": "pending"})).unwrap();
        assert!(!raw.is_completed());
    }

    #[test]
    fn test_maximum_request_default_body() {
        let body = serde_json::to_value(MaximumTransformRequest::default()).unwrap();
        assert_eq!(
            body,
            json!({"transformation_mode": "maximum", "target_year": 2028, "apply_changes": true})
        );
    }

    #[test]
    fn test_transform_mode_from_str() {
        assert_eq!("Quick".parse::<TransformMode>().unwrap(), TransformMode::Quick);
        assert!("turbo".parse::<TransformMode>().is_err());
    }

    #[test]
    fn test_ml_request_serializes_framework_kebab_case() {
        let req = MlTransformRequest {
            ml_framework_target: MlFrameworkTarget::ScikitLearn,
            ..Default::default()
        };
        let body = serde_json::to_value(req).unwrap();
        assert_eq!(body["ml_framework_target"], "scikit-learn");
        assert_eq!(body["add_mlflow_tracking"], true);
    }

    #[test]
    fn test_transformation_result_from_response() {
        let response: MaximumTransformResponse = serde_json::from_value(json!({
            "status": "success",
            "files_transformed": 42,
            "estimated_improvements": {"load_time": "-60%", "bundle_kb": 120}
        }))
        .unwrap();
        let result = TransformationResult::from_response(
            7,
            response,
            "http://localhost:8000/api/v1/transform/7/download".to_string(),
        );
        assert_eq!(result.files_transformed, 42);
        assert_eq!(result.improvements["load_time"], "-60%");
        assert_eq!(result.improvements["bundle_kb"], "120");
        assert_eq!(result.status, "success");
    }

    #[test]
    fn test_activity_item_type_field() {
        let item: ActivityItem = serde_json::from_value(json!({
            "id": 1, "type": "project_created", "project_id": 1,
            "project_name": "widgets", "message": "Project 'widgets' created",
            "timestamp": "2025-03-04T05:06:07", "status": "pending"
        }))
        .unwrap();
        assert_eq!(item.kind, "project_created");
    }
}
