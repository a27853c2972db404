//! Typed request client for the Futureproof backend.
//!
//! Every call goes through [`ApiClient::send`], which applies the two
//! cross-cutting rules:
//! - a stored token is attached as `Authorization: Bearer <token>`
//! - a 401 clears the stored token and fires the login redirect, and the
//!   call still fails with [`ApiError::Unauthorized`]
//!
//! Endpoints are grouped by resource area:
//!
//! | Group            | Endpoints                                                     |
//! |------------------|---------------------------------------------------------------|
//! | `projects()`     | list, get, create, delete                                     |
//! | `analysis()`     | trigger, by project, by analysis id                           |
//! | `transform()`    | preview, standard, maximum, ml, react-optimize, capabilities, download |
//! | `dashboard()`    | stats, recent activity                                        |

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::auth::TokenStore;
use crate::errors::ApiError;
use crate::models::*;

/// Path prefix every backend route lives under.
pub const API_PREFIX: &str = "/api/v1";

/// Called with the login location after a 401 cleared the token.
pub type RedirectHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    root: String,
    tokens: Arc<dyn TokenStore>,
    login_location: String,
    on_unauthorized: RedirectHook,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("root", &self.root)
            .field("login_location", &self.login_location)
            .finish()
    }
}

impl ApiClient {
    /// Create a client for `base_url` (scheme + host, without `/api/v1`).
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let trimmed = base_url.trim_end_matches('/');
        let parsed =
            reqwest::Url::parse(trimmed).map_err(|_| ApiError::InvalidUrl(base_url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            root: format!("{}{}", trimmed, API_PREFIX),
            tokens,
            login_location: crate::config::DEFAULT_LOGIN_PATH.to_string(),
            on_unauthorized: Arc::new(|location| {
                tracing::warn!(location, "Session expired, redirecting to login");
            }),
        })
    }

    pub fn with_login_location(mut self, location: impl Into<String>) -> Self {
        self.login_location = location.into();
        self
    }

    pub fn with_redirect(mut self, hook: RedirectHook) -> Self {
        self.on_unauthorized = hook;
        self
    }

    /// `http://host:port/api/v1`
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.root, path)
    }

    pub fn login_location(&self) -> &str {
        &self.login_location
    }

    pub fn projects(&self) -> Projects<'_> {
        Projects(self)
    }

    pub fn analysis(&self) -> Analysis<'_> {
        Analysis(self)
    }

    pub fn transform(&self) -> Transform<'_> {
        Transform(self)
    }

    pub fn dashboard(&self) -> Dashboard<'_> {
        Dashboard(self)
    }

    /// Issue a request with the auth and 401 rules applied.
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<reqwest::Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, path, "Sending backend request");
        let response = request.send().await.map_err(|source| ApiError::Transport {
            path: path.to_string(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if let Err(e) = self.tokens.clear() {
                tracing::error!(error = %e, "Failed to clear stored token");
            }
            (self.on_unauthorized)(&self.login_location);
            return Err(ApiError::Unauthorized {
                login_location: self.login_location.clone(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%method, path, status = status.as_u16(), "Backend returned error status");
            return Err(ApiError::Status {
                method: method.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        response.json::<T>().await.map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Self::decode(path, response).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(Method::POST, path, body).await?;
        Self::decode(path, response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }

    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        let bytes = response.bytes().await.map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}

// ── Resource groups ──────────────────────────────────────────────────

pub struct Projects<'a>(&'a ApiClient);

impl Projects<'_> {
    pub async fn list(&self) -> Result<Vec<Project>, ApiError> {
        let listing: ProjectListing = self.0.get_json("/projects").await?;
        Ok(listing.into_projects())
    }

    pub async fn get(&self, id: i64) -> Result<Project, ApiError> {
        self.0.get_json(&format!("/projects/{}", id)).await
    }

    pub async fn create(&self, body: &CreateProject) -> Result<Project, ApiError> {
        self.0.post_json("/projects/", Some(body)).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.0.delete(&format!("/projects/{}", id)).await
    }
}

pub struct Analysis<'a>(&'a ApiClient);

impl Analysis<'_> {
    pub async fn trigger(&self, project_id: i64) -> Result<AnalysisTicket, ApiError> {
        self.0
            .post_json::<(), _>(&format!("/analysis/{}/analyze", project_id), None)
            .await
    }

    /// Latest analysis for a project; this is what the dashboard polls.
    pub async fn for_project(&self, project_id: i64) -> Result<AnalysisStatus, ApiError> {
        self.0
            .get_json(&format!("/analysis/project/{}", project_id))
            .await
    }

    pub async fn get(&self, analysis_id: i64) -> Result<AnalysisStatus, ApiError> {
        self.0.get_json(&format!("/analysis/{}", analysis_id)).await
    }
}

pub struct Transform<'a>(&'a ApiClient);

impl Transform<'_> {
    pub async fn preview(&self, project_id: i64) -> Result<TransformationPreview, ApiError> {
        self.0
            .get_json(&format!("/transform/{}/transformation-preview", project_id))
            .await
    }

    pub async fn standard(&self, project_id: i64) -> Result<TransformTicket, ApiError> {
        self.0
            .post_json::<(), _>(&format!("/transform/{}/transform", project_id), None)
            .await
    }

    pub async fn maximum(
        &self,
        project_id: i64,
        request: &MaximumTransformRequest,
    ) -> Result<MaximumTransformResponse, ApiError> {
        self.0
            .post_json(&format!("/transform/{}/maximum", project_id), Some(request))
            .await
    }

    pub async fn ml(
        &self,
        project_id: i64,
        request: &MlTransformRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.0
            .post_json(&format!("/transform/{}/ml-transform", project_id), Some(request))
            .await
    }

    pub async fn react_optimize(
        &self,
        project_id: i64,
        options: &serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        self.0
            .post_json(&format!("/transform/{}/react-optimize", project_id), Some(options))
            .await
    }

    pub async fn capabilities(&self) -> Result<serde_json::Value, ApiError> {
        self.0.get_json("/transform/capabilities").await
    }

    pub fn download_path(project_id: i64) -> String {
        format!("/transform/{}/download", project_id)
    }

    /// Absolute link to the transformed archive.
    pub fn download_url(&self, project_id: i64) -> String {
        self.0.url(&Self::download_path(project_id))
    }

    pub async fn download(&self, project_id: i64) -> Result<Vec<u8>, ApiError> {
        self.0.get_bytes(&Self::download_path(project_id)).await
    }
}

pub struct Dashboard<'a>(&'a ApiClient);

impl Dashboard<'_> {
    pub async fn stats(&self) -> Result<DashboardStats, ApiError> {
        self.0.get_json("/dashboard/stats").await
    }

    pub async fn recent(&self) -> Result<RecentActivity, ApiError> {
        self.0.get_json("/dashboard/activity").await
    }
}
