use async_trait::async_trait;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::errors::ApiError;
use crate::models::{
    AnalysisStatus, AnalysisTicket, CreateProject, MaximumTransformRequest,
    MaximumTransformResponse, Project,
};

/// The slice of the backend the dashboard workflow talks to.
#[async_trait]
pub trait DashboardBackend: Send + Sync {
    async fn create_project(&self, request: &CreateProject) -> Result<Project, ApiError>;

    async fn trigger_analysis(&self, project_id: i64) -> Result<AnalysisTicket, ApiError>;

    async fn analysis_status(&self, project_id: i64) -> Result<AnalysisStatus, ApiError>;

    async fn maximum_transform(
        &self,
        project_id: i64,
        request: &MaximumTransformRequest,
    ) -> Result<MaximumTransformResponse, ApiError>;

    /// Link to the transformed archive for `project_id`.
    fn download_url(&self, project_id: i64) -> String;
}

#[async_trait]
impl DashboardBackend for ApiClient {
    async fn create_project(&self, request: &CreateProject) -> Result<Project, ApiError> {
        self.projects().create(request).await
    }

    async fn trigger_analysis(&self, project_id: i64) -> Result<AnalysisTicket, ApiError> {
        self.analysis().trigger(project_id).await
    }

    async fn analysis_status(&self, project_id: i64) -> Result<AnalysisStatus, ApiError> {
        self.analysis().for_project(project_id).await
    }

    async fn maximum_transform(
        &self,
        project_id: i64,
        request: &MaximumTransformRequest,
    ) -> Result<MaximumTransformResponse, ApiError> {
        self.transform().maximum(project_id, request).await
    }

    fn download_url(&self, project_id: i64) -> String {
        self.transform().download_url(project_id)
    }
}

#[async_trait]
impl<T: DashboardBackend + ?Sized> DashboardBackend for Arc<T> {
    async fn create_project(&self, request: &CreateProject) -> Result<Project, ApiError> {
        (**self).create_project(request).await
    }

    async fn trigger_analysis(&self, project_id: i64) -> Result<AnalysisTicket, ApiError> {
        (**self).trigger_analysis(project_id).await
    }

    async fn analysis_status(&self, project_id: i64) -> Result<AnalysisStatus, ApiError> {
        (**self).analysis_status(project_id).await
    }

    async fn maximum_transform(
        &self,
        project_id: i64,
        request: &MaximumTransformRequest,
    ) -> Result<MaximumTransformResponse, ApiError> {
        (**self).maximum_transform(project_id, request).await
    }

    fn download_url(&self, project_id: i64) -> String {
        (**self).download_url(project_id)
    }
}
