//! Drives one dashboard session from repository submission to download.
//!
//! ```text
//! idle ──start──▶ creating ──created──▶ analyzing ──"completed" poll──▶ review
//!   ▲                │                     │                              │
//!   └──── creation failure ◀───────────────┘                          transform
//!                                                                         ▼
//!                                   completed ◀──response── transforming
//! ```
//!
//! Every transition appends a timestamped line to the session log and is
//! broadcast as a [`WorkflowEvent`]. All timers and in-flight requests are tied
//! to the workflow's cancellation token, which is cancelled on drop.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::backend::DashboardBackend;
use super::log::{LogEntry, WorkflowLog};
use super::stage::Stage;
use crate::errors::{ApiError, WorkflowError};
use crate::models::{
    AnalysisResult, CreateProject, MaximumTransformRequest, Project, TransformationResult,
};
use crate::retry::RetryPolicy;

/// Tunables for a workflow session.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub poll: RetryPolicy,
    pub transform: MaximumTransformRequest,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            poll: RetryPolicy::poll_default(),
            transform: MaximumTransformRequest::default(),
        }
    }
}

/// Observable change in a workflow session.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    StageChanged { from: Stage, to: Stage },
    Logged(LogEntry),
}

/// Point-in-time copy of the session state.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSnapshot {
    pub stage: Stage,
    pub project: Option<Project>,
    pub analysis: Option<AnalysisResult>,
    pub transformation: Option<TransformationResult>,
    pub log: WorkflowLog,
}

#[derive(Debug, Default)]
struct WorkflowState {
    stage: Stage,
    project: Option<Project>,
    analysis: Option<AnalysisResult>,
    transformation: Option<TransformationResult>,
    log: WorkflowLog,
}

pub struct Workflow<B: DashboardBackend> {
    backend: B,
    options: WorkflowOptions,
    state: Mutex<WorkflowState>,
    events: broadcast::Sender<WorkflowEvent>,
    cancel: CancellationToken,
}

impl<B: DashboardBackend> Workflow<B> {
    pub fn new(backend: B, options: WorkflowOptions) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            backend,
            options,
            state: Mutex::new(WorkflowState::default()),
            events,
            cancel: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn stage(&self) -> Stage {
        self.lock().stage
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = self.lock();
        WorkflowSnapshot {
            stage: state.stage,
            project: state.project.clone(),
            analysis: state.analysis.clone(),
            transformation: state.transformation.clone(),
            log: state.log.clone(),
        }
    }

    /// Stop all background work. Pending polls and requests resolve to
    /// [`WorkflowError::Cancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Submit a repository: create the project, trigger analysis and poll
    /// until the analysis completes. Ends in [`Stage::Review`].
    pub async fn start(&self, repo_url: &str) -> Result<AnalysisResult, WorkflowError> {
        let repo_url = repo_url.trim();
        if repo_url.is_empty() {
            return Err(WorkflowError::EmptyRepoUrl);
        }

        {
            let mut state = self.lock();
            if state.stage != Stage::Idle {
                return Err(WorkflowError::InvalidStage {
                    operation: "start",
                    stage: state.stage,
                });
            }
            self.advance(&mut state, Stage::Creating);
            self.log(&mut state, format!("Connecting to repository: {}", repo_url));
        }

        let request = CreateProject::from_repo_url(repo_url);
        let project = match self.guarded(self.backend.create_project(&request)).await {
            Ok(project) => project,
            Err(e) => return Err(self.fail_creation(e)),
        };

        {
            let mut state = self.lock();
            self.log(
                &mut state,
                format!("Project created: {} (ID: {})", project.name, project.id),
            );
            state.project = Some(project.clone());
            self.advance(&mut state, Stage::Analyzing);
            self.log(&mut state, "Starting AI Code Analysis...");
        }

        if let Err(e) = self.guarded(self.backend.trigger_analysis(project.id)).await {
            return Err(self.fail_creation(e));
        }

        let analysis = self.poll_analysis(project.id).await?;

        {
            let mut state = self.lock();
            state.analysis = Some(analysis.clone());
            self.advance(&mut state, Stage::Review);
            self.log(&mut state, "Analysis complete. Waiting for user action.");
        }

        Ok(analysis)
    }

    /// Run the transformation for the reviewed project. Ends in
    /// [`Stage::Completed`]; on failure the stage is held at
    /// [`Stage::Transforming`].
    pub async fn transform(&self) -> Result<TransformationResult, WorkflowError> {
        let project = {
            let mut state = self.lock();
            if state.stage != Stage::Review {
                return Err(WorkflowError::InvalidStage {
                    operation: "transform",
                    stage: state.stage,
                });
            }
            let project = state.project.clone().ok_or(WorkflowError::NoProject)?;
            self.advance(&mut state, Stage::Transforming);
            self.log(
                &mut state,
                format!(
                    "Initiating {} transformation (target year {})...",
                    self.options.transform.transformation_mode, self.options.transform.target_year
                ),
            );
            project
        };

        let response = self
            .guarded(
                self.backend
                    .maximum_transform(project.id, &self.options.transform),
            )
            .await;

        let mut state = self.lock();
        match response {
            Ok(response) => {
                let result = TransformationResult::from_response(
                    project.id,
                    response,
                    self.backend.download_url(project.id),
                );
                state.transformation = Some(result.clone());
                self.advance(&mut state, Stage::Completed);
                self.log(&mut state, "Transformation complete. Ready for download.");
                Ok(result)
            }
            Err(e) => {
                tracing::error!(project_id = project.id, error = %e, "Transformation request failed");
                self.log(&mut state, format!("Transformation failed: {}", e));
                Err(e)
            }
        }
    }

    async fn poll_analysis(&self, project_id: i64) -> Result<AnalysisResult, WorkflowError> {
        let policy = &self.options.poll;
        let mut attempts = 0u32;

        loop {
            if !policy.allows(attempts) {
                let mut state = self.lock();
                self.log(
                    &mut state,
                    format!("Error: analysis did not complete after {} polls.", attempts),
                );
                return Err(WorkflowError::PollExhausted { attempts });
            }
            attempts += 1;

            let delay = policy.delay(attempts);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(WorkflowError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            match self.guarded(self.backend.analysis_status(project_id)).await {
                Ok(status) if status.is_completed() => {
                    tracing::debug!(project_id, attempts, "Analysis completed");
                    return Ok(status.into_result(project_id));
                }
                Ok(status) => {
                    tracing::debug!(project_id, status = %status.status, "Analysis not complete yet");
                }
                Err(e @ WorkflowError::Api(ApiError::Unauthorized { .. })) => {
                    let mut state = self.lock();
                    self.log(&mut state, format!("Error: {}", e));
                    return Err(e);
                }
                Err(WorkflowError::Api(e)) if e.status().is_some() => {
                    tracing::debug!(project_id, error = %e, "Analysis not available yet");
                }
                Err(WorkflowError::Cancelled) => return Err(WorkflowError::Cancelled),
                Err(e) => {
                    tracing::warn!(project_id, attempts, error = %e, "Analysis poll failed");
                }
            }
        }
    }

    /// Run a backend call, resolving to `Cancelled` if the token fires first.
    async fn guarded<T>(
        &self,
        call: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, WorkflowError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(WorkflowError::Cancelled),
            result = call => result.map_err(WorkflowError::from),
        }
    }

    fn fail_creation(&self, error: WorkflowError) -> WorkflowError {
        if matches!(error, WorkflowError::Cancelled) {
            return error;
        }
        tracing::error!(error = %error, "Failed to create project");
        let mut state = self.lock();
        self.log(
            &mut state,
            format!("Error: Failed to connect to backend service. ({})", error),
        );
        self.advance(&mut state, Stage::Idle);
        error
    }

    fn advance(&self, state: &mut WorkflowState, to: Stage) {
        let from = state.stage;
        debug_assert!(
            from.can_transition_to(to),
            "illegal workflow transition {} -> {}",
            from,
            to
        );
        state.stage = to;
        tracing::debug!(%from, %to, "Workflow stage changed");
        let _ = self.events.send(WorkflowEvent::StageChanged { from, to });
    }

    fn log(&self, state: &mut WorkflowState, message: impl Into<String>) {
        let entry = state.log.push(message);
        tracing::debug!(target: "futureproof::workflow", "{}", entry.message);
        let _ = self.events.send(WorkflowEvent::Logged(entry));
    }

    fn lock(&self) -> MutexGuard<'_, WorkflowState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<B: DashboardBackend> Drop for Workflow<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AnalysisStatus, AnalysisTicket, MaximumTransformResponse, ProjectStatus,
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Default)]
    struct MockBackend {
        fail_create: bool,
        fail_trigger: bool,
        fail_transform: bool,
        /// Number of "pending" answers before "completed"; `None` never completes.
        polls_until_complete: Option<usize>,
        /// Answer the first N polls with 404 instead of a status.
        not_found_polls: usize,
        /// Answer every poll with 401.
        unauthorized_polls: bool,
        created: Mutex<Vec<CreateProject>>,
        poll_calls: AtomicUsize,
        poll_times: Mutex<Vec<Instant>>,
        transform_calls: AtomicUsize,
    }

    fn status_error(status: u16) -> ApiError {
        ApiError::Status {
            method: "GET".into(),
            path: "/x".into(),
            status,
            body: String::new(),
        }
    }

    #[async_trait]
    impl DashboardBackend for MockBackend {
        async fn create_project(&self, request: &CreateProject) -> Result<Project, ApiError> {
            self.created.lock().unwrap().push(request.clone());
            if self.fail_create {
                return Err(status_error(500));
            }
            Ok(Project {
                id: 7,
                name: request.name.clone(),
                repo_url: request.repo_url.clone(),
                status: ProjectStatus::Pending,
                created_at: Utc::now(),
                description: None,
                language: None,
                framework: None,
                updated_at: None,
            })
        }

        async fn trigger_analysis(&self, project_id: i64) -> Result<AnalysisTicket, ApiError> {
            if self.fail_trigger {
                return Err(status_error(404));
            }
            Ok(AnalysisTicket {
                message: None,
                analysis_id: Some(1),
                project_id: Some(project_id),
                status: Some("pending".into()),
            })
        }

        async fn analysis_status(&self, _project_id: i64) -> Result<AnalysisStatus, ApiError> {
            let call = self.poll_calls.fetch_add(1, Ordering::SeqCst);
            self.poll_times.lock().unwrap().push(Instant::now());
            if self.unauthorized_polls {
                return Err(ApiError::Unauthorized {
                    login_location: "http://localhost:3000/login".into(),
                });
            }
            if call < self.not_found_polls {
                return Err(status_error(404));
            }
            let done = matches!(self.polls_until_complete, Some(n) if call >= n);
            Ok(AnalysisStatus {
                status: if done { "completed" } else { "in_progress" }.to_string(),
                overall_score: Some(81.0),
                detected_language: Some("Python".into()),
                ..Default::default()
            })
        }

        async fn maximum_transform(
            &self,
            _project_id: i64,
            request: &MaximumTransformRequest,
        ) -> Result<MaximumTransformResponse, ApiError> {
            self.transform_calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request, &MaximumTransformRequest::default());
            if self.fail_transform {
                return Err(status_error(500));
            }
            Ok(MaximumTransformResponse {
                files_transformed: 42,
                estimated_improvements: BTreeMap::from([(
                    "load_time".to_string(),
                    serde_json::json!("-60%"),
                )]),
                ..Default::default()
            })
        }

        fn download_url(&self, project_id: i64) -> String {
            format!("http://backend/api/v1/transform/{}/download", project_id)
        }
    }

    fn workflow(mock: MockBackend) -> (Arc<MockBackend>, Workflow<Arc<MockBackend>>) {
        let mock = Arc::new(mock);
        let wf = Workflow::new(mock.clone(), WorkflowOptions::default());
        (mock, wf)
    }

    fn error_entries(wf: &Workflow<Arc<MockBackend>>) -> usize {
        wf.snapshot()
            .log
            .messages()
            .filter(|m| m.contains("Error") || m.contains("failed"))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_repo_url_is_rejected_without_side_effects() {
        let (mock, wf) = workflow(MockBackend::default());
        let err = wf.start("   ").await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyRepoUrl));
        assert_eq!(wf.stage(), Stage::Idle);
        assert!(wf.snapshot().log.is_empty());
        assert!(mock.created.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_reaches_review_after_completed_poll() {
        let (mock, wf) = workflow(MockBackend {
            polls_until_complete: Some(3),
            ..Default::default()
        });
        let mut events = wf.subscribe();

        let analysis = wf.start("https://github.com/acme/widgets").await.unwrap();

        assert_eq!(analysis.project_id, 7);
        assert_eq!(analysis.metrics.overall_score, 81);
        assert_eq!(wf.stage(), Stage::Review);
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 4);
        assert_eq!(mock.created.lock().unwrap()[0].name, "widgets");

        let mut stages = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let WorkflowEvent::StageChanged { to, .. } = event {
                stages.push(to);
            }
        }
        assert_eq!(stages, vec![Stage::Creating, Stage::Analyzing, Stage::Review]);

        let snapshot = wf.snapshot();
        let messages: Vec<_> = snapshot.log.messages().collect();
        assert_eq!(
            messages,
            vec![
                "Connecting to repository: https://github.com/acme/widgets",
                "Project created: widgets (ID: 7)",
                "Starting AI Code Analysis...",
                "Analysis complete. Waiting for user action.",
            ]
        );
        assert_eq!(snapshot.analysis, Some(analysis));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_are_spaced_by_interval() {
        let (mock, wf) = workflow(MockBackend {
            polls_until_complete: Some(2),
            ..Default::default()
        });
        let started = Instant::now();
        wf.start("https://github.com/acme/widgets").await.unwrap();

        let times = mock.poll_times.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        assert!(times[0] - started >= Duration::from_millis(2000));
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(2000));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_once_review_is_reached() {
        let (mock, wf) = workflow(MockBackend {
            polls_until_complete: Some(0),
            ..Default::default()
        });
        wf.start("https://github.com/acme/widgets").await.unwrap();
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 1);
        assert_eq!(wf.stage(), Stage::Review);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_polls_are_treated_as_not_ready() {
        let (mock, wf) = workflow(MockBackend {
            not_found_polls: 2,
            polls_until_complete: Some(2),
            ..Default::default()
        });
        wf.start("https://github.com/acme/widgets").await.unwrap();
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 3);
        assert_eq!(error_entries(&wf), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_poll_stops_immediately() {
        let (mock, wf) = workflow(MockBackend {
            unauthorized_polls: true,
            ..Default::default()
        });
        let err = wf.start("https://github.com/acme/widgets").await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Api(ApiError::Unauthorized { .. })
        ));
        assert_eq!(wf.stage(), Stage::Analyzing);
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 1);
        assert_eq!(error_entries(&wf), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 1);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_log_not_echoed_by_default_filter() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(crate::logging::build_filter(None, false))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (_mock, wf) = workflow(MockBackend {
            polls_until_complete: Some(0),
            ..Default::default()
        });
        wf.start("https://github.com/acme/widgets").await.unwrap();
        tracing::warn!("after start");

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("after start"), "{}", output);
        assert!(!output.contains("Project created"), "{}", output);
        assert!(!output.contains("Analysis completed"), "{}", output);
        assert_eq!(wf.snapshot().log.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_failure_reverts_to_idle_with_one_error_entry() {
        let (mock, wf) = workflow(MockBackend {
            fail_create: true,
            ..Default::default()
        });
        let err = wf.start("https://github.com/acme/widgets").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Api(_)));
        assert_eq!(wf.stage(), Stage::Idle);
        assert_eq!(error_entries(&wf), 1);
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_failure_reverts_to_idle() {
        let (mock, wf) = workflow(MockBackend {
            fail_trigger: true,
            ..Default::default()
        });
        assert!(wf.start("https://github.com/acme/widgets").await.is_err());
        assert_eq!(wf.stage(), Stage::Idle);
        assert_eq!(error_entries(&wf), 1);
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 0);

        // idle again, so a retry is accepted
        assert!(wf.start("https://github.com/acme/widgets").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let (_mock, wf) = workflow(MockBackend {
            polls_until_complete: Some(0),
            ..Default::default()
        });
        wf.start("https://github.com/acme/widgets").await.unwrap();
        let err = wf.start("https://github.com/acme/other").await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidStage {
                stage: Stage::Review,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_exhaustion_holds_analyzing() {
        let mock = Arc::new(MockBackend::default());
        let wf = Workflow::new(
            mock.clone(),
            WorkflowOptions {
                poll: RetryPolicy::poll_default().with_max_attempts(3),
                ..Default::default()
            },
        );
        let err = wf.start("https://github.com/acme/widgets").await.unwrap_err();
        assert!(matches!(err, WorkflowError::PollExhausted { attempts: 3 }));
        assert_eq!(wf.stage(), Stage::Analyzing);
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 3);
        assert_eq!(error_entries(&wf), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_polling() {
        let mock = Arc::new(MockBackend::default());
        let wf = Arc::new(Workflow::new(mock.clone(), WorkflowOptions::default()));

        let runner = {
            let wf = wf.clone();
            tokio::spawn(async move { wf.start("https://github.com/acme/widgets").await })
        };

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 2);
        wf.cancel();

        let result = runner.await.unwrap();
        assert!(matches!(result, Err(WorkflowError::Cancelled)));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(mock.poll_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transform_completes_with_download_reference() {
        let (mock, wf) = workflow(MockBackend {
            polls_until_complete: Some(0),
            ..Default::default()
        });
        wf.start("https://github.com/acme/widgets").await.unwrap();

        let result = wf.transform().await.unwrap();
        assert_eq!(wf.stage(), Stage::Completed);
        assert_eq!(result.files_transformed, 42);
        assert_eq!(result.improvements["load_time"], "-60%");
        assert_eq!(
            result.download_url.as_deref(),
            Some("http://backend/api/v1/transform/7/download")
        );
        assert_eq!(mock.transform_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            wf.snapshot().log.messages().last(),
            Some("Transformation complete. Ready for download.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transform_failure_holds_stage() {
        let (mock, wf) = workflow(MockBackend {
            polls_until_complete: Some(0),
            fail_transform: true,
            ..Default::default()
        });
        wf.start("https://github.com/acme/widgets").await.unwrap();

        assert!(wf.transform().await.is_err());
        assert_eq!(wf.stage(), Stage::Transforming);
        assert!(wf.snapshot().transformation.is_none());
        assert_eq!(error_entries(&wf), 1);

        let err = wf.transform().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidStage {
                stage: Stage::Transforming,
                ..
            }
        ));
        assert_eq!(mock.transform_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transform_requires_review() {
        let (mock, wf) = workflow(MockBackend::default());
        let err = wf.transform().await.unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidStage {
                stage: Stage::Idle,
                ..
            }
        ));
        assert_eq!(mock.transform_calls.load(Ordering::SeqCst), 0);
        assert!(wf.snapshot().log.is_empty());
    }
}
