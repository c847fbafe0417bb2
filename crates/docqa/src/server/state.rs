//! Application state for the document Q&A server

use parking_lot::RwLock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{SessionStore, SessionView};
use crate::chat::ChatHistoryStore;
use crate::config::{extension_of, AppConfig};
use crate::error::{AuthError, Error, QueryError, Result, ValidationError};
use crate::processing::{
    DemoIngestor, DemoStatus, IngestionJob, IngestionPipeline, TaskCounts, TaskTracker,
};
use crate::providers::Providers;
use crate::retrieval::QueryEngine;
use crate::storage::DocumentRegistry;
use crate::types::{
    ChatTurn, ConversationSummary, DocumentSummary, QueryAnswer, QueryRequest, TaskView,
};

/// Conversation used when a query names none
const DEFAULT_CONVERSATION: &str = "default";

/// Status of a task id or demo key
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum StatusLookup {
    Task(TaskView),
    Demo(DemoStatus),
}

/// Service overview for administrators
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub documents_processed: usize,
    pub active_sessions: usize,
    pub tasks: TaskCounts,
    pub answerer: String,
    pub answerer_healthy: bool,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Login sessions and their scratch directories
    sessions: SessionStore,
    /// Status of every ingestion task
    tracker: TaskTracker,
    /// Completed documents
    registry: DocumentRegistry,
    /// Shared by uploads and demos
    pipeline: IngestionPipeline,
    demo: DemoIngestor,
    engine: QueryEngine,
    history: ChatHistoryStore,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create new application state with the default collaborators
    pub fn new(config: AppConfig) -> Result<Self> {
        let providers = Providers::from_config(&config)?;
        Ok(Self::with_providers(config, providers))
    }

    /// Create application state around the given collaborators
    pub fn with_providers(config: AppConfig, providers: Providers) -> Self {
        tracing::info!(
            "Initializing document Q&A state (extractor: {}, indexer: {}, answerer: {})",
            providers.extractor.name(),
            providers.indexer.name(),
            providers.answerer.name()
        );

        let tracker = TaskTracker::new();
        let registry = DocumentRegistry::new();
        let pipeline = IngestionPipeline::new(
            tracker.clone(),
            registry.clone(),
            providers.extractor,
            providers.indexer,
        );
        let demo = DemoIngestor::new(pipeline.clone(), tracker.clone(), config.demo.files.clone());
        let engine = QueryEngine::new(
            registry.clone(),
            tracker.clone(),
            providers.answerer,
            config.query.clone(),
        );
        let sessions = SessionStore::new(&config.auth, config.ingestion.scratch_prefix.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                tracker,
                registry,
                pipeline,
                demo,
                engine,
                history: ChatHistoryStore::new(),
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.inner.tracker
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.inner.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.inner.sessions
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }

    pub fn login(&self, username: &str, password: &str) -> Result<SessionView> {
        self.inner.sessions.login(username, password)
    }

    pub fn logout(&self, token: &str) -> bool {
        self.inner.sessions.logout(token)
    }

    /// Session for a bearer token
    pub fn session(&self, token: &str) -> Result<SessionView> {
        self.inner.sessions.resolve(token)
    }

    /// Reject an upload before any task exists
    pub fn validate_upload(&self, filename: Option<&str>, size: u64) -> Result<String> {
        let filename = filename
            .map(base_name)
            .filter(|name| !name.is_empty())
            .ok_or(ValidationError::MissingFile)?;

        if !self.inner.config.ingestion.accepts(&filename) {
            let ext = extension_of(&filename).unwrap_or_default();
            return Err(ValidationError::UnsupportedExtension(format!(
                ".{} (allowed: {})",
                ext,
                self.inner.config.ingestion.allowed_extensions.join(", ")
            ))
            .into());
        }

        let max = self.inner.config.server.max_upload_size;
        if size > max {
            return Err(ValidationError::FileTooLarge { size, max }.into());
        }

        Ok(filename)
    }

    /// Save an upload into the session's scratch directory and start ingesting it
    pub async fn submit_upload(
        &self,
        session: &SessionView,
        filename: Option<&str>,
        data: &[u8],
    ) -> Result<TaskView> {
        let filename = self.validate_upload(filename, data.len() as u64)?;

        let task_id = Uuid::new_v4();
        let source_path = session.scratch_dir.join(format!("{}_{}", task_id, filename));
        tokio::fs::write(&source_path, data).await?;

        let view = self
            .inner
            .tracker
            .create(task_id, filename.clone(), source_path.clone())?;

        tracing::info!(
            "User {} uploaded {} ({} bytes) as task {}",
            session.username,
            filename,
            data.len(),
            task_id
        );

        self.inner.pipeline.spawn(IngestionJob {
            task_id,
            source_path,
            filename,
        });

        Ok(view)
    }

    /// Status for a task id, or for a demo key
    pub fn task_status(&self, id: &str) -> Result<StatusLookup> {
        match Uuid::parse_str(id) {
            Ok(task_id) => self.inner.tracker.get(task_id).map(StatusLookup::Task),
            Err(_) => self.inner.demo.status(id).map(StatusLookup::Demo),
        }
    }

    pub fn list_documents(&self) -> Vec<DocumentSummary> {
        self.inner.registry.list()
    }

    /// Make a document the session's default for queries
    pub fn set_active_document(&self, session: &SessionView, document_id: Uuid) -> Result<()> {
        if !self.inner.registry.contains(document_id) {
            return Err(self.missing_document(document_id));
        }
        self.inner.sessions.set_active(&session.token, document_id)?;
        tracing::info!("User {} set active document {}", session.username, document_id);
        Ok(())
    }

    /// Remove a document from the registry (admin only)
    pub fn delete_document(&self, session: &SessionView, document_id: Uuid) -> Result<()> {
        require_admin(session)?;

        let removed = self
            .inner
            .registry
            .remove(document_id)
            .ok_or_else(|| Error::not_found(format!("Document {}", document_id)))?;
        let cleared = self.inner.sessions.clear_active_for(document_id);

        tracing::info!(
            "Admin {} deleted document {} ({}), cleared {} active pointers",
            session.username,
            document_id,
            removed.filename,
            cleared
        );
        Ok(())
    }

    pub fn start_demo(&self, key: &str) -> Result<DemoStatus> {
        self.inner.demo.start(key)
    }

    /// Answer a question and record the exchange in the user's history.
    ///
    /// Failed queries leave the history untouched.
    pub async fn query(&self, session: &SessionView, request: QueryRequest) -> Result<QueryAnswer> {
        let document_id = request.document_id.or_else(|| {
            session
                .active_document
                .filter(|id| self.inner.registry.contains(*id))
        });

        let answer = self.inner.engine.answer(document_id, &request.query).await?;

        let conversation = match request.session_id.trim() {
            "" => DEFAULT_CONVERSATION,
            id => id,
        };
        self.inner.history.append_exchange(
            &session.username,
            conversation,
            ChatTurn::user(request.query.trim()),
            ChatTurn::assistant(answer.answer.clone(), answer.confidence, answer.sources_used),
        );

        tracing::info!(
            "Answered query for {} from {} ({} chunks, confidence {:.2})",
            session.username,
            answer.document_id,
            answer.chunks_retrieved,
            answer.confidence
        );
        Ok(answer)
    }

    pub fn chat_history(&self, session: &SessionView, conversation_id: &str) -> Vec<ChatTurn> {
        self.inner.history.list(&session.username, conversation_id)
    }

    pub fn chat_sessions(&self, session: &SessionView) -> Vec<ConversationSummary> {
        self.inner.history.summarize(&session.username)
    }

    pub fn clear_chat(&self, session: &SessionView, conversation_id: &str) -> bool {
        self.inner.history.clear(&session.username, conversation_id)
    }

    pub fn clear_all_chats(&self, session: &SessionView) -> usize {
        self.inner.history.clear_all(&session.username)
    }

    /// Service overview (admin only)
    pub async fn system_status(&self, session: &SessionView) -> Result<SystemStatus> {
        require_admin(session)?;

        let answerer_healthy = self.inner.engine.answerer_healthy().await;
        let status = if self.is_ready() && answerer_healthy {
            "healthy"
        } else {
            "degraded"
        };

        Ok(SystemStatus {
            status,
            documents_processed: self.inner.registry.len(),
            active_sessions: self.inner.sessions.len(),
            tasks: self.inner.tracker.counts(),
            answerer: self.inner.engine.answerer_name().to_string(),
            answerer_healthy,
            timestamp: chrono::Utc::now(),
        })
    }

    /// Stop accepting work and release every session's scratch directory
    pub fn shutdown(&self) {
        self.set_ready(false);
        self.inner.sessions.clear_all();
    }

    fn missing_document(&self, document_id: Uuid) -> Error {
        match self.inner.tracker.state(document_id) {
            Some(state) if !state.is_terminal() => QueryError::DocumentNotReady(document_id).into(),
            _ => Error::not_found(format!("Document {}", document_id)),
        }
    }
}

fn require_admin(session: &SessionView) -> Result<()> {
    if session.is_admin {
        Ok(())
    } else {
        Err(AuthError::Forbidden.into())
    }
}

/// Final path component, so client-supplied names cannot escape the scratch dir
fn base_name(filename: &str) -> String {
    let trimmed = filename.trim();
    let last = trimmed.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(trimmed);
    Path::new(last)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::pipeline::tests::{Behavior, MockExtractor};
    use crate::processing::tests::wait_for_terminal;
    use crate::providers::Answerer;
    use crate::retrieval::engine::tests::CountingAnswerer;
    use crate::retrieval::ChunkIndexer;
    use crate::types::{ChatRole, TaskState};
    use std::sync::atomic::Ordering;

    fn state_with(behavior: Behavior) -> (AppState, Arc<MockExtractor>, Arc<CountingAnswerer>) {
        let extractor = Arc::new(MockExtractor::new(behavior));
        let answerer = Arc::new(CountingAnswerer::default());
        let providers = Providers {
            extractor: extractor.clone(),
            indexer: Arc::new(ChunkIndexer::new(60, 10, 5)),
            answerer: answerer.clone() as Arc<dyn Answerer>,
        };
        (
            AppState::with_providers(AppConfig::default(), providers),
            extractor,
            answerer,
        )
    }

    #[test]
    fn test_validation_rejects_before_task_creation() {
        let (state, _, _) = state_with(Behavior::Succeed);

        let err = state.validate_upload(Some("setup.exe"), 10).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::UnsupportedExtension(_))));

        let err = state
            .validate_upload(Some("big.pdf"), 250 * 1024 * 1024)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::FileTooLarge { .. })));

        let err = state.validate_upload(None, 10).unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingFile)));

        assert!(state.tracker().is_empty());
    }

    #[test]
    fn test_upload_names_are_reduced_to_base_name() {
        assert_eq!(base_name("../../etc/passwd.txt"), "passwd.txt");
        assert_eq!(base_name("C:\\Users\\me\\report.pdf"), "report.pdf");
        assert_eq!(base_name("  notes.txt "), "notes.txt");
        assert_eq!(base_name("dir/"), "");
    }

    #[tokio::test]
    async fn test_upload_then_query_records_history() {
        let (state, extractor, answerer) = state_with(Behavior::Succeed);
        let session = state.login("user", "password").unwrap();

        let view = state
            .submit_upload(&session, Some("rivers.txt"), b"Rivers flow to the sea.")
            .await
            .unwrap();
        assert_eq!(view.state, TaskState::Queued);
        assert!(session
            .scratch_dir
            .join(format!("{}_rivers.txt", view.task_id))
            .is_file());

        let done = wait_for_terminal(state.tracker(), view.task_id).await;
        assert_eq!(done.state, TaskState::Completed);
        assert_eq!(extractor.releases.load(Ordering::SeqCst), 1);

        let answer = state
            .query(
                &session,
                QueryRequest {
                    query: "Where do rivers flow?".to_string(),
                    session_id: "c1".to_string(),
                    document_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(answer.document_id, view.task_id);
        assert!(answer.chunks_retrieved > 0);
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 1);

        let turns = state.chat_history(&session, "c1");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[1].content, answer.answer);
    }

    #[tokio::test]
    async fn test_query_without_documents_records_nothing() {
        let (state, _, answerer) = state_with(Behavior::Succeed);
        let session = state.login("user", "password").unwrap();

        let err = state
            .query(
                &session,
                QueryRequest {
                    query: "Anything?".to_string(),
                    session_id: "c1".to_string(),
                    document_id: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Query(QueryError::NoDocuments)));
        assert!(state.chat_history(&session, "c1").is_empty());
        assert!(state.chat_sessions(&session).is_empty());
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_active_document_and_admin_delete() {
        let (state, _, _) = state_with(Behavior::Succeed);
        let user = state.login("user", "password").unwrap();
        let admin = state.login("admin", "admin").unwrap();

        let first = state
            .submit_upload(&user, Some("a.txt"), b"alpha")
            .await
            .unwrap();
        wait_for_terminal(state.tracker(), first.task_id).await;
        let second = state
            .submit_upload(&user, Some("b.txt"), b"beta")
            .await
            .unwrap();
        wait_for_terminal(state.tracker(), second.task_id).await;

        state.set_active_document(&user, second.task_id).unwrap();
        let user = state.session(&user.token).unwrap();
        assert_eq!(user.active_document, Some(second.task_id));

        let request = QueryRequest {
            query: "What about rivers?".to_string(),
            session_id: "c1".to_string(),
            document_id: None,
        };
        let answer = state.query(&user, request.clone()).await.unwrap();
        assert_eq!(answer.document_id, second.task_id);

        let err = state.delete_document(&user, second.task_id).unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::Forbidden)));

        state.delete_document(&admin, second.task_id).unwrap();
        let user = state.session(&user.token).unwrap();
        assert_eq!(user.active_document, None);
        assert_eq!(
            state.tracker().get(second.task_id).unwrap().state,
            TaskState::Completed
        );

        let answer = state.query(&user, request).await.unwrap();
        assert_eq!(answer.document_id, first.task_id);
    }

    #[tokio::test]
    async fn test_status_lookup_by_task_or_demo_key() {
        let (state, _, _) = state_with(Behavior::Succeed);
        let session = state.login("user", "password").unwrap();
        let view = state
            .submit_upload(&session, Some("a.txt"), b"alpha")
            .await
            .unwrap();

        match state.task_status(&view.task_id.to_string()).unwrap() {
            StatusLookup::Task(task) => assert_eq!(task.task_id, view.task_id),
            other => panic!("expected task status, got {:?}", other),
        }
        assert!(matches!(state.task_status("not-a-demo"), Err(Error::NotFound(_))));
        assert!(matches!(
            state.task_status(&Uuid::new_v4().to_string()),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_system_status_is_admin_only() {
        let (state, _, _) = state_with(Behavior::Succeed);
        let user = state.login("user", "password").unwrap();
        let admin = state.login("admin", "admin").unwrap();

        tokio_test::assert_err!(state.system_status(&user).await);
        let status = state.system_status(&admin).await.unwrap();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.active_sessions, 2);
        assert_eq!(status.answerer, "counting");
    }

    #[tokio::test]
    async fn test_shutdown_releases_scratch_dirs() {
        let (state, _, _) = state_with(Behavior::Succeed);
        let session = state.login("user", "password").unwrap();
        assert!(session.scratch_dir.is_dir());

        state.shutdown();
        assert!(!session.scratch_dir.exists());
        assert!(!state.is_ready());
        assert!(matches!(
            state.session(&session.token),
            Err(Error::Auth(AuthError::InvalidSession))
        ));
    }
}
