//! Query engine: one question against one document

use std::sync::Arc;
use uuid::Uuid;

use crate::config::QueryConfig;
use crate::error::{Error, QueryError, Result, ValidationError};
use crate::processing::TaskTracker;
use crate::providers::Answerer;
use crate::storage::DocumentRegistry;
use crate::types::{DocumentRecord, QueryAnswer};

/// Answers questions from registered documents.
///
/// Reads the registry only; recording the exchange is the caller's job.
#[derive(Clone)]
pub struct QueryEngine {
    registry: DocumentRegistry,
    tracker: TaskTracker,
    answerer: Arc<dyn Answerer>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(
        registry: DocumentRegistry,
        tracker: TaskTracker,
        answerer: Arc<dyn Answerer>,
        config: QueryConfig,
    ) -> Self {
        Self {
            registry,
            tracker,
            answerer,
            config,
        }
    }

    /// Answer `question` from `document_id`, or from the first-registered
    /// document when none is given
    pub async fn answer(&self, document_id: Option<Uuid>, question: &str) -> Result<QueryAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ValidationError::BadRequest("Query cannot be empty".to_string()).into());
        }

        let document = self.resolve(document_id)?;
        let passages = document.index.retrieve(question, self.config.top_k);

        tracing::debug!(
            "Retrieved {} passages from {} for query",
            passages.len(),
            document.id
        );

        if passages.is_empty() {
            return Ok(QueryAnswer {
                answer: self.config.fallback_answer.clone(),
                confidence: self.config.fallback_confidence,
                sources_used: 0,
                chunks_retrieved: 0,
                document_id: document.id,
            });
        }

        let generated = self.answerer.generate(question, &passages).await?;

        let confidence = if generated.confidence.is_finite() {
            generated.confidence.clamp(0.0, 1.0)
        } else {
            tracing::warn!(
                "{} returned confidence {}, using fallback",
                self.answerer.name(),
                generated.confidence
            );
            self.config.fallback_confidence
        };

        Ok(QueryAnswer {
            answer: generated.answer_text,
            confidence,
            sources_used: generated.sources_used.min(passages.len()),
            chunks_retrieved: passages.len(),
            document_id: document.id,
        })
    }

    fn resolve(&self, document_id: Option<Uuid>) -> Result<Arc<DocumentRecord>> {
        match document_id {
            Some(id) => self.registry.get(id).ok_or_else(|| {
                match self.tracker.state(id) {
                    Some(state) if !state.is_terminal() => QueryError::DocumentNotReady(id).into(),
                    _ => Error::not_found(format!("Document {}", id)),
                }
            }),
            None => self.registry.first().ok_or_else(|| QueryError::NoDocuments.into()),
        }
    }

    /// Name of the answerer in use
    pub fn answerer_name(&self) -> &str {
        self.answerer.name()
    }

    pub async fn answerer_healthy(&self) -> bool {
        self.answerer.health_check().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AnswerError;
    use crate::providers::{GeneratedAnswer, Passage};
    use crate::storage::documents::tests::record;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answerer that echoes the passage count and counts its calls
    pub(crate) struct CountingAnswerer {
        pub calls: AtomicUsize,
        confidence: f32,
    }

    impl Default for CountingAnswerer {
        fn default() -> Self {
            Self::with_confidence(1.7)
        }
    }

    impl CountingAnswerer {
        pub(crate) fn with_confidence(confidence: f32) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                confidence,
            }
        }
    }

    #[async_trait]
    impl Answerer for CountingAnswerer {
        async fn generate(
            &self,
            _question: &str,
            passages: &[Passage],
        ) -> std::result::Result<GeneratedAnswer, AnswerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GeneratedAnswer {
                answer_text: format!("answer from {} passages", passages.len()),
                confidence: self.confidence,
                sources_used: 1,
            })
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn passage(i: usize) -> Passage {
        Passage {
            chunk_index: i,
            text: format!("passage {}", i),
            score: 1.0,
        }
    }

    fn engine(answerer: Arc<CountingAnswerer>) -> (QueryEngine, DocumentRegistry, TaskTracker) {
        let registry = DocumentRegistry::new();
        let tracker = TaskTracker::new();
        let engine = QueryEngine::new(
            registry.clone(),
            tracker.clone(),
            answerer,
            QueryConfig::default(),
        );
        (engine, registry, tracker)
    }

    #[tokio::test]
    async fn test_empty_registry_is_no_documents() {
        let answerer = Arc::new(CountingAnswerer::default());
        let (engine, _, _) = engine(answerer.clone());

        let err = engine.answer(None, "anything?").await.unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::NoDocuments)));
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_passages_skips_answerer() {
        let answerer = Arc::new(CountingAnswerer::default());
        let (engine, registry, _) = engine(answerer.clone());
        let id = Uuid::new_v4();
        registry.register(record(id, "empty.txt", vec![])).unwrap();

        let answer = engine.answer(Some(id), "Where is it?").await.unwrap();
        assert_eq!(answer.sources_used, 0);
        assert_eq!(answer.chunks_retrieved, 0);
        assert!((answer.confidence - 0.1).abs() < f32::EPSILON);
        assert_eq!(answer.answer, QueryConfig::default().fallback_answer);
        assert_eq!(answerer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retrieves_top_k_and_clamps_confidence() {
        let answerer = Arc::new(CountingAnswerer::default());
        let (engine, registry, _) = engine(answerer.clone());
        let id = Uuid::new_v4();
        registry
            .register(record(id, "big.txt", (0..10).map(passage).collect()))
            .unwrap();

        let answer = engine.answer(None, "What happened?").await.unwrap();
        assert_eq!(answer.chunks_retrieved, 6);
        assert_eq!(answer.answer, "answer from 6 passages");
        assert!(answer.confidence <= 1.0);
        assert!(answer.sources_used <= answer.chunks_retrieved);
        assert_eq!(answer.document_id, id);
    }

    #[tokio::test]
    async fn test_non_finite_confidence_uses_fallback() {
        for reported in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let answerer = Arc::new(CountingAnswerer::with_confidence(reported));
            let (engine, registry, _) = engine(answerer.clone());
            registry
                .register(record(Uuid::new_v4(), "odd.txt", vec![passage(0)]))
                .unwrap();

            let answer = engine.answer(None, "How sure?").await.unwrap();
            assert_eq!(answer.confidence, QueryConfig::default().fallback_confidence);
            assert_eq!(answerer.calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_default_document_is_first_registered() {
        let answerer = Arc::new(CountingAnswerer::default());
        let (engine, registry, _) = engine(answerer);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        registry.register(record(first, "a.txt", vec![passage(0)])).unwrap();
        registry.register(record(second, "b.txt", vec![passage(0)])).unwrap();

        let answer = engine.answer(None, "Which?").await.unwrap();
        assert_eq!(answer.document_id, first);
    }

    #[tokio::test]
    async fn test_explicit_document_not_ready_or_missing() {
        let answerer = Arc::new(CountingAnswerer::default());
        let (engine, _, tracker) = engine(answerer);
        let pending = Uuid::new_v4();
        tracker.create(pending, "slow.pdf", PathBuf::new()).unwrap();

        let err = engine.answer(Some(pending), "Ready?").await.unwrap_err();
        assert!(matches!(err, Error::Query(QueryError::DocumentNotReady(id)) if id == pending));

        let err = engine.answer(Some(Uuid::new_v4()), "Anyone?").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let answerer = Arc::new(CountingAnswerer::default());
        let (engine, _, _) = engine(answerer);
        let err = engine.answer(None, "   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::BadRequest(_))));
    }
}
