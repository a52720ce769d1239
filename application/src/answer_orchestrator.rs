use crate::prompt::{build_prompt_context, build_system_prompt};
use domain::error::{CollaboratorError, CollaboratorResult};
use domain::models::{Answer, FailureKind, RetrievedDocument};
use domain::ports::{ChatCompleter, DocumentSearch, Embedder};
use futures::FutureExt;
use infrastructure::config::{
    RetrievalConfig, DEFAULT_MAX_TOKENS, DEFAULT_STAGE_TIMEOUT, DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
};
use shared::telemetry::Telemetry;
use shared::utils::is_blank;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOptions {
    pub top_k: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Wall-clock budget for each collaborator call.
    pub stage_timeout: Duration,
    /// Pass the raw question to the search backend alongside the vector.
    pub hybrid: bool,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            hybrid: true,
        }
    }
}

impl From<&RetrievalConfig> for AnswerOptions {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            top_k: config.top_k,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            stage_timeout: config.stage_timeout,
            hybrid: config.hybrid,
        }
    }
}

enum StageError {
    Failed(CollaboratorError),
    TimedOut(Duration),
    Cancelled,
    Panicked,
}

impl StageError {
    /// Collaborator errors and timeouts fail the stage they happened in;
    /// panics and cancellation are faults regardless of stage.
    fn into_failure(self, stage_failure: FailureKind) -> FailureKind {
        match self {
            StageError::Failed(_) | StageError::TimedOut(_) => stage_failure,
            StageError::Cancelled | StageError::Panicked => FailureKind::UnexpectedFault,
        }
    }

    fn describe(&self) -> String {
        match self {
            StageError::Failed(e) => e.to_string(),
            StageError::TimedOut(limit) => format!("timed out after {limit:?}"),
            StageError::Cancelled => "cancelled".to_string(),
            StageError::Panicked => "collaborator panicked".to_string(),
        }
    }
}

/// Embed, retrieve, generate. Every failure becomes a fixed answer text;
/// nothing is returned as an error.
pub struct AnswerOrchestrator {
    embedder: Arc<dyn Embedder>,
    search: Arc<dyn DocumentSearch>,
    completer: Arc<dyn ChatCompleter>,
    options: AnswerOptions,
}

impl AnswerOrchestrator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        search: Arc<dyn DocumentSearch>,
        completer: Arc<dyn ChatCompleter>,
        options: AnswerOptions,
    ) -> Self {
        Self {
            embedder,
            search,
            completer,
            options,
        }
    }

    pub fn options(&self) -> &AnswerOptions {
        &self.options
    }

    pub async fn answer(&self, question: &str) -> Answer {
        self.answer_with_cancel(question, &CancellationToken::new())
            .await
    }

    pub async fn answer_with_cancel(&self, question: &str, cancel: &CancellationToken) -> Answer {
        if is_blank(question) {
            tracing::debug!("rejecting blank question");
            return Answer::fallback(FailureKind::InvalidInput);
        }
        let mut timer = Telemetry::new();

        let embedded = self
            .run_stage(cancel, self.embedder.embed(question))
            .await;
        tracing::info!(stage = "embed", elapsed_ms = timer.lap_ms(), embedder = self.embedder.name());
        let vector = match embedded {
            Ok(vector) if !vector.is_empty() => vector,
            Ok(_) => {
                return fail(
                    "embed",
                    FailureKind::EmbeddingUnavailable,
                    "embedder returned an empty vector",
                )
            }
            Err(e) => {
                let detail = e.describe();
                return fail("embed", e.into_failure(FailureKind::EmbeddingUnavailable), &detail);
            }
        };

        let text = self.options.hybrid.then_some(question);
        let retrieved = self
            .run_stage(cancel, self.search.query(&vector, text, self.options.top_k))
            .await;
        tracing::info!(stage = "retrieve", elapsed_ms = timer.lap_ms(), search = self.search.name());
        let documents = match retrieved {
            Ok(documents) if documents.is_empty() => {
                tracing::info!("no relevant documents found");
                return Answer::fallback(FailureKind::NoRelevantDocuments);
            }
            Ok(documents) => documents,
            Err(e) => {
                let detail = e.describe();
                return fail("retrieve", e.into_failure(FailureKind::RetrievalUnavailable), &detail);
            }
        };

        let system_prompt = build_system_prompt(&build_prompt_context(&documents));
        let completed = self
            .run_stage(
                cancel,
                self.completer.complete(
                    &system_prompt,
                    question,
                    self.options.max_tokens,
                    self.options.temperature,
                ),
            )
            .await;
        tracing::info!(stage = "generate", elapsed_ms = timer.lap_ms(), completer = self.completer.name());
        match completed {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!(
                    document_count = documents.len(),
                    sources = %distinct_sources(&documents),
                    "answer generated"
                );
                Answer::generated(text, documents.len())
            }
            Ok(_) => fail(
                "generate",
                FailureKind::GenerationUnavailable,
                "completer returned empty text",
            ),
            Err(e) => {
                let detail = e.describe();
                fail("generate", e.into_failure(FailureKind::GenerationUnavailable), &detail)
            }
        }
    }

    async fn run_stage<T, F>(&self, cancel: &CancellationToken, call: F) -> Result<T, StageError>
    where
        F: Future<Output = CollaboratorResult<T>>,
    {
        let limit = self.options.stage_timeout;
        let guarded = AssertUnwindSafe(call).catch_unwind();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(StageError::Cancelled),
            outcome = tokio::time::timeout(limit, guarded) => match outcome {
                Err(_) => Err(StageError::TimedOut(limit)),
                Ok(Err(_)) => Err(StageError::Panicked),
                Ok(Ok(result)) => result.map_err(StageError::Failed),
            },
        }
    }
}

fn fail(stage: &str, kind: FailureKind, detail: &str) -> Answer {
    if kind == FailureKind::UnexpectedFault {
        tracing::error!(stage, failure = %kind, detail, "answer pipeline fault");
    } else {
        tracing::warn!(stage, failure = %kind, detail, "answer stage failed");
    }
    Answer::fallback(kind)
}

fn distinct_sources(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|doc| doc.source.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ")
}
