//! Scripted stand-ins for the answer pipeline's collaborators.

use application::answer_orchestrator::{AnswerOptions, AnswerOrchestrator};
use async_trait::async_trait;
use domain::error::{CollaboratorError, CollaboratorResult};
use domain::models::RetrievedDocument;
use domain::ports::{ChatCompleter, DocumentSearch, Embedder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a stub does when called.
#[derive(Debug, Clone)]
pub enum Script<T> {
    Return(T),
    Fail,
    Panic,
    Hang,
}

impl<T: Clone> Script<T> {
    async fn play(&self) -> CollaboratorResult<T> {
        match self {
            Script::Return(value) => Ok(value.clone()),
            Script::Fail => Err(CollaboratorError::Transport("connection refused".to_string())),
            Script::Panic => panic!("stub collaborator panicked"),
            Script::Hang => std::future::pending().await,
        }
    }
}

pub struct StubEmbedder {
    script: Script<Vec<f32>>,
    calls: AtomicUsize,
    pub inputs: Mutex<Vec<String>>,
}

impl StubEmbedder {
    pub fn new(script: Script<Vec<f32>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        self.script.play().await
    }

    fn name(&self) -> &str {
        "stub-embedder"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub text: Option<String>,
    pub k: usize,
}

pub struct StubSearch {
    script: Script<Vec<RetrievedDocument>>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<SearchRequest>>,
}

impl StubSearch {
    pub fn new(script: Script<Vec<RetrievedDocument>>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(documents: Vec<RetrievedDocument>) -> Self {
        Self::new(Script::Return(documents))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentSearch for StubSearch {
    async fn query(
        &self,
        vector: &[f32],
        text: Option<&str>,
        k: usize,
    ) -> CollaboratorResult<Vec<RetrievedDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(SearchRequest {
            vector: vector.to_vec(),
            text: text.map(str::to_string),
            k,
        });
        self.script.play().await
    }

    fn name(&self) -> &str {
        "stub-search"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Replies with its received system prompt unless scripted otherwise.
pub struct StubCompleter {
    script: Option<Script<String>>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl StubCompleter {
    pub fn echo() -> Self {
        Self {
            script: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn new(script: Script<String>) -> Self {
        Self {
            script: Some(script),
            ..Self::echo()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatCompleter for StubCompleter {
    async fn complete(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> CollaboratorResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(CompletionRequest {
            system_prompt: system_prompt.to_string(),
            user_message: user_message.to_string(),
            max_tokens,
            temperature,
        });
        match &self.script {
            Some(script) => script.play().await,
            None => Ok(system_prompt.to_string()),
        }
    }

    fn name(&self) -> &str {
        "stub-completer"
    }
}

/// The three stubs plus the orchestrator wired over them.
pub struct Harness {
    pub embedder: Arc<StubEmbedder>,
    pub search: Arc<StubSearch>,
    pub completer: Arc<StubCompleter>,
    pub orchestrator: AnswerOrchestrator,
}

impl Harness {
    pub fn new(embedder: StubEmbedder, search: StubSearch, completer: StubCompleter) -> Self {
        Self::with_options(embedder, search, completer, AnswerOptions::default())
    }

    pub fn with_options(
        embedder: StubEmbedder,
        search: StubSearch,
        completer: StubCompleter,
        options: AnswerOptions,
    ) -> Self {
        let embedder = Arc::new(embedder);
        let search = Arc::new(search);
        let completer = Arc::new(completer);
        let orchestrator =
            AnswerOrchestrator::new(embedder.clone(), search.clone(), completer.clone(), options);
        Self {
            embedder,
            search,
            completer,
            orchestrator,
        }
    }

    /// Working embedder and echo completer over the given documents.
    pub fn happy(documents: Vec<RetrievedDocument>) -> Self {
        Self::new(
            StubEmbedder::new(Script::Return(vec![0.1, 0.2, 0.3])),
            StubSearch::returning(documents),
            StubCompleter::echo(),
        )
    }

    pub fn call_counts(&self) -> (usize, usize, usize) {
        (
            self.embedder.calls(),
            self.search.calls(),
            self.completer.calls(),
        )
    }
}

pub fn password_doc() -> RetrievedDocument {
    RetrievedDocument::new("Reset your password via Settings > Security.", "kb-1")
}
