use serde::{Deserialize, Serialize};
use std::fmt;

pub const INVALID_INPUT_MESSAGE: &str = "Please enter a valid question.";
pub const EMBEDDING_UNAVAILABLE_MESSAGE: &str = "Could not process your question right now.";
pub const NO_DOCUMENTS_MESSAGE: &str =
    "I found no relevant information for your question in the knowledge base.";
pub const TECHNICAL_DIFFICULTIES_MESSAGE: &str =
    "Sorry, I'm having technical difficulties right now. Please try again shortly.";

/// One search hit, in the rank order the backend returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub source: String,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// A chunk of a source document waiting to be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub source: String,
    pub content: String,
}

/// A chunk with its embedding, ready to be written to an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: String,
    pub source: String,
    pub content: String,
    pub vector: Vec<f32>,
}

/// Why the orchestrator could not produce a generated answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidInput,
    EmbeddingUnavailable,
    RetrievalUnavailable,
    NoRelevantDocuments,
    GenerationUnavailable,
    UnexpectedFault,
}

impl FailureKind {
    /// The user-facing text for this failure.
    pub fn message(self) -> &'static str {
        match self {
            FailureKind::InvalidInput => INVALID_INPUT_MESSAGE,
            FailureKind::EmbeddingUnavailable => EMBEDDING_UNAVAILABLE_MESSAGE,
            FailureKind::NoRelevantDocuments => NO_DOCUMENTS_MESSAGE,
            FailureKind::RetrievalUnavailable
            | FailureKind::GenerationUnavailable
            | FailureKind::UnexpectedFault => TECHNICAL_DIFFICULTIES_MESSAGE,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::EmbeddingUnavailable => "embedding_unavailable",
            FailureKind::RetrievalUnavailable => "retrieval_unavailable",
            FailureKind::NoRelevantDocuments => "no_relevant_documents",
            FailureKind::GenerationUnavailable => "generation_unavailable",
            FailureKind::UnexpectedFault => "unexpected_fault",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Generated { document_count: usize },
    Fallback(FailureKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub outcome: AnswerOutcome,
}

impl Answer {
    pub fn generated(text: String, document_count: usize) -> Self {
        Self {
            text,
            outcome: AnswerOutcome::Generated { document_count },
        }
    }

    pub fn fallback(kind: FailureKind) -> Self {
        Self {
            text: kind.message().to_string(),
            outcome: AnswerOutcome::Fallback(kind),
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.outcome, AnswerOutcome::Generated { .. })
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self.outcome {
            AnswerOutcome::Fallback(kind) => Some(kind),
            AnswerOutcome::Generated { .. } => None,
        }
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
