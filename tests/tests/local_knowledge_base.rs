use application::answer_orchestrator::{AnswerOptions, AnswerOrchestrator};
use application::ingest_service::IngestService;
use async_trait::async_trait;
use domain::error::CollaboratorResult;
use domain::models::NO_DOCUMENTS_MESSAGE;
use domain::ports::Embedder;
use domain::session::Session;
use infrastructure::config::Config;
use infrastructure::embedding_storage::EmbeddingStorage;
use infrastructure::search::LocalVectorIndex;
use presentation::wiring::Services;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tests::StubCompleter;

const TOPICS: [&str; 3] = ["vpn", "printer", "password"];

/// One dimension per known topic keyword.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(TOPICS
            .iter()
            .map(|topic| if lower.contains(topic) { 1.0 } else { 0.0 })
            .collect())
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

fn article(topic: &str, body: &str) -> String {
    format!(
        "# {topic}\n\n{body} {}\n\nok",
        "Follow each step in order and confirm the result before moving on. ".repeat(2)
    )
}

#[tokio::test]
async fn ingested_documents_ground_the_answer() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("kb")).unwrap();
    fs::write(
        dir.path().join("kb/vpn.md"),
        article("VPN", "Connect to the VPN with the corporate client."),
    )
    .unwrap();
    fs::write(
        dir.path().join("kb/printer.txt"),
        article("Printer", "Clear printer jams by opening tray two."),
    )
    .unwrap();

    let index = Arc::new(LocalVectorIndex::new(Arc::new(
        EmbeddingStorage::new(dir.path().join("index.db")).unwrap(),
    )));
    let embedder: Arc<dyn Embedder> = Arc::new(KeywordEmbedder);
    let report = IngestService::new(embedder.clone(), index.clone())
        .ingest(dir.path().join("kb"), false)
        .await
        .unwrap();
    assert_eq!(report.sources_scanned, 2);
    assert_eq!(report.chunks_indexed, 2);

    let completer = Arc::new(StubCompleter::echo());
    let orchestrator = AnswerOrchestrator::new(
        embedder,
        index,
        completer.clone(),
        AnswerOptions {
            top_k: 1,
            ..AnswerOptions::default()
        },
    );
    let answer = orchestrator.answer("My printer is jammed").await;
    assert!(answer.is_generated());
    let prompt = completer.last_request().unwrap().system_prompt;
    assert!(prompt.contains("Document 1: Clear printer jams by opening tray two."));
    assert!(!prompt.contains("Document 2:"));
}

#[tokio::test]
async fn empty_index_has_no_relevant_documents() {
    let index = Arc::new(LocalVectorIndex::new(Arc::new(EmbeddingStorage::in_memory().unwrap())));
    let completer = Arc::new(StubCompleter::echo());
    let orchestrator = AnswerOrchestrator::new(
        Arc::new(KeywordEmbedder),
        index,
        completer.clone(),
        AnswerOptions::default(),
    );
    let answer = orchestrator.answer("vpn keeps dropping").await;
    assert_eq!(answer.text, NO_DOCUMENTS_MESSAGE);
    assert_eq!(completer.calls(), 0);
}

#[test]
fn follow_up_questions_reuse_the_topic_until_nothing_is_found() {
    let mut session = Session::new("s-1".to_string());

    let first = session.resolve("What is the VPN?");
    assert_eq!(first.follow_up_topic, None);
    session.record_turn("What is the VPN?", &first, true);
    assert_eq!(session.last_topic.as_deref(), Some("Vpn"));

    let follow_up = session.resolve("how do I install it?");
    assert_eq!(follow_up.text, "how do I install Vpn?");
    session.record_turn("how do I install it?", &follow_up, false);
    assert_eq!(session.last_topic, None);
}

#[test]
fn local_provider_wires_without_network() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("helpdesk.db");
    let env: HashMap<&str, String> = HashMap::from([
        ("HELPDESK_PROVIDER", "ollama".to_string()),
        ("DB_PATH", db_path.display().to_string()),
    ]);
    let config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
    config.validate().unwrap();

    let services = Services::from_config(&config).unwrap();
    assert_eq!(services.orchestrator.options().top_k, 3);
    assert!(db_path.exists());
    assert_eq!(services.index_label, format!("local index {}", db_path.display()));
    let err = services.wiki_source().err().unwrap().to_string();
    assert!(err.contains("AZURE_DEVOPS_ORG"));
}
