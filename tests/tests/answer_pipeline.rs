use application::answer_orchestrator::AnswerOptions;
use domain::models::{
    FailureKind, RetrievedDocument, EMBEDDING_UNAVAILABLE_MESSAGE, INVALID_INPUT_MESSAGE,
    NO_DOCUMENTS_MESSAGE, TECHNICAL_DIFFICULTIES_MESSAGE,
};
use std::sync::Arc;
use std::time::Duration;
use tests::{password_doc, Harness, Script, StubCompleter, StubEmbedder, StubSearch};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn blank_questions_call_nothing() {
    let harness = Harness::happy(vec![password_doc()]);
    for question in ["", " ", "\t\n", "   \r\n  "] {
        let answer = harness.orchestrator.answer(question).await;
        assert_eq!(answer.text, INVALID_INPUT_MESSAGE);
        assert_eq!(answer.failure(), Some(FailureKind::InvalidInput));
    }
    assert_eq!(harness.call_counts(), (0, 0, 0));
}

#[tokio::test]
async fn embedding_failure_skips_search_and_generation() {
    let harness = Harness::new(
        StubEmbedder::new(Script::Fail),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::echo(),
    );
    let answer = harness.orchestrator.answer("how do I reset my password?").await;
    assert_eq!(answer.text, EMBEDDING_UNAVAILABLE_MESSAGE);
    assert_eq!(harness.call_counts(), (1, 0, 0));
}

#[tokio::test]
async fn empty_embedding_counts_as_failure() {
    let harness = Harness::new(
        StubEmbedder::new(Script::Return(Vec::new())),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::echo(),
    );
    let answer = harness.orchestrator.answer("vpn?").await;
    assert_eq!(answer.text, EMBEDDING_UNAVAILABLE_MESSAGE);
    assert_eq!(harness.call_counts(), (1, 0, 0));
}

#[tokio::test]
async fn zero_documents_skips_generation() {
    let harness = Harness::happy(Vec::new());
    let answer = harness.orchestrator.answer("how do I reset my password?").await;
    assert_eq!(answer.text, NO_DOCUMENTS_MESSAGE);
    assert_eq!(harness.call_counts(), (1, 1, 0));
}

#[tokio::test]
async fn search_transport_failure_is_technical_difficulties() {
    let harness = Harness::new(
        StubEmbedder::new(Script::Return(vec![1.0])),
        StubSearch::new(Script::Fail),
        StubCompleter::echo(),
    );
    let answer = harness.orchestrator.answer("vpn?").await;
    assert_eq!(answer.text, TECHNICAL_DIFFICULTIES_MESSAGE);
    assert_eq!(answer.failure(), Some(FailureKind::RetrievalUnavailable));
    assert_eq!(harness.completer.calls(), 0);
}

#[tokio::test]
async fn generation_failure_is_technical_difficulties() {
    let harness = Harness::new(
        StubEmbedder::new(Script::Return(vec![1.0])),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::new(Script::Fail),
    );
    let answer = harness.orchestrator.answer("how do I reset my password?").await;
    assert_eq!(answer.text, TECHNICAL_DIFFICULTIES_MESSAGE);
    assert_eq!(answer.failure(), Some(FailureKind::GenerationUnavailable));
    assert_eq!(harness.call_counts(), (1, 1, 1));
}

#[tokio::test]
async fn blank_completion_is_a_generation_failure() {
    let harness = Harness::new(
        StubEmbedder::new(Script::Return(vec![1.0])),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::new(Script::Return("  \n".to_string())),
    );
    let answer = harness.orchestrator.answer("vpn?").await;
    assert_eq!(answer.failure(), Some(FailureKind::GenerationUnavailable));
}

#[tokio::test]
async fn retrieved_content_reaches_the_system_prompt_as_document_one() {
    let harness = Harness::happy(vec![password_doc()]);
    let answer = harness.orchestrator.answer("how do I reset my password?").await;

    assert!(answer.is_generated());
    let request = harness.completer.last_request().unwrap();
    assert!(request
        .system_prompt
        .contains("Reset your password via Settings > Security."));
    assert!(request
        .system_prompt
        .contains("Document 1: Reset your password via Settings > Security."));
    assert_eq!(request.user_message, "how do I reset my password?");
    // The echo completer hands the prompt back verbatim.
    assert_eq!(answer.text, request.system_prompt);
}

#[tokio::test]
async fn identical_questions_build_identical_prompts() {
    let harness = Harness::happy(vec![
        password_doc(),
        RetrievedDocument::new("Passwords expire every 90 days.", "kb-7"),
    ]);
    harness.orchestrator.answer("password help").await;
    harness.orchestrator.answer("password help").await;

    let requests = harness.completer.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].system_prompt, requests[1].system_prompt);
}

#[tokio::test]
async fn retrieval_order_is_preserved() {
    let harness = Harness::happy(vec![
        RetrievedDocument::new("zebra crossing policy", "kb-9"),
        RetrievedDocument::new("apple device enrolment", "kb-1"),
        RetrievedDocument::new("monitor calibration", "kb-5"),
    ]);
    harness.orchestrator.answer("devices").await;

    let prompt = harness.completer.last_request().unwrap().system_prompt;
    assert!(prompt.contains(
        "Document 1: zebra crossing policy\n\nDocument 2: apple device enrolment\n\nDocument 3: monitor calibration"
    ));
}

#[tokio::test]
async fn options_reach_the_collaborators() {
    let options = AnswerOptions {
        top_k: 5,
        max_tokens: 256,
        temperature: 0.25,
        ..AnswerOptions::default()
    };
    let harness = Harness::with_options(
        StubEmbedder::new(Script::Return(vec![0.5, 0.5])),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::echo(),
        options,
    );
    harness.orchestrator.answer("reset password").await;

    let search = harness.search.requests.lock().unwrap()[0].clone();
    assert_eq!(search.k, 5);
    assert_eq!(search.vector, vec![0.5, 0.5]);
    assert_eq!(search.text.as_deref(), Some("reset password"));

    let completion = harness.completer.last_request().unwrap();
    assert_eq!(completion.max_tokens, 256);
    assert_eq!(completion.temperature, 0.25);
}

#[tokio::test]
async fn default_options_ask_for_three_documents_and_500_tokens() {
    let harness = Harness::happy(vec![password_doc()]);
    harness.orchestrator.answer("reset password").await;
    assert_eq!(harness.search.requests.lock().unwrap()[0].k, 3);
    let completion = harness.completer.last_request().unwrap();
    assert_eq!(completion.max_tokens, 500);
    assert!(completion.temperature <= 0.3);
}

#[tokio::test]
async fn panicking_collaborator_is_contained() {
    let harness = Harness::new(
        StubEmbedder::new(Script::Return(vec![1.0])),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::new(Script::Panic),
    );
    let answer = harness.orchestrator.answer("vpn?").await;
    assert_eq!(answer.text, TECHNICAL_DIFFICULTIES_MESSAGE);
    assert_eq!(answer.failure(), Some(FailureKind::UnexpectedFault));
}

#[tokio::test(start_paused = true)]
async fn slow_embedder_times_out_as_embedding_failure() {
    let options = AnswerOptions {
        stage_timeout: Duration::from_secs(2),
        ..AnswerOptions::default()
    };
    let harness = Harness::with_options(
        StubEmbedder::new(Script::Hang),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::echo(),
        options,
    );
    let answer = harness.orchestrator.answer("vpn?").await;
    assert_eq!(answer.text, EMBEDDING_UNAVAILABLE_MESSAGE);
    assert_eq!(harness.call_counts(), (1, 0, 0));
}

#[tokio::test(start_paused = true)]
async fn slow_completer_times_out_as_technical_difficulties() {
    let harness = Harness::new(
        StubEmbedder::new(Script::Return(vec![1.0])),
        StubSearch::returning(vec![password_doc()]),
        StubCompleter::new(Script::Hang),
    );
    let answer = harness.orchestrator.answer("vpn?").await;
    assert_eq!(answer.text, TECHNICAL_DIFFICULTIES_MESSAGE);
    assert_eq!(answer.failure(), Some(FailureKind::GenerationUnavailable));
}

#[tokio::test]
async fn cancellation_aborts_the_outstanding_call() {
    let harness = Arc::new(Harness::new(
        StubEmbedder::new(Script::Return(vec![1.0])),
        StubSearch::new(Script::Hang),
        StubCompleter::echo(),
    ));
    let cancel = CancellationToken::new();

    let task = {
        let harness = harness.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { harness.orchestrator.answer_with_cancel("vpn?", &cancel).await })
    };
    while harness.search.calls() == 0 {
        tokio::task::yield_now().await;
    }
    cancel.cancel();

    let answer = task.await.unwrap();
    assert_eq!(answer.text, TECHNICAL_DIFFICULTIES_MESSAGE);
    assert_eq!(answer.failure(), Some(FailureKind::UnexpectedFault));
    assert_eq!(harness.completer.calls(), 0);
}

#[tokio::test]
async fn concurrent_questions_do_not_interfere() {
    let harness = Arc::new(Harness::happy(vec![password_doc()]));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let harness = harness.clone();
            tokio::spawn(async move { harness.orchestrator.answer(&format!("question {i}")).await })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().is_generated());
    }
    assert_eq!(harness.call_counts(), (8, 8, 8));
}
