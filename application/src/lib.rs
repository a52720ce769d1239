pub mod answer_orchestrator;
pub mod ingest_service;
pub mod prompt;
pub mod tool_service;
