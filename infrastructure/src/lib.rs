pub mod azure_openai_client;
pub mod azure_search_client;
pub mod config;
pub mod document_reader;
pub mod embedder;
pub mod embedding_storage;
pub mod file_scanner;
pub mod http;
pub mod mcp_client;
pub mod ollama_client;
pub mod search;
pub mod wiki_source;
