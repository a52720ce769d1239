use anyhow::{bail, Context};
use dotenvy::dotenv;
use shared::types::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const MAX_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Azure OpenAI for embeddings and chat, Azure AI Search for retrieval.
    Azure,
    /// Ollama for embeddings and chat, the local SQLite index for retrieval.
    Ollama,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "azure" => Ok(Provider::Azure),
            "ollama" | "local" => Ok(Provider::Ollama),
            other => bail!("unknown provider '{other}', expected 'azure' or 'ollama'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub embedding_deployment: String,
    pub chat_deployment: String,
    /// Separate resource for chat, when embeddings and chat live apart.
    pub chat_endpoint: Option<String>,
    pub chat_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AzureSearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_name: String,
    pub api_version: String,
    pub vector_field: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub stage_timeout: Duration,
    pub hybrid: bool,
}

#[derive(Debug, Clone)]
pub struct McpConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub call_timeout: Duration,
}

/// Azure DevOps Wiki used by `ingest --wiki`.
#[derive(Debug, Clone)]
pub struct WikiConfig {
    pub base_url: String,
    pub organization: String,
    pub project: String,
    pub wiki: String,
    pub pat: String,
    pub api_version: String,
}

impl WikiConfig {
    /// Checked only when the wiki is actually ingested.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("AZURE_DEVOPS_ORG", &self.organization),
            ("AZURE_DEVOPS_PROJECT", &self.project),
            ("AZURE_DEVOPS_WIKI", &self.wiki),
            ("AZURE_DEVOPS_PAT", &self.pat),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();
        if !missing.is_empty() {
            bail!("missing wiki settings: {}", missing.join(", "));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub provider: Provider,
    pub azure_openai: AzureOpenAiConfig,
    pub azure_search: AzureSearchConfig,
    pub ollama: OllamaConfig,
    pub db_path: PathBuf,
    pub retrieval: RetrievalConfig,
    pub mcp: McpConfig,
    pub wiki: WikiConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load `.env` (if present) and read the environment.
    pub fn load() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. `load` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let provider: Provider = get("HELPDESK_PROVIDER", "azure").parse()?;

        let azure_openai = AzureOpenAiConfig {
            endpoint: get("AZURE_OPENAI_ENDPOINT", ""),
            api_key: get("AZURE_OPENAI_API_KEY", ""),
            api_version: get("AZURE_OPENAI_API_VERSION", "2024-02-01"),
            embedding_deployment: get("AZURE_OPENAI_EMBEDDING_DEPLOYMENT", "text-embedding-ada-002"),
            chat_deployment: get("AZURE_OPENAI_CHAT_DEPLOYMENT", "gpt-4o-mini"),
            chat_endpoint: lookup("AZURE_OPENAI_CHAT_ENDPOINT"),
            chat_api_key: lookup("AZURE_OPENAI_CHAT_API_KEY"),
        };

        let azure_search = AzureSearchConfig {
            endpoint: get("AZURE_SEARCH_ENDPOINT", ""),
            api_key: get("AZURE_SEARCH_API_KEY", ""),
            index_name: get("AZURE_SEARCH_INDEX", "support-knowledge-base"),
            api_version: get("AZURE_SEARCH_API_VERSION", "2023-11-01"),
            vector_field: get("AZURE_SEARCH_VECTOR_FIELD", "content_vector"),
            dimensions: parse_number(
                &get("AZURE_SEARCH_DIMENSIONS", "1536"),
                "AZURE_SEARCH_DIMENSIONS",
            )?,
        };

        let ollama = OllamaConfig {
            base_url: get("OLLAMA_BASE_URL", "http://localhost:11434"),
            chat_model: get("OLLAMA_MODEL", "qwen2.5:7b-instruct"),
            embedding_model: get("OLLAMA_EMBEDDING_MODEL", "nomic-embed-text"),
        };

        let retrieval = RetrievalConfig {
            top_k: parse_number(&get("HELPDESK_TOP_K", "3"), "HELPDESK_TOP_K")?,
            max_tokens: parse_number(&get("HELPDESK_MAX_TOKENS", "500"), "HELPDESK_MAX_TOKENS")?,
            temperature: parse_number(&get("HELPDESK_TEMPERATURE", "0.1"), "HELPDESK_TEMPERATURE")?,
            stage_timeout: Duration::from_secs(parse_number(
                &get("HELPDESK_STAGE_TIMEOUT_SECS", "10"),
                "HELPDESK_STAGE_TIMEOUT_SECS",
            )?),
            hybrid: parse_bool(&get("HELPDESK_HYBRID_SEARCH", "true"), "HELPDESK_HYBRID_SEARCH")?,
        };

        let mcp = McpConfig {
            enabled: parse_bool(&get("MCP_ENABLED", "false"), "MCP_ENABLED")?,
            command: get("MCP_COMMAND", "node"),
            args: get("MCP_ARGS", "mcp-server/server.js")
                .split_whitespace()
                .map(String::from)
                .collect(),
            working_dir: lookup("MCP_WORKING_DIR").map(PathBuf::from),
            call_timeout: Duration::from_secs(parse_number(
                &get("MCP_TIMEOUT_SECS", "10"),
                "MCP_TIMEOUT_SECS",
            )?),
        };

        let wiki = WikiConfig {
            base_url: get("AZURE_DEVOPS_URL", "https://dev.azure.com"),
            organization: get("AZURE_DEVOPS_ORG", ""),
            project: get("AZURE_DEVOPS_PROJECT", ""),
            wiki: get("AZURE_DEVOPS_WIKI", ""),
            pat: get("AZURE_DEVOPS_PAT", ""),
            api_version: get("AZURE_DEVOPS_API_VERSION", "6.0"),
        };

        let logging = LoggingConfig {
            level: get("HELPDESK_LOG_LEVEL", "info"),
            json: parse_bool(&get("HELPDESK_LOG_JSON", "false"), "HELPDESK_LOG_JSON")?,
        };

        Ok(Self {
            provider,
            azure_openai,
            azure_search,
            ollama,
            db_path: PathBuf::from(get("DB_PATH", "helpdesk_index.db")),
            retrieval,
            mcp,
            wiki,
            logging,
        })
    }

    /// Reject settings that would only fail later, at request time.
    pub fn validate(&self) -> Result<()> {
        if self.provider == Provider::Azure {
            let required = [
                ("AZURE_OPENAI_ENDPOINT", &self.azure_openai.endpoint),
                ("AZURE_OPENAI_API_KEY", &self.azure_openai.api_key),
                ("AZURE_SEARCH_ENDPOINT", &self.azure_search.endpoint),
                ("AZURE_SEARCH_API_KEY", &self.azure_search.api_key),
            ];
            let missing: Vec<&str> = required
                .iter()
                .filter(|(_, value)| value.trim().is_empty())
                .map(|(key, _)| *key)
                .collect();
            if !missing.is_empty() {
                bail!("missing required settings: {}", missing.join(", "));
            }
        }
        if self.retrieval.top_k == 0 {
            bail!("HELPDESK_TOP_K must be at least 1");
        }
        if self.retrieval.max_tokens == 0 {
            bail!("HELPDESK_MAX_TOKENS must be at least 1");
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.retrieval.temperature) {
            bail!(
                "HELPDESK_TEMPERATURE must be between 0.0 and {MAX_TEMPERATURE}, got {}",
                self.retrieval.temperature
            );
        }
        if self.retrieval.stage_timeout.is_zero() {
            bail!("HELPDESK_STAGE_TIMEOUT_SECS must be at least 1");
        }
        if self.mcp.enabled && self.mcp.command.trim().is_empty() {
            bail!("MCP_COMMAND must be set when MCP_ENABLED is true");
        }
        Ok(())
    }
}

fn parse_number<T>(value: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid value for {key}: '{value}'"))
}

fn parse_bool(value: &str, key: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("invalid value for {key}: '{other}'"),
    }
}
