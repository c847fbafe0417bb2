//! Configuration for the document Q&A service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Credentials accepted by the login endpoint
    #[serde(default)]
    pub auth: AuthConfig,
    /// Ingestion configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,
    /// Answer generation configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Pre-seeded demo documents
    #[serde(default)]
    pub demo: DemoConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Apply `DOCQA_*` environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("DOCQA_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("DOCQA_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid DOCQA_PORT: {}", port),
            }
        }
        if let Ok(dir) = std::env::var("DOCQA_DEMO_DIR") {
            self.demo = DemoConfig::under(PathBuf::from(dir));
        }
        if let Ok(backend) = std::env::var("DOCQA_ANSWERER") {
            match backend.to_lowercase().as_str() {
                "ollama" => self.llm.backend = AnswererBackend::Ollama,
                "extractive" => self.llm.backend = AnswererBackend::Extractive,
                other => tracing::warn!("Ignoring unknown DOCQA_ANSWERER: {}", other),
            }
        }
        if let Ok(url) = std::env::var("DOCQA_OLLAMA_URL") {
            self.llm.base_url = url;
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 200MB)
    pub max_upload_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 200 * 1024 * 1024,
        }
    }
}

/// A login accepted by the toy credential check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Credential configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub users: Vec<UserCredential>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            users: vec![
                UserCredential {
                    username: "user".to_string(),
                    password: "password".to_string(),
                    is_admin: false,
                },
                UserCredential {
                    username: "admin".to_string(),
                    password: "admin".to_string(),
                    is_admin: true,
                },
            ],
        }
    }
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (smaller trailing chunks are dropped)
    pub min_chunk_size: usize,
    /// Accepted upload extensions, lowercase without the dot
    pub allowed_extensions: Vec<String>,
    /// Prefix for per-session scratch directories
    pub scratch_prefix: String,
    /// Seconds a single document extraction may take
    pub extract_timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            min_chunk_size: 20,
            allowed_extensions: vec!["pdf".to_string(), "docx".to_string(), "txt".to_string()],
            scratch_prefix: "doc_qa_".to_string(),
            extract_timeout_secs: 60,
        }
    }
}

impl IngestionConfig {
    /// Check whether a filename carries an accepted extension
    pub fn accepts(&self, filename: &str) -> bool {
        match extension_of(filename) {
            Some(ext) => self.allowed_extensions.iter().any(|allowed| *allowed == ext),
            None => false,
        }
    }
}

/// Lowercase extension of a filename, if any
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Passages retrieved per question
    pub top_k: usize,
    /// Confidence reported when nothing relevant was retrieved
    pub fallback_confidence: f32,
    /// Answer reported when nothing relevant was retrieved
    pub fallback_answer: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            fallback_confidence: 0.1,
            fallback_answer:
                "I couldn't find relevant information in the document to answer your question."
                    .to_string(),
        }
    }
}

/// Which answerer implementation to wire in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnswererBackend {
    /// Sentence extraction from retrieved passages, no model required
    #[default]
    Extractive,
    /// Grounded generation through an Ollama server
    Ollama,
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Answerer backend
    pub backend: AnswererBackend,
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: AnswererBackend::Extractive,
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Demo document configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Demo key -> file on the server
    pub files: BTreeMap<String, PathBuf>,
}

impl DemoConfig {
    /// Default demo files rooted at `dir`
    pub fn under(dir: PathBuf) -> Self {
        let mut files = BTreeMap::new();
        files.insert("demo_graph".to_string(), dir.join("sample w graph.pdf"));
        files.insert("demo_data".to_string(), dir.join("sampledata.pdf"));
        Self { files }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::under(base.join("demo_files"))
    }
}
