use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub catalog_path: PathBuf,
    /// JSON-lines archive for submitted sessions. `None` keeps history in
    /// memory only.
    pub archive_path: Option<PathBuf>,
    /// Base URL of an HTTP speech recognizer. `None` selects the scripted stub.
    pub recognizer_url: Option<String>,
    pub recognizer_user_agent: String,
    pub recognition_timeout_secs: u64,
    pub stub_delay_ms: u64,
    pub rate_limit_per_minute: usize,
}
