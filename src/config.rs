use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub listen: String,
    pub allowed_origins: Vec<String>,
    pub max_upload_size: usize,
    pub backend: BackendConfig,
}

/// Connection settings for the hosted storage/auth service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// "http" talks to the hosted service; "memory" runs the in-process
    /// backend (development only, nothing survives a restart).
    pub mode: BackendMode,
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub bucket_id: String,
    pub database_id: String,
    pub users_table: String,
    pub files_table: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    Http,
    Memory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:22900".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_upload_size: 50 * 1024 * 1024,
            backend: BackendConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mode: BackendMode::Memory,
            endpoint: "https://cloud.example.com/v1".to_string(),
            project_id: "".to_string(),
            api_key: "".to_string(),
            bucket_id: "files".to_string(),
            database_id: "main".to_string(),
            users_table: "users".to_string(),
            files_table: "files".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Self {
        let config_path = Path::new("config.toml");
        if config_path.exists() {
            let mut file = std::fs::File::open(config_path).expect("failed to open config.toml");
            let mut contents = String::new();
            file.read_to_string(&mut contents)
                .expect("failed to read config.toml");
            toml::from_str(&contents).expect("failed to parse config.toml")
        } else {
            let default_config = Config::default();
            let toml_string = toml::to_string_pretty(&default_config)
                .expect("failed to serialize default config");
            let mut file =
                std::fs::File::create(config_path).expect("failed to create config.toml");
            file.write_all(toml_string.as_bytes())
                .expect("failed to write config.toml");
            default_config
        }
    }
}

impl BackendConfig {
    /// Retrieval URL for a stored object, served by the hosted storage
    /// service directly.
    pub fn file_url(&self, object_id: &str) -> String {
        format!(
            "{}/storage/buckets/{}/files/{}/view?project={}",
            self.endpoint.trim_end_matches('/'),
            self.bucket_id,
            object_id,
            self.project_id
        )
    }
}
