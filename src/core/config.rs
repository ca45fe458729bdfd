use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::core::error::ConfigError;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root URL of the chat service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Directory for logs and the default credential file
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Overrides the credential file location
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    /// Access token supplied out of band (env var); kept in memory only
    #[serde(skip)]
    pub token: Option<String>,

    #[serde(default)]
    pub debug: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("graphchat"))
        .unwrap_or_else(|| PathBuf::from(".graphchat"))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoints: EndpointConfig::default(),
            data_dir: default_data_dir(),
            credentials_file: None,
            token: None,
            debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_chat_path")]
    pub chat: String,
    #[serde(default = "default_upload_path")]
    pub upload: String,
    #[serde(default = "default_history_path")]
    pub history: String,
    #[serde(default = "default_status_path")]
    pub status: String,
}

fn default_chat_path() -> String {
    "/api/chat".into()
}

fn default_upload_path() -> String {
    "/api/upload".into()
}

fn default_history_path() -> String {
    "/api/history".into()
}

fn default_status_path() -> String {
    "/api/me".into()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            chat: default_chat_path(),
            upload: default_upload_path(),
            history: default_history_path(),
            status: default_status_path(),
        }
    }
}

pub fn load_config(working_dir: Option<PathBuf>) -> Result<AppConfig, ConfigError> {
    let wd = working_dir.unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut config = AppConfig::default();

    // Global config first, then the project-local file on top
    if let Some(config_dir) = dirs::config_dir() {
        let global_path = config_dir.join("graphchat").join("config.json");
        if let Some(file_config) = read_config_file(&global_path)? {
            merge_config(&mut config, file_config);
        }
    }

    if let Some(file_config) = read_config_file(&wd.join("graphchat.json"))? {
        merge_config(&mut config, file_config);
    }

    apply_env(&mut config);

    Ok(config)
}

fn read_config_file(path: &std::path::Path) -> Result<Option<AppConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
    let parsed = serde_json::from_str(&content)
        .map_err(|e| ConfigError::Invalid(format!("{}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn merge_config(base: &mut AppConfig, overlay: AppConfig) {
    if overlay.base_url != default_base_url() {
        base.base_url = overlay.base_url;
    }
    let defaults = EndpointConfig::default();
    if overlay.endpoints.chat != defaults.chat {
        base.endpoints.chat = overlay.endpoints.chat;
    }
    if overlay.endpoints.upload != defaults.upload {
        base.endpoints.upload = overlay.endpoints.upload;
    }
    if overlay.endpoints.history != defaults.history {
        base.endpoints.history = overlay.endpoints.history;
    }
    if overlay.endpoints.status != defaults.status {
        base.endpoints.status = overlay.endpoints.status;
    }
    if overlay.data_dir != default_data_dir() {
        base.data_dir = overlay.data_dir;
    }
    if overlay.credentials_file.is_some() {
        base.credentials_file = overlay.credentials_file;
    }
    if overlay.debug {
        base.debug = true;
    }
}

fn apply_env(config: &mut AppConfig) {
    if let Ok(url) = std::env::var("GRAPHCHAT_BASE_URL") {
        if !url.is_empty() {
            config.base_url = url;
        }
    }
    if let Ok(token) = std::env::var("GRAPHCHAT_TOKEN") {
        if !token.is_empty() {
            config.token = Some(token);
        }
    }
}

impl AppConfig {
    pub fn credentials_path(&self) -> PathBuf {
        self.credentials_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("credentials.json"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("graphchat.log")
    }

    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
