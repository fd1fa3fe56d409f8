use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use guardchat_chat::SessionConfig;
use guardchat_llm::{LLAMA_CPP_PROVIDER_ID, Model, ProviderConfig};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/v1";
/// llama-server ignores the key unless started with `--api-key`.
pub const DEFAULT_API_KEY: &str = "local";
pub const DEFAULT_MODEL_PATH: &str = "./models/Qwen3-8B-Q8_0.gguf";
pub const SETTINGS_DIRECTORY_NAME: &str = "guardchat";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "GUARDCHAT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_provider_id")]
    pub provider_id: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            provider_id: default_provider_id(),
            api_key: default_api_key(),
            endpoint: default_endpoint(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_think_mode")]
    pub think_mode: bool,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    /// Replaces the built-in SSN policy when set.
    #[serde(default)]
    pub policy_preamble: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            model_path: default_model_path(),
            think_mode: default_think_mode(),
            temperature: None,
            max_tokens: None,
            policy_preamble: None,
        }
    }
}

impl Settings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".guardchat"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Defaults, then the JSON file, then `GUARDCHAT_*` variables.
    ///
    /// Nested keys use a double underscore: `GUARDCHAT_ENGINE__ENDPOINT`.
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Json::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads settings; unreadable input is logged and replaced by defaults.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }

        match Self::figment(path).extract::<Settings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                Settings::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.engine.provider_id = if self.engine.provider_id.trim().is_empty() {
            default_provider_id()
        } else {
            self.engine.provider_id.trim().to_string()
        };
        self.engine.api_key = if self.engine.api_key.trim().is_empty() {
            default_api_key()
        } else {
            self.engine.api_key.trim().to_string()
        };
        self.engine.endpoint = if self.engine.endpoint.trim().is_empty() {
            default_endpoint()
        } else {
            self.engine.endpoint.trim().to_string()
        };
        if self.model_path.as_os_str().is_empty() {
            self.model_path = default_model_path();
        }
        self.policy_preamble = self
            .policy_preamble
            .map(|preamble| preamble.trim().to_string())
            .filter(|preamble| !preamble.is_empty());

        self
    }

    /// Command-line flags win over every other source.
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(model_path) = &cli.model_path {
            self.model_path = model_path.clone();
        }
        if cli.nothink {
            self.think_mode = false;
        }
        if let Some(endpoint) = &cli.endpoint {
            self.engine.endpoint = endpoint.clone();
        }
        self.normalized()
    }

    pub fn model(&self) -> Model {
        Model::from_path(&self.model_path)
    }

    pub fn to_provider_config(&self) -> ProviderConfig {
        ProviderConfig::new(
            &self.engine.provider_id,
            &self.engine.api_key,
            &self.engine.endpoint,
        )
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(self.model().id, self.think_mode);
        if let Some(preamble) = &self.policy_preamble {
            config = config.with_policy_preamble(preamble.clone());
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        config
    }
}

fn default_provider_id() -> String {
    LLAMA_CPP_PROVIDER_ID.to_string()
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model_path() -> PathBuf {
    PathBuf::from(DEFAULT_MODEL_PATH)
}

fn default_think_mode() -> bool {
    true
}
