use clap::Parser;
use std::path::PathBuf;

use crate::classifier::ModelSource;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "PCOS risk prediction API", long_about = None)]
pub struct ServerConfig {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Local path to the serialized classifier
    #[arg(long, env = "MODEL_PATH", default_value = "./Model/pcos_risk_model.json")]
    pub model_path: PathBuf,

    /// Model repository on Hugging Face Hub; takes precedence over --model-path
    #[arg(long, env = "MODEL_ID")]
    pub model_id: Option<String>,

    /// Model revision/branch on Hugging Face
    #[arg(long, env = "MODEL_REVISION", default_value = "main")]
    pub model_revision: String,

    /// Artifact file name inside the Hub repository
    #[arg(long, env = "MODEL_FILE", default_value = "pcos_risk_model.json")]
    pub model_file: String,

    /// The single origin browsers may call the API from
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = "http://localhost:8080")]
    pub allowed_origin: String,

    /// Allow any origin instead of --allowed-origin
    #[arg(long, env = "CORS_PERMISSIVE")]
    pub cors_permissive: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl ServerConfig {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cors_policy(&self) -> CorsPolicy {
        if self.cors_permissive {
            CorsPolicy::AnyOrigin
        } else {
            CorsPolicy::SingleOrigin(self.allowed_origin.clone())
        }
    }
}

impl From<&ServerConfig> for ModelSource {
    fn from(config: &ServerConfig) -> Self {
        match &config.model_id {
            Some(repo_id) => ModelSource::Hub {
                repo_id: repo_id.clone(),
                revision: config.model_revision.clone(),
                filename: config.model_file.clone(),
            },
            None => ModelSource::Local(config.model_path.clone()),
        }
    }
}

/// Cross-origin policy. Exactly one is active; the two are never layered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    SingleOrigin(String),
    AnyOrigin,
}

#[derive(Debug, Clone, Parser)]
#[command(author, version, about = "Menstrual health chatbot", long_about = None)]
pub struct RelayConfig {
    /// API key for the Gemini API
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Generative model to talk to
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-pro")]
    pub model: String,

    /// Base URL of the Generative Language API
    #[arg(
        long,
        env = "GEMINI_BASE_URL",
        default_value = "https://generativelanguage.googleapis.com"
    )]
    pub base_url: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_model_by_default() {
        let config = ServerConfig::parse_from(["pcos-risk-server", "--port", "5001"]);
        assert!(config.server_address().ends_with(":5001"));
        assert_eq!(
            ModelSource::from(&config),
            ModelSource::Local(PathBuf::from("./Model/pcos_risk_model.json"))
        );
        assert_eq!(
            config.cors_policy(),
            CorsPolicy::SingleOrigin("http://localhost:8080".to_string())
        );
    }

    #[test]
    fn model_id_selects_hub() {
        let config = ServerConfig::parse_from([
            "pcos-risk-server",
            "--model-id",
            "someone/pcos",
            "--model-revision",
            "v2",
            "--cors-permissive",
        ]);
        assert_eq!(
            ModelSource::from(&config),
            ModelSource::Hub {
                repo_id: "someone/pcos".to_string(),
                revision: "v2".to_string(),
                filename: "pcos_risk_model.json".to_string(),
            }
        );
        assert_eq!(config.cors_policy(), CorsPolicy::AnyOrigin);
    }

    #[test]
    fn relay_defaults() {
        let config = RelayConfig::parse_from(["health-chat", "--api-key", "k"]);
        assert_eq!(config.model, "gemini-1.5-pro");
        assert_eq!(config.api_key, "k");
    }
}
