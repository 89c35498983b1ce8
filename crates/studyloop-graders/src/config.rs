//! Configuration loading and grader factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use studyloop_core::grading::EngineConfig;
use studyloop_core::model::GradingMode;
use studyloop_core::traits::FreeTextGrader;

use crate::anthropic::AnthropicGrader;
use crate::mock::MockGrader;
use crate::openai::OpenAiGrader;

/// The free-text grading service to use.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraderConfig {
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        model: Option<String>,
    },
    /// Awards full marks without any network traffic. Useful for demos.
    Mock,
}

impl std::fmt::Debug for GraderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraderConfig::Anthropic {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            GraderConfig::OpenAI {
                api_key: _,
                base_url,
                model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .finish(),
            GraderConfig::Mock => f.write_str("Mock"),
        }
    }
}

/// Top-level studyloop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyloopConfig {
    /// Free-text grader. Without one, AI grading requests fall back to auto.
    #[serde(default)]
    pub grader: Option<GraderConfig>,
    /// Upper bound on a single grading call, in seconds.
    #[serde(default = "default_grader_timeout")]
    pub grader_timeout_secs: u64,
    /// Directory holding one JSON record per learner.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Grading mode used when a submission does not name one.
    #[serde(default)]
    pub default_grading_mode: GradingMode,
}

fn default_grader_timeout() -> u64 {
    30
}
fn default_state_dir() -> PathBuf {
    PathBuf::from("./studyloop-state")
}

impl Default for StudyloopConfig {
    fn default() -> Self {
        Self {
            grader: None,
            grader_timeout_secs: default_grader_timeout(),
            state_dir: default_state_dir(),
            default_grading_mode: GradingMode::default(),
        }
    }
}

impl StudyloopConfig {
    /// Engine settings derived from this configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            grader_timeout: Duration::from_secs(self.grader_timeout_secs.max(1)),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_grader_config(config: &GraderConfig) -> GraderConfig {
    let resolve = |s: &Option<String>| s.as_deref().map(resolve_env_vars);
    match config {
        GraderConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => GraderConfig::Anthropic {
            api_key: resolve_env_vars(api_key),
            base_url: resolve(base_url),
            model: resolve(model),
        },
        GraderConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => GraderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: resolve(base_url),
            model: resolve(model),
        },
        GraderConfig::Mock => GraderConfig::Mock,
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `studyloop.toml` in the current directory
/// 2. `~/.config/studyloop/config.toml`
///
/// Environment variable overrides: `STUDYLOOP_ANTHROPIC_KEY`, `STUDYLOOP_OPENAI_KEY`.
pub fn load_config() -> Result<StudyloopConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<StudyloopConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("studyloop.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<StudyloopConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => StudyloopConfig::default(),
    };

    config.grader = config.grader.as_ref().map(resolve_grader_config);
    apply_key_overrides(&mut config);
    Ok(config)
}

/// A key from the environment replaces the configured one for the matching
/// grader type, or selects that grader when none is configured.
fn apply_key_overrides(config: &mut StudyloopConfig) {
    if let Ok(key) = std::env::var("STUDYLOOP_ANTHROPIC_KEY") {
        match &mut config.grader {
            Some(GraderConfig::Anthropic { api_key, .. }) => *api_key = key,
            None => {
                config.grader = Some(GraderConfig::Anthropic {
                    api_key: key,
                    base_url: None,
                    model: None,
                })
            }
            Some(_) => {}
        }
    }

    if let Ok(key) = std::env::var("STUDYLOOP_OPENAI_KEY") {
        match &mut config.grader {
            Some(GraderConfig::OpenAI { api_key, .. }) => *api_key = key,
            None => {
                config.grader = Some(GraderConfig::OpenAI {
                    api_key: key,
                    base_url: None,
                    model: None,
                })
            }
            Some(_) => {}
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("studyloop"))
}

/// Create a grader instance from its configuration.
pub fn create_grader(config: &GraderConfig) -> Result<Arc<dyn FreeTextGrader>> {
    match config {
        GraderConfig::Anthropic {
            api_key,
            base_url,
            model,
        } => {
            anyhow::ensure!(!api_key.is_empty(), "anthropic grader has an empty api_key");
            Ok(Arc::new(AnthropicGrader::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )))
        }
        GraderConfig::OpenAI {
            api_key,
            base_url,
            model,
        } => {
            anyhow::ensure!(!api_key.is_empty(), "openai grader has an empty api_key");
            Ok(Arc::new(OpenAiGrader::new(
                api_key,
                base_url.clone(),
                model.clone(),
            )))
        }
        GraderConfig::Mock => Ok(Arc::new(MockGrader::full_marks())),
    }
}
