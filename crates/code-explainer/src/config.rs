//! Configuration read from the environment at startup.
//!
//! Variables in a `.env` file take precedence over the process environment.

use std::env;
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};

use code_explainer_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SESSION_DB: &str = "programming_convo.db";
const DEFAULT_SESSION_ID: &str = "programming_convo";
const IN_MEMORY_DB: &str = ":memory:";

/// Errors found while reading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable is set to something unusable.
    #[error("{name} has an invalid value {value:?}, expected {expected}")]
    Invalid {
        /// Name of the variable.
        name: &'static str,
        /// The rejected value.
        value: String,
        /// What would have been accepted.
        expected: &'static str,
    },
}

/// How the triage agent decides between explaining and handing off.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RouterKind {
    /// Ask the model whether the input contains a code snippet.
    #[default]
    Model,
    /// Detect code snippets locally.
    Heuristic,
}

/// Where the conversation history is kept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionLocation {
    /// A SQLite database file.
    File(PathBuf),
    /// A database that disappears with the process.
    Memory,
}

/// Per-role model overrides. `None` uses the default model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleModels {
    /// Model of the guardrail agent.
    pub guardrail: Option<String>,
    /// Model of the code explainer agent.
    pub explainer: Option<String>,
    /// Model of the language detector agent.
    pub detector: Option<String>,
    /// Model of the fallback programming agent.
    pub fallback: Option<String>,
    /// Model of the triage agent and the model router.
    pub triage: Option<String>,
}

/// Everything the program reads from its environment, read once at
/// startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// API key of the model service.
    pub api_key: String,
    /// Base URL of the model service, if not the public OpenAI one.
    pub base_url: Option<String>,
    /// Model used by every role without an override.
    pub default_model: String,
    /// Per-role model overrides.
    pub models: RoleModels,
    /// Where the session lives.
    pub session_location: SessionLocation,
    /// Id of the session in the store.
    pub session_id: String,
    /// The router of the triage agent.
    pub router: RouterKind,
}

impl Config {
    /// Loads the nearest `.env` file into the process environment, replacing
    /// variables that are already set, then reads the configuration.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv_override() {
            Ok(path) => debug!(path = %path.display(), "loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => warn!("ignoring .env file: {err}"),
        }
        Self::from_env()
    }

    /// Like [`Config::load`], with the `.env` file at `path`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match dotenvy::from_path_override(path) {
            Ok(()) => debug!(path = %path.display(), "loaded .env file"),
            Err(err) if err.not_found() => {}
            Err(err) => {
                warn!(path = %path.display(), "ignoring .env file: {err}");
            }
        }
        Self::from_env()
    }

    /// Reads the configuration from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Reads the configuration through `var`, which looks up a variable by
    /// name. Empty values count as unset.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| var(name).filter(|value| !value.is_empty());

        let api_key =
            var("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let router = match var("CODE_EXPLAINER_ROUTER") {
            None => RouterKind::default(),
            Some(value) if value.eq_ignore_ascii_case("model") => RouterKind::Model,
            Some(value) if value.eq_ignore_ascii_case("heuristic") => {
                RouterKind::Heuristic
            }
            Some(value) => {
                return Err(ConfigError::Invalid {
                    name: "CODE_EXPLAINER_ROUTER",
                    value,
                    expected: "`model` or `heuristic`",
                });
            }
        };

        let session_location = match var("CODE_EXPLAINER_SESSION_DB") {
            Some(path) if path == IN_MEMORY_DB => SessionLocation::Memory,
            Some(path) => SessionLocation::File(path.into()),
            None => SessionLocation::File(DEFAULT_SESSION_DB.into()),
        };

        Ok(Self {
            api_key,
            base_url: var("OPENAI_BASE_URL"),
            default_model: var("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            models: RoleModels {
                guardrail: var("CODE_EXPLAINER_GUARDRAIL_MODEL"),
                explainer: var("CODE_EXPLAINER_EXPLAINER_MODEL"),
                detector: var("CODE_EXPLAINER_DETECTOR_MODEL"),
                fallback: var("CODE_EXPLAINER_FALLBACK_MODEL"),
                triage: var("CODE_EXPLAINER_TRIAGE_MODEL"),
            },
            session_location,
            session_id: var("CODE_EXPLAINER_SESSION_ID")
                .unwrap_or_else(|| DEFAULT_SESSION_ID.to_owned()),
            router,
        })
    }

    /// Returns the configuration of the model provider.
    pub fn openai_config(&self) -> OpenAIConfig {
        let mut builder =
            OpenAIConfigBuilder::with_api_key(self.api_key.clone())
                .with_model(self.default_model.clone());
        if let Some(base_url) = &self.base_url {
            builder = builder.with_base_url(base_url.clone());
        }
        builder.build()
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("models", &self.models)
            .field("session_location", &self.session_location)
            .field("session_id", &self.session_id)
            .field("router", &self.router)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(config.default_model, "gpt-4o-mini");
        assert_eq!(config.base_url, None);
        assert_eq!(config.models, RoleModels::default());
        assert_eq!(
            config.session_location,
            SessionLocation::File("programming_convo.db".into())
        );
        assert_eq!(config.session_id, "programming_convo");
        assert_eq!(config.router, RouterKind::Model);
        assert!(!format!("{config:?}").contains("sk-test"));

        let openai = config.openai_config();
        assert_eq!(openai.model(), "gpt-4o-mini");
        assert_eq!(openai.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("OPENAI_MODEL", "local-model"),
            ("CODE_EXPLAINER_GUARDRAIL_MODEL", "tiny-model"),
            ("CODE_EXPLAINER_SESSION_DB", ":memory:"),
            ("CODE_EXPLAINER_SESSION_ID", "other"),
            ("CODE_EXPLAINER_ROUTER", "Heuristic"),
        ])
        .unwrap();
        assert_eq!(config.models.guardrail.as_deref(), Some("tiny-model"));
        assert_eq!(config.models.triage, None);
        assert_eq!(config.session_location, SessionLocation::Memory);
        assert_eq!(config.session_id, "other");
        assert_eq!(config.router, RouterKind::Heuristic);

        let openai = config.openai_config();
        assert_eq!(openai.model(), "local-model");
        assert_eq!(openai.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_invalid_values() {
        let err = config(&[("OPENAI_API_KEY", "")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENAI_API_KEY")));

        let err = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("CODE_EXPLAINER_ROUTER", "random"),
        ])
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "CODE_EXPLAINER_ROUTER has an invalid value \"random\", expected \
             `model` or `heuristic`"
        );
    }

    // The only test in this binary that touches the process environment.
    #[test]
    fn test_env_file_overrides_process_env() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".env");
        fs::write(
            &path,
            "OPENAI_API_KEY=sk-from-file\n\
             CODE_EXPLAINER_SESSION_ID=\"from file\"\n\
             CODE_EXPLAINER_ROUTER=heuristic\n",
        )
        .unwrap();
        // SAFETY: no other test reads or writes the process environment.
        unsafe { env::set_var("CODE_EXPLAINER_SESSION_ID", "from-process") };

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_key, "sk-from-file");
        assert_eq!(config.session_id, "from file");
        assert_eq!(config.router, RouterKind::Heuristic);

        // A missing file leaves the environment as loaded so far.
        let missing = temp_dir.path().join("missing");
        let config = Config::load_from(missing).unwrap();
        assert_eq!(config.api_key, "sk-from-file");
    }
}
