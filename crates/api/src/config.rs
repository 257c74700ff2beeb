use std::path::PathBuf;

/// Which image generation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    Gemini,
    Mock,
}

/// Which text generation backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextProvider {
    Anthropic,
    Mock,
}

impl ImageProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        }
    }
}

impl TextProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Mock => "mock",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Text response cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub path: PathBuf,
    pub ttl_days: i64,
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3001`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `600`). Batch generation in
    /// JSON mode holds the request open for the whole run.
    pub request_timeout_secs: u64,
    /// Filesystem storage root (default: `./projects`).
    pub projects_path: PathBuf,
    pub cache: CacheConfig,
    pub image_provider: ImageProvider,
    pub text_provider: TextProvider,
    pub google_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub default_image_model: String,
    pub default_text_model: String,
}

impl ServerConfig {
    /// Load configuration from the process environment (after `.env`).
    ///
    /// | Env Var                | Default                                   |
    /// |------------------------|-------------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                                 |
    /// | `PORT`                 | `3001`                                    |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`                   |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                                     |
    /// | `PROJECTS_PATH`        | `./projects`                              |
    /// | `CACHE_ENABLED`        | `true`                                    |
    /// | `CACHE_PATH`           | `./.cache`                                |
    /// | `CACHE_TTL_DAYS`       | `7`                                       |
    /// | `IMAGE_PROVIDER`       | `gemini` with `GOOGLE_AI_API_KEY`, else `mock` |
    /// | `TEXT_PROVIDER`        | `anthropic` with `ANTHROPIC_API_KEY`, else `mock` |
    /// | `GOOGLE_AI_API_KEY`    | unset                                     |
    /// | `ANTHROPIC_API_KEY`    | unset                                     |
    /// | `DEFAULT_IMAGE_MODEL`  | `gemini-2.5-flash-image`                  |
    /// | `DEFAULT_TEXT_MODEL`   | `claude-opus-4-5-20251101`                |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse("PORT", &var("PORT", "3001"), "a valid port number")?;
        let request_timeout_secs = parse(
            "REQUEST_TIMEOUT_SECS",
            &var("REQUEST_TIMEOUT_SECS", "600"),
            "a number of seconds",
        )?;
        let ttl_days = parse("CACHE_TTL_DAYS", &var("CACHE_TTL_DAYS", "7"), "a number of days")?;
        let cache_enabled = match var("CACHE_ENABLED", "true").to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(ConfigError::Invalid {
                    var: "CACHE_ENABLED",
                    expected: "true or false",
                    value: other.to_string(),
                })
            }
        };

        let google_api_key = secret("GOOGLE_AI_API_KEY");
        let anthropic_api_key = secret("ANTHROPIC_API_KEY");

        let image_default = if google_api_key.is_some() { "gemini" } else { "mock" };
        let image_provider = match var("IMAGE_PROVIDER", image_default).as_str() {
            "gemini" => ImageProvider::Gemini,
            "mock" => ImageProvider::Mock,
            other => {
                return Err(ConfigError::Invalid {
                    var: "IMAGE_PROVIDER",
                    expected: "gemini or mock",
                    value: other.to_string(),
                })
            }
        };
        let text_default = if anthropic_api_key.is_some() { "anthropic" } else { "mock" };
        let text_provider = match var("TEXT_PROVIDER", text_default).as_str() {
            "anthropic" => TextProvider::Anthropic,
            "mock" => TextProvider::Mock,
            other => {
                return Err(ConfigError::Invalid {
                    var: "TEXT_PROVIDER",
                    expected: "anthropic or mock",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host: var("HOST", "0.0.0.0"),
            port,
            cors_origins: var("CORS_ORIGINS", "http://localhost:5173")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            request_timeout_secs,
            projects_path: PathBuf::from(var("PROJECTS_PATH", "./projects")),
            cache: CacheConfig {
                enabled: cache_enabled,
                path: PathBuf::from(var("CACHE_PATH", "./.cache")),
                ttl_days,
            },
            image_provider,
            text_provider,
            google_api_key,
            anthropic_api_key,
            default_image_model: var("DEFAULT_IMAGE_MODEL", "gemini-2.5-flash-image"),
            default_text_model: var("DEFAULT_TEXT_MODEL", "claude-opus-4-5-20251101"),
        })
    }
}

fn parse<T: std::str::FromStr>(
    var: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        expected,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_select_mock_providers() {
        let c = config(&[]).unwrap();
        assert_eq!(c.port, 3001);
        assert_eq!(c.request_timeout_secs, 600);
        assert_eq!(c.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(c.image_provider, ImageProvider::Mock);
        assert_eq!(c.text_provider, TextProvider::Mock);
        assert!(c.cache.enabled);
        assert_eq!(c.cache.ttl_days, 7);
        assert_eq!(c.default_text_model, "claude-opus-4-5-20251101");
    }

    #[test]
    fn keys_select_real_providers() {
        let c = config(&[("GOOGLE_AI_API_KEY", "g"), ("ANTHROPIC_API_KEY", "a")]).unwrap();
        assert_eq!(c.image_provider, ImageProvider::Gemini);
        assert_eq!(c.text_provider, TextProvider::Anthropic);

        let forced = config(&[("GOOGLE_AI_API_KEY", "g"), ("IMAGE_PROVIDER", "mock")]).unwrap();
        assert_eq!(forced.image_provider, ImageProvider::Mock);
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let c = config(&[("CORS_ORIGINS", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(c.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert_matches!(
            config(&[("PORT", "not-a-port")]),
            Err(ConfigError::Invalid { var: "PORT", .. })
        );
        assert_matches!(
            config(&[("IMAGE_PROVIDER", "dalle")]),
            Err(ConfigError::Invalid { var: "IMAGE_PROVIDER", .. })
        );
        assert_matches!(
            config(&[("CACHE_ENABLED", "maybe")]),
            Err(ConfigError::Invalid { var: "CACHE_ENABLED", .. })
        );
    }
}
