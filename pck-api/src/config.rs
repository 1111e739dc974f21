//! HTTP-layer configuration: CORS only.
//!
//! Everything else tunable about this service (graph depth, simulate
//! and counterfactual thresholds, the LLM timeout) lives in
//! `pck_core::PckConfig`; this type only covers the transport concerns
//! that have no meaning below the HTTP layer, loaded the same
//! `from_env()`-with-fallback way as the rest of this lineage's config
//! types.

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins. Empty means allow any origin.
    pub cors_origins: Vec<String>,
    pub cors_allow_credentials: bool,
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86_400,
        }
    }
}

impl ApiConfig {
    /// Environment variables:
    /// - `PCK_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `PCK_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `PCK_CORS_MAX_AGE_SECS`: preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("PCK_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("PCK_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("PCK_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
        }
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }
        self.cors_origins.iter().any(|allowed| allowed == origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_allows_any_origin() {
        let config = ApiConfig::default();
        assert!(config.is_origin_allowed("https://anything.example"));
    }

    #[test]
    fn configured_origins_are_allow_listed() {
        let mut config = ApiConfig::default();
        config.cors_origins = vec!["https://pck.run".to_string()];
        assert!(config.is_origin_allowed("https://pck.run"));
        assert!(!config.is_origin_allowed("https://evil.example"));
    }
}
