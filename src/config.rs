use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Runtime settings.
///
/// Layered as: built-in defaults, then an optional config file, then
/// environment variables (`MONGODB_URI`, `SMTP_HOST`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
    pub mongodb_username: Option<String>,
    pub mongodb_password: Option<String>,

    /// Bearer token for `/api/admin`. Admin routes reject everything when unset.
    pub admin_token: Option<String>,

    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub mail_from: String,
    /// Receives contact and application notifications.
    pub admin_email: Option<String>,

    /// Public origin of the marketing site, used in the sitemap and CORS.
    pub site_url: String,
    pub bind_addr: String,

    pub cache_ttl_secs: u64,
    pub broadcast_batch_size: usize,
    pub broadcast_delay_ms: u64,
    pub jobs_timeout_ms: u64,

    pub demo_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mongodb_uri: None,
            mongodb_database: "agency".to_string(),
            mongodb_username: None,
            mongodb_password: None,
            admin_token: None,
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            mail_from: "Agency <hello@agency.local>".to_string(),
            admin_email: None,
            site_url: "http://localhost:3000".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            cache_ttl_secs: 60,
            broadcast_batch_size: 10,
            broadcast_delay_ms: 1000,
            jobs_timeout_ms: 5000,
            demo_mode: false,
        }
    }
}

impl Settings {
    /// Load settings from `path` (if it exists) and the process environment.
    pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(settings.normalized())
    }

    /// Treat blank strings from the environment as unset.
    fn normalized(mut self) -> Self {
        for value in [
            &mut self.mongodb_uri,
            &mut self.mongodb_username,
            &mut self.mongodb_password,
            &mut self.admin_token,
            &mut self.smtp_host,
            &mut self.smtp_username,
            &mut self.smtp_password,
            &mut self.admin_email,
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *value = None;
            }
        }
        self.site_url = self.site_url.trim_end_matches('/').to_string();
        self.broadcast_batch_size = self.broadcast_batch_size.max(1);
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn jobs_timeout(&self) -> Duration {
        Duration::from_millis(self.jobs_timeout_ms)
    }

    pub fn broadcast_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast_delay_ms)
    }
}
