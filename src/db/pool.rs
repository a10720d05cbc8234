use tokio::sync::OnceCell;

use crate::config::Settings;
use crate::error::AppError;

/// Lazily-initialised MongoDB client shared by every repository.
///
/// The client is created on first use and reused for the lifetime of the
/// process. A missing connection string is reported as `Unavailable` on
/// each access instead of aborting startup.
pub struct MongoPool {
    uri: Option<String>,
    database: String,
    client: OnceCell<mongodb::Client>,
}

impl MongoPool {
    pub fn new(uri: Option<String>, database: impl Into<String>) -> Self {
        Self {
            uri,
            database: database.into(),
            client: OnceCell::new(),
        }
    }

    /// Build the pool from settings, injecting separate credentials if given.
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let uri = match settings.mongodb_uri.as_deref().filter(|u| !u.is_empty()) {
            Some(uri) => Some(inject_credentials(
                uri,
                settings.mongodb_username.as_deref(),
                settings.mongodb_password.as_deref(),
            )?),
            None => None,
        };
        Ok(Self::new(uri, settings.mongodb_database.clone()))
    }

    pub fn is_configured(&self) -> bool {
        self.uri.is_some()
    }

    async fn client(&self) -> Result<&mongodb::Client, AppError> {
        let uri = self
            .uri
            .as_deref()
            .ok_or_else(|| AppError::Unavailable("MONGODB_URI is not set".into()))?;

        self.client
            .get_or_try_init(|| async {
                tracing::info!(database = %self.database, "Opening MongoDB client");
                mongodb::Client::with_uri_str(uri)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .await
    }

    pub async fn database(&self) -> Result<mongodb::Database, AppError> {
        Ok(self.client().await?.database(&self.database))
    }

    pub async fn collection<T: Send + Sync>(
        &self,
        name: &str,
    ) -> Result<mongodb::Collection<T>, AppError> {
        Ok(self.database().await?.collection(name))
    }
}

/// Put username/password into a MongoDB URI that does not carry them.
pub fn inject_credentials(
    uri: &str,
    username: Option<&str>,
    password: Option<&str>,
) -> Result<String, AppError> {
    let Some(username) = username.filter(|u| !u.is_empty()) else {
        return Ok(uri.to_string());
    };

    let mut parsed = url::Url::parse(uri)
        .map_err(|e| AppError::Internal(format!("Invalid MONGODB_URI: {e}")))?;

    if !parsed.username().is_empty() {
        return Ok(uri.to_string());
    }

    parsed
        .set_username(username)
        .map_err(|_| AppError::Internal("MONGODB_URI cannot carry credentials".into()))?;
    parsed
        .set_password(password)
        .map_err(|_| AppError::Internal("MONGODB_URI cannot carry credentials".into()))?;

    Ok(parsed.to_string())
}
