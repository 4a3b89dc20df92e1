use std::sync::Arc;

use anyhow::{Context, Result};
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, RequestBuilder, Response};

pub const SERVICE_ACCOUNT_KEY_VAR: &str = "GOOGLE_SERVICE_ACCOUNT_KEY";
pub const PROJECT_ID_VAR: &str = "FIREBASE_PROJECT_ID";
pub const DATABASE_URL_VAR: &str = "FIREBASE_DATABASE_URL";

pub struct FirebaseConfig {
    pub project_id: String,
    pub database_url: String,
    service_account_key: String,
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("project_id", &self.project_id)
            .field("database_url", &self.database_url)
            .field("service_account_key", &"[REDACTED]")
            .finish()
    }
}

fn default_database_url(project_id: &str) -> String {
    format!("https://{project_id}-default-rtdb.firebaseio.com")
}

impl FirebaseConfig {
    pub fn new(
        service_account_key: String,
        project_id: String,
        database_url: Option<String>,
    ) -> Self {
        let database_url = database_url
            .map(|url| url.trim_end_matches('/').to_owned())
            .unwrap_or_else(|| default_database_url(&project_id));

        Self {
            project_id,
            database_url,
            service_account_key,
        }
    }

    pub fn from_env() -> Result<Self> {
        let service_account_key = std::env::var(SERVICE_ACCOUNT_KEY_VAR)
            .with_context(|| format!("{SERVICE_ACCOUNT_KEY_VAR} env var not set"))?;
        let project_id = std::env::var(PROJECT_ID_VAR)
            .with_context(|| format!("{PROJECT_ID_VAR} env var not set"))?;
        let database_url = std::env::var(DATABASE_URL_VAR).ok();

        Ok(Self::new(service_account_key, project_id, database_url))
    }
}

/// Authenticated HTTP access to Firebase REST endpoints, shared by the
/// database and messaging clients.
#[derive(Clone)]
pub struct FirebaseClient {
    token_provider: Arc<dyn TokenProvider>,
    client: Client,
}

impl FirebaseClient {
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        let token_provider: Arc<dyn TokenProvider> = Arc::new(
            CustomServiceAccount::from_json(&config.service_account_key)
                .context("invalid service account key")?,
        );

        Ok(Self {
            token_provider,
            client: Client::new(),
        })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    async fn access_token(&self, scopes: &[&str]) -> Result<String> {
        let token = self.token_provider.token(scopes).await?;
        Ok(token.as_str().to_owned())
    }

    pub(crate) async fn send_authenticated(
        &self,
        req: RequestBuilder,
        scopes: &[&str],
    ) -> Result<Response> {
        let token = self.access_token(scopes).await?;
        Ok(req.bearer_auth(&token).send().await?.error_for_status()?)
    }
}
