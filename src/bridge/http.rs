use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{BridgeError, SessionApi};
use crate::session::BoxFuture;

const SESSION_ENDPOINT: &str = "/api/auth/session";
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// Calls the session endpoints over HTTP, keeping the session cookie in its own cookie jar.
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: Client,
    endpoint: Url,
}

impl HttpSessionApi {
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .cookie_store(true)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        Self::with_client(client, base_url)
    }

    /// Use an existing client, e.g. one that shares a cookie jar with page requests.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, BridgeError> {
        let endpoint = Url::parse(base_url)?.join(SESSION_ENDPOINT)?;
        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    #[instrument(skip_all)]
    async fn post_session(&self, id_token: SecretString) -> Result<(), BridgeError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&json!({ "idToken": id_token.expose_secret() }))
            .send()
            .await?;
        expect_success(response.status())?;
        debug!("server session created");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn delete(&self) -> Result<(), BridgeError> {
        let response = self.client.delete(self.endpoint.clone()).send().await?;
        expect_success(response.status())?;
        debug!("server session deleted");
        Ok(())
    }

    async fn present(&self) -> Result<bool, BridgeError> {
        let response = self.client.get(self.endpoint.clone()).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NO_CONTENT => Ok(false),
            status => Err(BridgeError::Status(status)),
        }
    }
}

impl SessionApi for HttpSessionApi {
    fn create_session(&self, id_token: SecretString) -> BoxFuture<'_, Result<(), BridgeError>> {
        Box::pin(self.post_session(id_token))
    }

    fn delete_session(&self) -> BoxFuture<'_, Result<(), BridgeError>> {
        Box::pin(self.delete())
    }

    fn session_present(&self) -> BoxFuture<'_, Result<bool, BridgeError>> {
        Box::pin(self.present())
    }
}

fn expect_success(status: StatusCode) -> Result<(), BridgeError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(BridgeError::Status(status))
    }
}
