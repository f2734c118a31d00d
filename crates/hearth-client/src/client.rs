//! HTTP identity client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hearth_session::{Identity, IdentityAction, IdentityClient};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{Error, ErrorResponse, Result};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity server client speaking the `?action=` protocol.
///
/// Every request is a `GET` on the endpoint with an `action` query
/// parameter. An `ident` answer carrying a `username` means an identity is
/// present; a missing or null `username` means there is none.
///
/// # Example
///
/// ```no_run
/// use hearth_client::HttpIdentityClient;
/// use hearth_session::IdentityAction;
///
/// # async fn example() -> hearth_client::Result<()> {
/// let client = HttpIdentityClient::builder()
///     .endpoint("https://id.example.org/session")
///     .build()?;
///
/// let identity = client.ident().await?;
/// println!("{:?}", identity.username);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpIdentityClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    endpoint: Option<Url>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpIdentityClient")
            .field("endpoint", &self.inner.endpoint.as_ref().map(Url::as_str))
            .field("timeout", &self.inner.timeout)
            .finish_non_exhaustive()
    }
}

/// Body of an identity answer.
#[derive(Debug, Default, Deserialize)]
struct IdentResponse {
    #[serde(default)]
    username: Option<String>,
}

impl HttpIdentityClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the default endpoint, if one was configured.
    pub fn endpoint(&self) -> Option<&Url> {
        self.inner.endpoint.as_ref()
    }

    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Ask the default endpoint who the current identity is.
    pub async fn ident(&self) -> Result<Identity> {
        let endpoint = self.default_endpoint()?;
        self.request(endpoint, IdentityAction::Ident).await
    }

    /// End the server-side session at the default endpoint.
    pub async fn logout(&self) -> Result<()> {
        let endpoint = self.default_endpoint()?;
        self.request(endpoint, IdentityAction::Logout).await?;
        Ok(())
    }

    /// Send one `action` request to `endpoint`.
    pub async fn request(&self, endpoint: &Url, action: IdentityAction) -> Result<Identity> {
        let url = Self::action_url(endpoint, action);
        debug!(url = %url, "Identity request");

        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.timeout)
            .send()
            .await?;

        self.handle_response(response, action).await
    }

    /// Build the request URL, keeping any query the endpoint already has.
    pub(crate) fn action_url(endpoint: &Url, action: IdentityAction) -> Url {
        let mut url = endpoint.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "action")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.extend_pairs(kept);
            query.append_pair("action", action.as_str());
        }
        url
    }

    fn default_endpoint(&self) -> Result<&Url> {
        self.inner
            .endpoint
            .as_ref()
            .ok_or_else(|| Error::Config("endpoint is required".to_string()))
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
        action: IdentityAction,
    ) -> Result<Identity> {
        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        let body = response.bytes().await?;
        if action == IdentityAction::Logout && body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Identity::anonymous());
        }

        let parsed: Option<IdentResponse> = serde_json::from_slice(&body)?;
        let username = parsed.unwrap_or_default().username;
        Ok(Identity { username })
    }

    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>().await {
            Ok(err) => Error::Api {
                status,
                message: err.message,
            },
            Err(_) => Error::Api {
                status,
                message: format!("HTTP {}", status),
            },
        }
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn identify(
        &self,
        endpoint: &Url,
        action: IdentityAction,
    ) -> hearth_session::Result<Identity> {
        Ok(self.request(endpoint, action).await?)
    }
}

/// Builder for creating an [`HttpIdentityClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    endpoint: Option<String>,
    auth_token: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the default identity endpoint.
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Set a bearer token sent with every request.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<HttpIdentityClient> {
        let endpoint = self.endpoint.as_deref().map(Url::parse).transpose()?;

        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| Error::Config("Invalid auth token".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("hearth-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(HttpIdentityClient {
            inner: Arc::new(ClientInner {
                http,
                endpoint,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
