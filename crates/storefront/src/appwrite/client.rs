//! REST client for the hosted backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::databases::Databases;
use super::types::{Account, ErrorBody, OAuthProvider, Session};
use super::AppwriteError;
use crate::config::AppwriteConfig;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Which credentials a request is made with.
#[derive(Debug, Clone, Copy)]
pub enum Credentials<'a> {
    /// Project header only.
    Public,
    /// Server API key, if one is configured (otherwise same as `Public`).
    Server,
    /// A customer's session secret.
    Session(&'a SecretString),
}

/// A freshly created session and the secret that authenticates it.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session: Session,
    pub secret: SecretString,
}

/// Backend version reported by the health endpoint.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HealthVersion {
    #[serde(default)]
    pub version: String,
}

// =============================================================================
// AppwriteClient
// =============================================================================

/// Client for the hosted backend REST API.
#[derive(Clone)]
pub struct AppwriteClient {
    inner: Arc<AppwriteClientInner>,
}

struct AppwriteClientInner {
    http: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for AppwriteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppwriteClient")
            .field("endpoint", &self.inner.endpoint)
            .field("project_id", &self.inner.project_id)
            .field("api_key", &self.inner.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AppwriteClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the project id is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &AppwriteConfig) -> Result<Self, AppwriteError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Appwrite-Project",
            HeaderValue::from_str(&config.project_id)
                .map_err(|_| AppwriteError::InvalidHeader("X-Appwrite-Project"))?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(AppwriteClientInner {
                http,
                endpoint: config.endpoint.trim_end_matches('/').to_string(),
                project_id: config.project_id.clone(),
                api_key: config.api_key.clone(),
            }),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    #[must_use]
    pub fn project_id(&self) -> &str {
        &self.inner.project_id
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.inner.api_key.is_some()
    }

    /// A document store handle for one database.
    ///
    /// With a session the handle acts as that customer; without one it uses
    /// the server API key.
    #[must_use]
    pub fn databases(&self, database_id: &str, session: Option<SecretString>) -> Databases {
        Databases::new(self.clone(), database_id, session)
    }

    /// Send a request and map non-success responses to [`AppwriteError::Api`].
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        credentials: Credentials<'_>,
    ) -> Result<reqwest::Response, AppwriteError> {
        let mut url = format!("{}{path}", self.inner.endpoint);
        if !query.is_empty() {
            let pairs: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&pairs.join("&"));
        }

        let mut request = self.inner.http.request(method.clone(), &url);

        match credentials {
            Credentials::Public => {}
            Credentials::Server => {
                if let Some(key) = &self.inner.api_key {
                    request = request.header(
                        "X-Appwrite-Key",
                        HeaderValue::from_str(key.expose_secret())
                            .map_err(|_| AppwriteError::InvalidHeader("X-Appwrite-Key"))?,
                    );
                }
            }
            Credentials::Session(secret) => {
                request = request.header(
                    "X-Appwrite-Session",
                    HeaderValue::from_str(secret.expose_secret())
                        .map_err(|_| AppwriteError::InvalidHeader("X-Appwrite-Session"))?,
                );
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let message = if parsed.message.is_empty() {
            format!(
                "HTTP {status}: {}",
                text.chars().take(200).collect::<String>()
            )
        } else {
            parsed.message
        };
        let code = if parsed.code == 0 {
            status.as_u16()
        } else {
            parsed.code
        };

        if status.is_server_error() {
            warn!(%method, path, code, kind = %parsed.kind, %message, "Backend returned server error");
        } else {
            debug!(%method, path, code, kind = %parsed.kind, %message, "Backend rejected request");
        }

        Err(AppwriteError::Api {
            code,
            kind: parsed.kind,
            message,
        })
    }

    /// Send a request and decode the JSON response.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        credentials: Credentials<'_>,
    ) -> Result<T, AppwriteError> {
        let response = self.send(method, path, query, body, credentials).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            AppwriteError::Parse(e)
        })
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns 409 if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
        name: Option<&str>,
    ) -> Result<Account, AppwriteError> {
        let mut body = json!({
            "userId": "unique()",
            "email": email,
            "password": password.expose_secret(),
        });
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            body["name"] = json!(name);
        }
        self.call(Method::POST, "/account", &[], Some(&body), Credentials::Public)
            .await
    }

    /// Create an email/password session.
    ///
    /// # Errors
    ///
    /// Returns 401 for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn create_email_session(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<NewSession, AppwriteError> {
        let body = json!({
            "email": email,
            "password": password.expose_secret(),
        });
        let response = self
            .send(
                Method::POST,
                "/account/sessions/email",
                &[],
                Some(&body),
                Credentials::Server,
            )
            .await?;
        self.read_new_session(response).await
    }

    /// Exchange an OAuth2 / magic token for a session.
    ///
    /// # Errors
    ///
    /// Returns 401 if the token is invalid or expired.
    #[instrument(skip(self, secret))]
    pub async fn create_token_session(
        &self,
        user_id: &str,
        secret: &str,
    ) -> Result<NewSession, AppwriteError> {
        let body = json!({ "userId": user_id, "secret": secret });
        let response = self
            .send(
                Method::POST,
                "/account/sessions/token",
                &[],
                Some(&body),
                Credentials::Server,
            )
            .await?;
        self.read_new_session(response).await
    }

    /// The account a session belongs to.
    ///
    /// # Errors
    ///
    /// Returns 401 if the session is no longer valid.
    #[instrument(skip_all)]
    pub async fn get_account(&self, session: &SecretString) -> Result<Account, AppwriteError> {
        self.call(
            Method::GET,
            "/account",
            &[],
            None,
            Credentials::Session(session),
        )
        .await
    }

    /// Delete the current session.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the request.
    #[instrument(skip_all)]
    pub async fn delete_current_session(&self, session: &SecretString) -> Result<(), AppwriteError> {
        self.send(
            Method::DELETE,
            "/account/sessions/current",
            &[],
            None,
            Credentials::Session(session),
        )
        .await?;
        Ok(())
    }

    /// Send a verification email that links back to `url`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the request.
    #[instrument(skip(self, session))]
    pub async fn create_verification(
        &self,
        session: &SecretString,
        url: &str,
    ) -> Result<(), AppwriteError> {
        let body = json!({ "url": url });
        self.send(
            Method::POST,
            "/account/verification",
            &[],
            Some(&body),
            Credentials::Session(session),
        )
        .await?;
        Ok(())
    }

    /// Confirm an email address from the verification link.
    ///
    /// # Errors
    ///
    /// Returns error if the link is invalid or expired.
    #[instrument(skip(self, secret))]
    pub async fn update_verification(&self, user_id: &str, secret: &str) -> Result<(), AppwriteError> {
        let body = json!({ "userId": user_id, "secret": secret });
        self.send(
            Method::PUT,
            "/account/verification",
            &[],
            Some(&body),
            Credentials::Public,
        )
        .await?;
        Ok(())
    }

    /// Send a password recovery email that links back to `url`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the request.
    #[instrument(skip(self))]
    pub async fn create_recovery(&self, email: &str, url: &str) -> Result<(), AppwriteError> {
        let body = json!({ "email": email, "url": url });
        self.send(
            Method::POST,
            "/account/recovery",
            &[],
            Some(&body),
            Credentials::Public,
        )
        .await?;
        Ok(())
    }

    /// Complete password recovery.
    ///
    /// # Errors
    ///
    /// Returns error if the link is invalid/expired or the password is rejected.
    #[instrument(skip(self, secret, password))]
    pub async fn update_recovery(
        &self,
        user_id: &str,
        secret: &str,
        password: &SecretString,
    ) -> Result<(), AppwriteError> {
        let body = json!({
            "userId": user_id,
            "secret": secret,
            "password": password.expose_secret(),
        });
        self.send(
            Method::PUT,
            "/account/recovery",
            &[],
            Some(&body),
            Credentials::Public,
        )
        .await?;
        Ok(())
    }

    /// Change the account display name.
    ///
    /// # Errors
    ///
    /// Returns error if the session is invalid.
    #[instrument(skip(self, session))]
    pub async fn update_name(
        &self,
        session: &SecretString,
        name: &str,
    ) -> Result<Account, AppwriteError> {
        let body = json!({ "name": name });
        self.call(
            Method::PATCH,
            "/account/name",
            &[],
            Some(&body),
            Credentials::Session(session),
        )
        .await
    }

    /// Browser URL that starts an OAuth2 token flow.
    ///
    /// On success the provider redirects to `success` with `userId` and
    /// `secret` query parameters.
    #[must_use]
    pub fn oauth2_token_url(&self, provider: OAuthProvider, success: &str, failure: &str) -> String {
        format!(
            "{}/account/tokens/oauth2/{}?project={}&success={}&failure={}",
            self.inner.endpoint,
            provider.as_str(),
            urlencoding::encode(&self.inner.project_id),
            urlencoding::encode(success),
            urlencoding::encode(failure),
        )
    }

    /// Backend reachability check.
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable.
    pub async fn health_version(&self) -> Result<HealthVersion, AppwriteError> {
        self.call(Method::GET, "/health/version", &[], None, Credentials::Public)
            .await
    }

    /// Anonymous account read. A 401 (`general_unauthorized_scope` or
    /// `user_unauthorized`) means the project id was accepted.
    ///
    /// # Errors
    ///
    /// Returns the backend's answer; success is unexpected without a session.
    pub async fn probe_account(&self) -> Result<Account, AppwriteError> {
        self.call(Method::GET, "/account", &[], None, Credentials::Public)
            .await
    }

    /// Session secret from the response body, or from the session cookie the
    /// backend sets when no API key was sent.
    async fn read_new_session(&self, response: reqwest::Response) -> Result<NewSession, AppwriteError> {
        let cookie_secret = session_cookie(response.headers(), &self.inner.project_id);
        let text = response.text().await?;
        let session: Session = serde_json::from_str(&text)?;

        let secret = if session.secret.is_empty() {
            cookie_secret.ok_or_else(|| {
                AppwriteError::api(
                    500,
                    "session_secret_missing",
                    "Session created but no secret was returned. Set APPWRITE_API_KEY.",
                )
            })?
        } else {
            session.secret.clone()
        };

        Ok(NewSession {
            session,
            secret: SecretString::from(secret),
        })
    }
}

/// Value of the `a_session_<project>` cookie, if set.
fn session_cookie(headers: &HeaderMap, project_id: &str) -> Option<String> {
    let wanted = format!("a_session_{project_id}");
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| name.eq_ignore_ascii_case(&wanted) && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{CollectionIds, DEFAULT_APPWRITE_ENDPOINT};

    fn client() -> AppwriteClient {
        AppwriteClient::new(&AppwriteConfig {
            endpoint: format!("{DEFAULT_APPWRITE_ENDPOINT}/"),
            project_id: "servicehub".to_string(),
            api_key: None,
            database_id: None,
            collections: CollectionIds::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        assert_eq!(client().endpoint(), DEFAULT_APPWRITE_ENDPOINT);
        assert!(!client().has_api_key());
    }

    #[test]
    fn test_oauth2_token_url() {
        let url = client().oauth2_token_url(
            OAuthProvider::Google,
            "http://localhost:3000/auth/oauth/callback",
            "http://localhost:3000/auth/signin",
        );
        assert!(url.starts_with("https://cloud.appwrite.io/v1/account/tokens/oauth2/google?"));
        assert!(url.contains("project=servicehub"));
        assert!(url.contains("success=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Foauth%2Fcallback"));
    }

    #[test]
    fn test_session_cookie_extraction() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("a_session_servicehub_legacy=old; path=/"),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("a_session_servicehub=s3cr3t; path=/; httponly"),
        );

        assert_eq!(
            session_cookie(&headers, "servicehub").as_deref(),
            Some("s3cr3t")
        );
        assert_eq!(session_cookie(&headers, "other"), None);
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = AppwriteClient::new(&AppwriteConfig {
            endpoint: DEFAULT_APPWRITE_ENDPOINT.to_string(),
            project_id: "servicehub".to_string(),
            api_key: Some(SecretString::from("standard_topsecret")),
            database_id: None,
            collections: CollectionIds::default(),
        })
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("topsecret"));
    }
}
