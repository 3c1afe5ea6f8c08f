//! Client side of the OAuth2 authorization-code grant against URS.
//!
//! Two calls are made per login: the code exchange (`POST {host}{token_path}`
//! with HTTP Basic credentials) and the profile fetch (`GET {host}{endpoint}`
//! with the access token as bearer). Both are bounded by the configured timeout.

use crate::config::{ConfigError, UrsConfig};
use crate::error::ProviderError;
use crate::token::Payload;
use base64::Engine;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request, StatusCode, header, header::HeaderValue};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use once_cell::sync::OnceCell;
use rustls::{ClientConfig, RootCertStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::{Duration, timeout};
use tracing::{debug, warn};
use url::form_urlencoded;

const USER_AGENT: &str = concat!("urs-jwt/", env!("CARGO_PKG_VERSION"));

/// Raw user attributes as returned by the profile endpoint.
pub type Profile = Payload;

/// Result of a successful code exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessGrant {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Path of the profile endpoint for this user, relative to the provider host.
    pub endpoint: String,
    /// Any other fields the provider sent (`token_type`, `expires_in`, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

type HttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

static TLS_CONFIG: OnceCell<Arc<ClientConfig>> = OnceCell::new();

/// Shared TLS client configuration, built once per process.
fn shared_tls_config() -> Result<Arc<ClientConfig>, rustls::Error> {
    TLS_CONFIG
        .get_or_try_init(|| {
            let mut root_cert_store = RootCertStore::empty();
            root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

            let config = ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()?
            .with_root_certificates(root_cert_store)
            .with_no_client_auth();

            Ok(Arc::new(config))
        })
        .cloned()
}

/// Joins a host and a path with exactly one `/` between them.
pub fn join_url(host: &str, path: &str) -> String {
    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Clone)]
pub struct ProviderClient {
    http: HttpClient,
    host: String,
    token_path: String,
    authorize_path: String,
    basic_auth: HeaderValue,
    timeout: Duration,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("host", &self.host)
            .field("token_path", &self.token_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    pub fn new(config: &UrsConfig) -> Result<Self, ConfigError> {
        let tls = shared_tls_config()?;
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config((*tls).clone())
            .https_or_http()
            .enable_http1()
            .build();
        let http = Client::builder(TokioExecutor::new()).build(https);

        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", config.uid, config.password));
        let mut basic_auth = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| ConfigError::Validation(format!("urs credentials: {e}")))?;
        basic_auth.set_sensitive(true);

        Ok(Self {
            http,
            host: config.host.clone(),
            token_path: config.token_path.clone(),
            authorize_path: config.authorize_path.clone(),
            basic_auth,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn token_url(&self) -> String {
        join_url(&self.host, &self.token_path)
    }

    /// URL the browser is sent to in order to log in at URS.
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .finish();
        format!("{}?{query}", join_url(&self.host, &self.authorize_path))
    }

    /// Exchanges an authorization code for an access grant.
    #[tracing::instrument(name = "exchange_code", skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessGrant, ProviderError> {
        let form = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("code", code)
            .append_pair("redirect_uri", redirect_uri)
            .finish();

        let request = Request::builder()
            .method(Method::POST)
            .uri(self.token_url())
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::AUTHORIZATION, self.basic_auth.clone())
            .body(Full::new(Bytes::from(form)))
            .map_err(|e| {
                warn!(error = %e, "Failed to build token request");
                ProviderError::unknown_token()
            })?;

        let (status, body) = self.send(request).await.map_err(|reason| {
            warn!(%reason, "Token request to URS failed");
            ProviderError::unknown_token()
        })?;

        match status {
            StatusCode::OK => serde_json::from_slice::<AccessGrant>(&body).map_err(|e| {
                warn!(error = %e, "URS token response was not a valid grant");
                ProviderError::unknown_token()
            }),
            StatusCode::UNAUTHORIZED => {
                warn!("URS rejected the application credentials");
                Err(ProviderError::Credentials)
            }
            StatusCode::BAD_REQUEST => match serde_json::from_slice::<ProviderErrorBody>(&body) {
                Ok(err) => {
                    debug!(error = %err.error, "URS refused the code exchange");
                    Err(ProviderError::Request {
                        error: err.error,
                        description: err.error_description.unwrap_or_default(),
                    })
                }
                Err(_) => Err(ProviderError::unknown_token()),
            },
            other => {
                warn!(status = %other, "Unexpected status from URS token endpoint");
                Err(ProviderError::unknown_token())
            }
        }
    }

    /// Fetches the user's profile with the access token from [`exchange_code`](Self::exchange_code).
    #[tracing::instrument(name = "fetch_profile", skip(self, access_token))]
    pub async fn fetch_profile(
        &self,
        access_token: &str,
        endpoint: &str,
    ) -> Result<Profile, ProviderError> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {access_token}"))
            .map_err(|_| ProviderError::InvalidCode)?;
        bearer.set_sensitive(true);

        let request = Request::builder()
            .method(Method::GET)
            .uri(join_url(&self.host, endpoint))
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::AUTHORIZATION, bearer)
            .body(Full::new(Bytes::new()))
            .map_err(|e| {
                warn!(error = %e, "Failed to build profile request");
                ProviderError::unknown_profile()
            })?;

        let (status, body) = self.send(request).await.map_err(|reason| {
            warn!(%reason, "Profile request to URS failed");
            ProviderError::unknown_profile()
        })?;

        if status != StatusCode::OK {
            debug!(status = %status, "URS refused the profile request");
            return Err(ProviderError::InvalidCode);
        }

        serde_json::from_slice::<Profile>(&body).map_err(|e| {
            warn!(error = %e, "URS profile response was not a JSON object");
            ProviderError::unknown_profile()
        })
    }

    /// Trading a refresh token for a new grant is not supported yet; the URS
    /// refresh request and response shape still has to be pinned down.
    pub async fn refresh(&self, _refresh_token: &str) -> Result<AccessGrant, ProviderError> {
        warn!("Refresh token grant requested but not implemented");
        Err(ProviderError::NotImplemented("refresh_token grant"))
    }

    async fn send(&self, request: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes), String> {
        let exchange = async {
            let response = self
                .http
                .request(request)
                .await
                .map_err(|e| e.to_string())?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| e.to_string())?
                .to_bytes();
            Ok::<_, String>((status, body))
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ProviderClient {
        ProviderClient::new(&UrsConfig::with_credentials("client-id", "app", "hunter2")).unwrap()
    }

    #[test]
    fn join_url_uses_a_single_slash() {
        assert_eq!(
            join_url("https://urs.earthdata.nasa.gov/", "oauth/token"),
            "https://urs.earthdata.nasa.gov/oauth/token"
        );
        assert_eq!(
            join_url("http://127.0.0.1:9000", "/endpoint"),
            "http://127.0.0.1:9000/endpoint"
        );
        assert_eq!(
            join_url("http://127.0.0.1:9000/", "/api/username"),
            "http://127.0.0.1:9000/api/username"
        );
    }

    #[test]
    fn token_url_defaults_to_urs() {
        assert_eq!(
            client().token_url(),
            "https://urs.earthdata.nasa.gov/oauth/token"
        );
    }

    #[test]
    fn authorize_url_encodes_redirect() {
        let url = client().authorize_url("client-id", "http://localhost:8080/urs/callback");
        assert_eq!(
            url,
            "https://urs.earthdata.nasa.gov/oauth/authorize?client_id=client-id&response_type=code&redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Furs%2Fcallback"
        );
    }

    #[test]
    fn basic_auth_header_is_sensitive() {
        let client = client();
        // "app:hunter2"
        assert_eq!(client.basic_auth, "Basic YXBwOmh1bnRlcjI=");
        assert!(client.basic_auth.is_sensitive());
    }

    #[tokio::test]
    async fn refresh_is_not_implemented() {
        let err = client().refresh("some-refresh-token").await.unwrap_err();
        assert_eq!(err, ProviderError::NotImplemented("refresh_token grant"));
        assert_eq!(err.status_code(), StatusCode::NOT_IMPLEMENTED);
    }

    #[test]
    fn grant_keeps_unknown_fields() {
        let grant: AccessGrant = serde_json::from_str(
            r#"{"access_token":"asdf","token_type":"Bearer","expires_in":3600,"endpoint":"/api/users/username"}"#,
        )
        .unwrap();
        assert_eq!(grant.access_token, "asdf");
        assert_eq!(grant.refresh_token, None);
        assert_eq!(grant.endpoint, "/api/users/username");
        assert_eq!(grant.extra["expires_in"], 3600);
    }
}
