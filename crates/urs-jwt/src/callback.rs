//! The route URS redirects the browser back to after login.

use crate::config::AppConfig;
use crate::error::CallbackError;
use crate::provider::join_url;
use crate::state::Urs;
use axum::{
    Router,
    extract::{OriginalUri, Query, State, rejection::QueryRejection},
    http::{HeaderMap, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

impl<U> Urs<U>
where
    U: Send + Sync + 'static,
{
    /// A router with the callback mounted at [`redirect_url_rule`](Urs::redirect_url_rule).
    /// Merge it into the application's router.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
            .route(&self.redirect_url_rule(), get(callback::<U>))
            .with_state(self.clone())
    }

    /// Exchanges `code` for a grant, fetches the profile, signs the payload
    /// and hands the token to the response hook.
    #[tracing::instrument(name = "urs_callback", skip(self, code))]
    pub async fn handle_callback(
        &self,
        code: Option<&str>,
        redirect_uri: &str,
    ) -> Result<Response, CallbackError> {
        let code = code
            .filter(|code| !code.is_empty())
            .ok_or(CallbackError::MissingCode)?;

        let grant = self.provider().exchange_code(code, redirect_uri).await?;
        let profile = self
            .provider()
            .fetch_profile(&grant.access_token, &grant.endpoint)
            .await?;

        let payload = (self.hooks().payload)(profile);
        let jwt = self.encode(&payload)?;
        info!("Issued session token");

        Ok((self.hooks().response)(jwt, grant))
    }
}

async fn callback<U>(
    State(urs): State<Urs<U>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    query: Result<Query<CallbackParams>, QueryRejection>,
) -> Response
where
    U: Send + Sync + 'static,
{
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!(%rejection, "Unreadable callback query");
            CallbackParams::default()
        }
    };

    let redirect_uri = redirect_uri(urs.config(), &uri, &headers);
    match urs
        .handle_callback(params.code.as_deref(), &redirect_uri)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            warn!(error = %err, status = %err.status_code(), "URS login failed");
            err.into_response()
        }
    }
}

/// The `redirect_uri` sent with the code exchange. It has to match the one the
/// browser was sent to URS with, minus the query string.
///
/// Without `public_base_url` the origin comes from the request headers, which
/// a client can forge unless a trusted proxy rewrites them.
pub fn redirect_uri(config: &AppConfig, uri: &Uri, headers: &HeaderMap) -> String {
    match &config.public_base_url {
        Some(base) => join_url(base, &config.urs.redirect_url_rule()),
        None => format!("{}{}", request_origin(uri, headers), uri.path()),
    }
}

/// Absolute URL of the callback route as seen by the browser making this
/// request. Used to build login links from any page.
pub fn callback_url(config: &AppConfig, uri: &Uri, headers: &HeaderMap) -> String {
    let base = match &config.public_base_url {
        Some(base) => base.clone(),
        None => request_origin(uri, headers),
    };
    join_url(&base, &config.urs.redirect_url_rule())
}

/// Trusts `X-Forwarded-Proto` and `Host` as sent. Behind a proxy that does
/// not overwrite them, set `public_base_url` instead.
fn request_origin(uri: &Uri, headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .or(uri.scheme_str())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or(uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}
