//! Bearer-token authentication for protected routes.
//!
//! Three entry points share the same checks: [`require_jwt`] as middleware,
//! the [`CurrentUser`] extractor, and [`Urs::verify`] for handlers that only
//! want to know whether a caller is logged in.

use crate::error::{AuthError, error_response};
use crate::state::Urs;
use crate::token::Payload;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::debug;

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token<'a>(headers: &'a HeaderMap, realm: &str) -> Result<&'a str, AuthError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingHeader {
            realm: realm.to_string(),
        });
    };
    let value = value.to_str().map_err(|_| AuthError::UnsupportedType)?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [scheme, ..] if !scheme.eq_ignore_ascii_case("bearer") => Err(AuthError::UnsupportedType),
        [] => Err(AuthError::UnsupportedType),
        [_] => Err(AuthError::TokenMissing),
        [_, token] => Ok(*token),
        _ => Err(AuthError::TokenContainsSpaces),
    }
}

impl<U> Urs<U> {
    /// Runs the full guard against a set of request headers and returns the
    /// resolved user. `realm` overrides the configured default in the
    /// `WWW-Authenticate` challenge.
    #[tracing::instrument(name = "verify_jwt", skip_all)]
    pub async fn verify(&self, headers: &HeaderMap, realm: Option<&str>) -> Result<U, AuthError> {
        let realm = realm.unwrap_or(&self.config().jwt.default_realm);
        let token = bearer_token(headers, realm)?;

        let payload = self.decode(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            AuthError::from(e)
        })?;

        (self.hooks().user)(payload)
            .await
            .ok_or(AuthError::UserNotFound)
    }

    /// State for [`require_jwt`], optionally with its own realm.
    pub fn jwt_required(&self, realm: Option<&str>) -> Guard<U> {
        Guard {
            urs: self.clone(),
            realm: realm.map(Arc::from),
        }
    }
}

/// Middleware state: the shared handle plus the realm of the routes it wraps.
pub struct Guard<U = Payload> {
    urs: Urs<U>,
    realm: Option<Arc<str>>,
}

impl<U> Clone for Guard<U> {
    fn clone(&self) -> Self {
        Self {
            urs: self.urs.clone(),
            realm: self.realm.clone(),
        }
    }
}

/// Rejects requests without a valid bearer token. On success the user is
/// stored in the request extensions as [`CurrentUser`].
///
/// ```ignore
/// let protected = Router::new()
///     .route("/me", get(me))
///     .route_layer(middleware::from_fn_with_state(urs.jwt_required(None), require_jwt::<Payload>));
/// ```
pub async fn require_jwt<U>(
    State(guard): State<Guard<U>>,
    request: Request,
    next: Next,
) -> Response
where
    U: Clone + Send + Sync + 'static,
{
    let (mut parts, body) = request.into_parts();
    let verified = guard
        .urs
        .verify(&parts.headers, guard.realm.as_deref())
        .await;

    match verified {
        Ok(user) => {
            parts.extensions.insert(CurrentUser(user));
            next.run(Request::from_parts(parts, body)).await
        }
        Err(err) => (guard.urs.hooks().error)(err),
    }
}

/// The user resolved for this request.
///
/// Behind [`require_jwt`] it is read from the request extensions. Elsewhere
/// the extractor verifies the request itself, which needs the [`Urs`] handle
/// installed with `Extension(urs)`.
#[derive(Debug, Clone)]
pub struct CurrentUser<U = Payload>(pub U);

impl<S, U> FromRequestParts<S> for CurrentUser<U>
where
    S: Send + Sync,
    U: Clone + Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser<U>>() {
            return Ok(user.clone());
        }

        let urs = parts.extensions.get::<Urs<U>>().cloned().ok_or_else(|| {
            tracing::error!("Urs handle not found in extensions");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server Error",
                "Authentication is not configured".to_string(),
                HeaderMap::new(),
            )
        })?;

        match urs.verify(&parts.headers, None).await {
            Ok(user) => Ok(CurrentUser(user)),
            Err(err) => Err((urs.hooks().error)(err)),
        }
    }
}

impl<S, U> OptionalFromRequestParts<S> for CurrentUser<U>
where
    S: Send + Sync,
    U: Clone + Send + Sync + 'static,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <CurrentUser<U> as FromRequestParts<S>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}
