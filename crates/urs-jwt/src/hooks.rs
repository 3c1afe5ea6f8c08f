//! Extension points an embedding application can replace.
//!
//! Every hook is a plain function value. The defaults pass payloads through
//! unchanged, sign with the configured [`TokenCodec`](crate::token::TokenCodec),
//! render the JSON error body and answer the callback with a small HTML page.

use crate::error::{AuthError, TokenError};
use crate::provider::{AccessGrant, Profile};
use crate::token::{Payload, TokenCodec};
use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use futures::future::BoxFuture;
use std::sync::Arc;

/// Turns a decoded token payload into the application's user, or `None`.
pub type UserHandler<U> = Arc<dyn Fn(Payload) -> BoxFuture<'static, Option<U>> + Send + Sync>;
/// Turns the provider profile into the payload that gets signed.
pub type PayloadHandler = Arc<dyn Fn(Profile) -> Payload + Send + Sync>;
pub type EncodeHandler = Arc<dyn Fn(&Payload) -> Result<String, TokenError> + Send + Sync>;
pub type DecodeHandler = Arc<dyn Fn(&str) -> Result<Payload, TokenError> + Send + Sync>;
/// Builds the callback response from the issued token and the raw grant.
pub type ResponseHandler = Arc<dyn Fn(String, AccessGrant) -> Response + Send + Sync>;
/// Renders a guard failure.
pub type ErrorHandler = Arc<dyn Fn(AuthError) -> Response + Send + Sync>;

pub struct Hooks<U> {
    pub(crate) user: UserHandler<U>,
    pub(crate) payload: PayloadHandler,
    pub(crate) encode: EncodeHandler,
    pub(crate) decode: DecodeHandler,
    pub(crate) response: ResponseHandler,
    pub(crate) error: ErrorHandler,
}

impl<U> Clone for Hooks<U> {
    fn clone(&self) -> Self {
        Self {
            user: self.user.clone(),
            payload: self.payload.clone(),
            encode: self.encode.clone(),
            decode: self.decode.clone(),
            response: self.response.clone(),
            error: self.error.clone(),
        }
    }
}

pub fn default_user_handler() -> UserHandler<Payload> {
    Arc::new(|payload: Payload| -> BoxFuture<'static, Option<Payload>> {
        Box::pin(async move { Some(payload) })
    })
}

pub fn default_payload_handler() -> PayloadHandler {
    Arc::new(|profile: Profile| profile)
}

pub fn default_error_handler() -> ErrorHandler {
    Arc::new(|err: AuthError| err.into_response())
}

pub fn default_response_handler() -> ResponseHandler {
    Arc::new(|jwt: String, _grant: AccessGrant| render_callback(&jwt))
}

#[derive(Template)]
#[template(path = "callback.html")]
struct CallbackTemplate<'a> {
    jwt: &'a str,
}

pub(crate) fn codec_encoder(codec: TokenCodec) -> EncodeHandler {
    Arc::new(move |payload: &Payload| codec.encode(payload))
}

pub(crate) fn codec_decoder(codec: TokenCodec) -> DecodeHandler {
    Arc::new(move |token: &str| codec.decode(token))
}

/// The page returned after a successful login: it hands the token to the opener window.
pub fn render_callback(jwt: &str) -> Response {
    match (CallbackTemplate { jwt }).render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render callback template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}
