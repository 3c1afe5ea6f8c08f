//! The shared handle an application keeps for the whole process.

use crate::config::{AppConfig, ConfigError};
use crate::error::{AuthError, ProviderError, TokenError};
use crate::hooks::{
    self, DecodeHandler, EncodeHandler, ErrorHandler, Hooks, PayloadHandler, ResponseHandler,
    UserHandler,
};
use crate::provider::{AccessGrant, Profile, ProviderClient};
use crate::token::{Payload, TokenCodec};
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Configuration, signing keys, provider client and hooks behind one `Arc`.
///
/// `U` is what the user-resolution hook produces. With the default hook it is
/// the decoded [`Payload`] itself. Cloning is cheap and nothing in here is
/// mutated after [`UrsBuilder::build`].
pub struct Urs<U = Payload> {
    inner: Arc<UrsInner<U>>,
}

struct UrsInner<U> {
    config: AppConfig,
    codec: TokenCodec,
    provider: ProviderClient,
    hooks: Hooks<U>,
}

impl<U> Clone for Urs<U> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl Urs<Payload> {
    pub fn builder(config: AppConfig) -> UrsBuilder<Payload> {
        UrsBuilder {
            config,
            user: hooks::default_user_handler(),
            payload: None,
            encode: None,
            decode: None,
            response: None,
            error: None,
        }
    }

    /// Builds a handle with every hook left at its default.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }
}

impl<U> Urs<U> {
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.inner.codec
    }

    pub fn provider(&self) -> &ProviderClient {
        &self.inner.provider
    }

    pub(crate) fn hooks(&self) -> &Hooks<U> {
        &self.inner.hooks
    }

    /// Signs a payload through the encode hook.
    pub fn encode(&self, payload: &Payload) -> Result<String, TokenError> {
        (self.inner.hooks.encode)(payload)
    }

    /// Verifies a token through the decode hook.
    pub fn decode(&self, token: &str) -> Result<Payload, TokenError> {
        (self.inner.hooks.decode)(token)
    }

    /// Path the callback route is mounted at.
    pub fn redirect_url_rule(&self) -> String {
        self.inner.config.urs.redirect_url_rule()
    }

    /// Login URL at URS for this application's client id.
    pub fn authorize_url(&self, redirect_uri: &str) -> String {
        self.inner
            .provider
            .authorize_url(&self.inner.config.urs.client_id, redirect_uri)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessGrant, ProviderError> {
        self.inner.provider.refresh(refresh_token).await
    }
}

pub struct UrsBuilder<U> {
    config: AppConfig,
    user: UserHandler<U>,
    payload: Option<PayloadHandler>,
    encode: Option<EncodeHandler>,
    decode: Option<DecodeHandler>,
    response: Option<ResponseHandler>,
    error: Option<ErrorHandler>,
}

impl<U> UrsBuilder<U> {
    /// Sets how a decoded payload becomes the current user. Returning `None`
    /// rejects the request with "User does not exist".
    pub fn user_handler<V, F, Fut>(self, handler: F) -> UrsBuilder<V>
    where
        F: Fn(Payload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<V>> + Send + 'static,
        V: Send + 'static,
    {
        let user: UserHandler<V> = Arc::new(move |payload: Payload| -> BoxFuture<'static, Option<V>> {
            Box::pin(handler(payload))
        });
        UrsBuilder {
            config: self.config,
            user,
            payload: self.payload,
            encode: self.encode,
            decode: self.decode,
            response: self.response,
            error: self.error,
        }
    }

    pub fn payload_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(Profile) -> Payload + Send + Sync + 'static,
    {
        self.payload = Some(Arc::new(handler));
        self
    }

    pub fn encode_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Payload) -> Result<String, TokenError> + Send + Sync + 'static,
    {
        self.encode = Some(Arc::new(handler));
        self
    }

    pub fn decode_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str) -> Result<Payload, TokenError> + Send + Sync + 'static,
    {
        self.decode = Some(Arc::new(handler));
        self
    }

    pub fn response_handler<F, R>(mut self, handler: F) -> Self
    where
        F: Fn(String, AccessGrant) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        self.response = Some(Arc::new(move |jwt: String, grant: AccessGrant| -> Response {
            handler(jwt, grant).into_response()
        }));
        self
    }

    pub fn error_handler<F, R>(mut self, handler: F) -> Self
    where
        F: Fn(AuthError) -> R + Send + Sync + 'static,
        R: IntoResponse,
    {
        self.error = Some(Arc::new(move |err: AuthError| -> Response {
            handler(err).into_response()
        }));
        self
    }

    /// Validates the configuration and wires up codec, provider client and hooks.
    pub fn build(self) -> Result<Urs<U>, ConfigError> {
        self.config.validate()?;
        let codec = TokenCodec::new(&self.config.jwt);
        let provider = ProviderClient::new(&self.config.urs)?;

        let encode = self
            .encode
            .unwrap_or_else(|| hooks::codec_encoder(codec.clone()));
        let decode = self
            .decode
            .unwrap_or_else(|| hooks::codec_decoder(codec.clone()));

        let hooks = Hooks {
            user: self.user,
            payload: self.payload.unwrap_or_else(hooks::default_payload_handler),
            encode,
            decode,
            response: self.response.unwrap_or_else(hooks::default_response_handler),
            error: self.error.unwrap_or_else(hooks::default_error_handler),
        };

        tracing::debug!(
            algorithm = ?codec.algorithm(),
            callback = %self.config.urs.redirect_url_rule(),
            "URS authentication configured"
        );

        Ok(Urs {
            inner: Arc::new(UrsInner {
                config: self.config,
                codec,
                provider,
                hooks,
            }),
        })
    }
}
