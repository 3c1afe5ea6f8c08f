use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body every error in this crate is rendered as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub description: String,
}

pub(crate) fn error_response(
    status: StatusCode,
    error: &str,
    description: String,
    headers: HeaderMap,
) -> Response {
    let body = ErrorBody {
        status_code: status.as_u16(),
        error: error.to_string(),
        description,
    };
    (status, headers, Json(body)).into_response()
}

/// Failures of the token codec.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token is expired")]
    Expired,
    #[error("Token is malformed: {0}")]
    Malformed(String),
    #[error("Failed to sign token: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Failures raised by the authentication guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header was missing")]
    MissingHeader { realm: String },
    #[error("Unsupported authorization type")]
    UnsupportedType,
    #[error("Token missing")]
    TokenMissing,
    #[error("Token contains spaces")]
    TokenContainsSpaces,
    #[error("Token is expired")]
    Expired,
    #[error("Token is undecipherable")]
    Undecipherable,
    #[error("User does not exist")]
    UserNotFound,
}

impl AuthError {
    /// Stable machine-readable error code.
    pub fn error(&self) -> &'static str {
        match self {
            AuthError::MissingHeader { .. } => "Authorization Required",
            AuthError::UnsupportedType
            | AuthError::TokenMissing
            | AuthError::TokenContainsSpaces => "Invalid JWT header",
            AuthError::Expired | AuthError::Undecipherable | AuthError::UserNotFound => {
                "Invalid JWT"
            }
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader { .. } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Extra response headers, i.e. the `WWW-Authenticate` challenge.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let AuthError::MissingHeader { realm } = self {
            let challenge = format!("JWT realm=\"{}\"", realm.replace('"', "'"));
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }
        headers
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::Malformed(_) | TokenError::Encode(_) => AuthError::Undecipherable,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        error_response(
            self.status_code(),
            self.error(),
            self.description(),
            self.headers(),
        )
    }
}

/// Failures talking to the URS provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider rejected the application's own uid/password.
    #[error("Incorrect Application UID or Password")]
    Credentials,
    /// The provider refused the request and said why.
    #[error("{description}")]
    Request { error: String, description: String },
    #[error("{description}")]
    Unknown { description: String },
    /// The profile endpoint refused the access token.
    #[error("No Authorization Code")]
    InvalidCode,
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

impl ProviderError {
    pub(crate) fn unknown_token() -> Self {
        ProviderError::Unknown {
            description: "Could Not Retrieve Access Token".to_string(),
        }
    }

    pub(crate) fn unknown_profile() -> Self {
        ProviderError::Unknown {
            description: "Could Not Retrieve User Profile".to_string(),
        }
    }

    pub fn error(&self) -> &str {
        match self {
            ProviderError::Credentials => "Token Access Denied",
            ProviderError::Request { error, .. } => error,
            ProviderError::Unknown { .. } => "Unknown Error",
            ProviderError::InvalidCode => "Invalid Code",
            ProviderError::NotImplemented(_) => "Not Implemented",
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProviderError::Credentials
            | ProviderError::Request { .. }
            | ProviderError::Unknown { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProviderError::InvalidCode => StatusCode::BAD_REQUEST,
            ProviderError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }
}

impl IntoResponse for ProviderError {
    fn into_response(self) -> Response {
        error_response(
            self.status_code(),
            self.error(),
            self.description(),
            HeaderMap::new(),
        )
    }
}

/// Failures of the OAuth2 callback flow.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("Authorization code was missing")]
    MissingCode,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Could not issue session token")]
    Token(#[from] TokenError),
}

impl CallbackError {
    pub fn error(&self) -> &str {
        match self {
            CallbackError::MissingCode => "Invalid Request",
            CallbackError::Provider(e) => e.error(),
            CallbackError::Token(_) => "Token Issuance Failed",
        }
    }

    pub fn description(&self) -> String {
        self.to_string()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CallbackError::MissingCode => StatusCode::BAD_REQUEST,
            CallbackError::Provider(e) => e.status_code(),
            CallbackError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        error_response(
            self.status_code(),
            self.error(),
            self.description(),
            HeaderMap::new(),
        )
    }
}
