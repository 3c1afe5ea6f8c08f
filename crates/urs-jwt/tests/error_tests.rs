use axum::{
    body::to_bytes,
    http::{StatusCode, header},
    response::IntoResponse,
};
use urs_jwt::error::{AuthError, CallbackError, ErrorBody, ProviderError, TokenError};

async fn body_of(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

#[tokio::test]
async fn test_missing_header_response() {
    let response = AuthError::MissingHeader {
        realm: "Login Required".to_string(),
    }
    .into_response();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "JWT realm=\"Login Required\""
    );
    assert_eq!(
        body_of(response).await,
        r#"{"status_code":401,"error":"Authorization Required","description":"Authorization header was missing"}"#
    );
}

#[tokio::test]
async fn test_guard_error_bodies() {
    let cases = [
        (AuthError::UnsupportedType, "Invalid JWT header", "Unsupported authorization type"),
        (AuthError::TokenMissing, "Invalid JWT header", "Token missing"),
        (AuthError::TokenContainsSpaces, "Invalid JWT header", "Token contains spaces"),
        (AuthError::Expired, "Invalid JWT", "Token is expired"),
        (AuthError::Undecipherable, "Invalid JWT", "Token is undecipherable"),
        (AuthError::UserNotFound, "Invalid JWT", "User does not exist"),
    ];

    for (err, error, description) in cases {
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        let body: ErrorBody = serde_json::from_str(&body_of(response).await).unwrap();
        assert_eq!(body.status_code, 400);
        assert_eq!(body.error, error);
        assert_eq!(body.description, description);
    }
}

#[tokio::test]
async fn test_provider_error_bodies() {
    let cases = [
        (
            ProviderError::Credentials,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Token Access Denied",
            "Incorrect Application UID or Password",
        ),
        (
            ProviderError::Request {
                error: "invalid_grant".to_string(),
                description: "Authorization code expired".to_string(),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
            "invalid_grant",
            "Authorization code expired",
        ),
        (
            ProviderError::Unknown {
                description: "Could Not Retrieve Access Token".to_string(),
            },
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unknown Error",
            "Could Not Retrieve Access Token",
        ),
        (
            ProviderError::InvalidCode,
            StatusCode::BAD_REQUEST,
            "Invalid Code",
            "No Authorization Code",
        ),
    ];

    for (err, status, error, description) in cases {
        let response = err.into_response();
        assert_eq!(response.status(), status);
        let body: ErrorBody = serde_json::from_str(&body_of(response).await).unwrap();
        assert_eq!(body.status_code, status.as_u16());
        assert_eq!(body.error, error);
        assert_eq!(body.description, description);
    }

    let response = ProviderError::NotImplemented("refresh_token grant").into_response();
    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_callback_error_bodies() {
    let response = CallbackError::MissingCode.into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = serde_json::from_str(&body_of(response).await).unwrap();
    assert_eq!(body.error, "Invalid Request");
    assert_eq!(body.description, "Authorization code was missing");

    let response = CallbackError::from(TokenError::Encode("bad key".to_string())).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ErrorBody = serde_json::from_str(&body_of(response).await).unwrap();
    assert_eq!(body.error, "Token Issuance Failed");

    let err = CallbackError::from(ProviderError::Credentials);
    assert_eq!(err.to_string(), "Incorrect Application UID or Password");
    assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
}
