use config::Config;
use jsonwebtoken::Algorithm;
use urs_jwt::config::{AppConfig, ConfigError};

fn from_yaml(yaml: &str) -> AppConfig {
    Config::builder()
        .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
        .build()
        .expect("Failed to build config")
        .try_deserialize()
        .expect("Failed to deserialize app config")
}

#[test]
fn test_minimal_config_gets_defaults() {
    let app_config = from_yaml(
        r#"
jwt:
  secret_key: "0123456789abcdef0123456789abcdef"
urs:
  client_id: "client"
  uid: "app-uid"
  password: "app-password"
"#,
    );

    assert_eq!(app_config.bind_address, "0.0.0.0:8080");
    assert_eq!(app_config.public_base_url, None);
    assert_eq!(app_config.jwt.algorithm, Algorithm::HS256);
    assert_eq!(app_config.jwt.expiration_delta_secs, 3600);
    assert_eq!(app_config.jwt.expiration_leeway_secs, 100);
    assert!(app_config.jwt.verify_expiration);
    assert_eq!(app_config.jwt.default_realm, "Login Required");
    assert_eq!(app_config.urs.host, "https://urs.earthdata.nasa.gov/");
    assert_eq!(app_config.urs.token_path, "oauth/token");
    assert_eq!(app_config.urs.authorize_path, "oauth/authorize");
    assert_eq!(app_config.urs.redirect_url_rule(), "/urs/callback");
    assert_eq!(app_config.urs.timeout_secs, 10);
    assert!(app_config.validate().is_ok());
}

#[test]
fn test_full_config_overrides_defaults() {
    let app_config = from_yaml(
        r#"
bind_address: "127.0.0.1:3000"
public_base_url: "https://app.example.org"
jwt:
  secret_key: "0123456789abcdef0123456789abcdef0123456789abcdef"
  algorithm: "HS512"
  expiration_delta_secs: 600
  expiration_leeway_secs: 0
  verify_expiration: false
  default_realm: "Members"
urs:
  host: "https://uat.urs.earthdata.nasa.gov"
  token_path: "/oauth/token"
  callback_rule: "/authorized"
  url_prefix: "/login"
  client_id: "client"
  uid: "app-uid"
  password: "app-password"
  timeout_secs: 3
"#,
    );

    assert_eq!(app_config.bind_address, "127.0.0.1:3000");
    assert_eq!(
        app_config.public_base_url.as_deref(),
        Some("https://app.example.org")
    );
    assert_eq!(app_config.jwt.algorithm, Algorithm::HS512);
    assert_eq!(app_config.jwt.expiration_delta_secs, 600);
    assert!(!app_config.jwt.verify_expiration);
    assert_eq!(app_config.jwt.default_realm, "Members");
    assert_eq!(app_config.urs.redirect_url_rule(), "/login/authorized");
    assert_eq!(app_config.urs.timeout_secs, 3);
    assert!(app_config.validate().is_ok());
}

#[test]
fn test_missing_credentials_fail_to_deserialize() {
    let result = Config::builder()
        .add_source(config::File::from_str(
            r#"
jwt:
  secret_key: "0123456789abcdef0123456789abcdef"
urs:
  client_id: "client"
"#,
            config::FileFormat::Yaml,
        ))
        .build()
        .expect("Failed to build config")
        .try_deserialize::<AppConfig>();

    assert!(result.is_err());
}

#[test]
fn test_validation_rejects_bad_values() {
    let app_config = from_yaml(
        r#"
jwt:
  secret_key: "short"
urs:
  client_id: "client"
  uid: "app-uid"
  password: "app-password"
"#,
    );
    let err = app_config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));
    assert!(err.to_string().contains("jwt.secret_key"));

    let app_config = from_yaml(
        r#"
jwt:
  secret_key: "0123456789abcdef0123456789abcdef"
urs:
  host: "not a url"
  client_id: "client"
  uid: "app-uid"
  password: "app-password"
"#,
    );
    let err = app_config.validate().unwrap_err();
    assert!(err.to_string().contains("urs.host"));

    let app_config = from_yaml(
        r#"
jwt:
  secret_key: "0123456789abcdef0123456789abcdef"
urs:
  client_id: "client"
  uid: "app-uid"
  password: "app-password"
  timeout_secs: 0
"#,
    );
    assert!(app_config.validate().is_err());
}

#[test]
fn test_validation_bounds_token_lifetime_and_leeway() {
    let app_config = from_yaml(
        r#"
jwt:
  secret_key: "0123456789abcdef0123456789abcdef"
  expiration_delta_secs: 1099511627776
urs:
  client_id: "client"
  uid: "app-uid"
  password: "app-password"
"#,
    );
    let err = app_config.validate().unwrap_err();
    assert!(err.to_string().contains("jwt.expiration_delta_secs"));

    let app_config = from_yaml(
        r#"
jwt:
  secret_key: "0123456789abcdef0123456789abcdef"
  expiration_leeway_secs: 86401
urs:
  client_id: "client"
  uid: "app-uid"
  password: "app-password"
"#,
    );
    let err = app_config.validate().unwrap_err();
    assert!(err.to_string().contains("jwt.expiration_leeway_secs"));
}
