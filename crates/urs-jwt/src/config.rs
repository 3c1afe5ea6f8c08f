use jsonwebtoken::Algorithm;
use serde::Deserialize;
use thiserror::Error;

/// Shortest signing secret accepted for the HMAC token algorithms.
pub const MIN_SECRET_LEN: usize = 32;
/// Longest accepted token lifetime: ten years.
pub const MAX_EXPIRATION_DELTA_SECS: u64 = 10 * 365 * 24 * 60 * 60;
/// Largest accepted clock-skew tolerance: one day.
pub const MAX_EXPIRATION_LEEWAY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),
}

/// Token signing and verification settings.
#[derive(Clone, Debug, Deserialize)]
pub struct JwtConfig {
    /// Dedicated signing secret. There is no fallback to any other application secret.
    pub secret_key: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,
    #[serde(default = "default_expiration_delta")]
    pub expiration_delta_secs: u64,
    #[serde(default = "default_expiration_leeway")]
    pub expiration_leeway_secs: u64,
    #[serde(default = "default_true")]
    pub verify_expiration: bool,
    #[serde(default = "default_realm")]
    pub default_realm: String,
}

/// Where the URS provider lives and how this application identifies itself to it.
#[derive(Clone, Debug, Deserialize)]
pub struct UrsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_token_path")]
    pub token_path: String,
    #[serde(default = "default_authorize_path")]
    pub authorize_path: String,
    #[serde(default = "default_callback_rule")]
    pub callback_rule: String,
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    pub client_id: String,
    pub uid: String,
    pub password: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// External base URL (scheme and authority) used when building the OAuth2
    /// `redirect_uri`. When unset the callback derives it from the request.
    #[serde(default)]
    pub public_base_url: Option<String>,
    pub jwt: JwtConfig,
    pub urs: UrsConfig,
}

fn default_algorithm() -> Algorithm {
    Algorithm::HS256
}

fn default_expiration_delta() -> u64 {
    3600
}

fn default_expiration_leeway() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_realm() -> String {
    "Login Required".to_string()
}

fn default_host() -> String {
    "https://urs.earthdata.nasa.gov/".to_string()
}

fn default_token_path() -> String {
    "oauth/token".to_string()
}

fn default_authorize_path() -> String {
    "oauth/authorize".to_string()
}

fn default_callback_rule() -> String {
    "/callback".to_string()
}

fn default_url_prefix() -> String {
    "/urs".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

impl JwtConfig {
    /// Settings with every default applied, for embedders that build the
    /// configuration in code rather than from a file.
    pub fn with_secret(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            algorithm: default_algorithm(),
            expiration_delta_secs: default_expiration_delta(),
            expiration_leeway_secs: default_expiration_leeway(),
            verify_expiration: true,
            default_realm: default_realm(),
        }
    }
}

impl UrsConfig {
    pub fn with_credentials(
        client_id: impl Into<String>,
        uid: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: default_host(),
            token_path: default_token_path(),
            authorize_path: default_authorize_path(),
            callback_rule: default_callback_rule(),
            url_prefix: default_url_prefix(),
            client_id: client_id.into(),
            uid: uid.into(),
            password: password.into(),
            timeout_secs: default_timeout(),
        }
    }

    /// Path the callback route is mounted at, e.g. `/urs/callback`.
    pub fn redirect_url_rule(&self) -> String {
        format!("{}{}", self.url_prefix, self.callback_rule)
    }
}

impl AppConfig {
    pub fn new(jwt: JwtConfig, urs: UrsConfig) -> Self {
        Self {
            bind_address: default_bind_address(),
            public_base_url: None,
            jwt,
            urs,
        }
    }

    /// Checks the invariants serde cannot express. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret_key.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Validation(format!(
                "jwt.secret_key must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if !matches!(
            self.jwt.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::Validation(format!(
                "jwt.algorithm {:?} is not supported, use HS256, HS384 or HS512",
                self.jwt.algorithm
            )));
        }
        if self.jwt.expiration_delta_secs == 0
            || self.jwt.expiration_delta_secs > MAX_EXPIRATION_DELTA_SECS
        {
            return Err(ConfigError::Validation(format!(
                "jwt.expiration_delta_secs must be between 1 and {MAX_EXPIRATION_DELTA_SECS}"
            )));
        }
        if self.jwt.expiration_leeway_secs > MAX_EXPIRATION_LEEWAY_SECS {
            return Err(ConfigError::Validation(format!(
                "jwt.expiration_leeway_secs must be at most {MAX_EXPIRATION_LEEWAY_SECS}"
            )));
        }
        if !self.urs.callback_rule.starts_with('/') {
            return Err(ConfigError::Validation(
                "urs.callback_rule must start with '/'".into(),
            ));
        }
        if self.urs.timeout_secs == 0 {
            return Err(ConfigError::Validation("urs.timeout_secs must be > 0".into()));
        }
        url::Url::parse(&self.urs.host)
            .map_err(|e| ConfigError::Validation(format!("urs.host is not a valid URL: {e}")))?;
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double underscores
/// (e.g. `JWT__SECRET_KEY`, `URS__PASSWORD`) overrides the file value.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}
