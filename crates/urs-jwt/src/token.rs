//! Signed, time-boxed session tokens.
//!
//! Tokens are compact JWS strings signed with an HMAC algorithm. The caller's
//! payload travels untouched in a private `dat` claim next to the registered
//! `iat` and `exp` claims, so any JSON object survives a round trip, including
//! one that has its own `exp` key.

use crate::config::{JwtConfig, MAX_EXPIRATION_LEEWAY_SECS};
use crate::error::TokenError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Token payload: an arbitrary JSON object.
pub type Payload = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iat: i64,
    exp: i64,
    #[serde(rename = "dat")]
    data: Payload,
}

/// Encodes and verifies session tokens with one signing key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    lifetime_secs: u64,
    leeway_secs: u64,
    verify_expiration: bool,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("lifetime_secs", &self.lifetime_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("verify_expiration", &self.verify_expiration)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret_key.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: config.algorithm,
            lifetime_secs: config.expiration_delta_secs,
            // jsonwebtoken subtracts the leeway from the current time
            leeway_secs: config
                .expiration_leeway_secs
                .min(MAX_EXPIRATION_LEEWAY_SECS),
            verify_expiration: config.verify_expiration,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Signs `payload` with an expiry of now plus the configured lifetime.
    pub fn encode(&self, payload: &Payload) -> Result<String, TokenError> {
        let expires_at = i64::try_from(self.lifetime_secs)
            .ok()
            .and_then(|secs| OffsetDateTime::now_utc().checked_add(time::Duration::seconds(secs)))
            .ok_or_else(|| {
                TokenError::Encode(format!(
                    "token lifetime of {}s is out of range",
                    self.lifetime_secs
                ))
            })?;
        self.encode_expiring_at(payload, expires_at)
    }

    /// Signs `payload` with an explicit absolute expiry.
    pub fn encode_expiring_at(
        &self,
        payload: &Payload,
        expires_at: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            iat: OffsetDateTime::now_utc().unix_timestamp(),
            exp: expires_at.unix_timestamp(),
            data: payload.clone(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verifies signature and expiry and hands back the original payload.
    pub fn decode(&self, token: &str) -> Result<Payload, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.leeway_secs;
        validation.validate_exp = self.verify_expiration;
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims.data)
    }
}
