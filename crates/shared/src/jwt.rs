//! JWT token utilities using RS256 (HS256 in tests) for the opaque
//! `authenticate(token) -> subject_id` contract the core spec delegates to
//! an external collaborator. The wire format (claims, algorithm, leeway) is
//! this backend's concrete choice; callers only ever see `Subject`.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Error type for JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode token: {0}")]
    EncodingError(String),

    #[error("Failed to decode token: {0}")]
    DecodingError(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Role carried by an authenticated subject. Drives the `Auth?` column of
/// the request-surface table (rider-scoped vs driver-scoped operations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectRole {
    Rider,
    Driver,
}

/// JWT token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject id (rider or driver id)
    pub sub: String,
    /// Role of the subject
    pub role: SubjectRole,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID (unique token identifier)
    pub jti: String,
}

/// The authenticated identity a verified token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject {
    pub id: Uuid,
    pub role: SubjectRole,
}

/// Configuration for JWT token generation and validation.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Token expiration in seconds (default: 3600 = 1 hour)
    pub token_expiry_secs: i64,
    /// Leeway in seconds for clock skew tolerance (default: 30)
    pub leeway_secs: u64,
    algorithm: Algorithm,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("token_expiry_secs", &self.token_expiry_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("algorithm", &self.algorithm)
            .field("encoding_key", &"[REDACTED]")
            .field("decoding_key", &"[REDACTED]")
            .finish()
    }
}

/// Default leeway in seconds for clock skew tolerance
pub const DEFAULT_LEEWAY_SECS: u64 = 30;

impl JwtConfig {
    /// Creates a new JwtConfig from an RSA key pair in PEM format (RS256).
    pub fn new_rsa(
        private_key_pem: &str,
        public_key_pem: &str,
        token_expiry_secs: i64,
    ) -> Result<Self, JwtError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid private key: {}", e)))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| JwtError::InvalidKey(format!("Invalid public key: {}", e)))?;

        Ok(Self {
            encoding_key,
            decoding_key,
            token_expiry_secs,
            leeway_secs: DEFAULT_LEEWAY_SECS,
            algorithm: Algorithm::RS256,
        })
    }

    /// Creates a JwtConfig backed by a shared secret (HS256). Used for
    /// local/dev deployments and tests where managing an RSA keypair is
    /// unnecessary overhead.
    pub fn new_hmac(secret: &str, token_expiry_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_secs,
            leeway_secs: DEFAULT_LEEWAY_SECS,
            algorithm: Algorithm::HS256,
        }
    }

    /// Issues a token for the given subject. Exposed mainly for tests and
    /// local tooling — in production, tokens are minted by the identity
    /// provider this service treats as an opaque collaborator.
    pub fn issue(&self, subject_id: Uuid, role: SubjectRole) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject_id.to_string(),
            role,
            exp: (now + Duration::seconds(self.token_expiry_secs)).timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))?;
        Ok(token)
    }

    /// Validates a token and resolves it to a `Subject`. This is the
    /// concrete implementation behind `authenticate(token) -> subject_id`.
    pub fn authenticate(&self, token: &str) -> Result<Subject, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        validation.leeway = self.leeway_secs;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken
                | jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidToken,
                _ => JwtError::DecodingError(e.to_string()),
            }
        })?;

        let id = Uuid::parse_str(&token_data.claims.sub).map_err(|_| JwtError::InvalidToken)?;
        Ok(Subject {
            id,
            role: token_data.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig::new_hmac("test_secret_key_for_jwt_testing_12345", 3600)
    }

    #[test]
    fn test_issue_and_authenticate_roundtrip() {
        let config = test_config();
        let subject_id = Uuid::new_v4();
        let token = config.issue(subject_id, SubjectRole::Driver).unwrap();

        let subject = config.authenticate(&token).unwrap();
        assert_eq!(subject.id, subject_id);
        assert_eq!(subject.role, SubjectRole::Driver);
    }

    #[test]
    fn test_authenticate_rejects_garbage() {
        let config = test_config();
        assert!(matches!(
            config.authenticate("not-a-jwt"),
            Err(JwtError::DecodingError(_))
        ));
    }

    #[test]
    fn test_authenticate_rejects_wrong_secret() {
        let config_a = test_config();
        let config_b = JwtConfig::new_hmac("different_secret", 3600);
        let token = config_a.issue(Uuid::new_v4(), SubjectRole::Rider).unwrap();
        assert!(config_b.authenticate(&token).is_err());
    }

    #[test]
    fn test_authenticate_rejects_expired_token() {
        let mut config = test_config();
        config.token_expiry_secs = -1;
        let token = config.issue(Uuid::new_v4(), SubjectRole::Rider).unwrap();
        assert!(matches!(
            config.authenticate(&token),
            Err(JwtError::TokenExpired)
        ));
    }

    #[test]
    fn test_rider_vs_driver_role_roundtrip() {
        let config = test_config();
        let rider_token = config.issue(Uuid::new_v4(), SubjectRole::Rider).unwrap();
        let driver_token = config.issue(Uuid::new_v4(), SubjectRole::Driver).unwrap();

        assert_eq!(config.authenticate(&rider_token).unwrap().role, SubjectRole::Rider);
        assert_eq!(config.authenticate(&driver_token).unwrap().role, SubjectRole::Driver);
    }
}
