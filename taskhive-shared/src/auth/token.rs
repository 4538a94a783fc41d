/// JWT token issuance and validation
///
/// This module provides the signed, expiring tokens used across the account
/// lifecycle. Tokens are signed using HS256 (HMAC-SHA256) and carry the
/// identity of a credential (username and email).
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable per kind (30 min access, 4 week refresh,
///   60 min activation by default)
/// - **Kind Claim**: Every token embeds its kind, and consumers decode with an
///   expected kind, so an activation token can never be replayed as an access
///   token or vice versa
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Token Kinds
///
/// - **Access**: short-lived, authenticates API requests
/// - **Refresh**: long-lived, exchanged for new access tokens
/// - **Activation**: short-lived, proves control of an email address
///   (account activation and password reset links)
///
/// # Example
///
/// ```
/// use taskhive_shared::auth::token::{JwtConfig, TokenCodec, TokenKind};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = TokenCodec::new(JwtConfig::new(
///     "a-signing-secret-of-at-least-32-bytes!".to_string(),
/// ));
///
/// let issued = codec.issue(TokenKind::Access, "alice", "alice@example.com")?;
/// let claims = codec.decode_kind(&issued.token, TokenKind::Access)?;
/// assert_eq!(claims.sub, "alice");
/// # Ok(())
/// # }
/// ```
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer claim embedded in every token
const ISSUER: &str = "taskhive";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    Create(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token is malformed, tampered with, or missing claims
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token is valid but of the wrong kind for this operation
    #[error("Expected {expected} token, got {actual} token")]
    WrongKind {
        expected: TokenKind,
        actual: TokenKind,
    },
}

/// Token kind identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Access token (short-lived, 30 minutes by default)
    Access,

    /// Refresh token (long-lived, 4 weeks by default)
    Refresh,

    /// Activation token (account activation / password reset, 60 minutes by default)
    Activation,
}

impl TokenKind {
    /// Gets the token kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Activation => "activation",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signing secret and per-kind lifetimes
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC signing secret (at least 32 bytes)
    pub secret: String,

    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,

    /// Refresh token lifetime in weeks
    pub refresh_ttl_weeks: i64,

    /// Activation token lifetime in minutes
    pub activation_ttl_minutes: i64,
}

impl JwtConfig {
    /// Creates a config with the default lifetimes
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            access_ttl_minutes: 30,
            refresh_ttl_weeks: 4,
            activation_ttl_minutes: 60,
        }
    }

    /// Gets the configured lifetime for a token kind
    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => Duration::minutes(self.access_ttl_minutes),
            TokenKind::Refresh => Duration::weeks(self.refresh_ttl_weeks),
            TokenKind::Activation => Duration::minutes(self.activation_ttl_minutes),
        }
    }
}

/// JWT claims structure
///
/// # Claims
///
/// - `sub`: Subject (username)
/// - `email`: Email address of the credential
/// - `iss`: Issuer (always "taskhive")
/// - `iat`: Issued at (Unix timestamp)
/// - `exp`: Expiration (Unix timestamp, absolute)
/// - `kind`: Token kind (access, refresh, activation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - username
    pub sub: String,

    /// Email address
    pub email: String,

    /// Issuer - always "taskhive"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Token kind
    pub kind: TokenKind,
}

impl Claims {
    /// Checks if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// A freshly issued token together with its absolute expiration
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    /// Compact JWT string (base64url segments, URL-safe)
    pub token: String,

    /// Absolute expiration time
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates the three token kinds
///
/// Holds the derived signing keys so issuance and decoding share one secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: JwtConfig,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the secret or derived keys
        f.debug_struct("TokenCodec")
            .field("access_ttl_minutes", &self.config.access_ttl_minutes)
            .field("refresh_ttl_weeks", &self.config.refresh_ttl_weeks)
            .field("activation_ttl_minutes", &self.config.activation_ttl_minutes)
            .finish()
    }
}

impl TokenCodec {
    /// Creates a codec from a signing config
    pub fn new(config: JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            config,
        }
    }

    /// Issues a token of the given kind for a credential identity
    ///
    /// The expiration is absolute: `now + lifetime(kind)` from [`JwtConfig`].
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Create` if encoding fails
    pub fn issue(
        &self,
        kind: TokenKind,
        username: &str,
        email: &str,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = now + self.config.lifetime(kind);

        let claims = Claims {
            sub: username.to_string(),
            email: email.to_string(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            kind,
        };

        let header = Header::new(Algorithm::HS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::Create(format!("Token encoding failed: {}", e)))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Decodes and validates a token of any kind
    ///
    /// Verifies the signature, expiration, and issuer.
    ///
    /// # Errors
    ///
    /// - `TokenError::Expired` if `exp` is in the past
    /// - `TokenError::Invalid` for a bad signature, malformed token, wrong
    ///   issuer, or missing claims
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.validate_exp = true;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                    _ => TokenError::Invalid(format!("Token validation failed: {}", e)),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Decodes a token and checks it is of the expected kind
    ///
    /// This is the decode every consumer should use: a valid activation token
    /// presented where an access token is expected fails with
    /// `TokenError::WrongKind`.
    pub fn decode_kind(&self, token: &str, expected: TokenKind) -> Result<Claims, TokenError> {
        let claims = self.decode(token)?;

        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                actual: claims.kind,
            });
        }

        Ok(claims)
    }
}
