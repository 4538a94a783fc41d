/// Account lifecycle orchestration
///
/// This module ties the password, token, and store layers together into the
/// account state machine:
///
/// ```text
/// Unregistered -> PendingActivation -> Active
///                 (sign_up)            (activate_account)
/// ```
///
/// Only active accounts can log in. Activation and password reset are proven
/// by possession of a short-lived activation token delivered out of band.
///
/// # Security
///
/// - Unknown username and wrong password are indistinguishable to callers:
///   both produce the same `Unauthorized` error
/// - Argon2id hashing and verification run on the blocking thread pool so the
///   async runtime is never stalled by intentionally expensive key derivation
/// - No error ever carries a password hash, the signing secret, or raw token
///   contents
use std::sync::Arc;

use tracing::{info, warn};

use super::password::{self, PasswordError, PasswordValidator};
use super::store::{Credential, CredentialStore, NewCredential, StoreError};
use super::token::{Claims, IssuedToken, JwtConfig, TokenCodec, TokenError, TokenKind};

/// Error type for account operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The submitted password (or confirmation) failed validation
    ///
    /// Carries every violated rule so the caller can report them all at once.
    #[error("Password validation failed")]
    Validation(Vec<String>),

    /// The username or email is already registered
    #[error("Username or email is already registered")]
    Conflict,

    /// No account matches the given identity
    #[error("Account not found")]
    NotFound,

    /// Authentication failed
    ///
    /// Deliberately covers both unknown username and wrong password.
    #[error("Incorrect username or password")]
    Unauthorized,

    /// The account exists but has not been activated
    #[error("Account is not active")]
    AccountNotActive,

    /// The account has already been activated
    #[error("Account is already active")]
    AlreadyActive,

    /// An internal failure; details are logged, not returned
    #[error("Internal error")]
    Internal,
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => AuthError::Conflict,
            StoreError::NotFound => AuthError::NotFound,
            StoreError::Backend(detail) => {
                warn!(error = %detail, "credential store failure");
                AuthError::Internal
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Create(detail) => {
                warn!(error = %detail, "token issuance failure");
                AuthError::Internal
            }
            // Expired, tampered, and wrong-kind tokens all read as unauthorized
            TokenError::Expired | TokenError::Invalid(_) | TokenError::WrongKind { .. } => {
                AuthError::Unauthorized
            }
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        warn!(error = %err, "password hashing failure");
        AuthError::Internal
    }
}

/// Access and refresh tokens issued together at login
#[derive(Debug, Clone)]
pub struct TokenPair {
    /// Short-lived access token
    pub access: IssuedToken,

    /// Long-lived refresh token
    pub refresh: IssuedToken,
}

/// A credential plus the activation-class token issued for it
///
/// Returned by `sign_up` and `request_password_reset`; the caller delivers the
/// token out of band (email link).
#[derive(Debug, Clone)]
pub struct ActivationIssued {
    /// The credential the token was issued for
    pub credential: Credential,

    /// Short-lived activation token
    pub activation: IssuedToken,
}

/// Orchestrates sign-up, login, activation, password reset, and token refresh
///
/// The store is injected so the same service runs against PostgreSQL in the
/// server and the in-memory store in tests.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskhive_shared::auth::service::AuthService;
/// use taskhive_shared::auth::store::InMemoryCredentialStore;
/// use taskhive_shared::auth::token::JwtConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = AuthService::new(
///     Arc::new(InMemoryCredentialStore::new()),
///     JwtConfig::new("a-signing-secret-of-at-least-32-bytes!".to_string()),
/// );
///
/// let issued = service
///     .sign_up("alice", "alice@example.com", "Xk9!mQ2p$vL7")
///     .await?;
/// service.activate_account(&issued.activation.token).await?;
/// let tokens = service.log_in("alice", "Xk9!mQ2p$vL7").await?;
/// # Ok(())
/// # }
/// ```
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenCodec,
    validator: PasswordValidator,
}

impl AuthService {
    /// Creates a service with the default password validator
    pub fn new(store: Arc<dyn CredentialStore>, jwt: JwtConfig) -> Self {
        Self {
            store,
            tokens: TokenCodec::new(jwt),
            validator: PasswordValidator::new(),
        }
    }

    /// Registers a new account in the pending-activation state
    ///
    /// Validates password strength (reporting every violated rule), hashes the
    /// password, inserts the credential, and issues an activation token. A
    /// duplicate username or email surfaces as [`AuthError::Conflict`] from
    /// the insert itself; there is no racy pre-check.
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<ActivationIssued, AuthError> {
        let report = self.validator.validate(password, username, email);
        if !report.is_valid {
            return Err(AuthError::Validation(report.errors));
        }

        let password_hash = hash_on_blocking_pool(password.to_string()).await?;

        let credential = self
            .store
            .insert(NewCredential {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await?;

        let activation = self.tokens.issue(
            TokenKind::Activation,
            &credential.username,
            &credential.email,
        )?;

        info!(username = %credential.username, "account registered, activation pending");

        Ok(ActivationIssued {
            credential,
            activation,
        })
    }

    /// Authenticates a username/password pair and issues a token pair
    ///
    /// Unknown username and wrong password are indistinguishable: both return
    /// [`AuthError::Unauthorized`]. A correct password against an inactive
    /// account returns [`AuthError::AccountNotActive`].
    pub async fn log_in(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let credential = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        let matches =
            verify_on_blocking_pool(password.to_string(), credential.password_hash.clone())
                .await?;
        if !matches {
            return Err(AuthError::Unauthorized);
        }

        if !credential.is_active {
            return Err(AuthError::AccountNotActive);
        }

        let access = self
            .tokens
            .issue(TokenKind::Access, &credential.username, &credential.email)?;
        let refresh = self
            .tokens
            .issue(TokenKind::Refresh, &credential.username, &credential.email)?;

        info!(username = %credential.username, "login succeeded");

        Ok(TokenPair { access, refresh })
    }

    /// Activates the account named by an activation token
    ///
    /// Expired or tampered tokens (and tokens of any other kind) fail with
    /// [`AuthError::Unauthorized`]. Activating an already-active account fails
    /// with [`AuthError::AlreadyActive`]; the flag never flips back.
    pub async fn activate_account(&self, token: &str) -> Result<Credential, AuthError> {
        let claims = self.tokens.decode_kind(token, TokenKind::Activation)?;

        let credential = self
            .store
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        if credential.is_active {
            return Err(AuthError::AlreadyActive);
        }

        let activated = self.store.set_active(credential.id).await?;

        info!(username = %activated.username, "account activated");

        Ok(activated)
    }

    /// Issues a fresh activation-class token for a password reset
    ///
    /// Returns [`AuthError::NotFound`] if no account has the given email.
    pub async fn request_password_reset(&self, email: &str) -> Result<ActivationIssued, AuthError> {
        let credential = self
            .store
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound)?;

        let activation = self.tokens.issue(
            TokenKind::Activation,
            &credential.username,
            &credential.email,
        )?;

        info!(username = %credential.username, "password reset requested");

        Ok(ActivationIssued {
            credential,
            activation,
        })
    }

    /// Replaces the password for the account named by a reset token
    ///
    /// The new password must match its confirmation and pass the same strength
    /// gate as sign-up, evaluated against the identity in the token's claims.
    pub async fn password_reset(
        &self,
        token: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<Credential, AuthError> {
        if new_password != confirmation {
            return Err(AuthError::Validation(vec![
                "Passwords do not match".to_string()
            ]));
        }

        let claims = self.tokens.decode_kind(token, TokenKind::Activation)?;

        let report = self
            .validator
            .validate(new_password, &claims.sub, &claims.email);
        if !report.is_valid {
            return Err(AuthError::Validation(report.errors));
        }

        let credential = self
            .store
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::NotFound)?;

        let password_hash = hash_on_blocking_pool(new_password.to_string()).await?;
        let updated = self
            .store
            .update_password_hash(credential.id, &password_hash)
            .await?;

        info!(username = %updated.username, "password replaced");

        Ok(updated)
    }

    /// Exchanges a refresh token for a new access token
    ///
    /// The refresh token must be valid, unexpired, and of the refresh kind.
    pub async fn refresh_access_token(&self, token: &str) -> Result<IssuedToken, AuthError> {
        let claims = self.tokens.decode_kind(token, TokenKind::Refresh)?;

        let access = self
            .tokens
            .issue(TokenKind::Access, &claims.sub, &claims.email)?;

        Ok(access)
    }

    /// Validates an access token and returns its claims
    ///
    /// Used by the HTTP layer to authenticate requests.
    pub fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(self.tokens.decode_kind(token, TokenKind::Access)?)
    }

    /// Looks up the credential behind an authenticated username
    ///
    /// A token can outlive its account; a missing credential reads as
    /// [`AuthError::Unauthorized`], not as a distinct error.
    pub async fn resolve_account(&self, username: &str) -> Result<Credential, AuthError> {
        self.store
            .find_by_username(username)
            .await?
            .ok_or(AuthError::Unauthorized)
    }
}

/// Runs Argon2id hashing off the async runtime
async fn hash_on_blocking_pool(password: String) -> Result<String, AuthError> {
    let joined = tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| {
            warn!(error = %e, "blocking hash task failed to join");
            AuthError::Internal
        })?;
    Ok(joined?)
}

/// Runs Argon2id verification off the async runtime
async fn verify_on_blocking_pool(password: String, hash: String) -> Result<bool, AuthError> {
    let joined = tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| {
            warn!(error = %e, "blocking verify task failed to join");
            AuthError::Internal
        })?;
    Ok(joined?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::InMemoryCredentialStore;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";
    const STRONG_PASSWORD: &str = "Xk9!mQ2p$vL7";

    fn service() -> AuthService {
        AuthService::new(
            Arc::new(InMemoryCredentialStore::new()),
            JwtConfig::new(SECRET.to_string()),
        )
    }

    #[tokio::test]
    async fn test_sign_up_issues_activation_token() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");

        assert!(!issued.credential.is_active);
        assert_ne!(issued.credential.password_hash, STRONG_PASSWORD);
        assert!(issued.credential.password_hash.starts_with("$argon2id$"));

        let claims = service
            .tokens
            .decode_kind(&issued.activation.token, TokenKind::Activation)
            .expect("activation token should decode");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_weak_password() {
        let service = service();
        let result = service.sign_up("bob", "bob@example.com", "password").await;

        match result {
            Err(AuthError::Validation(errors)) => {
                assert!(!errors.is_empty());
                assert!(errors.iter().any(|e| e.contains("too common")));
            }
            other => panic!("expected Validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_sign_up_rejects_username_lookalike() {
        let service = service();
        let result = service
            .sign_up("bob", "bob@example.com", "bobbob123")
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_is_conflict() {
        let service = service();
        service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("first sign_up should succeed");

        let result = service
            .sign_up("alice", "elsewhere@example.com", STRONG_PASSWORD)
            .await;
        assert!(matches!(result, Err(AuthError::Conflict)));
    }

    #[tokio::test]
    async fn test_log_in_requires_activation() {
        let service = service();
        service
            .sign_up("carol", "carol@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");

        let result = service.log_in("carol", STRONG_PASSWORD).await;
        assert!(matches!(result, Err(AuthError::AccountNotActive)));
    }

    #[tokio::test]
    async fn test_log_in_after_activation() {
        let service = service();
        let issued = service
            .sign_up("carol", "carol@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");

        service
            .activate_account(&issued.activation.token)
            .await
            .expect("activation should succeed");

        let pair = service
            .log_in("carol", STRONG_PASSWORD)
            .await
            .expect("login should succeed");

        let access = service
            .verify_access_token(&pair.access.token)
            .expect("access token should verify");
        assert_eq!(access.sub, "carol");
        assert_eq!(access.email, "carol@example.com");

        let refresh = service
            .tokens
            .decode_kind(&pair.refresh.token, TokenKind::Refresh)
            .expect("refresh token should decode");
        assert_eq!(refresh.sub, "carol");
    }

    #[tokio::test]
    async fn test_unknown_user_and_wrong_password_are_indistinguishable() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");
        service
            .activate_account(&issued.activation.token)
            .await
            .expect("activation should succeed");

        let unknown = service.log_in("mallory", STRONG_PASSWORD).await;
        let wrong = service.log_in("alice", "Wrong!Pass9zQ").await;

        let unknown = unknown.err().expect("unknown user should fail");
        let wrong = wrong.err().expect("wrong password should fail");
        assert!(matches!(unknown, AuthError::Unauthorized));
        assert!(matches!(wrong, AuthError::Unauthorized));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_activation_is_single_shot() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");

        let activated = service
            .activate_account(&issued.activation.token)
            .await
            .expect("activation should succeed");
        assert!(activated.is_active);

        let again = service.activate_account(&issued.activation.token).await;
        assert!(matches!(again, Err(AuthError::AlreadyActive)));
    }

    #[tokio::test]
    async fn test_activate_rejects_non_activation_tokens() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");
        service
            .activate_account(&issued.activation.token)
            .await
            .expect("activation should succeed");

        let pair = service
            .log_in("alice", STRONG_PASSWORD)
            .await
            .expect("login should succeed");

        let result = service.activate_account(&pair.access.token).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_activate_with_garbage_token() {
        let service = service();
        let result = service.activate_account("not-a-token").await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_refresh_access_token() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");
        service
            .activate_account(&issued.activation.token)
            .await
            .expect("activation should succeed");
        let pair = service
            .log_in("alice", STRONG_PASSWORD)
            .await
            .expect("login should succeed");

        let access = service
            .refresh_access_token(&pair.refresh.token)
            .await
            .expect("refresh should succeed");
        let claims = service
            .verify_access_token(&access.token)
            .expect("new access token should verify");
        assert_eq!(claims.sub, "alice");
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");
        service
            .activate_account(&issued.activation.token)
            .await
            .expect("activation should succeed");
        let pair = service
            .log_in("alice", STRONG_PASSWORD)
            .await
            .expect("login should succeed");

        let result = service.refresh_access_token(&pair.access.token).await;
        assert!(matches!(result, Err(AuthError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");
        service
            .activate_account(&issued.activation.token)
            .await
            .expect("activation should succeed");

        let reset = service
            .request_password_reset("alice@example.com")
            .await
            .expect("reset request should succeed");

        let new_password = "Nw4$hT8u&bQ1";
        service
            .password_reset(&reset.activation.token, new_password, new_password)
            .await
            .expect("password reset should succeed");

        assert!(matches!(
            service.log_in("alice", STRONG_PASSWORD).await,
            Err(AuthError::Unauthorized)
        ));
        service
            .log_in("alice", new_password)
            .await
            .expect("login with new password should succeed");
    }

    #[tokio::test]
    async fn test_password_reset_mismatched_confirmation() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");

        let result = service
            .password_reset(&issued.activation.token, "Nw4$hT8u&bQ1", "different")
            .await;
        match result {
            Err(AuthError::Validation(errors)) => {
                assert!(errors.iter().any(|e| e.contains("do not match")));
            }
            other => panic!("expected Validation error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_password_reset_rejects_weak_replacement() {
        let service = service();
        let issued = service
            .sign_up("alice", "alice@example.com", STRONG_PASSWORD)
            .await
            .expect("sign_up should succeed");

        let result = service
            .password_reset(&issued.activation.token, "password", "password")
            .await;
        assert!(matches!(result, Err(AuthError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reset_request_for_unknown_email() {
        let service = service();
        let result = service.request_password_reset("nobody@example.com").await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }
}
