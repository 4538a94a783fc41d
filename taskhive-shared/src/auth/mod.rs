/// Authentication and credential utilities
///
/// This module provides the secure authentication primitives for TaskHive:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength validation
/// - [`token`]: JWT token issuance and validation (access, refresh, activation)
/// - [`store`]: Credential model and storage boundary
/// - [`service`]: Account lifecycle orchestration (sign up, log in, activate, reset)
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Strength Gate**: score estimator, similarity checks, common-password denylist
/// - **JWT Tokens**: HS256 signing with per-kind expiration and kind-checked decode
/// - **Constant-time Comparison**: All verification uses constant-time operations
///
/// # Example
///
/// ```no_run
/// use taskhive_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```
pub mod password;
pub mod service;
pub mod store;
pub mod token;
