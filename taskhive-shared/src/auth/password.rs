/// Password hashing and strength validation using Argon2id
///
/// This module provides secure password hashing using the Argon2id algorithm,
/// plus the strength gate applied at registration and password reset.
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
/// - **Strength Gate**: entropy estimator (score 0-4), similarity to the
///   username/email, and a common-password denylist
///
/// # Example
///
/// ```
/// use taskhive_shared::auth::password::{hash_password, verify_password, PasswordValidator};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Xk9!mQ2p$vL7")?;
/// assert!(verify_password("Xk9!mQ2p$vL7", &hash)?);
/// assert!(!verify_password("wrong_password", &hash)?);
///
/// let validator = PasswordValidator::new();
/// let report = validator.validate("Xk9!mQ2p$vL7", "bob", "bob@example.com");
/// assert!(report.is_valid);
/// # Ok(())
/// # }
/// ```
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password using Argon2id with secure parameters
///
/// # Security Parameters
///
/// - Memory: 64 MB (65536 KB)
/// - Iterations: 3 passes
/// - Parallelism: 4 lanes
/// - Salt: 16 bytes random, generated per call using the OS RNG
///
/// Because the salt is random, hashing the same password twice produces two
/// different PHC strings.
///
/// # Returns
///
/// PHC string format hash (includes algorithm, parameters, salt, and hash):
///
/// ```text
/// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536) // 64 MB
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Performs constant-time comparison to prevent timing attacks.
///
/// # Returns
///
/// `Ok(true)` if the password matches, `Ok(false)` if it doesn't match
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if the stored hash is malformed, or
/// `PasswordError::VerifyError` for other verification failures. A wrong
/// password is never an error.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters are embedded in the PHC string
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!(
            "Verification failed: {}",
            e
        ))),
    }
}

/// Result of a full password validation pass
///
/// `errors` collects every violated rule; `is_valid` is true exactly when
/// `errors` is empty.
#[derive(Debug, Clone)]
pub struct StrengthReport {
    /// Whether the password passed every rule
    pub is_valid: bool,

    /// Human-readable description of each violated rule
    pub errors: Vec<String>,

    /// Estimated strength score, 0 (very weak) to 4 (very strong)
    pub score: u8,
}

/// Words that reliably show up in cracking wordlists
///
/// Matched as substrings of the lowercased password by the strength estimator.
const WEAK_WORDS: &[&str] = &[
    "password", "qwerty", "admin", "letmein", "welcome", "dragon", "monkey", "login", "iloveyou",
    "sunshine", "master", "secret", "pass",
];

/// Validates password strength, similarity, and denylist membership
///
/// Applies three independent rules:
///
/// 1. **Strength**: an entropy estimate (length x charset) penalized for
///    sequences, repeats, dictionary words, date patterns, and occurrences of
///    the username or email local-part. Rejected below `min_score`.
/// 2. **Similarity**: ratio between the normalized password and the username /
///    email local-part. Rejected above `max_similarity`.
/// 3. **Denylist**: exact match against a fixed set of common passwords.
///
/// All violated rules are reported together so the caller can surface every
/// problem at once.
#[derive(Debug, Clone)]
pub struct PasswordValidator {
    /// Minimum acceptable strength score (0-4, 2 = good)
    pub min_score: u8,

    /// Similarity threshold; strictly greater rejects (80%)
    pub max_similarity: f64,

    /// Exact-match denylist of common passwords
    common_passwords: &'static [&'static str],
}

impl Default for PasswordValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordValidator {
    /// Creates a validator with the default thresholds
    pub fn new() -> Self {
        Self {
            min_score: 2,
            max_similarity: 0.8,
            common_passwords: &["password", "123456", "qwerty", "admin", "letmein"],
        }
    }

    /// Runs the complete validation pass
    ///
    /// # Example
    ///
    /// ```
    /// use taskhive_shared::auth::password::PasswordValidator;
    ///
    /// let validator = PasswordValidator::new();
    ///
    /// let report = validator.validate("password", "bob", "bob@example.com");
    /// assert!(!report.is_valid);
    ///
    /// let report = validator.validate("Xk9!mQ2p$vL7", "bob", "bob@example.com");
    /// assert!(report.is_valid);
    /// ```
    pub fn validate(&self, password: &str, username: &str, email: &str) -> StrengthReport {
        let mut errors = Vec::new();
        let email_local = email.split('@').next().unwrap_or_default();

        // 1. Strength estimation
        let score = estimate_score(password, &[username, email_local]);
        if score < self.min_score {
            let label = score_label(score);
            errors.push(format!(
                "Password is too weak (score: {}). Suggestions: {}",
                label,
                suggestion(password, &[username, email_local])
            ));
        }

        // 2. Similarity to username and email local-part
        let similarity_username = calculate_similarity(password, username);
        let similarity_email = calculate_similarity(password, email_local);
        if similarity_username > self.max_similarity {
            errors.push(format!(
                "Password is too similar to username (similarity: {:.1}%)",
                similarity_username * 100.0
            ));
        } else if similarity_email > self.max_similarity {
            errors.push(format!(
                "Password is too similar to email (similarity: {:.1}%)",
                similarity_email * 100.0
            ));
        }

        // 3. Common passwords
        if self
            .common_passwords
            .contains(&password.to_lowercase().as_str())
        {
            errors.push("Password is too common".to_string());
        }

        StrengthReport {
            is_valid: errors.is_empty(),
            errors,
            score,
        }
    }
}

/// Normalizes a string for similarity comparison (lowercase, whitespace removed)
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Calculates a similarity ratio in [0, 1] between a password and another field
///
/// Both inputs are normalized first. If either contains the other, the ratio is
/// `min_len / max_len`; otherwise it is the fraction of same-position matching
/// characters over the longer length.
pub fn calculate_similarity(password: &str, other_field: &str) -> f64 {
    let norm_password = normalize(password);
    let norm_field = normalize(other_field);

    if norm_password.is_empty() || norm_field.is_empty() {
        return 0.0;
    }

    let pw: Vec<char> = norm_password.chars().collect();
    let field: Vec<char> = norm_field.chars().collect();
    let min_len = pw.len().min(field.len());
    let max_len = pw.len().max(field.len());

    if norm_password.contains(&norm_field) || norm_field.contains(&norm_password) {
        return min_len as f64 / max_len as f64;
    }

    let common_chars = (0..min_len).filter(|&i| pw[i] == field[i]).count();
    common_chars as f64 / max_len as f64
}

/// Estimates password strength on the 0-4 scale
///
/// Starts from a naive entropy estimate (length x log2 of the character-space
/// size) and subtracts penalties for structure an attacker would exploit:
/// sequential runs, repeated characters, doubled halves, embedded wordlist
/// entries, year-like digit groups, and occurrences of the caller-supplied
/// user inputs (username, email local-part).
pub fn estimate_score(password: &str, user_inputs: &[&str]) -> u8 {
    let chars: Vec<char> = password.chars().collect();
    if chars.is_empty() {
        return 0;
    }

    let mut bits = chars.len() as f64 * charset_size(&chars).log2();
    let lowered = password.to_lowercase();

    // Sequential runs ("abc", "321") of three or more
    for run in sequential_runs(&chars) {
        bits -= 3.0 * run as f64;
    }

    // Same-character runs ("aaa") of three or more
    for run in repeat_runs(&chars) {
        bits -= 2.0 * run as f64;
    }

    // Password made of a doubled block ("bobbob" style, even length)
    if chars.len() >= 6 && chars.len() % 2 == 0 {
        let (a, b) = chars.split_at(chars.len() / 2);
        if a == b {
            bits -= 10.0;
        }
    }

    // Embedded wordlist entries
    for word in WEAK_WORDS {
        if lowered.contains(word) {
            bits -= 20.0;
        }
    }

    // Year-like digit groups (19xx / 20xx)
    if contains_year(&chars) {
        bits -= 10.0;
    }

    // Occurrences of the username / email local-part
    for input in user_inputs {
        let needle = normalize(input);
        if needle.len() >= 3 {
            bits -= 24.0 * lowered.matches(&needle).count() as f64;
        }
    }

    match bits {
        b if b < 28.0 => 0,
        b if b < 36.0 => 1,
        b if b < 60.0 => 2,
        b if b < 80.0 => 3,
        _ => 4,
    }
}

fn charset_size(chars: &[char]) -> f64 {
    let mut size = 0usize;
    if chars.iter().any(|c| c.is_ascii_lowercase()) {
        size += 26;
    }
    if chars.iter().any(|c| c.is_ascii_uppercase()) {
        size += 26;
    }
    if chars.iter().any(|c| c.is_ascii_digit()) {
        size += 10;
    }
    if chars.iter().any(|c| !c.is_ascii_alphanumeric()) {
        size += 33;
    }
    size.max(2) as f64
}

/// Lengths of ascending or descending runs of consecutive code points (>= 3)
fn sequential_runs(chars: &[char]) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let mut j = i + 1;
        let mut direction = 0i32;
        while j < chars.len() {
            let step = chars[j] as i32 - chars[j - 1] as i32;
            if step != 1 && step != -1 {
                break;
            }
            if direction == 0 {
                direction = step;
            } else if step != direction {
                break;
            }
            j += 1;
        }
        if j - i >= 3 {
            runs.push(j - i);
        }
        i = if j > i + 1 { j } else { i + 1 };
    }
    runs
}

/// Lengths of same-character runs (>= 3)
fn repeat_runs(chars: &[char]) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let mut j = i + 1;
        while j < chars.len() && chars[j] == chars[i] {
            j += 1;
        }
        if j - i >= 3 {
            runs.push(j - i);
        }
        i = j;
    }
    runs
}

fn contains_year(chars: &[char]) -> bool {
    chars.windows(4).any(|w| {
        w.iter().all(|c| c.is_ascii_digit()) && (w[0] == '1' && w[1] == '9' || w[0] == '2' && w[1] == '0')
    })
}

fn score_label(score: u8) -> &'static str {
    match score {
        0 => "very weak",
        1 => "weak",
        2 => "good",
        3 => "strong",
        _ => "very strong",
    }
}

/// Picks the most actionable hint for a failing password
fn suggestion(password: &str, user_inputs: &[&str]) -> &'static str {
    let lowered = password.to_lowercase();
    if user_inputs
        .iter()
        .any(|input| input.len() >= 3 && lowered.contains(&normalize(input)))
    {
        return "Avoid using your username or email in the password";
    }
    if WEAK_WORDS.iter().any(|w| lowered.contains(w)) {
        return "Avoid common words and predictable substitutions";
    }
    if password.chars().count() < 12 {
        return "Add another word or two; longer passwords are stronger";
    }
    "Use a stronger password"
}
