use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

pub const MIN_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "12345678", "123456789", "1234567890",
    "qwerty123", "qwertyuiop", "iloveyou", "sunshine", "princess", "football",
    "baseball", "welcome1", "letmein1", "admin123", "abc12345", "trustno1",
    "passw0rd", "whatever", "starwars", "dragon123", "monkey123", "11111111",
];

/// Hash a password using Argon2id (19MB memory, 2 iterations, parallelism 1).
pub fn hash(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let params = Params::new(19 * 1024, 2, 1, None).map_err(|e| format!("Invalid params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| format!("Hashing failed: {e}"))
}

/// Verify a password against a hash.
pub fn verify(password: &str, hash: &str) -> Result<bool, String> {
    let parsed = PasswordHash::new(hash).map_err(|e| format!("Invalid hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Strength policy. Returns every rule the password breaks; empty means ok.
pub fn validate_strength(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_LENGTH} characters."
        ));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    let local_part = email.split('@').next().unwrap_or_default();
    let similar = [username, local_part]
        .iter()
        .map(|attr| attr.to_lowercase())
        .filter(|attr| attr.len() >= 3)
        .any(|attr| lowered.contains(&attr) || attr.contains(&lowered));
    if similar {
        problems.push("The password is too similar to your account details.".to_string());
    }

    problems
}
