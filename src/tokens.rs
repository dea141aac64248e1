//! Email-verification and password-reset tokens.
//!
//! This module is the only writer of the token columns on `users`. Tokens are
//! 32 random bytes, hex encoded, stored as-is and compared by exact equality
//! in constant time.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use subtle::ConstantTimeEq;

use crate::auth::password;
use crate::db;
use crate::models::User;

pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
    Invalid,
}

#[derive(Debug)]
pub enum ResetError {
    /// Unknown email or token mismatch. Deliberately indistinguishable.
    Invalid,
    Expired,
    WeakPassword(Vec<String>),
    SamePassword,
    Internal(String),
    Database(sqlx::Error),
}

impl From<sqlx::Error> for ResetError {
    fn from(err: sqlx::Error) -> Self {
        ResetError::Database(err)
    }
}

pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

/// Hex SHA-256 of a token, used wherever a token is stored or compared at rest.
pub fn digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn tokens_match(stored: Option<&str>, presented: &str) -> bool {
    match stored {
        Some(stored) => stored.as_bytes().ct_eq(presented.as_bytes()).into(),
        None => false,
    }
}

/// True iff a reset token and its expiry are both present and `now` is
/// strictly before the expiry.
pub fn reset_token_valid(user: &User, now: DateTime<Utc>) -> bool {
    match (&user.password_reset_token, user.password_reset_token_expires) {
        (Some(_), Some(expires)) => now < expires,
        _ => false,
    }
}

pub async fn issue_verification_token<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user: &User,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    db::users::set_verification_token(executor, user.id, &token).await?;
    Ok(token)
}

/// Overwrites any unconsumed reset token. Token and expiry are written together.
pub async fn issue_reset_token(pool: &PgPool, user: &User) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
    db::users::set_reset_token(pool, user.id, &token, expires_at).await?;
    Ok(token)
}

pub async fn verify_email(
    pool: &PgPool,
    email: &str,
    token: &str,
) -> Result<VerifyOutcome, sqlx::Error> {
    let Some(user) = db::users::find_by_email(pool, email).await? else {
        return Ok(VerifyOutcome::Invalid);
    };

    if user.email_verified {
        let seen = tokens_match(user.verified_token_digest.as_deref(), &digest(token))
            || tokens_match(user.email_verification_token.as_deref(), token);
        return Ok(if seen {
            VerifyOutcome::AlreadyVerified
        } else {
            VerifyOutcome::Invalid
        });
    }

    if !tokens_match(user.email_verification_token.as_deref(), token) {
        return Ok(VerifyOutcome::Invalid);
    }

    if db::users::mark_email_verified(pool, user.id, token, &digest(token)).await? {
        tracing::info!(user_id = %user.id, "Email verified");
        Ok(VerifyOutcome::Verified)
    } else {
        // Lost a race with a concurrent verification of the same token.
        Ok(VerifyOutcome::AlreadyVerified)
    }
}

/// Consumes a reset token and sets the new password. Returns the user whose
/// password changed.
pub async fn consume_reset_token(
    pool: &PgPool,
    email: &str,
    token: &str,
    new_password: &str,
) -> Result<User, ResetError> {
    let user = db::users::find_by_email(pool, email)
        .await?
        .filter(|user| tokens_match(user.password_reset_token.as_deref(), token))
        .ok_or(ResetError::Invalid)?;

    if !reset_token_valid(&user, Utc::now()) {
        return Err(ResetError::Expired);
    }

    let problems = password::validate_strength(new_password, &user.username, &user.email);
    if !problems.is_empty() {
        return Err(ResetError::WeakPassword(problems));
    }

    if password::verify(new_password, &user.password_hash).map_err(ResetError::Internal)? {
        return Err(ResetError::SamePassword);
    }

    let pw_hash = password::hash(new_password).map_err(ResetError::Internal)?;
    if !db::users::complete_password_reset(pool, user.id, token, &pw_hash).await? {
        return Err(ResetError::Invalid);
    }

    tracing::info!(user_id = %user.id, "Password reset completed");
    Ok(user)
}
