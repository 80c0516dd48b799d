/// Password hashing and verification using Argon2id
use crate::error::{AccountError, AccountResult};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a password with a random salt, returning a PHC string
pub fn hash_password(password: &str) -> AccountResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AccountError::Internal(format!("Password hashing failed: {}", e)))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against its PHC hash
pub fn verify_password(password: &str, password_hash: &str) -> AccountResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| AccountError::Internal(format!("Invalid password hash format: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AccountError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}
