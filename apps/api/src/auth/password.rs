use crate::auth::AuthError;

pub const MIN_PASSWORD_CHARS: usize = 8;

/// Cheapest cost bcrypt accepts; keeps tests fast.
#[cfg(test)]
pub const TEST_COST: u32 = 4;

/// Checks username shape. Usernames double as history keys, so they are kept plain.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@');
    if (3..=64).contains(&len) && username.chars().all(allowed) {
        Ok(())
    } else {
        Err(AuthError::InvalidUsername)
    }
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), AuthError> {
    if password != confirmation {
        return Err(AuthError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::WeakPassword(MIN_PASSWORD_CHARS));
    }
    Ok(())
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Malformed stored hashes count as a mismatch rather than an internal error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
