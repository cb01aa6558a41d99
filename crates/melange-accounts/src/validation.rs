//! Registration input validation.

use crate::{
    errors::{AccountError, Result},
    types::CreateUserRequest,
};

/// Maximum display name length in characters
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum username length in characters
pub const MAX_USERNAME_LENGTH: usize = 20;

fn required(value: &str, field: &str, max: Option<usize>) -> Result<()> {
    if value.is_empty() {
        return Err(AccountError::Validation(format!("{} is required", field)));
    }

    if let Some(max) = max {
        if value.chars().count() > max {
            return Err(AccountError::Validation(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
    }

    Ok(())
}

/// Validate a registration request
///
/// Name and username are required and bounded; the password and its
/// confirmation are required and must match.
pub fn validate_create_user(request: &CreateUserRequest) -> Result<()> {
    required(&request.name, "name", Some(MAX_NAME_LENGTH))?;
    required(&request.username, "username", Some(MAX_USERNAME_LENGTH))?;
    required(&request.password, "password", None)?;
    required(&request.confirm_password, "password confirmation", None)?;

    if request.password != request.confirm_password {
        return Err(AccountError::Validation(
            "password and confirmation do not match".to_string(),
        ));
    }

    Ok(())
}
