/// Trim and lowercase an email so one account maps to one storage key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate email format
///
/// Basic structural check for signup and login. Path separators are refused
/// because the email becomes part of the user's object key.
pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters".to_string());
    }

    if email.contains('/') || email.contains('\\') || email.chars().any(char::is_whitespace) {
        return Err("Invalid email format".to_string());
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format".to_string());
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err("Invalid email format".to_string());
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}
