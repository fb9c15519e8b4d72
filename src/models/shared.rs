use crate::error::AppError;

/// Validate a trimmed name field (1-`max` Unicode characters).
pub fn validate_name(name: &str, max: usize) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > max {
        return Err(AppError::Validation(format!(
            "Name must be 1-{max} characters"
        )));
    }
    Ok(())
}
