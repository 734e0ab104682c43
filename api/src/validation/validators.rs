//! Field validators for checks that are not token rules

/// Validate that a string is not empty after trimming
pub fn validate_required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("is required".to_string());
    }
    Ok(())
}

/// Validate the number of items in an optional list
pub fn validate_item_count<T>(items: Option<&[T]>, min: usize, max: usize) -> Result<(), String> {
    let len = items.map_or(0, <[T]>::len);
    if items.is_some() && len < min {
        return Err(format!("must contain at least {} items", min));
    }
    if len > max {
        return Err(format!("must contain at most {} items", max));
    }
    Ok(())
}
