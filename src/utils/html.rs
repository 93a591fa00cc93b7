// src/utils/html.rs

use crate::error::AppError;

/// Strips dangerous markup from user-supplied free text (swap messages,
/// feedback comments, announcements) before it is stored.
///
/// Safe inline tags such as `<b>` survive; `<script>` is removed together with
/// its content. The result is trimmed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input).trim().to_string()
}

/// The text a reader would see, with every tag removed.
fn visible_text(input: &str) -> String {
    ammonia::Builder::empty().clean(input).to_string()
}

/// Validates a required free-text field and returns its sanitized form.
///
/// The length limit applies to the trimmed input as typed, so `R&D` is three
/// characters even though it is stored as `R&amp;D`. Markup without text,
/// such as `<b></b>`, counts as blank.
pub fn required_text(value: &str, field: &str, max_chars: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }

    let cleaned = clean_html(trimmed);
    if visible_text(&cleaned).trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(cleaned)
}
