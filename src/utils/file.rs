use mime::Mime;

use crate::errors::{AppError, Result};

/// Content type of an uploaded part. Falls back to guessing from the file
/// name when the client sent none.
pub fn resolve_mime_type(declared: Option<&str>, file_name: Option<&str>) -> Option<Mime> {
    declared
        .and_then(|value| value.parse::<Mime>().ok())
        .or_else(|| file_name.and_then(|name| mime_guess::from_path(name).first()))
}

pub fn validate_mime_type(mime_type: &Mime, allowed_types: &[String]) -> Result<()> {
    let essence = mime_type.essence_str();
    if !allowed_types.iter().any(|allowed| allowed.eq_ignore_ascii_case(essence)) {
        return Err(AppError::Validation(format!(
            "Unsupported file type: {}. Allowed: {}",
            essence,
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

/// Checks the extension implied by the mime type against a plan's allowed
/// image formats.
pub fn validate_image_format(mime_type: &Mime, formats: &[String]) -> Result<()> {
    let extension = get_file_extension(mime_type);
    let allowed = formats.iter().any(|f| {
        f.eq_ignore_ascii_case(extension) || (extension == "jpg" && f.eq_ignore_ascii_case("jpeg"))
    });
    if !allowed {
        return Err(AppError::Validation(format!(
            "Image format {} is not allowed on your plan",
            extension
        )));
    }
    Ok(())
}

pub fn get_file_extension(mime_type: &Mime) -> &'static str {
    match mime_type.essence_str() {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}
