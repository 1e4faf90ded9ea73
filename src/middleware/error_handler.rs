use crate::core::AppError;
use actix_web::{error::JsonPayloadError, Error, HttpRequest};

/// Render JSON body extraction failures in the `AppError` format
///
/// Installed through `web::JsonConfig::error_handler`.
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> Error {
    tracing::warn!(path = %req.path(), error = %err, "Rejected malformed JSON body");

    AppError::validation(format!("Invalid JSON body: {}", err)).into()
}
