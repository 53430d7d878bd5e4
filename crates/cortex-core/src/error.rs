use http::StatusCode;
use serde_json::{Map, Value};

/// Trait for domain errors that can be converted to HTTP responses
///
/// Implemented by each feature crate's error type. The server layer
/// converts these into actual HTTP responses, keeping domain errors
/// decoupled from axum.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;

    /// Extra fields merged into the error object (provider name, limits, validation issues)
    fn details(&self) -> Option<Map<String, Value>> {
        None
    }
}

/// Render the JSON body shared by every error response
///
/// Shape: `{"error": {"message": ..., "type": ..., <details>}}`
pub fn error_body<E: HttpError + ?Sized>(error: &E) -> Value {
    let mut object = Map::new();
    object.insert("message".to_owned(), Value::String(error.client_message()));
    object.insert("type".to_owned(), Value::String(error.error_type().to_owned()));

    if let Some(details) = error.details() {
        for (key, value) in details {
            // Core fields are never overridden by details
            object.entry(key).or_insert(value);
        }
    }

    let mut body = Map::new();
    body.insert("error".to_owned(), Value::Object(object));
    Value::Object(body)
}
