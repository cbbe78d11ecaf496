use axum::{Json, extract::rejection::JsonRejection};
use tracing::debug;

/// Unwrap a JSON body, treating a missing or unreadable one as an empty request.
///
/// Handlers then reject the absent field with their own validation message.
pub fn json_or_default<T: Default>(payload: Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(value)) => value,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "unusable JSON body, treating as empty");
            T::default()
        }
    }
}
