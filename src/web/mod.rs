pub mod error;
pub mod extract;
pub mod responses;
pub mod router;
pub mod state;
pub mod uploads;

#[cfg(test)]
pub mod test_support;

pub use error::{GatewayError, MALFORMED_FLASHCARDS_MESSAGE};
pub use extract::json_or_default;
pub use responses::ApiMessage;
pub use state::AppState;
