use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    AppState,
    llm::{ChatMessage, LlmRequest},
    web::{GatewayError, MALFORMED_FLASHCARDS_MESSAGE, json_or_default},
};

const FLASHCARD_COUNT: usize = 3;
const FLASHCARD_TEMPERATURE: f32 = 0.7;
const TOPIC_REQUIRED: &str = "Topic is required";
const UPSTREAM_FAILURE: &str = "Internal server error";

pub fn router() -> Router<AppState> {
    Router::new().route("/flashcards", post(generate_flashcards))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

async fn generate_flashcards(
    State(state): State<AppState>,
    payload: Result<Json<FlashcardRequest>, JsonRejection>,
) -> Result<Json<Value>, GatewayError> {
    let payload = json_or_default(payload);
    let topic = payload
        .topic
        .filter(|topic| !topic.is_empty())
        .ok_or_else(|| GatewayError::validation(TOPIC_REQUIRED))?;

    let prompt = build_prompt(&topic, payload.additional_info.as_deref());
    let request = LlmRequest::new(state.models().flashcards.clone(), vec![ChatMessage::user(prompt)])
        .with_temperature(FLASHCARD_TEMPERATURE);

    let response = state
        .completion_model()
        .complete(request)
        .await
        .map_err(|err| GatewayError::upstream(UPSTREAM_FAILURE, err))?;

    let cards = parse_flashcards(&response.text)?;
    info!(%topic, model = %response.model, "flashcards generated");
    Ok(Json(cards))
}

fn build_prompt(topic: &str, additional_info: Option<&str>) -> String {
    let context = match additional_info.filter(|info| !info.is_empty()) {
        Some(info) => format!("Additional context: {info}"),
        None => String::new(),
    };

    format!(
        r#"
You are an AI assistant that creates educational flashcards.

Create exactly {FLASHCARD_COUNT} flashcards in JSON array format.
Each flashcard should have the following structure:
{{
  id: number,
  front: string, // the question
  back: string   // the answer
}}

The topic is: "{topic}"
{context}

Only return the JSON array. Do not include any other explanation or formatting.
"#
    )
}

/// Parse model text as JSON, keeping the raw text when it is not.
///
/// Any JSON value passes through untouched; divergence from the card shape is
/// only logged.
fn parse_flashcards(raw: &str) -> Result<Value, GatewayError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|_| GatewayError::MalformedGeneration {
            message: MALFORMED_FLASHCARDS_MESSAGE,
            raw: raw.to_string(),
        })?;

    match value.as_array() {
        Some(cards) if !cards.iter().all(is_flashcard) => {
            warn!("model returned cards without the id, front and back fields");
        }
        Some(cards) if cards.len() != FLASHCARD_COUNT => {
            warn!(count = cards.len(), "model returned an unexpected number of flashcards");
        }
        Some(_) => {}
        None => warn!("model output is valid JSON but not a flashcard array"),
    }

    Ok(value)
}

/// `{id, front, back}` with string faces, the card shape the prompt asks for.
fn is_flashcard(card: &Value) -> bool {
    card.get("id").is_some()
        && card.get("front").is_some_and(Value::is_string)
        && card.get("back").is_some_and(Value::is_string)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        llm::{MessageRole, testing::StubModel},
        web::test_support::{
            app_with, body_bytes, json_body, json_request, raw_post, unused_model,
        },
    };

    #[test]
    fn prompt_names_topic_and_optional_context() {
        let prompt = build_prompt("Mitosis", Some("Focus on prophase"));
        assert!(prompt.contains("Create exactly 3 flashcards"));
        assert!(prompt.contains("The topic is: \"Mitosis\""));
        assert!(prompt.contains("Additional context: Focus on prophase"));

        let bare = build_prompt("Mitosis", Some(""));
        assert!(!bare.contains("Additional context"));
        assert!(bare.contains("Only return the JSON array."));
    }

    #[test]
    fn lenient_parse_returns_any_json() {
        let value = parse_flashcards(r#"{"cards": []}"#).expect("json object");
        assert_eq!(value, json!({ "cards": [] }));
    }

    #[test]
    fn card_shape_is_read_from_the_value() {
        assert!(is_flashcard(&json!({ "id": 1, "front": "Q", "back": "A" })));
        assert!(is_flashcard(&json!({ "id": "c1", "front": "Q", "back": "A", "hint": "h" })));
        assert!(!is_flashcard(&json!({ "id": 1, "front": "Q" })));
        assert!(!is_flashcard(&json!({ "front": "Q", "back": "A" })));
        assert!(!is_flashcard(&json!({ "id": 1, "front": 2, "back": "A" })));
        assert!(!is_flashcard(&json!("Q")));
    }

    #[test]
    fn non_json_keeps_raw_text() {
        let err = parse_flashcards("Here are your flashcards: ...").expect_err("not json");
        assert!(matches!(
            err,
            GatewayError::MalformedGeneration { ref raw, .. } if raw == "Here are your flashcards: ..."
        ));
    }

    #[tokio::test]
    async fn returns_parsed_array_unchanged() {
        let cards = r#"[{"id":1,"front":"Q","back":"A"},{"id":2,"front":"Q2","back":"A2","zeta":0,"alpha":1}]"#;
        let model = Arc::new(StubModel::replying(cards));
        let (app, _dir) = app_with(unused_model(), model.clone());

        let response = app
            .oneshot(json_request("POST", "/flashcards", json!({ "topic": "Mitosis" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, cards.as_bytes());

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "openai/gpt-4");
        assert_eq!(requests[0].temperature, Some(0.7));
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].role, MessageRole::User);
        assert!(requests[0].messages[0].text.contains("\"Mitosis\""));
    }

    #[tokio::test]
    async fn forwards_additional_info() {
        let model = Arc::new(StubModel::replying("[]"));
        let (app, _dir) = app_with(unused_model(), model.clone());

        let response = app
            .oneshot(json_request(
                "POST",
                "/flashcards",
                json!({ "topic": "Mitosis", "additionalInfo": "High school level" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            model.requests()[0].messages[0]
                .text
                .contains("Additional context: High school level")
        );
    }

    #[tokio::test]
    async fn non_json_output_is_500_with_raw_text() {
        let model = Arc::new(StubModel::replying("Sure! Here are three flashcards."));
        let (app, _dir) = app_with(unused_model(), model);

        let response = app
            .oneshot(json_request("POST", "/flashcards", json!({ "topic": "Mitosis" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({
                "error": "Failed to parse flashcards response. Ensure the format is valid JSON.",
                "raw": "Sure! Here are three flashcards."
            })
        );
    }

    #[tokio::test]
    async fn missing_topic_is_rejected() {
        let model = Arc::new(StubModel::replying("[]"));
        let (app, _dir) = app_with(unused_model(), model.clone());

        let response = app
            .oneshot(json_request(
                "POST",
                "/flashcards",
                json!({ "additionalInfo": "anything" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Topic is required" })
        );
        assert!(model.requests().is_empty());
    }

    #[tokio::test]
    async fn unreadable_body_counts_as_missing_topic() {
        for request in [
            raw_post("/flashcards", None, r#"{"topic":"Mitosis"}"#),
            raw_post("/flashcards", Some("application/json"), "{topic: Mitosis"),
        ] {
            let model = Arc::new(StubModel::replying("[]"));
            let (app, _dir) = app_with(unused_model(), model.clone());

            let response = app.oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                json_body(response).await,
                json!({ "error": "Topic is required" })
            );
            assert!(model.requests().is_empty());
        }
    }

    #[tokio::test]
    async fn upstream_failure_is_500() {
        let model = Arc::new(StubModel::failing("rate limited"));
        let (app, _dir) = app_with(unused_model(), model);

        let response = app
            .oneshot(json_request("POST", "/flashcards", json!({ "topic": "Mitosis" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Internal server error" })
        );
    }
}
