use serde::Serialize;

/// Canonical JSON payload for error responses.
#[derive(Debug, Serialize, Clone)]
pub struct ApiMessage {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ApiMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            raw: None,
        }
    }

    /// Attach the unparsed upstream text for diagnosis.
    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_raw_when_absent() {
        let body = serde_json::to_value(ApiMessage::new("Topic is required")).expect("json");
        assert_eq!(body, serde_json::json!({ "error": "Topic is required" }));
    }

    #[test]
    fn includes_raw_when_attached() {
        let body = serde_json::to_value(ApiMessage::new("bad").with_raw("not json")).expect("json");
        assert_eq!(body, serde_json::json!({ "error": "bad", "raw": "not json" }));
    }
}
