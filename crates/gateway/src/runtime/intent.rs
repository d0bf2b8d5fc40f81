//! Intent classification — runs once when a session enters INTENT.
//!
//! Low temperature, JSON-mode output. Any parse failure defaults to
//! `ordering`: greeting a restaurant bot almost always means food.

use serde::Deserialize;

use sufra_domain::fsm::Intent;
use sufra_domain::tool::ChatMessage;
use sufra_providers::{ChatRequest, LlmProvider};

use super::prompts::INTENT_SYSTEM_PROMPT;

#[derive(Debug, Clone)]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f64,
    pub rationale: String,
}

impl Default for IntentResult {
    fn default() -> Self {
        Self {
            intent: Intent::Ordering,
            confidence: 0.0,
            rationale: String::new(),
        }
    }
}

#[derive(Deserialize)]
struct RawIntent {
    intent: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    rationale_ar: String,
}

/// Parse the classifier's JSON output. Unknown labels map to `Other`;
/// unparseable output falls back to the ordering default.
pub fn parse_intent_json(raw: &str) -> IntentResult {
    let Ok(parsed) = serde_json::from_str::<RawIntent>(raw) else {
        return IntentResult::default();
    };
    let intent = match parsed.intent.as_str() {
        "ordering" => Intent::Ordering,
        "complaint" => Intent::Complaint,
        "inquiry" => Intent::Inquiry,
        _ => Intent::Other,
    };
    IntentResult {
        intent,
        confidence: parsed.confidence,
        rationale: parsed.rationale_ar,
    }
}

/// Classify a user message. Never fails: LLM errors collapse to the
/// ordering default.
pub async fn classify(provider: &dyn LlmProvider, user_text: &str) -> IntentResult {
    let req = ChatRequest {
        messages: vec![
            ChatMessage::system(INTENT_SYSTEM_PROMPT),
            ChatMessage::user(user_text),
        ],
        tools: vec![],
        temperature: Some(0.2),
        max_tokens: Some(300),
        json_mode: true,
    };

    match provider.chat(&req).await {
        Ok(resp) => {
            let result = parse_intent_json(&resp.content);
            tracing::debug!(
                intent = ?result.intent,
                confidence = result.confidence,
                "intent classified"
            );
            result
        }
        Err(e) => {
            tracing::warn!(error = %e, "intent classification failed, defaulting to ordering");
            IntentResult::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_label() {
        for (raw, expected) in [
            ("ordering", Intent::Ordering),
            ("complaint", Intent::Complaint),
            ("inquiry", Intent::Inquiry),
            ("other", Intent::Other),
        ] {
            let json = format!("{{\"intent\": \"{raw}\", \"confidence\": 0.9}}");
            assert_eq!(parse_intent_json(&json).intent, expected);
        }
    }

    #[test]
    fn unknown_label_is_other() {
        let result = parse_intent_json("{\"intent\": \"greeting\"}");
        assert_eq!(result.intent, Intent::Other);
    }

    #[test]
    fn garbage_defaults_to_ordering() {
        let result = parse_intent_json("السلام عليكم");
        assert_eq!(result.intent, Intent::Ordering);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn carries_confidence_and_rationale() {
        let result = parse_intent_json(
            "{\"intent\": \"complaint\", \"confidence\": 0.85, \"rationale_ar\": \"الأكل بارد\"}",
        );
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.rationale, "الأكل بارد");
    }
}
