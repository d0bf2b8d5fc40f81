//! Conversation summarization.
//!
//! The summary replaces the long conversation prefix in later prompts.
//! Triggers: significant FSM edges, every fifth user turn, or the
//! estimated thread tokens crossing the budget.

use sufra_domain::fsm::State;
use sufra_domain::session::Session;
use sufra_domain::tokens::estimate_history_tokens;
use sufra_domain::tool::{ChatMessage, Role};
use sufra_providers::{ChatRequest, LlmProvider};

use super::prompts::SUMMARIZER_SYSTEM_PROMPT;

/// Force a summarization pass once the thread estimate crosses this.
pub const TOKEN_BUDGET: u32 = 2000;

/// How much raw history survives after a summarization pass.
pub const KEEP_AFTER_SUMMARY: usize = 12;

/// Should a summary be (re)generated this turn?
pub fn should_summarize(prev: State, next: State, user_turns: u32, session: &Session) -> bool {
    let significant = matches!(
        (prev, next),
        (State::Greeting, State::Location)
            | (State::Location, State::Ordering)
            | (State::Ordering, State::Checkout)
    );
    if significant {
        return true;
    }
    if user_turns > 0 && user_turns % 5 == 0 {
        return true;
    }
    estimate_history_tokens(&session.conversation_history) > TOKEN_BUDGET
}

fn conversation_text(session: &Session) -> String {
    let mut buf = String::new();
    for entry in &session.conversation_history {
        let label = match entry.role {
            Role::User => "العميل",
            Role::Assistant => "المساعد",
            _ => continue,
        };
        buf.push_str(label);
        buf.push_str(": ");
        buf.push_str(&entry.content);
        buf.push('\n');
    }
    buf
}

/// Deterministic summary assembled from session state, used when the
/// summarizer LLM call fails.
pub fn fallback_summary(session: &Session) -> String {
    let mut parts = Vec::new();
    if !session.cart.is_empty() {
        let items = session
            .cart
            .iter()
            .map(|i| i.name_ar.as_str())
            .collect::<Vec<_>>()
            .join("، ");
        parts.push(format!("طلب: {items}"));
    }
    if let Some(area) = session.location.area_name.as_deref() {
        parts.push(format!("موقع: {area}"));
    }
    if let Some(name) = session.customer_name.as_deref() {
        parts.push(format!("اسم: {name}"));
    }
    if parts.is_empty() {
        "محادثة جديدة".into()
    } else {
        parts.join(" | ")
    }
}

/// Generate (or regenerate) the Arabic summary. Never fails.
pub async fn summarize(provider: &dyn LlmProvider, session: &Session) -> String {
    let conversation = conversation_text(session);
    if conversation.is_empty() {
        return fallback_summary(session);
    }

    let req = ChatRequest {
        messages: vec![
            ChatMessage::system(SUMMARIZER_SYSTEM_PROMPT),
            ChatMessage::user(conversation),
        ],
        tools: vec![],
        temperature: Some(0.3),
        max_tokens: Some(500),
        json_mode: false,
    };

    match provider.chat(&req).await {
        Ok(resp) if !resp.content.trim().is_empty() => resp.content.trim().to_string(),
        Ok(_) => fallback_summary(session),
        Err(e) => {
            tracing::warn!(error = %e, "summarizer failed, using fallback summary");
            fallback_summary(session)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sufra_domain::session::CartItem;

    fn session() -> Session {
        Session::new("s1", 2)
    }

    #[test]
    fn significant_edges_trigger() {
        let s = session();
        assert!(should_summarize(State::Greeting, State::Location, 1, &s));
        assert!(should_summarize(State::Location, State::Ordering, 1, &s));
        assert!(should_summarize(State::Ordering, State::Checkout, 1, &s));
        assert!(!should_summarize(State::Checkout, State::Finalized, 1, &s));
    }

    #[test]
    fn every_fifth_turn_triggers() {
        let s = session();
        assert!(should_summarize(State::Ordering, State::Ordering, 5, &s));
        assert!(should_summarize(State::Ordering, State::Ordering, 10, &s));
        assert!(!should_summarize(State::Ordering, State::Ordering, 4, &s));
    }

    #[test]
    fn token_budget_triggers() {
        let mut s = session();
        let long = "كلام طويل جداً ".repeat(400);
        s.push_message(Role::User, long);
        assert!(should_summarize(State::Ordering, State::Ordering, 1, &s));
    }

    #[test]
    fn fallback_reflects_session_state() {
        let mut s = session();
        assert_eq!(fallback_summary(&s), "محادثة جديدة");

        s.add_to_cart(CartItem::new(1, "برجر لحم", 1, 25.0, vec![], None));
        s.location.area_name = Some("النرجس".into());
        s.customer_name = Some("محمد".into());
        let summary = fallback_summary(&s);
        assert!(summary.contains("برجر لحم"));
        assert!(summary.contains("النرجس"));
        assert!(summary.contains("محمد"));
    }

    #[test]
    fn conversation_text_skips_tool_entries() {
        let mut s = session();
        s.push_message(Role::User, "أبي برجر");
        s.push_tool_message("c1", "{\"success\":true}");
        s.push_message(Role::Assistant, "أضفته لك");
        let text = conversation_text(&s);
        assert!(text.contains("العميل: أبي برجر"));
        assert!(text.contains("المساعد: أضفته لك"));
        assert!(!text.contains("success"));
    }
}
