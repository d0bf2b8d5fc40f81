//! Prompt-context assembly.
//!
//! Per-agent context, in order: system prompt; conversation summary (if
//! any); a short handoff hint; the last N user/assistant messages. The
//! current user turn is the tail of the stored history. Tool entries
//! stay in the session for audit but never re-enter later prompts.

use sufra_domain::session::{OrderType, Session};
use sufra_domain::tool::{ChatMessage, Role};

use super::roles::AgentRole;

/// Build the message thread for one agent turn.
pub fn build_thread(role: AgentRole, session: &Session) -> Vec<ChatMessage> {
    let mut thread = vec![ChatMessage::system(role.system_prompt())];

    if let Some(summary) = session
        .conversation_summary
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        thread.push(ChatMessage::system(format!("ملخص المحادثة:\n{summary}")));
    }

    if let Some(hint) = context_hint(role, session) {
        thread.push(ChatMessage::system(format!("[معلومات: {hint}]")));
    }

    let window: Vec<&_> = session
        .conversation_history
        .iter()
        .filter(|e| matches!(e.role, Role::User | Role::Assistant))
        .collect();
    let start = window.len().saturating_sub(role.history_window());
    for entry in &window[start..] {
        thread.push(ChatMessage {
            role: entry.role,
            content: entry.content.clone(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        });
    }

    thread
}

/// The handoff hint plus order-type context relevant to the role.
fn context_hint(role: AgentRole, session: &Session) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(summary) = session.handoff_summary.as_deref().filter(|s| !s.is_empty()) {
        parts.push(summary.to_string());
    }

    if matches!(role, AgentRole::Order | AgentRole::Checkout) && session.order_type_confirmed {
        match session.order_type {
            OrderType::Pickup => parts.push("نوع الطلب: استلام من الفرع".into()),
            OrderType::Delivery => {
                if let Some(area) = session.location.area_name.as_deref() {
                    parts.push(format!("التوصيل إلى: {area}"));
                }
            }
        }
    }

    if role == AgentRole::Checkout {
        match session.order_type {
            OrderType::Delivery if session.delivery_fee > 0.0 => {
                parts.push(format!("رسوم التوصيل: {} ريال", session.delivery_fee));
            }
            OrderType::Pickup => parts.push("رسوم التوصيل: 0 (استلام)".into()),
            _ => {}
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_history(n: usize) -> Session {
        let mut s = Session::new("s1", 2);
        for i in 0..n {
            s.push_message(Role::User, format!("u{i}"));
            s.push_message(Role::Assistant, format!("a{i}"));
        }
        s
    }

    #[test]
    fn system_prompt_leads() {
        let s = session_with_history(1);
        let thread = build_thread(AgentRole::Greeting, &s);
        assert_eq!(thread[0].role, Role::System);
        assert!(thread[0].content.contains("موظف استقبال"));
    }

    #[test]
    fn window_limits_history() {
        let s = session_with_history(10);
        let thread = build_thread(AgentRole::Checkout, &s);
        // system + last 4 history entries (no summary, no hint for a
        // session with unconfirmed order type).
        let history: Vec<_> = thread.iter().filter(|m| m.role != Role::System).collect();
        assert_eq!(history.len(), AgentRole::Checkout.history_window());
        assert_eq!(history.last().unwrap().content, "a9");
    }

    #[test]
    fn summary_included_when_present() {
        let mut s = session_with_history(2);
        s.conversation_summary = Some("العميل يبي برجر".into());
        let thread = build_thread(AgentRole::Order, &s);
        assert!(thread
            .iter()
            .any(|m| m.role == Role::System && m.content.contains("ملخص المحادثة")));
    }

    #[test]
    fn tool_entries_never_reenter_prompts() {
        let mut s = session_with_history(1);
        s.push_tool_message("c1", "{\"secret\":true}");
        let thread = build_thread(AgentRole::Order, &s);
        assert!(!thread.iter().any(|m| m.content.contains("secret")));
    }

    #[test]
    fn pickup_hint_for_order_agent() {
        let mut s = session_with_history(1);
        s.order_type = OrderType::Pickup;
        s.order_type_confirmed = true;
        s.handoff_summary = Some("العميل جاهز يختار أكله".into());
        let thread = build_thread(AgentRole::Order, &s);
        let hint = thread
            .iter()
            .find(|m| m.content.starts_with("[معلومات:"))
            .expect("hint present");
        assert!(hint.content.contains("استلام من الفرع"));
        assert!(hint.content.contains("جاهز يختار"));
    }

    #[test]
    fn checkout_sees_delivery_fee() {
        let mut s = session_with_history(1);
        s.order_type = OrderType::Delivery;
        s.order_type_confirmed = true;
        s.delivery_fee = 15.0;
        s.location.area_name = Some("النرجس".into());
        let thread = build_thread(AgentRole::Checkout, &s);
        let hint = thread
            .iter()
            .find(|m| m.content.starts_with("[معلومات:"))
            .expect("hint present");
        assert!(hint.content.contains("رسوم التوصيل: 15"));
        assert!(hint.content.contains("النرجس"));
    }
}
