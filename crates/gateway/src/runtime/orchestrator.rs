//! The orchestrator: routes each user turn to the agent owning the
//! current state, reconciles tool results into the session, applies
//! handoffs through the breadcrumb rules, and persists the session
//! before releasing the per-session lock.

use serde_json::Value;

use sufra_domain::arabic::is_cancellation;
use sufra_domain::fsm::{intent_to_trigger, next_state, State, Trigger};
use sufra_domain::session::{OrderType, Session};
use sufra_domain::tool::Role;
use sufra_domain::Result;

use crate::state::AppState;

use super::handoff::{extract_handoff, strip_handoff, HandoffTarget};
use super::history;
use super::intent;
use super::prompts;
use super::roles::AgentRole;
use super::runner::{self, ToolTrace, TurnStatus};
use super::summarize;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Handle one user turn for a session. Serialized per session: the
/// lock is held until the session is persisted.
pub async fn handle_message(
    state: &AppState,
    session_id: &str,
    user_text: &str,
) -> Result<String> {
    let _permit = state.locks.acquire(session_id).await;

    let mut session = state.sessions.get_or_create(session_id).await?;
    session.user_turns += 1;
    session.push_message(Role::User, user_text);

    let (reply, prev_state) = run_turn(state, &mut session, user_text).await;

    session.push_message(Role::Assistant, reply.clone());

    if summarize::should_summarize(prev_state, session.fsm_state, session.user_turns, &session) {
        let summary = summarize::summarize(state.llm.as_ref(), &session).await;
        session.conversation_summary = Some(summary);
        session.truncate_history(summarize::KEEP_AFTER_SUMMARY);
    }

    session.touch(state.config.restaurant.session_expiry_hours);
    state.sessions.save(&session).await?;

    Ok(reply)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn body
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Returns the reply plus the state the turn started from (after the
/// silent intent phase), for the summarization edge check.
async fn run_turn(state: &AppState, session: &mut Session, user_text: &str) -> (String, State) {
    // User-initiated cancellation from any active ordering state.
    if matches!(
        session.fsm_state,
        State::Location | State::Ordering | State::Checkout
    ) && is_cancellation(user_text)
    {
        tracing::info!(session_id = %session.session_id, "order cancelled by user");
        let prev = session.fsm_state;
        session.reset_order();
        return (prompts::CANCELLED_AR.into(), prev);
    }

    // A fresh (or finished) session starts over at intent detection.
    if matches!(session.fsm_state, State::Init | State::Finalized) {
        if let Some(next) = next_state(session.fsm_state, Trigger::Start) {
            session.fsm_state = next;
        }
    }

    // Intent classification runs silently, then routes. The fallback
    // state re-classifies every turn so the user can still order.
    if matches!(session.fsm_state, State::Intent | State::Fallback) {
        let result = intent::classify(state.llm.as_ref(), user_text).await;
        session.metadata.insert(
            "last_intent".into(),
            serde_json::json!(format!("{:?}", result.intent).to_lowercase()),
        );
        session
            .metadata
            .insert("intent_confidence".into(), serde_json::json!(result.confidence));

        let trigger = intent_to_trigger(result.intent);
        if let Some(next) = next_state(session.fsm_state, trigger) {
            tracing::info!(
                session_id = %session.session_id,
                from = ?session.fsm_state,
                to = ?next,
                trigger = ?trigger,
                "intent transition"
            );
            session.fsm_state = next;
        }
    }

    // States the orchestrator answers deterministically.
    match session.fsm_state {
        State::Complaint => {
            session
                .metadata
                .insert("complaint_text".into(), serde_json::json!(user_text));
            if let Some(next) = next_state(State::Complaint, Trigger::Escalate) {
                session.fsm_state = next;
            }
            return (prompts::COMPLAINT_REPLY_AR.into(), State::Complaint);
        }
        State::Fallback => {
            let reply = format!(
                "{}\n{}",
                prompts::INQUIRY_REPLY_AR,
                state.hours.status_message_ar(chrono::Utc::now())
            );
            return (reply, State::Fallback);
        }
        _ => {}
    }

    // Hours gate: a greeting while closed finalizes immediately, and
    // no cart or order work proceeds.
    if session.fsm_state == State::Greeting {
        let now = chrono::Utc::now();
        if !state.hours.is_open_at(now) {
            if let Some(next) = next_state(State::Greeting, Trigger::RestaurantClosed) {
                session.fsm_state = next;
            }
            return (state.hours.closed_message_ar(now), State::Greeting);
        }
    }

    let prev_state = session.fsm_state;

    let Some(role) = AgentRole::for_state(session.fsm_state) else {
        // No agent owns this state; nothing sensible to run.
        return (prompts::TRY_AGAIN_AR.into(), prev_state);
    };

    let thread = history::build_thread(role, session);
    let tool_defs = state.tools.definitions_for(role);
    let turn = runner::run_agent_turn(
        state.llm.as_ref(),
        role,
        tool_defs,
        thread,
        state.tools.as_ref(),
        session,
    )
    .await;

    // Keep tool results in the session for audit.
    for t in &turn.trace {
        session.push_tool_message(&t.call_id, t.result.to_string());
    }

    // Tool JSON is the authoritative reconciliation point; prose from
    // the model is never parsed for state.
    let effects = reconcile_tool_results(session, &turn.trace);

    // A confirmed order is durable; finalize no matter how the loop
    // ended afterwards.
    if effects.order_confirmed && session.fsm_state == State::Checkout {
        if let Some(next) = next_state(State::Checkout, Trigger::OrderConfirmed) {
            transition(session, prev_state, next);
        }
    }

    let reply = match turn.status {
        TurnStatus::Completed => {
            let marker = extract_handoff(&turn.text);
            let visible = strip_handoff(&turn.text);

            if !effects.order_confirmed {
                if let Some(trigger) = marker.and_then(|t| apply_handoff(session, t)) {
                    if let Some(next) = next_state(session.fsm_state, trigger) {
                        transition(session, prev_state, next);
                    }
                }
            }

            if visible.is_empty() {
                "تمام!".into()
            } else {
                visible
            }
        }
        TurnStatus::LlmFailure => prompts::GENERIC_APOLOGY_AR.into(),
        TurnStatus::ProgrammerError => prompts::TRY_AGAIN_AR.into(),
        TurnStatus::RecursionLimit | TurnStatus::ToolLoopAborted => {
            prompts::RECURSION_FALLBACK_AR.into()
        }
    };

    (reply, prev_state)
}

fn transition(session: &mut Session, prev: State, next: State) {
    tracing::info!(
        session_id = %session.session_id,
        from = ?session.fsm_state,
        to = ?next,
        "state transition"
    );
    session.fsm_state = next;
    if let Some(summary) = handoff_summary(prev, next, session) {
        session.handoff_summary = Some(summary);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reconciliation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileEffects {
    pub order_confirmed: bool,
}

/// Scan the turn's tool results for well-known JSON shapes and copy
/// their effects into the session.
pub fn reconcile_tool_results(session: &mut Session, trace: &[ToolTrace]) -> ReconcileEffects {
    let mut effects = ReconcileEffects::default();

    for t in trace {
        if t.is_error {
            continue;
        }
        match t.tool_name.as_str() {
            "set_order_type" => {
                if t.result.get("success").and_then(Value::as_bool) != Some(true) {
                    continue;
                }
                match t.result.get("order_type").and_then(Value::as_str) {
                    Some("pickup") => {
                        session.order_type = OrderType::Pickup;
                        session.delivery_fee = 0.0;
                        session.location.area_id = None;
                        session.order_type_confirmed = true;
                    }
                    Some("delivery") => {
                        session.order_type = OrderType::Delivery;
                        session.delivery_fee = t
                            .result
                            .get("delivery_fee")
                            .and_then(Value::as_f64)
                            .unwrap_or(0.0);
                        session.location.area_id = t
                            .result
                            .get("area_id")
                            .and_then(Value::as_i64)
                            .map(|id| id as i32);
                        if let Some(district) =
                            t.result.get("district").and_then(Value::as_str)
                        {
                            session.location.area_name = Some(district.to_string());
                        }
                        session.order_type_confirmed = true;
                    }
                    _ => {}
                }
            }
            "check_delivery_district" => {
                if t.result.get("covered").and_then(Value::as_bool) == Some(true) {
                    if let Some(eta) = t.result.get("estimated_time") {
                        session.metadata.insert("estimated_time".into(), eta.clone());
                    }
                }
            }
            "calculate_total" => {
                if t.result.get("success").and_then(Value::as_bool) == Some(true) {
                    for key in ["subtotal", "discount", "total"] {
                        if let Some(v) = t.result.get(key) {
                            session.metadata.insert(format!("last_{key}"), v.clone());
                        }
                    }
                }
            }
            "confirm_order" => {
                if t.result.get("success").and_then(Value::as_bool) == Some(true) {
                    effects.order_confirmed = true;
                    if let Some(id) = t.result.get("order_id") {
                        session.metadata.insert("last_order_id".into(), id.clone());
                    }
                    if let Some(number) = t.result.get("order_number") {
                        session
                            .metadata
                            .insert("last_order_number".into(), number.clone());
                    }
                }
            }
            _ => {}
        }
    }

    effects
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handoff routing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Map a handoff marker to an FSM trigger, applying the breadcrumb
/// rules and the forward gates. Returns `None` when the marker is
/// impossible from the current state (the FSM stays put).
pub fn apply_handoff(session: &mut Session, target: HandoffTarget) -> Option<Trigger> {
    match (session.fsm_state, target) {
        (State::Greeting, HandoffTarget::Location) => Some(Trigger::ConfirmOrder),
        (State::Greeting, HandoffTarget::End) => Some(Trigger::NotOrdering),

        // Leaving LOCATION forward requires an explicit set_order_type
        // result, and for delivery a validated coverage area.
        (State::Location, HandoffTarget::Order) | (State::Location, HandoffTarget::Checkout) => {
            if !session.order_type_confirmed {
                tracing::warn!(
                    session_id = %session.session_id,
                    "location handoff without set_order_type, staying"
                );
                return None;
            }
            if session.order_type == OrderType::Delivery && session.location.area_id.is_none() {
                tracing::warn!(
                    session_id = %session.session_id,
                    "delivery handoff without validated area, staying"
                );
                return None;
            }
            // The breadcrumb — not the marker — decides where forward
            // goes: a mid-checkout location change returns to
            // checkout, everything else proceeds to ordering.
            let came_from_checkout = session.came_from_checkout;
            session.came_from_checkout = false;
            session.came_from_order = false;
            if came_from_checkout {
                Some(Trigger::ReturnToCheckout)
            } else if session.order_type == OrderType::Pickup {
                Some(Trigger::PickupChosen)
            } else {
                Some(Trigger::AddressValid)
            }
        }

        (State::Ordering, HandoffTarget::Checkout) => {
            if session.cart.is_empty() {
                tracing::warn!(
                    session_id = %session.session_id,
                    "checkout handoff with empty cart, staying"
                );
                None
            } else {
                Some(Trigger::Checkout)
            }
        }
        (State::Ordering, HandoffTarget::Location) => {
            session.came_from_order = true;
            Some(Trigger::ChangeLocation)
        }

        (State::Checkout, HandoffTarget::Location) => {
            session.came_from_checkout = true;
            Some(Trigger::ChangeLocation)
        }
        (State::Checkout, HandoffTarget::Order) => Some(Trigger::ModifyOrder),
        // `end` from checkout only fires through a confirmed order,
        // which the reconciliation path handles.
        (State::Checkout, HandoffTarget::End) => None,

        _ => None,
    }
}

/// Short Arabic context line seeding the next agent's prompt.
fn handoff_summary(prev: State, next: State, session: &Session) -> Option<String> {
    let district = session
        .location
        .area_name
        .clone()
        .unwrap_or_else(|| "غير محدد".into());

    match (prev, next) {
        (State::Greeting, State::Location) => Some("عميل جديد يبي يطلب أكل".into()),
        (State::Location, State::Ordering) => Some(match session.order_type {
            OrderType::Pickup => "العميل يبي استلام من الفرع، جاهز يختار أكله".into(),
            OrderType::Delivery => format!(
                "العميل من {district}، رسوم التوصيل {} ريال",
                session.delivery_fee
            ),
        }),
        (State::Location, State::Checkout) => Some(match session.order_type {
            OrderType::Pickup => "العميل غيّر لاستلام من الفرع".into(),
            OrderType::Delivery => format!("العميل غيّر الموقع إلى {district}"),
        }),
        (State::Ordering, State::Checkout) => Some(match session.order_type {
            OrderType::Pickup => "العميل خلص الطلب، استلام من الفرع".into(),
            OrderType::Delivery => format!("العميل خلص الطلب، توصيل إلى {district}"),
        }),
        (State::Ordering, State::Location) => {
            Some("العميل يبي يغير الموقع (راجع من الطلبات)".into())
        }
        (State::Checkout, State::Location) => {
            Some("العميل يبي يغير الموقع (راجع من المحاسبة)".into())
        }
        (State::Checkout, State::Ordering) => Some("العميل يبي يعدل الطلب".into()),
        _ => None,
    }
}
