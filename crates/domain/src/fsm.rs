//! Conversation state machine.
//!
//! The orchestrator is the only caller of [`next_state`]; agents request
//! transitions indirectly through handoff markers and tool results.

use serde::{Deserialize, Serialize};

/// Conversation states for the ordering flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Init,
    Intent,
    Greeting,
    Location,
    Ordering,
    Checkout,
    Finalized,
    Complaint,
    Fallback,
}

impl Default for State {
    fn default() -> Self {
        State::Init
    }
}

/// User intent classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Ordering,
    Complaint,
    Inquiry,
    Other,
}

/// Triggers for state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Start,
    Retry,
    Exit,

    IntentOrdering,
    IntentComplaint,
    IntentInquiry,
    IntentOther,

    ConfirmOrder,
    NotOrdering,
    RestaurantClosed,
    AddressValid,
    PickupChosen,
    Checkout,
    ContinueOrdering,
    OrderConfirmed,
    ModifyOrder,
    /// Backward: the user wants to revisit delivery/pickup or the area.
    ChangeLocation,
    /// Forward again after a mid-checkout location change.
    ReturnToCheckout,
    Cancel,

    Resolved,
    Escalate,
}

/// The next state for `(current, trigger)`, or `None` if the transition
/// is invalid (the caller stays put).
pub fn next_state(current: State, trigger: Trigger) -> Option<State> {
    use State as S;
    use Trigger as T;

    // Cancellation resets everything except a finished conversation.
    if trigger == T::Cancel {
        return (current != S::Finalized).then_some(S::Init);
    }

    match (current, trigger) {
        (S::Init, T::Start) => Some(S::Intent),

        (S::Intent, T::IntentOrdering) => Some(S::Greeting),
        (S::Intent, T::IntentComplaint) => Some(S::Complaint),
        (S::Intent, T::IntentInquiry) | (S::Intent, T::IntentOther) => Some(S::Fallback),

        (S::Greeting, T::ConfirmOrder) => Some(S::Location),
        (S::Greeting, T::NotOrdering) => Some(S::Fallback),
        (S::Greeting, T::RestaurantClosed) => Some(S::Finalized),

        (S::Location, T::AddressValid) | (S::Location, T::PickupChosen) => Some(S::Ordering),
        (S::Location, T::ReturnToCheckout) => Some(S::Checkout),
        (S::Location, T::RestaurantClosed) => Some(S::Finalized),

        (S::Ordering, T::Checkout) => Some(S::Checkout),
        (S::Ordering, T::ContinueOrdering) => Some(S::Ordering),
        (S::Ordering, T::ChangeLocation) => Some(S::Location),

        (S::Checkout, T::OrderConfirmed) => Some(S::Finalized),
        (S::Checkout, T::ModifyOrder) => Some(S::Ordering),
        (S::Checkout, T::ChangeLocation) => Some(S::Location),

        // A finished session can start a new order on the next message.
        (S::Finalized, T::Start) => Some(S::Intent),

        (S::Complaint, T::Resolved) => Some(S::Greeting),
        (S::Complaint, T::Escalate) => Some(S::Finalized),

        (S::Fallback, T::Retry) => Some(S::Intent),
        (S::Fallback, T::Exit) => Some(S::Finalized),
        (S::Fallback, T::IntentOrdering) => Some(S::Greeting),

        _ => None,
    }
}

pub fn is_valid_transition(current: State, trigger: Trigger) -> bool {
    next_state(current, trigger).is_some()
}

/// Map an intent classification to its state trigger.
pub fn intent_to_trigger(intent: Intent) -> Trigger {
    match intent {
        Intent::Ordering => Trigger::IntentOrdering,
        Intent::Complaint => Trigger::IntentComplaint,
        Intent::Inquiry => Trigger::IntentInquiry,
        Intent::Other => Trigger::IntentOther,
    }
}

/// Arabic description of a state, used in diagnostics.
pub fn state_description_ar(state: State) -> &'static str {
    match state {
        State::Init => "بداية المحادثة",
        State::Intent => "تحديد النية",
        State::Greeting => "الترحيب",
        State::Location => "تحديد العنوان",
        State::Ordering => "اختيار الطلب",
        State::Checkout => "إتمام الطلب",
        State::Finalized => "اكتمال الطلب",
        State::Complaint => "معالجة الشكوى",
        State::Fallback => "استفسار عام",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_chain() {
        let mut s = State::Init;
        for trigger in [
            Trigger::Start,
            Trigger::IntentOrdering,
            Trigger::ConfirmOrder,
            Trigger::AddressValid,
            Trigger::Checkout,
            Trigger::OrderConfirmed,
        ] {
            s = next_state(s, trigger).expect("valid step");
        }
        assert_eq!(s, State::Finalized);
    }

    #[test]
    fn pickup_also_reaches_ordering() {
        assert_eq!(
            next_state(State::Location, Trigger::PickupChosen),
            Some(State::Ordering)
        );
    }

    #[test]
    fn cancel_resets_every_live_state() {
        for s in [
            State::Init,
            State::Intent,
            State::Greeting,
            State::Location,
            State::Ordering,
            State::Checkout,
            State::Complaint,
            State::Fallback,
        ] {
            assert_eq!(next_state(s, Trigger::Cancel), Some(State::Init));
        }
        assert_eq!(next_state(State::Finalized, Trigger::Cancel), None);
    }

    #[test]
    fn backward_transitions() {
        assert_eq!(
            next_state(State::Ordering, Trigger::ChangeLocation),
            Some(State::Location)
        );
        assert_eq!(
            next_state(State::Checkout, Trigger::ChangeLocation),
            Some(State::Location)
        );
        assert_eq!(
            next_state(State::Checkout, Trigger::ModifyOrder),
            Some(State::Ordering)
        );
        assert_eq!(
            next_state(State::Location, Trigger::ReturnToCheckout),
            Some(State::Checkout)
        );
    }

    #[test]
    fn invalid_transitions_stay_put() {
        assert_eq!(next_state(State::Greeting, Trigger::Checkout), None);
        assert_eq!(next_state(State::Init, Trigger::OrderConfirmed), None);
    }

    #[test]
    fn finalized_can_restart() {
        assert_eq!(next_state(State::Finalized, Trigger::Start), Some(State::Intent));
    }

    #[test]
    fn state_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&State::Ordering).unwrap(),
            "\"ORDERING\""
        );
        let s: State = serde_json::from_str("\"CHECKOUT\"").unwrap();
        assert_eq!(s, State::Checkout);
    }
}
