//! Role-specialized agent personas.
//!
//! Each role fixes a system prompt, an allowed tool subset, a recursion
//! limit for the tool loop, a sampling temperature and a history
//! window. The orchestrator picks the role from the FSM state.

use sufra_domain::fsm::State;

use super::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Greeting,
    Location,
    Order,
    Checkout,
}

impl AgentRole {
    /// The role that owns a conversational state, if any. Internal
    /// states (intent, fallback, complaint) are handled by the
    /// orchestrator directly.
    pub fn for_state(state: State) -> Option<AgentRole> {
        match state {
            State::Greeting => Some(AgentRole::Greeting),
            State::Location => Some(AgentRole::Location),
            State::Ordering => Some(AgentRole::Order),
            State::Checkout => Some(AgentRole::Checkout),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::Greeting => "greeting",
            AgentRole::Location => "location",
            AgentRole::Order => "order",
            AgentRole::Checkout => "checkout",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::Greeting => prompts::GREETING_SYSTEM_PROMPT,
            AgentRole::Location => prompts::LOCATION_SYSTEM_PROMPT,
            AgentRole::Order => prompts::ORDER_SYSTEM_PROMPT,
            AgentRole::Checkout => prompts::CHECKOUT_SYSTEM_PROMPT,
        }
    }

    pub fn allowed_tools(&self) -> &'static [&'static str] {
        match self {
            AgentRole::Greeting => &[],
            AgentRole::Location => &["check_delivery_district", "set_order_type"],
            AgentRole::Order => &[
                "search_menu",
                "get_item_details",
                "add_to_order",
                "get_current_order",
                "update_order_item",
                "remove_from_order",
            ],
            AgentRole::Checkout => &["calculate_total", "confirm_order", "get_current_order"],
        }
    }

    /// Cap on LLM↔tool round-trips per turn.
    pub fn recursion_limit(&self) -> usize {
        match self {
            AgentRole::Greeting | AgentRole::Location => 6,
            AgentRole::Order => 8,
            AgentRole::Checkout => 15,
        }
    }

    pub fn temperature(&self) -> f32 {
        match self {
            AgentRole::Greeting => 0.7,
            AgentRole::Location | AgentRole::Order => 0.5,
            AgentRole::Checkout => 0.3,
        }
    }

    /// How many trailing history messages go into the prompt.
    pub fn history_window(&self) -> usize {
        match self {
            AgentRole::Greeting | AgentRole::Location => 6,
            AgentRole::Order => 5,
            AgentRole::Checkout => 4,
        }
    }

    /// Mechanical cap on invocations of one tool within a turn.
    /// Checkout tools run at most once per turn.
    pub fn max_calls_per_tool(&self) -> Option<usize> {
        match self {
            AgentRole::Checkout => Some(1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_to_role_mapping() {
        assert_eq!(AgentRole::for_state(State::Greeting), Some(AgentRole::Greeting));
        assert_eq!(AgentRole::for_state(State::Location), Some(AgentRole::Location));
        assert_eq!(AgentRole::for_state(State::Ordering), Some(AgentRole::Order));
        assert_eq!(AgentRole::for_state(State::Checkout), Some(AgentRole::Checkout));
        assert_eq!(AgentRole::for_state(State::Intent), None);
        assert_eq!(AgentRole::for_state(State::Finalized), None);
    }

    #[test]
    fn greeting_has_no_tools() {
        assert!(AgentRole::Greeting.allowed_tools().is_empty());
    }

    #[test]
    fn recursion_limits_per_role() {
        assert_eq!(AgentRole::Location.recursion_limit(), 6);
        assert_eq!(AgentRole::Order.recursion_limit(), 8);
        assert_eq!(AgentRole::Checkout.recursion_limit(), 15);
    }

    #[test]
    fn checkout_caps_each_tool_once() {
        assert_eq!(AgentRole::Checkout.max_calls_per_tool(), Some(1));
        assert_eq!(AgentRole::Order.max_calls_per_tool(), None);
    }
}
