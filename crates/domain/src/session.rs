//! Per-session conversation state.
//!
//! The orchestrator owns a `Session` exclusively for the duration of a
//! turn; cart state lives here, never in process-global maps.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::fsm::State;
use crate::tool::Role;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cart
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Modifier applied to a cart line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartModifier {
    pub modifier_id: i32,
    pub name_ar: String,
    #[serde(default)]
    pub price_delta: f64,
}

/// One line in the shopping cart.
///
/// `line_total` is computed at insertion from the unit price captured
/// then; it is never recomputed from fresh menu data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub menu_item_id: i32,
    pub name_ar: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_total: f64,
    #[serde(default)]
    pub modifiers: Vec<CartModifier>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CartItem {
    /// Build a line, computing `line_total` from the captured prices.
    pub fn new(
        menu_item_id: i32,
        name_ar: impl Into<String>,
        quantity: u32,
        unit_price: f64,
        modifiers: Vec<CartModifier>,
        notes: Option<String>,
    ) -> Self {
        let mut item = Self {
            menu_item_id,
            name_ar: name_ar.into(),
            quantity,
            unit_price,
            line_total: 0.0,
            modifiers,
            notes,
        };
        item.recompute_total();
        item
    }

    /// Unit price including modifier deltas.
    pub fn effective_unit_price(&self) -> f64 {
        self.unit_price + self.modifiers.iter().map(|m| m.price_delta).sum::<f64>()
    }

    /// Recompute `line_total` from the stored unit price and quantity.
    pub fn recompute_total(&mut self) {
        self.line_total = self.effective_unit_price() * self.quantity as f64;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Location
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Delivery location. `area_id` is set only after the area validated
/// against coverage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    #[serde(default)]
    pub area_id: Option<i32>,
    #[serde(default)]
    pub area_name: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LocationInfo {
    /// Complete enough for delivery: validated area plus street and
    /// building.
    pub fn is_complete(&self) -> bool {
        self.area_id.is_some()
            && self.area_name.as_deref().is_some_and(|s| !s.is_empty())
            && self.street.as_deref().is_some_and(|s| !s.is_empty())
            && self.building.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn to_address_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(area) = self.area_name.as_deref().filter(|s| !s.is_empty()) {
            parts.push(area.to_string());
        }
        if let Some(street) = self.street.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("شارع {street}"));
        }
        if let Some(building) = self.building.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("مبنى {building}"));
        }
        parts.join("، ")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation history
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Delivery,
    Pickup,
}

impl Default for OrderType {
    fn default() -> Self {
        OrderType::Delivery
    }
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Delivery => "delivery",
            OrderType::Pickup => "pickup",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Complete durable state for one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    #[serde(default)]
    pub fsm_state: State,

    #[serde(default)]
    pub customer_name: Option<String>,
    /// Normalized to `05XXXXXXXX`.
    #[serde(default)]
    pub customer_phone: Option<String>,

    #[serde(default)]
    pub location: LocationInfo,
    #[serde(default)]
    pub order_type: OrderType,
    /// Set only by a `set_order_type` tool result; gates leaving
    /// LOCATION forward.
    #[serde(default)]
    pub order_type_confirmed: bool,
    #[serde(default)]
    pub delivery_fee: f64,

    #[serde(default)]
    pub cart: Vec<CartItem>,
    /// Uppercase promo code once validated by `calculate_total`.
    #[serde(default)]
    pub applied_promo_code: Option<String>,

    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub conversation_summary: Option<String>,
    /// Short Arabic context line seeded into the next agent's prompt.
    #[serde(default)]
    pub handoff_summary: Option<String>,

    // Breadcrumbs for backward handoff disambiguation.
    #[serde(default)]
    pub came_from_checkout: bool,
    #[serde(default)]
    pub came_from_order: bool,

    /// Number of user turns seen, for the summarization cadence.
    #[serde(default)]
    pub user_turns: u32,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session expiring after `expiry_hours` of inactivity.
    pub fn new(session_id: impl Into<String>, expiry_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            fsm_state: State::Init,
            customer_name: None,
            customer_phone: None,
            location: LocationInfo::default(),
            order_type: OrderType::Delivery,
            order_type_confirmed: false,
            delivery_fee: 0.0,
            cart: Vec::new(),
            applied_promo_code: None,
            conversation_history: Vec::new(),
            conversation_summary: None,
            handoff_summary: None,
            came_from_checkout: false,
            came_from_order: false,
            user_turns: 0,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(expiry_hours),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Refresh `updated_at`/`expires_at` after a turn.
    pub fn touch(&mut self, expiry_hours: i64) {
        self.updated_at = Utc::now();
        self.expires_at = self.updated_at + Duration::hours(expiry_hours);
    }

    // ── Cart operations ───────────────────────────────────────────

    pub fn cart_subtotal(&self) -> f64 {
        self.cart.iter().map(|i| i.line_total).sum()
    }

    pub fn cart_item_count(&self) -> u32 {
        self.cart.iter().map(|i| i.quantity).sum()
    }

    /// Add a line, merging into an existing line when the item, notes
    /// and modifiers all match.
    pub fn add_to_cart(&mut self, item: CartItem) {
        if let Some(existing) = self.cart.iter_mut().find(|e| {
            e.menu_item_id == item.menu_item_id
                && e.notes == item.notes
                && e.modifiers == item.modifiers
        }) {
            existing.quantity += item.quantity;
            existing.recompute_total();
            return;
        }
        self.cart.push(item);
    }

    /// Remove every line for `menu_item_id`. Returns whether anything
    /// was removed.
    pub fn remove_from_cart(&mut self, menu_item_id: i32) -> bool {
        let before = self.cart.len();
        self.cart.retain(|i| i.menu_item_id != menu_item_id);
        self.cart.len() != before
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    // ── History ───────────────────────────────────────────────────

    pub fn push_message(&mut self, role: Role, content: impl Into<String>) {
        self.conversation_history.push(HistoryEntry {
            role,
            content: content.into(),
            tool_call_id: None,
        });
    }

    pub fn push_tool_message(&mut self, call_id: impl Into<String>, content: impl Into<String>) {
        self.conversation_history.push(HistoryEntry {
            role: Role::Tool,
            content: content.into(),
            tool_call_id: Some(call_id.into()),
        });
    }

    /// Drop everything but the last `keep` entries. The summary is
    /// expected to cover the removed prefix.
    pub fn truncate_history(&mut self, keep: usize) {
        let len = self.conversation_history.len();
        if len > keep {
            self.conversation_history.drain(..len - keep);
        }
    }

    /// Full reset used by the cancel trigger: empty cart, INIT state,
    /// breadcrumbs cleared. Customer identity and history survive.
    pub fn reset_order(&mut self) {
        self.fsm_state = State::Init;
        self.cart.clear();
        self.applied_promo_code = None;
        self.order_type = OrderType::Delivery;
        self.order_type_confirmed = false;
        self.delivery_fee = 0.0;
        self.location = LocationInfo::default();
        self.came_from_checkout = false;
        self.came_from_order = false;
        self.handoff_summary = None;
    }
}
