//! Session persistence.
//!
//! One row per session; cart, history, location and metadata are JSONB.
//! Expired rows are deleted on next access and a fresh session is
//! handed back; a periodic sweep removes the rest.

use chrono::Utc;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use sufra_domain::error::{Error, Result};
use sufra_domain::fsm::State;
use sufra_domain::session::{OrderType, Session};

use crate::db_err;

#[derive(Clone)]
pub struct SessionRepo {
    pool: PgPool,
    expiry_hours: i64,
}

impl SessionRepo {
    pub fn new(pool: PgPool, expiry_hours: i64) -> Self {
        Self { pool, expiry_hours }
    }

    fn session_from_row(row: &PgRow) -> Result<Session> {
        let state_raw: String = row.try_get("state").map_err(db_err)?;
        let fsm_state: State = serde_json::from_value(serde_json::Value::String(state_raw))
            .map_err(|e| Error::Store(format!("bad session state: {e}")))?;
        let order_type_raw: String = row.try_get("order_type").map_err(db_err)?;
        let order_type = if order_type_raw == "pickup" {
            OrderType::Pickup
        } else {
            OrderType::Delivery
        };

        let location: serde_json::Value = row.try_get("location").map_err(db_err)?;
        let cart: serde_json::Value = row.try_get("cart").map_err(db_err)?;
        let history: serde_json::Value =
            row.try_get("conversation_history").map_err(db_err)?;
        let metadata: serde_json::Value = row.try_get("metadata").map_err(db_err)?;

        Ok(Session {
            session_id: row.try_get("id").map_err(db_err)?,
            fsm_state,
            customer_name: row.try_get("customer_name").map_err(db_err)?,
            customer_phone: row.try_get("customer_phone").map_err(db_err)?,
            location: serde_json::from_value(location).unwrap_or_default(),
            order_type,
            order_type_confirmed: row.try_get("order_type_confirmed").map_err(db_err)?,
            delivery_fee: row.try_get("delivery_fee").map_err(db_err)?,
            cart: serde_json::from_value(cart).unwrap_or_default(),
            applied_promo_code: row.try_get("applied_promo_code").map_err(db_err)?,
            conversation_history: serde_json::from_value(history).unwrap_or_default(),
            conversation_summary: row.try_get("conversation_summary_ar").map_err(db_err)?,
            handoff_summary: row.try_get("handoff_summary_ar").map_err(db_err)?,
            came_from_checkout: row.try_get("came_from_checkout").map_err(db_err)?,
            came_from_order: row.try_get("came_from_order").map_err(db_err)?,
            user_turns: row.try_get::<i32, _>("user_turns").map_err(db_err)? as u32,
            metadata: serde_json::from_value(metadata).unwrap_or_default(),
            created_at: row.try_get("created_at").map_err(db_err)?,
            updated_at: row.try_get("updated_at").map_err(db_err)?,
            expires_at: row.try_get("expires_at").map_err(db_err)?,
        })
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        let row = sqlx::query("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(Self::session_from_row).transpose()
    }

    /// Insert a fresh session row.
    pub async fn create(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "INSERT INTO sessions (id, state, created_at, updated_at, expires_at) \
             VALUES ($1, $2, $3, $3, $4)",
        )
        .bind(&session.session_id)
        .bind(state_str(session.fsm_state))
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    /// Load the session, recreating it empty when missing or expired.
    pub async fn get_or_create(&self, session_id: &str) -> Result<Session> {
        if let Some(session) = self.get(session_id).await? {
            if !session.is_expired(Utc::now()) {
                return Ok(session);
            }
            tracing::info!(session_id, "session expired, recreating");
            self.delete(session_id).await?;
        }
        let session = Session::new(session_id, self.expiry_hours);
        self.create(&session).await?;
        Ok(session)
    }

    /// Persist the full session state. Single idempotent statement.
    pub async fn save(&self, session: &Session) -> Result<()> {
        let location = serde_json::to_value(&session.location)?;
        let cart = serde_json::to_value(&session.cart)?;
        let history = serde_json::to_value(&session.conversation_history)?;
        let metadata = serde_json::to_value(&session.metadata)?;

        sqlx::query(
            "UPDATE sessions SET \
                 state = $2, customer_name = $3, customer_phone = $4, \
                 order_type = $5, order_type_confirmed = $6, delivery_fee = $7, \
                 location = $8, cart = $9, applied_promo_code = $10, \
                 conversation_history = $11, conversation_summary_ar = $12, \
                 handoff_summary_ar = $13, came_from_checkout = $14, \
                 came_from_order = $15, user_turns = $16, metadata = $17, \
                 updated_at = $18, expires_at = $19 \
             WHERE id = $1",
        )
        .bind(&session.session_id)
        .bind(state_str(session.fsm_state))
        .bind(&session.customer_name)
        .bind(&session.customer_phone)
        .bind(session.order_type.as_str())
        .bind(session.order_type_confirmed)
        .bind(session.delivery_fee)
        .bind(location)
        .bind(cart)
        .bind(&session.applied_promo_code)
        .bind(history)
        .bind(&session.conversation_summary)
        .bind(&session.handoff_summary)
        .bind(session.came_from_checkout)
        .bind(session.came_from_order)
        .bind(session.user_turns as i32)
        .bind(metadata)
        .bind(session.updated_at)
        .bind(session.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Delete every expired session. Returns the count removed.
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < now()")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

fn state_str(state: State) -> &'static str {
    match state {
        State::Init => "INIT",
        State::Intent => "INTENT",
        State::Greeting => "GREETING",
        State::Location => "LOCATION",
        State::Ordering => "ORDERING",
        State::Checkout => "CHECKOUT",
        State::Finalized => "FINALIZED",
        State::Complaint => "COMPLAINT",
        State::Fallback => "FALLBACK",
    }
}
