//! Order creation — the one multi-statement transaction in the system.
//!
//! Header, line items, line-item modifiers and the promo usage counter
//! commit together or not at all.

use sqlx::postgres::PgPool;
use sqlx::Row;

use sufra_domain::error::Result;
use sufra_domain::menu::{order_number, CreatedOrder};
use sufra_domain::session::CartModifier;

use crate::db_err;

/// Input to order creation, assembled by the `confirm_order` tool from
/// validated session state.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub session_id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: Option<String>,
    pub delivery_area_id: Option<i32>,
    pub order_type: String,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub discount_amount: f64,
    pub promo_code_id: Option<i32>,
    pub total: f64,
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub menu_item_id: i32,
    pub item_name_ar: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub notes: Option<String>,
    pub modifiers: Vec<CartModifier>,
}

#[derive(Clone)]
pub struct OrderRepo {
    pool: PgPool,
}

impl OrderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the order atomically. On any failure the transaction is
    /// rolled back and nothing is written.
    pub async fn create_order(&self, order: &NewOrder) -> Result<CreatedOrder> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let header = sqlx::query(
            "INSERT INTO orders ( \
                 session_id, customer_name, customer_phone, delivery_address, \
                 delivery_area_id, order_type, subtotal, delivery_fee, \
                 discount_amount, promo_code_id, total, status, notes \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'confirmed', $12) \
             RETURNING id, created_at",
        )
        .bind(&order.session_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.delivery_address)
        .bind(order.delivery_area_id)
        .bind(&order.order_type)
        .bind(order.subtotal)
        .bind(order.delivery_fee)
        .bind(order.discount_amount)
        .bind(order.promo_code_id)
        .bind(order.total)
        .bind(&order.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        let order_id: i64 = header.try_get("id").map_err(db_err)?;
        let created_at = header.try_get("created_at").map_err(db_err)?;

        for line in &order.lines {
            let item_row = sqlx::query(
                "INSERT INTO order_items ( \
                     order_id, menu_item_id, item_name_ar, quantity, \
                     unit_price, total_price, notes \
                 ) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
            )
            .bind(order_id)
            .bind(line.menu_item_id)
            .bind(&line.item_name_ar)
            .bind(line.quantity as i32)
            .bind(line.unit_price)
            .bind(line.total_price)
            .bind(&line.notes)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_err)?;

            let order_item_id: i64 = item_row.try_get("id").map_err(db_err)?;

            for modifier in &line.modifiers {
                sqlx::query(
                    "INSERT INTO order_item_modifiers ( \
                         order_item_id, modifier_id, modifier_name_ar, price_delta \
                     ) VALUES ($1, $2, $3, $4)",
                )
                .bind(order_item_id)
                .bind(modifier.modifier_id)
                .bind(&modifier.name_ar)
                .bind(modifier.price_delta)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            }
        }

        // Promo usage accounting rides in the same transaction.
        if let Some(promo_id) = order.promo_code_id {
            sqlx::query(
                "UPDATE promo_codes SET usage_count = usage_count + 1 \
                 WHERE id = $1 AND is_active = TRUE",
            )
            .bind(promo_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;

        tracing::info!(
            order_id,
            session_id = %order.session_id,
            total = order.total,
            "order created"
        );

        Ok(CreatedOrder {
            order_id,
            order_number: order_number(order_id),
            created_at,
        })
    }

    /// Recent orders for a session (diagnostics).
    pub async fn orders_for_session(&self, session_id: &str) -> Result<Vec<(i64, f64, String)>> {
        let rows = sqlx::query(
            "SELECT id, total::FLOAT8 AS total, status FROM orders \
             WHERE session_id = $1 ORDER BY created_at DESC LIMIT 10",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter()
            .map(|r| {
                Ok((
                    r.try_get("id").map_err(db_err)?,
                    r.try_get("total").map_err(db_err)?,
                    r.try_get("status").map_err(db_err)?,
                ))
            })
            .collect()
    }
}
