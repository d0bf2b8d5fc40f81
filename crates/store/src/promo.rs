//! Promo code reads. Discount math lives in `sufra_domain::promo`; the
//! usage counter is incremented inside the order-creation transaction.

use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use sufra_domain::error::Result;
use sufra_domain::promo::{DiscountType, PromoCode};

use crate::db_err;

#[derive(Clone)]
pub struct PromoRepo {
    pool: PgPool,
}

fn promo_from_row(row: &PgRow) -> Result<PromoCode> {
    let kind: String = row.try_get("discount_type").map_err(db_err)?;
    Ok(PromoCode {
        id: row.try_get("id").map_err(db_err)?,
        code: row.try_get("code").map_err(db_err)?,
        discount_type: if kind == "fixed" {
            DiscountType::Fixed
        } else {
            DiscountType::Percentage
        },
        value: row.try_get("discount_value").map_err(db_err)?,
        min_order: row.try_get("min_order").map_err(db_err)?,
        max_discount: row.try_get("max_discount").map_err(db_err)?,
        usage_limit: row.try_get("usage_limit").map_err(db_err)?,
        usage_count: row.try_get("usage_count").map_err(db_err)?,
        valid_from: row.try_get("valid_from").map_err(db_err)?,
        valid_until: row.try_get("valid_until").map_err(db_err)?,
        is_active: row.try_get("is_active").map_err(db_err)?,
    })
}

impl PromoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Case-insensitive lookup by code.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<PromoCode>> {
        let row = sqlx::query(
            "SELECT id, code, discount_type, \
                    discount_value::FLOAT8 AS discount_value, \
                    min_order::FLOAT8 AS min_order, \
                    max_discount::FLOAT8 AS max_discount, \
                    usage_limit, usage_count, valid_from, valid_until, is_active \
             FROM promo_codes WHERE UPPER(code) = UPPER($1)",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.as_ref().map(promo_from_row).transpose()
    }
}
